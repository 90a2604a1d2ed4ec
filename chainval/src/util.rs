//! Basic utility functionality supporting chain building

pub mod chain_utilities;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod time_budget;
pub mod verification_time;

pub use crate::{
    util::chain_utilities::*, util::crypto::*, util::error::*, util::logging::*,
    util::time_budget::*, util::verification_time::*,
};
