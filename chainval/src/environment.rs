//! Callback and trait object switchboard to support chain building

pub mod chain_environment;
pub mod chain_environment_traits;

pub use crate::{environment::chain_environment::*, environment::chain_environment_traits::*};
