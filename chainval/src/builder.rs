//! Candidate discovery: issuer resolution across local stores and AIA, and retrieval utilities

pub mod candidate_set;
pub mod issuer_resolver;
pub mod uri_utils;

#[cfg(feature = "std")]
pub mod file_utils;

pub use crate::builder::{candidate_set::*, issuer_resolver::*, uri_utils::*};

#[cfg(feature = "std")]
pub use crate::builder::file_utils::*;
