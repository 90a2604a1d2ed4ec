//! Path construction, per-element status mapping and policy evaluation

pub mod cert_extension;
pub mod chain_certificate;
pub mod chain_results;
pub mod chain_settings;
pub mod chain_status;
pub mod chain_verifier;
pub mod path_constructor;
pub mod policy_evaluator;
pub mod policy_graph;
pub mod verify_error;

pub use crate::{
    validator::cert_extension::*, validator::chain_certificate::*, validator::chain_results::*,
    validator::chain_settings::*, validator::chain_status::*, validator::chain_verifier::*,
    validator::path_constructor::*, validator::policy_evaluator::*, validator::policy_graph::*,
    validator::verify_error::*,
};
