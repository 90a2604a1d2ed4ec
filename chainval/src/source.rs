//! Certificate collections and trust store providers

pub mod cert_collection;
pub mod cert_stores;

pub use crate::{source::cert_collection::*, source::cert_stores::*};
