//! Per-element and overall outcome of a chain build

use alloc::string::String;
use alloc::{vec, vec::Vec};

use crate::util::error::*;
use crate::{ChainStatus, ChainStatusFlag, SharedCertificate, VerificationFlags};

/// `add_unique_status` appends `status` unless a status with the same flag is already present.
/// Returns true if the status was appended.
pub fn add_unique_status(statuses: &mut Vec<ChainStatus>, status: ChainStatus) -> bool {
    if statuses.iter().any(|s| s.status == status.status) {
        false
    } else {
        statuses.push(status);
        true
    }
}

/// One certificate of a built chain with the problems found at its depth
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainElement {
    /// The certificate at this depth
    pub certificate: SharedCertificate,
    /// Status flags, deduplicated by flag. Holds only [`ChainStatusFlag::NoError`] when no problem
    /// was found.
    pub status: Vec<ChainStatus>,
    /// Free-text diagnostic
    pub information: String,
}

impl ChainElement {
    /// Creates an element carrying the single `NoError` status
    pub fn new(certificate: SharedCertificate) -> Self {
        ChainElement {
            certificate,
            status: vec![ChainStatus::no_error()],
            information: String::new(),
        }
    }

    /// `add_status` records a status on the element. `NoError` is displaced by the first real
    /// problem and is never added alongside one. Returns true if the element changed.
    pub fn add_status(&mut self, status: ChainStatus) -> bool {
        if status.status == ChainStatusFlag::NoError {
            if self.status.is_empty() {
                self.status.push(status);
                return true;
            }
            return false;
        }
        self.status.retain(|s| s.status != ChainStatusFlag::NoError);
        add_unique_status(&mut self.status, status)
    }

    /// The flags on this element
    pub fn flags(&self) -> Vec<ChainStatusFlag> {
        self.status.iter().map(|s| s.status).collect()
    }

    /// True if `flag` is present
    pub fn has_status(&self, flag: ChainStatusFlag) -> bool {
        self.status.iter().any(|s| s.status == flag)
    }

    /// True if no problem was recorded
    pub fn is_no_error(&self) -> bool {
        self.status.iter().all(|s| s.status == ChainStatusFlag::NoError)
    }
}

/// Ordered chain elements, leaf first, and the union of their problems
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChainResult {
    /// Elements from the leaf (index 0) to the last reachable certificate
    pub elements: Vec<ChainElement>,
    /// Every non-`NoError` status from every element, deduplicated by flag
    pub overall_status: Vec<ChainStatus>,
}

impl ChainResult {
    /// Creates an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// `add_element_status` records `status` on the element at `depth` and in the overall status.
    /// Depths past the end of the chain are ignored.
    pub fn add_element_status(&mut self, depth: usize, status: ChainStatus) {
        if let Some(element) = self.elements.get_mut(depth) {
            if status.status != ChainStatusFlag::NoError {
                add_unique_status(&mut self.overall_status, status.clone());
            }
            element.add_status(status);
        }
    }

    /// The leaf element, if the chain is not empty
    pub fn leaf(&self) -> Option<&ChainElement> {
        self.elements.first()
    }

    /// The flags in the overall status
    pub fn overall_flags(&self) -> Vec<ChainStatusFlag> {
        self.overall_status.iter().map(|s| s.status).collect()
    }

    /// True if `flag` is in the overall status
    pub fn has_status(&self, flag: ChainStatusFlag) -> bool {
        self.overall_status.iter().any(|s| s.status == flag)
    }

    /// `verify` returns the verdict: true iff the overall status is empty. Relaxations are not
    /// supported, so any non-empty `flags` is rejected with [`Error::NotSupported`].
    pub fn verify(&self, flags: VerificationFlags) -> Result<bool> {
        if !flags.is_empty() {
            return Err(Error::NotSupported);
        }
        Ok(self.overall_status.is_empty())
    }
}

#[test]
fn add_unique_status_test() {
    let mut v = vec![];
    assert!(add_unique_status(
        &mut v,
        ChainStatus::new(ChainStatusFlag::Revoked, "a")
    ));
    assert!(!add_unique_status(
        &mut v,
        ChainStatus::new(ChainStatusFlag::Revoked, "b")
    ));
    assert!(add_unique_status(
        &mut v,
        ChainStatus::new(ChainStatusFlag::NotTimeValid, "c")
    ));
    assert_eq!(2, v.len());
    assert_eq!("a", v[0].status_information);
}

#[test]
fn empty_result_verdict() {
    let r = ChainResult::new();
    assert_eq!(Ok(true), r.verify(VerificationFlags::default()));
    assert_eq!(
        Err(Error::NotSupported),
        r.verify(crate::VerificationFlag::IgnoreNotTimeValid.into())
    );
}
