//! Structures and functions related to configuring chain building operations

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::str::FromStr;
use core::time::Duration;
use std::path::Path;

use flagset::{flags, FlagSet};
use serde::{Deserialize, Serialize};

use der::asn1::ObjectIdentifier;

use chainprocmacros::*;

use crate::util::error::*;
use crate::util::logging::*;
use crate::VerificationTime;

//-----------------------------------------------------------------------------------------------
// Type definitions used in the definition of chain build settings
//-----------------------------------------------------------------------------------------------
/// `Strings` is a typedef for a vector of String values.
pub type Strings = Vec<String>;

/// `ChainBuildSettings` is a typedef for a `BTreeMap` that maps setting names to a variant value.
pub type ChainBuildSettings = BTreeMap<String, ChainBuildSettingTypes>;

/// Whether and how revocation status is consulted
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RevocationMode {
    /// Revocation status is not checked
    NoCheck,
    /// Revocation information may be retrieved over the network
    Online,
    /// Only locally cached revocation information is used
    Offline,
}

/// Which chain elements have their revocation status consulted
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RevocationFlag {
    /// Only the leaf
    EndCertificateOnly,
    /// Every element except a self-signed top element
    ExcludeRoot,
    /// Every element
    EntireChain,
}

flags! {
    /// Relaxations a caller may request. None are currently honored; any non-empty set is rejected
    /// with [`Error::NotSupported`].
    pub enum VerificationFlag: u16 {
        /// Ignore certificates outside their validity period
        IgnoreNotTimeValid = 0x0001,
        /// Ignore trust lists outside their validity period
        IgnoreCtlNotTimeValid = 0x0002,
        /// Ignore improperly nested validity periods
        IgnoreNotTimeNested = 0x0004,
        /// Ignore basic constraints problems
        IgnoreInvalidBasicConstraints = 0x0008,
        /// Accept chains ending in an unknown authority
        AllowUnknownCertificateAuthority = 0x0010,
        /// Ignore usage mismatches
        IgnoreWrongUsage = 0x0020,
        /// Ignore name problems
        IgnoreInvalidName = 0x0040,
        /// Ignore policy problems
        IgnoreInvalidPolicy = 0x0080,
        /// Ignore unknown end entity revocation status
        IgnoreEndRevocationUnknown = 0x0100,
        /// Ignore unknown trust list signer revocation status
        IgnoreCtlSignerRevocationUnknown = 0x0200,
        /// Ignore unknown CA revocation status
        IgnoreCertificateAuthorityRevocationUnknown = 0x0400,
        /// Ignore unknown root revocation status
        IgnoreRootRevocationUnknown = 0x0800,
    }
}

/// A set of [`VerificationFlag`] values. The empty set is the only supported configuration.
pub type VerificationFlags = FlagSet<VerificationFlag>;

//-----------------------------------------------------------------------------------------------
// Enum used to define all chain build settings
//-----------------------------------------------------------------------------------------------
/// `ChainBuildSettingTypes` is used to define a variant map with types associated with building
/// and evaluating a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainBuildSettingTypes {
    /// Represents bool values
    Bool(bool),
    /// Represents u8 values
    U8(u8),
    /// Represents u16 values
    U16(u16),
    /// Represents u64 values
    U64(u64),
    /// Represents vectors of Strings
    Strings(Strings),
    /// Represents a duration or a timeout
    Duration(Duration),
    /// Represents a revocation mode
    RevocationMode(RevocationMode),
    /// Represents a revocation scope
    RevocationFlag(RevocationFlag),
}

//-----------------------------------------------------------------------------------------------
// Types of chain build settings
//-----------------------------------------------------------------------------------------------
/// `CBS_REVOCATION_MODE` is used to retrieve a [`RevocationMode`] from a [`ChainBuildSettings`]
/// object. By default, this setting is `Online`.
pub static CBS_REVOCATION_MODE: &str = "cbsRevocationMode";

/// `CBS_REVOCATION_FLAG` is used to retrieve a [`RevocationFlag`] from a [`ChainBuildSettings`]
/// object. By default, this setting is `ExcludeRoot`.
pub static CBS_REVOCATION_FLAG: &str = "cbsRevocationFlag";

/// `CBS_VERIFICATION_TIME` holds the time of evaluation as seconds since the Unix epoch. When
/// absent the current time is used.
pub static CBS_VERIFICATION_TIME: &str = "cbsVerificationTime";

/// `CBS_VERIFICATION_FLAGS` holds the bits of a [`VerificationFlags`] set. By default, no flags.
pub static CBS_VERIFICATION_FLAGS: &str = "cbsVerificationFlags";

/// `CBS_CERTIFICATE_POLICY` holds dotted OIDs that every built chain must satisfy.
pub static CBS_CERTIFICATE_POLICY: &str = "cbsCertificatePolicy";

/// `CBS_APPLICATION_POLICY` holds dotted extended key usage OIDs that every built chain must
/// permit.
pub static CBS_APPLICATION_POLICY: &str = "cbsApplicationPolicy";

/// Default for `CBS_URL_RETRIEVAL_TIMEOUT`
pub static CBS_URL_RETRIEVAL_TIMEOUT_DEFAULT: Duration = Duration::from_secs(15);

/// `CBS_URL_RETRIEVAL_TIMEOUT` is the initial network allowance given to a build when the caller
/// does not supply a [`TimeBudget`](crate::TimeBudget).
pub static CBS_URL_RETRIEVAL_TIMEOUT: &str = "cbsUrlRetrievalTimeout";

/// Default for `CBS_MAX_CHAIN_DEPTH`
pub static CBS_MAX_CHAIN_DEPTH_DEFAULT: u8 = 32;

/// `CBS_MAX_CHAIN_DEPTH` bounds the number of certificates in a constructed path. Exceeding it
/// aborts the build with [`Error::ChainTooLong`].
pub static CBS_MAX_CHAIN_DEPTH: &str = "cbsMaxChainDepth";

//-----------------------------------------------------------------------------------------------
// Getters/setters for settings
//-----------------------------------------------------------------------------------------------
cbs_gets_and_sets_with_default!(CBS_REVOCATION_MODE, RevocationMode, RevocationMode::Online);
cbs_gets_and_sets_with_default!(
    CBS_REVOCATION_FLAG,
    RevocationFlag,
    RevocationFlag::ExcludeRoot
);
cbs_gets_and_sets!(CBS_VERIFICATION_TIME, u64);
cbs_gets_and_sets_with_default!(CBS_VERIFICATION_FLAGS, u16, 0);
cbs_gets_and_sets!(CBS_CERTIFICATE_POLICY, Strings);
cbs_gets_and_sets!(CBS_APPLICATION_POLICY, Strings);
cbs_gets_and_sets_with_default!(
    CBS_URL_RETRIEVAL_TIMEOUT,
    Duration,
    CBS_URL_RETRIEVAL_TIMEOUT_DEFAULT
);
cbs_gets_and_sets_with_default!(CBS_MAX_CHAIN_DEPTH, u8, CBS_MAX_CHAIN_DEPTH_DEFAULT);

/// `get_verification_time_or_now` returns the configured verification time or, if none is
/// configured, the current time.
pub fn get_verification_time_or_now(cbs: &ChainBuildSettings) -> Result<VerificationTime> {
    match get_verification_time(cbs) {
        Some(t) => VerificationTime::from_unix_secs(t),
        None => Ok(VerificationTime::now()),
    }
}

/// `set_verification_time_from_vt` stores a [`VerificationTime`] value.
pub fn set_verification_time_from_vt(cbs: &mut ChainBuildSettings, vt: VerificationTime) {
    set_verification_time(cbs, vt.as_unix_secs());
}

/// `get_verification_flags_as_set` interprets the stored bits. Bits with no defined flag are
/// reported as [`Error::NotSupported`].
pub fn get_verification_flags_as_set(cbs: &ChainBuildSettings) -> Result<VerificationFlags> {
    VerificationFlags::new(get_verification_flags(cbs)).map_err(|_| Error::NotSupported)
}

/// `set_verification_flags_from_set` stores the bits of a [`VerificationFlags`] set.
pub fn set_verification_flags_from_set(cbs: &mut ChainBuildSettings, flags: VerificationFlags) {
    set_verification_flags(cbs, flags.bits());
}

fn strings_to_oids(strings: Option<Strings>, setting: &str) -> Vec<ObjectIdentifier> {
    let mut retval = Vec::new();
    for s in strings.unwrap_or_default() {
        match ObjectIdentifier::from_str(&s) {
            Ok(oid) => {
                if !retval.contains(&oid) {
                    retval.push(oid);
                }
            }
            Err(_) => log_message(
                &ChainLogLevels::ChainError,
                &format!("Ignoring malformed OID {} in {}", s, setting),
            ),
        }
    }
    retval
}

/// `get_certificate_policy_as_oids` parses `CBS_CERTIFICATE_POLICY`, skipping malformed values.
pub fn get_certificate_policy_as_oids(cbs: &ChainBuildSettings) -> Vec<ObjectIdentifier> {
    strings_to_oids(get_certificate_policy(cbs), CBS_CERTIFICATE_POLICY)
}

/// `get_application_policy_as_oids` parses `CBS_APPLICATION_POLICY`, skipping malformed values.
pub fn get_application_policy_as_oids(cbs: &ChainBuildSettings) -> Vec<ObjectIdentifier> {
    strings_to_oids(get_application_policy(cbs), CBS_APPLICATION_POLICY)
}

/// `set_certificate_policy_from_oids` stores OIDs in dotted form.
pub fn set_certificate_policy_from_oids(cbs: &mut ChainBuildSettings, oids: &[ObjectIdentifier]) {
    set_certificate_policy(cbs, oids.iter().map(|o| o.to_string()).collect());
}

/// `set_application_policy_from_oids` stores OIDs in dotted form.
pub fn set_application_policy_from_oids(cbs: &mut ChainBuildSettings, oids: &[ObjectIdentifier]) {
    set_application_policy(cbs, oids.iter().map(|o| o.to_string()).collect());
}

/// `read_settings` deserializes a [`ChainBuildSettings`] object from a JSON file. A missing file
/// yields default settings.
pub fn read_settings(fname: &Path) -> Result<ChainBuildSettings> {
    if !fname.exists() {
        return Ok(ChainBuildSettings::new());
    }
    let json = std::fs::read(fname)?;
    serde_json::from_slice(&json).map_err(|e| {
        log_message(
            &ChainLogLevels::ChainError,
            &format!("Failed to parse settings from {}: {}", fname.display(), e),
        );
        Error::ParseError
    })
}
