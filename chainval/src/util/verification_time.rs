//! The moment at which a chain is evaluated

use core::{cmp::Ordering, fmt, time::Duration};

use serde::{
    de::{self, Deserializer, Visitor},
    ser::Serializer,
    Deserialize, Serialize,
};

use crate::util::error::Result;

/// Time at which validity periods, CRL freshness and revocation dates are evaluated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct VerificationTime(pub der::DateTime);

impl fmt::Display for VerificationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl VerificationTime {
    /// Create a [`VerificationTime`] from Unix epoch
    pub fn from_unix_secs(v: u64) -> Result<Self> {
        Ok(Self(der::DateTime::from_unix_duration(Duration::from_secs(
            v,
        ))?))
    }

    /// Return Unix epoch (in seconds) for this value
    pub fn as_unix_secs(&self) -> u64 {
        self.0.unix_duration().as_secs()
    }

    /// Current system time. A clock reading before 1970 is clamped to the epoch and one after 9999
    /// to [`der::DateTime::INFINITY`].
    pub fn now() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self::from_unix_duration_clamped(now)
    }

    fn from_unix_duration_clamped(d: Duration) -> Self {
        match der::DateTime::from_unix_duration(d) {
            Ok(dt) => Self(dt),
            Err(_) => Self(der::DateTime::INFINITY),
        }
    }
}

impl Default for VerificationTime {
    fn default() -> Self {
        Self::now()
    }
}

impl PartialEq<x509_cert::time::Time> for VerificationTime {
    fn eq(&self, other: &x509_cert::time::Time) -> bool {
        self.0.eq(&other.to_date_time())
    }
}

impl PartialOrd<x509_cert::time::Time> for VerificationTime {
    fn partial_cmp(&self, other: &x509_cert::time::Time) -> Option<Ordering> {
        self.0.partial_cmp(&other.to_date_time())
    }
}

impl PartialEq<VerificationTime> for x509_cert::time::Time {
    fn eq(&self, other: &VerificationTime) -> bool {
        self.to_date_time().eq(&other.0)
    }
}

impl PartialOrd<VerificationTime> for x509_cert::time::Time {
    fn partial_cmp(&self, other: &VerificationTime) -> Option<Ordering> {
        self.to_date_time().partial_cmp(&other.0)
    }
}

impl Serialize for VerificationTime {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.as_unix_secs())
    }
}

struct VerificationTimeVisitor;

impl<'de> Visitor<'de> for VerificationTimeVisitor {
    type Value = VerificationTime;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a Unix timestamp in seconds")
    }

    fn visit_u64<E>(self, value: u64) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        VerificationTime::from_unix_secs(value)
            .map_err(|_| E::custom(format!("timestamp out of range: {}", value)))
    }
}

impl<'de> Deserialize<'de> for VerificationTime {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_u64(VerificationTimeVisitor)
    }
}
