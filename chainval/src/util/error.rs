//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Error type
///
/// Mapped trust failures (expired certificates, untrusted roots, missing issuers and so on) are never
/// surfaced through this type. They are recorded as [`ChainStatus`](crate::ChainStatus) values on a
/// [`ChainResult`](crate::ChainResult). Only configuration that cannot be honored and conditions that
/// leave the engine unable to produce a result at all are reported here.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// NotSupported occurs when a chain build is requested with verification flags other than the
    /// empty set.
    NotSupported,
    /// ChainTooLong occurs when path construction exceeds the configured maximum depth.
    ChainTooLong,
    /// OutOfMemory occurs when a path constructor reports resource exhaustion.
    OutOfMemory,
    /// UnrecognizedVerifyError occurs when a raw verification code has no counterpart in
    /// [`VerifyErrorCode`](crate::VerifyErrorCode).
    UnrecognizedVerifyError(i32),
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Unrecognized occurs when an error condition does not match anything else here.
    Unrecognized,
    /// An artifact could not be parsed
    ParseError,
    /// A networking issue occurred.
    NetworkError,
    /// A URI scheme was encountered that is not valid in the given context, i.e., an https URI
    /// presented for AIA chasing.
    InvalidUriScheme,
    /// A signature did not verify using the presented public key.
    SignatureVerificationFailure,
    /// Asn1Error is used to propagate error information from the der crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSupported => write!(f, "NotSupported"),
            Error::ChainTooLong => write!(f, "ChainTooLong"),
            Error::OutOfMemory => write!(f, "OutOfMemory"),
            Error::UnrecognizedVerifyError(code) => write!(f, "UnrecognizedVerifyError: {}", code),
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::ParseError => write!(f, "ParseError"),
            Error::NetworkError => write!(f, "NetworkError"),
            Error::InvalidUriScheme => write!(f, "InvalidUriScheme"),
            Error::SignatureVerificationFailure => write!(f, "SignatureVerificationFailure"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdIoError: {:?}", err),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn error_test() {
    use alloc::format;
    let s = format!("{}", Error::NotSupported);
    assert_eq!("NotSupported", s);
    let s = format!("{}", Error::ChainTooLong);
    assert_eq!("ChainTooLong", s);
    let s = format!("{}", Error::OutOfMemory);
    assert_eq!("OutOfMemory", s);
    let s = format!("{}", Error::UnrecognizedVerifyError(99));
    assert_eq!("UnrecognizedVerifyError: 99", s);
    let s = format!("{}", Error::NotFound);
    assert_eq!("NotFound", s);
    let s = format!("{}", Error::Unrecognized);
    assert_eq!("Unrecognized", s);
    let s = format!("{}", Error::ParseError);
    assert_eq!("ParseError", s);
    let s = format!("{}", Error::NetworkError);
    assert_eq!("NetworkError", s);
    let s = format!("{}", Error::InvalidUriScheme);
    assert_eq!("InvalidUriScheme", s);
    let s = format!("{}", Error::SignatureVerificationFailure);
    assert_eq!("SignatureVerificationFailure", s);
    let s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
    assert_eq!("StdIoError: NotFound", s);
    let e: Error = der::Error::from(der::ErrorKind::Failed).into();
    assert!(matches!(e, Error::Asn1Error(_)));
}
