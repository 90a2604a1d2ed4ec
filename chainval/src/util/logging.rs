//! Logging support

use log::{debug, error, info, warn};

use crate::ChainCertificate;

/// Enum that describes level associated with a log message
#[derive(Debug, Eq, PartialEq)]
pub enum ChainLogLevels {
    /// Common error logging level
    ChainError,
    /// Common info logging level
    ChainInfo,
    /// Common warn logging level
    ChainWarn,
    /// Common debug logging level
    ChainDebug,
}

/// `log_message` forwards to the `log` facade. Installing a logger is left to the application.
pub fn log_message(level: &ChainLogLevels, message: &str) {
    match level {
        ChainLogLevels::ChainError => error!("{}", message),
        ChainLogLevels::ChainWarn => warn!("{}", message),
        ChainLogLevels::ChainInfo => info!("{}", message),
        ChainLogLevels::ChainDebug => debug!("{}", message),
    }
}

/// `log_error_for_cert` emits an error-level message prefixed with the subject name of the
/// certificate it concerns.
pub fn log_error_for_cert(cert: &ChainCertificate, msg: &str) {
    log_message(
        &ChainLogLevels::ChainError,
        &format!("{} for certificate issued to {}", msg, cert.subject()),
    );
}

/// `log_debug_for_cert` emits a debug-level message prefixed with the subject name of the
/// certificate it concerns.
pub fn log_debug_for_cert(cert: &ChainCertificate, msg: &str) {
    log_message(
        &ChainLogLevels::ChainDebug,
        &format!("{} for certificate issued to {}", msg, cert.subject()),
    );
}
