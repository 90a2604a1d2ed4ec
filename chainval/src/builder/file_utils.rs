//! The file_utils module contains utility functions related to interactions with the filesystem.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use log::{debug, error, info};
use walkdir::WalkDir;

use crate::util::error::*;
use crate::{certificates_from_buffer, ChainCertificate};

/// `get_file_as_byte_vec` returns the contents of the indicated file.
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(filename)?)
}

/// `cert_folder_to_vec` recursively traverses `certs_dir` and returns the certificates that could
/// be read from files within it. DER, PEM (one or more CERTIFICATE blocks) and, with the `remote`
/// feature, certs-only PKCS #7 files are accepted.
///
/// Only files with .der, .cer, .crt, .pem or .p7b extensions are processed.
pub fn cert_folder_to_vec(certs_dir: &str) -> Result<Vec<ChainCertificate>> {
    if !Path::is_dir(Path::new(certs_dir)) {
        error!("{} does not exist or is not a directory", certs_dir);
        return Err(Error::NotFound);
    }

    let file_exts = ["der", "crt", "cer", "pem", "p7b"];
    let mut retval = Vec::new();
    for entry in WalkDir::new(certs_dir) {
        let e = match entry {
            Ok(e) => e,
            Err(e) => {
                error!("Failed to read entry in {}: {}", certs_dir, e);
                continue;
            }
        };
        if e.file_type().is_dir() {
            continue;
        }

        let path = e.path();
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if file_exts.contains(&ext.to_ascii_lowercase().as_str()) => {}
            _ => continue,
        }

        let buffer = match get_file_as_byte_vec(path) {
            Ok(b) => b,
            Err(err) => {
                error!("Failed to read {}: {}", path.display(), err);
                continue;
            }
        };

        let locator = path.display().to_string();
        let certs = certificates_from_buffer(&buffer, &locator);
        if certs.is_empty() {
            debug!("No certificates read from {}", locator);
        }
        retval.extend(certs);
    }
    info!("Read {} certificates from {}", retval.len(), certs_dir);
    Ok(retval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_folder() {
        assert_eq!(
            Err(Error::NotFound),
            cert_folder_to_vec("/this/folder/does/not/exist")
        );
    }

    #[test]
    fn folder_without_certificates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"not a certificate").unwrap();
        fs::write(dir.path().join("garbage.der"), [0x30, 0x03, 0x02, 0x01]).unwrap();
        let certs = cert_folder_to_vec(dir.path().to_str().unwrap()).unwrap();
        assert!(certs.is_empty());
    }
}
