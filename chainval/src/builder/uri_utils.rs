//! Contains utility functions related to downloading artifacts from URIs and to interpreting the
//! payloads that come back.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use der::asn1::ObjectIdentifier;
use der::Decode;
use log::{debug, error};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::AuthorityInfoAccessSyntax;
use x509_cert::Certificate;

use crate::util::error::*;
use crate::ChainCertificate;

#[cfg(feature = "remote")]
use cms::{cert::CertificateChoices, content_info::ContentInfo, signed_data::SignedData};

#[cfg(feature = "remote")]
use der::Encode;

#[cfg(feature = "remote")]
use core::time::Duration;

#[cfg(feature = "remote")]
use crate::{is_absolute_http_uri, AssetDownloader, CBS_URL_RETRIEVAL_TIMEOUT_DEFAULT};

/// decode_aia_der implements the [`DecodeAia`](crate::DecodeAia) interface for
/// [`ChainEnvironment`](crate::ChainEnvironment) using the x509-cert `AuthorityInfoAccessSyntax`
/// definition. Only URI access locations are returned.
pub fn decode_aia_der(enc_aia: &[u8]) -> Result<Vec<(ObjectIdentifier, String)>> {
    let aia = AuthorityInfoAccessSyntax::from_der(enc_aia)?;
    Ok(aia
        .0
        .iter()
        .filter_map(|ad| match &ad.access_location {
            GeneralName::UniformResourceIdentifier(uri) => {
                Some((ad.access_method, uri.to_string()))
            }
            _ => None,
        })
        .collect())
}

/// `certs_from_p7` takes a buffer that notionally contains a degenerate certs-only SignedData
/// message and returns the certificates it carries.
#[cfg(feature = "remote")]
fn certs_from_p7(bytes: &[u8], locator: &str) -> Vec<ChainCertificate> {
    let mut retval = Vec::new();
    let ci = match ContentInfo::from_der(bytes) {
        Ok(ci) => ci,
        Err(_) => return retval,
    };
    let sd = match ci
        .content
        .to_der()
        .and_then(|content| SignedData::from_der(content.as_slice()))
    {
        Ok(sd) => sd,
        Err(e) => {
            error!("Failed to parse SignedData from {} with {:?}", locator, e);
            return retval;
        }
    };
    if let Some(certs) = sd.certificates {
        for choice in certs.0.iter() {
            if let CertificateChoices::Certificate(c) = choice {
                match ChainCertificate::try_from(c.clone()) {
                    Ok(mut cert) => {
                        cert.locator = Some(locator.to_string());
                        retval.push(cert);
                    }
                    Err(e) => error!("Failed to encode certificate from {}: {}", locator, e),
                }
            }
        }
    }
    retval
}

#[cfg(not(feature = "remote"))]
fn certs_from_p7(_bytes: &[u8], _locator: &str) -> Vec<ChainCertificate> {
    Vec::new()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// `certificates_from_buffer` interprets a downloaded or file-backed payload. A payload may be a
/// single DER-encoded certificate, a chain of PEM CERTIFICATE blocks or, with the `remote`
/// feature, a certs-only PKCS #7 message (DER or a single PEM PKCS7 block). Anything else yields an
/// empty vector.
pub fn certificates_from_buffer(bytes: &[u8], locator: &str) -> Vec<ChainCertificate> {
    if let Ok(mut cert) = ChainCertificate::try_from(bytes) {
        cert.locator = Some(locator.to_string());
        return alloc::vec![cert];
    }

    if find_subslice(bytes, b"-----BEGIN CERTIFICATE-----").is_some() {
        match Certificate::load_pem_chain(bytes) {
            Ok(certs) => {
                let retval: Vec<ChainCertificate> = certs
                    .into_iter()
                    .filter_map(|c| match ChainCertificate::try_from(c) {
                        Ok(mut cert) => {
                            cert.locator = Some(locator.to_string());
                            Some(cert)
                        }
                        Err(e) => {
                            error!("Failed to encode PEM certificate from {}: {}", locator, e);
                            None
                        }
                    })
                    .collect();
                if !retval.is_empty() {
                    return retval;
                }
            }
            Err(e) => error!("Failed to parse PEM certificates from {}: {}", locator, e),
        }
    }

    if let Ok((label, der)) = pem_rfc7468::decode_vec(bytes) {
        return match label {
            "PKCS7" | "CMS" => certs_from_p7(&der, locator),
            _ => {
                debug!("Ignoring {} block from {}", label, locator);
                Vec::new()
            }
        };
    }

    certs_from_p7(bytes, locator)
}

/// [`HttpAssetDownloader`] implements [`AssetDownloader`] using a blocking `reqwest` client. Only
/// `http` URIs are fetched. Each request is bounded by the smaller of the remaining time budget and
/// `max_timeout`.
#[cfg(feature = "remote")]
#[derive(Clone, Debug)]
pub struct HttpAssetDownloader {
    /// Upper bound on the time spent on any single request
    pub max_timeout: Duration,
}

#[cfg(feature = "remote")]
impl Default for HttpAssetDownloader {
    fn default() -> Self {
        HttpAssetDownloader {
            max_timeout: CBS_URL_RETRIEVAL_TIMEOUT_DEFAULT,
        }
    }
}

#[cfg(feature = "remote")]
impl HttpAssetDownloader {
    /// Creates a downloader with the given per-request upper bound
    pub fn new(max_timeout: Duration) -> Self {
        HttpAssetDownloader { max_timeout }
    }
}

#[cfg(feature = "remote")]
impl AssetDownloader for HttpAssetDownloader {
    fn download(&self, uri: &str, timeout: Duration) -> Result<Vec<u8>> {
        if !is_absolute_http_uri(uri) {
            debug!("Not downloading {}: only http URIs are supported", uri);
            return Err(Error::InvalidUriScheme);
        }
        let timeout = core::cmp::min(timeout, self.max_timeout);
        if timeout.is_zero() {
            return Err(Error::NetworkError);
        }

        let client = match reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
        {
            Ok(client) => client,
            Err(_e) => return Err(Error::Unrecognized),
        };

        let response = match client.get(uri).send() {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to download {}: {}", uri, e);
                return Err(Error::NetworkError);
            }
        };
        if !response.status().is_success() {
            error!("Failed to download {}: HTTP status {}", uri, response.status());
            return Err(Error::NetworkError);
        }
        match response.bytes() {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                error!("Failed to read response body from {}: {}", uri, e);
                Err(Error::NetworkError)
            }
        }
    }
}
