//! Resolves a [`Resource`] to verified, decompressed bytes (§4.3). Nothing
//! downstream of [`fetch`] ever sees compressed bytes or an unverified hash.

mod data_url;
mod http;

use std::io::Read as _;
use std::time::Duration;

use anyhow::{bail, Context, Error};
use log::debug;
use sha2::{Digest, Sha256, Sha512};

use ignition_api::config::{Compression, Resource};
use ignition_api::primitives::Hash;

pub use http::Deadlines;

/// Fetches and verifies a [`Resource`], returning its decompressed contents.
///
/// Hash verification (when `resource.verification.hash` is set) covers the
/// bytes exactly as transmitted; decompression, if any, happens after.
pub fn fetch(resource: &Resource, deadlines: Deadlines, ca_bundle: Option<&[u8]>) -> Result<Vec<u8>, Error> {
    let raw = fetch_raw(resource, deadlines, ca_bundle)?;

    if let Some(hash) = resource.verification.as_ref().and_then(|v| v.hash.as_ref()) {
        verify_hash(&raw, hash)?;
    }

    match resource.compression {
        Some(Compression::Gzip) => decompress_gzip(&raw),
        None => Ok(raw),
    }
}

/// Like [`fetch`], but a 404 on a resource marked `optional` (§4.3) comes
/// back as `Ok(None)` instead of propagating. Every other failure, and a 404
/// on a resource that isn't optional, is still fatal.
pub fn fetch_optional(resource: &Resource, deadlines: Deadlines, ca_bundle: Option<&[u8]>) -> Result<Option<Vec<u8>>, Error> {
    match fetch(resource, deadlines, ca_bundle) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if resource.optional() && http::is_not_found(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

fn fetch_raw(resource: &Resource, deadlines: Deadlines, ca_bundle: Option<&[u8]>) -> Result<Vec<u8>, Error> {
    let url = &resource.source;

    match url.scheme() {
        "data" => data_url::decode(url),
        "http" | "https" => http::get(url, &resource.http_headers, ca_bundle, deadlines),
        "tftp" | "s3" | "gs" => bail!("fetching via scheme '{}' is not supported by this build", url.scheme()),
        other => bail!("unsupported URL scheme '{other}' in '{url}'"),
    }
}

/// Raised by [`verify_hash`] so callers can tell a hash mismatch apart from
/// every other fetch failure (§7's `HashMismatch` taxonomy entry) via
/// `anyhow::Error::downcast_ref`, without `fetch`/`fetch_raw` needing a typed
/// return value.
#[derive(Debug)]
pub struct HashMismatchError {
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for HashMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hash mismatch: expected {}, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for HashMismatchError {}

fn verify_hash(bytes: &[u8], expected: &Hash) -> Result<(), Error> {
    let actual_hex = match expected {
        Hash::Sha256(_) => hex::encode(Sha256::digest(bytes)),
        Hash::Sha512(_) => hex::encode(Sha512::digest(bytes)),
    };

    if actual_hex != expected.hex() {
        return Err(Error::new(HashMismatchError {
            expected: format!("{}-{}", expected.algorithm(), expected.hex()),
            actual: format!("{}-{}", expected.algorithm(), actual_hex),
        }));
    }

    debug!("verified {} hash", expected.algorithm());
    Ok(())
}

fn decompress_gzip(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .context("failed to gzip-decompress resource")?;
    Ok(out)
}

/// Default deadlines: 10s per-attempt response-headers timeout, no overall
/// deadline, matching `Timeouts::default()`.
pub fn default_deadlines() -> Deadlines {
    Deadlines {
        response_headers: Duration::from_secs(10),
        total: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(source: &str) -> Resource {
        Resource {
            source: url::Url::parse(source).unwrap(),
            compression: None,
            verification: None,
            http_headers: vec![],
            optional: None,
        }
    }

    #[test]
    fn fetches_plain_data_url() {
        let r = resource("data:,hello");
        let bytes = fetch(&r, default_deadlines(), None).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn verifies_matching_sha256_hash() {
        let mut r = resource("data:,hello");
        let expected = hex::encode(Sha256::digest(b"hello"));
        r.verification = Some(ignition_api::config::Verification {
            hash: Some(Hash::Sha256(expected)),
        });
        assert_eq!(fetch(&r, default_deadlines(), None).unwrap(), b"hello");
    }

    #[test]
    fn rejects_mismatched_hash() {
        let mut r = resource("data:,hello");
        r.verification = Some(ignition_api::config::Verification {
            hash: Some(Hash::Sha256("0".repeat(64))),
        });
        assert!(fetch(&r, default_deadlines(), None).is_err());
    }

    #[test]
    fn unsupported_scheme_fails_cleanly() {
        let r = resource("tftp://example/x");
        assert!(fetch(&r, default_deadlines(), None).is_err());
    }

    #[test]
    fn hash_mismatch_downcasts_to_hash_mismatch_error() {
        let mut r = resource("data:,hello");
        r.verification = Some(ignition_api::config::Verification {
            hash: Some(Hash::Sha256("0".repeat(64))),
        });
        let err = fetch(&r, default_deadlines(), None).unwrap_err();
        assert!(err.downcast_ref::<HashMismatchError>().is_some());
    }

    #[test]
    fn fetch_optional_propagates_non_404_failures_even_when_optional() {
        let mut r = resource("tftp://example/x");
        r.optional = Some(true);
        assert!(fetch_optional(&r, default_deadlines(), None).is_err());
    }
}
