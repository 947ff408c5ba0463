//! SHA-256 integrity verification of downloaded archives.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::InstallError;

/// Checks a downloaded file against an expected SHA-256 hex digest.
///
/// Verification is opt-in: when no hash is configured (or the configured
/// value is blank) nothing is read and the check passes. The comparison is
/// case-insensitive.
pub fn verify_download_hash(
    archive: &Path,
    expected_hash: Option<&str>,
) -> Result<(), InstallError> {
    let expected = match expected_hash.map(str::trim) {
        Some(hash) if !hash.is_empty() => hash,
        _ => return Ok(()),
    };

    let bytes = fs::read(archive).map_err(|source| InstallError::Filesystem {
        context: format!("could not read {} for verification", archive.display()),
        source,
    })?;

    let actual = format!("{:x}", Sha256::digest(&bytes));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        warn!(
            expected = %expected,
            actual = %actual,
            "SHA-256 hash does not match expected hash"
        );
        Err(InstallError::Integrity {
            expected: expected.to_string(),
            actual,
        })
    }
}
