//! Failure taxonomy for one `install()` attempt. Every downstream failure
//! surfaces as one of these variants with the original cause attached;
//! nothing is retried within a call.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;
use crate::extract::ExtractError;

#[derive(Debug, Error)]
pub enum InstallError {
    /// The request itself is invalid; raised before any I/O.
    #[error("invalid install request: {0}")]
    Validation(String),

    #[error("could not download Node.js from {url}")]
    Download {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// The downloaded archive does not match the configured SHA-256 hash.
    #[error("SHA-256 hash of the download does not match: expected '{expected}', got '{actual}'")]
    Integrity { expected: String, actual: String },

    #[error("could not extract the Node archive")]
    Extract(#[from] ExtractError),

    /// The extracted archive did not contain the node binary anywhere.
    #[error("could not find the downloaded Node.js binary in {path}")]
    BinaryNotFound { path: PathBuf },

    #[error("could not install Node: {context}")]
    Filesystem {
        context: String,
        #[source]
        source: io::Error,
    },
}
