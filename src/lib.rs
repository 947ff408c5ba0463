//! Deterministic provisioning of a project-local Node.js runtime.
//!
//! Given a requested version and a download source, an install ends with
//! exactly that version usable under `<installDir>/node`, or a classified
//! [`InstallError`]. Downloads are cached and verified, partial downloads
//! are detected and cleared, and the windows/default platform variants are
//! handled transparently.
//!
//! ```no_run
//! use node_provision::{InstallRequest, NodeInstaller, NpmMode, Platform};
//!
//! # fn main() -> Result<(), node_provision::InstallError> {
//! let request = InstallRequest::new("v18.17.1", NpmMode::Provided)?;
//! let installer = NodeInstaller::new("./target", Platform::current())?;
//! installer.install(&request)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod exec;
pub mod extract;
pub mod installer;
pub mod platform;
pub mod verify;

pub use cache::{CacheDescriptor, CacheResolver, DirectoryCacheResolver};
pub use download::{Credentials, DownloadError, FileDownloader, HttpFileDownloader};
pub use error::InstallError;
pub use exec::{CommandExecutor, ProcessError, ProcessExecutor};
pub use extract::{ArchiveExtractor, DefaultArchiveExtractor, ExtractError};
pub use installer::{InstallRequest, NodeInstaller, NpmMode, VERSION_PROVIDED};
pub use platform::{Arch, Os, Platform};
