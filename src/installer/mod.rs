//! The install orchestrator: sequences download, verification, staging, and
//! npm bundling under a single process-wide lock, and classifies every
//! failure as an [`InstallError`].

mod probe;
mod stage;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::cache::{CacheDescriptor, CacheResolver, DirectoryCacheResolver};
use crate::download::{Credentials, FileDownloader, HttpFileDownloader};
use crate::error::InstallError;
use crate::exec::{CommandExecutor, ProcessExecutor};
use crate::extract::{ArchiveExtractor, DefaultArchiveExtractor, ExtractError};
use crate::platform::Platform;
use crate::verify::verify_download_hash;

/// Subdirectory of the install directory that owns the runtime.
pub const INSTALL_PATH: &str = "node";
pub const NODE_MODULES_PATH: &str = "node_modules";
/// Sentinel node version meaning "the download root is the complete archive
/// URL"; as an npm version it means "bundled with node, do not install
/// separately".
pub const VERSION_PROVIDED: &str = "provided";

/// Serializes every `install()` in this process. The install directory and
/// its tmp subdirectory are shared mutable state; concurrent calls would
/// corrupt them. Cross-process callers are on their own.
static LOCK: Mutex<()> = Mutex::new(());

/// How npm should be provisioned alongside node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NpmMode {
    /// No npm requested through this installer.
    #[default]
    Default,
    /// Use the npm bundled inside the node archive.
    Provided,
    /// A separately installed npm version; irrelevant to this installer
    /// beyond "not bundled".
    Version(String),
}

impl NpmMode {
    /// Maps an optional configured npm version string to a mode, treating
    /// the `"provided"` sentinel specially.
    pub fn from_version(version: Option<&str>) -> Self {
        match version {
            None => NpmMode::Default,
            Some(VERSION_PROVIDED) => NpmMode::Provided,
            Some(other) => NpmMode::Version(other.to_string()),
        }
    }

    fn is_provided(&self) -> bool {
        matches!(self, NpmMode::Provided)
    }
}

/// One validated install request. Built once, immutable thereafter; the
/// node/npm version compatibility invariant is checked at construction,
/// before any I/O can happen.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    node_version: String,
    npm_mode: NpmMode,
    download_root: Option<String>,
    credentials: Option<Credentials>,
    download_hash: Option<String>,
}

impl InstallRequest {
    pub fn new(node_version: impl Into<String>, npm_mode: NpmMode) -> Result<Self, InstallError> {
        let node_version = node_version.into();
        validate(&node_version, &npm_mode)?;
        Ok(Self {
            node_version,
            npm_mode,
            download_root: None,
            credentials: None,
            download_hash: None,
        })
    }

    /// Overrides the download root. For the `"provided"` node version this
    /// must be the complete archive URL.
    pub fn with_download_root(mut self, download_root: impl Into<String>) -> Self {
        let root = download_root.into();
        self.download_root = (!root.is_empty()).then_some(root);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Expected SHA-256 hex digest of the downloaded archive. Verification
    /// only runs when this is set.
    pub fn with_download_hash(mut self, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        self.download_hash = (!hash.trim().is_empty()).then_some(hash);
        self
    }

    pub fn node_version(&self) -> &str {
        &self.node_version
    }

    pub fn npm_mode(&self) -> &NpmMode {
        &self.npm_mode
    }
}

fn validate(node_version: &str, npm_mode: &NpmMode) -> Result<(), InstallError> {
    if node_version.trim().is_empty() {
        return Err(InstallError::Validation(
            "node version must be set".to_string(),
        ));
    }

    // Node did not bundle npm before v4.0.0.
    if npm_mode.is_provided() && node_version != VERSION_PROVIDED {
        let bare = node_version.trim().trim_start_matches('v');
        let version = semver::Version::parse(bare).map_err(|e| {
            InstallError::Validation(format!("could not parse node version '{node_version}': {e}"))
        })?;
        if version.major < 4 {
            return Err(InstallError::Validation(format!(
                "npm version is 'provided' but Node didn't include npm prior to v4.0.0 \
                 (requested node {node_version})"
            )));
        }
    }

    Ok(())
}

/// Installs one node version (and optionally its bundled npm) into a
/// project-local install directory.
pub struct NodeInstaller {
    install_directory: PathBuf,
    platform: Platform,
    cache: Box<dyn CacheResolver>,
    downloader: Box<dyn FileDownloader>,
    extractor: Box<dyn ArchiveExtractor>,
    executor: Box<dyn ProcessExecutor>,
}

impl NodeInstaller {
    /// Installer with the default collaborators: HTTP downloader, tar/zip
    /// extractor, user-level download cache, and real process execution.
    pub fn new(
        install_directory: impl Into<PathBuf>,
        platform: Platform,
    ) -> Result<Self, InstallError> {
        let cache = DirectoryCacheResolver::from_user_cache().map_err(|source| {
            InstallError::Filesystem {
                context: "could not determine the download cache directory".to_string(),
                source,
            }
        })?;
        Ok(Self::with_collaborators(
            install_directory,
            platform,
            Box::new(cache),
            Box::new(HttpFileDownloader),
            Box::new(DefaultArchiveExtractor),
            Box::new(CommandExecutor),
        ))
    }

    pub fn with_collaborators(
        install_directory: impl Into<PathBuf>,
        platform: Platform,
        cache: Box<dyn CacheResolver>,
        downloader: Box<dyn FileDownloader>,
        extractor: Box<dyn ArchiveExtractor>,
        executor: Box<dyn ProcessExecutor>,
    ) -> Self {
        Self {
            install_directory: install_directory.into(),
            platform,
            cache,
            downloader,
            extractor,
            executor,
        }
    }

    /// Runs the full provisioning sequence for one request.
    ///
    /// Returns immediately when the installed binary already reports the
    /// requested version. Otherwise the flow is: resolve cache slot,
    /// download if missing, verify, extract into the staging area, relocate
    /// the binary, bundle npm when requested, clean up.
    pub fn install(&self, request: &InstallRequest) -> Result<(), InstallError> {
        let _guard = LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let download_root = request
            .download_root
            .clone()
            .unwrap_or_else(|| self.platform.download_root().to_string());

        let node_path = self.node_directory().join(self.platform.binary_name());
        if probe::node_is_already_installed(
            self.executor.as_ref(),
            &node_path,
            &request.node_version,
        ) {
            return Ok(());
        }

        info!("installing node version {}", request.node_version);
        if request.node_version != VERSION_PROVIDED && !request.node_version.starts_with('v') {
            warn!("node version does not start with naming convention 'v'");
        }

        if request.node_version == VERSION_PROVIDED {
            // The download root is the complete archive URL; no filename
            // templating, installed through the default flow.
            self.install_from_archive(request, download_root)
        } else if self.platform.is_windows() {
            if request.npm_mode.is_provided() {
                self.install_windows_with_npm(request, &download_root)
            } else {
                self.install_windows_bare(request, &download_root)
            }
        } else {
            let url = format!(
                "{download_root}{}",
                self.platform.download_filename(&request.node_version, false)
            );
            self.install_from_archive(request, url)
        }
    }

    /// Default flow: versioned tar.gz archive, staged extraction, binary
    /// relocation, optional npm bundling.
    fn install_from_archive(
        &self,
        request: &InstallRequest,
        url: String,
    ) -> Result<(), InstallError> {
        let node_dir = self.create_node_directory()?;
        let temp_dir = self.create_temp_directory()?;
        let long_node_filename = self.platform.long_node_filename(&request.node_version);

        let descriptor = CacheDescriptor::new(
            "node",
            &request.node_version,
            self.platform.classifier(),
            self.platform.archive_extension(),
        );
        let archive = self.cache.resolve(&descriptor);

        self.download_if_missing(&url, &archive, request.credentials.as_ref())?;
        verify_download_hash(&archive, request.download_hash.as_deref())?;
        self.extract_with_cleanup(&archive, &temp_dir)?;

        let binary =
            stage::locate_binary(&temp_dir, &long_node_filename, self.platform.binary_name())?;
        let destination = node_dir.join(self.platform.binary_name());
        info!(
            "copying node binary from {} to {}",
            binary.display(),
            destination.display()
        );
        stage::replace_file(&binary, &destination)?;
        stage::mark_executable(&destination)?;

        if request.npm_mode.is_provided() {
            let bundled_modules = temp_dir
                .join(&long_node_filename)
                .join("lib")
                .join(NODE_MODULES_PATH);
            stage::bundle_npm(&bundled_modules, &node_dir)?;
        }

        stage::remove_staging_dir(&temp_dir);
        info!("installed node locally");
        Ok(())
    }

    /// Windows flow with bundled npm: a zip holding `node.exe` and
    /// `node_modules` directly under the archive's internal folder.
    fn install_windows_with_npm(
        &self,
        request: &InstallRequest,
        download_root: &str,
    ) -> Result<(), InstallError> {
        let node_dir = self.create_node_directory()?;
        let temp_dir = self.create_temp_directory()?;
        let long_node_filename = self.platform.long_node_filename(&request.node_version);
        let url = format!(
            "{download_root}{}",
            self.platform.download_filename(&request.node_version, true)
        );

        let descriptor = CacheDescriptor::new(
            "node",
            &request.node_version,
            self.platform.classifier(),
            self.platform.archive_extension(),
        );
        let archive = self.cache.resolve(&descriptor);

        self.download_if_missing(&url, &archive, request.credentials.as_ref())?;
        verify_download_hash(&archive, request.download_hash.as_deref())?;
        self.extract_with_cleanup(&archive, &temp_dir)?;

        // Windows archives keep node.exe at the top of the internal folder;
        // there is no fallback search here.
        let binary = temp_dir
            .join(&long_node_filename)
            .join(self.platform.binary_name());
        if !binary.exists() {
            return Err(InstallError::BinaryNotFound { path: binary });
        }

        let destination = node_dir.join(self.platform.binary_name());
        info!(
            "copying node binary from {} to {}",
            binary.display(),
            destination.display()
        );
        stage::replace_file(&binary, &destination)?;

        let bundled_modules = temp_dir.join(&long_node_filename).join(NODE_MODULES_PATH);
        stage::bundle_npm(&bundled_modules, &node_dir)?;

        stage::remove_staging_dir(&temp_dir);
        info!("installed node locally");
        Ok(())
    }

    /// Windows flow without npm: a bare `node.exe`, no archive and no
    /// staging. The cached file is copied, not moved, so the cache entry
    /// survives.
    fn install_windows_bare(
        &self,
        request: &InstallRequest,
        download_root: &str,
    ) -> Result<(), InstallError> {
        let node_dir = self.create_node_directory()?;
        let url = format!(
            "{download_root}{}",
            self.platform.download_filename(&request.node_version, false)
        );

        let descriptor = CacheDescriptor::new(
            "node",
            &request.node_version,
            self.platform.classifier(),
            "exe",
        );
        let binary = self.cache.resolve(&descriptor);

        self.download_if_missing(&url, &binary, request.credentials.as_ref())?;

        let destination = node_dir.join(self.platform.binary_name());
        info!(
            "copying node binary from {} to {}",
            binary.display(),
            destination.display()
        );
        fs::copy(&binary, &destination).map_err(|source| InstallError::Filesystem {
            context: format!(
                "was not allowed to copy {} to {}",
                binary.display(),
                destination.display()
            ),
            source,
        })?;

        info!("installed node locally");
        Ok(())
    }

    fn download_if_missing(
        &self,
        url: &str,
        destination: &Path,
        credentials: Option<&Credentials>,
    ) -> Result<(), InstallError> {
        if destination.exists() {
            debug!("using cached download at {}", destination.display());
            return Ok(());
        }

        info!("downloading {url} to {}", destination.display());
        self.downloader
            .download(url, destination, credentials)
            .map_err(|source| InstallError::Download {
                url: url.to_string(),
                source,
            })
    }

    /// Extracts the archive into the staging area. A truncated archive is a
    /// corrupt download: both the cache slot and the staging area are
    /// cleared (best-effort) so the next attempt starts from scratch.
    fn extract_with_cleanup(&self, archive: &Path, temp_dir: &Path) -> Result<(), InstallError> {
        info!(
            "unpacking {} into {}",
            archive.display(),
            temp_dir.display()
        );
        match self.extractor.extract(archive, temp_dir) {
            Ok(()) => Ok(()),
            Err(err @ ExtractError::SourceIncomplete { .. }) => {
                error!(
                    "the archive file {} is corrupted and will be deleted, please try again",
                    archive.display()
                );
                let _ = fs::remove_file(archive);
                let _ = fs::remove_dir_all(temp_dir);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn node_directory(&self) -> PathBuf {
        self.install_directory.join(INSTALL_PATH)
    }

    fn create_node_directory(&self) -> Result<PathBuf, InstallError> {
        let dir = self.node_directory();
        if !dir.exists() {
            debug!("creating install directory {}", dir.display());
            fs::create_dir_all(&dir).map_err(|source| InstallError::Filesystem {
                context: format!("could not create install directory {}", dir.display()),
                source,
            })?;
        }
        Ok(dir)
    }

    fn create_temp_directory(&self) -> Result<PathBuf, InstallError> {
        let dir = self.node_directory().join("tmp");
        if !dir.exists() {
            debug!("creating temporary directory {}", dir.display());
            fs::create_dir_all(&dir).map_err(|source| InstallError::Filesystem {
                context: format!("could not create temporary directory {}", dir.display()),
                source,
            })?;
        }
        Ok(dir)
    }
}
