//! Download cache resolution: mapping a descriptor to a stable on-disk
//! archive path. The archive's existence at that path doubles as the
//! "already downloaded" signal.

use std::io;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Key identifying one cached download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub name: String,
    pub version: String,
    pub classifier: String,
    pub extension: String,
}

impl CacheDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        classifier: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            classifier: classifier.into(),
            extension: extension.into(),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            self.name, self.version, self.classifier, self.extension
        )
    }
}

/// Resolves a descriptor to a local file path. Must be deterministic:
/// the same descriptor always resolves to the same path.
pub trait CacheResolver {
    fn resolve(&self, descriptor: &CacheDescriptor) -> PathBuf;
}

/// Default resolver laying cached archives out as
/// `<root>/<name>/<version>/<name>-<version>-<classifier>.<extension>`.
#[derive(Debug, Clone)]
pub struct DirectoryCacheResolver {
    root: PathBuf,
}

impl DirectoryCacheResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolver rooted in the user-level cache directory.
    pub fn from_user_cache() -> io::Result<Self> {
        let dirs = ProjectDirs::from("com", "node-provision", "node-provision")
            .ok_or_else(|| io::Error::other("failed to determine project directories"))?;
        Ok(Self::new(dirs.cache_dir().join("downloads")))
    }
}

impl CacheResolver for DirectoryCacheResolver {
    fn resolve(&self, descriptor: &CacheDescriptor) -> PathBuf {
        self.root
            .join(&descriptor.name)
            .join(&descriptor.version)
            .join(descriptor.file_name())
    }
}
