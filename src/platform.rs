//! Target platform description: operating system, architecture, and the
//! nodejs.org download naming that follows from them.

pub const DEFAULT_DOWNLOAD_ROOT: &str = "https://nodejs.org/dist/";
pub const NODE_WINDOWS_EXECUTABLE: &str = "node.exe";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// The short name used in nodejs.org download classifiers.
    pub fn codename(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::MacOs => "darwin",
            Os::Windows => "win",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    X86,
    Arm64,
}

impl Arch {
    pub fn codename(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
        }
    }
}

/// The platform an install targets. Normally built with [`Platform::current`],
/// but any combination can be constructed, so the windows branches are
/// exercisable from any host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        };

        let arch = if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") {
            Arch::Arm64
        } else {
            Arch::X64
        };

        Self { os, arch }
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Name of the node executable inside an archive and in the install
    /// directory.
    pub fn binary_name(&self) -> &'static str {
        if self.is_windows() {
            NODE_WINDOWS_EXECUTABLE
        } else {
            "node"
        }
    }

    pub fn archive_extension(&self) -> &'static str {
        if self.is_windows() {
            "zip"
        } else {
            "tar.gz"
        }
    }

    /// Platform/architecture tag selecting the archive variant, e.g.
    /// `linux-x64` or `win-x64`.
    pub fn classifier(&self) -> String {
        format!("{}-{}", self.os.codename(), self.arch.codename())
    }

    pub fn download_root(&self) -> &'static str {
        DEFAULT_DOWNLOAD_ROOT
    }

    /// Top-level folder name inside a node archive, e.g.
    /// `node-v18.17.1-linux-x64`. Versions follow the nodejs.org convention
    /// of carrying a leading `v`.
    pub fn long_node_filename(&self, version: &str) -> String {
        format!("node-{}-{}", version, self.classifier())
    }

    /// Path of the download relative to the download root.
    ///
    /// Windows installs without a bundled npm fetch a bare `node.exe`;
    /// everything else fetches a versioned archive.
    pub fn download_filename(&self, version: &str, npm_bundled: bool) -> String {
        if self.is_windows() && !npm_bundled {
            format!("{}/{}/{}", version, self.classifier(), NODE_WINDOWS_EXECUTABLE)
        } else {
            format!(
                "{}/{}.{}",
                version,
                self.long_node_filename(version),
                self.archive_extension()
            )
        }
    }
}
