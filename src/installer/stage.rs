//! Staging helpers: locating the node binary inside an extracted archive,
//! moving it into place, and bundling the npm tree that ships inside node
//! archives.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::InstallError;

/// Scripts inside `node_modules/npm/bin` that must end up executable.
const NPM_LAUNCHER_SCRIPTS: [&str; 2] = ["npm", "npm.cmd"];

/// Finds the node binary inside the staging directory.
///
/// The conventional location `<long_node_filename>/bin/<binary_name>` is
/// tried first. Archives occasionally use a different internal layout, so as
/// a fallback the whole tree is walked in lexical order and the first
/// regular file with a matching name wins. The lexical ordering makes the
/// fallback deterministic regardless of how the filesystem lists entries.
pub(crate) fn locate_binary(
    temp_dir: &Path,
    long_node_filename: &str,
    binary_name: &str,
) -> Result<PathBuf, InstallError> {
    let conventional = temp_dir
        .join(long_node_filename)
        .join("bin")
        .join(binary_name);
    if conventional.is_file() {
        return Ok(conventional);
    }

    let target = OsStr::new(binary_name);
    for entry in WalkDir::new(temp_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| InstallError::Filesystem {
            context: format!("could not search {}", temp_dir.display()),
            source: io::Error::other(e),
        })?;
        if entry.file_type().is_file() && entry.file_name() == target {
            return Ok(entry.into_path());
        }
    }

    Err(InstallError::BinaryNotFound { path: conventional })
}

/// Moves `source` to `destination`, explicitly deleting any existing
/// occupant first. Overwrite-in-place via rename is not assumed to work
/// everywhere.
pub(crate) fn replace_file(source: &Path, destination: &Path) -> Result<(), InstallError> {
    if destination.exists() {
        fs::remove_file(destination).map_err(|source| InstallError::Filesystem {
            context: format!("was not allowed to delete {}", destination.display()),
            source,
        })?;
    }

    fs::rename(source, destination).map_err(|e| InstallError::Filesystem {
        context: format!(
            "was not allowed to rename {} to {}",
            source.display(),
            destination.display()
        ),
        source: e,
    })
}

/// Adds the executable bits for owner, group, and other. No-op on
/// non-unix hosts.
#[cfg(unix)]
pub(crate) fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
pub(crate) fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Like [`set_executable`] but fatal, used for the node binary itself.
pub(crate) fn mark_executable(path: &Path) -> Result<(), InstallError> {
    set_executable(path).map_err(|source| InstallError::Filesystem {
        context: format!("was not allowed to make {} executable", path.display()),
        source,
    })
}

/// Copies the npm tree found in the extracted archive into the install
/// directory and marks its launcher scripts executable.
///
/// A missing source directory is tolerated silently: not every archive
/// layout ships one, and the installer has already validated that the
/// node/npm version combination is legal. Launcher chmod failures are
/// logged, not fatal.
pub(crate) fn bundle_npm(source_modules: &Path, node_dir: &Path) -> Result<(), InstallError> {
    if !source_modules.exists() {
        debug!(
            "no bundled node_modules at {}, skipping npm",
            source_modules.display()
        );
        return Ok(());
    }

    info!("extracting npm");
    let modules_dir = node_dir.join(super::NODE_MODULES_PATH);
    copy_dir_recursive(source_modules, &modules_dir).map_err(|source| {
        InstallError::Filesystem {
            context: format!(
                "could not copy {} to {}",
                source_modules.display(),
                modules_dir.display()
            ),
            source,
        }
    })?;

    let npm_bin = modules_dir.join("npm").join("bin");
    for script in NPM_LAUNCHER_SCRIPTS {
        let script_path = npm_bin.join(script);
        if script_path.exists() {
            match set_executable(&script_path) {
                Ok(()) => debug!("enabled executable at {}", script_path.display()),
                Err(err) => warn!(
                    "could not make {} executable: {err}",
                    script_path.display()
                ),
            }
        }
    }

    Ok(())
}

/// Deletes the staging directory. Failure is reported but not retried; a
/// leftover tmp directory must not fail an otherwise complete install.
pub(crate) fn remove_staging_dir(temp_dir: &Path) {
    if temp_dir.exists() {
        debug!("deleting temporary directory {}", temp_dir.display());
        if let Err(err) = fs::remove_dir_all(temp_dir) {
            warn!(
                "could not delete temporary directory {}: {err}",
                temp_dir.display()
            );
        }
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
