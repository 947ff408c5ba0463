//! Probing an existing install for its version.

use std::path::Path;

use tracing::{info, warn};

use crate::exec::ProcessExecutor;

/// Returns true when a binary at `node_path` exists and reports exactly the
/// requested version.
///
/// A missing binary, a binary that cannot be executed, or one that reports a
/// different version all answer "not installed". Probe failures are logged
/// but never fatal: a broken existing binary must not block reinstallation.
pub(crate) fn node_is_already_installed(
    executor: &dyn ProcessExecutor,
    node_path: &Path,
    requested_version: &str,
) -> bool {
    if !node_path.exists() {
        return false;
    }

    match executor.run(node_path, &["--version"]) {
        Ok(output) => {
            let installed = output.trim();
            if installed == requested_version {
                info!("node {installed} is already installed");
                true
            } else {
                info!("node {installed} was installed, but we need version {requested_version}");
                false
            }
        }
        Err(err) => {
            warn!("unable to determine current node version: {err}");
            false
        }
    }
}
