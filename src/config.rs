//! Project-local configuration file. The larger build tool drops a
//! `node-provision.json` next to the project; CLI flags override it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::download::Credentials;

pub const DEFAULT_CONFIG_FILE: &str = "node-provision.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvisionConfig {
    /// Node version to install, e.g. "v18.17.1", or the "provided" sentinel.
    pub node_version: Option<String>,
    /// npm version; "provided" selects the npm bundled with node.
    pub npm_version: Option<String>,
    /// Download root override, or the complete URL for "provided" node.
    pub node_download_root: Option<String>,
    /// Expected SHA-256 hex digest of the download.
    pub node_download_hash: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Directory the `node/` install tree is created under.
    pub install_directory: Option<PathBuf>,
}

impl ProvisionConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Loads the config file, returning defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<ProvisionConfig> {
    if !path.exists() {
        return Ok(ProvisionConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}
