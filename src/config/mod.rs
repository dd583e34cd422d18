//! Command configuration and environment handling

mod duration;

pub use duration::ApiTimeout;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default availability zones when `--zones` is not given
pub const ZONES_ENV: &str = "EKS_AVAILABILITY_ZONES";
/// Overrides the eksboot home directory (default `~/.eksboot`)
pub const HOME_ENV: &str = "EKSBOOT_HOME";

pub const DEFAULT_NODE_TYPE: &str = "m5.large";

/// Options for `eksboot create eks`.
///
/// Numeric options use a negative value and string options an empty string
/// to mean "not provided"; unset options are left out of the eksctl command.
#[derive(Debug, Clone, PartialEq)]
pub struct EksFlags {
    pub cluster_name: String,
    pub node_type: String,
    pub node_count: i32,
    pub nodes_min: i32,
    pub nodes_max: i32,
    pub region: String,
    pub zones: String,
    pub profile: String,
    pub ssh_public_key: String,
    /// eksctl log verbosity
    pub verbose: i32,
    pub aws_api_timeout: ApiTimeout,
}

impl Default for EksFlags {
    fn default() -> Self {
        Self {
            cluster_name: String::new(),
            node_type: DEFAULT_NODE_TYPE.to_string(),
            node_count: -1,
            nodes_min: -1,
            nodes_max: -1,
            region: String::new(),
            zones: String::new(),
            profile: String::new(),
            ssh_public_key: String::new(),
            verbose: -1,
            aws_api_timeout: ApiTimeout::default(),
        }
    }
}

impl EksFlags {
    /// Zones from the flag, falling back to `EKS_AVAILABILITY_ZONES`
    pub fn effective_zones(&self, env: &dyn Fn(&str) -> Option<String>) -> String {
        if !self.zones.is_empty() {
            return self.zones.clone();
        }
        env(ZONES_ENV).unwrap_or_default()
    }
}

/// Read a process environment variable, treating invalid unicode as unset
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Directory holding eksboot state (`$EKSBOOT_HOME` or `~/.eksboot`)
pub fn eksboot_home() -> Result<PathBuf> {
    if let Some(home) = process_env(HOME_ENV).filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".eksboot"))
}

/// Directory where downloaded tools are installed
pub fn bin_dir() -> Result<PathBuf> {
    Ok(eksboot_home()?.join("bin"))
}

/// Load `.env` files from the working directory and the eksboot home.
///
/// Variables already present in the process environment are never overridden.
/// Returns the files that were loaded.
pub fn load_env_files(cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = vec![cwd.join(".env")];
    if let Ok(home) = eksboot_home() {
        candidates.push(home.join(".env"));
    }

    let mut loaded = Vec::new();
    for path in candidates {
        if !path.is_file() || loaded.contains(&path) {
            continue;
        }
        dotenv::from_path(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        loaded.push(path);
    }
    Ok(loaded)
}
