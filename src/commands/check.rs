//! Check command - report (and install) the external tools eksboot drives

use crate::config;
use crate::error::{Error, Result};
use crate::services::toolchain::{
    AWS_IAM_AUTHENTICATOR, DependencyInstaller, EKSCTL, HELM, KUBECTL, Toolchain,
};
use tracing::{debug, info};

/// Every tool a full `create` run may need
pub const ALL_TOOLS: &[&str] = &[EKSCTL, AWS_IAM_AUTHENTICATOR, KUBECTL, HELM];

pub fn handle_check(no_install: bool) -> Result<()> {
    let toolchain = Toolchain::new(config::bin_dir()?);
    debug!("Tool directory: {}", toolchain.bin_dir().display());
    check_tools(&toolchain, no_install)
}

/// Report each tool and install missing ones unless `no_install` is set
pub fn check_tools(deps: &dyn DependencyInstaller, no_install: bool) -> Result<()> {
    let missing = deps.missing(ALL_TOOLS);
    for tool in ALL_TOOLS {
        if missing.iter().any(|m| m == tool) {
            info!("✗ {} is not installed", tool);
        } else {
            info!("✓ {} is installed", tool);
        }
    }

    if missing.is_empty() {
        return Ok(());
    }
    if no_install {
        return Err(Error::missing_dependency(
            &missing,
            anyhow::anyhow!("installation skipped (--no-install)"),
        ));
    }
    deps.install(&missing)
        .map_err(|source| Error::missing_dependency(&missing, source))
}
