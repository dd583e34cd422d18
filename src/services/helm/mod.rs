//! Platform installation with Helm
//!
//! Runs after a cluster has been provisioned: checks the cluster is reachable
//! and installs (or upgrades) the platform chart into it.

use crate::error::{Error, Result};
use crate::logging::OutputMode;
use crate::services::toolchain::{DependencyInstaller, HELM, KUBECTL};
use crate::utils::exec::{CommandExecutor, display_command};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Cloud provider the cluster was created on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Eks,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Eks => "eks",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-provisioning step run against a freshly created cluster
pub trait PlatformInstaller {
    fn init_and_install(&self, provider: Provider) -> Result<()>;
}

/// Where and what to install
#[derive(Debug, Clone, PartialEq)]
pub struct InstallOptions {
    pub skip_installation: bool,
    pub namespace: String,
    pub release: String,
    pub chart: String,
    pub repo_name: String,
    pub repo_url: String,
    pub values: Option<PathBuf>,
    pub set: Vec<String>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            skip_installation: false,
            namespace: "jx".to_string(),
            release: "jenkins-x".to_string(),
            chart: "jenkins-x/jenkins-x-platform".to_string(),
            repo_name: "jenkins-x".to_string(),
            repo_url: "https://jenkins-x-charts.github.io/v2".to_string(),
            values: None,
            set: Vec::new(),
        }
    }
}

/// `helm upgrade --install` arguments for the platform chart
pub fn build_upgrade_args(opts: &InstallOptions, provider: Provider) -> Vec<String> {
    let mut args: Vec<String> = [
        "upgrade",
        "--install",
        opts.release.as_str(),
        opts.chart.as_str(),
        "--namespace",
        opts.namespace.as_str(),
        "--create-namespace",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push("--set".to_string());
    args.push(format!("cloud.provider={}", provider));

    if let Some(values) = &opts.values {
        args.push("--values".to_string());
        args.push(values.display().to_string());
    }
    for set in &opts.set {
        args.push("--set".to_string());
        args.push(set.clone());
    }
    args
}

/// Installs the platform chart with the helm CLI
pub struct HelmPlatformInstaller<'a> {
    pub exec: &'a dyn CommandExecutor,
    pub deps: &'a dyn DependencyInstaller,
    pub options: InstallOptions,
    pub output: OutputMode,
}

impl HelmPlatformInstaller<'_> {
    fn ensure_tools(&self) -> Result<()> {
        let missing = self.deps.missing(&[KUBECTL, HELM]);
        if missing.is_empty() {
            return Ok(());
        }
        self.deps
            .install(&missing)
            .map_err(|source| Error::missing_dependency(&missing, source))
    }

    /// Check the API server answers and log the active context
    fn check_cluster_available(&self) -> Result<()> {
        info!("Checking cluster availability...");
        self.exec.run_quietly(
            KUBECTL,
            &["cluster-info".to_string(), "--request-timeout=30s".to_string()],
        )?;

        match self
            .exec
            .run_capture(KUBECTL, &["config".to_string(), "current-context".to_string()])
        {
            Ok(context) => info!("✓ Cluster is accessible (context: {})", context),
            Err(e) => warn!("Cluster is accessible but the current context is unknown: {}", e),
        }
        Ok(())
    }

    fn helm(&self, args: Vec<String>) -> Result<()> {
        debug!("Running command: {}", display_command(HELM, &args));
        self.exec.run(self.output, HELM, &args)
    }
}

impl PlatformInstaller for HelmPlatformInstaller<'_> {
    fn init_and_install(&self, provider: Provider) -> Result<()> {
        let opts = &self.options;
        if opts.skip_installation {
            info!("Skipping platform installation");
            return Ok(());
        }

        self.ensure_tools()?;
        self.check_cluster_available()?;

        info!("Adding Helm repository {} ({})", opts.repo_name, opts.repo_url);
        self.helm(vec![
            "repo".to_string(),
            "add".to_string(),
            opts.repo_name.clone(),
            opts.repo_url.clone(),
            "--force-update".to_string(),
        ])?;
        self.helm(vec!["repo".to_string(), "update".to_string()])?;

        info!(
            "Installing {} as release {} in namespace {}",
            opts.chart, opts.release, opts.namespace
        );
        self.helm(build_upgrade_args(opts, provider))?;

        info!("✓ Platform installed on {} cluster", provider);
        Ok(())
    }
}
