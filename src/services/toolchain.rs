//! Local tool installation
//!
//! Required binaries are looked up in the eksboot bin dir and `PATH`. Missing
//! ones are installed with brew when it is available, otherwise downloaded
//! from their GitHub releases into the bin dir.

use crate::utils::exec::{CommandExecutor, LocalExecutor};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, info};

pub const EKSCTL: &str = "eksctl";
pub const AWS_IAM_AUTHENTICATOR: &str = "aws-iam-authenticator";
pub const HELM: &str = "helm";
pub const KUBECTL: &str = "kubectl";

/// Binaries `create eks` cannot run without
pub const EKS_BINARIES: &[&str] = &[EKSCTL, AWS_IAM_AUTHENTICATOR];

const EKSCTL_RELEASE_URL: &str = "https://github.com/eksctl-io/eksctl/releases/latest/download";
const AUTHENTICATOR_RELEASE_API: &str =
    "https://api.github.com/repos/kubernetes-sigs/aws-iam-authenticator/releases/latest";
const KUBECTL_RELEASE_URL: &str = "https://dl.k8s.io/release";
const HELM_INSTALL_SCRIPT: &str = "https://raw.githubusercontent.com/helm/helm/main/scripts/get-helm-3";

/// Finds and installs the external binaries eksboot drives
pub trait DependencyInstaller {
    fn is_installed(&self, binary: &str) -> bool;

    /// Install every binary in `binaries`, stopping at the first failure
    fn install(&self, binaries: &[String]) -> Result<()>;

    /// The subset of `binaries` that is not installed
    fn missing(&self, binaries: &[&str]) -> Vec<String> {
        binaries
            .iter()
            .filter(|b| !self.is_installed(b))
            .map(|b| b.to_string())
            .collect()
    }
}

/// Operating system / architecture pair used to pick release assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn detect() -> Result<Self> {
        Self::from_consts(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_consts(os: &str, arch: &str) -> Result<Self> {
        let os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            _ => anyhow::bail!("Unsupported OS: {}", os),
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            _ => anyhow::bail!("Unsupported architecture: {}", arch),
        };
        Ok(Self { os, arch })
    }

    /// eksctl archives are named like `eksctl_Linux_amd64.tar.gz`
    pub fn eksctl_archive(&self) -> String {
        let os = match self.os {
            "darwin" => "Darwin",
            "windows" => "Windows",
            _ => "Linux",
        };
        let ext = if self.os == "windows" { "zip" } else { "tar.gz" };
        format!("eksctl_{}_{}.{}", os, self.arch, ext)
    }

    /// Suffix of aws-iam-authenticator release assets (`..._linux_amd64`)
    pub fn authenticator_suffix(&self) -> String {
        format!("_{}_{}", self.os, self.arch)
    }
}

#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    /// First asset whose name ends with `suffix`
    pub fn asset_ending_with(&self, suffix: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with(suffix))
    }
}

/// Installs tools into `bin_dir`, falling back on brew when present
pub struct Toolchain {
    bin_dir: PathBuf,
    exec: LocalExecutor,
}

impl Toolchain {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        let bin_dir = bin_dir.into();
        let exec = LocalExecutor::new().with_path_dir(&bin_dir);
        Self { bin_dir, exec }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Executor whose PATH includes the bin dir
    pub fn executor(&self) -> &LocalExecutor {
        &self.exec
    }

    fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("eksboot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")
    }

    fn download(url: &str, timeout_secs: u64) -> Result<Vec<u8>> {
        info!("  Downloading {}", url);
        let bytes = Self::http_client(timeout_secs)?
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .with_context(|| format!("HTTP error downloading {}", url))?
            .bytes()
            .context("Failed to read download body")?;
        Ok(bytes.to_vec())
    }

    fn install_one(&self, binary: &str) -> Result<()> {
        info!("{} not found, installing...", binary);

        if self.is_installed("brew") {
            info!("  Detected brew - installing {}", binary);
            self.exec
                .run_verbose("brew", &["install".to_string(), binary.to_string()])
                .with_context(|| format!("brew install {} failed", binary))?;
        } else {
            std::fs::create_dir_all(&self.bin_dir).with_context(|| {
                format!("Failed to create directory: {}", self.bin_dir.display())
            })?;
            let platform = Platform::detect()?;
            match binary {
                EKSCTL => self.install_eksctl(platform)?,
                AWS_IAM_AUTHENTICATOR => self.install_authenticator(platform)?,
                HELM => self.install_helm()?,
                KUBECTL => self.install_kubectl(platform)?,
                other => anyhow::bail!(
                    "Don't know how to install {}. Please install it manually.",
                    other
                ),
            }
        }

        if !self.is_installed(binary) {
            anyhow::bail!(
                "{} installation completed but the command is not available",
                binary
            );
        }
        info!("✓ {} installed successfully", binary);
        Ok(())
    }

    fn install_eksctl(&self, platform: Platform) -> Result<()> {
        if platform.os == "windows" {
            anyhow::bail!("Automatic eksctl install is not supported on Windows");
        }
        let url = format!("{}/{}", EKSCTL_RELEASE_URL, platform.eksctl_archive());
        let archive = Self::download(&url, 300)?;
        let binary = extract_from_tar_gz(&archive, EKSCTL)?;
        self.write_executable(EKSCTL, &binary)
    }

    fn install_authenticator(&self, platform: Platform) -> Result<()> {
        let release: Release = Self::http_client(30)?
            .get(AUTHENTICATOR_RELEASE_API)
            .send()
            .context("Failed to fetch aws-iam-authenticator release from GitHub")?
            .error_for_status()
            .context("HTTP error fetching aws-iam-authenticator release")?
            .json()
            .context("Failed to parse release JSON")?;

        let suffix = platform.authenticator_suffix();
        let asset = release
            .asset_ending_with(&suffix)
            .or_else(|| release.asset_ending_with(&format!("{}.exe", suffix)))
            .with_context(|| {
                format!(
                    "No release asset found for platform {} in {}",
                    suffix.trim_start_matches('_'),
                    release.tag_name
                )
            })?;

        let binary = Self::download(&asset.browser_download_url, 300)?;
        self.write_executable(AWS_IAM_AUTHENTICATOR, &binary)
    }

    fn install_kubectl(&self, platform: Platform) -> Result<()> {
        let version = Self::download(&format!("{}/stable.txt", KUBECTL_RELEASE_URL), 30)?;
        let version = String::from_utf8(version).context("Invalid kubectl version response")?;
        let exe = if platform.os == "windows" { "kubectl.exe" } else { KUBECTL };
        let url = format!(
            "{}/{}/bin/{}/{}/{}",
            KUBECTL_RELEASE_URL,
            version.trim(),
            platform.os,
            platform.arch,
            exe
        );
        let binary = Self::download(&url, 300)?;
        self.write_executable(KUBECTL, &binary)
    }

    fn install_helm(&self) -> Result<()> {
        let script = Self::download(HELM_INSTALL_SCRIPT, 60)?;
        let mut file = tempfile::Builder::new()
            .prefix("get-helm-3")
            .suffix(".sh")
            .tempfile()
            .context("Failed to create temporary file for Helm install script")?;
        file.write_all(&script)?;
        file.flush()?;

        info!("  Executing Helm install script (this may take a minute)...");
        let status = Command::new("bash")
            .arg(file.path())
            .env("HELM_INSTALL_DIR", &self.bin_dir)
            .env("USE_SUDO", "false")
            .env("PATH", self.exec.search_path().unwrap_or_default())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .context("Failed to execute Helm install script")?;

        if !status.success() {
            anyhow::bail!(
                "Helm install script failed with exit code: {}",
                status.code().unwrap_or(1)
            );
        }
        Ok(())
    }

    /// Atomically place `content` at `bin_dir/name` with mode 0755
    fn write_executable(&self, name: &str, content: &[u8]) -> Result<()> {
        let dest = self.bin_dir.join(name);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.bin_dir)
            .with_context(|| format!("Failed to create temporary file in {}", self.bin_dir.display()))?;
        tmp.write_all(content)?;
        tmp.flush()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755))?;
        }

        tmp.persist(&dest)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        debug!("Installed {}", dest.display());
        Ok(())
    }
}

impl DependencyInstaller for Toolchain {
    fn is_installed(&self, binary: &str) -> bool {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(binary, self.exec.search_path(), cwd).is_ok()
    }

    fn install(&self, binaries: &[String]) -> Result<()> {
        for binary in binaries {
            self.install_one(binary)?;
        }
        Ok(())
    }
}

/// Read the file named `name` out of a gzipped tarball
pub fn extract_from_tar_gz(archive: &[u8], name: &str) -> Result<Vec<u8>> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    for entry in tar.entries().context("Failed to read archive")? {
        let mut entry = entry.context("Failed to read archive entry")?;
        let path = entry.path()?.into_owned();
        if path.file_name().and_then(|f| f.to_str()) == Some(name) {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            return Ok(content);
        }
    }
    anyhow::bail!("{} not found in archive", name)
}
