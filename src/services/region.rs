//! AWS region resolution
//!
//! Order: explicit flag, `AWS_REGION`, `AWS_DEFAULT_REGION`, the profile's
//! `region` in the AWS config file, then [`DEFAULT_REGION`].

use crate::error::{Error, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

pub const DEFAULT_REGION: &str = "us-west-2";

/// Resolves the effective AWS region for a command
pub trait RegionResolver {
    fn resolve(&self, profile: &str, explicit: &str) -> Result<String>;
}

/// Resolver backed by environment variables and the AWS config file
pub struct AwsRegionResolver<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> AwsRegionResolver<'a> {
    pub fn new(env: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { env }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|v| !v.trim().is_empty())
    }

    fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.var("AWS_CONFIG_FILE") {
            return Some(PathBuf::from(path));
        }
        self.var("HOME")
            .map(|home| PathBuf::from(home).join(".aws").join("config"))
    }

    fn region_from_config(&self, profile: &str) -> Option<String> {
        let path = self.config_path()?;
        let content = std::fs::read_to_string(&path).ok()?;
        let region = profile_region(&content, profile);
        if let Some(ref r) = region {
            debug!("Using region {} from {} [{}]", r, path.display(), profile);
        }
        region
    }
}

impl RegionResolver for AwsRegionResolver<'_> {
    fn resolve(&self, profile: &str, explicit: &str) -> Result<String> {
        let profile = if profile.is_empty() {
            self.var("AWS_PROFILE").unwrap_or_else(|| "default".to_string())
        } else {
            profile.to_string()
        };

        let region = if !explicit.trim().is_empty() {
            explicit.trim().to_string()
        } else if let Some(r) = self.var("AWS_REGION") {
            r
        } else if let Some(r) = self.var("AWS_DEFAULT_REGION") {
            r
        } else if let Some(r) = self.region_from_config(&profile) {
            r
        } else {
            DEFAULT_REGION.to_string()
        };

        validate_region(&region)?;
        Ok(region)
    }
}

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2}(-(gov|iso[a-z]?))?-[a-z]+-\d+$").expect("valid region regex")
    })
}

/// Check a region name has the AWS shape (`us-west-2`, `us-gov-east-1`)
pub fn validate_region(region: &str) -> Result<()> {
    if region_pattern().is_match(region) {
        Ok(())
    } else {
        Err(Error::region(format!(
            "invalid region '{}' (expected something like {})",
            region, DEFAULT_REGION
        )))
    }
}

/// Find `region` for a profile in an AWS config file.
///
/// The default profile is `[default]`, others are `[profile name]`; the
/// credentials-file style `[name]` is accepted too.
pub fn profile_region(content: &str, profile: &str) -> Option<String> {
    let mut in_profile = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let section = section.trim();
            let name = section.strip_prefix("profile ").map(str::trim).unwrap_or(section);
            in_profile = name == profile;
            continue;
        }

        if in_profile {
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == "region" {
                    let value = value.trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}
