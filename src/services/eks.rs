//! EKS cluster creation via eksctl
//!
//! Checks for the required binaries, resolves the region, turns [`EksFlags`]
//! into an `eksctl create cluster` command line, runs it and hands over to
//! the platform installer.

use crate::config::EksFlags;
use crate::error::{Error, Result};
use crate::logging::OutputMode;
use crate::services::helm::{PlatformInstaller, Provider};
use crate::services::region::RegionResolver;
use crate::services::toolchain::{DependencyInstaller, EKS_BINARIES, EKSCTL};
use crate::utils::exec::{CommandExecutor, display_command};
use tracing::{debug, info};

const CLOUDFORMATION_CONSOLE: &str = "https://console.aws.amazon.com/cloudformation/";

/// Collaborators used by [`create_cluster`]
pub struct EksContext<'a> {
    pub exec: &'a dyn CommandExecutor,
    pub deps: &'a dyn DependencyInstaller,
    pub regions: &'a dyn RegionResolver,
    pub platform: &'a dyn PlatformInstaller,
    pub env: &'a dyn Fn(&str) -> Option<String>,
    pub output: OutputMode,
}

/// Build the eksctl arguments for `flags`.
///
/// `zones` is the effective zones value (flag or environment fallback) and
/// `region` the resolved region. Unset options are omitted.
pub fn build_create_args(flags: &EksFlags, zones: &str, region: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "create".to_string(),
        "cluster".to_string(),
        "--full-ecr-access".to_string(),
    ];

    push_str_arg(&mut args, "--name", &flags.cluster_name);
    args.push("--region".to_string());
    args.push(region.to_string());
    push_str_arg(&mut args, "--zones", zones);
    push_str_arg(&mut args, "--profile", &flags.profile);
    push_str_arg(&mut args, "--ssh-public-key", &flags.ssh_public_key);

    args.push("--node-type".to_string());
    args.push(flags.node_type.clone());
    push_count_arg(&mut args, "--nodes", flags.node_count);
    push_count_arg(&mut args, "--nodes-min", flags.nodes_min);
    push_count_arg(&mut args, "--nodes-max", flags.nodes_max);
    push_count_arg(&mut args, "--verbose", flags.verbose);

    args.push("--aws-api-timeout".to_string());
    args.push(flags.aws_api_timeout.to_string());
    args
}

fn push_str_arg(args: &mut Vec<String>, flag: &str, value: &str) {
    if !value.is_empty() {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn push_count_arg(args: &mut Vec<String>, flag: &str, value: i32) {
    if value >= 0 {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

/// Make sure eksctl and the AWS authenticator are installed.
///
/// Returns a fatal [`Error::MissingDependency`] when installation fails.
pub fn ensure_dependencies(deps: &dyn DependencyInstaller) -> Result<()> {
    let missing = deps.missing(EKS_BINARIES);
    debug!("Dependencies to be installed: {}", missing.join(", "));
    if missing.is_empty() {
        return Ok(());
    }

    deps.install(&missing)
        .map_err(|source| Error::missing_dependency(&missing, source))
}

/// Create an EKS cluster and install the platform into it
pub fn create_cluster(flags: &EksFlags, ctx: &EksContext<'_>) -> Result<()> {
    ensure_dependencies(ctx.deps)?;

    let zones = flags.effective_zones(ctx.env);
    let region = ctx.regions.resolve(&flags.profile, &flags.region)?;
    let args = build_create_args(flags, &zones, &region);

    info!("Creating EKS cluster - this can take a while so please be patient...");
    info!(
        "You can watch progress in the CloudFormation console: {}",
        CLOUDFORMATION_CONSOLE
    );
    debug!("Running command: {}", display_command(EKSCTL, &args));

    ctx.exec.run(ctx.output, EKSCTL, &args)?;
    if ctx.output == OutputMode::Verbose {
        println!();
    }

    info!("Initialising cluster ...");
    ctx.platform.init_and_install(Provider::Eks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiTimeout, ZONES_ENV};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::process::Output;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: RefCell<Vec<(OutputMode, String, Vec<String>)>>,
        fail_with: Option<i32>,
    }

    impl RecordingExecutor {
        fn record(&self, mode: OutputMode, program: &str, args: &[String]) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((mode, program.to_string(), args.to_vec()));
            match self.fail_with {
                Some(code) => Err(Error::CommandFailed {
                    program: program.to_string(),
                    code,
                    stderr: "AlreadyExistsException".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    impl CommandExecutor for RecordingExecutor {
        fn run_verbose(&self, program: &str, args: &[String]) -> Result<()> {
            self.record(OutputMode::Verbose, program, args)
        }

        fn run_quietly(&self, program: &str, args: &[String]) -> Result<Output> {
            self.record(OutputMode::Quiet, program, args)?;
            Ok(Output {
                status: Default::default(),
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        }
    }

    struct FakeDeps {
        present: Vec<&'static str>,
        install_fails: bool,
        installed: RefCell<Vec<String>>,
    }

    impl FakeDeps {
        fn all_present() -> Self {
            Self {
                present: EKS_BINARIES.to_vec(),
                install_fails: false,
                installed: RefCell::new(Vec::new()),
            }
        }
    }

    impl DependencyInstaller for FakeDeps {
        fn is_installed(&self, binary: &str) -> bool {
            self.present.iter().any(|p| *p == binary)
        }

        fn install(&self, binaries: &[String]) -> anyhow::Result<()> {
            if self.install_fails {
                anyhow::bail!("download failed");
            }
            self.installed.borrow_mut().extend(binaries.iter().cloned());
            Ok(())
        }
    }

    struct FixedRegion(&'static str);

    impl RegionResolver for FixedRegion {
        fn resolve(&self, _profile: &str, explicit: &str) -> Result<String> {
            if explicit.is_empty() {
                Ok(self.0.to_string())
            } else if explicit == "nowhere" {
                Err(Error::region("invalid region 'nowhere'"))
            } else {
                Ok(explicit.to_string())
            }
        }
    }

    #[derive(Default)]
    struct FakePlatform {
        calls: RefCell<Vec<Provider>>,
    }

    impl PlatformInstaller for FakePlatform {
        fn init_and_install(&self, provider: Provider) -> Result<()> {
            self.calls.borrow_mut().push(provider);
            Ok(())
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_minimal_args() {
        let flags = EksFlags::default();
        assert_eq!(
            build_create_args(&flags, "", "us-west-2"),
            strings(&[
                "create",
                "cluster",
                "--full-ecr-access",
                "--region",
                "us-west-2",
                "--node-type",
                "m5.large",
                "--aws-api-timeout",
                "20m0s",
            ])
        );
    }

    #[test]
    fn test_all_options_in_eksctl_order() {
        let flags = EksFlags {
            cluster_name: "jx-demo".to_string(),
            node_type: "t3.xlarge".to_string(),
            node_count: 3,
            nodes_min: 0,
            nodes_max: 5,
            region: "eu-west-1".to_string(),
            zones: "eu-west-1a,eu-west-1b".to_string(),
            profile: "staging".to_string(),
            ssh_public_key: "~/.ssh/eks.pub".to_string(),
            verbose: 4,
            aws_api_timeout: ApiTimeout::from_mins(45),
        };
        assert_eq!(
            build_create_args(&flags, &flags.zones, "eu-west-1"),
            strings(&[
                "create",
                "cluster",
                "--full-ecr-access",
                "--name",
                "jx-demo",
                "--region",
                "eu-west-1",
                "--zones",
                "eu-west-1a,eu-west-1b",
                "--profile",
                "staging",
                "--ssh-public-key",
                "~/.ssh/eks.pub",
                "--node-type",
                "t3.xlarge",
                "--nodes",
                "3",
                "--nodes-min",
                "0",
                "--nodes-max",
                "5",
                "--verbose",
                "4",
                "--aws-api-timeout",
                "45m0s",
            ])
        );
    }

    #[test]
    fn test_negative_counts_are_omitted() {
        for (count, min, max, verbose) in [(-1, 2, 3, 1), (1, -1, 3, 1), (1, 2, -5, 1), (1, 2, 3, -1)]
        {
            let flags = EksFlags {
                node_count: count,
                nodes_min: min,
                nodes_max: max,
                verbose,
                ..Default::default()
            };
            let args = build_create_args(&flags, "", "us-west-2");
            for (flag, value) in [
                ("--nodes", count),
                ("--nodes-min", min),
                ("--nodes-max", max),
                ("--verbose", verbose),
            ] {
                assert_eq!(
                    args.iter().any(|a| a == flag),
                    value >= 0,
                    "{flag}={value} in {args:?}"
                );
            }
        }
    }

    #[test]
    fn test_create_uses_env_zones_when_flag_empty() {
        let exec = RecordingExecutor::default();
        let deps = FakeDeps::all_present();
        let platform = FakePlatform::default();
        let vars: HashMap<String, String> =
            [(ZONES_ENV.to_string(), "us-west-2b,us-west-2c".to_string())].into();
        let env = |k: &str| vars.get(k).cloned();
        let ctx = EksContext {
            exec: &exec,
            deps: &deps,
            regions: &FixedRegion("us-west-2"),
            platform: &platform,
            env: &env,
            output: OutputMode::Quiet,
        };

        create_cluster(&EksFlags::default(), &ctx).unwrap();

        let calls = exec.calls.borrow();
        assert_eq!(calls.len(), 1);
        let args = &calls[0].2;
        let pos = args.iter().position(|a| a == "--zones").unwrap();
        assert_eq!(args[pos + 1], "us-west-2b,us-west-2c");
    }

    #[test]
    fn test_create_prefers_zones_flag_over_env() {
        let exec = RecordingExecutor::default();
        let deps = FakeDeps::all_present();
        let platform = FakePlatform::default();
        let vars: HashMap<String, String> =
            [(ZONES_ENV.to_string(), "us-west-2b".to_string())].into();
        let env = |k: &str| vars.get(k).cloned();
        let ctx = EksContext {
            exec: &exec,
            deps: &deps,
            regions: &FixedRegion("us-west-2"),
            platform: &platform,
            env: &env,
            output: OutputMode::Quiet,
        };
        let flags = EksFlags {
            zones: "us-west-2a".to_string(),
            ..Default::default()
        };

        create_cluster(&flags, &ctx).unwrap();

        let calls = exec.calls.borrow();
        let args = &calls[0].2;
        let pos = args.iter().position(|a| a == "--zones").unwrap();
        assert_eq!(args[pos + 1], "us-west-2a");
    }

    #[test]
    fn test_dependency_failure_runs_nothing() {
        let exec = RecordingExecutor::default();
        let deps = FakeDeps {
            present: vec![],
            install_fails: true,
            installed: RefCell::new(Vec::new()),
        };
        let platform = FakePlatform::default();
        let ctx = EksContext {
            exec: &exec,
            deps: &deps,
            regions: &FixedRegion("us-west-2"),
            platform: &platform,
            env: &no_env,
            output: OutputMode::Verbose,
        };

        let err = create_cluster(&EksFlags::default(), &ctx).unwrap_err();
        assert!(err.is_fatal());
        match err {
            Error::MissingDependency { binaries, .. } => {
                assert_eq!(binaries, strings(&[EKSCTL, "aws-iam-authenticator"]));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(exec.calls.borrow().is_empty());
        assert!(platform.calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_dependencies_are_installed_first() {
        let exec = RecordingExecutor::default();
        let deps = FakeDeps {
            present: vec![EKSCTL],
            install_fails: false,
            installed: RefCell::new(Vec::new()),
        };
        let platform = FakePlatform::default();
        let ctx = EksContext {
            exec: &exec,
            deps: &deps,
            regions: &FixedRegion("us-west-2"),
            platform: &platform,
            env: &no_env,
            output: OutputMode::Quiet,
        };

        create_cluster(&EksFlags::default(), &ctx).unwrap();
        assert_eq!(*deps.installed.borrow(), strings(&["aws-iam-authenticator"]));
        assert_eq!(exec.calls.borrow().len(), 1);
    }

    #[test]
    fn test_region_error_is_returned_unchanged() {
        let exec = RecordingExecutor::default();
        let deps = FakeDeps::all_present();
        let platform = FakePlatform::default();
        let ctx = EksContext {
            exec: &exec,
            deps: &deps,
            regions: &FixedRegion("us-west-2"),
            platform: &platform,
            env: &no_env,
            output: OutputMode::Quiet,
        };
        let flags = EksFlags {
            region: "nowhere".to_string(),
            ..Default::default()
        };

        let err = create_cluster(&flags, &ctx).unwrap_err();
        assert!(matches!(err, Error::Region { ref message } if message == "invalid region 'nowhere'"));
        assert!(exec.calls.borrow().is_empty());
    }

    #[test]
    fn test_output_mode_selects_execution_path() {
        for mode in [OutputMode::Verbose, OutputMode::Quiet] {
            let exec = RecordingExecutor::default();
            let deps = FakeDeps::all_present();
            let platform = FakePlatform::default();
            let ctx = EksContext {
                exec: &exec,
                deps: &deps,
                regions: &FixedRegion("us-west-2"),
                platform: &platform,
                env: &no_env,
                output: mode,
            };
            create_cluster(&EksFlags::default(), &ctx).unwrap();

            let calls = exec.calls.borrow();
            assert_eq!(calls[0].0, mode);
            assert_eq!(calls[0].1, EKSCTL);
            assert_eq!(*platform.calls.borrow(), vec![Provider::Eks]);
        }
    }

    #[test]
    fn test_execution_failure_skips_install() {
        let exec = RecordingExecutor {
            fail_with: Some(1),
            ..Default::default()
        };
        let deps = FakeDeps::all_present();
        let platform = FakePlatform::default();
        let ctx = EksContext {
            exec: &exec,
            deps: &deps,
            regions: &FixedRegion("us-west-2"),
            platform: &platform,
            env: &no_env,
            output: OutputMode::Quiet,
        };

        let err = create_cluster(&EksFlags::default(), &ctx).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: 1, .. }));
        assert!(!err.is_fatal());
        assert!(platform.calls.borrow().is_empty());
    }
}
