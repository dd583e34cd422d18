//! Create commands
//!
//! Wires the real collaborators (local executor, toolchain, AWS region
//! resolution, Helm installer) into the cluster services.

use crate::cli_types::CreateCommands;
use crate::config::{self, EksFlags};
use crate::error::Result;
use crate::logging::OutputMode;
use crate::services::eks::{self, EksContext};
use crate::services::helm::{HelmPlatformInstaller, InstallOptions};
use crate::services::region::AwsRegionResolver;
use crate::services::toolchain::Toolchain;

pub fn handle_create(command: CreateCommands) -> Result<()> {
    match command {
        CreateCommands::Eks(args) => {
            let flags = EksFlags::from(&args);
            let toolchain = Toolchain::new(config::bin_dir()?);
            let output = OutputMode::current();
            let env = config::process_env;

            let platform = HelmPlatformInstaller {
                exec: toolchain.executor(),
                deps: &toolchain,
                options: InstallOptions::from(&args.install),
                output,
            };
            let ctx = EksContext {
                exec: toolchain.executor(),
                deps: &toolchain,
                regions: &AwsRegionResolver::new(&env),
                platform: &platform,
                env: &env,
                output,
            };
            eks::create_cluster(&flags, &ctx)
        }
    }
}
