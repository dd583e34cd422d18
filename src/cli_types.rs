// CLI types for eksboot (used by both library and binary)
use crate::config::{ApiTimeout, DEFAULT_NODE_TYPE, EksFlags};
use crate::logging::LogLevel;
use crate::services::helm::InstallOptions;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eksboot")]
#[command(about = "Provision Kubernetes clusters on AWS EKS and install the platform", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log level (debug and trace stream the output of external tools)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new cluster
    Create {
        #[command(subcommand)]
        command: CreateCommands,
    },
    /// Check that the tools eksboot drives are installed
    Check {
        /// Only report missing tools, don't install them
        #[arg(long)]
        no_install: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateCommands {
    /// Create a new Kubernetes cluster on AWS using EKS
    #[command(after_help = EKS_EXAMPLES)]
    Eks(CreateEksArgs),
}

const EKS_EXAMPLES: &str = "Examples:
  # create a cluster in your default zones (from $EKS_AVAILABILITY_ZONES)
  eksboot create eks

  # specify the zones
  eksboot create eks --zones us-west-2a,us-west-2b,us-west-2c";

#[derive(Args, Debug, Clone)]
pub struct CreateEksArgs {
    /// The name of this cluster
    #[arg(long = "cluster-name", short = 'n', default_value = "")]
    pub cluster_name: String,

    /// Node instance type
    #[arg(long, default_value = DEFAULT_NODE_TYPE)]
    pub node_type: String,

    /// Number of nodes
    #[arg(long = "nodes", short = 'o', default_value_t = -1, allow_negative_numbers = true)]
    pub node_count: i32,

    /// Minimum number of nodes
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub nodes_min: i32,

    /// Maximum number of nodes
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub nodes_max: i32,

    /// eksctl log level: 0 to silence, 4 for debugging, 5 adds AWS debug logging (eksctl default 3)
    #[arg(long = "eksctl-log-level", default_value_t = -1, allow_negative_numbers = true)]
    pub eksctl_log_level: i32,

    /// Duration of the AWS API timeout
    #[arg(long, default_value = "20m")]
    pub aws_api_timeout: ApiTimeout,

    /// The region to use (default: us-west-2)
    #[arg(long, short = 'r', default_value = "")]
    pub region: String,

    /// Availability zones, auto-selected if not specified. Overrides $EKS_AVAILABILITY_ZONES
    #[arg(long, short = 'z', default_value = "")]
    pub zones: String,

    /// AWS profile to use. Overrides $AWS_PROFILE
    #[arg(long, short = 'p', default_value = "")]
    pub profile: String,

    /// SSH public key for the nodes (local path or existing EC2 key pair; eksctl default ~/.ssh/id_rsa.pub)
    #[arg(long, default_value = "")]
    pub ssh_public_key: String,

    #[command(flatten)]
    pub install: InstallArgs,
}

/// Flags for the platform install that follows provisioning
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Only create the cluster, don't install the platform
    #[arg(long)]
    pub skip_installation: bool,

    /// Namespace to install the platform into
    #[arg(long, default_value = "jx")]
    pub namespace: String,

    /// Helm release name
    #[arg(long, default_value = "jenkins-x")]
    pub release: String,

    /// Platform chart reference
    #[arg(long, default_value = "jenkins-x/jenkins-x-platform")]
    pub chart: String,

    /// Name of the Helm repository holding the chart
    #[arg(long, default_value = "jenkins-x")]
    pub chart_repo_name: String,

    /// URL of the Helm repository holding the chart
    #[arg(long, default_value = "https://jenkins-x-charts.github.io/v2")]
    pub chart_repo_url: String,

    /// Values file passed to helm
    #[arg(long)]
    pub values: Option<PathBuf>,

    /// Extra chart values (key=value, repeatable)
    #[arg(long = "set")]
    pub set: Vec<String>,
}

impl From<&CreateEksArgs> for EksFlags {
    fn from(args: &CreateEksArgs) -> Self {
        EksFlags {
            cluster_name: args.cluster_name.clone(),
            node_type: args.node_type.clone(),
            node_count: args.node_count,
            nodes_min: args.nodes_min,
            nodes_max: args.nodes_max,
            region: args.region.clone(),
            zones: args.zones.clone(),
            profile: args.profile.clone(),
            ssh_public_key: args.ssh_public_key.clone(),
            verbose: args.eksctl_log_level,
            aws_api_timeout: args.aws_api_timeout,
        }
    }
}

impl From<&InstallArgs> for InstallOptions {
    fn from(args: &InstallArgs) -> Self {
        InstallOptions {
            skip_installation: args.skip_installation,
            namespace: args.namespace.clone(),
            release: args.release.clone(),
            chart: args.chart.clone(),
            repo_name: args.chart_repo_name.clone(),
            repo_url: args.chart_repo_url.clone(),
            values: args.values.clone(),
            set: args.set.clone(),
        }
    }
}
