//! Logging setup and log-level driven output selection

use clap::ValueEnum;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log level accepted by `--log-level`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Level eksboot's own events are filtered at, set once by [`init`]
static CRATE_LEVEL: OnceLock<LevelFilter> = OnceLock::new();

/// Initialize tracing. `RUST_LOG` takes precedence over `--log-level`, so
/// `.env` files must be loaded before this runs.
pub fn init(level: LogLevel) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, own_level) = build_filter(level, rust_log.as_deref());
    let _ = CRATE_LEVEL.set(own_level);

    // try_init: a subscriber may already be installed when embedded
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// Filter from `RUST_LOG` directives when set and valid, else from `level`,
/// along with the level it enables for eksboot
pub fn build_filter(level: LogLevel, rust_log: Option<&str>) -> (EnvFilter, LevelFilter) {
    match rust_log.filter(|d| !d.trim().is_empty()) {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, crate_level(directives)),
            Err(_) => (EnvFilter::new(level.as_filter().to_string()), level.as_filter()),
        },
        None => (EnvFilter::new(level.as_filter().to_string()), level.as_filter()),
    }
}

/// Level that `RUST_LOG`-style `directives` enable for eksboot itself.
///
/// Directives naming the `eksboot` target win over bare levels; directives
/// for other targets (`reqwest=debug`) are ignored.
pub fn crate_level(directives: &str) -> LevelFilter {
    let mut bare = None;
    let mut targeted = None;
    for directive in directives.split(',').map(str::trim) {
        if directive.is_empty() || directive.contains('[') {
            continue;
        }
        match directive.rsplit_once('=') {
            Some((target, value)) => {
                if is_crate_target(target) {
                    if let Ok(level) = value.parse::<LevelFilter>() {
                        targeted = Some(level);
                    }
                }
            }
            None => match directive.parse::<LevelFilter>() {
                Ok(level) => bare = Some(level),
                Err(_) if is_crate_target(directive) => targeted = Some(LevelFilter::TRACE),
                Err(_) => {}
            },
        }
    }
    targeted.or(bare).unwrap_or(LevelFilter::OFF)
}

fn is_crate_target(target: &str) -> bool {
    target == "eksboot" || target.starts_with("eksboot::")
}

/// How an external tool's output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// stdout/stderr are streamed to the terminal
    Verbose,
    /// output is captured and only reported on failure
    Quiet,
}

impl OutputMode {
    /// Debug (or more detailed) logging streams tool output
    pub fn for_level(level: LevelFilter) -> Self {
        if level >= LevelFilter::DEBUG {
            OutputMode::Verbose
        } else {
            OutputMode::Quiet
        }
    }

    /// Mode for eksboot's configured level, or the subscriber's max level
    /// when [`init`] has not run
    pub fn current() -> Self {
        Self::for_level(CRATE_LEVEL.get().copied().unwrap_or_else(LevelFilter::current))
    }
}
