use crate::error::{Error, Result};
use crate::logging::OutputMode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Runs external tools on the local machine
pub trait CommandExecutor {
    /// Run a command with stdout/stderr streamed to the terminal
    fn run_verbose(&self, program: &str, args: &[String]) -> Result<()>;

    /// Run a command with output captured; stderr is reported on failure
    fn run_quietly(&self, program: &str, args: &[String]) -> Result<Output>;

    /// Run a command and return its trimmed stdout
    fn run_capture(&self, program: &str, args: &[String]) -> Result<String> {
        let output = self.run_quietly(program, args)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run a command, picking streamed or captured output from `mode`
    fn run(&self, mode: OutputMode, program: &str, args: &[String]) -> Result<()> {
        match mode {
            OutputMode::Verbose => self.run_verbose(program, args),
            OutputMode::Quiet => self.run_quietly(program, args).map(|_| ()),
        }
    }
}

/// Executor that spawns processes directly (no shell).
///
/// `extra_path` directories are searched before `PATH` so tools installed by
/// eksboot are found by the child processes too.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    extra_path: Vec<PathBuf>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_path.push(dir.into());
        self
    }

    /// PATH value handed to child processes
    pub fn search_path(&self) -> Option<OsString> {
        let mut dirs: Vec<PathBuf> = self.extra_path.clone();
        if let Some(path) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        std::env::join_paths(dirs).ok()
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(self.resolve(program));
        cmd.args(args);
        if !self.extra_path.is_empty() {
            if let Some(path) = self.search_path() {
                cmd.env("PATH", path);
            }
        }
        cmd
    }

    fn resolve(&self, program: &str) -> PathBuf {
        if Path::new(program).components().count() > 1 {
            return PathBuf::from(program);
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(program, self.search_path(), cwd).unwrap_or_else(|_| PathBuf::from(program))
    }
}

impl CommandExecutor for LocalExecutor {
    fn run_verbose(&self, program: &str, args: &[String]) -> Result<()> {
        debug!("Running (streamed): {} {}", program, args.join(" "));
        let status = self
            .command(program, args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                code: status.code().unwrap_or(1),
                stderr: String::new(),
            });
        }
        Ok(())
    }

    fn run_quietly(&self, program: &str, args: &[String]) -> Result<Output> {
        debug!("Running (captured): {} {}", program, args.join(" "));
        let output = self
            .command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                code: output.status.code().unwrap_or(1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(output)
    }
}

/// Render a command line for logs
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push_str(&format!("'{}'", arg.replace('\'', "'\"'\"'")));
        } else {
            line.push_str(arg);
        }
    }
    line
}
