//! Error types for eksboot

/// eksboot Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the cluster commands
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required binaries are missing and could not be installed
    #[error("failed to install {}: {:#}", .binaries.join(", "), .source)]
    MissingDependency {
        binaries: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("region error: {message}")]
    Region { message: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with exit code {code}{}", stderr_suffix(.stderr))]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl Error {
    pub fn region(message: impl Into<String>) -> Self {
        Error::Region {
            message: message.into(),
        }
    }

    pub fn missing_dependency(binaries: &[String], source: anyhow::Error) -> Self {
        Error::MissingDependency {
            binaries: binaries.to_vec(),
            source,
        }
    }

    /// Fatal errors terminate the process instead of being reported to the caller
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingDependency { .. })
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() { 255 } else { 1 }
    }
}
