//! CLI error handling

use std::fmt;

use relval_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(relval_errors::ConfigError),
    /// Operations error
    Ops(relval_errors::Error),
    /// System setup error
    Setup(String),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Stable error code, when the underlying error has one
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CliError::Config(e) => e.user_code(),
            CliError::Ops(e) => e.user_code(),
            CliError::Setup(_) => Some("cli.setup"),
            CliError::InvalidArguments(_) => Some("cli.invalid_arguments"),
            CliError::Io(_) => Some("cli.io"),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Setup(msg) => write!(f, "System setup error: {msg}"),
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<relval_errors::ConfigError> for CliError {
    fn from(e: relval_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<relval_errors::Error> for CliError {
    fn from(e: relval_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relval_errors::OpsError;

    #[test]
    fn ops_errors_render_code_and_hint() {
        let err = CliError::from(relval_errors::Error::from(OpsError::LockTimeout {
            path: "/tmp/pid".to_string(),
            pid: 42,
            attempts: 10,
        }));
        let text = err.to_string();
        assert!(text.contains("held by pid 42"));
        assert!(text.contains("Code: ops.lock_timeout"));
        assert!(text.contains("Hint: Another relval instance is running"));
        assert!(text.contains("Retry: safe"));
        assert_eq!(err.code(), Some("ops.lock_timeout"));
    }
}
