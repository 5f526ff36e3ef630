//! Error taxonomy shared by every backend.

use std::path::PathBuf;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Errors raised while inspecting or switching a tunnel.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// The backend's expected files are absent; the resolver moves on.
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("server {0} not found")]
    NotFound(String),

    /// The current endpoint is missing from the enumerated list.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {output}")]
    Command { command: String, output: String },

    /// Relay catalog fetch, decode or empty payload.
    #[error("relay catalog: {0}")]
    Upstream(String),

    #[error("interface {interface} still present after {attempts} checks")]
    Timeout { interface: String, attempts: u32 },

    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

impl SwitchError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = SwitchError::io(
            "/etc/wireguard/wg0.conf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "/etc/wireguard/wg0.conf: denied");
    }

    #[test]
    fn test_command_error_includes_output() {
        let err = SwitchError::Command {
            command: "wg-quick down wg0".to_string(),
            output: "exit status: 1 - no such device".to_string(),
        };
        assert!(err.to_string().contains("no such device"));
    }

    #[test]
    fn test_is_not_configured() {
        assert!(SwitchError::NotConfigured("x".into()).is_not_configured());
        assert!(!SwitchError::NotFound("x".into()).is_not_configured());
    }
}
