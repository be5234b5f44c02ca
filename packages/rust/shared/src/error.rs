//! The PowerNI error model.
//!
//! Every library crate returns [`PowerniError`]; the binary reports it
//! through `color-eyre`. Subscription rejections shown to a reader have their
//! own type in `powerni-core`.

use std::path::PathBuf;

/// Failure while loading, converting, rendering or persisting report data.
#[derive(Debug, thiserror::Error)]
pub enum PowerniError {
    /// `powerni.toml` is unreadable, malformed, or points nowhere.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The report URL could not be fetched (transport failure or non-2xx).
    #[error("report fetch failed: {0}")]
    Network(String),

    /// A report document is not valid report JSON.
    #[error("malformed report document: {message}")]
    Parse { message: String },

    /// The subscription database rejected a read or write.
    #[error("subscription storage failed: {0}")]
    Storage(String),

    /// Reading or writing a report, page or database file failed.
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input that parsed but cannot form a report (no sources block, empty
    /// subject, empty source string).
    #[error("invalid report input: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, PowerniError>;

impl PowerniError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Attach the file that was being read or written.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Worth another attempt when loading a report.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_stage() {
        let err = PowerniError::config("missing [report] section");
        assert_eq!(
            err.to_string(),
            "invalid configuration: missing [report] section"
        );

        let err = PowerniError::parse("expected `subject` at line 1");
        assert_eq!(
            err.to_string(),
            "malformed report document: expected `subject` at line 1"
        );

        let err = PowerniError::validation("report text has no sources block");
        assert!(err.to_string().starts_with("invalid report input"));
    }

    #[test]
    fn io_error_includes_path() {
        let err = PowerniError::io(
            "/tmp/report.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "cannot access /tmp/report.json: gone");
    }

    #[test]
    fn only_fetch_and_io_failures_are_transient() {
        assert!(PowerniError::Network("HTTP 503".into()).is_transient());
        assert!(
            PowerniError::io("x", std::io::Error::from(std::io::ErrorKind::NotFound))
                .is_transient()
        );
        assert!(!PowerniError::parse("eof").is_transient());
        assert!(!PowerniError::Storage("locked".into()).is_transient());
    }
}
