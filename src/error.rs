//! Error types for the display driver.
//!
//! All fallible operations in the crate return [`LcdError`]. Each variant carries
//! structured context so callers can decide whether an operation is worth retrying
//! on the next cycle or should abort the calling command.
//!
//! ## Error Categories
//!
//! - **Open Errors**: the serial path is missing or cannot be opened read/write
//! - **Write/Read Errors**: I/O failures while flushing the pending buffer or polling buttons
//! - **Link Errors**: operations attempted after the link was closed
//! - **Metrics Errors**: the host metrics collaborator failed or timed out
//! - **Menu Errors**: a menu item's action returned an error
//! - **Config Errors**: the YAML configuration could not be read or parsed
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use ezio::LcdError;
//!
//! let error = LcdError::metrics_failed("sysctl returned no data");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! ## Helper Constructors
//!
//! ```rust
//! use ezio::LcdError;
//! use std::path::PathBuf;
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such device");
//! let open_error = LcdError::open_failed(PathBuf::from("/dev/ttyS1"), io_err);
//! assert!(!open_error.is_retryable());
//!
//! let invalid = LcdError::invalid_argument("LED index must be 1-3");
//! assert!(invalid.to_string().contains("LED index"));
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T, E = LcdError> = std::result::Result<T, E>;

/// Main error type for driver operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LcdError {
    #[error("Failed to open serial device {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serial write failed: {context}")]
    Write {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serial read failed")]
    Read {
        #[source]
        source: std::io::Error,
    },

    #[error("Device link {path} is closed")]
    LinkClosed { path: PathBuf },

    #[error("Metrics collection failed: {reason}")]
    Metrics {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Menu action '{label}' failed")]
    MenuAction {
        label: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Invalid argument: {details}")]
    InvalidArgument { details: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform {
        feature: String,
        required_platform: String,
    },
}

impl LcdError {
    /// Returns whether this error is transient and the operation may succeed next cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            LcdError::Write { .. } => true,
            LcdError::Read { .. } => true,
            LcdError::Metrics { .. } => true,
            LcdError::MenuAction { .. } => true,
            LcdError::Timeout { .. } => true,
            LcdError::Open { .. } => false,
            LcdError::LinkClosed { .. } => false,
            LcdError::Config { .. } => false,
            LcdError::InvalidArgument { .. } => false,
            LcdError::UnsupportedPlatform { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LcdError::Open { .. } => vec![
                "Check the serial port path (e.g. /dev/ttyS1 or /dev/cuau1)",
                "Verify read/write permissions on the device node",
                "Make sure no other process holds the port open",
            ],
            LcdError::Write { .. } => vec![
                "Check the serial cable and display power",
                "Retry the flush; pending bytes are kept",
                "Increase the inter-command delay",
            ],
            LcdError::Read { .. } => vec![
                "Check the serial cable",
                "Restart the button session",
            ],
            LcdError::LinkClosed { .. } => vec![
                "Open a new link before sending commands",
                "Avoid using a display after calling close()",
            ],
            LcdError::Metrics { .. } => vec![
                "Check that system utilities are available",
                "Wait for the next refresh cycle",
                "Run with -vv to see the underlying failure",
            ],
            LcdError::MenuAction { .. } => vec![
                "Check the action's logs for the underlying failure",
                "Select the item again to retry",
            ],
            LcdError::Config { .. } => vec![
                "Check the configuration file exists and is readable",
                "Validate the YAML syntax",
                "Compare field names against the documented defaults",
            ],
            LcdError::InvalidArgument { .. } => vec![
                "Check the command arguments against --help",
                "Use values within the documented ranges",
            ],
            LcdError::Timeout { .. } => vec![
                "Raise status.metrics_timeout_ms",
                "Check system load",
            ],
            LcdError::UnsupportedPlatform { .. } => vec![
                "Use --dry-run to exercise the driver without hardware",
                "Run on a Unix host with a serial port",
            ],
        }
    }

    pub fn timed_out(duration: Duration) -> Self {
        LcdError::Timeout { duration }
    }

    /// Helper constructor for open failures with path context.
    pub fn open_failed(path: PathBuf, source: std::io::Error) -> Self {
        LcdError::Open { path, source }
    }

    /// Helper constructor for write failures.
    pub fn write_failed(context: impl Into<String>, source: std::io::Error) -> Self {
        LcdError::Write {
            context: context.into(),
            source,
        }
    }

    /// Helper constructor for metrics failures.
    pub fn metrics_failed(reason: impl Into<String>) -> Self {
        LcdError::Metrics {
            reason: reason.into(),
            source: None,
        }
    }

    /// Helper constructor for metrics failures with source.
    pub fn metrics_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LcdError::Metrics {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for failed menu actions.
    pub fn menu_action_failed(
        label: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LcdError::MenuAction {
            label: label.into(),
            source: source.into(),
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        LcdError::Config {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Helper constructor for invalid arguments.
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        LcdError::InvalidArgument {
            details: details.into(),
        }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        LcdError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<std::io::Error> for LcdError {
    fn from(err: std::io::Error) -> Self {
        LcdError::Write {
            context: "unspecified I/O operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            label in "\\w+",
            details in ".*",
            duration_ms in 1u64..60000u64
          ) {
            let metrics = LcdError::metrics_failed(reason.clone());
            prop_assert!(metrics.to_string().contains(&reason));

            let action = LcdError::menu_action_failed(label.clone(), std::io::Error::other("boom"));
            prop_assert!(action.to_string().contains(&label));

            let invalid = LcdError::invalid_argument(details.clone());
            prop_assert!(invalid.to_string().contains(&details));

            let duration = Duration::from_millis(duration_ms);
            let timeout = LcdError::timed_out(duration);
            let expected = format!("{:?}", duration);
            prop_assert!(timeout.to_string().contains(&expected));
            prop_assert!(timeout.is_retryable());
          }

          #[test]
          fn io_conversion_keeps_the_source_message(message in ".*") {
            let converted: LcdError = std::io::Error::other(message.clone()).into();
            match converted {
              LcdError::Write { source, .. } => prop_assert_eq!(source.to_string(), message),
              _ => prop_assert!(false, "Expected Write error from io::Error conversion"),
            }
          }

          #[test]
          fn source_chain_reaches_the_root_cause(
            base_message in ".*",
            reasons in prop::collection::vec("\\w*", 1..4)
          ) {
            let mut current: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            for reason in &reasons {
              current = Box::new(LcdError::metrics_failed_with_source(reason.clone(), current));
            }

            let mut depth = 0;
            let mut found = false;
            let mut cursor = std::error::Error::source(current.as_ref());
            while let Some(source) = cursor {
              depth += 1;
              if source.to_string().contains(&base_message) {
                found = true;
              }
              cursor = std::error::Error::source(source);
            }

            prop_assert_eq!(depth, reasons.len());
            prop_assert!(found, "Base message '{}' not found in chain", base_message);
          }
        }
    }

    #[test]
    fn transient_and_fatal_errors_are_distinguished() {
        let open = LcdError::open_failed(
            PathBuf::from("/dev/ttyS1"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let write = LcdError::write_failed(
            "flush",
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "x"),
        );
        let closed = LcdError::LinkClosed {
            path: PathBuf::from("/dev/ttyS1"),
        };

        assert!(!open.is_retryable());
        assert!(write.is_retryable());
        assert!(!closed.is_retryable());
        assert!(LcdError::metrics_failed("slow").is_retryable());
        assert!(!LcdError::config_error("ezio.yaml", "bad").is_retryable());
    }

    #[test]
    fn every_error_has_suggestions() {
        let errors = vec![
            LcdError::open_failed(PathBuf::from("/x"), std::io::Error::other("x")),
            LcdError::write_failed("flush", std::io::Error::other("x")),
            LcdError::Read {
                source: std::io::Error::other("x"),
            },
            LcdError::LinkClosed {
                path: PathBuf::from("/x"),
            },
            LcdError::metrics_failed("x"),
            LcdError::menu_action_failed("Refresh", std::io::Error::other("x")),
            LcdError::config_error("/x", "x"),
            LcdError::invalid_argument("x"),
            LcdError::timed_out(Duration::from_secs(1)),
            LcdError::unsupported_platform("Serial ports", "Unix"),
        ];

        for error in errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LcdError>();

        let error = LcdError::invalid_argument("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn anyhow_errors_convert_into_menu_action_failures() {
        let failure = anyhow::anyhow!("backlight write failed");
        let error = LcdError::menu_action_failed("Backlight: Max", failure);
        let source = std::error::Error::source(&error).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("backlight write failed"));
    }
}
