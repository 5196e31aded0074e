//! Error types for axlens.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into four main categories:
//! - **Configuration**: Invalid date ranges, config file parsing, bad flag values
//! - **Upstream**: Non-200 responses, network failures, warehouse query failures
//! - **Data**: Expected fields missing or non-numeric in fetched rows
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `AXL-C001`) for programmatic handling.
//!
//! Division-by-zero in derived series is deliberately *not* an error: ratios with
//! a zero or absent denominator surface as `Option::None` in series output so
//! downstream consumers render a blank cell rather than a fake zero.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration issues (invalid ranges, parse errors, bad values).
    Configuration,
    /// Upstream fetch issues (HTTP status, network, warehouse).
    Upstream,
    /// Data shape issues (missing fields, non-numeric values).
    Data,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::Upstream => "Upstream fetch error",
            Self::Data => "Data shape error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Configuration => "C",
            Self::Upstream => "U",
            Self::Data => "D",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Configuration or parse errors
    ConfigError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for axlens operations.
///
/// Each variant has:
/// - A stable error code (e.g., `AXL-C001`)
/// - A category for classification
/// - A retryable flag for callers that want to refetch
#[derive(Error, Debug)]
pub enum AxlensError {
    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Date range where start is after end. Fails fast before any fetch.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    /// Configuration file not found at expected path.
    #[error("config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value for a config key or CLI flag.
    #[error("invalid value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    // ==========================================================================
    // Upstream errors (Category: Upstream)
    // ==========================================================================
    /// HTTP endpoint returned a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// Request timed out.
    #[error("request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    /// Generic network failure (DNS, connect, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Warehouse query execution failed.
    #[error("warehouse query failed: {message}")]
    Warehouse { message: String },

    // ==========================================================================
    // Data errors (Category: Data)
    // ==========================================================================
    /// An expected field was absent from a fetched row or record.
    #[error("missing field '{field}'")]
    MissingField { field: String },

    /// A field held a value that could not be converted to a number.
    #[error("field '{field}' is not numeric: {value}")]
    DataConversion { field: String, value: String },

    /// Upstream response body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AxlensError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidDateRange { .. }
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. } => ExitCode::ConfigError,

            Self::Timeout { .. } => ExitCode::Timeout,

            Self::Http { .. }
            | Self::Network(_)
            | Self::Warehouse { .. }
            | Self::MissingField { .. }
            | Self::DataConversion { .. }
            | Self::ParseResponse(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDateRange { .. }
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. } => ErrorCategory::Configuration,

            Self::Http { .. } | Self::Timeout { .. } | Self::Network(_) | Self::Warehouse { .. } => {
                ErrorCategory::Upstream
            }

            Self::MissingField { .. } | Self::DataConversion { .. } | Self::ParseResponse(_) => {
                ErrorCategory::Data
            }

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `AXL-{category}{number}` where category is:
    /// - C: Configuration
    /// - U: Upstream
    /// - D: Data
    /// - X: Internal
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            // Configuration errors (C001-C099)
            Self::InvalidDateRange { .. } => "AXL-C001",
            Self::ConfigNotFound { .. } => "AXL-C002",
            Self::ConfigParse { .. } => "AXL-C003",
            Self::ConfigInvalid { .. } => "AXL-C004",

            // Upstream errors (U001-U099)
            Self::Http { .. } => "AXL-U001",
            Self::Timeout { .. } => "AXL-U002",
            Self::Network(_) => "AXL-U003",
            Self::Warehouse { .. } => "AXL-U004",

            // Data errors (D001-D099)
            Self::MissingField { .. } => "AXL-D001",
            Self::DataConversion { .. } => "AXL-D002",
            Self::ParseResponse(_) => "AXL-D003",

            // Internal errors (X001-X099)
            Self::Io(_) => "AXL-X001",
            Self::Json(_) => "AXL-X002",
            Self::Other(_) => "AXL-X099",
        }
    }

    /// Returns whether the error is potentially recoverable by refetching.
    ///
    /// Transient upstream failures qualify; configuration and data-shape
    /// errors do not (the same input will fail the same way).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network(_) | Self::Http { .. }
        )
    }

    /// Whether the CLI boundary should downgrade this error to a warning
    /// plus an empty result set instead of failing the whole command.
    ///
    /// Per-chart scoping: a dead API or a malformed payload costs one chart,
    /// not the page.
    #[must_use]
    pub const fn is_warn_and_empty(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Upstream | ErrorCategory::Data
        )
    }
}

/// Result type alias for axlens operations.
pub type Result<T> = std::result::Result<T, AxlensError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_category_description() {
        assert_eq!(
            ErrorCategory::Configuration.description(),
            "Configuration error"
        );
        assert_eq!(ErrorCategory::Upstream.description(), "Upstream fetch error");
        assert_eq!(ErrorCategory::Data.description(), "Data shape error");
        assert_eq!(ErrorCategory::Internal.description(), "Internal error");
    }

    #[test]
    fn error_category_code_prefix() {
        assert_eq!(ErrorCategory::Configuration.code_prefix(), "C");
        assert_eq!(ErrorCategory::Upstream.code_prefix(), "U");
        assert_eq!(ErrorCategory::Data.code_prefix(), "D");
        assert_eq!(ErrorCategory::Internal.code_prefix(), "X");
    }

    #[test]
    fn configuration_errors_have_correct_category() {
        let err = AxlensError::InvalidDateRange {
            start: "2024-02-01".to_string(),
            end: "2024-01-01".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), ExitCode::ConfigError);

        let err = AxlensError::ConfigInvalid {
            key: "granularity".to_string(),
            value: "fortnight".to_string(),
            message: "expected day, week, or month".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn upstream_errors_have_correct_category() {
        let err = AxlensError::Http {
            url: "https://api.dune.com/x".to_string(),
            status: 500,
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);

        let err = AxlensError::Warehouse {
            message: "no such table".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);

        let err = AxlensError::Timeout { seconds: 30 };
        assert_eq!(err.exit_code(), ExitCode::Timeout);
    }

    #[test]
    fn data_errors_have_correct_category() {
        let err = AxlensError::MissingField {
            field: "num_txs".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);

        let err = AxlensError::DataConversion {
            field: "volume".to_string(),
            value: "n/a".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn internal_errors_have_correct_category() {
        let err = AxlensError::Json(serde_json::from_str::<()>("invalid").unwrap_err());
        assert_eq!(err.category(), ErrorCategory::Internal);

        let err = AxlensError::Other(anyhow::anyhow!("unexpected"));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }

    #[test]
    fn error_codes_follow_format() {
        let errors: Vec<AxlensError> = vec![
            AxlensError::InvalidDateRange {
                start: "a".to_string(),
                end: "b".to_string(),
            },
            AxlensError::Http {
                url: "u".to_string(),
                status: 404,
            },
            AxlensError::MissingField {
                field: "f".to_string(),
            },
            AxlensError::Timeout { seconds: 1 },
        ];

        for err in errors {
            let code = err.error_code();
            assert!(
                code.starts_with("AXL-"),
                "Error code {code} should start with AXL-"
            );
            assert!(
                code.contains(err.category().code_prefix()),
                "Error code {code} should contain its category prefix"
            );
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(AxlensError::Timeout { seconds: 30 }.is_retryable());
        assert!(AxlensError::Network("reset".to_string()).is_retryable());
        assert!(
            AxlensError::Http {
                url: "u".to_string(),
                status: 503,
            }
            .is_retryable()
        );

        assert!(
            !AxlensError::InvalidDateRange {
                start: "a".to_string(),
                end: "b".to_string(),
            }
            .is_retryable()
        );
        assert!(
            !AxlensError::DataConversion {
                field: "f".to_string(),
                value: "v".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn warn_and_empty_covers_upstream_and_data() {
        assert!(
            AxlensError::Http {
                url: "u".to_string(),
                status: 500,
            }
            .is_warn_and_empty()
        );
        assert!(
            AxlensError::MissingField {
                field: "date".to_string(),
            }
            .is_warn_and_empty()
        );
        assert!(
            !AxlensError::InvalidDateRange {
                start: "a".to_string(),
                end: "b".to_string(),
            }
            .is_warn_and_empty()
        );
    }
}
