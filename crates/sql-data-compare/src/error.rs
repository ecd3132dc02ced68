//! Error types for the comparison library.

use std::fmt;

use thiserror::Error;

/// Which of the two queries in a comparison an error or value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for comparison operations.
#[derive(Error, Debug)]
pub enum CompareError {
    /// Configuration error (invalid YAML, missing fields, unknown connection, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host unreachable or authentication failure
    #[error("Connection failed for {spec} ({side}): {message}")]
    Connection {
        spec: String,
        side: Side,
        message: String,
    },

    /// Syntax, runtime or timeout failure while executing a query
    #[error("Query failed for {spec} ({side}): {message}")]
    QueryExecution {
        spec: String,
        side: Side,
        message: String,
    },

    /// The two queries do not project the same columns
    #[error(
        "Column mismatch for {spec}: left-only [{}], right-only [{}]",
        left_only.join(", "),
        right_only.join(", ")
    )]
    SchemaMismatch {
        spec: String,
        left_only: Vec<String>,
        right_only: Vec<String>,
    },

    /// A value cannot be coerced to a comparable canonical form
    #[error("Cannot normalize column {column} for {spec}: {message}")]
    Normalization {
        spec: String,
        column: String,
        message: String,
    },

    /// Destination unwritable or serialization failure
    #[error("Output failed for {spec}: {message}")]
    Render { spec: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Comparison run cancelled")]
    Cancelled,
}

impl CompareError {
    /// Create a Connection error.
    pub fn connection(spec: impl Into<String>, side: Side, message: impl fmt::Display) -> Self {
        CompareError::Connection {
            spec: spec.into(),
            side,
            message: message.to_string(),
        }
    }

    /// Create a QueryExecution error.
    pub fn query(spec: impl Into<String>, side: Side, message: impl fmt::Display) -> Self {
        CompareError::QueryExecution {
            spec: spec.into(),
            side,
            message: message.to_string(),
        }
    }

    /// Create a Render error.
    pub fn render(spec: impl Into<String>, message: impl fmt::Display) -> Self {
        CompareError::Render {
            spec: spec.into(),
            message: message.to_string(),
        }
    }

    /// Side the error is attributed to, if any.
    pub fn side(&self) -> Option<Side> {
        match self {
            CompareError::Connection { side, .. } | CompareError::QueryExecution { side, .. } => {
                Some(*side)
            }
            _ => None,
        }
    }

    /// Process exit code for the CLI.
    ///
    /// 2 is reserved for problems with the invocation itself (bad config, missing
    /// files); everything else maps to 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            CompareError::Config(_) | CompareError::Yaml(_) | CompareError::Io(_) => 2,
            CompareError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for comparison operations.
pub type Result<T> = std::result::Result<T, CompareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_carries_spec_and_side() {
        let err = CompareError::query("Orders", Side::Right, "Invalid object name 'dbo.Ordr'");
        assert_eq!(err.side(), Some(Side::Right));
        let msg = err.to_string();
        assert!(msg.contains("Orders"));
        assert!(msg.contains("right"));
        assert!(msg.contains("dbo.Ordr"));
    }

    #[test]
    fn test_schema_mismatch_lists_columns() {
        let err = CompareError::SchemaMismatch {
            spec: "Customers".into(),
            left_only: vec!["email".into()],
            right_only: vec!["mail".into(), "phone".into()],
        };
        assert_eq!(
            err.to_string(),
            "Column mismatch for Customers: left-only [email], right-only [mail, phone]"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CompareError::Config("bad".into()).exit_code(), 2);
        assert_eq!(CompareError::render("x", "disk full").exit_code(), 1);
        assert_eq!(CompareError::Cancelled.exit_code(), 130);
    }
}
