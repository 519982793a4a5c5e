//! Error types for the bulk-transfer library.

use thiserror::Error;

/// Main error type for bulk-transfer operations.
#[derive(Error, Debug)]
pub enum BulkError {
    /// Configuration error (invalid YAML, page size above the remote ceiling, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller input rejected before anything was dispatched
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Network failure or non-success HTTP status
    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        message: String,
        status: Option<u16>,
    },

    /// Response body was not JSON or lacked the expected structure
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The remote store rejected the whole request
    #[error("Remote store rejected request (code {code}): {message}")]
    RemoteRejected { code: String, message: String },

    /// Too many consecutive failures of the same chunk
    #[error("{operation}: gave up after {attempts} consecutive failed attempts")]
    ExhaustedRetry {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<BulkError>,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BulkError {
    /// Create a Transport error
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        BulkError::Transport {
            message: message.into(),
            status,
        }
    }

    /// Create a RemoteRejected error
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        BulkError::RemoteRejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the retry controller may re-attempt the chunk that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BulkError::Transport { .. }
                | BulkError::MalformedResponse(_)
                | BulkError::RemoteRejected { .. }
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            BulkError::Config(_) | BulkError::Yaml(_) => 2,
            BulkError::InvalidArgument(_) => 3,
            BulkError::ExhaustedRetry { .. } => 4,
            BulkError::RemoteRejected { .. } => 5,
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

/// Result type alias for bulk-transfer operations.
pub type Result<T> = std::result::Result<T, BulkError>;
