//! Error types for the transfer library.

use thiserror::Error;

/// Main error type for transfer operations.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Configuration error (invalid YAML, missing fields, unknown transform names, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mapping compiled to zero destination columns - there is nothing to transfer
    #[error("Mapping for table {0} selects no columns and defines no extra columns")]
    EmptyMapping(String),

    /// SELECT or COUNT against the source failed (bad table/condition, lost connection mid-stream)
    #[error("Source query failed: {message}")]
    SourceQuery { message: String },

    /// Bulk insert or commit against the destination failed
    #[error("Destination write failed for table {table}: {message}")]
    DestinationWrite { table: String, message: String },

    /// A transform faulted while computing a destination cell
    #[error("Transform failed for column {column}: {message}")]
    Transform { column: String, message: String },

    /// Source driver error (connection, protocol, row decoding)
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Destination driver error (connection, protocol, statement execution)
    #[error("Destination database error: {0}")]
    Destination(#[from] mysql_async::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transfer was cancelled (SIGINT, etc.)
    #[error("Transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        TransferError::Config(message.into())
    }

    /// Create a SourceQuery error from any displayable failure
    pub fn source_query(message: impl ToString) -> Self {
        TransferError::SourceQuery {
            message: message.to_string(),
        }
    }

    /// Create a DestinationWrite error for a specific table
    pub fn destination_write(table: impl Into<String>, message: impl ToString) -> Self {
        TransferError::DestinationWrite {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transform error for a specific destination column
    pub fn transform(column: impl Into<String>, message: impl Into<String>) -> Self {
        TransferError::Transform {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    ///
    /// 1 = config error, 2 = transfer failure, 7 = IO error, 130 = cancelled.
    pub fn exit_code(&self) -> u8 {
        match self {
            TransferError::Config(_)
            | TransferError::EmptyMapping(_)
            | TransferError::Yaml(_)
            | TransferError::Json(_) => 1,
            TransferError::SourceQuery { .. }
            | TransferError::DestinationWrite { .. }
            | TransferError::Transform { .. }
            | TransferError::Source(_)
            | TransferError::Destination(_) => 2,
            TransferError::Io(_) => 7,
            TransferError::Cancelled => 130,
        }
    }
}

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;
