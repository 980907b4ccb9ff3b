//! Error types for table copy runs.
//!
//! `ServiceError` is what the table service reports for a single call.
//! `CopyError` is the outcome of a whole run and decides whether the
//! destination table has to be rolled back.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for table service calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Faults raised by a [`TableService`](crate::dynamodb::TableService) call.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("table '{table}' not found")]
    NotFound { table: String },

    #[error("DynamoDB {operation} on '{table}' failed: {message}")]
    Sdk {
        operation: &'static str,
        table: String,
        message: String,
    },

    #[error("failed to build {what} request: {message}")]
    Build { what: &'static str, message: String },

    #[error("{remaining} items still unprocessed on '{table}' after {stalled:?} without progress")]
    UnprocessedItems {
        table: String,
        remaining: usize,
        stalled: Duration,
    },

    #[error("timed out after {waited:?} waiting for table '{table}' to become {target}")]
    WaitTimeout {
        table: String,
        target: &'static str,
        waited: Duration,
    },

    #[error("description of table '{table}' is missing {field}")]
    MalformedDescription { table: String, field: &'static str },
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

/// Fatal outcomes of a copy run. Every variant ends the process with a
/// non-zero exit status.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("the source table '{table}' does not exist, create it first and try again")]
    SourceNotFound { table: String },

    #[error("the destination table '{table}' already exists, delete it first and try again")]
    DestinationAlreadyExists { table: String },

    #[error("failed to create the destination table '{table}'")]
    SchemaCreationFailed {
        table: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to migrate data into '{table}', the destination table was deleted")]
    MigrationFailed {
        table: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to migrate data into '{table}' ({migration}), and deleting it failed too")]
    RollbackFailed {
        table: String,
        migration: ServiceError,
        #[source]
        cleanup: ServiceError,
    },

    #[error("unexpected DynamoDB fault")]
    UnexpectedServiceFault(#[from] ServiceError),
}
