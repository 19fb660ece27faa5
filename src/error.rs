//! Error types for the table engine.
//!
//! Every failure a caller can observe funnels through [`EngineError`].
//! Driver failures pass through unmodified; the engine never retries,
//! wraps, or suppresses them.

use thiserror::Error;

/// Result type for all engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the table engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or duplicate column declarations at `init()` time.
    /// Fatal to that table's initialization; never retried.
    #[error("schema error on table '{table}': {reason}")]
    Schema { table: String, reason: String },

    /// A value failed validation, or a write named a column that does
    /// not exist. Raised before any driver call is made.
    #[error("validation failed for column '{column}': {reason}")]
    Validation { column: String, reason: String },

    /// Malformed query template input.
    #[error("template syntax error: {reason}")]
    TemplateSyntax { reason: String },

    /// A query was issued against a table whose `init()` has not run.
    #[error("table '{table}' has not been initialized")]
    TableNotInitialized { table: String },

    /// A lazily recorded column operation had no meaning to the driver
    /// when it was finally replayed.
    #[error("unsupported column operation '{op}' on column '{column}'")]
    UnsupportedDdl { op: String, column: String },

    /// Opaque passthrough of any failure surfaced by the driver.
    #[error("driver error: {0}")]
    Driver(#[from] rusqlite::Error),
}
