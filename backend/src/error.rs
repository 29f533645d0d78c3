//! Error types for the sheethook pipeline.
//!
//! One enum per concern:
//!
//! - [`GridError`] - loading a grid from CSV/JSON
//! - [`ContextError`] - building a context tree
//! - [`RowError`] - mapping a header row and a data row
//! - [`PayloadError`] - assembling the webhook payload
//! - [`CacheError`] - context cache (de)serialization
//! - [`WebhookError`] - outbound webhook delivery
//! - [`ConfigError`] - configuration loading
//! - [`PipelineError`] - top-level edit handling
//!
//! Lower-level errors convert into [`PipelineError`] via `From`,
//! so `?` works across the boundaries.

use thiserror::Error;

// =============================================================================
// Grid Loading Errors
// =============================================================================

/// Errors while loading a grid from an exported sheet.
#[derive(Debug, Error)]
pub enum GridError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV content.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    /// JSON grid is not an array of arrays.
    #[error("Invalid JSON grid: {0}")]
    InvalidJson(String),

    /// Nothing to read.
    #[error("Sheet is empty")]
    Empty,
}

// =============================================================================
// Context Tree Errors
// =============================================================================

/// Errors while turning a Context sheet into a tree.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No grid was supplied at all.
    #[error("No grid data supplied")]
    MissingGrid,

    /// A cell used as a key is an array or object.
    #[error("Row {row}, column {column}: cell cannot be used as a key")]
    InvalidKey { row: usize, column: char },
}

// =============================================================================
// Row Mapping Errors
// =============================================================================

/// Errors while zipping headers with a data row.
#[derive(Debug, Error)]
pub enum RowError {
    /// A header cell is an array or object.
    #[error("Header at position {0} cannot be used as a key")]
    InvalidHeader(usize),
}

// =============================================================================
// Payload Errors
// =============================================================================

/// Errors while assembling a webhook payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Row data is not a JSON object.
    #[error("Row data must be an object, got {0}")]
    InvalidRowObject(&'static str),

    /// Context is not a JSON object.
    #[error("Context must be an object, got {0}")]
    InvalidContext(&'static str),
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors from the context cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Tree could not be serialized for storage.
    #[error("Cache JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Webhook Errors
// =============================================================================

/// Errors from the outbound webhook call.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Webhook answered with something other than 200.
    #[error("Webhook returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level edit handling errors.
///
/// This is the error type returned by
/// [`crate::transform::pipeline::EditHandler::handle`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Context tree error.
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Row mapping error.
    #[error("Row error: {0}")]
    Row(#[from] RowError),

    /// Payload error.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Cache error.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Webhook error.
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Context sheet edit arrived without its grid.
    #[error("Edit on sheet '{0}' carries no grid data")]
    MissingGrid(String),

    /// Epics edit arrived without header or row data.
    #[error("Edit on sheet '{0}' carries no row data")]
    MissingRow(String),

    /// No webhook configured for the operation.
    #[error("No webhook configured for operation '{0}'")]
    MissingWebhook(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grid loading.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for webhook delivery.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Result type for edit handling.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let ctx_err = ContextError::MissingGrid;
        let pipeline_err: PipelineError = ctx_err.into();
        assert!(pipeline_err.to_string().contains("No grid"));

        let hook_err = WebhookError::UnexpectedStatus { status: 500, body: "boom".into() };
        let pipeline_err: PipelineError = hook_err.into();
        assert!(pipeline_err.to_string().contains("500"));
    }

    #[test]
    fn test_invalid_key_format() {
        let err = ContextError::InvalidKey { row: 4, column: 'D' };
        let msg = err.to_string();
        assert!(msg.contains("Row 4"));
        assert!(msg.contains("column D"));
    }
}
