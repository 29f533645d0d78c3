//! # sheethook - spreadsheet edits to JSON webhooks
//!
//! Turns edits on a spreadsheet into JSON: a Context sheet becomes a nested
//! context tree (cached), and a trigger value on an Epics row sends that row,
//! the context tree and edit metadata to a webhook.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌─────────────┐     ┌──────────────┐     ┌────────────┐
//! │ Edit event │────▶│ EditHandler │────▶│ Context tree │────▶│   Cache    │
//! │  (trigger) │     │  (routing)  │     │  / row map   │     │ (6h TTL)   │
//! └────────────┘     └─────────────┘     └──────┬───────┘     └────────────┘
//!                                               ▼
//!                                        ┌──────────────┐     ┌────────────┐
//!                                        │   Payload    │────▶│  Webhook   │
//!                                        └──────────────┘     └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use sheethook::transform;
//!
//! let grid = vec![
//!     vec![json!("Collection"), json!(""), json!(""), json!("Key"), json!(""), json!(""), json!("Value")],
//!     vec![json!("Team"), json!(""), json!(""), json!("size"), json!(""), json!(""), json!("5")],
//! ];
//! let tree = transform(Some(&grid[..]));
//! assert_eq!(tree["Team"]["size"], 5);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Grid, tree, payload and event types
//! - [`parser`] - Grid loading from CSV/JSON exports
//! - [`transform`] - Coercion, context tree, row mapping, payload, trigger, pipeline
//! - [`cache`] - TTL cache for context trees
//! - [`webhook`] - Outbound delivery
//! - [`config`] - Explicit configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Input
pub mod parser;

// Transformation
pub mod transform;

// I/O
pub mod cache;
pub mod config;
pub mod webhook;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    CacheError, ConfigError, ContextError, GridError, PayloadError, PipelineError, RowError,
    WebhookError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    is_empty_cell, ContextTree, EditEvent, Grid, Payload, RowObject, TriggerMeta, ABSENT,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_grid, parse_grid_file,
    parse_json_grid, ParsedGrid,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    assemble, coerce_leaf, is_target_trigger, map_row, transform, try_assemble, try_map_row,
    try_parse_literal, try_transform, Coerced, EditHandler, EditOutcome, TRIGGER_SENTINEL,
};

// =============================================================================
// Re-exports - I/O
// =============================================================================

pub use cache::{context_cache_key, ContextCache};
pub use config::Config;
pub use webhook::WebhookClient;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
