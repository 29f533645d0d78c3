//! Transformation module.
//!
//! Pure sheet-to-JSON steps plus the pipeline that drives them:
//! - Coerce: best-effort JSON literal parsing of cell text
//! - Context: Context sheet grid to nested context tree
//! - Row: header row + data row to keyed object
//! - Payload: row object + context + trigger metadata to webhook body
//! - Trigger: Epics sentinel check
//! - Pipeline: edit routing, caching and delivery

pub mod coerce;
pub mod context;
pub mod payload;
pub mod pipeline;
pub mod row;
pub mod trigger;

pub use coerce::{coerce_leaf, try_parse_literal, Coerced};
pub use context::{transform, try_transform};
pub use payload::{assemble, try_assemble};
pub use pipeline::{context_from_grid, ContextSource, EditHandler, EditOutcome};
pub use row::{map_row, try_map_row};
pub use trigger::{is_target_trigger, TARGET_COLUMN, TRIGGER_SENTINEL};
