//! Decide whether an Epics edit should fire the webhook.

use serde_json::Value;

/// Column J, 1-based.
pub const TARGET_COLUMN: u32 = 10;

/// Exact cell value that activates the pipeline.
pub const TRIGGER_SENTINEL: &str = "Groom EPIC";

/// True only for column J set to exactly [`TRIGGER_SENTINEL`].
pub fn is_target_trigger(column: u32, value: &Value) -> bool {
    column == TARGET_COLUMN && value.as_str() == Some(TRIGGER_SENTINEL)
}
