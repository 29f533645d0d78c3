//! Domain models for sheethook.
//!
//! Cells stay as [`serde_json::Value`] end to end: spreadsheet sources hand us
//! strings, numbers and booleans, and `null` stands for an undefined cell.
//!
//! - [`Grid`] - rows of positional cells, header row first
//! - [`ContextTree`] - nested object built from a Context sheet
//! - [`RowObject`] - header name to cell value for a single row
//! - [`Payload`] - the object posted to the webhook
//! - [`TriggerMeta`] - who edited what, and when

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Sheet Data
// =============================================================================

/// Ordered rows of cells. Row 0 is the header.
pub type Grid = Vec<Vec<Value>>;

/// Context sheet turned into an object. Values are coerced leaves or one
/// level of nested objects (collections).
pub type ContextTree = Map<String, Value>;

/// A single row keyed by header. Missing positions hold [`ABSENT`].
pub type RowObject = Map<String, Value>;

/// Final webhook body.
pub type Payload = Map<String, Value>;

/// Marker stored for header positions the data row does not reach.
pub const ABSENT: Value = Value::Null;

static EMPTY_CELL: Value = Value::Null;

/// A cell is empty when it is undefined (`null`) or the empty string.
///
/// `0`, `false` and whitespace-only strings are present values.
pub fn is_empty_cell(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Cell at `index`, or `null` when the row is too short.
pub fn cell_at(row: &[Value], index: usize) -> &Value {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

/// Render a cell as an object key.
///
/// Strings are used verbatim, numbers and booleans in their JSON spelling.
/// Returns `None` for arrays and objects, which have no key form.
pub fn cell_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Short JSON type name, for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Trigger Metadata
// =============================================================================

/// Metadata describing the edit that fired the trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMeta {
    /// Spreadsheet identity.
    pub spreadsheet_id: String,
    /// Active sheet name.
    pub sheet_name: String,
    /// Edited row, 1-based.
    pub row: u32,
    /// Acting user (usually an email address).
    pub user: String,
    /// When the edit happened.
    pub edited_at: DateTime<Utc>,
}

// =============================================================================
// Edit Events
// =============================================================================

/// An edit forwarded by the spreadsheet trigger.
///
/// The service has no direct sheet access, so the trigger ships whatever the
/// target sheet needs: the full grid for a Context edit, the header and
/// edited row for an Epics edit (plus, optionally, the Context grid so a
/// cache miss can be filled).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEvent {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// Edited row, 1-based.
    pub row: u32,
    /// Edited column, 1-based.
    pub column: u32,
    /// New value of the edited cell.
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub user: String,
    /// Defaults to the time the event is received.
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    /// Full grid of the edited sheet (Context edits).
    #[serde(default)]
    pub grid: Option<Grid>,
    /// Header row of the edited sheet (Epics edits).
    #[serde(default)]
    pub headers: Option<Vec<Value>>,
    /// Values of the edited row (Epics edits).
    #[serde(default)]
    pub row_values: Option<Vec<Value>>,
    /// Snapshot of the Context sheet (Epics edits, used on cache miss).
    #[serde(default)]
    pub context_grid: Option<Grid>,
    /// Last row number of the Context sheet, when no snapshot is shipped.
    #[serde(default)]
    pub context_last_row: Option<usize>,
}

impl EditEvent {
    /// Trigger metadata for this edit, stamped with `now` if the event has no time.
    pub fn meta(&self, now: DateTime<Utc>) -> TriggerMeta {
        TriggerMeta {
            spreadsheet_id: self.spreadsheet_id.clone(),
            sheet_name: self.sheet_name.clone(),
            row: self.row,
            user: self.user.clone(),
            edited_at: self.edited_at.unwrap_or(now),
        }
    }
}
