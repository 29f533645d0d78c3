//! Assemble the webhook payload from row data, context and trigger metadata.
//!
//! ```json
//! {
//!   "context":   { ...context tree, verbatim... },
//!   "eventData": { ...non-empty row entries... },
//!   "gsheet_id": "1AbC", "sheet_name_id": "Epics", "row_id": 7,
//!   "user_id": "pm@example.com", "modify_time": "2024-05-01T09:30:00.000Z"
//! }
//! ```

use chrono::SecondsFormat;
use serde_json::{json, Map, Value};

use crate::api::logs::log_error;
use crate::error::PayloadError;
use crate::models::{is_empty_cell, type_name, Payload, TriggerMeta};

/// Assemble a payload, returning `{}` on failure.
pub fn assemble(row: &Value, context: &Value, meta: Option<&TriggerMeta>) -> Payload {
    match try_assemble(row, context, meta) {
        Ok(payload) => payload,
        Err(e) => {
            log_error(format!("Payload assembly failed: {}", e));
            Map::new()
        }
    }
}

/// Assemble a payload.
///
/// `row` and `context` must both be objects. Empty row values (`null`, `""`)
/// are left out of `eventData`; `0` and `false` are kept.
pub fn try_assemble(
    row: &Value,
    context: &Value,
    meta: Option<&TriggerMeta>,
) -> Result<Payload, PayloadError> {
    let row = row
        .as_object()
        .ok_or_else(|| PayloadError::InvalidRowObject(type_name(row)))?;
    if !context.is_object() {
        return Err(PayloadError::InvalidContext(type_name(context)));
    }

    let event_data: Map<String, Value> = row
        .iter()
        .filter(|(_, v)| !is_empty_cell(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut payload = Map::new();
    payload.insert("context".to_string(), context.clone());
    payload.insert("eventData".to_string(), Value::Object(event_data));

    if let Some(meta) = meta {
        payload.insert("gsheet_id".to_string(), json!(meta.spreadsheet_id));
        payload.insert("sheet_name_id".to_string(), json!(meta.sheet_name));
        payload.insert("row_id".to_string(), json!(meta.row));
        payload.insert("user_id".to_string(), json!(meta.user));
        payload.insert(
            "modify_time".to_string(),
            json!(meta.edited_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn meta() -> TriggerMeta {
        TriggerMeta {
            spreadsheet_id: "1AbC".into(),
            sheet_name: "Epics".into(),
            row: 7,
            user: "pm@example.com".into(),
            edited_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_falsy_values_survive() {
        let payload = assemble(&json!({"A": 0, "B": "", "C": false}), &json!({}), None);
        assert_eq!(payload["eventData"], json!({"A": 0, "C": false}));
        assert_eq!(payload["context"], json!({}));
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_absent_values_dropped() {
        let payload = assemble(&json!({"A": null, "B": "x", "C": " "}), &json!({}), None);
        assert_eq!(payload["eventData"], json!({"B": "x", "C": " "}));
    }

    #[test]
    fn test_context_passes_through() {
        let context = json!({"Team": {"lead": "Ana", "empty": ""}, "sprint": 12});
        let payload = assemble(&json!({"Title": "Login"}), &context, None);
        assert_eq!(payload["context"], context);
    }

    #[test]
    fn test_metadata_fields() {
        let payload = assemble(&json!({"Title": "Login"}), &json!({}), Some(&meta()));
        assert_eq!(payload["gsheet_id"], "1AbC");
        assert_eq!(payload["sheet_name_id"], "Epics");
        assert_eq!(payload["row_id"], 7);
        assert_eq!(payload["user_id"], "pm@example.com");
        assert_eq!(payload["modify_time"], "2024-05-01T09:30:00.000Z");
        assert_eq!(payload.len(), 7);
    }

    #[test]
    fn test_non_object_inputs_degrade_to_empty() {
        assert!(matches!(
            try_assemble(&json!(["x"]), &json!({}), None),
            Err(PayloadError::InvalidRowObject("array"))
        ));
        assert!(matches!(
            try_assemble(&json!({}), &json!("ctx"), None),
            Err(PayloadError::InvalidContext("string"))
        ));
        assert!(assemble(&json!(null), &json!({}), Some(&meta())).is_empty());
    }
}
