//! REST API types.
//!
//! Field names are camelCase to match what the Apps Script forwarder sends
//! and expects back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::ContextTree;
use crate::parser::ParsedGrid;
use crate::transform::EditOutcome;

/// Response to `POST /api/edit`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    /// Unique request identifier, echoed in logs
    pub request_id: String,
    /// Always "ok"; failures use [`error_response`]
    pub status: String,
    pub result: EditOutcome,
}

impl EditResponse {
    pub fn new(request_id: String, result: EditOutcome) -> Self {
        Self { request_id, status: "ok".to_string(), result }
    }
}

/// Response to the context endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub request_id: String,
    pub status: String,
    pub context: ContextTree,
    pub metadata: GridMetadata,
}

/// What was read from the submitted sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridMetadata {
    /// Rows received, header included
    pub row_count: usize,
    /// Top-level entries in the built tree
    pub entries: usize,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
}

impl ContextResponse {
    /// Response for a grid posted as JSON
    pub fn from_rows(row_count: usize, context: ContextTree) -> Self {
        Self::build(row_count, context, None, None)
    }

    /// Response for an uploaded file
    pub fn from_parsed(parsed: &ParsedGrid, context: ContextTree) -> Self {
        Self::build(
            parsed.last_row(),
            context,
            Some(parsed.encoding.clone()),
            parsed.delimiter.map(format_delimiter),
        )
    }

    fn build(
        row_count: usize,
        context: ContextTree,
        encoding: Option<String>,
        delimiter: Option<String>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: "ok".to_string(),
            metadata: GridMetadata { row_count, entries: context.len(), encoding, delimiter },
            context,
        }
    }
}

/// Printable delimiter
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_response_shape() {
        let response = EditResponse::new(
            "req-1".into(),
            EditOutcome::ContextRefreshed { cache_key: "contextData_s_3".into(), entries: 2 },
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["result"]["outcome"], "contextRefreshed");
        assert_eq!(json["result"]["cacheKey"], "contextData_s_3");
        assert_eq!(json["result"]["entries"], 2);
    }

    #[test]
    fn test_context_response_metadata() {
        let mut tree = ContextTree::new();
        tree.insert("sprint".into(), json!(12));
        let response = ContextResponse::from_rows(5, tree);
        assert_eq!(response.metadata.row_count, 5);
        assert_eq!(response.metadata.entries, 1);
        assert!(response.metadata.delimiter.is_none());
    }

    #[test]
    fn test_error_response() {
        let err = error_response("no grid");
        assert_eq!(err["status"], "error");
        assert_eq!(err["error"], "no grid");
        assert!(err["requestId"].is_string());
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter('\t'), "TAB");
        assert_eq!(format_delimiter(';'), ";");
    }
}
