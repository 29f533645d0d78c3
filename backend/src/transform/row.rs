//! Zip a header row with a data row into a keyed object.

use serde_json::{Map, Value};

use crate::api::logs::log_error;
use crate::error::RowError;
use crate::models::{cell_key, RowObject, ABSENT};

/// Map a row by header, returning `{}` on failure.
pub fn map_row(headers: &[Value], row: &[Value]) -> RowObject {
    match try_map_row(headers, row) {
        Ok(obj) => obj,
        Err(e) => {
            log_error(format!("Row mapping failed: {}", e));
            Map::new()
        }
    }
}

/// One entry per header, in header order.
///
/// Positions past the end of `row` map to [`ABSENT`]; values past the end of
/// `headers` are dropped.
pub fn try_map_row(headers: &[Value], row: &[Value]) -> Result<RowObject, RowError> {
    let mut obj = Map::new();

    for (i, header) in headers.iter().enumerate() {
        let name = cell_key(header).ok_or(RowError::InvalidHeader(i))?;
        let value = row.get(i).cloned().unwrap_or(ABSENT);
        obj.insert(name, value);
    }

    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_row_gets_absent_marker() {
        let obj = map_row(&[json!("A"), json!("B")], &[json!("x")]);
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["A"], "x");
        assert_eq!(obj["B"], ABSENT);
    }

    #[test]
    fn test_extra_values_ignored() {
        let obj = map_row(&[json!("A")], &[json!(1), json!(2), json!(3)]);
        assert_eq!(Value::Object(obj), json!({"A": 1}));
    }

    #[test]
    fn test_header_order_is_kept() {
        let obj = map_row(
            &[json!("Title"), json!("Owner"), json!("Points")],
            &[json!("Login"), json!("ana"), json!(8)],
        );
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys, vec!["Title", "Owner", "Points"]);
    }

    #[test]
    fn test_numeric_header() {
        let obj = map_row(&[json!(2024)], &[json!("plan")]);
        assert_eq!(obj["2024"], "plan");
    }

    #[test]
    fn test_invalid_header_degrades_to_empty() {
        let headers = [json!("A"), json!({"nested": true})];
        assert!(matches!(
            try_map_row(&headers, &[json!(1), json!(2)]),
            Err(RowError::InvalidHeader(1))
        ));
        assert!(map_row(&headers, &[json!(1), json!(2)]).is_empty());
    }
}
