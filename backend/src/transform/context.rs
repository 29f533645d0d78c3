//! Turn a Context sheet into a nested context tree.
//!
//! The sheet has a fixed layout: column A names an optional collection,
//! column D holds the entry key and column G the entry value.
//!
//! ```text
//! Grid (A..G)                                 Context tree
//! ┌────────────┬───┬───┬──────┬───┬───┬─────┐  {
//! │ Collection1│   │   │ Key1 │   │   │ "1" │    "Collection1": {
//! │ Collection1│   │   │ Key2 │   │   │ V2  │  →   "Key1": 1, "Key2": "V2"
//! │            │   │   │ Key3 │   │   │ V3  │    },
//! └────────────┴───┴───┴──────┴───┴───┴─────┘    "Key3": "V3"
//!                                              }
//! ```
//!
//! Rows are first staged into per-collection lists and a flat list, then
//! materialized, then every leaf is coerced with
//! [`coerce_leaf`](super::coerce::coerce_leaf).

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::coerce::coerce_leaf;
use crate::api::logs::{log_error, log_warning};
use crate::error::ContextError;
use crate::models::{cell_at, cell_key, is_empty_cell, ContextTree};

/// Column A: collection name.
pub const COLLECTION_COLUMN: usize = 0;
/// Column D: entry key.
pub const KEY_COLUMN: usize = 3;
/// Column G: entry value.
pub const VALUE_COLUMN: usize = 6;

/// Build a context tree, returning `{}` on any failure.
///
/// Failures are logged; callers only ever see a tree.
pub fn transform(grid: Option<&[Vec<Value>]>) -> ContextTree {
    match try_transform(grid) {
        Ok(tree) => tree,
        Err(e) => {
            log_error(format!("Context transform failed: {}", e));
            Map::new()
        }
    }
}

/// Build a context tree from a full sheet grid (header row included).
pub fn try_transform(grid: Option<&[Vec<Value>]>) -> Result<ContextTree, ContextError> {
    let grid = grid.ok_or(ContextError::MissingGrid)?;

    let mut staged = StagedEntries::default();

    for (idx, row) in grid.iter().enumerate().skip(1) {
        let sheet_row = idx + 1;
        let collection = cell_at(row, COLLECTION_COLUMN);
        let key = cell_at(row, KEY_COLUMN);
        let value = cell_at(row, VALUE_COLUMN);

        if is_empty_cell(key) || is_empty_cell(value) {
            continue;
        }

        let key = cell_key(key).ok_or(ContextError::InvalidKey { row: sheet_row, column: 'D' })?;

        if is_empty_cell(collection) {
            staged.flat.push((key, value.clone()));
        } else {
            let name = cell_key(collection)
                .ok_or(ContextError::InvalidKey { row: sheet_row, column: 'A' })?;
            staged.push_collection(name, key, value.clone());
        }
    }

    Ok(staged.build())
}

/// Entries grouped by collection, in first-seen order.
#[derive(Default)]
struct StagedEntries {
    collections: Vec<(String, Vec<(String, Value)>)>,
    index: HashMap<String, usize>,
    flat: Vec<(String, Value)>,
}

impl StagedEntries {
    fn push_collection(&mut self, name: String, key: String, value: Value) {
        let slot = match self.index.get(&name) {
            Some(&slot) => slot,
            None => {
                self.collections.push((name.clone(), Vec::new()));
                self.index.insert(name, self.collections.len() - 1);
                self.collections.len() - 1
            }
        };
        self.collections[slot].1.push((key, value));
    }

    fn build(self) -> ContextTree {
        let mut tree = Map::new();

        for (name, entries) in self.collections {
            let mut collection = Map::new();
            for (key, value) in entries {
                collection.insert(key, coerce_leaf(value));
            }
            tree.insert(name, Value::Object(collection));
        }

        // Bare entries go last and win over a same-named collection.
        for (key, value) in self.flat {
            if tree.get(&key).is_some_and(Value::is_object) && self.index.contains_key(&key) {
                log_warning(format!("Top-level key '{}' replaces the collection of the same name", key));
            }
            tree.insert(key, coerce_leaf(value));
        }

        tree
    }
}
