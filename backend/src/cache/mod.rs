//! Context Cache - keep built context trees around between edits
//!
//! Trees are stored as JSON strings with a per-entry expiry. Keys embed the
//! Context sheet's row count, so adding or removing rows makes older entries
//! unreachable. Every write purges expired entries, so the map only holds
//! trees that are still live plus whatever expired since the last write.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::api::logs::log_warning;
use crate::config::DEFAULT_CACHE_TTL_SECS;
use crate::error::CacheError;
use crate::models::ContextTree;

/// Cache key for a spreadsheet's context tree at a given sheet size.
pub fn context_cache_key(spreadsheet_id: &str, last_row: usize) -> String {
    format!("contextData_{}_{}", spreadsheet_id, last_row)
}

/// A cached, serialized tree
#[derive(Debug, Clone)]
struct CachedEntry {
    json: String,
    expires_at: DateTime<Utc>,
}

/// In-memory TTL cache for context trees
#[derive(Debug)]
pub struct ContextCache {
    /// Lifetime of entries written with [`ContextCache::put`]
    ttl: Duration,
    /// key -> entry
    entries: HashMap<String, CachedEntry>,
}

impl ContextCache {
    /// Create a cache with the default 6 hour TTL
    pub fn new() -> Self {
        Self::with_ttl_secs(DEFAULT_CACHE_TTL_SECS)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self {
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            entries: HashMap::new(),
        }
    }

    /// TTL applied by [`ContextCache::put`]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a tree if present and not expired
    pub fn get(&mut self, key: &str) -> Option<ContextTree> {
        self.get_at(key, Utc::now())
    }

    /// Fetch a tree as of `now`
    ///
    /// Expired entries are dropped. An entry that no longer deserializes is
    /// logged, treated as a miss and dropped too.
    pub fn get_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<ContextTree> {
        let entry = self.entries.get(key)?;

        if entry.expires_at <= now {
            self.entries.remove(key);
            return None;
        }

        match decode_tree(&entry.json) {
            Ok(tree) => Some(tree),
            Err(e) => {
                log_warning(format!("Dropping unreadable cache entry '{}': {}", key, e));
                self.entries.remove(key);
                None
            }
        }
    }

    /// Store a tree with the cache's TTL
    pub fn put(&mut self, key: &str, tree: &ContextTree) -> Result<(), CacheError> {
        self.put_with_ttl(key, tree, self.ttl)
    }

    /// Store a tree with an explicit TTL
    pub fn put_with_ttl(
        &mut self,
        key: &str,
        tree: &ContextTree,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put_at(key, tree, ttl, Utc::now())
    }

    fn put_at(
        &mut self,
        key: &str,
        tree: &ContextTree,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(tree)?;
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.purge_expired_at(now);
        self.entries.insert(key.to_string(), CachedEntry { json, expires_at });
        Ok(())
    }

    /// Drop a single entry
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    fn purge_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before - self.entries.len()
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a stored tree back.
///
/// Leaves were parsed one at a time, so a tree may nest two levels deeper
/// than serde_json's default limit allows.
fn decode_tree(json: &str) -> Result<ContextTree, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let tree = ContextTree::deserialize(&mut de)?;
    de.end()?;
    Ok(tree)
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn tree() -> ContextTree {
        match json!({"Team": {"lead": "Ana", "size": 5}, "sprint": 12}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(context_cache_key("1AbC", 42), "contextData_1AbC_42");
    }

    #[test]
    fn test_put_then_get() {
        let mut cache = ContextCache::new();
        let key = context_cache_key("sheet", 10);
        cache.put(&key, &tree()).unwrap();

        assert_eq!(cache.get(&key), Some(tree()));
        assert!(cache.get(&context_cache_key("sheet", 11)).is_none());
    }

    #[test]
    fn test_default_ttl_is_six_hours() {
        assert_eq!(ContextCache::new().ttl(), Duration::hours(6));
    }

    #[test]
    fn test_entry_expires() {
        let mut cache = ContextCache::with_ttl_secs(60);
        let now = Utc::now();
        cache.put_at("k", &tree(), cache.ttl(), now).unwrap();

        assert!(cache.get_at("k", now + Duration::seconds(59)).is_some());
        assert!(cache.get_at("k", now + Duration::seconds(60)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = ContextCache::new();
        let now = Utc::now();
        cache.put_at("old", &tree(), Duration::seconds(1), now).unwrap();
        cache.put_at("fresh", &tree(), Duration::hours(1), now).unwrap();

        assert_eq!(cache.purge_expired_at(now + Duration::seconds(5)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("fresh", now + Duration::seconds(5)).is_some());
    }

    #[test]
    fn test_writes_purge_expired_entries() {
        let mut cache = ContextCache::with_ttl_secs(1);
        let start = Utc::now();
        for last_row in 0..50 {
            let now = start + Duration::seconds(last_row * 2);
            cache.put_at(&context_cache_key("sheet", last_row as usize), &tree(), cache.ttl(), now).unwrap();
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn test_deep_leaf_survives_the_cache() {
        let depth = 127;
        let leaf = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let grid = vec![
            vec![json!("Collection"), json!(""), json!(""), json!("Key"), json!(""), json!(""), json!("Value")],
            vec![json!("Deep"), json!(""), json!(""), json!("nest"), json!(""), json!(""), json!(leaf)],
        ];
        let built = crate::transform::try_transform(Some(&grid[..])).unwrap();
        assert!(built["Deep"]["nest"].is_array());

        let mut cache = ContextCache::new();
        cache.put("deep", &built).unwrap();
        assert_eq!(cache.get("deep"), Some(built));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let mut cache = ContextCache::new();
        cache.entries.insert(
            "bad".to_string(),
            CachedEntry { json: "[1,2".to_string(), expires_at: DateTime::<Utc>::MAX_UTC },
        );
        assert!(cache.get("bad").is_none());
        assert!(!cache.remove("bad"));
    }
}
