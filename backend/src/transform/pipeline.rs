//! Edit handling pipeline.
//!
//! Routes a spreadsheet edit to the right flow:
//!
//! 1. **Context sheet** - rebuild the context tree from the full grid and
//!    cache it under `contextData_<id>_<rows>`
//! 2. **Epics sheet** - if the edit is the trigger sentinel, map the edited
//!    row, fetch (or lazily build) the context tree, assemble the payload and
//!    POST it to the `epics` webhook
//! 3. Anything else is ignored
//!
//! # Example
//!
//! ```rust,ignore
//! use sheethook::{Config, EditHandler};
//!
//! let handler = EditHandler::new(Config::from_env()?);
//! let outcome = handler.handle(&event).await?;
//! ```

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

use super::context::try_transform;
use super::payload::try_assemble;
use super::row::try_map_row;
use super::trigger::is_target_trigger;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::cache::{context_cache_key, ContextCache};
use crate::config::{Config, EPICS_OPERATION};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ContextTree, EditEvent, Grid, Payload};
use crate::webhook::WebhookClient;

/// What happened to an edit
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum EditOutcome {
    /// Context tree rebuilt and cached
    #[serde(rename_all = "camelCase")]
    ContextRefreshed { cache_key: String, entries: usize },

    /// Payload delivered to the webhook
    #[serde(rename_all = "camelCase")]
    Delivered { status: u16, payload: Payload },

    /// Edit did not concern the pipeline
    Ignored { reason: String },
}

/// Where the context tree for an Epics edit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Cache,
    Built,
    Empty,
}

/// Handles edits against a shared context cache
pub struct EditHandler {
    config: Config,
    cache: Mutex<ContextCache>,
    webhook: WebhookClient,
}

impl EditHandler {
    pub fn new(config: Config) -> Self {
        let cache = ContextCache::with_ttl_secs(config.cache_ttl_secs);
        let webhook = WebhookClient::from_config(&config);
        Self { config, cache: Mutex::new(cache), webhook }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one edit event
    pub async fn handle(&self, event: &EditEvent) -> PipelineResult<EditOutcome> {
        self.config.log(
            format!(
                "Edit on '{}' row {} column {} by {}",
                event.sheet_name, event.row, event.column, event.user
            ),
            false,
        );

        if event.sheet_name == self.config.context_sheet {
            self.refresh_context(event)
        } else if event.sheet_name == self.config.epics_sheet {
            self.handle_epics_edit(event).await
        } else {
            Ok(ignored(format!("sheet '{}' is not watched", event.sheet_name)))
        }
    }

    /// Rebuild and cache the context tree from a Context sheet edit
    fn refresh_context(&self, event: &EditEvent) -> PipelineResult<EditOutcome> {
        let grid = event
            .grid
            .as_deref()
            .ok_or_else(|| PipelineError::MissingGrid(event.sheet_name.clone()))?;

        let (cache_key, tree) = self.build_and_cache(&event.spreadsheet_id, grid)?;
        log_success(format!("Context refreshed: {} top-level entries -> {}", tree.len(), cache_key));

        Ok(EditOutcome::ContextRefreshed { cache_key, entries: tree.len() })
    }

    async fn handle_epics_edit(&self, event: &EditEvent) -> PipelineResult<EditOutcome> {
        if !is_target_trigger(event.column, &event.value) {
            return Ok(ignored(format!(
                "column {} value {} is not the trigger",
                event.column, event.value
            )));
        }
        log_info(format!("Trigger fired on '{}' row {}", event.sheet_name, event.row));

        let payload = self.build_epics_payload(event)?;

        let url = self
            .config
            .webhook_url(EPICS_OPERATION)
            .ok_or_else(|| PipelineError::MissingWebhook(EPICS_OPERATION.to_string()))?;

        let status = self.webhook.post(url, &payload).await?;
        log_success(format!("Row {} delivered", event.row));

        Ok(EditOutcome::Delivered { status, payload })
    }

    /// Map the edited row and combine it with context and metadata
    pub fn build_epics_payload(&self, event: &EditEvent) -> PipelineResult<Payload> {
        let (headers, values) = match (&event.headers, &event.row_values) {
            (Some(h), Some(v)) => (h, v),
            _ => return Err(PipelineError::MissingRow(event.sheet_name.clone())),
        };

        let row = try_map_row(headers, values)?;
        let (context, source) = self.resolve_context(event)?;
        self.config.log(format!("Context source: {:?}", source), false);

        let meta = event.meta(Utc::now());
        let payload = try_assemble(&Value::Object(row), &Value::Object(context), Some(&meta))?;
        Ok(payload)
    }

    /// Cached tree if available, else built from the shipped Context grid
    pub fn resolve_context(&self, event: &EditEvent) -> PipelineResult<(ContextTree, ContextSource)> {
        let last_row = event
            .context_grid
            .as_ref()
            .map(Vec::len)
            .or(event.context_last_row);

        if let Some(last_row) = last_row {
            let key = context_cache_key(&event.spreadsheet_id, last_row);
            if let Some(tree) = self.lock_cache().get(&key) {
                return Ok((tree, ContextSource::Cache));
            }
        }

        match event.context_grid.as_deref() {
            Some(grid) => {
                log_warning("Context cache miss, rebuilding from snapshot");
                let (_, tree) = self.build_and_cache(&event.spreadsheet_id, grid)?;
                Ok((tree, ContextSource::Built))
            }
            None => {
                log_warning("Context cache miss and no snapshot; sending empty context");
                Ok((ContextTree::new(), ContextSource::Empty))
            }
        }
    }

    fn build_and_cache(&self, spreadsheet_id: &str, grid: &[Vec<Value>]) -> PipelineResult<(String, ContextTree)> {
        let tree = try_transform(Some(grid))?;
        let key = context_cache_key(spreadsheet_id, grid.len());
        self.lock_cache().put(&key, &tree)?;
        Ok((key, tree))
    }

    /// Cached tree for a spreadsheet at a given size
    pub fn cached_context(&self, spreadsheet_id: &str, last_row: usize) -> Option<ContextTree> {
        self.lock_cache().get(&context_cache_key(spreadsheet_id, last_row))
    }

    fn lock_cache(&self) -> MutexGuard<'_, ContextCache> {
        // A panic mid get/put leaves nothing half-written worth refusing.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ignored(reason: String) -> EditOutcome {
    log_info(format!("Ignored: {}", reason));
    EditOutcome::Ignored { reason }
}

/// Build a context tree straight from a grid (no cache)
pub fn context_from_grid(grid: &Grid) -> ContextTree {
    super::context::transform(Some(grid.as_slice()))
}
