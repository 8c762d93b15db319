use clap::Args;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use serde::Serialize;

use common::cache::CacheError;

use super::{format_bytes, open_cache};
use crate::cli::op::{Op, OpContext};

/// List cached photos, most recently used first
#[derive(Args, Debug, Clone)]
pub struct List {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ListedEntry {
    id: String,
    size: u64,
    last_used: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl Op for List {
    type Error = ListError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let cache = open_cache(ctx).await?;
        let entries: Vec<ListedEntry> = cache
            .entries()
            .await?
            .into_iter()
            .map(|e| ListedEntry {
                id: e.key,
                size: e.size,
                last_used: e.last_used,
            })
            .collect();
        cache.close().await;

        if self.json {
            return Ok(serde_json::to_string_pretty(&entries)?);
        }

        if entries.is_empty() {
            return Ok("Cache is empty".to_string());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["#", "PHOTO ID", "SIZE"]);
        for (rank, entry) in entries.iter().enumerate() {
            table.add_row(vec![
                Cell::new(rank + 1),
                Cell::new(&entry.id),
                Cell::new(format_bytes(entry.size)),
            ]);
        }

        Ok(table.to_string())
    }
}
