use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use common::cache::{CacheError, CacheStats};

use super::{format_bytes, open_cache};
use crate::cli::op::{Op, OpContext};

/// Show cache occupancy
#[derive(Args, Debug, Clone)]
pub struct Stats {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct StatsOutput {
    path: PathBuf,
    stats: CacheStats,
    json: Option<String>,
}

impl fmt::Display for StatsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(json) = &self.json {
            return write!(f, "{}", json);
        }

        writeln!(f, "{}:", "Content cache".bold())?;
        writeln!(f, "  {} {}", "path:".dimmed(), self.path.display())?;
        writeln!(
            f,
            "  {} {} / {}",
            "photos:".dimmed(),
            self.stats.entries,
            self.stats.capacity
        )?;
        write!(
            f,
            "  {} {}",
            "size:".dimmed(),
            format_bytes(self.stats.total_bytes)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl Op for Stats {
    type Error = StatsError;
    type Output = StatsOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let cache = open_cache(ctx).await?;
        let stats = cache.stats().await?;
        cache.close().await;

        let json = if self.json {
            Some(serde_json::to_string_pretty(&stats)?)
        } else {
            None
        };

        Ok(StatsOutput {
            path: ctx.config.cache_path(),
            stats,
            json,
        })
    }
}
