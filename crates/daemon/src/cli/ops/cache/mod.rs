use clap::{Args, Subcommand};

pub mod clear;
pub mod list;
pub mod stats;

use common::cache::{CacheError, ContentCache};

use crate::cli::op::{Op, OpContext};

crate::command_enum! {
    (Stats, stats::Stats),
    (List, list::List),
    (Clear, clear::Clear),
}

/// Subcommands of `flickrfs cache`
pub type CacheCommand = Command;

/// Inspect or clear the local content cache
#[derive(Args, Debug, Clone)]
pub struct Cache {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[async_trait::async_trait]
impl Op for Cache {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// Open the cache the daemon would use
async fn open_cache(ctx: &OpContext) -> Result<ContentCache, CacheError> {
    ContentCache::open(ctx.config.cache_path(), ctx.config.cache.capacity).await
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
