use clap::Args;

use common::cache::CacheError;

use super::open_cache;
use crate::cli::op::{Op, OpContext};

/// Delete every cached photo
#[derive(Args, Debug, Clone)]
pub struct Clear;

#[derive(Debug, thiserror::Error)]
pub enum ClearError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

#[async_trait::async_trait]
impl Op for Clear {
    type Error = ClearError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let cache = open_cache(ctx).await?;
        let removed = cache.len().await;
        cache.clear().await?;
        cache.close().await;

        Ok(format!("Removed {} cached photos", removed))
    }
}
