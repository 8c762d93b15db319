use std::path::PathBuf;

use clap::Args;

use crate::cli::op::{Op, OpContext};

/// Mount the photostream and serve it until interrupted
#[derive(Args, Debug, Clone)]
pub struct Mount {
    /// Empty directory to mount at
    pub mountpoint: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("{0:#}")]
    Failed(anyhow::Error),
}

#[async_trait::async_trait]
impl Op for Mount {
    type Error = MountError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        flickrfs_daemon::process::run(ctx.config.clone(), self.mountpoint.clone())
            .await
            .map_err(MountError::Failed)?;
        Ok(format!("Unmounted {}", self.mountpoint.display()))
    }
}
