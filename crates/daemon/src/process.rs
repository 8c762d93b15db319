//! Mount lifecycle: startup, wait for a signal, orderly shutdown

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;

use common::namespace::Owner;

use crate::config::AppConfig;
use crate::flickr::{Credential, FlickrClient};
use crate::fuse::{self, PhotoFs};
use crate::http::HttpContentClient;
use crate::state::AppState;

/// Owner stamped on every node: the user running the daemon
pub fn current_owner() -> Owner {
    // SAFETY: getuid and getgid cannot fail and touch no memory
    unsafe {
        Owner {
            uid: libc::getuid(),
            gid: libc::getgid(),
        }
    }
}

/// Mount the photostream at `mountpoint` and serve it until interrupted
pub async fn run(config: AppConfig, mountpoint: PathBuf) -> anyhow::Result<()> {
    let credential = Credential::load(&config.auth_path())?;
    let source = Arc::new(FlickrClient::new(&config.flickr, credential)?);
    let client = HttpContentClient::new(Duration::from_secs(config.flickr.timeout_secs))
        .context("failed to build HTTP client")?;

    let state = AppState::build(config, current_owner(), Arc::new(client)).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let sync = state
        .stream
        .bind(source, state.config.sync.to_sync_config(), shutdown_rx)?;

    let fs = PhotoFs::new(
        state.namespace.clone(),
        vec![state.stream.clone()],
        tokio::runtime::Handle::current(),
        Duration::from_secs(state.config.mount.attr_ttl_secs),
    );
    let session = match fuse::spawn_mount(fs, &mountpoint, &state.config.mount) {
        Ok(session) => session,
        Err(e) => {
            let _ = shutdown_tx.send(());
            sync.join().await;
            state.cache.close().await;
            return Err(e.into());
        }
    };
    tracing::info!(mountpoint = %mountpoint.display(), "photostream mounted, press Ctrl-C to unmount");

    wait_for_signal().await?;
    tracing::info!("shutting down");

    let _ = shutdown_tx.send(());
    sync.join().await;

    // dropping the session unmounts and joins the session thread
    tokio::task::spawn_blocking(move || drop(session))
        .await
        .context("failed to unmount")?;

    let stats = state.cache.stats().await?;
    tracing::info!(
        photos = state.stream.len(),
        cached = stats.entries,
        cached_bytes = stats.total_bytes,
        "unmounted"
    );
    state.cache.close().await;
    Ok(())
}

async fn wait_for_signal() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
        _ = terminate.recv() => tracing::debug!("received SIGTERM"),
    }
    Ok(())
}
