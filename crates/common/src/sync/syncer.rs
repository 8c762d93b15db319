use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use super::jobs::{SyncDispatcher, SyncReceiver, SyncRequest};
use super::{PassOutcome, SyncConfig, SyncError, SyncStatus};
use crate::source::PhotoSource;
use crate::stream::{PhotoStream, StreamError};

/// Discovers the photos of one remote collection into a [`PhotoStream`]
pub struct Syncer {
    stream: Arc<PhotoStream>,
    source: Arc<dyn PhotoSource>,
    config: SyncConfig,
    status: watch::Sender<SyncStatus>,
}

impl Syncer {
    pub fn new(stream: Arc<PhotoStream>, source: Arc<dyn PhotoSource>, config: SyncConfig) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            stream,
            source,
            config,
            status,
        }
    }

    /// Start the worker task
    ///
    /// The worker runs a pass right away, then one more per interval tick or
    /// resync request, until `shutdown` fires. Without an interval it exits
    /// once the handle stops accepting requests.
    pub fn spawn(self, shutdown: watch::Receiver<()>) -> SyncHandle {
        let (dispatcher, receiver) = SyncDispatcher::new();
        let status = self.status.subscribe();
        let task = tokio::spawn(self.run_worker(shutdown, receiver));

        SyncHandle {
            dispatcher,
            status,
            task,
        }
    }

    /// Run one full pass: discovery with retries, then size resolution
    pub async fn run_pass(&self) -> PassOutcome {
        let started = Instant::now();
        let discovery = self
            .config
            .retry
            .run("photo discovery", |attempt| self.discover(attempt))
            .await;

        match discovery {
            Ok(discovered) => {
                let sized = self.stream.resolve_sizes().await;
                tracing::info!(
                    stream = %self.stream.path(),
                    discovered,
                    sized,
                    total = self.stream.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "sync pass completed"
                );
                PassOutcome::Completed { discovered, sized }
            }
            Err(e) => {
                let attempts = match &e {
                    SyncError::Abandoned { attempts, .. } => *attempts,
                    _ => 1,
                };
                tracing::error!(
                    stream = %self.stream.path(),
                    total = self.stream.len(),
                    "sync pass abandoned: {}",
                    e
                );
                PassOutcome::Abandoned {
                    attempts,
                    error: e.to_string(),
                }
            }
        }
    }

    /// One discovery attempt over every page of the listing
    ///
    /// The page count reported with page 1 bounds the walk. Rows that are not
    /// valid photos are logged and skipped.
    async fn discover(&self, attempt: u32) -> Result<usize, SyncError> {
        tracing::debug!(stream = %self.stream.path(), attempt, "starting photo discovery");

        let per_page = self.config.page_size.max(1);
        let mut page = 1;
        let mut pages = 1;
        let mut discovered = 0;

        while page <= pages {
            let listing = self
                .source
                .list_page(per_page, page)
                .await
                .map_err(|error| SyncError::Transient { page, error })?;
            if page == 1 {
                pages = listing.pages;
            }
            tracing::debug!(page, pages, rows = listing.photos.len(), "listed page");

            for raw in listing.photos {
                let id = raw.id.clone();
                match self.stream.on_discovered(raw) {
                    Ok(Some(_)) => discovered += 1,
                    Ok(None) => {}
                    Err(StreamError::InvalidItem(e)) => {
                        tracing::warn!(id = %id, "skipping photo: {}", e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            page += 1;
        }

        Ok(discovered)
    }

    async fn run_worker(self, mut shutdown: watch::Receiver<()>, requests: SyncReceiver) {
        tracing::info!(stream = %self.stream.path(), "starting sync worker");

        let mut interval = self.config.interval.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut requests_open = true;

        loop {
            self.status.send_modify(|status| status.running = true);
            let outcome = tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested, abandoning sync pass");
                    break;
                }
                outcome = self.run_pass() => outcome,
            };
            self.status.send_modify(|status| {
                status.running = false;
                status.passes += 1;
                status.last = Some(outcome);
            });

            // wait for the next trigger
            let resume = loop {
                tokio::select! {
                    _ = shutdown.changed() => break false,
                    _ = next_tick(interval.as_mut()) => {
                        tracing::debug!("running periodic resync");
                        break true;
                    }
                    request = requests.recv(), if requests_open => match request {
                        Some(SyncRequest::Resync) => {
                            tracing::debug!("resync requested");
                            break true;
                        }
                        None => {
                            requests_open = false;
                            if interval.is_none() {
                                break false;
                            }
                        }
                    }
                }
            };
            if !resume {
                break;
            }
        }

        self.status.send_modify(|status| status.running = false);
        tracing::info!(stream = %self.stream.path(), "sync worker shutting down");
    }
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle to a running sync worker
#[derive(Debug)]
pub struct SyncHandle {
    dispatcher: SyncDispatcher,
    status: watch::Receiver<SyncStatus>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Snapshot of the worker's progress
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Wait until at least `passes` passes have finished
    ///
    /// Returns the outcome of the latest pass, or `None` if the worker exited
    /// first.
    pub async fn wait_for_passes(&self, passes: u64) -> Option<PassOutcome> {
        let mut status = self.status.clone();
        let last = status
            .wait_for(|s| s.passes >= passes)
            .await
            .ok()
            .and_then(|s| s.last.clone());
        last
    }

    /// Ask the worker for another pass once the current one finishes
    pub fn request_resync(&self) -> Result<(), SyncError> {
        self.dispatcher.dispatch(SyncRequest::Resync)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the worker to exit
    ///
    /// Closes the request channel first, so a worker without an interval
    /// exits after its current pass. A periodic worker runs until shutdown.
    pub async fn join(self) {
        drop(self.dispatcher);
        if let Err(e) = self.task.await {
            tracing::error!("sync worker task failed: {}", e);
        }
    }
}
