//! Request channel between a [`SyncHandle`](super::SyncHandle) and its worker

use super::SyncError;

/// Requests the sync worker accepts between passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    /// Run another discovery pass as soon as the current one finishes
    Resync,
}

/// Sending side, held by the handle
#[derive(Debug, Clone)]
pub struct SyncDispatcher {
    tx: flume::Sender<SyncRequest>,
}

impl SyncDispatcher {
    pub fn new() -> (Self, SyncReceiver) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, SyncReceiver { rx })
    }

    /// Queue a request for the worker
    ///
    /// Fails only if the worker has exited.
    pub fn dispatch(&self, request: SyncRequest) -> Result<(), SyncError> {
        self.tx.send(request).map_err(|_| SyncError::Stopped)
    }
}

/// Receiving side, owned by the worker
#[derive(Debug)]
pub struct SyncReceiver {
    rx: flume::Receiver<SyncRequest>,
}

impl SyncReceiver {
    /// Next request, or `None` once every dispatcher is dropped
    pub async fn recv(&self) -> Option<SyncRequest> {
        self.rx.recv_async().await.ok()
    }
}
