// Single-slot download session for the GUI: one background download at a time

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

use super::errors::DownloadError;
use super::models::{DownloadOptions, DownloadResult};
use super::orchestrator::Downloader;
use super::status::{StatusEmitter, StatusEvent};
use super::tools::ToolAvailability;

/// A running download: its status stream and the task that produces it.
///
/// `events` closes once the task has finished.
pub struct SessionHandle {
    pub events: UnboundedReceiver<StatusEvent>,
    pub task: JoinHandle<Result<DownloadResult, DownloadError>>,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadSession {
    active: Arc<AtomicBool>,
}

/// Clears the active flag when the download task ends, however it ends.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DownloadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start `options` on a background task. Fails with `Busy` while an
    /// earlier download is still running.
    pub fn spawn_download(
        &self,
        downloader: Arc<Downloader>,
        options: DownloadOptions,
        availability: ToolAvailability,
    ) -> Result<SessionHandle, DownloadError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DownloadError::Busy);
        }
        let guard = ActiveGuard(self.active.clone());

        let (emitter, events) = StatusEmitter::channel();
        info!("download session started");

        let task = tokio::spawn(async move {
            let _guard = guard;
            let result = downloader.run(&options, availability, &emitter).await;
            if let Err(e) = &result {
                emitter.error(e.to_string());
            }
            result
        });

        Ok(SessionHandle { events, task })
    }
}
