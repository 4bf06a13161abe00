//! Periodic background backups
//!
//! One thread per timer waits on a stop channel with the backup interval as
//! timeout: a timeout means "take a backup", a message or a dropped sender
//! means "exit". Failed backups are logged and the schedule continues.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{CaseError, CaseResult};

use super::manager::BackupManager;

/// Handle to a running auto-backup thread
pub(crate) struct AutoBackupTimer {
    stop_tx: mpsc::Sender<()>,
    done_rx: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl AutoBackupTimer {
    /// Spawn the timer thread; the first backup runs after one interval
    pub(crate) fn start(manager: Arc<BackupManager>, interval: Duration) -> CaseResult<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("casefile-auto-backup".into())
            .spawn(move || {
                run(&manager, interval, &stop_rx);
                let _ = done_tx.send(());
            })
            .map_err(|e| CaseError::Io(format!("Failed to start auto-backup thread: {}", e)))?;

        Ok(Self {
            stop_tx,
            done_rx,
            handle: Some(handle),
            interval,
        })
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask the thread to exit and wait up to `grace` for it
    ///
    /// Returns false if the thread was still busy after `grace`; it is then
    /// detached and exits on its own once its current backup finishes.
    pub(crate) fn stop(mut self, grace: Duration) -> bool {
        let _ = self.stop_tx.send(());

        match self.done_rx.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    grace_secs = grace.as_secs_f64(),
                    "Auto-backup still running after grace period, detaching"
                );
                self.handle.take();
                false
            }
        }
    }
}

impl Drop for AutoBackupTimer {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

fn run(manager: &BackupManager, interval: Duration, stop_rx: &mpsc::Receiver<()>) {
    info!(interval_secs = interval.as_secs_f64(), "Auto-backup started");

    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => match manager.backup() {
                Ok(path) => info!(backup = %path.display(), "Scheduled backup complete"),
                Err(e) => warn!(error = %e, "Scheduled backup failed"),
            },
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Auto-backup stopped");
}
