use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::remote::{Partition, RemoteStore};
use crate::task::Task;

enum SyncCommand {
    Save { partition: Partition, tasks: Vec<Task> },
    Flush(oneshot::Sender<()>),
}

/// Single worker that pushes full-replace saves to the remote store in the
/// order they were enqueued. Failures are logged and dropped.
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<SyncCommand>,
    worker: JoinHandle<()>,
}

impl SaveQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(remote, rx));
        Self { tx, worker }
    }

    pub fn enqueue(&self, partition: Partition, tasks: Vec<Task>) {
        let count = tasks.len();
        if self.tx.send(SyncCommand::Save { partition, tasks }).is_err() {
            warn!(count, "save worker stopped; dropping save");
        }
    }

    /// Resolves once every save enqueued before the call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SyncCommand::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }
}

async fn run_worker(remote: Arc<dyn RemoteStore>, mut rx: mpsc::UnboundedReceiver<SyncCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            SyncCommand::Save { partition, tasks } => {
                match remote.save(&partition, &tasks).await {
                    Ok(()) => debug!(
                        user = %partition.user,
                        mode = %partition.mode,
                        count = tasks.len(),
                        "saved partition"
                    ),
                    Err(err) => warn!(
                        user = %partition.user,
                        mode = %partition.mode,
                        error = %err,
                        "failed to save tasks"
                    ),
                }
            }
            SyncCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("save worker finished");
}
