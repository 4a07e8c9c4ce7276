use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::error::WatchError;

/// The single value that ends a run.
#[derive(Debug)]
pub enum TerminationSignal {
    InterruptReceived,
    FatalError(WatchError),
    /// The watcher stopped because it was cancelled.
    Clean,
}

impl TerminationSignal {
    pub fn exit_code(&self) -> u8 {
        match self {
            TerminationSignal::FatalError(_) => 1,
            TerminationSignal::InterruptReceived | TerminationSignal::Clean => 0,
        }
    }

    pub fn error(&self) -> Option<&WatchError> {
        match self {
            TerminationSignal::FatalError(e) => Some(e),
            _ => None,
        }
    }
}

/// Single-slot completion shared by every task that may end the run.
///
/// The first call to [`Completion::complete`] wins; later calls return
/// `false` and never block.
#[derive(Clone)]
pub struct Completion {
    slot: Arc<Mutex<Option<oneshot::Sender<TerminationSignal>>>>,
}

pub fn completion() -> (Completion, oneshot::Receiver<TerminationSignal>) {
    let (tx, rx) = oneshot::channel();
    (
        Completion {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

impl Completion {
    pub async fn complete(&self, signal: TerminationSignal) -> bool {
        let sender = self.slot.lock().await.take();
        match sender {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }
}
