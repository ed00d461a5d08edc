//! Background persistence tasks whose results are collected by polling.

use super::{BundleError, BundleResult};
use crate::executor::Executor;
use std::sync::mpsc::{Receiver, TryRecvError, channel};

enum TaskEvent<T> {
    Progress(f64),
    Finished(BundleResult<T>),
}

/// A task running on an executor.
///
/// Progress and the final result are delivered on the thread that calls
/// [`poll`](PendingTask::poll).
pub(crate) struct PendingTask<T> {
    rx: Receiver<TaskEvent<T>>,
    progress: Option<Box<dyn FnMut(f64)>>,
}

impl<T> PendingTask<T> {
    /// Forward queued progress and return the result once the task is done.
    pub(crate) fn poll(&mut self) -> Option<BundleResult<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(TaskEvent::Progress(value)) => {
                    if let Some(sink) = self.progress.as_mut() {
                        sink(value);
                    }
                }
                Ok(TaskEvent::Finished(result)) => return Some(result),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    log::error!("Persistence worker exited without a result");
                    return Some(Err(BundleError::WorkerLost));
                }
            }
        }
    }
}

/// Run `work` on `executor`, relaying its progress through the returned task.
pub(crate) fn spawn_task<T, F>(
    executor: &dyn Executor,
    progress: Option<Box<dyn FnMut(f64)>>,
    work: F,
) -> PendingTask<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn FnMut(f64)) -> BundleResult<T> + Send + 'static,
{
    let (tx, rx) = channel();
    executor.execute(Box::new(move || {
        let progress_tx = tx.clone();
        let mut report = move |value: f64| {
            let _ = progress_tx.send(TaskEvent::Progress(value));
        };
        let result = work(&mut report);
        // Receiver may be gone if the canvas was dropped.
        let _ = tx.send(TaskEvent::Finished(result));
    }));
    PendingTask { rx, progress }
}
