//! Executors that run persistence work off the owning thread.

use std::thread;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs somewhere other than the caller's stack frame.
pub trait Executor {
    fn execute(&self, job: Job);
}

/// Spawns a named OS thread per job.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    name: String,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("inkstone-worker")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        // On failure the job is dropped, which disconnects its result channel.
        if let Err(e) = thread::Builder::new().name(self.name.clone()).spawn(job) {
            log::error!("Failed to spawn {} thread: {}", self.name, e);
        }
    }
}

/// Runs jobs immediately on the calling thread.
///
/// Results are still delivered through [`Canvas::poll`](crate::Canvas::poll),
/// which makes it suitable for tests and single-threaded targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}
