//! Bounded worker pools executing the pool's deferred work.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::{
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of named worker threads draining a shared job queue.
///
/// Jobs must not panic the pool: panics are caught at the job boundary and
/// logged. Stopping the pool closes the queue and joins every worker, so all
/// queued jobs still run before `stop` returns.
pub(crate) struct WorkerPool {
    name: &'static str,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `workers` threads named `{name}-{index}`.
    pub(crate) fn new(name: &'static str, workers: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let handles = (0..workers.max(1))
            .map(|index| {
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("{name}-{index}"))
                    .spawn(move || worker_loop(name, index, rx))
                    .unwrap_or_else(|err| panic!("failed to spawn {name}-{index} worker: {err}"))
            })
            .collect();
        Self { name, sender: Mutex::new(Some(tx)), handles: Mutex::new(handles) }
    }

    /// Enqueues a job, returning `false` if the pool was already stopped.
    pub(crate) fn execute(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match &*self.sender.lock() {
            Some(sender) => sender.send(Box::new(job)).is_ok(),
            None => false,
        }
    }

    /// Closes the queue and joins all workers. Idempotent.
    pub(crate) fn stop(&self) {
        // dropping the sender disconnects the channel once queued jobs drain
        let Some(sender) = self.sender.lock().take() else { return };
        drop(sender);
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.join().is_err() {
                warn!(target: "txpool", pool = self.name, "worker terminated abnormally");
            }
        }
        debug!(target: "txpool", pool = self.name, "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("name", &self.name).finish_non_exhaustive()
    }
}

fn worker_loop(name: &'static str, index: usize, rx: Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!(target: "txpool", pool = name, worker = index, "job panicked");
        }
    }
}
