// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small fixed-size worker pool.

use core::fmt;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors from [`WorkerPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
    /// A pool was requested with zero threads.
    #[error("a worker pool needs at least one thread")]
    NoThreads,
    /// The pool no longer accepts jobs.
    #[error("worker pool is shut down")]
    ShutDown,
}

/// A handle to a fixed set of named worker threads pulling jobs from a shared queue.
///
/// Handles are cheap to clone and all clones feed the same queue. When the last
/// handle is dropped the queue is closed and jobs that have not started are
/// discarded. Running jobs finish on their detached workers, which then exit, so
/// dropping a pool never waits for a job. A job that panics is logged and does
/// not take its worker down.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

struct Inner {
    sender: Mutex<Option<Sender<Job>>>,
    /// Used to discard jobs that never started once the last handle is gone.
    receiver: Receiver<Job>,
    threads: usize,
}

impl WorkerPool {
    /// Start a pool with `threads` workers named `tessera-worker-N`.
    pub fn new(threads: usize) -> Result<Self, PoolError> {
        if threads == 0 {
            return Err(PoolError::NoThreads);
        }
        let (sender, receiver) = unbounded::<Job>();
        let inner = Inner {
            sender: Mutex::new(Some(sender)),
            receiver,
            threads,
        };
        for id in 0..threads {
            let receiver = inner.receiver.clone();
            // Workers are detached; they exit once the queue closes and drains.
            thread::Builder::new()
                .name(format!("tessera-worker-{id}"))
                .spawn(move || run(&receiver))
                .map_err(PoolError::Spawn)?;
        }
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Start a pool with [`default_size`](Self::default_size) workers.
    pub fn with_default_size() -> Result<Self, PoolError> {
        Self::new(Self::default_size())
    }

    /// Two fewer than the available parallelism, but at least one.
    pub fn default_size() -> usize {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .saturating_sub(2)
            .max(1)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.inner.threads
    }

    /// Queue a job. Jobs run in submission order per worker, but several run at once.
    pub fn spawn<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.inner.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(PoolError::ShutDown);
        };
        sender.send(Box::new(job)).map_err(|_| PoolError::ShutDown)
    }

    /// Stop accepting jobs on every handle. Already queued jobs still run.
    pub fn shutdown(&self) {
        self.inner.sender.lock().take();
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.sender.lock().is_none()
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.sender.get_mut().take();
        let discarded = self.receiver.try_iter().count();
        if discarded > 0 {
            debug!(discarded, "discarded queued jobs with the last pool handle");
        }
    }
}

fn run(receiver: &Receiver<Job>) {
    let name = thread::current().name().unwrap_or("tessera-worker").to_owned();
    trace!(worker = %name, "worker started");
    while let Ok(job) = receiver.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            warn!(worker = %name, panic = %panic_message(payload.as_ref()), "job panicked");
        }
    }
    trace!(worker = %name, "worker stopped");
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn runs_jobs_on_named_threads() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2, "requested thread count");
        let (tx, rx) = unbounded();
        pool.spawn(move || {
            let name = thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        })
        .unwrap();
        let name = rx.recv_timeout(TIMEOUT).unwrap().unwrap();
        assert!(name.starts_with("tessera-worker-"), "unexpected name {name}");
    }

    #[test]
    fn rejects_zero_threads() {
        assert!(
            matches!(WorkerPool::new(0), Err(PoolError::NoThreads)),
            "zero threads is an error"
        );
        assert!(WorkerPool::default_size() >= 1, "default size is never zero");
    }

    #[test]
    fn survives_panicking_jobs() {
        let pool = WorkerPool::new(1).unwrap();
        pool.spawn(|| panic!("boom")).unwrap();
        let (tx, rx) = unbounded();
        pool.spawn(move || tx.send(()).unwrap()).unwrap();
        assert!(
            rx.recv_timeout(TIMEOUT).is_ok(),
            "the only worker must keep running after a panic"
        );
    }

    #[test]
    fn shutdown_rejects_new_jobs() {
        let pool = WorkerPool::new(1).unwrap();
        let clone = pool.clone();
        pool.shutdown();
        assert!(clone.is_shut_down(), "shutdown is shared by clones");
        assert!(
            matches!(clone.spawn(|| {}), Err(PoolError::ShutDown)),
            "spawn after shutdown fails"
        );
    }

    #[test]
    fn drop_discards_queued_jobs_without_waiting() {
        let pool = WorkerPool::new(1).unwrap();
        let (started_tx, started_rx) = unbounded();
        let (release, gate) = unbounded::<()>();
        let (finished_tx, finished_rx) = unbounded();
        pool.spawn(move || {
            started_tx.send(()).unwrap();
            gate.recv_timeout(TIMEOUT).unwrap();
            finished_tx.send(()).unwrap();
        })
        .unwrap();
        started_rx.recv_timeout(TIMEOUT).unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let ran = Arc::clone(&ran);
            pool.spawn(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        let dropping = Instant::now();
        drop(pool);
        assert!(
            dropping.elapsed() < Duration::from_secs(1),
            "drop must not wait for the running job"
        );
        assert_eq!(Arc::strong_count(&ran), 1, "queued jobs were discarded");

        release.send(()).unwrap();
        assert!(
            finished_rx.recv_timeout(TIMEOUT).is_ok(),
            "the running job finishes on its detached worker"
        );
        assert_eq!(ran.load(Ordering::SeqCst), 0, "discarded jobs never ran");
    }

    #[test]
    fn last_handle_dropped_by_a_job() {
        let pool = WorkerPool::new(1).unwrap();
        let (done_tx, done_rx) = unbounded();
        let (go_tx, go_rx) = unbounded::<()>();
        let handle = pool.clone();
        pool.spawn(move || {
            go_rx.recv().unwrap();
            // By now this is the last handle, so dropping it runs on the worker itself.
            drop(handle);
            done_tx.send(()).unwrap();
        })
        .unwrap();
        drop(pool);
        go_tx.send(()).unwrap();
        assert!(
            done_rx.recv_timeout(TIMEOUT).is_ok(),
            "job completed without joining its own thread"
        );
    }

    #[test]
    fn panic_messages() {
        assert_eq!(panic_message(&"static"), "static", "&str payload");
        assert_eq!(panic_message(&String::from("owned")), "owned", "String payload");
        assert_eq!(panic_message(&1_u8), "non-string panic payload", "other payload");
    }
}
