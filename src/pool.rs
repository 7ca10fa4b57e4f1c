//! A fixed set of inference workers shared by all requests.
//!
//! Each worker (one loaded [`crate::pipeline::Pipeline`] in the server) is used by a single job at
//! a time. Jobs run on Tokio's blocking thread pool. Once a job is scheduled it runs to completion
//! and returns its worker even if the caller stops waiting for it.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// All workers were lost to panicking jobs.
    Exhausted,
    /// The job panicked; its worker has been dropped.
    JobPanicked(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Exhausted => write!(f, "no inference workers left"),
            PoolError::JobPanicked(msg) => write!(f, "inference worker panicked: {}", msg),
        }
    }
}

impl std::error::Error for PoolError {}

pub struct WorkerPool<T> {
    idle: Arc<Mutex<Vec<T>>>,
    permits: Arc<Semaphore>,
    live: Arc<AtomicUsize>,
    size: usize,
}

impl<T> fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("live", &self.live.load(Ordering::Relaxed))
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(workers: Vec<T>) -> Self {
        let size = workers.len();
        let permits = Arc::new(Semaphore::new(size));
        if size == 0 {
            permits.close();
        }
        Self {
            idle: Arc::new(Mutex::new(workers)),
            permits,
            live: Arc::new(AtomicUsize::new(size)),
            size,
        }
    }

    /// Number of workers the pool started with.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for a free worker and runs `job` on it.
    ///
    /// Fails with [`PoolError::Exhausted`] once every worker has been retired.
    pub async fn run<F, R>(&self, job: F) -> Result<R, PoolError>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Exhausted)?;
        let idle = Arc::clone(&self.idle);
        let permits = Arc::clone(&self.permits);
        let live = Arc::clone(&self.live);

        let handle = tokio::task::spawn_blocking(move || {
            let Some(mut worker) = idle.lock().unwrap_or_else(PoisonError::into_inner).pop() else {
                return Err(PoolError::Exhausted);
            };
            match catch_unwind(AssertUnwindSafe(|| job(&mut worker))) {
                Ok(out) => {
                    idle.lock().unwrap_or_else(PoisonError::into_inner).push(worker);
                    drop(permit);
                    Ok(out)
                }
                Err(payload) => {
                    // The worker may be half-updated, retire it together with its permit.
                    drop(worker);
                    permit.forget();
                    if live.fetch_sub(1, Ordering::SeqCst) == 1 {
                        log::error!("last inference worker retired, pool is closed");
                        // wakes every queued caller with `Exhausted`
                        permits.close();
                    }
                    Err(PoolError::JobPanicked(panic_message(payload.as_ref())))
                }
            }
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(PoolError::JobPanicked(e.to_string())),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
