//! The background worker loop.
//!
//! One thread, started with the main loop and stopped when it ends. It runs
//! posted jobs, delayed jobs once their deadline passes, and async tasks on
//! an [`Executor`]. Jobs never touch windows; they go through the
//! [`Dispatcher`](crate::Dispatcher).

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use async_executor::{Executor, Task};
use charmy_core::{CharmyError, Result};
use parking_lot::Mutex;

type Job = Box<dyn FnOnce() + Send>;

struct Delayed {
    deadline: Instant,
    job: Job,
}

#[derive(Default)]
struct Queues {
    ready: Vec<Job>,
    delayed: Vec<Delayed>,
}

impl Queues {
    /// Pop every job that may run now, delayed ones in deadline order.
    fn take_due(&mut self, now: Instant) -> Vec<Job> {
        let mut due = std::mem::take(&mut self.ready);

        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.delayed.len() {
            if self.delayed[index].deadline <= now {
                expired.push(self.delayed.swap_remove(index));
            } else {
                index += 1;
            }
        }
        expired.sort_by_key(|delayed| delayed.deadline);
        due.extend(expired.into_iter().map(|delayed| delayed.job));
        due
    }
}

/// Cloneable, thread-safe access to a worker's queues.
///
/// Handles can be captured by event handlers and jobs; posting fails with
/// [`CharmyError::WorkerStopped`] while the worker is not running.
#[derive(Clone)]
pub struct WorkerHandle {
    executor: Arc<Executor<'static>>,
    queues: Arc<Mutex<Queues>>,
    alive: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Queue `job` for the next worker iteration.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        if !self.is_running() {
            return Err(CharmyError::WorkerStopped);
        }
        self.queues.lock().ready.push(Box::new(job));
        Ok(())
    }

    /// Queue `job` to run once `delay` has passed.
    pub fn post_after(&self, delay: Duration, job: impl FnOnce() + Send + 'static) -> Result<()> {
        if !self.is_running() {
            return Err(CharmyError::WorkerStopped);
        }
        self.queues.lock().delayed.push(Delayed {
            deadline: Instant::now() + delay,
            job: Box::new(job),
        });
        Ok(())
    }

    /// Spawn an async task on the worker.
    ///
    /// Returns a [`Task`] that can be awaited (or blocked on) for the result.
    /// Tasks may be spawned before the worker starts; they run once it does.
    pub fn spawn<T>(&self, future: impl Future<Output = T> + Send + 'static) -> Task<T>
    where
        T: Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// Number of jobs waiting, delayed ones included.
    pub fn pending(&self) -> usize {
        let queues = self.queues.lock();
        queues.ready.len() + queues.delayed.len()
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

/// A secondary thread processing work outside the UI tick.
pub struct WorkerLoop {
    shared: WorkerHandle,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
    idle: Duration,
}

impl WorkerLoop {
    pub fn new(idle: Duration) -> Self {
        Self {
            shared: WorkerHandle {
                executor: Arc::new(Executor::new()),
                queues: Arc::default(),
                alive: Arc::new(AtomicBool::new(false)),
            },
            thread: Mutex::new(None),
            idle,
        }
    }

    pub fn handle(&self) -> WorkerHandle {
        self.shared.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Clearing this flag makes the thread exit after its current iteration.
    pub(crate) fn alive_flag(&self) -> Arc<AtomicBool> {
        self.shared.alive.clone()
    }

    /// Spawn the worker thread. Starting a running worker does nothing.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.thread.lock();
        if slot.is_some() {
            return Ok(());
        }

        let alive = self.shared.alive.clone();
        alive.store(true, Ordering::Release);

        let executor = self.shared.executor.clone();
        let queues = self.shared.queues.clone();
        let flag = alive.clone();
        let idle = self.idle;

        let handle = thread::Builder::new()
            .name("charmy-worker".to_string())
            .spawn(move || {
                while flag.load(Ordering::Acquire) {
                    let jobs = queues.lock().take_due(Instant::now());
                    let mut busy = !jobs.is_empty();
                    for job in jobs {
                        if let Err(e) = panic::catch_unwind(AssertUnwindSafe(job)) {
                            tracing::error!("worker job panicked: {}", panic_message(&*e));
                        }
                    }

                    // Run tasks until shutdown or no more tasks
                    while flag.load(Ordering::Acquire) {
                        match panic::catch_unwind(AssertUnwindSafe(|| executor.try_tick())) {
                            Ok(true) => busy = true,
                            Ok(false) => break,
                            Err(e) => {
                                tracing::error!("worker task panicked: {}", panic_message(&*e));
                                busy = true;
                            }
                        }
                    }

                    if !busy {
                        thread::sleep(idle);
                    }
                }
            })
            .map_err(|e| {
                alive.store(false, Ordering::Release);
                CharmyError::custom(format!("failed to spawn worker thread: {e}"))
            })?;

        *slot = Some(handle);
        tracing::debug!("worker loop started");
        Ok(())
    }

    /// Signal the thread to stop and wait for it.
    ///
    /// The job running when the signal arrives finishes; queued jobs are
    /// dropped unrun.
    pub fn stop(&self) {
        self.shared.alive.store(false, Ordering::Release);

        let Some(handle) = self.thread.lock().take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            // Stopped from one of its own jobs; the loop exits on its next check.
            return;
        }

        if let Err(e) = handle.join() {
            tracing::error!("worker thread panicked: {:?}", e);
        }

        let mut queues = self.shared.queues.lock();
        let dropped = queues.ready.len() + queues.delayed.len();
        queues.ready.clear();
        queues.delayed.clear();
        if dropped > 0 {
            tracing::debug!("worker loop stopped, {} queued jobs dropped", dropped);
        } else {
            tracing::debug!("worker loop stopped");
        }
    }

    /// See [`WorkerHandle::post`].
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.shared.post(job)
    }

    /// See [`WorkerHandle::post_after`].
    pub fn post_after(&self, delay: Duration, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.shared.post_after(delay, job)
    }

    /// See [`WorkerHandle::spawn`].
    pub fn spawn<T>(&self, future: impl Future<Output = T> + Send + 'static) -> Task<T>
    where
        T: Send + 'static,
    {
        self.shared.spawn(future)
    }

    pub fn pending(&self) -> usize {
        self.shared.pending()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl Default for WorkerLoop {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Drop for WorkerLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WorkerLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerLoop")
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}
