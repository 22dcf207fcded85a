//! Deferred work handed to the main thread.
//!
//! Code running off the main thread (worker jobs, async tasks) must not touch
//! windows directly. It posts here instead and the manager drains the queue
//! once per tick, after native events.

use std::collections::VecDeque;
use std::sync::Arc;

use charmy_core::{ObjectRef, Payload, Result};
use parking_lot::Mutex;

type MainThreadFn = Box<dyn FnOnce() -> Result<()> + Send>;

enum Deferred {
    Trigger {
        target: ObjectRef,
        name: String,
        payload: Payload,
    },
    Call(MainThreadFn),
}

/// Cloneable, thread-safe queue of deferred triggers.
#[derive(Clone, Default)]
pub struct Dispatcher {
    queue: Arc<Mutex<VecDeque<Deferred>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger `name` on `target` during the next tick.
    pub fn post(&self, target: &ObjectRef, name: &str, payload: Payload) {
        self.queue.lock().push_back(Deferred::Trigger {
            target: target.clone(),
            name: name.to_string(),
            payload,
        });
    }

    /// Run `f` on the main thread during the next tick.
    pub fn post_fn(&self, f: impl FnOnce() -> Result<()> + Send + 'static) {
        self.queue.lock().push_back(Deferred::Call(Box::new(f)));
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Run everything queued so far, in posting order.
    ///
    /// Work posted while draining waits for the next call. On error the
    /// remaining entries stay queued.
    pub fn drain(&self) -> Result<usize> {
        let pending = self.queue.lock().len();
        let mut ran = 0;

        while ran < pending {
            // The lock is released before the entry runs.
            let Some(entry) = self.queue.lock().pop_front() else {
                break;
            };
            ran += 1;

            match entry {
                Deferred::Trigger {
                    target,
                    name,
                    payload,
                } => target.trigger(&name, payload)?,
                Deferred::Call(f) => f()?,
            }
        }
        Ok(ran)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charmy_core::{payload, CharmyError, Runtime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_posts_from_other_threads_run_on_drain() {
        let runtime = Runtime::new();
        let object = runtime.create("Window", "w").unwrap();
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let seen = hits.clone();
        object.bind("tick", move |event| {
            seen.fetch_add(event["n"].as_int().unwrap() as usize, Ordering::SeqCst);
            Ok(())
        });

        let remote = dispatcher.clone();
        let target = object.clone();
        std::thread::spawn(move || {
            remote.post(&target, "tick", payload! { "n" => 2 });
            remote.post(&target, "tick", payload! { "n" => 3 });
        })
        .join()
        .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.drain().unwrap(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_work_posted_while_draining_waits() {
        let dispatcher = Dispatcher::new();
        let again = dispatcher.clone();
        dispatcher.post_fn(move || {
            again.post_fn(|| Ok(()));
            Ok(())
        });

        assert_eq!(dispatcher.drain().unwrap(), 1);
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_error_keeps_rest_queued() {
        let dispatcher = Dispatcher::new();
        dispatcher.post_fn(|| Err(CharmyError::custom("nope")));
        dispatcher.post_fn(|| Ok(()));

        assert!(dispatcher.drain().is_err());
        assert_eq!(dispatcher.len(), 1);
    }
}
