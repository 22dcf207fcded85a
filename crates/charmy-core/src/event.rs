//! Synchronous, per-object event dispatch.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::alloc::HashMap;
use crate::error::Result;
use crate::object::ObjectRef;
use crate::value::{Payload, Value};

/// A named notification raised on one object.
#[derive(Clone)]
pub struct Event {
    source: ObjectRef,
    kind: String,
    payload: Payload,
}

impl Event {
    pub fn new(source: ObjectRef, kind: impl Into<String>, payload: Payload) -> Self {
        Self {
            source,
            kind: kind.into(),
            payload,
        }
    }

    /// The object the event was triggered on.
    pub fn source(&self) -> &ObjectRef {
        &self.source
    }

    /// The event name, e.g. `resize`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

impl Index<&str> for Event {
    type Output = Value;

    /// # Panics
    ///
    /// Panics if the payload has no `key`.
    fn index(&self, key: &str) -> &Value {
        match self.payload.get(key) {
            Some(value) => value,
            None => panic!("event <{}> has no payload key '{}'", self.kind, key),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("source", &self.source.to_string())
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .finish()
    }
}

type Callback = dyn Fn(&Event) -> Result<()> + Send + Sync;

/// A bound callback. Clones refer to the same callback, which is what
/// [`EventBus::unbind`] matches on.
#[derive(Clone)]
pub struct Handler(Arc<Callback>);

impl Handler {
    pub fn new(callback: impl Fn(&Event) -> Result<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    pub fn call(&self, event: &Event) -> Result<()> {
        (self.0)(event)
    }

    pub fn same_as(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.0))
    }
}

/// Event name to ordered handler list, for a single object.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the handlers of `name`.
    pub fn bind(
        &self,
        name: &str,
        callback: impl Fn(&Event) -> Result<()> + Send + Sync + 'static,
    ) -> Handler {
        let handler = Handler::new(callback);
        self.bind_handler(name, &handler);
        handler
    }

    /// Append an existing handler. Binding the same handler twice makes it
    /// fire twice.
    pub fn bind_handler(&self, name: &str, handler: &Handler) {
        self.handlers
            .lock()
            .entry(name.to_string())
            .or_default()
            .push(handler.clone());
    }

    /// Remove the first binding of `handler` under `name`.
    pub fn unbind(&self, name: &str, handler: &Handler) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(bound) = handlers.get_mut(name) else {
            return false;
        };

        let Some(position) = bound.iter().position(|h| h.same_as(handler)) else {
            return false;
        };
        bound.remove(position);
        if bound.is_empty() {
            handlers.remove(name);
        }
        true
    }

    /// Run every handler of `event.kind()` in binding order.
    ///
    /// Handlers bound or unbound while dispatching take effect on the next
    /// trigger. The first failing handler stops dispatch and its error is
    /// returned.
    pub fn dispatch(&self, event: &Event) -> Result<()> {
        let handlers = match self.handlers.lock().get(event.kind()) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };

        for handler in &handlers {
            handler.call(event)?;
        }
        Ok(())
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.lock().get(name).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.handlers.lock().clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock();
        f.debug_map()
            .entries(handlers.iter().map(|(name, bound)| (name, bound.len())))
            .finish()
    }
}
