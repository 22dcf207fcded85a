//! The runtime object: identity, attributes and events in one place.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::attribute::AttributeStore;
use crate::error::Result;
use crate::event::{Event, EventBus, Handler};
use crate::identity::Identity;
use crate::value::{Payload, Value};

/// Shared handle to a runtime object.
pub type ObjectRef = Arc<Object>;

/// Every toolkit entity (window, value holder, the manager) is an `Object`.
///
/// Objects are created through [`Runtime::create`](crate::runtime::Runtime::create)
/// so that registration happens together with construction.
pub struct Object {
    this: Weak<Object>,
    identity: Identity,
    attributes: AttributeStore,
    events: EventBus,
}

impl Object {
    pub(crate) fn new(identity: Identity) -> ObjectRef {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            identity,
            attributes: AttributeStore::new(),
            events: EventBus::new(),
        })
    }

    /// A new shared handle to this object.
    pub fn handle(&self) -> Option<ObjectRef> {
        self.this.upgrade()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn id(&self) -> Option<&str> {
        self.identity.id()
    }

    pub fn type_tag(&self) -> &str {
        self.identity.type_tag()
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.attributes.set(name, value)
    }

    pub fn get(&self, name: &str, default: impl Into<Value>) -> Result<Value> {
        self.attributes.get(name, default)
    }

    /// Set several attributes, see [`AttributeStore::batch_set`].
    pub fn config<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.attributes.batch_set(entries)
    }

    pub fn bind(
        &self,
        name: &str,
        callback: impl Fn(&Event) -> Result<()> + Send + Sync + 'static,
    ) -> Handler {
        self.events.bind(name, callback)
    }

    pub fn unbind(&self, name: &str, handler: &Handler) -> bool {
        self.events.unbind(name, handler)
    }

    /// Build an event sourced at this object and dispatch it synchronously
    /// on the calling thread.
    pub fn trigger(&self, name: &str, payload: Payload) -> Result<()> {
        // Objects only exist behind an `Arc`; the upgrade fails only while dropping.
        let Some(source) = self.handle() else {
            return Ok(());
        };
        let event = Event::new(source, name, payload);
        self.events.dispatch(&event)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.identity, f)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("identity", &self.identity)
            .field("attributes", &self.attributes)
            .field("events", &self.events)
            .finish()
    }
}
