//! Object identities and the registry that hands them out.
//!
//! Auto-generated ids are `type_tag + live count`, so ids are reused once
//! the objects holding them are destroyed. The census is an explicit ledger:
//! it only shrinks when [`Registry::release`] is called.

use std::fmt;

use crate::alloc::HashMap;
use crate::error::{CharmyError, Result};
use crate::object::ObjectRef;

/// How an object should be addressed when it is registered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdSpec {
    /// Derive `type_tag + live_count(type_tag)`.
    #[default]
    Auto,
    /// Counted in the census but never registered by id.
    Unaddressable,
    /// Use exactly this id.
    Named(String),
}

impl From<&str> for IdSpec {
    fn from(id: &str) -> Self {
        IdSpec::Named(id.to_string())
    }
}

impl From<String> for IdSpec {
    fn from(id: String) -> Self {
        IdSpec::Named(id)
    }
}

/// The identity of one runtime object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    id: Option<String>,
    type_tag: String,
}

impl Identity {
    /// The registered id, `None` for unaddressable objects.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn is_addressable(&self) -> bool {
        self.id.is_some()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}[{}]", self.type_tag, id),
            None => write!(f, "{}[-]", self.type_tag),
        }
    }
}

/// Registry of live objects, by id and by type tag.
#[derive(Default)]
pub struct Registry {
    by_id: HashMap<String, ObjectRef>,
    by_type: HashMap<String, HashMap<String, ObjectRef>>,
    census: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spec` into an identity without touching the registry.
    pub fn mint(&self, type_tag: &str, spec: &IdSpec) -> Result<Identity> {
        let id = match spec {
            IdSpec::Unaddressable => None,
            IdSpec::Auto => Some(format!("{}{}", type_tag, self.live_count(type_tag))),
            IdSpec::Named(id) => Some(id.clone()),
        };

        if let Some(id) = &id
            && self.by_id.contains_key(id)
        {
            return Err(CharmyError::DuplicateIdentity { id: id.clone() });
        }

        Ok(Identity {
            id,
            type_tag: type_tag.to_string(),
        })
    }

    /// Mint an identity, build the object with it and record it.
    ///
    /// On failure nothing is recorded and `build` is never called.
    pub fn register(
        &mut self,
        type_tag: &str,
        spec: &IdSpec,
        build: impl FnOnce(Identity) -> ObjectRef,
    ) -> Result<ObjectRef> {
        let identity = self.mint(type_tag, spec)?;
        let object = build(identity.clone());

        *self.census.entry(identity.type_tag.clone()).or_insert(0) += 1;

        if let Some(id) = &identity.id {
            self.by_id.insert(id.clone(), object.clone());
            self.by_type
                .entry(identity.type_tag.clone())
                .or_default()
                .insert(id.clone(), object.clone());
        }

        tracing::trace!("registered {}", identity);
        Ok(object)
    }

    /// Remove `id` from both views. Unknown ids are ignored.
    pub fn unregister(&mut self, id: &str) {
        let Some(object) = self.by_id.remove(id) else {
            return;
        };

        let type_tag = object.identity().type_tag();
        if let Some(instances) = self.by_type.get_mut(type_tag) {
            instances.remove(id);
            if instances.is_empty() {
                self.by_type.remove(type_tag);
            }
        }
    }

    /// Record the destruction of an object: census decrement plus unregister.
    pub fn release(&mut self, identity: &Identity) {
        if let Some(count) = self.census.get_mut(identity.type_tag()) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.census.remove(identity.type_tag());
            }
        }

        if let Some(id) = identity.id() {
            // Only drop the entry if it still belongs to this identity.
            let owned = self
                .by_id
                .get(id)
                .is_some_and(|object| object.identity() == identity);
            if owned {
                self.unregister(id);
            }
        }

        tracing::trace!("released {}", identity);
    }

    pub fn lookup(&self, id: &str) -> Option<ObjectRef> {
        self.by_id.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Registered instances of `type_tag`, keyed by id.
    pub fn instances(&self, type_tag: &str) -> Vec<ObjectRef> {
        self.by_type
            .get(type_tag)
            .map(|instances| instances.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live objects of `type_tag`, addressable or not.
    pub fn live_count(&self, type_tag: &str) -> usize {
        self.census.get(type_tag).copied().unwrap_or(0)
    }

    /// Number of objects registered by id.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.by_id.keys().collect::<Vec<_>>())
            .field("census", &self.census)
            .finish()
    }
}
