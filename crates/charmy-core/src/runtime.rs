//! The runtime context owning the object registry.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::identity::{IdSpec, Registry};
use crate::object::{Object, ObjectRef};

/// Shared runtime context.
///
/// Cloning is cheap and every clone refers to the same registry. There is no
/// process-global registry; code that creates objects is handed a `Runtime`.
#[derive(Clone, Default)]
pub struct Runtime {
    registry: Arc<Mutex<Registry>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register an object in one step.
    pub fn create(&self, type_tag: &str, id: impl Into<IdSpec>) -> Result<ObjectRef> {
        let spec = id.into();
        self.registry.lock().register(type_tag, &spec, Object::new)
    }

    /// Destroy an object: it leaves the registry and stops counting toward
    /// the live census of its type.
    pub fn destroy(&self, object: &Object) {
        self.registry.lock().release(object.identity());
        tracing::trace!("destroyed {}", object);
    }

    /// Drop `id` from the lookup tables without touching the census.
    pub fn unregister(&self, id: &str) {
        self.registry.lock().unregister(id);
    }

    pub fn lookup(&self, id: &str) -> Option<ObjectRef> {
        self.registry.lock().lookup(id)
    }

    pub fn instances(&self, type_tag: &str) -> Vec<ObjectRef> {
        self.registry.lock().instances(type_tag)
    }

    pub fn live_count(&self, type_tag: &str) -> usize {
        self.registry.lock().live_count(type_tag)
    }

    /// Run `f` with the registry locked.
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.registry.lock())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Runtime").field(&*self.registry.lock()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtimes_are_independent() {
        let a = Runtime::new();
        let b = Runtime::new();

        a.create("Window", IdSpec::Auto).unwrap();
        let other = b.create("Window", IdSpec::Auto).unwrap();

        assert_eq!(other.id(), Some("Window0"));
        assert!(b.lookup("Window0").is_some());
    }

    #[test]
    fn test_clones_share_registry() {
        let runtime = Runtime::new();
        let clone = runtime.clone();

        runtime.create("Var", "speed").unwrap();
        assert!(clone.lookup("speed").is_some());
    }

    #[test]
    fn test_destroy_recompacts_ids() {
        let runtime = Runtime::new();
        let only = runtime.create("T", IdSpec::Auto).unwrap();
        assert_eq!(only.id(), Some("T0"));

        runtime.destroy(&only);
        assert!(runtime.lookup("T0").is_none());
        assert_eq!(runtime.live_count("T"), 0);

        let again = runtime.create("T", IdSpec::Auto).unwrap();
        assert_eq!(again.id(), Some("T0"));
    }
}
