//! Value holders used to share and observe a single value.
//!
//! A `Var` coerces every write into its kind and raises a `change` event
//! (payload key `value`) when the stored value actually changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::Result;
use crate::event::{Event, Handler};
use crate::identity::IdSpec;
use crate::object::ObjectRef;
use crate::payload;
use crate::runtime::Runtime;
use crate::value::{Value, ValueKind};

/// Type tag of every value holder.
pub const VAR_TYPE: &str = "Var";

/// An observable, typed value.
#[derive(Clone)]
pub struct Var {
    object: ObjectRef,
    runtime: Runtime,
    kind: ValueKind,
    value: Arc<Mutex<Value>>,
    // Shared by clones so the identity is released once.
    destroyed: Arc<AtomicBool>,
}

impl Var {
    /// Create a holder of `kind`, starting at `initial` (coerced) or at the
    /// kind's zero value when `initial` is null.
    pub fn new(
        runtime: &Runtime,
        kind: ValueKind,
        initial: impl Into<Value>,
        id: impl Into<IdSpec>,
    ) -> Result<Self> {
        let initial = initial.into();
        let initial = if initial.is_null() {
            zero_value(kind)
        } else {
            initial.coerce(kind)?
        };

        let object = runtime.create(VAR_TYPE, id)?;
        let var = Self {
            object,
            runtime: runtime.clone(),
            kind,
            value: Arc::new(Mutex::new(initial)),
            destroyed: Arc::new(AtomicBool::new(false)),
        };
        var.install_value_slot();
        Ok(var)
    }

    pub fn string(runtime: &Runtime, initial: &str) -> Result<Self> {
        Self::new(runtime, ValueKind::Str, initial, IdSpec::Auto)
    }

    pub fn int(runtime: &Runtime, initial: i64) -> Result<Self> {
        Self::new(runtime, ValueKind::Int, initial, IdSpec::Auto)
    }

    pub fn bool(runtime: &Runtime, initial: bool) -> Result<Self> {
        Self::new(runtime, ValueKind::Bool, initial, IdSpec::Auto)
    }

    pub fn float(runtime: &Runtime, initial: f64) -> Result<Self> {
        Self::new(runtime, ValueKind::Float, initial, IdSpec::Auto)
    }

    // The `value` attribute proxies to the holder so generic attribute code
    // sees the same coercion rules. The slot holds the object weakly, it
    // lives inside that object.
    fn install_value_slot(&self) {
        let read = self.value.clone();
        let write = self.value.clone();
        let object = Arc::downgrade(&self.object);
        let kind = self.kind;
        self.object.attributes().define_virtual(
            "value",
            move || Ok(read.lock().clone()),
            move |value| match object.upgrade() {
                Some(object) => store(&object, kind, &write, value).map(|_| ()),
                None => Ok(()),
            },
        );
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn get(&self) -> Value {
        self.value.lock().clone()
    }

    /// Coerce and store `value`. Returns whether the stored value changed.
    ///
    /// The `change` event fires after the new value is stored, so handlers
    /// observe it through [`get`](Self::get).
    pub fn set(&self, value: impl Into<Value>) -> Result<bool> {
        store(&self.object, self.kind, &self.value, value.into())
    }

    /// Release the holder's identity so its id can be reused.
    ///
    /// Only the first call, across all clones, has an effect. The value
    /// stays readable and writable.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.runtime.destroy(&self.object);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Run `callback` whenever the value changes.
    pub fn on_change(
        &self,
        callback: impl Fn(&Event) -> Result<()> + Send + Sync + 'static,
    ) -> Handler {
        self.object.bind("change", callback)
    }
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Var")
            .field("id", &self.object.id())
            .field("kind", &self.kind)
            .field("value", &self.get())
            .finish()
    }
}

fn store(object: &ObjectRef, kind: ValueKind, slot: &Mutex<Value>, value: Value) -> Result<bool> {
    let coerced = value.coerce(kind)?;

    {
        let mut current = slot.lock();
        if *current == coerced {
            return Ok(false);
        }
        *current = coerced.clone();
    }

    object.trigger("change", payload! { "value" => coerced })?;
    Ok(true)
}

fn zero_value(kind: ValueKind) -> Value {
    match kind {
        ValueKind::Bool => Value::Bool(false),
        ValueKind::Int => Value::Int(0),
        ValueKind::Float => Value::Float(0.0),
        ValueKind::Str => Value::Str(String::new()),
        ValueKind::List => Value::List(Vec::new()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CharmyError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_defaults() {
        let runtime = Runtime::new();
        let var = Var::new(&runtime, ValueKind::Int, Value::Null, IdSpec::Auto).unwrap();
        assert_eq!(var.get(), Value::Int(0));
    }

    #[test]
    fn test_change_fires_only_on_difference() {
        let runtime = Runtime::new();
        let var = Var::int(&runtime, 1).unwrap();
        let changes = Arc::new(AtomicUsize::new(0));

        let seen = changes.clone();
        var.on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(var.set(2).unwrap());
        assert!(!var.set(2).unwrap());
        // "2" coerces to the current value.
        assert!(!var.set("2").unwrap());
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_write_is_an_error_and_keeps_value() {
        let runtime = Runtime::new();
        let var = Var::int(&runtime, 5).unwrap();

        let err = var.set("five").unwrap_err();
        assert!(matches!(err, CharmyError::AttributeCoercion { expected: ValueKind::Int, .. }));
        assert_eq!(var.get(), Value::Int(5));
    }

    #[test]
    fn test_change_payload_carries_coerced_value() {
        let runtime = Runtime::new();
        let var = Var::string(&runtime, "").unwrap();
        let last = Arc::new(Mutex::new(Value::Null));

        let sink = last.clone();
        var.on_change(move |event| {
            *sink.lock() = event["value"].clone();
            Ok(())
        });

        var.set(12).unwrap();
        assert_eq!(*last.lock(), Value::from("12"));
    }

    #[test]
    fn test_value_attribute_proxies() {
        let runtime = Runtime::new();
        let var = Var::bool(&runtime, false).unwrap();

        var.object().set("value", 1).unwrap();
        assert_eq!(var.get(), Value::Bool(true));
        assert_eq!(var.object().get("value", Value::Null).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_vars_get_auto_ids() {
        let runtime = Runtime::new();
        let a = Var::float(&runtime, 0.5).unwrap();
        let b = Var::float(&runtime, 1.5).unwrap();

        assert_eq!(a.object().id(), Some("Var0"));
        assert_eq!(b.object().id(), Some("Var1"));
    }

    #[test]
    fn test_destroy_releases_the_id_once() {
        let runtime = Runtime::new();
        let a = Var::int(&runtime, 1).unwrap();
        let b = Var::int(&runtime, 2).unwrap();

        a.destroy();
        a.clone().destroy();
        assert!(a.is_destroyed());
        assert!(runtime.lookup("Var0").is_none());
        assert_eq!(runtime.live_count(VAR_TYPE), 1);

        b.destroy();
        assert_eq!(runtime.live_count(VAR_TYPE), 0);
        let c = Var::int(&runtime, 3).unwrap();
        assert_eq!(c.object().id(), Some("Var0"));
    }
}
