//! Per-object attribute slots.
//!
//! A slot is either a stored value or a virtual slot backed by accessor
//! functions. Names form a flat, dot-namespaced space (`ui.is_vsync`).

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::alloc::HashMap;
use crate::error::{CharmyError, Result};
use crate::value::Value;

/// Reads a virtual slot.
pub type Getter = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// Writes a virtual slot. Rejecting the value is reported as an error.
pub type Setter = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// One attribute slot.
#[derive(Clone)]
pub enum Attribute {
    Plain(Value),
    Virtual {
        getter: Getter,
        /// `None` makes the slot read-only.
        setter: Option<Setter>,
    },
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Attribute::Virtual { setter, .. } => f
                .debug_struct("Virtual")
                .field("read_only", &setter.is_none())
                .finish(),
        }
    }
}

/// Name-keyed attribute slots of one object.
///
/// The lock is released before accessors run, so a getter or setter may
/// read other attributes of the same store or trigger events.
#[derive(Default)]
pub struct AttributeStore {
    slots: RwLock<HashMap<String, Attribute>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `name`. Virtual slots forward to their setter, anything else
    /// is replaced by a plain value.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let setter = {
            let mut slots = self.slots.write();
            match slots.get(name) {
                Some(Attribute::Virtual { setter, .. }) => match setter {
                    Some(setter) => setter.clone(),
                    None => {
                        return Err(CharmyError::ReadOnlyAttribute {
                            name: name.to_string(),
                        });
                    }
                },
                _ => {
                    slots.insert(name.to_string(), Attribute::Plain(value));
                    return Ok(());
                }
            }
        };

        setter(value)
    }

    /// Read `name`, falling back to `default` when the slot does not exist.
    pub fn get(&self, name: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.try_get(name)?.unwrap_or_else(|| default.into()))
    }

    /// Read `name`, `None` when the slot does not exist.
    pub fn try_get(&self, name: &str) -> Result<Option<Value>> {
        let getter = {
            let slots = self.slots.read();
            match slots.get(name) {
                None => return Ok(None),
                Some(Attribute::Plain(value)) => return Ok(Some(value.clone())),
                Some(Attribute::Virtual { getter, .. }) => getter.clone(),
            }
        };

        getter().map(Some)
    }

    /// Install a computed slot, replacing whatever `name` held.
    pub fn define_virtual(
        &self,
        name: &str,
        getter: impl Fn() -> Result<Value> + Send + Sync + 'static,
        setter: impl Fn(Value) -> Result<()> + Send + Sync + 'static,
    ) {
        self.define(
            name,
            Attribute::Virtual {
                getter: Arc::new(getter),
                setter: Some(Arc::new(setter)),
            },
        );
    }

    /// Install a read-only computed slot.
    pub fn define_computed(
        &self,
        name: &str,
        getter: impl Fn() -> Result<Value> + Send + Sync + 'static,
    ) {
        self.define(
            name,
            Attribute::Virtual {
                getter: Arc::new(getter),
                setter: None,
            },
        );
    }

    /// Install a slot as is, bypassing any existing setter.
    pub fn define(&self, name: &str, attribute: Attribute) {
        self.slots.write().insert(name.to_string(), attribute);
    }

    /// Apply [`set`](Self::set) to every entry in order.
    ///
    /// Stops at the first failure; earlier entries stay applied.
    pub fn batch_set<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in entries {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    pub fn is_virtual(&self, name: &str) -> bool {
        matches!(self.slots.read().get(name), Some(Attribute::Virtual { .. }))
    }

    /// Drop a slot, returning it.
    pub fn remove(&self, name: &str) -> Option<Attribute> {
        self.slots.write().remove(name)
    }

    /// Slot names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl fmt::Debug for AttributeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.slots.read().iter()).finish()
    }
}
