//! Charmy Core
//!
//! The object runtime behind the Charmy GUI toolkit: identities, dynamic
//! attributes, synchronous events and the capability traits native
//! frameworks implement.

pub mod alloc;
pub mod attribute;
pub mod canvas;
pub mod error;
pub mod event;
pub mod framework;
pub mod geometry;
pub mod identity;
pub mod logging;
pub mod object;
pub mod profiling;
pub mod runtime;
pub mod value;
pub mod var;

pub use error::{CharmyError, Result};
pub use event::{Event, EventBus, Handler};
pub use identity::{IdSpec, Identity};
pub use object::{Object, ObjectRef};
pub use runtime::Runtime;
pub use value::{Payload, Value, ValueKind};
pub use var::Var;
