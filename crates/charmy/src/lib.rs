//! Charmy - a small reactive GUI toolkit runtime
//!
//! Every toolkit entity is a runtime object with an identity, dynamic
//! attributes and synchronous events. The [`Manager`] owns the native
//! frameworks and the window set and runs the main loop; a [`WorkerLoop`]
//! runs background work next to it.
//!
//! # Quick Start
//!
//! ```no_run
//! use charmy::prelude::*;
//!
//! fn main() -> charmy::Result<()> {
//!     let manager = Manager::new(ManagerConfig::from_env())?;
//!     let window = Window::new(&manager, WindowDescriptor::new().with_size(300, 160))?;
//!
//!     window.bind("resize", |event| {
//!         println!("<{}>: {}x{}", event.kind(), event["width"], event["height"]);
//!         Ok(())
//!     });
//!
//!     manager.mainloop()
//! }
//! ```
//!
//! # Frameworks
//!
//! The UI, drawing and backend frameworks are picked by name through
//! `CHARMY_UI_BACKEND`, `CHARMY_DRAWING_BACKEND` and `CHARMY_BACKEND`, see
//! [`frameworks`].

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod frameworks;
pub mod manager;
pub mod window;
pub mod worker;

// Re-export core types
pub use charmy_core as core;
pub use charmy_core::{
    payload, CharmyError, Event, EventBus, Handler, IdSpec, Identity, Object, ObjectRef,
    Payload, Result, Runtime, Value, ValueKind, Var,
};

#[cfg(feature = "winit")]
pub use charmy_winit as winit;

pub use builder::ManagerBuilder;
pub use config::{MANAGER_ID, ManagerConfig};
pub use dispatcher::Dispatcher;
pub use manager::{Manager, ManagerState, QuitHandle};
pub use window::{Window, WindowDescriptor};
pub use worker::{WorkerHandle, WorkerLoop};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::ManagerBuilder;
    pub use crate::config::ManagerConfig;
    pub use crate::dispatcher::Dispatcher;
    pub use crate::manager::{Manager, ManagerState, QuitHandle};
    pub use crate::window::{Window, WindowDescriptor};
    pub use crate::worker::{WorkerHandle, WorkerLoop};

    pub use charmy_core::canvas::{Canvas, Color, Paint};
    pub use charmy_core::geometry::{Pos, Rect, Size};
    pub use charmy_core::{
        payload, CharmyError, Event, IdSpec, ObjectRef, Runtime, Value, ValueKind, Var,
    };
}
