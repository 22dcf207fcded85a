//! Capability interfaces for the native collaborators and the registry that
//! resolves configured framework names into implementations.
//!
//! Three independent choices are made once per process: the UI framework
//! (native windows and event polling), the drawing framework (painting into
//! a [`Canvas`]) and the backend framework (GPU context setup).

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::alloc::HashMap;
use crate::canvas::{Canvas, Paint};
use crate::error::{CharmyError, Result};
use crate::geometry::{Pos, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkKind {
    Ui,
    Drawing,
    Backend,
}

impl fmt::Display for FrameworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameworkKind::Ui => "UI",
            FrameworkKind::Drawing => "drawing",
            FrameworkKind::Backend => "backend",
        })
    }
}

/// Opaque id of a native window, unique within one UI framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native#{}", self.0)
    }
}

/// Something the native side reported, queued for the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    Resized {
        handle: NativeHandle,
        width: u32,
        height: u32,
    },
    Moved {
        handle: NativeHandle,
        x: i32,
        y: i32,
    },
    CloseRequested {
        handle: NativeHandle,
    },
    Error {
        code: i32,
        description: String,
    },
}

/// Queue native callbacks push into, from whatever thread they run on.
///
/// The main loop drains it after each wait, so event handlers only ever run
/// on the main thread.
#[derive(Clone, Default)]
pub struct NativeEventSink {
    queue: Arc<Mutex<VecDeque<NativeEvent>>>,
}

impl NativeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: NativeEvent) {
        self.queue.lock().push_back(event);
    }

    pub fn resized(&self, handle: NativeHandle, width: u32, height: u32) {
        self.push(NativeEvent::Resized {
            handle,
            width,
            height,
        });
    }

    pub fn moved(&self, handle: NativeHandle, x: i32, y: i32) {
        self.push(NativeEvent::Moved { handle, x, y });
    }

    pub fn close_requested(&self, handle: NativeHandle) {
        self.push(NativeEvent::CloseRequested { handle });
    }

    /// Report a native error as `(code, description)`.
    pub fn error(&self, code: i32, description: impl Into<String>) {
        self.push(NativeEvent::Error {
            code,
            description: description.into(),
        });
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<NativeEvent> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl fmt::Debug for NativeEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEventSink")
            .field("pending", &self.len())
            .finish()
    }
}

/// Settings passed to the UI and backend frameworks at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiSettings {
    pub samples: u32,
    pub vsync: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            samples: 4,
            vsync: true,
        }
    }
}

/// What a UI framework needs to open a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeWindowDescriptor {
    pub title: String,
    pub size: Size<u32>,
    pub visible: bool,
    pub resizable: bool,
    pub force_hardware_acceleration: bool,
}

impl Default for NativeWindowDescriptor {
    fn default() -> Self {
        Self {
            title: "Charmy GUI".to_string(),
            size: Size::new(100, 100),
            visible: true,
            resizable: true,
            force_hardware_acceleration: true,
        }
    }
}

/// Native windowing: window creation, event waiting and teardown.
///
/// Implementations live on the main thread.
pub trait UiFramework {
    fn name(&self) -> &str;

    /// Called once before any window is created. Native callbacks (resize,
    /// move, close, errors) must be routed into `events`.
    fn init(&mut self, settings: &UiSettings, events: NativeEventSink) -> Result<()>;

    fn create_window(
        &mut self,
        descriptor: &NativeWindowDescriptor,
    ) -> Result<Box<dyn NativeWindow>>;

    /// Block until native events arrive, or `timeout` passes when given.
    fn wait_events(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// 1 enables vsync, 0 disables it. Cheap to call every tick.
    fn set_swap_interval(&mut self, interval: u32);

    /// Tear the framework down after the last window is gone.
    fn terminate(&mut self);
}

/// One native window. Shared with accessor closures, hence `Send + Sync`.
pub trait NativeWindow: Send + Sync {
    fn handle(&self) -> NativeHandle;

    fn size(&self) -> Result<Size<u32>>;

    fn set_size(&self, size: Size<u32>) -> Result<()>;

    fn position(&self) -> Result<Pos<i32>>;

    fn set_position(&self, position: Pos<i32>) -> Result<()>;

    /// Whether the user (or code) asked the window to close.
    fn should_close(&self) -> bool;

    fn set_should_close(&self, value: bool);

    fn request_redraw(&self);

    /// Destroy the native window. Consumes the handle, so it cannot run twice.
    fn destroy(self: Box<Self>);
}

/// Painting primitives used by widgets.
pub trait DrawingFramework: Send + Sync {
    fn name(&self) -> &str;

    /// Fill and/or stroke `rect` with corners rounded by `radius`.
    fn draw_rect(&self, canvas: &mut Canvas, rect: Rect, radius: f32, paint: &Paint)
    -> Result<()>;
}

/// GPU context setup for the selected UI framework.
pub trait BackendFramework {
    fn name(&self) -> &str;

    fn init(&mut self, ui_framework: &str, settings: &UiSettings) -> Result<()>;
}

pub type UiFactory = Box<dyn Fn() -> Result<Box<dyn UiFramework>> + Send + Sync>;
pub type DrawingFactory = Box<dyn Fn() -> Result<Arc<dyn DrawingFramework>> + Send + Sync>;
pub type BackendFactory = Box<dyn Fn() -> Result<Box<dyn BackendFramework>> + Send + Sync>;

/// The three configured framework names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkSelection {
    pub ui: String,
    pub drawing: String,
    pub backend: String,
}

impl FrameworkSelection {
    pub const UI_ENV: &'static str = "CHARMY_UI_BACKEND";
    pub const DRAWING_ENV: &'static str = "CHARMY_DRAWING_BACKEND";
    pub const BACKEND_ENV: &'static str = "CHARMY_BACKEND";

    pub fn new(ui: &str, drawing: &str, backend: &str) -> Self {
        Self {
            ui: normalize(ui),
            drawing: normalize(drawing),
            backend: normalize(backend),
        }
    }

    /// Read the names from the environment, falling back to `defaults`.
    pub fn from_env_or(defaults: FrameworkSelection) -> Self {
        Self::from_lookup(defaults, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env_or`](Self::from_env_or) with a custom lookup.
    pub fn from_lookup(
        defaults: FrameworkSelection,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |key: &str, fallback: String| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(|value| normalize(&value))
                .unwrap_or(fallback)
        };

        Self {
            ui: pick(Self::UI_ENV, defaults.ui),
            drawing: pick(Self::DRAWING_ENV, defaults.drawing),
            backend: pick(Self::BACKEND_ENV, defaults.backend),
        }
    }
}

impl fmt::Display for FrameworkSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ui={}, drawing={}, backend={}",
            self.ui, self.drawing, self.backend
        )
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Resolved framework implementations.
pub struct Frameworks {
    pub selection: FrameworkSelection,
    pub ui: Box<dyn UiFramework>,
    pub drawing: Arc<dyn DrawingFramework>,
    pub backend: Box<dyn BackendFramework>,
}

impl fmt::Debug for Frameworks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frameworks")
            .field("ui", &self.ui.name())
            .field("drawing", &self.drawing.name())
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Named factories for every framework kind. Names are case-insensitive.
#[derive(Default)]
pub struct FrameworkRegistry {
    ui: HashMap<String, UiFactory>,
    drawing: HashMap<String, DrawingFactory>,
    backend: HashMap<String, BackendFactory>,
}

impl FrameworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_ui(
        &mut self,
        name: &str,
        factory: impl Fn() -> Result<Box<dyn UiFramework>> + Send + Sync + 'static,
    ) -> &mut Self {
        self.ui.insert(normalize(name), Box::new(factory));
        self
    }

    pub fn register_drawing(
        &mut self,
        name: &str,
        factory: impl Fn() -> Result<Arc<dyn DrawingFramework>> + Send + Sync + 'static,
    ) -> &mut Self {
        self.drawing.insert(normalize(name), Box::new(factory));
        self
    }

    pub fn register_backend(
        &mut self,
        name: &str,
        factory: impl Fn() -> Result<Box<dyn BackendFramework>> + Send + Sync + 'static,
    ) -> &mut Self {
        self.backend.insert(normalize(name), Box::new(factory));
        self
    }

    pub fn contains(&self, kind: FrameworkKind, name: &str) -> bool {
        let name = normalize(name);
        match kind {
            FrameworkKind::Ui => self.ui.contains_key(&name),
            FrameworkKind::Drawing => self.drawing.contains_key(&name),
            FrameworkKind::Backend => self.backend.contains_key(&name),
        }
    }

    /// Registered names of `kind`, sorted.
    pub fn names(&self, kind: FrameworkKind) -> Vec<String> {
        let mut names: Vec<String> = match kind {
            FrameworkKind::Ui => self.ui.keys().cloned().collect(),
            FrameworkKind::Drawing => self.drawing.keys().cloned().collect(),
            FrameworkKind::Backend => self.backend.keys().cloned().collect(),
        };
        names.sort();
        names
    }

    /// Instantiate the selected frameworks.
    ///
    /// All three names are checked before anything is constructed.
    pub fn resolve(&self, selection: &FrameworkSelection) -> Result<Frameworks> {
        let unknown = |kind, name: &str| CharmyError::UnknownFramework {
            kind,
            name: name.to_string(),
        };

        let ui = self
            .ui
            .get(&normalize(&selection.ui))
            .ok_or_else(|| unknown(FrameworkKind::Ui, &selection.ui))?;
        let drawing = self
            .drawing
            .get(&normalize(&selection.drawing))
            .ok_or_else(|| unknown(FrameworkKind::Drawing, &selection.drawing))?;
        let backend = self
            .backend
            .get(&normalize(&selection.backend))
            .ok_or_else(|| unknown(FrameworkKind::Backend, &selection.backend))?;

        tracing::debug!("resolving frameworks: {}", selection);

        Ok(Frameworks {
            selection: selection.clone(),
            ui: ui()?,
            drawing: drawing()?,
            backend: backend()?,
        })
    }
}

impl fmt::Debug for FrameworkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameworkRegistry")
            .field("ui", &self.names(FrameworkKind::Ui))
            .field("drawing", &self.names(FrameworkKind::Drawing))
            .field("backend", &self.names(FrameworkKind::Backend))
            .finish()
    }
}
