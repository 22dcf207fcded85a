//! Top-level windows.
//!
//! A [`Window`] is a runtime object (type tag `Window`) owning one native
//! window. Its attributes mix plain slots with virtual slots proxying the
//! native state (`size`, `root_pos`) and the manager configuration
//! (`ui.framework.name`, `ui.is_vsync`, ...).
//!
//! Events raised on a window:
//!
//! | Event | Payload | When |
//! |---|---|---|
//! | `resize` | `width`, `height` | native resize, or `size` written |
//! | `move` | `x_root`, `y_root` | native move, or `root_pos` written |
//! | `delete_window` | | the user asked to close the window |
//! | `update` | | every tick while visible and alive |

use std::fmt;
use std::sync::{Arc, Weak};

use charmy_core::canvas::{Canvas, Color, Paint};
use charmy_core::framework::{DrawingFramework, NativeHandle, NativeWindow, NativeWindowDescriptor};
use charmy_core::geometry::{Pos, Rect, Size};
use charmy_core::{
    payload, CharmyError, Event, Handler, IdSpec, ObjectRef, Result, Runtime, Value,
    ValueKind,
};
use parking_lot::Mutex;

use crate::manager::{MANAGER_ATTRIBUTES, Manager};

/// Type tag of every window object.
pub const WINDOW_TYPE: &str = "Window";

/// How a window is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub id: IdSpec,
    pub title: String,
    pub size: Size<u32>,
    /// Initial screen position; the platform decides when `None`.
    pub position: Option<Pos<i32>>,
    pub visible: bool,
    pub resizable: bool,
    /// Whether a close request destroys the window, see [`Window::set_closable`].
    pub closable: bool,
    pub force_hardware_acceleration: bool,
}

impl Default for WindowDescriptor {
    fn default() -> Self {
        Self {
            id: IdSpec::Auto,
            title: "Charmy GUI".to_string(),
            size: Size::new(100, 100),
            position: None,
            visible: true,
            resizable: true,
            closable: true,
            force_hardware_acceleration: true,
        }
    }
}

impl WindowDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<IdSpec>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Size::new(width, height);
        self
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some(Pos::new(x, y));
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_closable(mut self, closable: bool) -> Self {
        self.closable = closable;
        self
    }

    fn native(&self) -> NativeWindowDescriptor {
        NativeWindowDescriptor {
            title: self.title.clone(),
            size: self.size,
            visible: self.visible,
            resizable: self.resizable,
            force_hardware_acceleration: self.force_hardware_acceleration,
        }
    }
}

type NativeSlot = Mutex<Option<Box<dyn NativeWindow>>>;

struct WindowInner {
    object: ObjectRef,
    runtime: Runtime,
    handle: NativeHandle,
    // `None` once destroyed; taking it out is what makes destruction single-shot.
    native: NativeSlot,
    drawing: Arc<dyn DrawingFramework>,
    canvas: Mutex<Canvas>,
    windows: Weak<Mutex<Vec<Window>>>,
}

impl WindowInner {
    fn destroyed(&self) -> CharmyError {
        CharmyError::WindowDestroyed {
            id: self.object.to_string(),
        }
    }

    /// Run `f` against the native window. The slot lock is held during `f`,
    /// so `f` must not call back into the window.
    fn with_native<R>(&self, f: impl FnOnce(&dyn NativeWindow) -> Result<R>) -> Result<R> {
        match self.native.lock().as_deref() {
            Some(native) => f(native),
            None => Err(self.destroyed()),
        }
    }

    fn apply_size(&self, size: Size<u32>) -> Result<()> {
        if self.native.lock().is_none() {
            return Err(self.destroyed());
        }
        // Canvas first, so a size it cannot hold never reaches the native window.
        self.canvas.lock().resize(size.width, size.height)?;
        self.with_native(|native| native.set_size(size))?;
        self.announce_resize(size)
    }

    fn resized(&self, size: Size<u32>) -> Result<()> {
        self.canvas.lock().resize(size.width, size.height)?;
        self.announce_resize(size)
    }

    fn announce_resize(&self, size: Size<u32>) -> Result<()> {
        self.object.trigger(
            "resize",
            payload! { "width" => size.width, "height" => size.height },
        )
    }

    fn apply_position(&self, position: Pos<i32>) -> Result<()> {
        self.with_native(|native| native.set_position(position))?;
        self.moved(position)
    }

    fn moved(&self, position: Pos<i32>) -> Result<()> {
        self.object.trigger(
            "move",
            payload! { "x_root" => position.x, "y_root" => position.y },
        )
    }
}

/// A native top-level window. Cloning yields another handle to the same window.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

impl Window {
    /// Create the window object and its native window, and add it to `manager`.
    pub fn new(manager: &Manager, descriptor: WindowDescriptor) -> Result<Self> {
        let runtime = manager.runtime().clone();
        let object = runtime.create(WINDOW_TYPE, descriptor.id.clone())?;

        let native = match manager.create_native(&descriptor.native()) {
            Ok(native) => native,
            Err(e) => {
                runtime.destroy(&object);
                return Err(e);
            }
        };
        if let Some(position) = descriptor.position
            && let Err(e) = native.set_position(position)
        {
            native.destroy();
            runtime.destroy(&object);
            return Err(e);
        }

        let size = native.size().unwrap_or(descriptor.size);
        let canvas = match Canvas::new(size.width, size.height) {
            Ok(canvas) => canvas,
            Err(e) => {
                native.destroy();
                runtime.destroy(&object);
                return Err(e);
            }
        };
        let window = Self {
            inner: Arc::new(WindowInner {
                object,
                runtime,
                handle: native.handle(),
                native: Mutex::new(Some(native)),
                drawing: manager.drawing().clone(),
                canvas: Mutex::new(canvas),
                windows: manager.window_list(),
            }),
        };

        window.install_attributes(manager.object(), &descriptor)?;
        manager.add_window(&window);

        tracing::debug!("created {} '{}' ({})", window, descriptor.title, window.handle());
        Ok(window)
    }

    fn install_attributes(&self, manager: &ObjectRef, descriptor: &WindowDescriptor) -> Result<()> {
        let object = &self.inner.object;
        object.config([
            ("title", Value::from(descriptor.title.as_str())),
            ("is_visible", Value::from(descriptor.visible)),
            ("closable", Value::from(descriptor.closable)),
            (
                "is_force_hardware_acceleration",
                Value::from(descriptor.force_hardware_acceleration),
            ),
        ])?;

        let attributes = object.attributes();

        let inner = Arc::downgrade(&self.inner);
        attributes.define_computed("is_alive", move || {
            Ok(Value::Bool(
                inner.upgrade().is_some_and(|inner| inner.native.lock().is_some()),
            ))
        });

        let inner = Arc::downgrade(&self.inner);
        attributes.define_computed("native_handle", move || {
            let handle = inner
                .upgrade()
                .and_then(|inner| inner.native.lock().as_ref().map(|native| native.handle()));
            Ok(handle.map_or(Value::Null, |handle| Value::Int(handle.0 as i64)))
        });

        let (read, write) = (Arc::downgrade(&self.inner), Arc::downgrade(&self.inner));
        attributes.define_virtual(
            "size",
            move || {
                let inner = upgrade(&read)?;
                let size = inner.with_native(|native| native.size())?;
                Ok(Value::from(vec![size.width, size.height]))
            },
            move |value| {
                let (width, height) = pair::<u32>(&value)?;
                upgrade(&write)?.apply_size(Size::new(width, height))
            },
        );

        let (read, write) = (Arc::downgrade(&self.inner), Arc::downgrade(&self.inner));
        attributes.define_virtual(
            "root_pos",
            move || {
                let inner = upgrade(&read)?;
                let position = inner.with_native(|native| native.position())?;
                Ok(Value::from(vec![position.x, position.y]))
            },
            move |value| {
                let (x, y) = pair::<i32>(&value)?;
                upgrade(&write)?.apply_position(Pos::new(x, y))
            },
        );

        // Framework names and display settings live on the manager.
        for name in MANAGER_ATTRIBUTES {
            let (read, write) = (Arc::downgrade(manager), Arc::downgrade(manager));
            attributes.define_virtual(
                name,
                move || match read.upgrade() {
                    Some(manager) => manager.get(name, Value::Null),
                    None => Ok(Value::Null),
                },
                move |value| match write.upgrade() {
                    Some(manager) => manager.set(name, value),
                    None => Ok(()),
                },
            );
        }
        Ok(())
    }

    pub fn object(&self) -> &ObjectRef {
        &self.inner.object
    }

    pub fn id(&self) -> Option<&str> {
        self.inner.object.id()
    }

    /// The handle the native window was created with. It keeps identifying
    /// the window in logs and native events after destruction; see
    /// [`native_handle`](Self::native_handle) for the live one.
    pub fn handle(&self) -> NativeHandle {
        self.inner.handle
    }

    /// The native handle while the native window exists, `None` once destroyed.
    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.inner.native.lock().as_ref().map(|native| native.handle())
    }

    /// Whether both values are handles to the same window.
    pub fn same_as(&self, other: &Window) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn bind(
        &self,
        name: &str,
        callback: impl Fn(&Event) -> Result<()> + Send + Sync + 'static,
    ) -> Handler {
        self.inner.object.bind(name, callback)
    }

    pub fn unbind(&self, name: &str, handler: &Handler) -> bool {
        self.inner.object.unbind(name, handler)
    }

    pub fn title(&self) -> String {
        self.inner
            .object
            .get("title", Value::Null)
            .ok()
            .and_then(|title| title.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn size(&self) -> Result<Size<u32>> {
        self.inner.with_native(|native| native.size())
    }

    pub fn position(&self) -> Result<Pos<i32>> {
        self.inner.with_native(|native| native.position())
    }

    /// Resize the native window and raise `resize`.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.inner.object.set("size", vec![width, height])
    }

    /// Move the native window and raise `move`.
    pub fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.inner.object.set("root_pos", vec![x, y])
    }

    /// Whether a close was requested and not yet handled.
    pub fn should_close(&self) -> bool {
        self.inner
            .with_native(|native| Ok(native.should_close()))
            .unwrap_or(false)
    }

    /// Ask the window to close; the main loop handles it on its next tick.
    pub fn request_close(&self) -> Result<()> {
        self.inner.with_native(|native| {
            native.set_should_close(true);
            Ok(())
        })
    }

    pub(crate) fn cancel_close(&self) {
        let _ = self.inner.with_native(|native| {
            native.set_should_close(false);
            Ok(())
        });
    }

    pub fn is_closable(&self) -> bool {
        self.attribute_flag("closable")
    }

    /// Allow or refuse close requests.
    ///
    /// A `delete_window` handler can call `set_closable(false)` to keep the
    /// window open, e.g. to ask about unsaved work first.
    pub fn set_closable(&self, closable: bool) -> Result<()> {
        self.inner.object.set("closable", closable)
    }

    pub fn is_visible(&self) -> bool {
        self.attribute_flag("is_visible")
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.inner.object.set("is_visible", visible)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.native.lock().is_some()
    }

    fn attribute_flag(&self, name: &str) -> bool {
        self.inner
            .object
            .get(name, false)
            .and_then(|value| value.coerce(ValueKind::Bool))
            .is_ok_and(|value| value.truthy())
    }

    /// Raise `update` and ask the native side to redraw.
    pub fn update(&self) -> Result<()> {
        if !self.is_alive() {
            return Err(self.inner.destroyed());
        }
        self.inner.object.trigger("update", payload! {})?;
        self.inner.with_native(|native| {
            native.request_redraw();
            Ok(())
        })
    }

    /// Draw a rounded rectangle on the window canvas through the drawing framework.
    pub fn draw_rect(&self, rect: Rect, radius: f32, paint: &Paint) -> Result<()> {
        if !self.is_alive() {
            return Err(self.inner.destroyed());
        }
        let mut canvas = self.inner.canvas.lock();
        self.inner.drawing.draw_rect(&mut canvas, rect, radius, paint)
    }

    /// Fill the whole canvas with `color`.
    pub fn clear(&self, color: Color) {
        self.inner.canvas.lock().clear(color);
    }

    /// Inspect the window canvas.
    pub fn with_canvas<R>(&self, f: impl FnOnce(&Canvas) -> R) -> R {
        f(&self.inner.canvas.lock())
    }

    pub(crate) fn native_resized(&self, width: u32, height: u32) -> Result<()> {
        self.inner.resized(Size::new(width, height))
    }

    pub(crate) fn native_moved(&self, x: i32, y: i32) -> Result<()> {
        self.inner.moved(Pos::new(x, y))
    }

    /// Destroy the native window and release the object's identity.
    ///
    /// Only the first call has an effect; later calls, and the manager's
    /// shutdown cleanup, find the native slot empty.
    pub fn destroy(&self) {
        let Some(native) = self.inner.native.lock().take() else {
            return;
        };
        native.destroy();

        if let Some(windows) = self.inner.windows.upgrade() {
            windows.lock().retain(|window| !window.same_as(self));
        }
        self.inner.runtime.destroy(&self.inner.object);
        tracing::debug!("destroyed {}", self);
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Window {}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner.object, f)
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("object", &self.inner.object.to_string())
            .field("handle", &self.inner.handle)
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn upgrade(inner: &Weak<WindowInner>) -> Result<Arc<WindowInner>> {
    inner
        .upgrade()
        .ok_or_else(|| CharmyError::custom("window dropped"))
}

/// Read a `[a, b]` list of integers that fit in `T`.
fn pair<T: TryFrom<i64>>(value: &Value) -> Result<(T, T)> {
    let mismatch = || CharmyError::AttributeCoercion {
        expected: ValueKind::List,
        found: format!("{} {}", value.kind(), value),
    };

    match value.as_list() {
        Some([a, b]) => {
            let a = a.coerce(ValueKind::Int).map_err(|_| mismatch())?;
            let b = b.coerce(ValueKind::Int).map_err(|_| mismatch())?;
            let component = |v: Value| {
                v.as_int()
                    .and_then(|v| T::try_from(v).ok())
                    .ok_or_else(mismatch)
            };
            Ok((component(a)?, component(b)?))
        }
        _ => Err(mismatch()),
    }
}
