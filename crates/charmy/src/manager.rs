//! The coordinator: owns the frameworks and the window set, and runs the
//! main loop.
//!
//! One tick of the loop:
//!
//! 1. quit when no window is left;
//! 2. handle close requests (`delete_window`, then destroy unless vetoed);
//! 3. wait for native events, route them to their windows, then run the
//!    work other threads posted through the [`Dispatcher`];
//! 4. `update` every visible, alive window;
//! 5. re-apply the swap interval from `ui.is_vsync`.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use charmy_core::framework::{
    BackendFramework, DrawingFramework, FrameworkRegistry, FrameworkSelection, NativeEvent,
    NativeEventSink, NativeHandle, NativeWindow, NativeWindowDescriptor, UiFramework,
};
use charmy_core::profiling::{self, profile_function, profile_scope};
use charmy_core::{payload, CharmyError, ObjectRef, Result, Runtime, Value};
use parking_lot::Mutex;

use crate::config::ManagerConfig;
use crate::dispatcher::Dispatcher;
use crate::window::Window;
use crate::worker::{WorkerHandle, WorkerLoop};

/// Type tag of the manager object.
pub const MANAGER_TYPE: &str = "Manager";

/// Manager attributes every window proxies.
pub const MANAGER_ATTRIBUTES: [&str; 5] = [
    "ui.framework.name",
    "drawing.framework.name",
    "backend.framework.name",
    "ui.is_vsync",
    "ui.samples",
];

pub(crate) type WindowList = Arc<Mutex<Vec<Window>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Stopped,
    Running,
    ShuttingDown,
}

/// Stops the main loop from anywhere: event handlers, worker jobs, other
/// threads. Checked once per tick, so the current tick completes.
#[derive(Clone, Debug)]
pub struct QuitHandle {
    alive: Arc<AtomicBool>,
    worker_alive: Arc<AtomicBool>,
}

impl QuitHandle {
    pub fn quit(&self) {
        self.alive.store(false, Ordering::Release);
        self.worker_alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn revive(&self) {
        self.alive.store(true, Ordering::Release);
    }
}

/// The process coordinator.
///
/// Lives on the main thread: it owns the UI framework, which is not
/// thread-safe. Other threads talk to it through [`QuitHandle`] and
/// [`Dispatcher`].
pub struct Manager {
    runtime: Runtime,
    object: ObjectRef,
    config: ManagerConfig,
    selection: FrameworkSelection,
    ui: RefCell<Box<dyn UiFramework>>,
    drawing: Arc<dyn DrawingFramework>,
    _backend: Box<dyn BackendFramework>,
    native_events: NativeEventSink,
    windows: WindowList,
    dispatcher: Dispatcher,
    worker: WorkerLoop,
    quit: QuitHandle,
    state: Cell<ManagerState>,
    ticks: Cell<u64>,
    cleanups: Cell<usize>,
}

impl Manager {
    /// Build a manager from `config` with the built-in frameworks.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::with_registry(Runtime::new(), config, &crate::frameworks::builtin_registry())
    }

    /// Build a manager resolving its frameworks from `registry`.
    pub fn with_registry(
        runtime: Runtime,
        config: ManagerConfig,
        registry: &FrameworkRegistry,
    ) -> Result<Self> {
        let frameworks = registry.resolve(&config.frameworks)?;
        let object = runtime.create(MANAGER_TYPE, config.id.clone())?;

        let ui_name = frameworks.ui.name().to_string();
        let result = object
            .config([
                ("ui.framework.name", Value::from(ui_name.as_str())),
                ("drawing.framework.name", Value::from(frameworks.drawing.name())),
                ("backend.framework.name", Value::from(frameworks.backend.name())),
                ("ui.is_vsync", Value::from(config.vsync)),
                ("ui.samples", Value::from(config.samples)),
            ])
            .and_then(|()| Self::init_frameworks(&config, frameworks, &ui_name));

        let (ui, drawing, backend, native_events) = match result {
            Ok(parts) => parts,
            Err(e) => {
                runtime.destroy(&object);
                return Err(e);
            }
        };

        let worker = WorkerLoop::new(config.worker_idle);
        let quit = QuitHandle {
            alive: Arc::new(AtomicBool::new(false)),
            worker_alive: worker.alive_flag(),
        };

        let manager = Self {
            runtime,
            object,
            selection: config.frameworks.clone(),
            config,
            ui: RefCell::new(ui),
            drawing,
            _backend: backend,
            native_events,
            windows: WindowList::default(),
            dispatcher: Dispatcher::new(),
            worker,
            quit,
            state: Cell::new(ManagerState::Stopped),
            ticks: Cell::new(0),
            cleanups: Cell::new(0),
        };
        manager.install_window_list();

        tracing::info!("{} ready ({})", manager.object, manager.selection);
        Ok(manager)
    }

    #[allow(clippy::type_complexity)]
    fn init_frameworks(
        config: &ManagerConfig,
        frameworks: charmy_core::framework::Frameworks,
        ui_name: &str,
    ) -> Result<(
        Box<dyn UiFramework>,
        Arc<dyn DrawingFramework>,
        Box<dyn BackendFramework>,
        NativeEventSink,
    )> {
        let settings = config.ui_settings();
        let native_events = NativeEventSink::new();

        let mut ui = frameworks.ui;
        ui.init(&settings, native_events.clone())?;

        let mut backend = frameworks.backend;
        if let Err(e) = backend.init(ui_name, &settings) {
            ui.terminate();
            return Err(e);
        }

        Ok((ui, frameworks.drawing, backend, native_events))
    }

    // `ui.windows` lists the managed windows' objects, read-only.
    fn install_window_list(&self) {
        let windows = Arc::downgrade(&self.windows);
        self.object.attributes().define_computed("ui.windows", move || {
            let Some(windows) = windows.upgrade() else {
                return Ok(Value::List(Vec::new()));
            };
            let objects = windows
                .lock()
                .iter()
                .map(|window| Value::Object(window.object().clone()))
                .collect();
            Ok(Value::List(objects))
        });
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn selection(&self) -> &FrameworkSelection {
        &self.selection
    }

    pub fn drawing(&self) -> &Arc<dyn DrawingFramework> {
        &self.drawing
    }

    pub fn state(&self) -> ManagerState {
        self.state.get()
    }

    pub fn is_alive(&self) -> bool {
        self.quit.is_alive()
    }

    /// Current `ui.is_vsync`, applied as swap interval every tick.
    pub fn is_vsync(&self) -> bool {
        self.object
            .get("ui.is_vsync", true)
            .is_ok_and(|value| value.truthy())
    }

    pub fn set_vsync(&self, vsync: bool) -> Result<()> {
        self.object.set("ui.is_vsync", vsync)
    }

    pub fn samples(&self) -> u32 {
        self.object
            .get("ui.samples", self.config.samples)
            .ok()
            .and_then(|value| value.as_int())
            .and_then(|samples| u32::try_from(samples).ok())
            .unwrap_or(self.config.samples)
    }

    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }

    /// Stop the main loop after the current tick.
    pub fn quit(&self) {
        self.quit.quit();
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn worker(&self) -> &WorkerLoop {
        &self.worker
    }

    /// A handle to post worker jobs from handlers and other threads.
    pub fn worker_handle(&self) -> WorkerHandle {
        self.worker.handle()
    }

    /// The queue native callbacks report into. Pushing here is equivalent to
    /// the UI framework reporting the event.
    pub fn native_events(&self) -> NativeEventSink {
        self.native_events.clone()
    }

    /// Completed main loop iterations, over every `mainloop` call.
    pub fn tick_count(&self) -> u64 {
        self.ticks.get()
    }

    /// How many times shutdown cleanup ran.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups.get()
    }

    pub(crate) fn create_native(
        &self,
        descriptor: &NativeWindowDescriptor,
    ) -> Result<Box<dyn NativeWindow>> {
        self.ui.borrow_mut().create_window(descriptor)
    }

    pub(crate) fn window_list(&self) -> Weak<Mutex<Vec<Window>>> {
        Arc::downgrade(&self.windows)
    }

    /// Add `window` to the managed set. Returns `false` if it was already there.
    pub fn add_window(&self, window: &Window) -> bool {
        let mut windows = self.windows.lock();
        if windows.iter().any(|w| w.same_as(window)) {
            return false;
        }
        windows.push(window.clone());
        true
    }

    /// Remove `window` from the managed set without destroying it.
    pub fn remove_window(&self, window: &Window) -> bool {
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|w| !w.same_as(window));
        windows.len() != before
    }

    pub fn find_window(&self, id: &str) -> Option<Window> {
        self.windows
            .lock()
            .iter()
            .find(|window| window.id() == Some(id))
            .cloned()
    }

    fn window_by_handle(&self, handle: NativeHandle) -> Option<Window> {
        self.windows
            .lock()
            .iter()
            .find(|window| window.handle() == handle)
            .cloned()
    }

    /// The managed windows, in insertion order.
    pub fn windows(&self) -> Vec<Window> {
        self.windows.lock().clone()
    }

    pub fn window_count(&self) -> usize {
        self.windows.lock().len()
    }

    /// Run until every window is closed, [`quit`](Self::quit) is called, or
    /// a tick fails.
    ///
    /// Cleanup (destroying the remaining native windows and terminating the
    /// UI framework) runs exactly once per call, on every exit path. An
    /// error from a tick is returned as [`CharmyError::LoopFailure`].
    pub fn mainloop(&self) -> Result<()> {
        if self.state.get() != ManagerState::Stopped {
            return Err(CharmyError::custom("the main loop is already running"));
        }

        if self.window_count() == 0 {
            tracing::warn!("At least one window is required to run the manager");
            self.state.set(ManagerState::ShuttingDown);
            self.cleanup();
            self.state.set(ManagerState::Stopped);
            return Ok(());
        }

        self.quit.revive();
        self.state.set(ManagerState::Running);

        let result = self.worker.start().and_then(|()| {
            tracing::info!("main loop started with {} windows", self.window_count());
            self.run()
        });

        self.quit.quit();
        self.state.set(ManagerState::ShuttingDown);
        self.worker.stop();
        self.cleanup();
        self.state.set(ManagerState::Stopped);

        match result {
            Ok(()) => {
                tracing::info!("main loop stopped after {} ticks", self.ticks.get());
                Ok(())
            }
            Err(e) => {
                tracing::error!("main loop failed: {}", e);
                Err(CharmyError::loop_failure(e))
            }
        }
    }

    fn run(&self) -> Result<()> {
        while self.quit.is_alive() {
            if !self.tick()? {
                break;
            }
        }
        Ok(())
    }

    /// One loop iteration. `Ok(false)` means there is nothing left to run.
    fn tick(&self) -> Result<bool> {
        profile_function!();

        if self.window_count() == 0 {
            tracing::debug!("no windows left");
            return Ok(false);
        }

        self.handle_close_requests()?;

        {
            profile_scope!("wait_events");
            self.ui
                .borrow_mut()
                .wait_events(self.config.poll_timeout)?;
        }
        for event in self.native_events.drain() {
            self.route_native(event)?;
        }
        self.dispatcher.drain()?;

        {
            profile_scope!("update");
            for window in self.windows() {
                if window.is_visible() && window.is_alive() {
                    window.update()?;
                }
            }
        }

        let interval = if self.is_vsync() { 1 } else { 0 };
        self.ui.borrow_mut().set_swap_interval(interval);

        self.ticks.set(self.ticks.get() + 1);
        profiling::new_frame();
        Ok(true)
    }

    fn handle_close_requests(&self) -> Result<()> {
        for window in self.windows() {
            if !window.should_close() {
                continue;
            }

            window.object().trigger("delete_window", payload! {})?;
            if window.is_closable() {
                self.remove_window(&window);
                window.destroy();
            } else {
                tracing::warn!("close of {} vetoed", window);
                window.cancel_close();
            }
        }
        Ok(())
    }

    fn route_native(&self, event: NativeEvent) -> Result<()> {
        match event {
            NativeEvent::Resized {
                handle,
                width,
                height,
            } => match self.window_by_handle(handle) {
                Some(window) => window.native_resized(width, height),
                None => {
                    tracing::warn!("resize for unknown window {}", handle);
                    Ok(())
                }
            },
            NativeEvent::Moved { handle, x, y } => match self.window_by_handle(handle) {
                Some(window) => window.native_moved(x, y),
                None => {
                    tracing::warn!("move for unknown window {}", handle);
                    Ok(())
                }
            },
            NativeEvent::CloseRequested { handle } => {
                match self.window_by_handle(handle) {
                    Some(window) => {
                        tracing::debug!("close requested for {}", window);
                        // Some frameworks only report the request; raise the flag for them.
                        window.request_close()?;
                    }
                    None => tracing::warn!("close request for unknown window {}", handle),
                }
                Ok(())
            }
            NativeEvent::Error { code, description } => Err(CharmyError::Native {
                code,
                message: description,
            }),
        }
    }

    fn cleanup(&self) {
        let windows = std::mem::take(&mut *self.windows.lock());
        let remaining = windows.len();
        for window in windows {
            window.destroy();
        }
        self.ui.borrow_mut().terminate();
        self.cleanups.set(self.cleanups.get() + 1);
        tracing::debug!("cleanup done, {} windows destroyed", remaining);
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.runtime.destroy(&self.object);
        tracing::trace!("released {}", self.object);
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("object", &self.object.to_string())
            .field("selection", &self.selection)
            .field("state", &self.state.get())
            .field("windows", &self.window_count())
            .finish()
    }
}
