//! Recording frameworks for tests and headless runs.
//!
//! Every call is appended to a shared [`StubLog`] so tests can verify what
//! the runtime asked the native side to do, without opening real windows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use charmy_core::canvas::{Canvas, Paint};
use charmy_core::framework::{
    BackendFramework, DrawingFramework, NativeEventSink, NativeHandle, NativeWindow,
    NativeWindowDescriptor, UiFramework, UiSettings,
};
use charmy_core::geometry::{Pos, Rect, Size};
use charmy_core::{CharmyError, Result};
use parking_lot::Mutex;

use super::STUB;

/// One recorded framework call.
#[derive(Debug, Clone, PartialEq)]
pub enum StubCall {
    Init { samples: u32, vsync: bool },
    CreateWindow { handle: NativeHandle, title: String, size: Size<u32> },
    WaitEvents { timeout: Option<Duration> },
    SwapInterval(u32),
    Terminate,
    SetSize { handle: NativeHandle, size: Size<u32> },
    SetPosition { handle: NativeHandle, position: Pos<i32> },
    SetShouldClose { handle: NativeHandle, value: bool },
    RequestRedraw { handle: NativeHandle },
    Destroy { handle: NativeHandle },
    DrawRect { rect: Rect, radius: f32 },
    BackendInit { ui_framework: String, samples: u32 },
}

#[derive(Default)]
struct LogState {
    calls: Vec<StubCall>,
    sink: Option<NativeEventSink>,
    fail_create: bool,
}

/// Shared call log. Cloning is cheap; clones observe the same calls.
#[derive(Clone, Default)]
pub struct StubLog {
    state: Arc<Mutex<LogState>>,
}

impl StubLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: StubCall) {
        tracing::trace!("stub call: {:?}", call);
        self.state.lock().calls.push(call);
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, mut predicate: impl FnMut(&StubCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|c| matches!(c, StubCall::CreateWindow { .. }))
    }

    /// Number of native destroys, for every handle.
    pub fn destroyed(&self) -> usize {
        self.count(|c| matches!(c, StubCall::Destroy { .. }))
    }

    /// Number of native destroys of `handle`.
    pub fn destroyed_handle(&self, handle: NativeHandle) -> usize {
        self.count(|c| *c == StubCall::Destroy { handle })
    }

    pub fn terminated(&self) -> usize {
        self.count(|c| *c == StubCall::Terminate)
    }

    pub fn waits(&self) -> usize {
        self.count(|c| matches!(c, StubCall::WaitEvents { .. }))
    }

    pub fn redraws(&self, handle: NativeHandle) -> usize {
        self.count(|c| *c == StubCall::RequestRedraw { handle })
    }

    pub fn swap_intervals(&self) -> Vec<u32> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                StubCall::SwapInterval(interval) => Some(*interval),
                _ => None,
            })
            .collect()
    }

    /// The event sink handed to the stub UI at init, to inject native events.
    pub fn sink(&self) -> Option<NativeEventSink> {
        self.state.lock().sink.clone()
    }

    /// Make the next window creations fail with a native error.
    pub fn fail_window_creation(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }

    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }
}

impl std::fmt::Debug for StubLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubLog")
            .field("calls", &self.state.lock().calls.len())
            .finish()
    }
}

/// UI framework that opens no windows.
pub struct StubUi {
    log: StubLog,
    next_handle: AtomicU64,
}

impl StubUi {
    pub fn new(log: StubLog) -> Self {
        Self {
            log,
            next_handle: AtomicU64::new(1),
        }
    }
}

impl UiFramework for StubUi {
    fn name(&self) -> &str {
        STUB
    }

    fn init(&mut self, settings: &UiSettings, events: NativeEventSink) -> Result<()> {
        self.log.state.lock().sink = Some(events);
        self.log.record(StubCall::Init {
            samples: settings.samples,
            vsync: settings.vsync,
        });
        Ok(())
    }

    fn create_window(
        &mut self,
        descriptor: &NativeWindowDescriptor,
    ) -> Result<Box<dyn NativeWindow>> {
        if self.log.state.lock().fail_create {
            return Err(CharmyError::Native {
                code: 65543,
                message: "Can't create window".to_string(),
            });
        }

        let handle = NativeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.log.record(StubCall::CreateWindow {
            handle,
            title: descriptor.title.clone(),
            size: descriptor.size,
        });

        Ok(Box::new(StubWindow {
            handle,
            log: self.log.clone(),
            size: Mutex::new(descriptor.size),
            position: Mutex::new(Pos::default()),
            should_close: AtomicBool::new(false),
        }))
    }

    /// Sleeps for `timeout`, standing in for a native wait with no events.
    /// Without a timeout nothing could wake it, so it returns at once.
    fn wait_events(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.log.record(StubCall::WaitEvents { timeout });
        if let Some(timeout) = timeout {
            std::thread::sleep(timeout);
        }
        Ok(())
    }

    fn set_swap_interval(&mut self, interval: u32) {
        self.log.record(StubCall::SwapInterval(interval));
    }

    fn terminate(&mut self) {
        self.log.record(StubCall::Terminate);
    }
}

/// A window that only exists in the log.
pub struct StubWindow {
    handle: NativeHandle,
    log: StubLog,
    size: Mutex<Size<u32>>,
    position: Mutex<Pos<i32>>,
    should_close: AtomicBool,
}

impl NativeWindow for StubWindow {
    fn handle(&self) -> NativeHandle {
        self.handle
    }

    fn size(&self) -> Result<Size<u32>> {
        Ok(*self.size.lock())
    }

    fn set_size(&self, size: Size<u32>) -> Result<()> {
        *self.size.lock() = size;
        self.log.record(StubCall::SetSize {
            handle: self.handle,
            size,
        });
        Ok(())
    }

    fn position(&self) -> Result<Pos<i32>> {
        Ok(*self.position.lock())
    }

    fn set_position(&self, position: Pos<i32>) -> Result<()> {
        *self.position.lock() = position;
        self.log.record(StubCall::SetPosition {
            handle: self.handle,
            position,
        });
        Ok(())
    }

    fn should_close(&self) -> bool {
        self.should_close.load(Ordering::Acquire)
    }

    fn set_should_close(&self, value: bool) {
        self.should_close.store(value, Ordering::Release);
        self.log.record(StubCall::SetShouldClose {
            handle: self.handle,
            value,
        });
    }

    fn request_redraw(&self) {
        self.log.record(StubCall::RequestRedraw {
            handle: self.handle,
        });
    }

    fn destroy(self: Box<Self>) {
        self.log.record(StubCall::Destroy {
            handle: self.handle,
        });
    }
}

/// Drawing framework that records rectangles without painting.
pub struct StubDrawing {
    log: StubLog,
}

impl StubDrawing {
    pub fn new(log: StubLog) -> Self {
        Self { log }
    }
}

impl DrawingFramework for StubDrawing {
    fn name(&self) -> &str {
        STUB
    }

    fn draw_rect(&self, _canvas: &mut Canvas, rect: Rect, radius: f32, _paint: &Paint) -> Result<()> {
        self.log.record(StubCall::DrawRect { rect, radius });
        Ok(())
    }
}

pub struct StubBackend {
    log: StubLog,
}

impl StubBackend {
    pub fn new(log: StubLog) -> Self {
        Self { log }
    }
}

impl BackendFramework for StubBackend {
    fn name(&self) -> &str {
        STUB
    }

    fn init(&mut self, ui_framework: &str, settings: &UiSettings) -> Result<()> {
        self.log.record(StubCall::BackendInit {
            ui_framework: ui_framework.to_string(),
            samples: settings.samples,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_get_distinct_handles() {
        let log = StubLog::new();
        let mut ui = StubUi::new(log.clone());
        ui.init(&UiSettings::default(), NativeEventSink::new()).unwrap();

        let a = ui.create_window(&NativeWindowDescriptor::default()).unwrap();
        let b = ui.create_window(&NativeWindowDescriptor::default()).unwrap();
        assert_ne!(a.handle(), b.handle());

        let handle = a.handle();
        a.destroy();
        assert_eq!(log.destroyed_handle(handle), 1);
        assert_eq!(log.created(), 2);
    }

    #[test]
    fn test_failed_creation_is_native_error() {
        let log = StubLog::new();
        log.fail_window_creation(true);
        let mut ui = StubUi::new(log.clone());

        let err = ui
            .create_window(&NativeWindowDescriptor::default())
            .err()
            .unwrap();
        assert!(matches!(err, CharmyError::Native { code: 65543, .. }));
        assert_eq!(log.created(), 0);
    }
}
