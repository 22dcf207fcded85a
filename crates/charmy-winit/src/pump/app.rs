use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use charmy_core::alloc::HashMap;
use charmy_core::framework::{
    NativeEventSink, NativeHandle, NativeWindow, NativeWindowDescriptor, UiFramework, UiSettings,
};
use charmy_core::profiling::profile_function;
use charmy_core::{CharmyError, Result};
use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use super::window::WinitWindow;

/// Error code reported when winit itself fails.
const WINIT_ERROR: i32 = -1;

pub(crate) struct WindowEntry {
    handle: NativeHandle,
    close_requested: Arc<AtomicBool>,
}

/// Windows known to the event handler, shared with each [`WinitWindow`] so
/// destruction can deregister.
pub(crate) type WindowTable = Arc<Mutex<HashMap<WindowId, WindowEntry>>>;

/// Routes winit window events into the Charmy native event queue.
struct Handler {
    sink: NativeEventSink,
    windows: WindowTable,
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        tracing::trace!("winit resumed");
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some((handle, close_requested)) = self
            .windows
            .lock()
            .get(&window_id)
            .map(|entry| (entry.handle, entry.close_requested.clone()))
        else {
            return;
        };

        match event {
            WindowEvent::Resized(size) => self.sink.resized(handle, size.width, size.height),
            WindowEvent::Moved(position) => self.sink.moved(handle, position.x, position.y),
            WindowEvent::CloseRequested => {
                close_requested.store(true, Ordering::Release);
                self.sink.close_requested(handle);
            }
            WindowEvent::Destroyed => tracing::debug!("winit window {} destroyed", handle),
            _ => {}
        }
    }
}

/// The winit UI framework.
pub struct WinitFramework {
    event_loop: Option<EventLoop<()>>,
    handler: Option<Handler>,
    windows: WindowTable,
    swap_interval: Option<u32>,
}

impl WinitFramework {
    pub fn new() -> Self {
        Self {
            event_loop: None,
            handler: None,
            windows: WindowTable::default(),
            swap_interval: None,
        }
    }

    /// Last swap interval requested by the manager.
    pub fn swap_interval(&self) -> Option<u32> {
        self.swap_interval
    }

    fn event_loop(&self) -> Result<&EventLoop<()>> {
        self.event_loop.as_ref().ok_or_else(|| CharmyError::Native {
            code: WINIT_ERROR,
            message: "winit framework used before init".to_string(),
        })
    }
}

impl Default for WinitFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl UiFramework for WinitFramework {
    fn name(&self) -> &str {
        crate::NAME
    }

    fn init(&mut self, settings: &UiSettings, events: NativeEventSink) -> Result<()> {
        if self.event_loop.is_some() {
            return Ok(());
        }

        let event_loop = EventLoop::new().map_err(|e| CharmyError::Native {
            code: WINIT_ERROR,
            message: e.to_string(),
        })?;
        event_loop.set_control_flow(ControlFlow::Wait);

        tracing::debug!(
            "winit initialised (samples: {}, vsync: {})",
            settings.samples,
            settings.vsync
        );

        self.event_loop = Some(event_loop);
        self.handler = Some(Handler {
            sink: events,
            windows: self.windows.clone(),
        });
        Ok(())
    }

    fn create_window(
        &mut self,
        descriptor: &NativeWindowDescriptor,
    ) -> Result<Box<dyn NativeWindow>> {
        let attributes = Window::default_attributes()
            .with_title(descriptor.title.clone())
            .with_inner_size(PhysicalSize::new(descriptor.size.width, descriptor.size.height))
            .with_visible(descriptor.visible)
            .with_resizable(descriptor.resizable);

        // Windows are created outside the pumped callbacks, before the first wait.
        #[allow(deprecated)]
        let window = self
            .event_loop()?
            .create_window(attributes)
            .map_err(|e| CharmyError::Native {
                code: WINIT_ERROR,
                message: e.to_string(),
            })?;

        let close_requested = Arc::new(AtomicBool::new(false));
        let native = WinitWindow::new(window, close_requested.clone(), self.windows.clone());
        self.windows.lock().insert(
            native.winit().id(),
            WindowEntry {
                handle: native.handle(),
                close_requested,
            },
        );

        tracing::debug!("created winit window {} '{}'", native.handle(), descriptor.title);
        Ok(Box::new(native))
    }

    fn wait_events(&mut self, timeout: Option<Duration>) -> Result<()> {
        profile_function!();

        let (Some(event_loop), Some(handler)) = (self.event_loop.as_mut(), self.handler.as_mut())
        else {
            return Err(CharmyError::Native {
                code: WINIT_ERROR,
                message: "winit framework used before init".to_string(),
            });
        };

        if let PumpStatus::Exit(code) = event_loop.pump_app_events(timeout, handler) {
            handler.sink.error(code, "winit event loop exited");
        }
        Ok(())
    }

    fn set_swap_interval(&mut self, interval: u32) {
        if self.swap_interval != Some(interval) {
            tracing::trace!("swap interval set to {}", interval);
            self.swap_interval = Some(interval);
        }
    }

    fn terminate(&mut self) {
        let remaining = self.windows.lock().len();
        if remaining > 0 {
            tracing::warn!("terminating winit with {} live windows", remaining);
        }

        // Flush the destruction of dropped windows.
        if let (Some(event_loop), Some(handler)) = (self.event_loop.as_mut(), self.handler.as_mut()) {
            let _ = event_loop.pump_app_events(Some(Duration::ZERO), handler);
        }
        tracing::debug!("winit terminated");
    }
}
