use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use charmy_core::framework::{NativeHandle, NativeWindow};
use charmy_core::geometry::{Pos, Size};
use charmy_core::{CharmyError, Result};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::window::Window;

use super::app::WindowTable;

/// A winit window plus the close flag the event handler raises.
pub struct WinitWindow {
    window: Window,
    handle: NativeHandle,
    close_requested: Arc<AtomicBool>,
    table: WindowTable,
}

impl WinitWindow {
    pub(crate) fn new(
        window: Window,
        close_requested: Arc<AtomicBool>,
        table: WindowTable,
    ) -> Self {
        let handle = NativeHandle(u64::from(window.id()));
        Self {
            window,
            handle,
            close_requested,
            table,
        }
    }

    /// The underlying winit window.
    pub fn winit(&self) -> &Window {
        &self.window
    }
}

impl NativeWindow for WinitWindow {
    fn handle(&self) -> NativeHandle {
        self.handle
    }

    fn size(&self) -> Result<Size<u32>> {
        let size = self.window.inner_size();
        Ok(Size::new(size.width, size.height))
    }

    fn set_size(&self, size: Size<u32>) -> Result<()> {
        // The platform may apply the size later and report it through a resize event.
        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(size.width, size.height));
        Ok(())
    }

    fn position(&self) -> Result<Pos<i32>> {
        let position = self.window.outer_position().map_err(|e| CharmyError::Native {
            code: -1,
            message: e.to_string(),
        })?;
        Ok(Pos::new(position.x, position.y))
    }

    fn set_position(&self, position: Pos<i32>) -> Result<()> {
        self.window
            .set_outer_position(PhysicalPosition::new(position.x, position.y));
        Ok(())
    }

    fn should_close(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    fn set_should_close(&self, value: bool) {
        self.close_requested.store(value, Ordering::Release);
    }

    fn request_redraw(&self) {
        self.window.request_redraw();
    }

    fn destroy(self: Box<Self>) {
        self.table.lock().remove(&self.window.id());
        tracing::debug!("destroying winit window {}", self.handle);
        // Dropping the winit window closes it.
    }
}
