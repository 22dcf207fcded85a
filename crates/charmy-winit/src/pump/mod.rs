mod app;
mod window;

use charmy_core::framework::{FrameworkRegistry, UiFramework};

pub use app::WinitFramework;
pub use window::WinitWindow;

pub const SUPPORTED: bool = true;

pub(crate) fn register(registry: &mut FrameworkRegistry) {
    registry.register_ui(crate::NAME, || {
        Ok(Box::new(WinitFramework::new()) as Box<dyn UiFramework>)
    });
}
