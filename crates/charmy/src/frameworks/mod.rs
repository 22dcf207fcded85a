//! Built-in frameworks and the default registry.
//!
//! | Kind | Names |
//! |---|---|
//! | UI | `WINIT` (feature `winit`), `STUB` |
//! | drawing | `SOFTWARE`, `STUB` |
//! | backend | `NONE`, `STUB` |

mod software;
pub mod stub;

use std::sync::Arc;

use charmy_core::framework::{
    BackendFramework, DrawingFramework, FrameworkRegistry, UiFramework, UiSettings,
};
use charmy_core::Result;

pub use software::SoftwareDrawing;
pub use stub::{StubBackend, StubCall, StubDrawing, StubLog, StubUi, StubWindow};

pub const STUB: &str = "STUB";
pub const SOFTWARE: &str = "SOFTWARE";
pub const NONE: &str = "NONE";

#[cfg(feature = "winit")]
pub const WINIT: &str = charmy_winit::NAME;

/// UI framework picked when none is configured.
#[cfg(feature = "winit")]
pub const DEFAULT_UI: &str = if charmy_winit::SUPPORTED { WINIT } else { STUB };
#[cfg(not(feature = "winit"))]
pub const DEFAULT_UI: &str = STUB;

/// A backend that needs no setup, for drawing frameworks that paint on the CPU.
#[derive(Debug, Default)]
pub struct NoneBackend;

impl BackendFramework for NoneBackend {
    fn name(&self) -> &str {
        NONE
    }

    fn init(&mut self, ui_framework: &str, settings: &UiSettings) -> Result<()> {
        tracing::debug!(
            "no backend context for {} ({} samples requested)",
            ui_framework,
            settings.samples
        );
        Ok(())
    }
}

/// Registry holding every built-in framework.
///
/// The `STUB` entries record into a log nobody holds; use
/// [`register_stubs`] to observe the calls.
pub fn builtin_registry() -> FrameworkRegistry {
    let mut registry = FrameworkRegistry::new();

    #[cfg(feature = "winit")]
    charmy_winit::register(&mut registry);

    registry
        .register_drawing(SOFTWARE, || {
            Ok(Arc::new(SoftwareDrawing) as Arc<dyn DrawingFramework>)
        })
        .register_backend(NONE, || Ok(Box::new(NoneBackend) as Box<dyn BackendFramework>));

    register_stubs(&mut registry, StubLog::new());
    registry
}

/// (Re)register the `STUB` frameworks so they record into `log`.
pub fn register_stubs(registry: &mut FrameworkRegistry, log: StubLog) {
    let ui_log = log.clone();
    let drawing_log = log.clone();
    registry
        .register_ui(STUB, move || {
            Ok(Box::new(StubUi::new(ui_log.clone())) as Box<dyn UiFramework>)
        })
        .register_drawing(STUB, move || {
            Ok(Arc::new(StubDrawing::new(drawing_log.clone())) as Arc<dyn DrawingFramework>)
        })
        .register_backend(STUB, move || {
            Ok(Box::new(StubBackend::new(log.clone())) as Box<dyn BackendFramework>)
        });
}
