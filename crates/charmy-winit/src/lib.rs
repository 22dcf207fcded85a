//! The `WINIT` UI framework: native windows and event polling through winit.
//!
//! winit's event loop is driven by pumping, so the Charmy manager keeps
//! control of its own tick. Pumping is only available on desktop platforms
//! and Android; elsewhere [`register`] adds nothing.

use charmy_core::framework::FrameworkRegistry;

#[cfg(any(
    windows,
    target_os = "macos",
    target_os = "android",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
mod pump;

#[cfg(not(any(
    windows,
    target_os = "macos",
    target_os = "android",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
mod pump {
    pub const SUPPORTED: bool = false;

    pub(crate) fn register(_registry: &mut charmy_core::framework::FrameworkRegistry) {
        tracing::warn!("winit event pumping is not available on this platform");
    }
}

pub use pump::*;

/// Registry name of this framework.
pub const NAME: &str = "WINIT";

/// Add the `WINIT` UI framework to `registry` when the platform supports it.
pub fn register(registry: &mut FrameworkRegistry) {
    pump::register(registry);
}
