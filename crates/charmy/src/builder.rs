//! Declarative manager setup.

use std::time::Duration;

use charmy_core::framework::FrameworkRegistry;
use charmy_core::identity::IdSpec;
use charmy_core::{Result, Runtime};

use crate::config::ManagerConfig;
use crate::frameworks::{self, StubLog};
use crate::manager::Manager;

/// Builder for a [`Manager`].
///
/// # Example
///
/// ```no_run
/// use charmy::prelude::*;
///
/// let manager = ManagerBuilder::new()
///     .with_vsync(false)
///     .with_samples(8)
///     .build()
///     .unwrap();
///
/// let window = Window::new(&manager, WindowDescriptor::new().with_size(300, 160)).unwrap();
/// manager.mainloop().unwrap();
/// ```
pub struct ManagerBuilder {
    config: ManagerConfig,
    registry: Option<FrameworkRegistry>,
    runtime: Option<Runtime>,
    stub_log: Option<StubLog>,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerBuilder {
    /// Defaults: vsync on, 4 samples, frameworks from the environment.
    pub fn new() -> Self {
        Self::from_config(ManagerConfig::from_env())
    }

    pub fn from_config(config: ManagerConfig) -> Self {
        Self {
            config,
            registry: None,
            runtime: None,
            stub_log: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<IdSpec>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.config.vsync = vsync;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.config.samples = samples;
        self
    }

    /// Bound each native wait; `None` waits for the next event.
    pub fn with_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.poll_timeout = timeout;
        self
    }

    pub fn with_ui_framework(mut self, name: &str) -> Self {
        self.config.frameworks.ui = name.trim().to_ascii_uppercase();
        self
    }

    pub fn with_drawing_framework(mut self, name: &str) -> Self {
        self.config.frameworks.drawing = name.trim().to_ascii_uppercase();
        self
    }

    pub fn with_backend_framework(mut self, name: &str) -> Self {
        self.config.frameworks.backend = name.trim().to_ascii_uppercase();
        self
    }

    /// Resolve frameworks from `registry` instead of the built-in one.
    pub fn with_registry(mut self, registry: FrameworkRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Share an existing runtime (and its registry of objects).
    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Run headless: the `STUB` UI and backend frameworks, recording into `log`.
    ///
    /// The drawing framework keeps its selection; pick `STUB` to record draws too.
    pub fn headless(mut self, log: StubLog) -> Self {
        self.config.frameworks.ui = frameworks::STUB.to_string();
        self.config.frameworks.backend = frameworks::STUB.to_string();
        self.stub_log = Some(log);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn build(self) -> Result<Manager> {
        let mut registry = self.registry.unwrap_or_else(frameworks::builtin_registry);
        if let Some(log) = self.stub_log {
            frameworks::register_stubs(&mut registry, log);
        }
        Manager::with_registry(self.runtime.unwrap_or_default(), self.config, &registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_selects_stubs() {
        let builder = ManagerBuilder::from_config(ManagerConfig::default())
            .headless(StubLog::new())
            .with_drawing_framework("stub");

        let selection = &builder.config().frameworks;
        assert_eq!(selection.ui, "STUB");
        assert_eq!(selection.drawing, "STUB");
        assert_eq!(selection.backend, "STUB");
    }

    #[test]
    fn test_settings_reach_the_manager() {
        let manager = ManagerBuilder::from_config(ManagerConfig::default())
            .headless(StubLog::new())
            .with_id("main")
            .with_vsync(false)
            .with_samples(2)
            .build()
            .unwrap();

        assert_eq!(manager.object().id(), Some("main"));
        assert!(!manager.is_vsync());
        assert_eq!(manager.samples(), 2);
    }

    #[test]
    fn test_unrepresentable_samples_fall_back_to_config() {
        let manager = ManagerBuilder::from_config(ManagerConfig::default())
            .headless(StubLog::new())
            .with_samples(8)
            .build()
            .unwrap();

        manager.object().set("ui.samples", -1).unwrap();
        assert_eq!(manager.samples(), 8);
        manager.object().set("ui.samples", 1i64 << 40).unwrap();
        assert_eq!(manager.samples(), 8);
        manager.object().set("ui.samples", 16).unwrap();
        assert_eq!(manager.samples(), 16);
    }

    #[test]
    fn test_dropping_the_manager_releases_its_identity() {
        let runtime = Runtime::new();
        let manager = ManagerBuilder::from_config(ManagerConfig::default())
            .headless(StubLog::new())
            .with_runtime(runtime.clone())
            .build()
            .unwrap();
        assert!(runtime.lookup("manager0").is_some());

        drop(manager);
        assert!(runtime.lookup("manager0").is_none());

        let again = ManagerBuilder::from_config(ManagerConfig::default())
            .headless(StubLog::new())
            .with_runtime(runtime.clone())
            .build()
            .unwrap();
        assert_eq!(again.object().id(), Some("manager0"));
    }
}
