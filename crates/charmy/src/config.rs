//! Manager configuration.

use std::time::Duration;

use charmy_core::framework::{FrameworkSelection, UiSettings};
use charmy_core::identity::IdSpec;

use crate::frameworks;

/// Default id of the manager object.
pub const MANAGER_ID: &str = "manager0";

/// Startup settings of a [`Manager`](crate::Manager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Id the manager object registers under.
    pub id: IdSpec,
    /// Frameworks to resolve from the registry.
    pub frameworks: FrameworkSelection,
    pub vsync: bool,
    /// Multisample count handed to the UI and backend frameworks.
    pub samples: u32,
    /// Upper bound of one native wait. `None` blocks until an event arrives.
    pub poll_timeout: Option<Duration>,
    /// Delay between idle iterations of the worker loop.
    pub worker_idle: Duration,
}

impl ManagerConfig {
    /// Default settings with frameworks read from the environment.
    pub fn from_env() -> Self {
        Self {
            frameworks: FrameworkSelection::from_env_or(default_selection()),
            ..Self::default()
        }
    }

    pub fn ui_settings(&self) -> UiSettings {
        UiSettings {
            samples: self.samples,
            vsync: self.vsync,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            id: IdSpec::Named(MANAGER_ID.to_string()),
            frameworks: default_selection(),
            vsync: true,
            samples: 4,
            poll_timeout: Some(Duration::from_millis(16)),
            worker_idle: Duration::from_millis(1),
        }
    }
}

/// The frameworks used when nothing else is configured.
///
/// winit when it is compiled in and supported, the recording stub otherwise.
pub fn default_selection() -> FrameworkSelection {
    FrameworkSelection::new(
        frameworks::DEFAULT_UI,
        frameworks::SOFTWARE,
        frameworks::NONE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert!(config.vsync);
        assert_eq!(config.samples, 4);
        assert_eq!(config.id, IdSpec::Named("manager0".into()));
        assert_eq!(config.frameworks.drawing, "SOFTWARE");
        assert_eq!(config.frameworks.backend, "NONE");
    }

    #[test]
    fn test_ui_settings_mirror_config() {
        let config = ManagerConfig {
            vsync: false,
            samples: 8,
            ..ManagerConfig::default()
        };
        assert_eq!(
            config.ui_settings(),
            UiSettings {
                samples: 8,
                vsync: false
            }
        );
    }
}
