//! Wires the loader into a game host.

use crate::extension::{GameHost, SetupResourcesFn};
use sfl_loader::{LoaderConfig, ResourceLoader, SegmentRegistry, TraceOption};
use std::sync::Arc;

/// The only game build the replacement loader has been verified against.
/// Other builds keep their stock loading path untouched.
pub const SUPPORTED_GAME_VERSION: u16 = 641;

/// Command-line switch selecting startup load tracing.
const TRACE_SWITCH: &str = "StartupDBPFLoadTrace";

/// Owns the segment registry and installs the loading override.
pub struct FastLoadDirector {
    registry: Arc<SegmentRegistry>,
}

impl Default for FastLoadDirector {
    fn default() -> Self {
        Self::new()
    }
}

impl FastLoadDirector {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SegmentRegistry::new()),
        }
    }

    /// The registry the override fills. The shim hands this to the rest of
    /// the game's resource machinery.
    pub fn registry(&self) -> &Arc<SegmentRegistry> {
        &self.registry
    }

    /// Verifies the game version, builds the loader configuration from the
    /// host command line, and installs the `SetupResources` override.
    ///
    /// Returns whether the override was installed. A version mismatch or a
    /// host without the extension point leaves the game untouched.
    pub fn attach(&self, host: &mut dyn GameHost) -> bool {
        let version = host.game_version();

        if version != SUPPORTED_GAME_VERSION {
            tracing::error!(
                "Unable to install the resource loading override. Requires game \
                 version {SUPPORTED_GAME_VERSION}, found game version {version}."
            );
            return false;
        }

        let trace = host
            .command_line_switch(TRACE_SWITCH)
            .map(|value| TraceOption::parse_switch(&value))
            .unwrap_or_default();

        let config = LoaderConfig {
            trace,
            ..LoaderConfig::default()
        };

        let directories = host.game_directories();
        let registry = Arc::clone(&self.registry);
        let loader = ResourceLoader::new(config);

        let replacement: SetupResourcesFn =
            Box::new(move || loader.setup_resources(&directories, &registry));

        match host.install_setup_resources_override(replacement) {
            Ok(()) => {
                tracing::info!("Installed the SetupResources override.");
                true
            }
            Err(error) => {
                tracing::error!("Failed to install the SetupResources override: {error}");
                false
            }
        }
    }
}
