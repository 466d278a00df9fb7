//! The seam between this crate and the game process.

use sfl_loader::GameDirectories;
use thiserror::Error;

/// Replacement implementation for the game's `SetupResources` operation.
/// Returns whether resource loading produced a usable segment universe; on
/// `false` the host falls back to its stock loading path.
pub type SetupResourcesFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Errors installing an override at a host extension point.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("extension point `{0}` is not exposed by this host")]
    MissingExtensionPoint(&'static str),

    #[error("extension point `{0}` already has an override installed")]
    AlreadyInstalled(&'static str),
}

/// What the hosting shim must provide.
///
/// The shim owns process detection and the actual interception mechanism;
/// this trait reduces it to named extension points and a few queries. All
/// paths cross this boundary as opaque strings — the shim decides where the
/// installation and user directories actually are.
pub trait GameHost {
    /// The detected game build number (e.g. 641).
    fn game_version(&self) -> u16;

    /// The well-known resource directories, in the host's layout.
    fn game_directories(&self) -> GameDirectories;

    /// Value of a command-line switch passed to the game, if present.
    fn command_line_switch(&self, name: &str) -> Option<String>;

    /// Installs `replacement` at the `SetupResources` extension point, to be
    /// invoked instead of the stock resource scan.
    fn install_setup_resources_override(
        &mut self,
        replacement: SetupResourcesFn,
    ) -> Result<(), HookError>;
}
