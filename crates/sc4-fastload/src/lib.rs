//! Runtime replacement for the SimCity 4 DBPF resource-loading pipeline.
//!
//! The game process exposes a handful of extension points through its
//! hosting shim; this crate plugs a faster, behaviorally identical
//! resource-loading implementation into the `SetupResources` point. The
//! actual binary patching lives in the shim behind the [`GameHost`] trait —
//! nothing here touches process memory.
//!
//! Attach flow:
//!
//! 1. the shim initializes logging with [`init_file_logging`]
//! 2. [`FastLoadDirector::attach`] checks the game version, reads the
//!    `StartupDBPFLoadTrace` switch, and installs the override
//! 3. the game later invokes the override in place of its own scan; the
//!    orchestrator in [`sfl_loader`] fills the director's segment registry

pub mod director;
pub mod extension;
pub mod logging;

pub use director::{FastLoadDirector, SUPPORTED_GAME_VERSION};
pub use extension::{GameHost, HookError, SetupResourcesFn};
pub use logging::{init_file_logging, LOG_FILE_NAME};
