//! Log-file setup for the patch layer.

use camino::Utf8Path;
use std::fs::File;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Written next to the plugin inside the game's plugins directory.
pub const LOG_FILE_NAME: &str = "SC4FastLoad.log";

/// Initializes the global subscriber writing to `<plugin_dir>/SC4FastLoad.log`.
///
/// The level defaults to `info` and can be overridden through `RUST_LOG`.
/// Call once from the hosting shim before [`attach`](crate::FastLoadDirector::attach);
/// a second call fails because the global subscriber is already set.
pub fn init_file_logging(plugin_dir: &Utf8Path) -> io::Result<()> {
    let path = plugin_dir.join(LOG_FILE_NAME);
    let file = File::create(path.as_std_path())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!("SC4 FastLoad v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
