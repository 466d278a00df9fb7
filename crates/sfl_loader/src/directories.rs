//! The well-known directory roles fed to the orchestrator.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// The five roots the game loads resources from, in load order.
///
/// Each is an opaque path supplied by the host's application-info
/// collaborator; none is validated here — a missing directory simply
/// contributes zero files during scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GameDirectories {
    /// Installation root, home of the `SimCity_*.dat` stock containers.
    pub install_root: Utf8PathBuf,
    /// Language subfolder of the installation, chosen by the language setting.
    pub language_dir: Utf8PathBuf,
    /// SKU-specific data subfolder of the installation.
    pub sku_data_dir: Utf8PathBuf,
    /// Plugins folder inside the installation.
    pub install_plugins_dir: Utf8PathBuf,
    /// Per-user plugins folder (under the user's documents directory).
    pub user_plugins_dir: Utf8PathBuf,
}
