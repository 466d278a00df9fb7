//! Pluggable discovery policies for the aggregate segment.

use crate::enumerator;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Decides which files under a root become child segments, and in what
/// order. Injected into [`MultiPackedFile`](crate::MultiPackedFile) at
/// construction so the aggregate stays file-type agnostic.
pub trait ScanStrategy: Send + Sync {
    /// Returns the ordered candidate list for `root`. The order is
    /// discovery order and therefore override priority.
    fn discover(&self, root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>>;
}

/// Discovers `*.DAT` containers.
#[derive(Debug, Clone, Copy)]
pub struct DatFileScan {
    /// Restrict the walk to the root directory itself.
    pub top_directory_only: bool,
}

impl ScanStrategy for DatFileScan {
    fn discover(&self, root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
        if self.top_directory_only {
            enumerator::dat_files_top_level(root)
        } else {
            enumerator::dat_files_recursive(root)
        }
    }
}

/// Discovers the loose `.SC4*` plugin family, recursively. Extensionless
/// files are tentative matches, weeded out downstream by container-signature
/// validation.
#[derive(Debug, Clone, Copy)]
pub struct LooseSc4FileScan;

impl ScanStrategy for LooseSc4FileScan {
    fn discover(&self, root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
        enumerator::loose_sc4_files_recursive(root)
    }
}
