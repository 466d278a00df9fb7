//! Directory scanning for packed and loose plugin files.
//!
//! The walk visits a directory's files first (in `read_dir` order, which is
//! the filesystem's traversal order, not lexicographic), then recurses into
//! its subdirectories in the order they were encountered. That ordering is
//! load-bearing: discovery order decides which file wins when two declare
//! the same resource key.
//!
//! Missing or inaccessible directories contribute zero files. Entries that
//! cannot be stat'ed, vanished between listing and inspection, or have
//! non-UTF-8 names are skipped with a warning. None of this aborts a scan.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Results of one combined walk: `*.DAT` containers and loose `.SC4*` files.
#[derive(Debug, Default)]
pub struct DirectoryScan {
    pub dat_files: Vec<Utf8PathBuf>,
    pub sc4_files: Vec<Utf8PathBuf>,
}

/// Walk configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Scan only the root directory, ignoring subdirectories.
    pub top_directory_only: bool,
    /// Collect only `*.DAT` files, ignoring the loose `.SC4*` family.
    pub dat_files_only: bool,
}

/// Scans `root` according to `options`.
pub fn scan_directory(root: &Utf8Path, options: ScanOptions) -> io::Result<DirectoryScan> {
    let mut scan = DirectoryScan::default();
    scan_into(root, options, &mut scan);
    Ok(scan)
}

/// Top-level `*.DAT` files only (installation root and language folders).
pub fn dat_files_top_level(root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let options = ScanOptions {
        top_directory_only: true,
        dat_files_only: true,
    };
    Ok(scan_directory(root, options)?.dat_files)
}

/// `*.DAT` files in `root` and every subdirectory.
pub fn dat_files_recursive(root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let options = ScanOptions {
        dat_files_only: true,
        ..ScanOptions::default()
    };
    Ok(scan_directory(root, options)?.dat_files)
}

/// Loose `.SC4*` plugin files in `root` and every subdirectory.
pub fn loose_sc4_files_recursive(root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    Ok(scan_directory(root, ScanOptions::default())?.sc4_files)
}

/// Both file families from one recursive walk, for callers that feed two
/// aggregates over the same tree without scanning it twice.
pub fn dbpf_files_recursive(root: &Utf8Path) -> io::Result<DirectoryScan> {
    scan_directory(root, ScanOptions::default())
}

fn scan_into(root: &Utf8Path, options: ScanOptions, out: &mut DirectoryScan) {
    let entries = match root.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) => {
            // Missing and forbidden directories contribute zero files.
            tracing::debug!("skipping unreadable directory {root}: {error}");
            return;
        }
    };

    let mut subdirectories = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!("skipping unreadable entry under {root}: {error}");
                continue;
            }
        };

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                tracing::warn!("skipping {}: {error}", entry.path());
                continue;
            }
        };

        if file_type.is_dir() {
            if !options.top_directory_only {
                subdirectories.push(entry.into_path());
            }
            continue;
        }

        let name = entry.file_name();

        if matches_dat(name) {
            out.dat_files.push(entry.into_path());
        } else if !options.dat_files_only && matches_loose_sc4(name) {
            out.sc4_files.push(entry.into_path());
        }
    }

    // Files of a directory come before anything in its subdirectories.
    for subdirectory in subdirectories {
        scan_into(&subdirectory, options, out);
    }
}

/// Case-insensitive `.DAT` extension match.
fn matches_dat(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, extension)) => extension.eq_ignore_ascii_case("dat"),
        None => false,
    }
}

/// Case-insensitive `.SC4*` extension-prefix match (`.SC4`, `.SC4Desc`,
/// `.SC4Lot`, `.SC4Model`, ...).
///
/// A file with no extension is a tentative match: it is included here and
/// rejected downstream when it fails container-signature validation.
fn matches_loose_sc4(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, extension)) if !extension.is_empty() => extension
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sc4")),
        // Trailing dot or no extension at all.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn touch(path: &Utf8Path) {
        std::fs::write(path.as_std_path(), b"").unwrap();
    }

    fn names(paths: &[Utf8PathBuf]) -> HashSet<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string())
            .collect()
    }

    #[test]
    fn extension_predicates() {
        // Loose plugin scan: .SC4* prefix is case-insensitive, .DAT is
        // excluded, extensionless files match tentatively.
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        touch(&root.join("Foo.SC4Desc"));
        touch(&root.join("Bar.sc4lot"));
        touch(&root.join("Baz.dat"));
        touch(&root.join("Qux"));
        touch(&root.join("readme.txt"));

        let scan = dbpf_files_recursive(&root).unwrap();
        assert_eq!(
            names(&scan.sc4_files),
            HashSet::from(["Foo.SC4Desc".into(), "Bar.sc4lot".into(), "Qux".into()])
        );
        assert_eq!(names(&scan.dat_files), HashSet::from(["Baz.dat".into()]));
    }

    #[test]
    fn top_directory_only_ignores_subdirectories() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        touch(&root.join("root.DAT"));
        std::fs::create_dir(root.join("nested").as_std_path()).unwrap();
        touch(&root.join("nested").join("nested.dat"));

        let top = dat_files_top_level(&root).unwrap();
        assert_eq!(names(&top), HashSet::from(["root.DAT".into()]));

        let all = dat_files_recursive(&root).unwrap();
        assert_eq!(
            names(&all),
            HashSet::from(["root.DAT".into(), "nested.dat".into()])
        );
    }

    #[test]
    fn files_come_before_subdirectory_files() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        touch(&root.join("top.dat"));
        std::fs::create_dir(root.join("sub").as_std_path()).unwrap();
        touch(&root.join("sub").join("deep.dat"));

        let files = dat_files_recursive(&root).unwrap();
        let position = |name: &str| {
            files
                .iter()
                .position(|p| p.file_name() == Some(name))
                .unwrap()
        };
        assert!(position("top.dat") < position("deep.dat"));
    }

    #[test]
    fn missing_directory_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir).join("does_not_exist");

        let scan = dbpf_files_recursive(&root).unwrap();
        assert!(scan.dat_files.is_empty());
        assert!(scan.sc4_files.is_empty());
    }

    #[test]
    fn hidden_style_names_are_not_loose_matches() {
        // ".hidden" parses as an extension of "hidden", which does not
        // start with sc4.
        assert!(!matches_loose_sc4(".hidden"));
        assert!(matches_loose_sc4("Qux"));
        assert!(matches_loose_sc4("trailing."));
        assert!(matches_loose_sc4("a.SC4"));
        assert!(!matches_loose_sc4("archive.zip"));
        assert!(!matches_loose_sc4("plugin.dat"));
    }
}
