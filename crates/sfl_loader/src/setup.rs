//! The loading orchestrator.

use crate::config::{LoaderConfig, ScanConcurrency, TraceOption};
use crate::directories::GameDirectories;
use crate::factories::DEFAULT_RESOURCE_FACTORIES;
use crate::registry::SegmentRegistry;
use camino::{Utf8Path, Utf8PathBuf};
use sfl_dbpf::PackedFile;
use sfl_multipack::{enumerator, DirectoryScan, MultiPackedFile};
use sfl_resource::{DbSegment, SegmentResult};
use std::sync::Arc;
use std::time::Instant;

/// Sequences resource discovery and registration.
///
/// The step order is fixed — it encodes the game's override priority and
/// must match the stock loader exactly (see the crate docs). Every per-file
/// and per-directory failure is absorbed locally; the only failure this
/// reports is ending up with an empty registry.
pub struct ResourceLoader {
    config: LoaderConfig,
}

impl ResourceLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Runs the full loading sequence against `registry`.
    ///
    /// Returns `true` iff at least one segment was registered. On `false`
    /// the host is expected to fall back to its stock loading path.
    pub fn setup_resources(
        &self,
        directories: &GameDirectories,
        registry: &SegmentRegistry,
    ) -> bool {
        let result = match self.config.trace {
            TraceOption::ShowLoadTime => {
                let started = Instant::now();
                let result = self.run(directories, registry);
                tracing::info!("Loaded resources in {} ms", started.elapsed().as_millis());
                result
            }
            _ => self.run(directories, registry),
        };

        if self.config.trace == TraceOption::ListLoadedFiles {
            Self::list_registered_segments(registry);
        }

        result
    }

    fn run(&self, directories: &GameDirectories, registry: &SegmentRegistry) -> bool {
        // The user-plugins walk may start early; its results are not
        // consumed until step 5, so registration order never changes.
        let background_scan = match self.config.scan_concurrency {
            ScanConcurrency::Background => {
                let root = directories.user_plugins_dir.clone();
                Some(std::thread::spawn(move || scan_plugins_tree(&root)))
            }
            ScanConcurrency::Sequential => None,
        };

        // 1. Installation root: top-level *.DAT only, one segment per file.
        Self::load_dat_plugins_from_directory(&directories.install_root, registry);

        // 2. Language folder: same.
        Self::load_dat_plugins_from_directory(&directories.language_dir, registry);

        // 3. SKU data: one recursive DAT aggregate.
        Self::add_dat_multi_packed(&directories.sku_data_dir, registry);

        // 4. Installation plugins: loose aggregate, then DAT aggregate.
        let install_scan = scan_plugins_tree(&directories.install_plugins_dir);
        Self::register_plugins_directory(
            &directories.install_plugins_dir,
            &install_scan,
            registry,
        );

        // 5. User plugins: same two-pass pattern.
        let user_scan = match background_scan {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                tracing::error!("user plugins scan worker panicked; rescanning synchronously");
                scan_plugins_tree(&directories.user_plugins_dir)
            }),
            None => scan_plugins_tree(&directories.user_plugins_dir),
        };
        Self::register_plugins_directory(&directories.user_plugins_dir, &user_scan, registry);

        // 6. The factory table always goes last.
        Self::setup_resource_factories(registry);

        registry.segment_count() > 0
    }

    /// Registers each top-level `*.DAT` file of `directory` as its own
    /// segment, in discovery order.
    fn load_dat_plugins_from_directory(directory: &Utf8Path, registry: &SegmentRegistry) {
        let files = match enumerator::dat_files_top_level(directory) {
            Ok(files) => files,
            Err(error) => {
                tracing::error!("scan of {directory} failed: {error}");
                return;
            }
        };

        for file in &files {
            if let Err(error) = Self::register_packed_file(file, registry) {
                tracing::error!("Failed to load: {file} ({error})");
            }
        }
    }

    fn register_packed_file(path: &Utf8Path, registry: &SegmentRegistry) -> SegmentResult<()> {
        let segment = PackedFile::new();
        segment.init();
        segment.set_path(path);
        segment.open(true, false)?;
        registry.register_db_segment(Arc::new(segment));
        Ok(())
    }

    /// Registers one recursive DAT aggregate over `directory`, discovering
    /// its own files.
    fn add_dat_multi_packed(directory: &Utf8Path, registry: &SegmentRegistry) {
        let multi = MultiPackedFile::for_dat_files();

        if multi.init() {
            multi.set_path(directory);

            match multi.open(true, false) {
                Ok(()) => {
                    registry.register_db_segment(Arc::new(multi));
                }
                Err(error) => {
                    tracing::debug!("no packed files registered for {directory}: {error}");
                    multi.shutdown();
                }
            }
        }
    }

    /// The plugins-directory pattern: the loose `.SC4*` aggregate always
    /// registers before the DAT aggregate over the same tree.
    fn register_plugins_directory(
        directory: &Utf8Path,
        scan: &DirectoryScan,
        registry: &SegmentRegistry,
    ) {
        Self::register_multi_packed(
            MultiPackedFile::for_loose_sc4_files(),
            directory,
            &scan.sc4_files,
            registry,
        );
        Self::register_multi_packed(
            MultiPackedFile::for_dat_files(),
            directory,
            &scan.dat_files,
            registry,
        );
    }

    /// Opens `multi` over a pre-scanned file list and registers it. An
    /// empty list registers nothing.
    fn register_multi_packed(
        multi: MultiPackedFile,
        folder: &Utf8Path,
        files: &[Utf8PathBuf],
        registry: &SegmentRegistry,
    ) {
        if files.is_empty() {
            return;
        }

        if multi.init() {
            multi.set_path(folder);

            match multi.open_with_files(files) {
                Ok(()) => {
                    registry.register_db_segment(Arc::new(multi));
                }
                Err(error) => {
                    tracing::debug!("no packed files registered for {folder}: {error}");
                    multi.shutdown();
                }
            }
        }
    }

    fn setup_resource_factories(registry: &SegmentRegistry) {
        for (type_id, instance_id) in DEFAULT_RESOURCE_FACTORIES {
            registry.register_object_factory(type_id, instance_id);
        }
    }

    /// Logs every registered segment path, oldest registration first.
    fn list_registered_segments(registry: &SegmentRegistry) {
        let count = registry.segment_count();
        tracing::info!("{count} segments");

        for index in (0..count).rev() {
            if let Some(segment) = registry.segment_by_index(index) {
                tracing::info!("{}", segment.path());
            }
        }
    }
}

fn scan_plugins_tree(root: &Utf8Path) -> DirectoryScan {
    match enumerator::dbpf_files_recursive(root) {
        Ok(scan) => scan,
        Err(error) => {
            tracing::error!("plugin scan of {root} failed: {error}");
            DirectoryScan::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfl_resource::ResourceKey;
    use tempfile::TempDir;

    fn key(n: u32) -> ResourceKey {
        ResourceKey::new(0x100, 0x200, n)
    }

    fn write_fixture(path: &Utf8Path, records: &[(ResourceKey, &[u8])]) {
        std::fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
        let segment = PackedFile::new();
        segment.init();
        segment.set_path(path);
        segment.open(true, true).unwrap();
        for (key, payload) in records {
            segment.write_record(*key, payload).unwrap();
        }
        segment.close().unwrap();
        segment.shutdown();
    }

    /// A full game tree covering every step of the loading sequence.
    ///
    /// Keys: 1 install root, 2 nested under install root (must be ignored),
    /// 3 language, 4 SKU, 5 loose install plugin, 6 packed install plugin,
    /// 7 shared between install and user plugins, 8 user plugins only.
    fn game_tree(root: &Utf8Path) -> GameDirectories {
        let directories = GameDirectories {
            install_root: root.join("install"),
            language_dir: root.join("install").join("English"),
            sku_data_dir: root.join("install").join("Sku_data"),
            install_plugins_dir: root.join("install").join("Plugins"),
            user_plugins_dir: root.join("user").join("Plugins"),
        };

        write_fixture(
            &directories.install_root.join("SimCity_1.dat"),
            &[(key(1), b"install-root")],
        );
        write_fixture(
            &directories.install_root.join("nested").join("extra.dat"),
            &[(key(2), b"nested")],
        );
        write_fixture(
            &directories.language_dir.join("Language.dat"),
            &[(key(3), b"language")],
        );
        write_fixture(
            &directories.sku_data_dir.join("sub").join("sku.dat"),
            &[(key(4), b"sku")],
        );
        write_fixture(
            &directories.install_plugins_dir.join("loose.SC4Desc"),
            &[(key(5), b"install-loose")],
        );
        write_fixture(
            &directories.install_plugins_dir.join("pack.dat"),
            &[(key(6), b"install-dat"), (key(7), b"install")],
        );
        write_fixture(
            &directories.user_plugins_dir.join("mods").join("user.dat"),
            &[(key(7), b"user"), (key(8), b"user-only")],
        );

        directories
    }

    fn read_via_registry(registry: &SegmentRegistry, key: ResourceKey) -> Vec<u8> {
        let segment = registry.find_segment(key).unwrap();
        let mut buffer = Vec::new();
        segment.read_record(key, &mut buffer).unwrap();
        buffer
    }

    /// Registered segment paths, oldest registration first.
    fn registration_order(registry: &SegmentRegistry) -> Vec<Utf8PathBuf> {
        (0..registry.segment_count())
            .rev()
            .map(|index| registry.segment_by_index(index).unwrap().path())
            .collect()
    }

    #[test]
    fn loads_every_directory_role_in_order() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let directories = game_tree(root);

        let registry = SegmentRegistry::new();
        let loader = ResourceLoader::new(LoaderConfig::default());
        assert!(loader.setup_resources(&directories, &registry));

        // root DAT, language DAT, SKU aggregate, install loose aggregate,
        // install DAT aggregate, user DAT aggregate.
        let order = registration_order(&registry);
        assert_eq!(
            order,
            vec![
                directories.install_root.join("SimCity_1.dat"),
                directories.language_dir.join("Language.dat"),
                directories.sku_data_dir.clone(),
                directories.install_plugins_dir.clone(),
                directories.install_plugins_dir.clone(),
                directories.user_plugins_dir.clone(),
            ]
        );

        // The nested file under the install root is not registered.
        assert!(registry.find_segment(key(2)).is_none());

        // Every other key resolves.
        assert_eq!(read_via_registry(&registry, key(1)), b"install-root");
        assert_eq!(read_via_registry(&registry, key(3)), b"language");
        assert_eq!(read_via_registry(&registry, key(4)), b"sku");
        assert_eq!(read_via_registry(&registry, key(5)), b"install-loose");
        assert_eq!(read_via_registry(&registry, key(6)), b"install-dat");
        assert_eq!(read_via_registry(&registry, key(8)), b"user-only");
    }

    #[test]
    fn user_plugins_shadow_install_plugins() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let directories = game_tree(root);

        let registry = SegmentRegistry::new();
        let loader = ResourceLoader::new(LoaderConfig::default());
        assert!(loader.setup_resources(&directories, &registry));

        // Key 7 exists in both plugin roots; the user copy wins.
        assert_eq!(read_via_registry(&registry, key(7)), b"user");
    }

    #[test]
    fn loose_aggregate_registers_before_dat_aggregate() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let directories = game_tree(root);

        let registry = SegmentRegistry::new();
        let loader = ResourceLoader::new(LoaderConfig::default());
        assert!(loader.setup_resources(&directories, &registry));

        // Higher reverse-order index == registered earlier.
        let index_of = |probe: ResourceKey| {
            (0..registry.segment_count())
                .find(|&index| {
                    registry
                        .segment_by_index(index)
                        .unwrap()
                        .test_for_record(probe)
                })
                .unwrap()
        };
        assert!(index_of(key(5)) > index_of(key(6)));
    }

    #[test]
    fn background_scan_changes_nothing_observable() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let directories = game_tree(root);

        let sequential = SegmentRegistry::new();
        ResourceLoader::new(LoaderConfig::default())
            .setup_resources(&directories, &sequential);

        let background = SegmentRegistry::new();
        ResourceLoader::new(LoaderConfig {
            scan_concurrency: ScanConcurrency::Background,
            ..LoaderConfig::default()
        })
        .setup_resources(&directories, &background);

        assert_eq!(
            registration_order(&sequential),
            registration_order(&background)
        );
        assert_eq!(read_via_registry(&background, key(7)), b"user");
    }

    #[test]
    fn missing_directories_mean_total_failure_not_a_crash() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let directories = GameDirectories {
            install_root: root.join("missing_install"),
            language_dir: root.join("missing_language"),
            sku_data_dir: root.join("missing_sku"),
            install_plugins_dir: root.join("missing_plugins"),
            user_plugins_dir: root.join("missing_user"),
        };

        let registry = SegmentRegistry::new();
        let loader = ResourceLoader::new(LoaderConfig::default());
        assert!(!loader.setup_resources(&directories, &registry));
        assert_eq!(registry.segment_count(), 0);

        // The factory table is registered regardless.
        assert_eq!(
            registry.object_factories().len(),
            DEFAULT_RESOURCE_FACTORIES.len()
        );
    }

    #[test]
    fn partial_trees_still_load() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        // Only a user plugins folder exists.
        let directories = GameDirectories {
            install_root: root.join("missing"),
            language_dir: root.join("missing"),
            sku_data_dir: root.join("missing"),
            install_plugins_dir: root.join("missing"),
            user_plugins_dir: root.join("user_plugins"),
        };
        write_fixture(
            &directories.user_plugins_dir.join("only.dat"),
            &[(key(1), b"only")],
        );

        let registry = SegmentRegistry::new();
        let loader = ResourceLoader::new(LoaderConfig::default());
        assert!(loader.setup_resources(&directories, &registry));
        assert_eq!(registry.segment_count(), 1);
        assert_eq!(read_via_registry(&registry, key(1)), b"only");
    }

    #[test]
    fn trace_options_do_not_change_results() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let directories = game_tree(root);

        for trace in [TraceOption::ShowLoadTime, TraceOption::ListLoadedFiles] {
            let registry = SegmentRegistry::new();
            let loader = ResourceLoader::new(LoaderConfig {
                trace,
                ..LoaderConfig::default()
            });
            assert!(loader.setup_resources(&directories, &registry));
            assert_eq!(read_via_registry(&registry, key(7)), b"user");
        }
    }
}
