//! The process-wide registry of opened segments.

use parking_lot::RwLock;
use sfl_resource::{DbSegment, ResourceKey};
use std::sync::Arc;

/// One entry of the resource-factory table: a (type, instance) pair
/// registered with no factory object attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryRegistration {
    pub type_id: u32,
    pub instance_id: u32,
}

#[derive(Default)]
struct RegistryState {
    /// Segments in registration order; later registrations override earlier
    /// ones when resolving keys.
    segments: Vec<Arc<dyn DbSegment>>,
    factories: Vec<FactoryRegistration>,
}

/// The host's global registry of opened segments.
///
/// Registration order encodes override priority. By the registry's own
/// convention, [`segment_by_index`](Self::segment_by_index) enumerates in
/// *reverse* of registration order — index 0 is the most recently
/// registered segment — and key resolution probes in that same order, so
/// the last registered segment that holds a key wins.
#[derive(Default)]
pub struct SegmentRegistry {
    state: RwLock<RegistryState>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an opened segment. Returns whether it was accepted; a
    /// segment that is not open is refused.
    pub fn register_db_segment(&self, segment: Arc<dyn DbSegment>) -> bool {
        if !segment.is_open() {
            return false;
        }

        self.state.write().segments.push(segment);
        true
    }

    pub fn segment_count(&self) -> u32 {
        self.state.read().segments.len() as u32
    }

    /// Segment at `index` in reverse-of-registration order, or `None` when
    /// out of range.
    pub fn segment_by_index(&self, index: u32) -> Option<Arc<dyn DbSegment>> {
        let state = self.state.read();
        let position = state.segments.len().checked_sub(1 + index as usize)?;
        Some(Arc::clone(&state.segments[position]))
    }

    /// Resolves `key` across every registered segment, newest registration
    /// first.
    pub fn find_segment(&self, key: ResourceKey) -> Option<Arc<dyn DbSegment>> {
        let state = self.state.read();
        state
            .segments
            .iter()
            .rev()
            .find(|segment| segment.test_for_record(key))
            .map(Arc::clone)
    }

    /// Records a factory-table entry. The table is append-only; duplicates
    /// are the host's concern, not the registry's.
    pub fn register_object_factory(&self, type_id: u32, instance_id: u32) -> bool {
        self.state.write().factories.push(FactoryRegistration {
            type_id,
            instance_id,
        });
        true
    }

    pub fn object_factories(&self) -> Vec<FactoryRegistration> {
        self.state.read().factories.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use sfl_dbpf::PackedFile;
    use sfl_resource::DbSegment;
    use tempfile::TempDir;

    fn key(n: u32) -> ResourceKey {
        ResourceKey::new(n, 0, n)
    }

    fn fixture_segment(dir: &TempDir, name: &str, keys: &[ResourceKey]) -> Arc<PackedFile> {
        let path = Utf8Path::from_path(dir.path()).unwrap().join(name);
        let writer = PackedFile::new();
        writer.init();
        writer.set_path(&path);
        writer.open(true, true).unwrap();
        for k in keys {
            writer.write_record(*k, name.as_bytes()).unwrap();
        }
        writer.close().unwrap();

        let segment = PackedFile::new();
        segment.init();
        segment.set_path(&path);
        segment.open(true, false).unwrap();
        Arc::new(segment)
    }

    #[test]
    fn refuses_unopened_segments() {
        let registry = SegmentRegistry::new();
        let segment = PackedFile::new();
        segment.init();
        assert!(!registry.register_db_segment(Arc::new(segment)));
        assert_eq!(registry.segment_count(), 0);
    }

    #[test]
    fn enumerates_in_reverse_registration_order() {
        let dir = TempDir::new().unwrap();
        let registry = SegmentRegistry::new();
        let first = fixture_segment(&dir, "first.dat", &[key(1)]);
        let second = fixture_segment(&dir, "second.dat", &[key(2)]);

        assert!(registry.register_db_segment(first));
        assert!(registry.register_db_segment(second));

        assert_eq!(registry.segment_count(), 2);
        assert!(registry
            .segment_by_index(0)
            .unwrap()
            .path()
            .as_str()
            .ends_with("second.dat"));
        assert!(registry
            .segment_by_index(1)
            .unwrap()
            .path()
            .as_str()
            .ends_with("first.dat"));
        assert!(registry.segment_by_index(2).is_none());
    }

    #[test]
    fn key_resolution_is_last_registered_wins() {
        let dir = TempDir::new().unwrap();
        let registry = SegmentRegistry::new();
        registry.register_db_segment(fixture_segment(&dir, "older.dat", &[key(1), key(2)]));
        registry.register_db_segment(fixture_segment(&dir, "newer.dat", &[key(2)]));

        let winner = registry.find_segment(key(2)).unwrap();
        assert!(winner.path().as_str().ends_with("newer.dat"));

        let only = registry.find_segment(key(1)).unwrap();
        assert!(only.path().as_str().ends_with("older.dat"));

        assert!(registry.find_segment(key(9)).is_none());
    }

    #[test]
    fn factory_table_is_recorded() {
        let registry = SegmentRegistry::new();
        assert!(registry.register_object_factory(0xA, 0xB));
        assert_eq!(
            registry.object_factories(),
            vec![FactoryRegistration {
                type_id: 0xA,
                instance_id: 0xB
            }]
        );
    }
}
