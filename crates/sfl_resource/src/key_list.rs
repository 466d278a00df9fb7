//! Ordered, growable collections of resource keys.

use crate::key::ResourceKey;
use std::ops::Index;

/// An ordered, appendable list of [`ResourceKey`]s.
///
/// The list enforces no uniqueness — callers that gather keys from multiple
/// sources may insert the same key more than once. Deduplication is the job
/// of the aggregate segment's hash index, not the list. Presence tests are
/// O(n) for the same reason.
#[derive(Debug, Default, Clone)]
pub struct KeyList {
    keys: Vec<ResourceKey>,
}

impl KeyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key to the end of the list.
    pub fn insert(&mut self, key: ResourceKey) {
        self.keys.push(key);
    }

    /// Appends every entry of `other`, preserving its order. No dedup.
    pub fn insert_list(&mut self, other: &KeyList) {
        self.keys.extend_from_slice(&other.keys);
    }

    /// Removes the first structurally-equal entry. Returns whether one was found.
    pub fn erase(&mut self, key: ResourceKey) -> bool {
        match self.keys.iter().position(|entry| *entry == key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empties the list.
    pub fn erase_all(&mut self) {
        self.keys.clear();
    }

    pub fn is_present(&self, key: ResourceKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates the keys in list order.
    pub fn keys(&self) -> impl Iterator<Item = ResourceKey> + '_ {
        self.keys.iter().copied()
    }

    /// Callback-style enumeration, for callers that thread context through.
    pub fn for_each_key(&self, mut callback: impl FnMut(ResourceKey)) {
        for key in &self.keys {
            callback(*key);
        }
    }
}

impl Index<usize> for KeyList {
    type Output = ResourceKey;

    /// Indexed access. Callers must check [`len`](KeyList::len) first; an
    /// out-of-range index panics.
    fn index(&self, index: usize) -> &ResourceKey {
        &self.keys[index]
    }
}

impl FromIterator<ResourceKey> for KeyList {
    fn from_iter<T: IntoIterator<Item = ResourceKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> ResourceKey {
        ResourceKey::new(n, n * 10, n * 100)
    }

    #[test]
    fn insert_appends_without_dedup() {
        let mut list = KeyList::new();
        list.insert(key(1));
        list.insert(key(1));
        list.insert(key(2));
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], key(1));
        assert_eq!(list[1], key(1));
        assert_eq!(list[2], key(2));
    }

    #[test]
    fn insert_list_preserves_order() {
        let mut a: KeyList = [key(1), key(2)].into_iter().collect();
        let b: KeyList = [key(2), key(3)].into_iter().collect();
        a.insert_list(&b);
        let collected: Vec<_> = a.keys().collect();
        assert_eq!(collected, vec![key(1), key(2), key(2), key(3)]);
    }

    #[test]
    fn erase_removes_first_match_only() {
        let mut list: KeyList = [key(1), key(2), key(1)].into_iter().collect();
        assert!(list.erase(key(1)));
        let collected: Vec<_> = list.keys().collect();
        assert_eq!(collected, vec![key(2), key(1)]);
        assert!(!list.erase(key(9)));
    }

    #[test]
    fn presence_and_erase_all() {
        let mut list: KeyList = [key(1), key(2)].into_iter().collect();
        assert!(list.is_present(key(2)));
        assert!(!list.is_present(key(3)));
        list.erase_all();
        assert!(list.is_empty());
        assert!(!list.is_present(key(1)));
    }

    #[test]
    fn callback_enumeration_visits_in_order() {
        let list: KeyList = [key(3), key(1), key(2)].into_iter().collect();
        let mut seen = Vec::new();
        list.for_each_key(|k| seen.push(k));
        assert_eq!(seen, vec![key(3), key(1), key(2)]);
    }
}
