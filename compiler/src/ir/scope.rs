//! Hierarchical scope sets
//!
//! Scope state along a root-to-leaf path of the block tree. A child scope
//! sees everything its ancestors held when it was created, can add entries
//! of its own, and never changes what its ancestors or siblings see.
//!
//! Frames are frozen into a shared parent chain when a child is made, so
//! branching never deep-copies.

use fxhash::{FxHashMap, FxHashSet};
use std::borrow::Borrow;
use std::hash::Hash;
use std::rc::Rc;

struct SetFrame<T> {
    entries: FxHashSet<T>,
    parent: Option<Rc<SetFrame<T>>>,
}

/// Set with copy-on-branch child scopes
pub struct ScopedSet<T> {
    local: FxHashSet<T>,
    parent: Option<Rc<SetFrame<T>>>,
}

impl<T: Eq + Hash> Default for ScopedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> ScopedSet<T> {
    pub fn new() -> Self {
        Self {
            local: FxHashSet::default(),
            parent: None,
        }
    }

    /// Create a child scope. Entries added to `self` afterwards are not
    /// visible to the child.
    pub fn make_child(&mut self) -> Self {
        self.freeze();
        Self {
            local: FxHashSet::default(),
            parent: self.parent.clone(),
        }
    }

    fn freeze(&mut self) {
        if self.local.is_empty() {
            return;
        }
        let frame = SetFrame {
            entries: std::mem::take(&mut self.local),
            parent: self.parent.take(),
        };
        self.parent = Some(Rc::new(frame));
    }

    /// Returns false if the entry was already visible
    pub fn insert(&mut self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.local.insert(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        if self.local.contains(value) {
            return true;
        }
        let mut frame = self.parent.as_deref();
        while let Some(f) = frame {
            if f.entries.contains(value) {
                return true;
            }
            frame = f.parent.as_deref();
        }
        false
    }

    /// Number of visible entries
    pub fn len(&self) -> usize {
        let mut count = self.local.len();
        let mut frame = self.parent.as_deref();
        while let Some(f) = frame {
            count += f.entries.len();
            frame = f.parent.as_deref();
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries added in this scope only
    pub fn local_entries(&self) -> impl Iterator<Item = &T> {
        self.local.iter()
    }
}

struct MapFrame<K, V> {
    entries: FxHashMap<K, V>,
    parent: Option<Rc<MapFrame<K, V>>>,
}

/// Map with copy-on-branch child scopes. Inner scopes shadow outer ones.
pub struct ScopedMap<K, V> {
    local: FxHashMap<K, V>,
    parent: Option<Rc<MapFrame<K, V>>>,
}

impl<K: Eq + Hash, V> Default for ScopedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> ScopedMap<K, V> {
    pub fn new() -> Self {
        Self {
            local: FxHashMap::default(),
            parent: None,
        }
    }

    pub fn make_child(&mut self) -> Self {
        self.freeze();
        Self {
            local: FxHashMap::default(),
            parent: self.parent.clone(),
        }
    }

    fn freeze(&mut self) {
        if self.local.is_empty() {
            return;
        }
        let frame = MapFrame {
            entries: std::mem::take(&mut self.local),
            parent: self.parent.take(),
        };
        self.parent = Some(Rc::new(frame));
    }

    /// Insert into the current scope, returning the previous local entry
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.local.insert(key, value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(v) = self.local.get(key) {
            return Some(v);
        }
        let mut frame = self.parent.as_deref();
        while let Some(f) = frame {
            if let Some(v) = f.entries.get(key) {
                return Some(v);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Visible entries, innermost scope first. Shadowed entries are skipped.
    pub fn visible(&self) -> Vec<(&K, &V)> {
        let mut seen: FxHashSet<&K> = FxHashSet::default();
        let mut out = Vec::new();
        for (k, v) in &self.local {
            if seen.insert(k) {
                out.push((k, v));
            }
        }
        let mut frame = self.parent.as_deref();
        while let Some(f) = frame {
            for (k, v) in &f.entries {
                if seen.insert(k) {
                    out.push((k, v));
                }
            }
            frame = f.parent.as_deref();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_sees_parent_entries() {
        let mut root: ScopedSet<&str> = ScopedSet::new();
        root.insert("a");
        let mut child = root.make_child();
        assert!(child.contains(&"a"));

        child.insert("b");
        assert!(child.contains(&"b"));
        assert!(!root.contains(&"b"));
    }

    #[test]
    fn test_parent_additions_after_branch_are_hidden() {
        let mut root: ScopedSet<u32> = ScopedSet::new();
        root.insert(1);
        let child = root.make_child();
        root.insert(2);

        assert!(root.contains(&1));
        assert!(root.contains(&2));
        assert!(child.contains(&1));
        assert!(!child.contains(&2));
    }

    #[test]
    fn test_siblings_are_isolated() {
        let mut root: ScopedSet<u32> = ScopedSet::new();
        root.insert(0);
        let mut left = root.make_child();
        let mut right = root.make_child();
        left.insert(1);
        right.insert(2);

        assert!(!left.contains(&2));
        assert!(!right.contains(&1));
        assert_eq!(left.len(), 2);
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_insert_reports_visible_duplicates() {
        let mut root: ScopedSet<u32> = ScopedSet::new();
        assert!(root.insert(5));
        let mut child = root.make_child();
        assert!(!child.insert(5));
        assert!(child.local_entries().next().is_none());
    }

    #[test]
    fn test_map_shadowing() {
        let mut root: ScopedMap<&str, u32> = ScopedMap::new();
        root.insert("x", 1);
        let mut child = root.make_child();
        child.insert("x", 2);
        child.insert("y", 3);

        assert_eq!(child.get(&"x"), Some(&2));
        assert_eq!(root.get(&"x"), Some(&1));
        assert!(!root.contains_key(&"y"));
        assert_eq!(child.visible().len(), 2);
    }
}
