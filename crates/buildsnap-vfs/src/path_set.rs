use std::collections::BTreeSet;

use parking_lot::RwLock;

/// A thread-safe set of storage paths.
///
/// The compiler under test may read and write from several workers at once,
/// so membership tests and inserts go through a lock. Iteration always
/// happens on a detached copy ([`PathSet::snapshot`]).
#[derive(Debug, Default)]
pub struct PathSet {
    paths: RwLock<BTreeSet<String>>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path; returns `true` if it was not already present.
    pub fn insert(&self, path: impl Into<String>) -> bool {
        self.paths.write().insert(path.into())
    }

    /// Remove a path; returns `true` if it was present.
    pub fn remove(&self, path: &str) -> bool {
        self.paths.write().remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.read().contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.read().is_empty()
    }

    pub fn clear(&self) {
        self.paths.write().clear();
    }

    /// Detached, ordered copy of the current members.
    pub fn snapshot(&self) -> BTreeSet<String> {
        self.paths.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn insert_remove_contains() {
        let set = PathSet::new();
        assert!(set.insert("/a"));
        assert!(!set.insert("/a"));
        assert!(set.contains("/a"));
        assert!(set.remove("/a"));
        assert!(!set.remove("/a"));
        assert!(set.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let set = PathSet::new();
        set.insert("/a");
        let copy = set.snapshot();
        set.clear();
        assert!(copy.contains("/a"));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn concurrent_inserts_are_all_kept() {
        let set = Arc::new(PathSet::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let set = Arc::clone(&set);
                thread::spawn(move || {
                    for i in 0..50 {
                        set.insert(format!("/w{worker}/f{i}.ts"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker should not panic");
        }
        assert_eq!(set.len(), 400);
    }
}
