//! Set of live surfaces, in the order they were opened
//!
//! The registry is only a membership list. Closing is the lifecycle's job;
//! bulk close takes a `snapshot` first so that registrations made while the
//! pass is running are neither skipped mid-iteration nor visited twice.

use indexmap::IndexSet;

use crate::surface::SurfaceId;

#[derive(Debug, Default, Clone)]
pub struct SurfaceRegistry {
    members: IndexSet<SurfaceId>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a surface; returns false if it was already tracked
    pub fn register(&mut self, id: SurfaceId) -> bool {
        self.members.insert(id)
    }

    /// Stop tracking a surface; absent ids are ignored
    pub fn deregister(&mut self, id: SurfaceId) -> bool {
        self.members.shift_remove(&id)
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.members.contains(&id)
    }

    /// Copy of the current members, oldest first
    pub fn snapshot(&self) -> Vec<SurfaceId> {
        self.members.iter().copied().collect()
    }

    /// Most recently registered surface
    pub fn last(&self) -> Option<SurfaceId> {
        self.members.last().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.members.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = SurfaceRegistry::new();
        assert!(registry.register(SurfaceId(1)));
        assert!(!registry.register(SurfaceId(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deregister_absent_is_noop() {
        let mut registry = SurfaceRegistry::new();
        registry.register(SurfaceId(1));
        assert!(!registry.deregister(SurfaceId(2)));
        assert!(registry.deregister(SurfaceId(1)));
        assert!(!registry.deregister(SurfaceId(1)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_preserves_order_and_is_detached() {
        let mut registry = SurfaceRegistry::new();
        for id in [3, 1, 2] {
            registry.register(SurfaceId(id));
        }
        let snapshot = registry.snapshot();
        registry.register(SurfaceId(9));
        registry.deregister(SurfaceId(1));

        assert_eq!(snapshot, vec![SurfaceId(3), SurfaceId(1), SurfaceId(2)]);
        assert_eq!(registry.last(), Some(SurfaceId(9)));
    }
}
