//! Scoped registries for evals, enrichers and dashboard filters.
//!
//! A [`ScopedRegistry`] is an ordered, name-keyed list behind a shared lock.
//! Clones of the handle observe the same storage; separate `new` calls are
//! fully independent, so clearing one registry never touches another.
//! Retrieval always returns an owned snapshot.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::check::EvalScope;
use crate::error::{EngineError, Result};

/// Minimum shape of an item a [`ScopedRegistry`] can hold.
pub trait ScopedItem: Clone + Send + Sync {
    fn name(&self) -> &str;

    fn scope(&self) -> EvalScope;

    /// Optional sub-agent type discriminator.
    fn subagent_type(&self) -> Option<&str> {
        None
    }

    /// Partition the name is unique within (e.g. a dashboard view).
    fn partition(&self) -> &str {
        ""
    }
}

/// Ordered, upsert-by-name registry handle.
#[derive(Debug, Clone)]
pub struct ScopedRegistry<T> {
    key: &'static str,
    items: Arc<RwLock<Vec<T>>>,
}

impl<T: ScopedItem> ScopedRegistry<T> {
    /// Create an empty registry labelled `key` (used in logs).
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Insert `item`, or replace the entry with the same partition and name
    /// in place.
    pub fn register(&self, item: T) -> Result<()> {
        if item.name().trim().is_empty() {
            return Err(EngineError::InvalidRegistration(format!(
                "{}: item name must not be empty",
                self.key
            )));
        }

        let mut items = self.write();
        match items
            .iter()
            .position(|e| e.partition() == item.partition() && e.name() == item.name())
        {
            Some(idx) => {
                debug!(registry = self.key, name = item.name(), "replacing registered item");
                items[idx] = item;
            }
            None => {
                debug!(registry = self.key, name = item.name(), "registering item");
                items.push(item);
            }
        }
        Ok(())
    }

    /// Every item in registration order.
    pub fn get_all(&self) -> Vec<T> {
        self.read().clone()
    }

    /// Items applicable to top-level sessions.
    pub fn get_session_scoped(&self) -> Vec<T> {
        self.filtered(|e| e.scope().applies_to_session())
    }

    /// Items applicable to sub-agent sessions. A discriminator mismatch only
    /// excludes an item when both sides name a type.
    pub fn get_subagent_scoped(&self, subagent_type: Option<&str>) -> Vec<T> {
        self.filtered(|e| {
            if !e.scope().applies_to_subagent() {
                return false;
            }
            match (e.subagent_type(), subagent_type) {
                (Some(want), Some(have)) => want == have,
                _ => true,
            }
        })
    }

    pub fn has_subagent_scoped(&self) -> bool {
        self.read().iter().any(|e| e.scope().applies_to_subagent())
    }

    pub fn has(&self) -> bool {
        !self.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has()
    }

    /// Names in registration order (stable cache-key material).
    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|e| e.name().to_string()).collect()
    }

    /// Empty this registry.
    pub fn clear(&self) {
        self.write().clear();
        debug!(registry = self.key, "registry cleared");
    }

    pub(crate) fn filtered(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.read().iter().filter(|e| pred(e)).cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        scope: EvalScope,
        subagent_type: Option<String>,
        partition: String,
        version: u32,
    }

    impl Item {
        fn new(name: &str, scope: EvalScope) -> Self {
            Self {
                name: name.to_string(),
                scope,
                subagent_type: None,
                partition: String::new(),
                version: 1,
            }
        }

        fn typed(mut self, t: &str) -> Self {
            self.subagent_type = Some(t.to_string());
            self
        }

        fn in_partition(mut self, p: &str) -> Self {
            self.partition = p.to_string();
            self
        }

        fn version(mut self, v: u32) -> Self {
            self.version = v;
            self
        }
    }

    impl ScopedItem for Item {
        fn name(&self) -> &str {
            &self.name
        }
        fn scope(&self) -> EvalScope {
            self.scope
        }
        fn subagent_type(&self) -> Option<&str> {
            self.subagent_type.as_deref()
        }
        fn partition(&self) -> &str {
            &self.partition
        }
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_starts_empty() {
        let reg: ScopedRegistry<Item> = ScopedRegistry::new("test");
        assert!(!reg.has());
        assert!(reg.is_empty());
        assert!(reg.get_all().is_empty());
    }

    #[test]
    fn test_get_all_preserves_registration_order() {
        let reg = ScopedRegistry::new("test");
        for name in ["first", "second", "third"] {
            reg.register(Item::new(name, EvalScope::Session)).unwrap();
        }
        assert_eq!(names(&reg.get_all()), vec!["first", "second", "third"]);
        assert_eq!(reg.names(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reregistration_replaces_in_place() {
        let reg = ScopedRegistry::new("test");
        reg.register(Item::new("x", EvalScope::Session)).unwrap();
        reg.register(Item::new("y", EvalScope::Session)).unwrap();
        reg.register(Item::new("x", EvalScope::Both).version(2)).unwrap();

        let all = reg.get_all();
        assert_eq!(names(&all), vec!["x", "y"]);
        assert_eq!(all[0].version, 2);
        assert_eq!(all[0].scope, EvalScope::Both);
    }

    #[test]
    fn test_same_name_in_different_partitions_kept_separate() {
        let reg = ScopedRegistry::new("test");
        reg.register(Item::new("n", EvalScope::Session).in_partition("a"))
            .unwrap();
        reg.register(Item::new("n", EvalScope::Session).in_partition("b"))
            .unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_empty_name_rejected() {
        let reg = ScopedRegistry::new("evals");
        let err = reg.register(Item::new(" ", EvalScope::Session)).unwrap_err();
        assert!(err.to_string().contains("evals"));
        assert!(!reg.has());
    }

    #[test]
    fn test_scope_filtering() {
        let reg = ScopedRegistry::new("test");
        reg.register(Item::new("s", EvalScope::Session)).unwrap();
        reg.register(Item::new("a", EvalScope::Subagent)).unwrap();
        reg.register(Item::new("b", EvalScope::Both)).unwrap();

        assert_eq!(names(&reg.get_session_scoped()), vec!["s", "b"]);
        assert_eq!(names(&reg.get_subagent_scoped(None)), vec!["a", "b"]);
        assert!(reg.has_subagent_scoped());
    }

    #[test]
    fn test_subagent_type_match_is_permissive() {
        let reg = ScopedRegistry::new("test");
        reg.register(Item::new("explore", EvalScope::Subagent).typed("Explore"))
            .unwrap();
        reg.register(Item::new("plan", EvalScope::Both).typed("Plan"))
            .unwrap();
        reg.register(Item::new("any", EvalScope::Subagent)).unwrap();

        assert_eq!(
            names(&reg.get_subagent_scoped(Some("Explore"))),
            vec!["explore", "any"]
        );
        assert_eq!(
            names(&reg.get_subagent_scoped(None)),
            vec!["explore", "plan", "any"]
        );
    }

    #[test]
    fn test_has_subagent_scoped_false_for_session_only() {
        let reg = ScopedRegistry::new("test");
        reg.register(Item::new("s", EvalScope::Session)).unwrap();
        assert!(!reg.has_subagent_scoped());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let reg = ScopedRegistry::new("test");
        reg.register(Item::new("a", EvalScope::Session)).unwrap();
        let mut snapshot = reg.get_all();
        snapshot.clear();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_clear_is_per_instance() {
        let a = ScopedRegistry::new("a");
        let b = ScopedRegistry::new("b");
        a.register(Item::new("x", EvalScope::Session)).unwrap();
        b.register(Item::new("x", EvalScope::Session)).unwrap();

        a.clear();
        assert!(!a.has());
        assert!(b.has());

        // clones share storage
        let b2 = b.clone();
        b2.clear();
        assert!(!b.has());
    }
}
