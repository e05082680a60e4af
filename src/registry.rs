//! Member registry: lazily built name ↔ value lookup for one definition.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::OnceLock;

/// One named member of a definition (produced by the definition macros).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Member<V> {
    /// Canonical display name, taken verbatim from the accessor.
    pub name: &'static str,
    pub value: V,
}

impl<V> Member<V> {
    pub const fn new(name: &'static str, value: V) -> Self {
        Self { name, value }
    }
}

/// Built name ↔ value maps for one definition.
///
/// Provides:
/// - Value → canonical name lookup
/// - Name → value lookup keyed by the lower-cased name
/// - Declaration-ordered member iteration
///
/// Both indices always point at the same entries, so each value has exactly
/// one canonical name.
#[derive(Clone, Debug)]
pub struct RegistryCache<V> {
    entries: Vec<Member<V>>,
    name_to_idx: HashMap<String, usize>,
    value_to_idx: HashMap<V, usize>,
}

impl<V: Clone + Eq + Hash> RegistryCache<V> {
    /// Build the maps from a member list in declaration order.
    ///
    /// The first member to claim a value (or a lower-cased name) wins; later
    /// members repeating it are dropped from both maps.
    pub fn build(members: Vec<Member<V>>) -> Self {
        let mut entries = Vec::with_capacity(members.len());
        let mut name_to_idx = HashMap::with_capacity(members.len());
        let mut value_to_idx = HashMap::with_capacity(members.len());

        for member in members {
            let key = member.name.to_lowercase();

            if let Some(&existing) = value_to_idx.get(&member.value) {
                let existing: &Member<V> = &entries[existing];
                tracing::warn!(
                    member = member.name,
                    canonical = existing.name,
                    "member repeats an already registered value; keeping the first name"
                );
                continue;
            }
            if let Some(&existing) = name_to_idx.get(&key) {
                let existing: &Member<V> = &entries[existing];
                tracing::warn!(
                    member = member.name,
                    canonical = existing.name,
                    "member name collides case-insensitively; keeping the first name"
                );
                continue;
            }

            let idx = entries.len();
            name_to_idx.insert(key, idx);
            value_to_idx.insert(member.value.clone(), idx);
            entries.push(member);
        }

        Self {
            entries,
            name_to_idx,
            value_to_idx,
        }
    }

    /// Value → canonical name
    #[inline]
    pub fn name_of(&self, value: &V) -> Option<&'static str> {
        self.value_to_idx.get(value).map(|&i| self.entries[i].name)
    }

    /// Name → member.
    ///
    /// The name is always matched through its lower-cased key; when
    /// `case_insensitive` is false the canonical name must also match exactly.
    pub fn lookup(&self, name: &str, case_insensitive: bool) -> Option<&Member<V>> {
        let member = &self.entries[*self.name_to_idx.get(&name.to_lowercase())?];
        (case_insensitive || member.name == name).then_some(member)
    }

    /// Check if a value is registered.
    #[inline]
    pub fn contains_value(&self, value: &V) -> bool {
        self.value_to_idx.contains_key(value)
    }

    /// All members in declaration order.
    #[inline]
    pub fn members(&self) -> &[Member<V>] {
        &self.entries
    }

    /// Iterate all registered values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|m| &m.value)
    }

    /// Total number of registered members.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lazily built, build-once registry for one definition.
///
/// Each definition owns its own `static` registry, so registries never
/// contend with each other. The member list is discovered on first use and
/// the resulting [`RegistryCache`] is immutable for the rest of the process.
#[derive(Debug)]
pub struct Registry<V> {
    cache: OnceLock<RegistryCache<V>>,
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Registry<V> {
    pub const fn new() -> Self {
        Self {
            cache: OnceLock::new(),
        }
    }

    /// Whether the caches have been built.
    #[inline]
    pub fn is_built(&self) -> bool {
        self.cache.get().is_some()
    }
}

impl<V: Clone + Eq + Hash> Registry<V> {
    /// Return the built caches, running `discover` first if nobody has yet.
    ///
    /// `discover` runs at most once per registry, even when many threads race
    /// on first use; losers block until the winner has published the caches.
    /// Once built, reads never take a lock.
    pub fn get_or_build<F>(&self, label: &'static str, discover: F) -> &RegistryCache<V>
    where
        F: FnOnce() -> Vec<Member<V>>,
    {
        self.cache.get_or_init(|| {
            let cache = RegistryCache::build(discover());
            tracing::debug!(definition = label, members = cache.len(), "registry built");
            cache
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_members() -> Vec<Member<u32>> {
        vec![
            Member::new("Foo", 1),
            Member::new("Bar", 2),
            Member::new("Baz", 3),
        ]
    }

    #[test]
    fn build_and_lookup() {
        let cache = RegistryCache::build(sample_members());

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.name_of(&1), Some("Foo"));
        assert_eq!(cache.name_of(&3), Some("Baz"));
        assert_eq!(cache.name_of(&4), None);

        // Round-trip
        let member = cache.lookup("Bar", true).unwrap();
        assert_eq!(cache.name_of(&member.value), Some("Bar"));
    }

    #[test]
    fn lookup_ignores_case_when_asked() {
        let cache = RegistryCache::build(sample_members());

        assert_eq!(cache.lookup("foo", true).map(|m| m.value), Some(1));
        assert_eq!(cache.lookup("bAZ", true).map(|m| m.value), Some(3));
        assert!(cache.lookup("Qux", true).is_none());
    }

    #[test]
    fn lookup_respects_case_when_sensitive() {
        let cache = RegistryCache::build(sample_members());

        assert_eq!(cache.lookup("Foo", false).map(|m| m.value), Some(1));
        assert!(cache.lookup("foo", false).is_none());
        assert!(cache.lookup("FOO", false).is_none());
    }

    #[test]
    fn canonical_name_is_never_lowercased() {
        let cache = RegistryCache::build(sample_members());
        assert_eq!(cache.lookup("FOO", true).unwrap().name, "Foo");
    }

    #[test]
    fn members_keep_declaration_order() {
        let cache = RegistryCache::build(sample_members());
        let names: Vec<&str> = cache.members().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Foo", "Bar", "Baz"]);
        assert_eq!(cache.values().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_build_returns_empty_cache() {
        let cache = RegistryCache::<u8>::build(Vec::new());
        assert!(cache.is_empty());
        assert!(cache.lookup("anything", true).is_none());
    }

    #[test]
    fn repeated_value_keeps_first_name() {
        let cache = RegistryCache::build(vec![
            Member::new("Primary", 7u8),
            Member::new("Alias", 7u8),
        ]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.name_of(&7), Some("Primary"));
        // Both maps agree: the dropped alias is not parseable either.
        assert!(cache.lookup("Alias", true).is_none());
    }

    #[test]
    fn case_colliding_names_keep_first() {
        let cache = RegistryCache::build(vec![Member::new("Foo", 1u8), Member::new("FOO", 2u8)]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("foo", true).map(|m| m.value), Some(1));
        assert!(!cache.contains_value(&2));
    }

    #[test]
    fn registry_builds_lazily() {
        let registry = Registry::<u32>::new();
        assert!(!registry.is_built());

        let cache = registry.get_or_build("sample", sample_members);
        assert_eq!(cache.len(), 3);
        assert!(registry.is_built());
    }

    #[test]
    fn registry_builds_once() {
        let registry = Registry::<u32>::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            registry.get_or_build("sample", || {
                calls.fetch_add(1, Ordering::SeqCst);
                sample_members()
            });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_builds_once_under_concurrent_first_use() {
        let registry = Registry::<u32>::new();
        let calls = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let cache = registry.get_or_build("sample", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        sample_members()
                    });
                    assert_eq!(cache.name_of(&2), Some("Bar"));
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn static_registry_is_usable() {
        static REGISTRY: Registry<u32> = Registry::new();
        let cache = REGISTRY.get_or_build("static", sample_members);
        assert_eq!(cache.name_of(&1), Some("Foo"));
    }
}
