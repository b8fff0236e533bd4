//! [`ParamStore`] – a local snapshot of registry parameters, keyed by name
//! relative to the namespace they were loaded from.
//!
//! # Loading
//!
//! [`ParamStore::load`] takes a namespace argument and:
//!
//! 1. appends a trailing `/` when it is missing (so `/a/b` never selects
//!    `/a/bc/...`), and records the result;
//! 2. resolves it against the [`NamespaceContext`] when it is relative;
//! 3. waits [`StoreConfig::grace_period`] and lists every registry name;
//! 4. keeps the names that start with the resolved namespace, fetches their
//!    values and stores them under the remainder of the name.
//!
//! A key that already exists is overwritten: the most recently processed
//! namespace wins.
//!
//! # Reloading
//!
//! [`ParamStore::reload`] discards every entry and replays the load logic for
//! each recorded namespace (in sorted order), resolving relative namespaces
//! against the context as it is *now*.  The result depends only on the set of
//! recorded namespaces and the registry's current contents.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rush_params::{ParamStore, StoreConfig};
//! use rush_registry::{FixedContext, MemoryRegistry};
//!
//! let registry = Arc::new(MemoryRegistry::new());
//! registry.set("/robot/speed", 3.5).unwrap();
//! registry.set("/robot/name", "bot1").unwrap();
//!
//! let mut store = ParamStore::with_config(
//!     registry.clone(),
//!     Arc::new(FixedContext::root()),
//!     StoreConfig::immediate(),
//! );
//! store.load("robot").unwrap();
//!
//! assert_eq!(store.get_keys(), vec!["name", "speed"]);
//! assert_eq!(store.get_as::<f64>("speed").unwrap(), 3.5);
//! assert!(store.get("missing").is_err());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::thread;

use rush_registry::names::{normalize_namespace, resolve_namespace};
use rush_registry::{NamespaceContext, ParamRegistry};
use rush_types::{FromParamValue, ParamError, ParamValue};
use tracing::{debug, info, instrument, warn};

use crate::config::StoreConfig;

/// Namespace-scoped parameter store.
///
/// The store is a plain single-owner value: `load` and `reload` take
/// `&mut self`, block for the grace period and on registry calls, and spawn
/// nothing.  Offload them to a worker thread if blocking is a problem.
pub struct ParamStore {
    registry: Arc<dyn ParamRegistry>,
    context: Arc<dyn NamespaceContext>,
    config: StoreConfig,
    entries: BTreeMap<String, ParamValue>,
    namespaces: BTreeSet<String>,
}

impl ParamStore {
    /// Create an empty store with the default [`StoreConfig`].
    pub fn new(registry: Arc<dyn ParamRegistry>, context: Arc<dyn NamespaceContext>) -> Self {
        Self::with_config(registry, context, StoreConfig::default())
    }

    /// Create an empty store with an explicit [`StoreConfig`].
    pub fn with_config(
        registry: Arc<dyn ParamRegistry>,
        context: Arc<dyn NamespaceContext>,
        config: StoreConfig,
    ) -> Self {
        Self {
            registry,
            context,
            config,
            entries: BTreeMap::new(),
            namespaces: BTreeSet::new(),
        }
    }

    /// Create a store and immediately [`load`](ParamStore::load) `namespace`.
    ///
    /// # Errors
    ///
    /// Any registry failure raised by the initial load.
    pub fn with_namespace(
        registry: Arc<dyn ParamRegistry>,
        context: Arc<dyn NamespaceContext>,
        config: StoreConfig,
        namespace: &str,
    ) -> Result<Self, ParamError> {
        let mut store = Self::with_config(registry, context, config);
        store.load(namespace)?;
        Ok(store)
    }

    /// Load every registry parameter under `namespace` into the store.
    ///
    /// `namespace` may be absolute (`/robot`), relative to the context
    /// (`robot`), or empty (the root, `/`).  Returns the
    /// number of parameters merged.
    ///
    /// # Errors
    ///
    /// Registry failures are propagated as-is.  The namespace stays recorded
    /// and entries merged before the failure are kept.
    #[instrument(skip(self))]
    pub fn load(&mut self, namespace: &str) -> Result<usize, ParamError> {
        let normalized = normalize_namespace(namespace);
        self.namespaces.insert(normalized.clone());
        self.merge_namespace(&normalized)
    }

    /// Rebuild the store from scratch by loading every recorded namespace.
    ///
    /// Returns the number of entries held afterwards.
    ///
    /// # Errors
    ///
    /// Registry failures are propagated as-is.  The store is then left with
    /// whatever was merged before the failure, possibly nothing.
    #[instrument(skip(self), fields(namespaces = self.namespaces.len()))]
    pub fn reload(&mut self) -> Result<usize, ParamError> {
        self.entries.clear();
        let namespaces: Vec<String> = self.namespaces.iter().cloned().collect();
        for namespace in &namespaces {
            self.merge_namespace(namespace)?;
        }
        info!(keys = self.entries.len(), "parameters reloaded");
        Ok(self.entries.len())
    }

    /// Borrow the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`ParamError::KeyNotFound`] when `key` is not in the store.  The
    /// registry is never consulted.
    pub fn get(&self, key: &str) -> Result<&ParamValue, ParamError> {
        self.entries
            .get(key)
            .ok_or_else(|| ParamError::KeyNotFound(key.to_string()))
    }

    /// Look up `key` and convert its value to `T`.
    pub fn get_as<T: FromParamValue>(&self, key: &str) -> Result<T, ParamError> {
        self.get(key)?.convert()
    }

    /// Every key currently stored, in sorted order.
    pub fn get_keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// `true` when `key` is in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The namespaces recorded by [`load`](ParamStore::load), as normalised
    /// before resolution, in sorted order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // Resolve, query and merge a single normalised namespace.
    fn merge_namespace(&mut self, normalized: &str) -> Result<usize, ParamError> {
        let absolute = resolve_namespace(normalized, &self.context.current_namespace());

        if !self.config.grace_period.is_zero() {
            thread::sleep(self.config.grace_period);
        }

        let names = self.registry.list_names().inspect_err(|e| {
            warn!(namespace = %absolute, error = %e, "registry name listing failed");
        })?;

        let mut merged = 0;
        for name in names.iter().filter(|name| name.starts_with(&absolute)) {
            let key = &name[absolute.len()..];
            if key.is_empty() {
                continue;
            }
            let value = self.registry.get_value(name).inspect_err(|e| {
                warn!(name = %name, error = %e, "registry value lookup failed");
            })?;
            let replaced = self.entries.insert(key.to_string(), value).is_some();
            debug!(key, replaced, "parameter merged");
            merged += 1;
        }

        info!(namespace = %absolute, merged, "parameters loaded");
        Ok(merged)
    }
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamStore")
            .field("context", &self.context.current_namespace())
            .field("config", &self.config)
            .field("namespaces", &self.namespaces)
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rush_registry::{FixedContext, MemoryRegistry};

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    /// Context whose namespace can be moved between calls.
    struct MovableContext(RwLock<String>);

    impl MovableContext {
        fn new(namespace: &str) -> Arc<Self> {
            Arc::new(Self(RwLock::new(namespace.to_string())))
        }

        fn move_to(&self, namespace: &str) {
            *self.0.write().unwrap() = namespace.to_string();
        }
    }

    impl NamespaceContext for MovableContext {
        fn current_namespace(&self) -> String {
            self.0.read().unwrap().clone()
        }
    }

    /// Registry that cannot be reached at all.
    struct UnreachableRegistry;

    impl ParamRegistry for UnreachableRegistry {
        fn list_names(&self) -> Result<Vec<String>, ParamError> {
            Err(ParamError::Registry("master unreachable".to_string()))
        }

        fn get_value(&self, _name: &str) -> Result<ParamValue, ParamError> {
            Err(ParamError::Registry("master unreachable".to_string()))
        }
    }

    /// Registry wrapper that fails lookups of one name and counts listings.
    struct FlakyRegistry {
        inner: MemoryRegistry,
        broken: RwLock<Option<String>>,
        listings: AtomicUsize,
    }

    impl FlakyRegistry {
        fn new(inner: MemoryRegistry) -> Arc<Self> {
            Arc::new(Self {
                inner,
                broken: RwLock::new(None),
                listings: AtomicUsize::new(0),
            })
        }

        fn break_name(&self, name: &str) {
            *self.broken.write().unwrap() = Some(name.to_string());
        }
    }

    impl ParamRegistry for FlakyRegistry {
        fn list_names(&self) -> Result<Vec<String>, ParamError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            self.inner.list_names()
        }

        fn get_value(&self, name: &str) -> Result<ParamValue, ParamError> {
            if self.broken.read().unwrap().as_deref() == Some(name) {
                return Err(ParamError::Registry(format!("lookup of {name} timed out")));
            }
            self.inner.get_value(name)
        }
    }

    fn robot_registry() -> Arc<MemoryRegistry> {
        let registry = MemoryRegistry::new();
        registry.set("/robot/speed", 3.5).unwrap();
        registry.set("/robot/name", "bot1").unwrap();
        registry.set("/arm/joints", vec![0.0, 1.57]).unwrap();
        registry.set("/arm/enabled", true).unwrap();
        Arc::new(registry)
    }

    fn store_over(registry: Arc<dyn ParamRegistry>) -> ParamStore {
        ParamStore::with_config(registry, Arc::new(FixedContext::root()), StoreConfig::immediate())
    }

    fn snapshot(store: &ParamStore) -> Vec<(String, ParamValue)> {
        store.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn load_relative_namespace_from_root() {
        let mut store = store_over(robot_registry());
        assert_eq!(store.load("robot").unwrap(), 2);

        assert_eq!(store.get_keys(), vec!["name", "speed"]);
        assert_eq!(store.get("speed").unwrap(), &ParamValue::Double(3.5));
        assert_eq!(store.get_as::<String>("name").unwrap(), "bot1");
    }

    #[test]
    fn get_missing_key_is_key_not_found() {
        let mut store = store_over(robot_registry());
        store.load("robot").unwrap();

        let err = store.get("missing").unwrap_err();
        assert_eq!(err, ParamError::KeyNotFound("missing".to_string()));
    }

    #[test]
    fn get_does_not_auto_load() {
        let store = store_over(robot_registry());
        assert!(matches!(store.get("speed"), Err(ParamError::KeyNotFound(_))));
    }

    #[test]
    fn get_as_reports_type_mismatch() {
        let mut store = store_over(robot_registry());
        store.load("/robot").unwrap();
        let result = store.get_as::<i32>("name");
        assert!(matches!(result, Err(ParamError::TypeMismatch { .. })));
    }

    #[test]
    fn empty_store_has_no_keys() {
        let store = store_over(robot_registry());
        assert!(store.get_keys().is_empty());
        assert!(store.is_empty());
        assert_eq!(store.namespaces().count(), 0);
    }

    #[test]
    fn disjoint_namespaces_merge_without_cross_contamination() {
        let mut store = store_over(robot_registry());
        store.load("/robot").unwrap();
        store.load("/arm").unwrap();

        assert_eq!(store.get_keys(), vec!["enabled", "joints", "name", "speed"]);
        assert_eq!(store.len(), 4);
        assert_eq!(store.get_as::<Vec<f64>>("joints").unwrap(), vec![0.0, 1.57]);
    }

    #[test]
    fn nested_namespaces_produce_distinct_keys() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/a/b/x", 1).unwrap();
        let mut store = store_over(registry);

        store.load("/a/").unwrap();
        store.load("/a/b/").unwrap();

        assert_eq!(store.get_keys(), vec!["b/x", "x"]);
    }

    #[test]
    fn trailing_separator_prevents_partial_segment_match() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/a/b/x", 1).unwrap();
        registry.set("/a/bc/y", 2).unwrap();
        let mut store = store_over(registry);

        store.load("/a/b").unwrap();
        assert_eq!(store.get_keys(), vec!["x"]);
    }

    #[test]
    fn reloading_same_namespace_picks_up_new_value() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/a/x", 1).unwrap();
        let mut store = store_over(registry.clone());

        store.load("/a").unwrap();
        registry.set("/a/x", 2).unwrap();
        store.load("/a").unwrap();

        assert_eq!(store.get_as::<i64>("x").unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.namespaces().collect::<Vec<_>>(), vec!["/a/"]);
    }

    #[test]
    fn later_namespace_overwrites_colliding_key() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/left/gain", 1).unwrap();
        registry.set("/right/gain", 2).unwrap();
        let mut store = store_over(registry);

        store.load("/right").unwrap();
        store.load("/left").unwrap();
        assert_eq!(store.get_as::<i64>("gain").unwrap(), 1);

        store.load("/right").unwrap();
        assert_eq!(store.get_as::<i64>("gain").unwrap(), 2);
    }

    #[test]
    fn namespaces_record_normalized_arguments() {
        let mut store = store_over(robot_registry());
        store.load("robot").unwrap();
        store.load("/arm").unwrap();
        store.load("").unwrap();

        assert_eq!(store.namespaces().collect::<Vec<_>>(), vec!["/", "/arm/", "robot/"]);
    }

    #[test]
    fn empty_namespace_loads_from_root_not_context() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/robot1/speed", 1.0).unwrap();
        registry.set("/robot2/speed", 2.0).unwrap();
        let context = Arc::new(FixedContext::new("/robot1").unwrap());
        let mut store = ParamStore::with_config(registry, context, StoreConfig::immediate());

        assert_eq!(store.load("").unwrap(), 2);
        assert_eq!(store.get_keys(), vec!["robot1/speed", "robot2/speed"]);
        assert_eq!(store.namespaces().collect::<Vec<_>>(), vec!["/"]);
    }

    #[test]
    fn relative_namespace_resolves_under_context() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/robot1/arm/reach", 0.8).unwrap();
        registry.set("/arm/reach", 9.9).unwrap();
        let context = Arc::new(FixedContext::new("/robot1").unwrap());
        let mut store = ParamStore::with_config(registry, context, StoreConfig::immediate());

        store.load("arm").unwrap();
        assert_eq!(store.get_as::<f64>("reach").unwrap(), 0.8);
    }

    #[test]
    fn reload_matches_fresh_loads_in_any_order() {
        let registry = robot_registry();
        registry.set("/robot/arm/reach", 0.8).unwrap();

        let mut first = store_over(registry.clone());
        first.load("/robot").unwrap();
        first.load("/robot/arm").unwrap();
        first.load("/arm").unwrap();
        first.load("/robot").unwrap();
        first.reload().unwrap();

        let mut fresh = store_over(registry);
        fresh.load("/arm").unwrap();
        fresh.load("/robot/arm").unwrap();
        fresh.load("/robot").unwrap();

        assert_eq!(snapshot(&first), snapshot(&fresh));
    }

    #[test]
    fn reload_drops_parameters_removed_from_registry() {
        let registry = robot_registry();
        let mut store = store_over(registry.clone());
        store.load("/robot").unwrap();

        registry.remove("/robot/name");
        assert_eq!(store.load("/robot").unwrap(), 1);
        assert!(store.contains_key("name"), "load never removes entries");

        assert_eq!(store.reload().unwrap(), 1);
        assert!(!store.contains_key("name"));
    }

    #[test]
    fn reload_resolves_against_current_context() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.set("/r1/arm/reach", 1.0).unwrap();
        registry.set("/r2/arm/reach", 2.0).unwrap();
        let context = MovableContext::new("/r1");
        let mut store = ParamStore::with_config(registry, context.clone(), StoreConfig::immediate());

        store.load("arm").unwrap();
        assert_eq!(store.get_as::<f64>("reach").unwrap(), 1.0);

        context.move_to("/r2");
        store.reload().unwrap();
        assert_eq!(store.get_as::<f64>("reach").unwrap(), 2.0);
    }

    #[test]
    fn with_namespace_loads_immediately() {
        let store = ParamStore::with_namespace(
            robot_registry(),
            Arc::new(FixedContext::root()),
            StoreConfig::immediate(),
            "robot",
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.namespaces().collect::<Vec<_>>(), vec!["robot/"]);
    }

    #[test]
    fn registry_failure_propagates_and_keeps_namespace() {
        let mut store = store_over(Arc::new(UnreachableRegistry));
        let err = store.load("/robot").unwrap_err();

        assert_eq!(err, ParamError::Registry("master unreachable".to_string()));
        assert!(store.is_empty());
        assert_eq!(store.namespaces().collect::<Vec<_>>(), vec!["/robot/"]);
    }

    #[test]
    fn failed_reload_leaves_partial_entries() {
        let inner = MemoryRegistry::new();
        inner.set("/a/x", 1).unwrap();
        inner.set("/b/y", 2).unwrap();
        let registry = FlakyRegistry::new(inner);
        let mut store = store_over(registry.clone());
        store.load("/a").unwrap();
        store.load("/b").unwrap();

        registry.break_name("/b/y");
        assert!(matches!(store.reload(), Err(ParamError::Registry(_))));
        assert_eq!(store.get_keys(), vec!["x"]);
    }

    #[test]
    fn reload_queries_registry_once_per_namespace() {
        let inner = MemoryRegistry::new();
        inner.set("/a/x", 1).unwrap();
        let registry = FlakyRegistry::new(inner);
        let mut store = store_over(registry.clone());

        store.load("/a").unwrap();
        store.load("/b").unwrap();
        store.load("/a").unwrap();
        registry.listings.store(0, Ordering::SeqCst);

        store.reload().unwrap();
        assert_eq!(registry.listings.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn grace_period_delays_load() {
        let config = StoreConfig::immediate().with_grace_period(std::time::Duration::from_millis(20));
        let mut store =
            ParamStore::with_config(robot_registry(), Arc::new(FixedContext::root()), config);

        let started = std::time::Instant::now();
        store.load("/robot").unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(20));
    }

    #[test]
    fn debug_output_lists_namespaces() {
        let mut store = store_over(robot_registry());
        store.load("robot").unwrap();
        let debug_str = format!("{store:?}");
        assert!(debug_str.contains("robot/"));
        assert!(debug_str.contains("speed"));
    }
}
