//! Executor Resolver — caches `(module_id, node_type_id) -> ExecutableNode`
//! lookups so the runner doesn't pay a lookup/allocation cost on every
//! node visit. The cache must be invalidated whenever a module is
//! enabled or disabled, since that can change which constructors are
//! available; callers that hold both an [`ExecutorResolver`] and a
//! [`crate::ModuleRegistry`] are responsible for calling
//! [`ExecutorResolver::invalidate`] after any toggle.

use std::sync::Arc;

use dashmap::DashMap;
use nodes::ExecutableNode;

use crate::ModuleRegistry;

pub type NodeConstructor = Arc<dyn Fn() -> Arc<dyn ExecutableNode> + Send + Sync>;

#[derive(Clone, Eq, PartialEq, Hash)]
struct CacheKey {
    module_id: String,
    node_type_id: String,
}

pub struct ExecutorResolver {
    module_registry: Arc<ModuleRegistry>,
    constructors: DashMap<CacheKey, NodeConstructor>,
    cache: DashMap<CacheKey, Arc<dyn ExecutableNode>>,
}

impl ExecutorResolver {
    pub fn new(module_registry: Arc<ModuleRegistry>) -> Self {
        Self {
            module_registry,
            constructors: DashMap::new(),
            cache: DashMap::new(),
        }
    }

    /// Register a constructor for a `(module_id, node_type_id)` pair.
    /// Typically called once at startup for every built-in and
    /// discovered module node type.
    pub fn register(
        &self,
        module_id: impl Into<String>,
        node_type_id: impl Into<String>,
        constructor: NodeConstructor,
    ) {
        let key = CacheKey {
            module_id: module_id.into(),
            node_type_id: node_type_id.into(),
        };
        self.constructors.insert(key, constructor);
    }

    /// Resolve an executor, constructing and caching it on first use.
    /// Returns `None` if the owning module is disabled or no constructor
    /// is registered for this node type.
    pub fn resolve(&self, module_id: &str, node_type_id: &str) -> Option<Arc<dyn ExecutableNode>> {
        if !self.module_registry.is_enabled(module_id) {
            return None;
        }

        let key = CacheKey {
            module_id: module_id.to_string(),
            node_type_id: node_type_id.to_string(),
        };

        if let Some(cached) = self.cache.get(&key) {
            return Some(cached.clone());
        }

        let constructor = self.constructors.get(&key)?.clone();
        let executor = constructor();
        self.cache.insert(key, executor.clone());
        Some(executor)
    }

    /// Drop every cached executor instance. Constructors stay registered;
    /// the next `resolve` call rebuilds from scratch, mirroring a hot
    /// module reload picking up fresh code.
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::mock::MockNode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry_with(module_id: &str, enabled: bool) -> Arc<ModuleRegistry> {
        let tmp = tempfile::tempdir().unwrap();
        let module_dir = tmp.path().join(module_id);
        std::fs::create_dir_all(&module_dir).unwrap();
        let meta = serde_json::json!({ "name": module_id, "enabled": enabled, "order": 1 });
        std::fs::write(module_dir.join("module.json"), serde_json::to_vec(&meta).unwrap()).unwrap();
        // Leak the tempdir for the duration of the test so the directory
        // isn't cleaned up before discovery runs.
        let path = tmp.into_path();
        Arc::new(ModuleRegistry::discover(path).unwrap())
    }

    #[test]
    fn disabled_module_resolves_to_none() {
        let module_registry = registry_with("logic", false);
        let resolver = ExecutorResolver::new(module_registry);
        resolver.register("logic", "trigger", Arc::new(|| Arc::new(MockNode::returning("t", serde_json::json!({})))));

        assert!(resolver.resolve("logic", "trigger").is_none());
    }

    #[test]
    fn resolve_caches_constructed_instance() {
        let module_registry = registry_with("logic", true);
        let resolver = ExecutorResolver::new(module_registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        resolver.register(
            "logic",
            "trigger",
            Arc::new(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Arc::new(MockNode::returning("t", serde_json::json!({})))
            }),
        );

        resolver.resolve("logic", "trigger").unwrap();
        resolver.resolve("logic", "trigger").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_reconstruction() {
        let module_registry = registry_with("logic", true);
        let resolver = ExecutorResolver::new(module_registry);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        resolver.register(
            "logic",
            "trigger",
            Arc::new(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Arc::new(MockNode::returning("t", serde_json::json!({})))
            }),
        );

        resolver.resolve("logic", "trigger").unwrap();
        resolver.invalidate();
        resolver.resolve("logic", "trigger").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregistered_node_type_resolves_to_none() {
        let module_registry = registry_with("logic", true);
        let resolver = ExecutorResolver::new(module_registry);
        assert!(resolver.resolve("logic", "nonexistent").is_none());
    }
}
