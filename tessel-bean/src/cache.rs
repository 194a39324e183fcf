//! Memoized per-type models.
//!
//! A model is built at most once per type, even when several threads ask for
//! a new type at the same time: the first caller inserts an empty cell under
//! the write lock, and the cell's [`OnceLock`] runs exactly one build. The
//! outcome is cached too, so a type that failed introspection keeps failing
//! the same way.

use core::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tessel_core::IntrospectionError;

use crate::TypeKey;
use crate::tracing_macros::debug;

type Cell<M> = Arc<OnceLock<Result<Arc<M>, IntrospectionError>>>;

/// Concurrent map from type to its built model.
pub struct ModelCache<M> {
    cells: RwLock<HashMap<TypeId, Cell<M>>>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }
}

impl<M> ModelCache<M> {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The model for `key`, running `build` if nobody has yet.
    ///
    /// `build` must not ask this cache for the same key.
    pub fn get_or_build(
        &self,
        key: TypeKey,
        build: impl FnOnce() -> Result<M, IntrospectionError>,
    ) -> Result<Arc<M>, IntrospectionError> {
        // Fast path: the cell usually exists already
        let cell = self.cells.read().get(&key.id()).cloned();
        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut cells = self.cells.write();
                // Another thread may have inserted it between the two locks
                cells.entry(key.id()).or_default().clone()
            }
        };

        cell.get_or_init(|| {
            debug!("building model for {}", key.name());
            build().map(Arc::new)
        })
        .clone()
    }

    /// Number of types with a cell, built or in progress.
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    /// Whether nothing was requested yet.
    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tessel_testhelpers::test;

    struct Model(usize);

    #[test]
    fn concurrent_first_use_builds_once() {
        let cache = ModelCache::<Model>::new();
        let builds = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let models: Vec<Arc<Model>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_build(TypeKey::of::<Model>(), || {
                                std::thread::sleep(std::time::Duration::from_millis(10));
                                Ok(Model(builds.fetch_add(1, Ordering::SeqCst)))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
        assert_eq!(models[0].0, 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_cached() {
        let cache = ModelCache::<Model>::new();
        let key = TypeKey::of::<u8>();
        let first = cache.get_or_build(key, || {
            Err(IntrospectionError::NotIntrospected { type_name: "u8" })
        });
        let second = cache.get_or_build(key, || Ok(Model(1)));
        assert!(first.is_err());
        assert_eq!(first.err(), second.err());
    }
}
