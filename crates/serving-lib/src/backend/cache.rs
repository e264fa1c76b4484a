//! Populate-once cache for persisted model artifacts
//!
//! Holds at most one loaded model per artifact path. The mutex is held for
//! the whole check-then-load, so concurrent first callers wait for a single
//! load and then all observe the same instance. Entries are never evicted.

use super::ArtifactModel;
use crate::error::{DispatchError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Slots = HashMap<PathBuf, Arc<dyn ArtifactModel>>;

#[derive(Default)]
pub struct ModelCache {
    slots: Mutex<Slots>,
    loads: AtomicU64,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `path`, running `load` only if absent.
    ///
    /// The boolean is true when this call performed the load. A failed load
    /// leaves the slot empty so a later call can try again.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> Result<(Arc<dyn ArtifactModel>, bool)>
    where
        F: FnOnce(&Path) -> Result<Arc<dyn ArtifactModel>>,
    {
        let mut slots = self.slots()?;

        if let Some(cached) = slots.get(path) {
            return Ok((Arc::clone(cached), false));
        }

        let model = load(path)?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        slots.insert(path.to_path_buf(), Arc::clone(&model));
        debug!(path = %path.display(), "Model cached");
        Ok((model, true))
    }

    pub fn get(&self, path: &Path) -> Result<Option<Arc<dyn ArtifactModel>>> {
        Ok(self.slots()?.get(path).map(Arc::clone))
    }

    pub fn contains(&self, path: &Path) -> Result<bool> {
        Ok(self.slots()?.contains_key(path))
    }

    /// Number of successful loads performed through this cache
    #[cfg(test)]
    pub(crate) fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// A panic inside a loader poisons the mutex; every accessor reports it
    fn slots(&self) -> Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|e| DispatchError::Internal(format!("Lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassId;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    struct ConstantModel(ClassId);

    impl ArtifactModel for ConstantModel {
        fn predict(&self, _features: &[f32]) -> Result<ClassId> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_loads_once() {
        let cache = ModelCache::new();
        let path = Path::new("model.onnx");
        let (_, first) = cache
            .get_or_load(path, |_| Ok(Arc::new(ConstantModel(3))))
            .unwrap();
        let (model, second) = cache
            .get_or_load(path, |_| panic!("must not reload"))
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(model.predict(&[]).unwrap(), 3);
        assert_eq!(cache.load_count(), 1);
        assert!(cache.contains(path).unwrap());
    }

    #[test]
    fn test_failed_load_leaves_slot_empty() {
        let cache = ModelCache::new();
        let path = Path::new("broken.onnx");
        let err = cache
            .get_or_load(path, |p| Err(DispatchError::model_load(p, "corrupt")))
            .err()
            .unwrap();
        assert!(matches!(err, DispatchError::ModelLoad { .. }));
        assert!(!cache.contains(path).unwrap());
        assert_eq!(cache.load_count(), 0);

        cache
            .get_or_load(path, |_| Ok(Arc::new(ConstantModel(1))))
            .unwrap();
        assert!(cache.contains(path).unwrap());
    }

    #[test]
    fn test_poisoned_lock_is_internal_everywhere() {
        let cache = Arc::new(ModelCache::new());
        let path = Path::new("panics.onnx");

        let poisoner = Arc::clone(&cache);
        let joined = thread::spawn(move || {
            let _ = poisoner.get_or_load(Path::new("panics.onnx"), |_| panic!("loader crashed"));
        })
        .join();
        assert!(joined.is_err());

        assert!(matches!(cache.get(path), Err(DispatchError::Internal(_))));
        assert!(matches!(cache.contains(path), Err(DispatchError::Internal(_))));
        assert!(matches!(
            cache.get_or_load(path, |_| Ok(Arc::new(ConstantModel(2)))),
            Err(DispatchError::Internal(_))
        ));
    }

    #[test]
    fn test_concurrent_first_loads_run_once() {
        let cache = Arc::new(ModelCache::new());
        let attempts = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let attempts = Arc::clone(&attempts);
                thread::spawn(move || {
                    cache
                        .get_or_load(Path::new("shared.onnx"), |_| {
                            attempts.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(Arc::new(ConstantModel(5)))
                        })
                        .map(|(model, _)| model.predict(&[]).unwrap())
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 5);
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(cache.load_count(), 1);
    }
}
