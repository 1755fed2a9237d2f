use crate::error::{PipelineError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

// Cache stores WEAK references - models are freed when all oracles using them drop.
type CacheStorage = HashMap<(TypeId, String), Box<dyn Any + Send + Sync>>;

pub struct ModelCache {
    cache: Mutex<CacheStorage>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn storage(&self) -> Result<MutexGuard<'_, CacheStorage>> {
        self.cache
            .lock()
            .map_err(|_| PipelineError::Unexpected("Model cache lock poisoned".to_string()))
    }

    pub fn get_or_create<M, F>(&self, key: &str, loader: F) -> Result<Arc<M>>
    where
        M: Send + Sync + 'static,
        F: FnOnce() -> Result<M>,
    {
        let cache_key = (TypeId::of::<M>(), key.to_string());

        {
            let mut cache = self.storage()?;
            let live = cache
                .get(&cache_key)
                .and_then(|boxed| boxed.downcast_ref::<Weak<M>>())
                .and_then(Weak::upgrade);
            if let Some(strong) = live {
                tracing::trace!(key, "model cache hit");
                return Ok(strong);
            }
            // Weak ref dead (or never set), drop any stale entry
            cache.remove(&cache_key);
        }

        // Loading happens outside the lock; two racing loads both succeed and the last one is kept.
        let model = Arc::new(loader()?);
        self.storage()?
            .insert(cache_key, Box::new(Arc::downgrade(&model)));

        Ok(model)
    }

    #[cfg(test)]
    pub fn clear(&self) -> Result<()> {
        self.storage()?.clear();
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.storage().map(|c| c.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}
