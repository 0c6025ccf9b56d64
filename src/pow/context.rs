//! Shared proof-of-work context
//!
//! Building the light cache takes seconds and the full dataset minutes, so
//! a process builds each at most once and hands out `Arc`s. A context is
//! never mutated after construction; asking for the full dataset when only
//! the light cache exists builds a new context around the same light cache.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::*;

pub struct PowContext {
    light_cache: Arc<LightCache>,
    dataset: Dataset,
    dataset_items: u32,
}

impl PowContext {
    /// Build a context from scratch
    pub fn build(config: &PowConfig, full: bool) -> PowResult<Self> {
        info!(items = config.light_cache_items, "building light cache");
        let started = Instant::now();
        let light_cache = Arc::new(LightCache::build(config.light_cache_items));
        debug!(elapsed = ?started.elapsed(), "light cache built");
        debug!("light cache item [0]: {:?}", light_cache.get(0));
        Self::with_light_cache(light_cache, config, full)
    }

    /// Build a context around an existing light cache
    pub fn with_light_cache(light_cache: Arc<LightCache>, config: &PowConfig, full: bool) -> PowResult<Self> {
        let dataset = if full {
            Dataset::Full(FullDataset::load_or_generate(&light_cache, config)?)
        } else {
            info!("full dataset skipped, items will be computed on demand");
            Dataset::Lazy(LazyDataset::new())
        };
        Ok(Self {
            light_cache,
            dataset,
            dataset_items: config.full_dataset_items,
        })
    }

    /// Dataset item `index`, computing it from the light cache if needed
    pub fn lookup(&self, index: u32) -> Hash1024 {
        match &self.dataset {
            Dataset::Full(dataset) => match dataset.get(index) {
                Some(item) => *item,
                None => calculate_dataset_item(&self.light_cache, index),
            },
            Dataset::Lazy(dataset) => dataset.get_or_compute(&self.light_cache, index),
        }
    }

    /// Number of dataset items the kernels index into
    pub fn dataset_items(&self) -> u32 {
        self.dataset_items
    }

    /// True once the full dataset is in memory
    pub fn is_full(&self) -> bool {
        matches!(self.dataset, Dataset::Full(_))
    }

    pub fn light_cache(&self) -> &Arc<LightCache> {
        &self.light_cache
    }
}

/// Builds the context once and escalates it to a full dataset on demand
pub struct ContextCache {
    config: PowConfig,
    current: Mutex<Option<Arc<PowContext>>>,
}

impl ContextCache {
    pub fn new(config: PowConfig) -> Self {
        Self {
            config,
            current: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PowConfig {
        &self.config
    }

    /// The shared context; with `require_full` it is guaranteed to hold the
    /// full dataset.
    pub fn get(&self, require_full: bool) -> PowResult<Arc<PowContext>> {
        let mut current = self.current.lock();

        let context = match current.as_ref() {
            Some(context) if !require_full || context.is_full() => return Ok(context.clone()),
            Some(context) => {
                debug!("escalating proof-of-work context to the full dataset");
                PowContext::with_light_cache(context.light_cache().clone(), &self.config, true)?
            }
            None => PowContext::build(&self.config, require_full)?,
        };

        let context = Arc::new(context);
        *current = Some(context.clone());
        Ok(context)
    }

    /// The context built so far, without building anything
    pub fn current(&self) -> Option<Arc<PowContext>> {
        self.current.lock().clone()
    }
}
