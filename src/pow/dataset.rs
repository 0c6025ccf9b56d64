//! Light cache and dataset items
//!
//! The light cache is a chain of Keccak-512 hashes of the seed, shuffled in
//! place for a few rounds. Every 128-byte dataset item is derived from 512
//! pseudo-randomly chosen light cache items.

use dashmap::DashMap;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::*;

/// Dataset items logged after the dataset becomes ready
pub const SAMPLE_ITEMS: [u32; 3] = [10, 42, 12345];

/// The light cache
pub struct LightCache {
    items: Vec<Hash512>,
}

impl LightCache {
    pub fn build(num_items: u32) -> Self {
        let n = num_items.max(1) as usize;
        let mut items = Vec::with_capacity(n);
        items.push(keccak512(&SEED));
        for i in 1..n {
            let next = keccak512(&items[i - 1].0);
            items.push(next);
        }

        for _ in 0..LIGHT_CACHE_ROUNDS {
            for i in 0..n {
                let v = items[i].word32(0) as usize % n;
                let w = (n + i - 1) % n;
                let x = items[v].xor(&items[w]);
                items[i] = keccak512(&x.0);
            }
        }

        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> &Hash512 {
        &self.items[index]
    }
}

/// One half of a dataset item
struct ItemState<'a> {
    cache: &'a LightCache,
    seed: u32,
    mix: Hash512,
}

impl<'a> ItemState<'a> {
    fn new(cache: &'a LightCache, index: u64) -> Self {
        let seed = index as u32;
        let mut mix = *cache.get((index % cache.len() as u64) as usize);
        mix.set_word32(0, mix.word32(0) ^ seed);
        Self {
            cache,
            seed,
            mix: keccak512(&mix.0),
        }
    }

    fn update(&mut self, round: u32) {
        let t = fnv1(self.seed ^ round, self.mix.word32((round % 16) as usize));
        let parent = (t % self.cache.len() as u32) as usize;
        self.mix = fnv1_hash512(&self.mix, self.cache.get(parent));
    }

    fn finalize(self) -> Hash512 {
        keccak512(&self.mix.0)
    }
}

/// Derive dataset item `index` from the light cache
pub fn calculate_dataset_item(cache: &LightCache, index: u32) -> Hash1024 {
    let mut first = ItemState::new(cache, index as u64 * 2);
    let mut second = ItemState::new(cache, index as u64 * 2 + 1);

    for round in 0..FULL_DATASET_ITEM_PARENTS {
        first.update(round);
        second.update(round);
    }

    Hash1024::merge(&first.finalize(), &second.finalize())
}

/// A fully generated dataset
pub struct FullDataset {
    items: Vec<Hash1024>,
}

impl FullDataset {
    /// Generate every item. The index range is split into one contiguous
    /// segment per thread.
    pub fn generate(cache: &LightCache, num_items: u32, threads: usize) -> PowResult<Self> {
        let threads = threads.max(1);
        let mut items = vec![Hash1024::zero(); num_items as usize];
        let segment = (items.len() / threads).max(1);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        pool.install(|| {
            items.par_chunks_mut(segment).enumerate().for_each(|(chunk, slots)| {
                let start = chunk * segment;
                for (offset, slot) in slots.iter_mut().enumerate() {
                    *slot = calculate_dataset_item(cache, (start + offset) as u32);
                }
            })
        });

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&Hash1024> {
        self.items.get(index as usize)
    }

    /// Write the items in index order, no header
    pub fn save(&self, path: &Path) -> PowResult<()> {
        let io_err = |source| PowError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        for item in &self.items {
            writer.write_all(&item.0).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    /// Load a dataset file. Returns `None` when the file does not exist or
    /// does not hold exactly `num_items` items.
    pub fn load(path: &Path, num_items: u32) -> PowResult<Option<Self>> {
        let io_err = |source| PowError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(err)),
        };

        let expected = num_items as u64 * Hash1024::SIZE as u64;
        let actual = file.metadata().map_err(io_err)?.len();
        if actual != expected {
            warn!(path = %path.display(), expected, actual, "dataset file has the wrong size, ignoring it");
            return Ok(None);
        }

        let mut reader = BufReader::new(file);
        let mut items = vec![Hash1024::zero(); num_items as usize];
        for item in items.iter_mut() {
            reader.read_exact(&mut item.0).map_err(io_err)?;
        }
        Ok(Some(Self { items }))
    }

    /// Load the dataset from the configured file, or generate it and save it
    /// there for the next start.
    pub fn load_or_generate(cache: &LightCache, config: &PowConfig) -> PowResult<Self> {
        if let Some(path) = &config.dataset_file {
            info!(path = %path.display(), "looking for a stored dataset");
            if let Some(dataset) = Self::load(path, config.full_dataset_items)? {
                info!("dataset loaded from local storage");
                dataset.log_samples();
                return Ok(dataset);
            }
            info!("no usable dataset file found");
        }

        info!(
            items = config.full_dataset_items,
            threads = config.build_threads,
            "generating dataset, this may take a while"
        );
        let started = Instant::now();
        let dataset = Self::generate(cache, config.full_dataset_items, config.build_threads)?;
        info!(elapsed = ?started.elapsed(), "dataset generated");
        dataset.log_samples();

        if let Some(path) = &config.dataset_file {
            info!(path = %path.display(), "saving dataset");
            dataset.save(path)?;
        }
        Ok(dataset)
    }

    fn log_samples(&self) {
        for index in SAMPLE_ITEMS {
            if let Some(item) = self.get(index) {
                debug!("dataset item [{}]: {:?}", index, item);
            }
        }
    }
}

/// Dataset items computed on first access and kept.
///
/// Each index is computed once even under concurrent lookups: the map
/// shard stays locked while the item is derived.
pub struct LazyDataset {
    items: DashMap<u32, Hash1024>,
}

impl LazyDataset {
    pub fn new() -> Self {
        Self { items: DashMap::new() }
    }

    pub fn get_or_compute(&self, cache: &LightCache, index: u32) -> Hash1024 {
        *self
            .items
            .entry(index)
            .or_insert_with(|| calculate_dataset_item(cache, index))
    }

    #[cfg(test)]
    fn computed(&self) -> usize {
        self.items.len()
    }
}

impl Default for LazyDataset {
    fn default() -> Self {
        Self::new()
    }
}

/// Dataset backing a context
pub enum Dataset {
    Lazy(LazyDataset),
    Full(FullDataset),
}
