//! Block miner implementation
//!
//! Worker threads hash the current template from a random starting nonce
//! and hand solved blocks to the node over an async channel.

use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{BlockTemplate, MiningResult, TemplateManager};
use crate::consensus::Block;
use crate::pow::State;

/// How often the hash rate is logged
pub const LOG_HASH_RATE_INTERVAL: Duration = Duration::from_secs(10);

const WAIT_FOR_TEMPLATE: Duration = Duration::from_millis(500);
const WAIT_AFTER_SOLVE: Duration = Duration::from_millis(20);

/// A template solved by a worker
#[derive(Debug)]
pub struct FoundBlock {
    pub block: Block,
    pub template: Arc<BlockTemplate>,
}

/// Block miner
#[derive(Clone)]
pub struct Miner {
    templates: Arc<TemplateManager>,
    /// Hashes since the last hash-rate report
    hashes_tried: Arc<AtomicU64>,
    /// Stop signal
    stop_signal: Arc<AtomicBool>,
    /// Highest template generation a worker has solved
    solved_generation: Arc<AtomicU64>,
}

impl Miner {
    /// Create a new miner working on `templates`
    pub fn new(templates: Arc<TemplateManager>) -> Self {
        Self {
            templates,
            hashes_tried: Arc::new(AtomicU64::new(0)),
            stop_signal: Arc::new(AtomicBool::new(false)),
            solved_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn templates(&self) -> &Arc<TemplateManager> {
        &self.templates
    }

    /// Get a stop signal handle
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Stop mining
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Reset stop signal
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Hashes tried since the last report
    pub fn hashes_tried(&self) -> u64 {
        self.hashes_tried.load(Ordering::Relaxed)
    }

    /// Claim `generation` for the calling worker. Only the first worker to
    /// solve a generation gets to submit its block.
    fn claim_generation(&self, generation: u64) -> bool {
        let mut solved = self.solved_generation.load(Ordering::SeqCst);
        while solved < generation {
            match self
                .solved_generation
                .compare_exchange(solved, generation, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(actual) => solved = actual,
            }
        }
        false
    }

    /// Spawn `threads` mining workers
    pub fn spawn_workers(
        &self,
        threads: usize,
        found: mpsc::Sender<FoundBlock>,
    ) -> MiningResult<Vec<thread::JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(threads.max(1));
        for i in 0..threads.max(1) {
            let miner = self.clone();
            let found = found.clone();
            let handle = thread::Builder::new()
                .name(format!("mining-worker-{i}"))
                .spawn(move || miner.mine_worker(found))?;
            handles.push(handle);
        }
        info!(threads = handles.len(), "mining workers started");
        Ok(handles)
    }

    fn mine_worker(&self, found: mpsc::Sender<FoundBlock>) {
        let mut nonce: u64 = rand::thread_rng().gen();
        let mut current: Option<(Arc<BlockTemplate>, State, u64)> = None;

        while !self.is_stopped() {
            let generation = self.templates.generation();
            if current.as_ref().map_or(true, |(_, _, g)| *g != generation) {
                current = self.templates.get();
            }
            let Some((template, state, generation)) = current.as_mut() else {
                thread::sleep(WAIT_FOR_TEMPLATE);
                continue;
            };
            // One block per template across all workers; the next one builds on it
            if *generation <= self.solved_generation.load(Ordering::SeqCst) {
                thread::sleep(WAIT_AFTER_SOLVE);
                continue;
            }

            nonce = nonce.wrapping_add(1);
            state.nonce = nonce;
            self.hashes_tried.fetch_add(1, Ordering::Relaxed);

            if state.check_proof_of_work() && self.claim_generation(*generation) {
                let mut block = template.block.clone();
                block.header.nonce = nonce;
                info!("Found block {} with parents {:?}", block.hash(), block.header.direct_parents());

                let found_block = FoundBlock {
                    block,
                    template: template.clone(),
                };
                if found.blocking_send(found_block).is_err() {
                    debug!("found-block channel closed, worker exiting");
                    return;
                }
            }
        }
    }

    /// Try up to `max_tries` nonces on one template from the calling thread
    pub fn mine_block(&self, template: &BlockTemplate, mut state: State, max_tries: u64) -> Option<Block> {
        for _ in 0..max_tries {
            if self.is_stopped() {
                return None;
            }
            self.hashes_tried.fetch_add(1, Ordering::Relaxed);
            if state.check_proof_of_work() {
                let mut block = template.block.clone();
                block.header.nonce = state.nonce;
                return Some(block);
            }
            state.increment_nonce();
        }
        None
    }

    /// Log the hash rate every [`LOG_HASH_RATE_INTERVAL`] until stopped.
    /// Before the first template arrives the dataset is still being built.
    pub async fn log_hash_rate(self) {
        let mut ticker = tokio::time::interval(LOG_HASH_RATE_INTERVAL);
        ticker.tick().await;
        let mut last_check = Instant::now();

        while !self.is_stopped() {
            ticker.tick().await;
            if self.templates.generation() == 0 {
                info!("Generating DAG, please wait ...");
                continue;
            }

            let tried = self.hashes_tried.swap(0, Ordering::Relaxed);
            let now = Instant::now();
            let elapsed = now.duration_since(last_check).as_secs_f64().max(f64::EPSILON);
            info!("Current hash rate is {:.2} Khash/s", tried as f64 / 1000.0 / elapsed);
            last_check = now;
        }
    }
}
