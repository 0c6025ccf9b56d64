//! Mining module - block templates and proof-of-work workers

mod miner;
mod template;

pub use miner::*;
pub use template::*;

use thiserror::Error;

use crate::consensus::CoinbaseError;
use crate::pow::PowError;
use crate::storage::ChainError;

#[derive(Debug, Error)]
pub enum MiningError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("cannot build coinbase: {0}")]
    Coinbase(#[from] CoinbaseError),

    #[error(transparent)]
    Pow(#[from] PowError),

    #[error("failed to spawn mining worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type MiningResult<T> = Result<T, MiningError>;
