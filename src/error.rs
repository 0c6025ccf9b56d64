//! Node-level errors

use thiserror::Error;

use crate::config::ConfigError;
use crate::consensus::{CoinbaseError, ValidationError};
use crate::mining::MiningError;
use crate::pow::PowError;
use crate::storage::{ChainError, StoreError};

/// Any error that stops the node
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("coinbase error: {0}")]
    Coinbase(#[from] CoinbaseError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("proof-of-work error: {0}")]
    Pow(#[from] PowError),

    #[error("mining error: {0}")]
    Mining(#[from] MiningError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type NodeResult<T> = Result<T, NodeError>;
