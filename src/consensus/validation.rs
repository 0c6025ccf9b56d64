//! Block validation
//!
//! Pure checks of a block against its proof of work, its merkle
//! commitments and the coinbase the reward manager expects.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::payload::{extract_coinbase_data_blue_score_and_subsidy, PayloadError};
use super::{Block, BlockHeader, CoinbaseError, CoinbaseManager, Params, Transaction};
use crate::crypto::{calculate_hash_merkle_root, calculate_id_merkle_root, Hash};
use crate::pow::{PowContext, State};
use crate::storage::StagingArea;

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid proof of work")]
    InvalidPoW,
    #[error("Invalid hash merkle root: expected {expected}, got {got}")]
    InvalidHashMerkleRoot { expected: Hash, got: Hash },
    #[error("Invalid accepted id merkle root: expected {expected}, got {got}")]
    InvalidAcceptedIdMerkleRoot { expected: Hash, got: Hash },
    #[error("Block has no transactions")]
    MissingCoinbase,
    #[error("First transaction is not a coinbase")]
    FirstTransactionNotCoinbase,
    #[error("Transaction {0} is a second coinbase")]
    MultipleCoinbases(usize),
    #[error("Coinbase transaction has inputs")]
    CoinbaseHasInputs,
    #[error("Bad coinbase payload: {0}")]
    BadCoinbasePayload(#[from] PayloadError),
    #[error("Coinbase transaction {got} differs from the expected {expected}")]
    BadCoinbaseTransaction { expected: Hash, got: Hash },
    #[error(transparent)]
    Coinbase(#[from] CoinbaseError),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate proof of work against the header's own bits
pub fn validate_pow(header: &BlockHeader, context: &Arc<PowContext>) -> ValidationResult<()> {
    if !State::with_context(header, context.clone()).check_proof_of_work() {
        return Err(ValidationError::InvalidPoW);
    }
    Ok(())
}

/// Validate the hash merkle root against the block's transactions
pub fn validate_hash_merkle_root(block: &Block) -> ValidationResult<()> {
    let computed = calculate_hash_merkle_root(&block.transactions);
    if computed != block.header.hash_merkle_root {
        return Err(ValidationError::InvalidHashMerkleRoot {
            expected: computed,
            got: block.header.hash_merkle_root,
        });
    }
    Ok(())
}

/// Validate the accepted id merkle root against the transactions the block
/// accepts from its merge set
pub fn validate_accepted_id_merkle_root(header: &BlockHeader, accepted: &[Transaction]) -> ValidationResult<()> {
    let computed = calculate_id_merkle_root(accepted);
    if computed != header.accepted_id_merkle_root {
        return Err(ValidationError::InvalidAcceptedIdMerkleRoot {
            expected: computed,
            got: header.accepted_id_merkle_root,
        });
    }
    Ok(())
}

/// Validate both merkle commitments
pub fn validate_merkle_roots(block: &Block, accepted: &[Transaction]) -> ValidationResult<()> {
    validate_hash_merkle_root(block)?;
    validate_accepted_id_merkle_root(&block.header, accepted)
}

/// Structural coinbase rules: it comes first, it is the only one, it has no
/// inputs and its payload parses
pub fn validate_coinbase_payload(block: &Block, params: &Params) -> ValidationResult<()> {
    let coinbase = block.coinbase().ok_or(ValidationError::MissingCoinbase)?;
    if !coinbase.is_coinbase() {
        return Err(ValidationError::FirstTransactionNotCoinbase);
    }
    if !coinbase.inputs.is_empty() {
        return Err(ValidationError::CoinbaseHasInputs);
    }
    if let Some(index) = block.transactions.iter().skip(1).position(Transaction::is_coinbase) {
        return Err(ValidationError::MultipleCoinbases(index + 1));
    }
    extract_coinbase_data_blue_score_and_subsidy(coinbase, params.coinbase_payload_script_public_key_max_len)?;
    Ok(())
}

/// The block's coinbase must be exactly the one the reward manager builds
/// from the miner data in its payload
pub fn validate_coinbase(manager: &CoinbaseManager, staging: &StagingArea, block: &Block) -> ValidationResult<()> {
    let coinbase = block.coinbase().ok_or(ValidationError::MissingCoinbase)?;
    let (_, coinbase_data, _) = manager.extract_coinbase_data_blue_score_and_subsidy(coinbase)?;

    let block_hash = block.hash();
    let (expected, _) = manager.expected_coinbase_transaction(staging, &block_hash, &coinbase_data)?;
    if expected.hash() != coinbase.hash() {
        debug!(block = %block_hash, "coinbase mismatch: expected {:?}, got {:?}", expected, coinbase);
        return Err(ValidationError::BadCoinbaseTransaction {
            expected: expected.hash(),
            got: coinbase.hash(),
        });
    }
    Ok(())
}

/// Full validation of a block whose consensus data is staged under its hash
pub fn validate_block(
    block: &Block,
    params: &Params,
    context: &Arc<PowContext>,
    manager: &CoinbaseManager,
    staging: &StagingArea,
    accepted: &[Transaction],
) -> ValidationResult<()> {
    validate_pow(&block.header, context)?;
    validate_coinbase_payload(block, params)?;
    validate_merkle_roots(block, accepted)?;
    validate_coinbase(manager, staging, block)?;
    Ok(())
}
