//! HARBI blockDAG node core
//!
//! Coinbase rewards and the subsidy schedule, merkle commitments and the
//! FishHash proof of work, plus the storage, mining and configuration a
//! node needs around them.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod mining;
pub mod node;
pub mod pow;
pub mod storage;

/// Protocol constants - HARD-CODED, NEVER CONFIGURABLE
pub mod constants {
    /// Base units (leor) in one HAR
    pub const LEOR_PER_HARBI: u64 = 100_000_000;

    /// Number of decimal places
    pub const DECIMAL_PLACES: u8 = 8;

    /// Version stamped on coinbase transactions
    pub const MAX_TRANSACTION_VERSION: u16 = 0;

    /// Chain name (short form for amounts and logs)
    pub const CHAIN_NAME: &str = "HAR";

    /// Full chain name
    pub const CHAIN_FULL_NAME: &str = "HARBI";

    /// Genesis timestamp (milliseconds since Unix epoch)
    pub const GENESIS_TIMESTAMP: i64 = 1_715_522_400_000;

    /// Text committed in the genesis coinbase extra data
    pub const GENESIS_MESSAGE: &[u8] = b"HARBI genesis - fair launch, no premine";
}
