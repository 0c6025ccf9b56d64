//! Consensus module - blocks, rewards, difficulty and validation

mod amount;
mod block;
mod coinbase;
mod difficulty;
mod model;
mod params;
mod payload;
mod subsidy;
mod transaction;
mod validation;

pub use amount::*;
pub use block::*;
pub use coinbase::*;
pub use difficulty::*;
pub use model::*;
pub use params::*;
pub use payload::*;
pub use subsidy::*;
pub use transaction::*;
pub use validation::*;
