//! Storage module - consensus stores and chain state management

mod memory;
mod state;
mod stores;
pub mod db;

pub use db::DbStores;
pub use memory::*;
pub use state::*;
pub use stores::*;
