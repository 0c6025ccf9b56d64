//! Node module - genesis blocks

mod genesis;

pub use genesis::*;
