// Consensus rules: proof of work and block validation

pub mod pow;
pub mod validation;

pub use pow::{Miner, MiningResult, Target};
pub use validation::{BlockValidator, ValidationError};
