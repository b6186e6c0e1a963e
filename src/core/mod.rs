// Core data structures, codec and crypto primitives

mod block;
pub mod ecdsa;
pub mod hash;
mod serialize;
mod transaction;
mod types;

pub use block::*;
pub use hash::*;
pub use serialize::*;
pub use transaction::*;
pub use types::*;
