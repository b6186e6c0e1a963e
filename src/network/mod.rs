// Verification driver and the node wrapper around it

mod driver;
mod message;
mod node;
mod orphans;

pub use driver::{BlockOutcome, Driver, MAX_GETBLOCKS_REPLY};
pub use message::{
    InvItem, InvType, Message, MessageType, MAX_INV_ENTRIES, MAX_LOCATOR_ENTRIES, PROTOCOL_VERSION,
};
pub use node::Node;
pub use orphans::OrphanPool;
