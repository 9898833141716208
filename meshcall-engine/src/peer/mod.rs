mod negotiation;
mod offer_delay;
mod peer_entry;
mod peer_manager;
mod remote_streams;

pub use negotiation::*;
pub use offer_delay::*;
pub use peer_entry::*;
pub use peer_manager::*;
pub use remote_streams::*;
