mod memory_store;
mod signal_store;
mod signaling_channel;
mod signaling_output;

pub use memory_store::*;
pub use signal_store::*;
pub use signaling_channel::*;
pub use signaling_output::*;
