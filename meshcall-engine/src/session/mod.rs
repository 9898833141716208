mod call_event;
mod call_session;
mod orchestrator;
mod session_command;
mod snapshot;

pub use call_event::*;
pub use call_session::*;
pub use orchestrator::*;
pub use session_command::*;
pub use snapshot::*;
