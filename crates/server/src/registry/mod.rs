mod record;
mod store;

pub use record::{AgentRecord, Liveness};
pub use store::{AgentFilter, AgentRegistry};
