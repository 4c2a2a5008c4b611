mod coordinator;
mod validate;

pub use coordinator::{HeartbeatAck, IngestCoordinator, IngestReceipt};
pub use validate::{RejectReason, Rejection};
