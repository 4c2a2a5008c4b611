mod queue;
mod sweep;

pub use queue::{CommandQueue, QueueStats};
pub use sweep::run_timeout_sweep;
