mod agents;
mod alerts;
mod commands;
mod health;
mod heartbeat;
mod logs;
mod router;
mod topology;

pub use router::{router, AppState};
