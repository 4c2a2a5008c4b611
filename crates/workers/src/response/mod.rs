mod policy;
mod sink;

pub use policy::{ResponseAction, ResponseConfig, ResponsePolicy};
pub use sink::{CommandSink, InMemorySink, IssuedCommand, SinkError};
