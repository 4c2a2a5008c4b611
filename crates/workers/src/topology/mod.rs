mod builder;
mod graph;

pub use builder::TopologyBuilder;
pub use graph::{normalize_host_key, NodeRole, TopologyEdge, TopologyNode, TopologySnapshot};
