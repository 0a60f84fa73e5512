pub mod engine;
pub mod node;


pub use engine::Engine;
pub use node::{EvaluationMode, Node, NodeId, NodeState};
