use crate::backend::Float;
use crate::ops::Operator;
use crate::tensor::Tensor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// ATOMIC auto incrementing id for all nodes.
static NODE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Ids are unique across every engine in the process, so a node id can never be
/// resolved against the wrong graph by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn new() -> Self {
        Self(NODE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

///  Evaluation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// Operations only record the graph. Values are computed on `evaluate`.
    Lazy,
    /// Every operation is computed as soon as it is applied.
    #[default]
    Eager,
}

#[derive(Debug)]
pub enum NodeState<T>
where
    T: Float,
{
    /// Leaf node with materialized tensor.
    Leaf(Tensor<T>),

    /// Operation recorded but not computed yet (lazy mode).
    Pending {
        op: Box<dyn Operator<T>>,
        inputs: Vec<NodeId>,
    },

    /// Operation computed, output cached for the backward pass.
    Evaluated {
        tensor: Tensor<T>,
        op: Box<dyn Operator<T>>,
        inputs: Vec<NodeId>,
    },
}

impl<T> Clone for NodeState<T>
where
    T: Float,
{
    fn clone(&self) -> Self {
        match self {
            NodeState::Leaf(tensor) => NodeState::Leaf(tensor.clone()),
            NodeState::Pending { op, inputs } => NodeState::Pending {
                op: op.clone_op(),
                inputs: inputs.clone(),
            },
            NodeState::Evaluated { tensor, op, inputs } => NodeState::Evaluated {
                tensor: tensor.clone(),
                op: op.clone_op(),
                inputs: inputs.clone(),
            },
        }
    }
}

/// Computational graph node. Supports dual mode.
#[derive(Debug, Clone)]
pub struct Node<T>
where
    T: Float,
{
    pub id: NodeId,
    pub state: NodeState<T>,
    pub requires_grad: bool,
}

impl<T> Node<T>
where
    T: Float,
{
    pub fn new_leaf(tensor: Tensor<T>, requires_grad: bool) -> Self {
        Self {
            id: NodeId::new(),
            state: NodeState::Leaf(tensor),
            requires_grad,
        }
    }

    pub fn new_lazy(op: Box<dyn Operator<T>>, inputs: Vec<NodeId>, requires_grad: bool) -> Self {
        Self {
            id: NodeId::new(),
            state: NodeState::Pending { op, inputs },
            requires_grad,
        }
    }

    pub fn new_evaluated(
        tensor: Tensor<T>,
        op: Box<dyn Operator<T>>,
        inputs: Vec<NodeId>,
        requires_grad: bool,
    ) -> Self {
        Self {
            id: NodeId::new(),
            state: NodeState::Evaluated { tensor, op, inputs },
            requires_grad,
        }
    }

    pub fn get_tensor(&self) -> Option<&Tensor<T>> {
        match &self.state {
            NodeState::Leaf(tensor) => Some(tensor),
            NodeState::Evaluated { tensor, .. } => Some(tensor),
            NodeState::Pending { .. } => None,
        }
    }

    pub fn inputs(&self) -> &[NodeId] {
        match &self.state {
            NodeState::Leaf(_) => &[],
            NodeState::Pending { inputs, .. } => inputs,
            NodeState::Evaluated { inputs, .. } => inputs,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        !matches!(self.state, NodeState::Pending { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.state, NodeState::Leaf(_))
    }
}
