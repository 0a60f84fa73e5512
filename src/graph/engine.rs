use super::node::{EvaluationMode, Node, NodeId, NodeState};
use crate::backend::Float;
use crate::error::{GroupNormError, Result};
use crate::ops::{
    Add, AddScalar, Div, FrozenGroupNormOp, GroupNormConfig, GroupNormOp, GroupStatistics, Mean,
    Mul, Operator, Reshape, Sqrt, Sub, Sum,
};
use crate::tensor::Tensor;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

static ENGINE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Main computational graph engine.
///
/// Nodes are either leaves (caller-provided tensors) or operator applications.
/// In eager mode every operation is computed immediately; in lazy mode only the
/// graph is recorded and `evaluate` computes what a node depends on. The backward
/// pass is the same in both modes.
#[derive(Debug)]
pub struct Engine<T>
where
    T: Float,
{
    id: usize,
    nodes: HashMap<NodeId, Node<T>>,
    gradients: HashMap<NodeId, Tensor<T>>,
    evaluation_mode: EvaluationMode,
}

impl<T> Default for Engine<T>
where
    T: Float,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Engine<T>
where
    T: Float,
{
    pub fn new() -> Self {
        Self::with_mode(EvaluationMode::Eager)
    }

    pub fn with_mode(evaluation_mode: EvaluationMode) -> Self {
        Self {
            id: ENGINE_COUNTER.fetch_add(1, Ordering::Relaxed),
            nodes: HashMap::new(),
            gradients: HashMap::new(),
            evaluation_mode,
        }
    }

    /// Process-unique id of this engine. Modules use it to know whether the
    /// parameter nodes they created belong to the graph they are handed.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn set_evaluation_mode(&mut self, mode: EvaluationMode) {
        self.evaluation_mode = mode;
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode
    }

    pub fn lazy_mode(&mut self) {
        self.evaluation_mode = EvaluationMode::Lazy;
    }

    pub fn eager_mode(&mut self) {
        self.evaluation_mode = EvaluationMode::Eager;
    }

    // Creates a new leaf node in the computational graph
    pub fn create_variable(&mut self, tensor: Tensor<T>, requires_grad: bool) -> NodeId {
        let node = Node::new_leaf(tensor, requires_grad);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    pub fn tensor_from_vec(
        &mut self,
        data: Vec<T>,
        shape: &[usize],
        requires_grad: bool,
    ) -> Result<NodeId> {
        Ok(self.create_variable(Tensor::from_vec(data, shape)?, requires_grad))
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(&node_id)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn get_tensor(&self, node_id: NodeId) -> Option<&Tensor<T>> {
        self.nodes.get(&node_id)?.get_tensor()
    }

    pub fn is_evaluated(&self, node_id: NodeId) -> bool {
        self.nodes.get(&node_id).is_some_and(|node| node.is_evaluated())
    }

    pub fn requires_grad(&self, node_id: NodeId) -> bool {
        self.nodes.get(&node_id).is_some_and(|node| node.requires_grad)
    }

    pub fn get_gradient(&self, node_id: NodeId) -> Option<&Tensor<T>> {
        self.gradients.get(&node_id)
    }

    /// Clean up gradients
    pub fn zero_gradients(&mut self) {
        self.gradients.clear();
    }

    fn validate_inputs(&self, op: &dyn Operator<T>, input_ids: &[NodeId]) -> Result<()> {
        for &input_id in input_ids {
            if !self.nodes.contains_key(&input_id) {
                return Err(GroupNormError::graph(format!(
                    "Input node {} not found",
                    input_id
                )));
            }
        }

        if input_ids.len() != op.num_inputs() {
            return Err(GroupNormError::graph(format!(
                "Operation {} expects {} inputs, got {}",
                op.name(),
                op.num_inputs(),
                input_ids.len()
            )));
        }

        Ok(())
    }

    fn input_tensors(&self, input_ids: &[NodeId]) -> Result<Vec<&Tensor<T>>> {
        input_ids
            .iter()
            .map(|&input_id| {
                self.get_tensor(input_id).ok_or_else(|| {
                    GroupNormError::graph(format!("Input node {} not evaluated", input_id))
                })
            })
            .collect()
    }

    pub fn apply_operation(
        &mut self,
        op: Box<dyn Operator<T>>,
        input_ids: Vec<NodeId>,
    ) -> Result<NodeId> {
        self.validate_inputs(op.as_ref(), &input_ids)?;
        let requires_grad = input_ids.iter().any(|&id| self.requires_grad(id));

        let node = match self.evaluation_mode {
            EvaluationMode::Lazy => Node::new_lazy(op, input_ids, requires_grad),
            EvaluationMode::Eager => {
                for &input_id in &input_ids {
                    self.evaluate_node(input_id)?;
                }
                let result = op.compute(&self.input_tensors(&input_ids)?)?;
                Node::new_evaluated(result, op, input_ids, requires_grad)
            }
        };

        let id = node.id;
        self.nodes.insert(id, node);
        Ok(id)
    }

    // Evaluates a single node and returns its computed tensor.
    pub fn evaluate(&mut self, node_id: NodeId) -> Result<&Tensor<T>> {
        self.evaluate_node(node_id)?;
        self.get_tensor(node_id)
            .ok_or_else(|| GroupNormError::graph(format!("Failed to evaluate node {}", node_id)))
    }

    fn evaluate_node(&mut self, node_id: NodeId) -> Result<()> {
        let (op, input_ids) = {
            let node = self
                .nodes
                .get(&node_id)
                .ok_or_else(|| GroupNormError::graph(format!("Node {} not found", node_id)))?;
            match &node.state {
                NodeState::Pending { op, inputs } => (op.clone_op(), inputs.clone()),
                _ => return Ok(()),
            }
        };

        for &input_id in &input_ids {
            self.evaluate_node(input_id)?;
        }

        log::trace!("evaluating {} ({})", node_id, op.name());
        let result = op.compute(&self.input_tensors(&input_ids)?)?;

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.state = NodeState::Evaluated {
                tensor: result,
                op,
                inputs: input_ids,
            };
        }
        Ok(())
    }

    /// Reverse-mode differentiation from `loss_id`.
    ///
    /// The loss is seeded with ones of its own shape, so a non-scalar output
    /// behaves as if it had been summed first. Gradients are kept for leaves that
    /// require them and accumulate across calls until `zero_gradients`.
    pub fn backward(&mut self, loss_id: NodeId) -> Result<()> {
        if !self.is_evaluated(loss_id) {
            return Err(GroupNormError::graph(format!(
                "Cannot run backward on unevaluated node {}. Call evaluate() first.",
                loss_id
            )));
        }

        let loss_shape = self
            .get_tensor(loss_id)
            .map(|t| t.shape().to_vec())
            .ok_or_else(|| GroupNormError::graph(format!("Loss node {} not found", loss_id)))?;

        let mut visited = HashSet::new();
        let mut topo_order = Vec::new();
        self.topological_sort(loss_id, &mut visited, &mut topo_order);
        topo_order.reverse();

        log::debug!(
            "backward from {} with shape {:?} over {} nodes",
            loss_id,
            loss_shape,
            topo_order.len()
        );

        // Leaf gradients from earlier passes must not leak into the intermediate
        // nodes of this one, so this pass works on its own map.
        let mut pass_gradients = HashMap::new();
        pass_gradients.insert(loss_id, Tensor::ones(&loss_shape));

        for &node_id in &topo_order {
            self.backward_node(node_id, &mut pass_gradients)?;
        }
        Ok(())
    }

    fn backward_node(
        &mut self,
        node_id: NodeId,
        pass_gradients: &mut HashMap<NodeId, Tensor<T>>,
    ) -> Result<()> {
        let Some(grad_output) = pass_gradients.remove(&node_id) else {
            return Ok(());
        };
        let node = self
            .nodes
            .get(&node_id)
            .ok_or_else(|| GroupNormError::graph(format!("Node {} not found", node_id)))?;
        if !node.requires_grad {
            return Ok(());
        }

        match &node.state {
            NodeState::Evaluated { tensor, op, inputs } => {
                let input_tensors = inputs
                    .iter()
                    .map(|&input_id| {
                        self.nodes
                            .get(&input_id)
                            .and_then(|n| n.get_tensor())
                            .ok_or_else(|| {
                                GroupNormError::graph(format!(
                                    "Input node {} not evaluated",
                                    input_id
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let input_grads = op.gradient(&grad_output, &input_tensors, tensor)?;

                for ((input_id, input), grad) in inputs.iter().zip(&input_tensors).zip(input_grads)
                {
                    if grad.shape() != input.shape() {
                        return Err(GroupNormError::graph(format!(
                            "{} produced a gradient of shape {:?} for input {} of shape {:?}",
                            op.name(),
                            grad.shape(),
                            input_id,
                            input.shape()
                        )));
                    }
                    accumulate_gradient(pass_gradients, *input_id, grad)?;
                }
            }
            NodeState::Leaf(_) => {
                // Gradient stops here
                accumulate_gradient(&mut self.gradients, node_id, grad_output)?;
            }
            NodeState::Pending { .. } => {
                return Err(GroupNormError::graph(format!(
                    "Node {} is part of the backward pass but was never evaluated",
                    node_id
                )));
            }
        }
        Ok(())
    }

    /// Post-order walk so that every node comes after its inputs.
    fn topological_sort(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        topo_order: &mut Vec<NodeId>,
    ) {
        if !visited.insert(node_id) {
            return;
        }
        if let Some(node) = self.nodes.get(&node_id) {
            for &input_id in node.inputs() {
                self.topological_sort(input_id, visited, topo_order);
            }
        }
        topo_order.push(node_id);
    }

    /// GRAPH STATISTICS
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_evaluated_nodes(&self) -> usize {
        self.nodes.values().filter(|node| node.is_evaluated()).count()
    }

    pub fn num_pending_nodes(&self) -> usize {
        self.nodes.values().filter(|node| !node.is_evaluated()).count()
    }

    // -------------------------------------------------------------------------
    // Primitive operations
    // -------------------------------------------------------------------------

    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.apply_operation(Box::new(Add), vec![a, b])
    }

    pub fn sub(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.apply_operation(Box::new(Sub), vec![a, b])
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.apply_operation(Box::new(Mul), vec![a, b])
    }

    pub fn div(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.apply_operation(Box::new(Div), vec![a, b])
    }

    pub fn add_scalar(&mut self, a: NodeId, scalar: T) -> Result<NodeId> {
        self.apply_operation(Box::new(AddScalar::new(scalar)), vec![a])
    }

    pub fn sqrt(&mut self, a: NodeId) -> Result<NodeId> {
        self.apply_operation(Box::new(Sqrt), vec![a])
    }

    pub fn reshape(&mut self, a: NodeId, new_shape: &[usize]) -> Result<NodeId> {
        self.apply_operation(Box::new(Reshape::new(new_shape.to_vec())), vec![a])
    }

    pub fn mean(&mut self, a: NodeId, axes: &[usize], keep_dims: bool) -> Result<NodeId> {
        self.apply_operation(Box::new(Mean::along_axes(axes.to_vec(), keep_dims)), vec![a])
    }

    pub fn sum(&mut self, a: NodeId) -> Result<NodeId> {
        self.apply_operation(Box::new(Sum), vec![a])
    }

    // -------------------------------------------------------------------------
    // Group normalization
    // -------------------------------------------------------------------------

    /// Group normalization as a single node whose gradient is the closed-form kernel.
    pub fn group_norm(
        &mut self,
        x: NodeId,
        scale: NodeId,
        shift: NodeId,
        config: &GroupNormConfig,
    ) -> Result<NodeId> {
        self.apply_operation(Box::new(GroupNormOp::new(config.clone())), vec![x, scale, shift])
    }

    /// Group normalization with fixed statistics (evaluation with running stats).
    pub fn frozen_group_norm(
        &mut self,
        x: NodeId,
        scale: NodeId,
        shift: NodeId,
        config: &GroupNormConfig,
        stats: GroupStatistics<T>,
    ) -> Result<NodeId> {
        self.apply_operation(
            Box::new(FrozenGroupNormOp::new(config.clone(), stats)),
            vec![x, scale, shift],
        )
    }

    /// Group normalization spelled out in primitive operators, differentiated by
    /// the generic backward pass. Used to cross-check the closed-form gradient.
    ///
    /// Nothing may be evaluated yet in lazy mode, so the input shape is passed in.
    /// Statistics are always accumulated in `T`.
    pub fn group_norm_symbolic(
        &mut self,
        x: NodeId,
        scale: NodeId,
        shift: NodeId,
        config: &GroupNormConfig,
        input_shape: &[usize],
    ) -> Result<NodeId> {
        let dims = config.infer_shape(input_shape)?;
        if let Some(tensor) = self.get_tensor(x) {
            if tensor.shape() != dims {
                return Err(GroupNormError::shape(format!(
                    "Declared input shape {:?} doesn't match node {} of shape {:?}",
                    dims,
                    x,
                    tensor.shape()
                )));
            }
        }
        for (param, name) in [(scale, "scale"), (shift, "shift")] {
            if let Some(tensor) = self.get_tensor(param) {
                config.affine_param(tensor, name)?;
            }
        }

        let group_axes = [2, 3, 4];
        let param_shape = [1, config.num_channels(), 1, 1];

        let x_group = self.reshape(x, &config.group_shape(dims))?;
        let mean = self.mean(x_group, &group_axes, true)?;
        let centered = self.sub(x_group, mean)?;
        let squared = self.mul(centered, centered)?;
        let var = self.mean(squared, &group_axes, true)?;
        let shifted_var = self.add_scalar(var, T::from_f64(config.eps()))?;
        let std = self.sqrt(shifted_var)?;
        let normalized = self.div(centered, std)?;
        let normalized = self.reshape(normalized, &dims)?;

        let scale = self.reshape(scale, &param_shape)?;
        let shift = self.reshape(shift, &param_shape)?;
        let scaled = self.mul(normalized, scale)?;
        self.add(scaled, shift)
    }
}

fn accumulate_gradient<T: Float>(
    gradients: &mut HashMap<NodeId, Tensor<T>>,
    node_id: NodeId,
    grad: Tensor<T>,
) -> Result<()> {
    let accumulated = match gradients.remove(&node_id) {
        Some(existing) => existing.add(&grad)?,
        None => grad,
    };
    gradients.insert(node_id, accumulated);
    Ok(())
}
