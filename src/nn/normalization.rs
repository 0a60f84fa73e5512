// src/nn/normalization.rs
// Group normalization layers on top of the graph engine.
//
// Both layers hand the whole computation to a single operator node, so the backward
// pass always runs the closed-form kernel gradient. Their parameters are (1, C, 1, 1).

use crate::backend::Float;
use crate::error::{GroupNormError, Result};
use crate::graph::{Engine, NodeId};
use crate::initializers;
use crate::nn::Module;
use crate::nn::parameter::Parameter;
use crate::nn::running_stats::{RunningStats, update_running_stats};
use crate::ops::{GroupNormConfig, batch_statistics};
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::fmt;

/// Leaf nodes created for the affine parameters, remembered per engine so that
/// repeated forward calls on one graph share (and accumulate into) the same nodes.
#[derive(Debug, Clone, Copy)]
struct ParameterNodes {
    engine_id: usize,
    weight: NodeId,
    bias: NodeId,
}

fn bind_parameters<T: Float>(
    cache: &RefCell<Option<ParameterNodes>>,
    weight: &Parameter<T>,
    bias: &Parameter<T>,
    graph: &mut Engine<T>,
) -> ParameterNodes {
    if let Some(nodes) = *cache.borrow() {
        if nodes.engine_id == graph.id() {
            return nodes;
        }
    }
    let nodes = ParameterNodes {
        engine_id: graph.id(),
        weight: weight.create_in_graph(graph),
        bias: bias.create_in_graph(graph),
    };
    *cache.borrow_mut() = Some(nodes);
    nodes
}

fn affine_parameters<T: Float>(num_channels: usize, affine: bool) -> (Parameter<T>, Parameter<T>) {
    let shape = [1, num_channels, 1, 1];
    if affine {
        (
            Parameter::new_named(Tensor::ones(&shape), "weight"),
            Parameter::new_named(Tensor::zeros(&shape), "bias"),
        )
    } else {
        (
            Parameter::frozen(Tensor::ones(&shape), "weight"),
            Parameter::frozen(Tensor::zeros(&shape), "bias"),
        )
    }
}

// Shape checks are only possible once the input has a value (always in eager mode).
fn check_input<T: Float>(graph: &Engine<T>, input: NodeId, config: &GroupNormConfig) -> Result<()> {
    match graph.get_tensor(input) {
        Some(x) => config.infer_shape(x.shape()).map(|_| ()),
        None if graph.contains(input) => Ok(()),
        None => Err(GroupNormError::graph(format!("Input node {} not found", input))),
    }
}

/// ---------------------------------------------------
/// GROUP NORM
/// ---------------------------------------------------
///
/// Group normalization with batch statistics in training and evaluation alike.
/// Works with eager and lazy engines: in lazy mode the output is a pending node
/// and nothing is computed until it is evaluated.
#[derive(Debug)]
pub struct GroupNorm<T>
where
    T: Float,
{
    config: GroupNormConfig,
    affine: bool,
    /// Learnable scale (gamma), initialized to ones
    pub weight: Parameter<T>,
    /// Learnable shift (beta), initialized to zeros
    pub bias: Parameter<T>,
    training: bool,
    parameter_nodes: RefCell<Option<ParameterNodes>>,
}

impl<T> GroupNorm<T>
where
    T: Float,
{
    pub fn new(num_channels: usize, num_groups: usize, eps: f64) -> Result<Self> {
        Ok(Self::from_config(
            GroupNormConfig::new(num_channels, num_groups, eps)?,
            true,
        ))
    }

    /// 32 groups and eps = 1e-5.
    pub fn with_defaults(num_channels: usize) -> Result<Self> {
        Ok(Self::from_config(GroupNormConfig::with_defaults(num_channels)?, true))
    }

    /// Without `affine` the scale and shift stay fixed at one and zero.
    pub fn from_config(config: GroupNormConfig, affine: bool) -> Self {
        let (weight, bias) = affine_parameters(config.num_channels(), affine);
        Self {
            config,
            affine,
            weight,
            bias,
            training: true,
            parameter_nodes: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &GroupNormConfig {
        &self.config
    }

    pub fn is_affine(&self) -> bool {
        self.affine
    }

    /// Weight node of the graph most recently passed to `forward`.
    pub fn weight_node(&self) -> Option<NodeId> {
        self.parameter_nodes.borrow().map(|nodes| nodes.weight)
    }

    /// Bias node of the graph most recently passed to `forward`.
    pub fn bias_node(&self) -> Option<NodeId> {
        self.parameter_nodes.borrow().map(|nodes| nodes.bias)
    }
}

impl<T> Module<T> for GroupNorm<T>
where
    T: Float,
{
    fn forward(&self, graph: &mut Engine<T>, input: NodeId) -> Result<NodeId> {
        check_input(graph, input, &self.config)?;
        let nodes = bind_parameters(&self.parameter_nodes, &self.weight, &self.bias, graph);
        graph.group_norm(input, nodes.weight, nodes.bias, &self.config)
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        if self.affine {
            vec![&self.weight, &self.bias]
        } else {
            Vec::new()
        }
    }

    fn training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

impl<T> fmt::Display for GroupNorm<T>
where
    T: Float,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GroupNorm({}, groups={}, eps={}, affine={})",
            self.config.num_channels(),
            self.config.num_groups(),
            self.config.eps(),
            self.affine
        )
    }
}

/// ---------------------------------------------------
/// GROUP NORM WITH RUNNING STATISTICS
/// ---------------------------------------------------
///
/// Trains with batch statistics while keeping a moving average of the per-group
/// mean and variance, averaged over the batch. In evaluation mode the moving
/// averages replace the batch statistics if they are tracked.
#[derive(Debug)]
pub struct RunningGroupNorm<T>
where
    T: Float,
{
    config: GroupNormConfig,
    /// Weight of the newest batch in the running average (default: 0.1)
    momentum: f64,
    affine: bool,
    track_running_stats: bool,
    pub weight: Parameter<T>,
    pub bias: Parameter<T>,
    running_stats: RefCell<RunningStats<T>>,
    training: bool,
    parameter_nodes: RefCell<Option<ParameterNodes>>,
}

impl<T> RunningGroupNorm<T>
where
    T: Float,
{
    pub const DEFAULT_MOMENTUM: f64 = 0.1;

    pub fn new(
        config: GroupNormConfig,
        momentum: f64,
        affine: bool,
        track_running_stats: bool,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&momentum) {
            return Err(GroupNormError::config(format!(
                "momentum must be in [0, 1], got {}",
                momentum
            )));
        }
        let (weight, bias) = affine_parameters(config.num_channels(), affine);
        let running_stats = RefCell::new(RunningStats::new(config.num_groups()));

        let mut layer = Self {
            config,
            momentum,
            affine,
            track_running_stats,
            weight,
            bias,
            running_stats,
            training: true,
            parameter_nodes: RefCell::new(None),
        };
        layer.reset_parameters()?;
        Ok(layer)
    }

    /// eps = 1e-5, momentum 0.1, affine, tracking running statistics.
    pub fn new_default(num_channels: usize, num_groups: usize) -> Result<Self> {
        let config = GroupNormConfig::new(num_channels, num_groups, GroupNormConfig::DEFAULT_EPS)?;
        Self::new(config, Self::DEFAULT_MOMENTUM, true, true)
    }

    /// Resets the running statistics to mean 0 and variance 1 and, when affine,
    /// draws the weight from U(0, 1) and zeroes the bias.
    pub fn reset_parameters(&mut self) -> Result<()> {
        self.reset_running_stats();
        if self.affine {
            let shape = [1, self.config.num_channels(), 1, 1];
            self.weight = Parameter::from_init(&shape, initializers::uniform(0.0, 1.0)?)?;
            self.weight.set_name("weight");
            self.bias = Parameter::from_init(&shape, initializers::zeros())?;
            self.bias.set_name("bias");
            // Nodes created from the old values are stale now
            *self.parameter_nodes.borrow_mut() = None;
        }
        Ok(())
    }

    pub fn reset_running_stats(&self) {
        log::info!(
            "resetting running statistics of {} groups",
            self.config.num_groups()
        );
        self.running_stats.borrow_mut().reset();
    }

    pub fn running_stats(&self) -> RunningStats<T> {
        self.running_stats.borrow().clone()
    }

    pub fn num_batches_tracked(&self) -> usize {
        self.running_stats.borrow().num_batches_tracked
    }

    pub fn config(&self) -> &GroupNormConfig {
        &self.config
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn is_affine(&self) -> bool {
        self.affine
    }

    pub fn is_tracking_running_stats(&self) -> bool {
        self.track_running_stats
    }

    pub fn weight_node(&self) -> Option<NodeId> {
        self.parameter_nodes.borrow().map(|nodes| nodes.weight)
    }

    pub fn bias_node(&self) -> Option<NodeId> {
        self.parameter_nodes.borrow().map(|nodes| nodes.bias)
    }

    fn track(&self, x: &Tensor<T>) -> Result<()> {
        let batch = batch_statistics(x, &self.config)?;
        let mut running = self.running_stats.borrow_mut();
        *running = update_running_stats(&running, &batch, self.momentum)?;
        log::debug!(
            "running statistics updated ({} batches): mean {:?}, var {:?}",
            running.num_batches_tracked,
            running.mean.to_f64_vec(),
            running.var.to_f64_vec()
        );
        Ok(())
    }
}

impl<T> Module<T> for RunningGroupNorm<T>
where
    T: Float,
{
    /// Needs the input value for the statistics, so a lazy input is evaluated first.
    fn forward(&self, graph: &mut Engine<T>, input: NodeId) -> Result<NodeId> {
        let x = graph.evaluate(input)?.clone();
        self.config.infer_shape(x.shape())?;
        let nodes = bind_parameters(&self.parameter_nodes, &self.weight, &self.bias, graph);

        if self.training {
            let output = graph.group_norm(input, nodes.weight, nodes.bias, &self.config)?;
            if self.track_running_stats {
                self.track(&x)?;
            }
            Ok(output)
        } else if self.track_running_stats {
            let stats = self.running_stats.borrow().as_statistics();
            graph.frozen_group_norm(input, nodes.weight, nodes.bias, &self.config, stats)
        } else {
            graph.group_norm(input, nodes.weight, nodes.bias, &self.config)
        }
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        if self.affine {
            vec![&self.weight, &self.bias]
        } else {
            Vec::new()
        }
    }

    fn training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

impl<T> fmt::Display for RunningGroupNorm<T>
where
    T: Float,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunningGroupNorm({}, groups={}, eps={}, momentum={}, affine={}, track_running_stats={})",
            self.config.num_channels(),
            self.config.num_groups(),
            self.config.eps(),
            self.momentum,
            self.affine,
            self.track_running_stats
        )
    }
}
