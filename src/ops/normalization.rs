// normalization.rs
// Group normalization as graph operators with hand-written gradients.
//
// Neither operator keeps the forward cache between `compute` and `gradient`: the
// engine may evaluate the same operator for several graphs, and hidden mutable state
// would couple them. `gradient` rebuilds what it needs from the inputs it receives.

use crate::backend::Float;
use crate::error::Result;
use crate::ops::group_norm::{
    self, GroupNormConfig, GroupStatistics, normalize_with_stats, stats_in_group_layout,
};
use crate::ops::{Operator, expect_inputs};
use crate::tensor::Tensor;

/// Group normalization with batch statistics.
///
/// Inputs: `[x (N,C,H,W), scale, shift]`, where scale and shift are (1,C,1,1) or (C,).
#[derive(Debug, Clone)]
pub struct GroupNormOp {
    pub config: GroupNormConfig,
}

impl GroupNormOp {
    pub fn new(config: GroupNormConfig) -> Self {
        Self { config }
    }
}

impl<T> Operator<T> for GroupNormOp
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("GroupNormOp", inputs, 3)?;
        let (y, _cache) = group_norm::forward(inputs[0], inputs[1], inputs[2], &self.config)?;
        Ok(y)
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("GroupNormOp", inputs, 3)?;
        let (x, scale, shift) = (inputs[0], inputs[1], inputs[2]);

        let (_, cache) = group_norm::forward(x, scale, shift, &self.config)?;
        let grads = group_norm::backward(grad_output, &cache, scale, &self.config)?;

        Ok(vec![
            grads.dx,
            grads.dscale.reshape(scale.shape())?,
            grads.dshift.reshape(shift.shape())?,
        ])
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Group normalization with fixed statistics, used at evaluation time by modules
/// that track running statistics.
///
/// With the statistics frozen the map is affine in x, so its gradient is just
/// `dout * scale / sqrt(var + eps)`. The batch statistics never enter it.
#[derive(Debug, Clone)]
pub struct FrozenGroupNormOp<T>
where
    T: Float,
{
    pub config: GroupNormConfig,
    pub stats: GroupStatistics<T>,
}

impl<T> FrozenGroupNormOp<T>
where
    T: Float,
{
    pub fn new(config: GroupNormConfig, stats: GroupStatistics<T>) -> Self {
        Self { config, stats }
    }
}

impl<T> Operator<T> for FrozenGroupNormOp<T>
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("FrozenGroupNormOp", inputs, 3)?;
        group_norm::forward_with_stats(inputs[0], inputs[1], inputs[2], &self.stats, &self.config)
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("FrozenGroupNormOp", inputs, 3)?;
        let (x, scale, shift) = (inputs[0], inputs[1], inputs[2]);
        let config = &self.config;
        let dims = config.infer_shape(x.shape())?;

        let normalized = normalize_with_stats(x, &self.stats, config)?;
        let dshift = grad_output.sum_axes(&[0, 2, 3], true)?;
        let dscale = grad_output.mul(&normalized)?.sum_axes(&[0, 2, 3], true)?;

        let (_, var) = stats_in_group_layout(&self.stats, config)?;
        let eps = T::from_f64(config.eps());
        let inv_std = var.map(|v| T::one() / (v + eps).sqrt());
        let dx = grad_output
            .mul(&config.affine_param(scale, "scale")?)?
            .reshape(&config.group_shape(dims))?
            .mul(&inv_std)?
            .reshape(&dims)?;

        Ok(vec![
            dx,
            dscale.reshape(scale.shape())?,
            dshift.reshape(shift.shape())?,
        ])
    }

    fn num_inputs(&self) -> usize {
        3
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
