// running_stats.rs
// Exponential moving averages of the per-group statistics, used at evaluation time
// by `RunningGroupNorm`. The update is a pure function: old state and batch in,
// new state out. The module decides where the state lives.

use crate::backend::Float;
use crate::error::{GroupNormError, Result};
use crate::ops::GroupStatistics;
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub struct RunningStats<T>
where
    T: Float,
{
    /// (G,)
    pub mean: Tensor<T>,
    /// (G,)
    pub var: Tensor<T>,
    pub num_batches_tracked: usize,
}

impl<T> RunningStats<T>
where
    T: Float,
{
    /// Mean 0 and variance 1 for every group, nothing tracked yet.
    pub fn new(num_groups: usize) -> Self {
        Self {
            mean: Tensor::zeros(&[num_groups]),
            var: Tensor::ones(&[num_groups]),
            num_batches_tracked: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.num_groups());
    }

    pub fn num_groups(&self) -> usize {
        self.mean.size()
    }

    pub fn as_statistics(&self) -> GroupStatistics<T> {
        GroupStatistics {
            mean: self.mean.clone(),
            var: self.var.clone(),
        }
    }
}

/// Blends one batch into the running statistics:
/// `running = (1 - momentum) * running + momentum * batch`, for mean and variance alike.
pub fn update_running_stats<T>(
    old: &RunningStats<T>,
    batch: &GroupStatistics<T>,
    momentum: f64,
) -> Result<RunningStats<T>>
where
    T: Float,
{
    if !(0.0..=1.0).contains(&momentum) {
        return Err(GroupNormError::config(format!(
            "momentum must be in [0, 1], got {}",
            momentum
        )));
    }
    let g = old.num_groups();
    if batch.mean.shape() != [g] || batch.var.shape() != [g] {
        return Err(GroupNormError::shape(format!(
            "Batch statistics must have shape ({},), got mean {:?} and var {:?}",
            g,
            batch.mean.shape(),
            batch.var.shape()
        )));
    }

    let keep = T::from_f64(1.0 - momentum);
    let take = T::from_f64(momentum);
    let blend = |running: &Tensor<T>, observed: &Tensor<T>| {
        running.mul_scalar(keep).add(&observed.mul_scalar(take))
    };

    Ok(RunningStats {
        mean: blend(&old.mean, &batch.mean)?,
        var: blend(&old.var, &batch.var)?,
        num_batches_tracked: old.num_batches_tracked + 1,
    })
}
