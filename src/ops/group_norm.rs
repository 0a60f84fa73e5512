// group_norm.rs
// Group normalization kernel: forward statistics, normalization and the closed-form
// backward pass. Every graph operator and nn module in the crate delegates here.
//
// Reference: Wu & He, "Group Normalization", https://arxiv.org/abs/1803.08494
//
// Layout conventions used throughout this file:
//   input / output      (N, C, H, W)
//   group layout        (N, G, C/G, H, W)
//   per-group stats     (N, G, 1, 1, 1)
//   affine parameters   (1, C, 1, 1)

use crate::backend::Float;
use crate::error::{GroupNormError, Result};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Axes of the group layout that a per-group statistic reduces over.
const GROUP_AXES: [usize; 3] = [2, 3, 4];

/// Axes of the NCHW layout reduced when computing per-channel parameter gradients.
const CHANNEL_AXES: [usize; 3] = [0, 2, 3];

/// Precision used to accumulate the mean and variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Accumulate in the tensor's own element type.
    #[default]
    Native,
    /// Accumulate in f64 and round the statistics back to the element type.
    Wide,
}

/// Immutable configuration of a group normalization operator.
///
/// `num_channels` must be a multiple of `num_groups`; a configuration that
/// violates it cannot be constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNormConfig {
    num_channels: usize,
    num_groups: usize,
    eps: f64,
    #[serde(default)]
    precision: Precision,
}

impl GroupNormConfig {
    pub const DEFAULT_NUM_GROUPS: usize = 32;
    pub const DEFAULT_EPS: f64 = 1e-5;

    pub fn new(num_channels: usize, num_groups: usize, eps: f64) -> Result<Self> {
        let config = Self {
            num_channels,
            num_groups,
            eps,
            precision: Precision::Native,
        };
        config.validate()?;
        Ok(config)
    }

    /// 32 groups and eps = 1e-5, the values recommended in the paper.
    pub fn with_defaults(num_channels: usize) -> Result<Self> {
        Self::new(num_channels, Self::DEFAULT_NUM_GROUPS, Self::DEFAULT_EPS)
    }

    /// Decodes a JSON configuration and validates it.
    ///
    /// ```
    /// use groupnorm::ops::{GroupNormConfig, Precision};
    ///
    /// let config = GroupNormConfig::from_json(
    ///     r#"{"num_channels": 8, "num_groups": 4, "eps": 1e-5, "precision": "wide"}"#,
    /// ).unwrap();
    /// assert_eq!(config.channels_per_group(), 2);
    /// assert_eq!(config.precision(), Precision::Wide);
    ///
    /// assert!(GroupNormConfig::from_json(
    ///     r#"{"num_channels": 5, "num_groups": 3, "eps": 1e-5}"#
    /// ).is_err());
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_groups == 0 {
            return Err(GroupNormError::config("num_groups must be positive"));
        }
        if self.num_channels == 0 {
            return Err(GroupNormError::config("num_channels must be positive"));
        }
        if self.num_channels % self.num_groups != 0 {
            return Err(GroupNormError::config(format!(
                "num_channels ({}) must be divisible by num_groups ({})",
                self.num_channels, self.num_groups
            )));
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(GroupNormError::config(format!(
                "eps must be a positive finite number, got {}",
                self.eps
            )));
        }
        Ok(())
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn channels_per_group(&self) -> usize {
        self.num_channels / self.num_groups
    }

    /// Validates an input shape and returns the output shape, without touching data.
    pub fn infer_shape(&self, input_shape: &[usize]) -> Result<[usize; 4]> {
        if input_shape.len() != 4 {
            return Err(GroupNormError::shape(format!(
                "GroupNorm expects a rank 4 (N, C, H, W) input, got shape {:?}",
                input_shape
            )));
        }
        if input_shape[1] != self.num_channels {
            return Err(GroupNormError::shape(format!(
                "Input has {} channels but GroupNorm was configured for {}",
                input_shape[1], self.num_channels
            )));
        }
        // An empty group has no mean or variance
        if input_shape.contains(&0) {
            return Err(GroupNormError::shape(format!(
                "GroupNorm needs non-empty inputs, got shape {:?}",
                input_shape
            )));
        }
        Ok([input_shape[0], input_shape[1], input_shape[2], input_shape[3]])
    }

    pub(crate) fn group_shape(&self, dims: [usize; 4]) -> [usize; 5] {
        let [n, _, h, w] = dims;
        [n, self.num_groups, self.channels_per_group(), h, w]
    }

    /// Number of elements normalized together: C/G * H * W.
    pub fn group_size(&self, dims: [usize; 4]) -> usize {
        self.channels_per_group() * dims[2] * dims[3]
    }

    /// Brings a scale or shift parameter to (1, C, 1, 1). Accepts (C,) as well.
    pub fn affine_param<T: Float>(&self, param: &Tensor<T>, name: &str) -> Result<Tensor<T>> {
        let c = self.num_channels;
        let shape = param.shape();
        if shape == [c] || shape == [1, c, 1, 1] {
            param.reshape(&[1, c, 1, 1])
        } else {
            Err(GroupNormError::shape(format!(
                "{} must have shape ({},) or (1, {}, 1, 1), got {:?}",
                name, c, c, shape
            )))
        }
    }

    fn mean<T: Float>(&self, x: &Tensor<T>) -> Result<Tensor<T>> {
        match self.precision {
            Precision::Native => x.mean_axes(&GROUP_AXES, true),
            Precision::Wide => x.mean_axes_wide(&GROUP_AXES, true),
        }
    }

    pub fn forward<T: Float>(
        &self,
        x: &Tensor<T>,
        scale: &Tensor<T>,
        shift: &Tensor<T>,
    ) -> Result<(Tensor<T>, ForwardCache<T>)> {
        forward(x, scale, shift, self)
    }

    pub fn backward<T: Float>(
        &self,
        grad_output: &Tensor<T>,
        cache: &ForwardCache<T>,
        scale: &Tensor<T>,
    ) -> Result<GroupNormGrads<T>> {
        backward(grad_output, cache, scale, self)
    }
}

/// Values produced by one forward call and consumed by the matching backward call.
///
/// Returned by value so the operator itself never holds state between calls.
#[derive(Debug, Clone)]
pub struct ForwardCache<T: Float> {
    /// Input regrouped to (N, G, C/G, H, W)
    pub x_group: Tensor<T>,
    /// Per-group mean, (N, G, 1, 1, 1)
    pub mean: Tensor<T>,
    /// Per-group population variance, (N, G, 1, 1, 1)
    pub var: Tensor<T>,
    /// Pre-affine output, (N, C, H, W)
    pub normalized: Tensor<T>,
}

impl<T: Float> ForwardCache<T> {
    pub fn input_shape(&self) -> &[usize] {
        self.normalized.shape()
    }
}

/// Gradients returned by the backward pass.
#[derive(Debug, Clone)]
pub struct GroupNormGrads<T: Float> {
    /// (N, C, H, W)
    pub dx: Tensor<T>,
    /// (1, C, 1, 1)
    pub dscale: Tensor<T>,
    /// (1, C, 1, 1)
    pub dshift: Tensor<T>,
}

/// Per-group statistics of shape (G,), shared by all samples of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStatistics<T: Float> {
    pub mean: Tensor<T>,
    pub var: Tensor<T>,
}

/// Regroups the input and computes the per-sample, per-group mean and
/// population variance. Returns `(x_group, mean, var)`.
pub fn group_statistics<T: Float>(
    x: &Tensor<T>,
    config: &GroupNormConfig,
) -> Result<(Tensor<T>, Tensor<T>, Tensor<T>)> {
    let dims = config.infer_shape(x.shape())?;
    let x_group = x.reshape(&config.group_shape(dims))?;

    let mean = config.mean(&x_group)?;
    let centered = x_group.sub(&mean)?;
    // Divisor is the element count, no Bessel correction.
    let var = config.mean(&centered.square())?;

    Ok((x_group, mean, var))
}

/// Batch average of the per-sample group statistics, shape (G,).
///
/// This is what running statistics are blended with during training.
pub fn batch_statistics<T: Float>(
    x: &Tensor<T>,
    config: &GroupNormConfig,
) -> Result<GroupStatistics<T>> {
    let (_, mean, var) = group_statistics(x, config)?;
    let g = config.num_groups();
    Ok(GroupStatistics {
        mean: mean.mean_axes(&[0], false)?.reshape(&[g])?,
        var: var.mean_axes(&[0], false)?.reshape(&[g])?,
    })
}

fn normalize<T: Float>(
    x_group: &Tensor<T>,
    mean: &Tensor<T>,
    var: &Tensor<T>,
    eps: T,
    dims: [usize; 4],
) -> Result<Tensor<T>> {
    let std = var.add_scalar(eps).sqrt();
    x_group.sub(mean)?.div(&std)?.reshape(&dims)
}

/// Forward pass.
///
/// 1. view x as (N, G, C/G, H, W)
/// 2. mean and population variance over the last three axes
/// 3. normalized = (x - mean) / sqrt(var + eps), back in (N, C, H, W)
/// 4. y = normalized * scale + shift
pub fn forward<T: Float>(
    x: &Tensor<T>,
    scale: &Tensor<T>,
    shift: &Tensor<T>,
    config: &GroupNormConfig,
) -> Result<(Tensor<T>, ForwardCache<T>)> {
    let dims = config.infer_shape(x.shape())?;
    let scale = config.affine_param(scale, "scale")?;
    let shift = config.affine_param(shift, "shift")?;

    log::debug!(
        "group_norm forward: input {:?}, {} groups, eps {}, {:?} precision ({})",
        dims,
        config.num_groups(),
        config.eps(),
        config.precision(),
        T::type_name()
    );

    let (x_group, mean, var) = group_statistics(x, config)?;
    let normalized = normalize(&x_group, &mean, &var, T::from_f64(config.eps()), dims)?;
    let y = normalized.mul(&scale)?.add(&shift)?;

    log::trace!("group means {:?}, variances {:?}", mean.to_vec(), var.to_vec());

    Ok((
        y,
        ForwardCache {
            x_group,
            mean,
            var,
            normalized,
        },
    ))
}

/// Forward pass with fixed per-group statistics instead of batch statistics.
///
/// Used at evaluation time by modules that track running statistics. Nothing is
/// cached: the result is not meant to be differentiated through the kernel.
pub fn forward_with_stats<T: Float>(
    x: &Tensor<T>,
    scale: &Tensor<T>,
    shift: &Tensor<T>,
    stats: &GroupStatistics<T>,
    config: &GroupNormConfig,
) -> Result<Tensor<T>> {
    let normalized = normalize_with_stats(x, stats, config)?;
    let scale = config.affine_param(scale, "scale")?;
    let shift = config.affine_param(shift, "shift")?;
    normalized.mul(&scale)?.add(&shift)
}

/// Pre-affine output for fixed statistics, (N, C, H, W).
pub fn normalize_with_stats<T: Float>(
    x: &Tensor<T>,
    stats: &GroupStatistics<T>,
    config: &GroupNormConfig,
) -> Result<Tensor<T>> {
    let dims = config.infer_shape(x.shape())?;
    let (mean, var) = stats_in_group_layout(stats, config)?;
    let x_group = x.reshape(&config.group_shape(dims))?;
    normalize(&x_group, &mean, &var, T::from_f64(config.eps()), dims)
}

/// (G,) statistics reshaped to broadcast against the group layout.
pub(crate) fn stats_in_group_layout<T: Float>(
    stats: &GroupStatistics<T>,
    config: &GroupNormConfig,
) -> Result<(Tensor<T>, Tensor<T>)> {
    let g = config.num_groups();
    if stats.mean.shape() != [g] || stats.var.shape() != [g] {
        return Err(GroupNormError::shape(format!(
            "Statistics must have shape ({},), got mean {:?} and var {:?}",
            g,
            stats.mean.shape(),
            stats.var.shape()
        )));
    }
    Ok((
        stats.mean.reshape(&[1, g, 1, 1, 1])?,
        stats.var.reshape(&[1, g, 1, 1, 1])?,
    ))
}

/// Backward pass: closed-form adjoint of `forward`.
///
/// With M = C/G * H * W elements per group:
///
/// ```text
/// dshift   = Σ_{N,H,W} dout
/// dscale   = Σ_{N,H,W} dout * normalized
/// dnorm    = dout * scale                                (group layout)
/// dvar     = Σ_group dnorm * (-1/2) * centered * (var + eps)^(-3/2)
/// dmean    = Σ_group dnorm * (-1/sqrt(var + eps)) + dvar * (-2/M) * Σ_group centered
/// dx_group = dnorm / sqrt(var + eps) + dmean / M + dvar * (2/M) * centered
/// ```
///
/// A constant group has var = 0 and the gradients are then governed by the
/// eps floor alone. That is an accepted numerical limit, not special-cased.
///
/// In wide precision the whole adjoint is evaluated in f64.
pub fn backward<T: Float>(
    grad_output: &Tensor<T>,
    cache: &ForwardCache<T>,
    scale: &Tensor<T>,
    config: &GroupNormConfig,
) -> Result<GroupNormGrads<T>> {
    let dims = config.infer_shape(grad_output.shape())?;
    if grad_output.shape() != cache.input_shape() {
        return Err(GroupNormError::shape(format!(
            "Upstream gradient shape {:?} doesn't match the cached forward shape {:?}",
            grad_output.shape(),
            cache.input_shape()
        )));
    }
    let scale = config.affine_param(scale, "scale")?;

    log::debug!("group_norm backward: grad {:?} ({})", dims, T::type_name());

    match config.precision() {
        Precision::Native => adjoint(grad_output, cache, &scale, config, dims),
        Precision::Wide => {
            let wide_cache = ForwardCache {
                x_group: cache.x_group.cast::<f64>(),
                mean: cache.mean.cast::<f64>(),
                var: cache.var.cast::<f64>(),
                normalized: cache.normalized.cast::<f64>(),
            };
            let grads = adjoint(
                &grad_output.cast::<f64>(),
                &wide_cache,
                &scale.cast::<f64>(),
                config,
                dims,
            )?;
            Ok(GroupNormGrads {
                dx: grads.dx.cast(),
                dscale: grads.dscale.cast(),
                dshift: grads.dshift.cast(),
            })
        }
    }
}

fn adjoint<T: Float>(
    grad_output: &Tensor<T>,
    cache: &ForwardCache<T>,
    scale: &Tensor<T>,
    config: &GroupNormConfig,
    dims: [usize; 4],
) -> Result<GroupNormGrads<T>> {
    let m = T::from_usize(config.group_size(dims));
    let eps = T::from_f64(config.eps());
    let two = T::from_f64(2.0);

    // Affine parameters first, they only need the cached normalized output.
    let dshift = grad_output.sum_axes(&CHANNEL_AXES, true)?;
    let dscale = grad_output
        .mul(&cache.normalized)?
        .sum_axes(&CHANNEL_AXES, true)?;

    let dnorm = grad_output
        .mul(scale)?
        .reshape(&config.group_shape(dims))?;

    let centered = cache.x_group.sub(&cache.mean)?;
    let inv_std = cache.var.map(|v| T::one() / (v + eps).sqrt());
    let inv_std_cubed = inv_std.map(|s| s * s * s);

    let dvar = dnorm
        .mul(&centered)?
        .mul(&inv_std_cubed)?
        .mul_scalar(T::from_f64(-0.5))
        .sum_axes(&GROUP_AXES, true)?;

    let dmean_direct = dnorm.mul(&inv_std)?.negate().sum_axes(&GROUP_AXES, true)?;
    let dmean_through_var = dvar
        .mul(&centered.sum_axes(&GROUP_AXES, true)?)?
        .mul_scalar(-two / m);
    let dmean = dmean_direct.add(&dmean_through_var)?;

    let dx_group = dnorm
        .mul(&inv_std)?
        .add(&dmean.mul_scalar(T::one() / m))?
        .add(&dvar.mul(&centered)?.mul_scalar(two / m))?;

    Ok(GroupNormGrads {
        dx: dx_group.reshape(&dims)?,
        dscale,
        dshift,
    })
}
