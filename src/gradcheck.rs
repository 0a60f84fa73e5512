// gradcheck.rs
// Finite-difference verification of the closed-form group norm gradients.
//
// The loss is L = Σ y * w with a fixed random weighting w, so dL/dy = w is a
// non-trivial upstream gradient. Every element of x, scale and shift is perturbed
// by ±step and the central difference is compared with the analytic gradient.

use crate::error::Result;
use crate::ops::group_norm::{self, GroupNormConfig};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;

const LOSS_WEIGHT_SEED: u64 = 42;

/// Largest absolute difference between analytic and numeric gradients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientReport {
    pub input: f64,
    pub scale: f64,
    pub shift: f64,
}

impl GradientReport {
    pub fn max_error(&self) -> f64 {
        self.input.max(self.scale).max(self.shift)
    }

    pub fn passes(&self, tolerance: f64) -> bool {
        self.max_error() <= tolerance
    }
}

impl fmt::Display for GradientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max |analytic - numeric|: dx {:.3e}, dscale {:.3e}, dshift {:.3e}",
            self.input, self.scale, self.shift
        )
    }
}

/// Central-difference gradient of a scalar function of one tensor.
pub fn numeric_gradient<F>(mut f: F, at: &Tensor<f64>, step: f64) -> Result<Tensor<f64>>
where
    F: FnMut(&Tensor<f64>) -> Result<f64>,
{
    let mut grad = Vec::with_capacity(at.size());
    for i in 0..at.size() {
        let mut plus = at.clone();
        let mut minus = at.clone();
        if let Some(v) = plus.data.iter_mut().nth(i) {
            *v += step;
        }
        if let Some(v) = minus.data.iter_mut().nth(i) {
            *v -= step;
        }
        grad.push((f(&plus)? - f(&minus)?) / (2.0 * step));
    }
    Tensor::from_vec(grad, at.shape())
}

fn weighted_loss(y: &Tensor<f64>, weights: &Tensor<f64>) -> Result<f64> {
    Ok(y.mul(weights)?.sum_all())
}

/// Compares `backward` against central differences of `forward` for x, scale and shift.
pub fn check_gradients(
    config: &GroupNormConfig,
    x: &Tensor<f64>,
    scale: &Tensor<f64>,
    shift: &Tensor<f64>,
    step: f64,
) -> Result<GradientReport> {
    let mut rng = StdRng::seed_from_u64(LOSS_WEIGHT_SEED);
    let (y, cache) = group_norm::forward(x, scale, shift, config)?;
    let weights = Tensor::randn(y.shape(), &mut rng);

    let analytic = group_norm::backward(&weights, &cache, scale, config)?;

    let numeric_dx = numeric_gradient(
        |xp| weighted_loss(&group_norm::forward(xp, scale, shift, config)?.0, &weights),
        x,
        step,
    )?;
    let numeric_dscale = numeric_gradient(
        |sp| weighted_loss(&group_norm::forward(x, sp, shift, config)?.0, &weights),
        scale,
        step,
    )?;
    let numeric_dshift = numeric_gradient(
        |bp| weighted_loss(&group_norm::forward(x, scale, bp, config)?.0, &weights),
        shift,
        step,
    )?;

    let report = GradientReport {
        input: analytic.dx.max_abs_diff(&numeric_dx)?,
        scale: analytic
            .dscale
            .reshape(scale.shape())?
            .max_abs_diff(&numeric_dscale)?,
        shift: analytic
            .dshift
            .reshape(shift.shape())?
            .max_abs_diff(&numeric_dshift)?,
    };
    log::debug!("gradient check on {:?}: {}", x.shape(), report);
    Ok(report)
}
