// initializers.rs
// Value generators for parameter initialization. Each returns a closure producing
// one f64 per call, which `Parameter::from_init` turns into a tensor.
use crate::error::{GroupNormError, Result};
use rand::rng;
use rand_distr::{Distribution, Uniform};

/// Uniform initialization: samples from U(low, high)
pub fn uniform(low: f64, high: f64) -> Result<impl Fn() -> f64> {
    let dist = Uniform::new(low, high).map_err(|e| {
        GroupNormError::config(format!("Invalid uniform range [{}, {}): {}", low, high, e))
    })?;

    Ok(move || {
        let mut rng = rng();
        dist.sample(&mut rng)
    })
}

pub fn constant(value: f64) -> impl Fn() -> f64 {
    move || value
}

pub fn zeros() -> impl Fn() -> f64 {
    constant(0.0)
}

pub fn ones() -> impl Fn() -> f64 {
    constant(1.0)
}
