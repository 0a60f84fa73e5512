// ops/mod.rs
// Operators of the computational graph. Each one knows how to compute its output
// from its inputs and how to turn the gradient of its output into gradients of its
// inputs. The engine in `crate::graph` only ever talks to them through this trait.
use crate::backend::Float;
use crate::error::Result;
use crate::tensor::Tensor;
use std::any::type_name;

// All operators in the computational graph implement this trait.
pub trait Operator<T>: std::fmt::Debug
where
    T: Float,
{
    // Compute function computes the output in the computational graph.
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>>;

    // Gradient function computes the gradient of the output with respect to the inputs.
    // `output` is the value `compute` produced for these inputs.
    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>>;

    // Get number of inputs this operator expects
    fn num_inputs(&self) -> usize;

    fn name(&self) -> String {
        let full_name = type_name::<Self>();
        let short = full_name.split('<').next().unwrap_or(full_name);
        short.rsplit("::").next().unwrap_or(short).to_string()
    }

    fn clone_op(&self) -> Box<dyn Operator<T>>;
}

impl<T> Operator<T> for Box<dyn Operator<T>>
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        self.as_ref().compute(inputs)
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        self.as_ref().gradient(grad_output, inputs, output)
    }

    fn num_inputs(&self) -> usize {
        self.as_ref().num_inputs()
    }

    fn name(&self) -> String {
        self.as_ref().name()
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        self.as_ref().clone_op()
    }
}

// Shared arity check, every compute/gradient starts with it.
pub(crate) fn expect_inputs<T: Float>(name: &str, inputs: &[&Tensor<T>], n: usize) -> Result<()> {
    if inputs.len() != n {
        return Err(crate::error::GroupNormError::graph(format!(
            "{} requires exactly {} input(s), got {}",
            name,
            n,
            inputs.len()
        )));
    }
    Ok(())
}

pub mod basic;
pub mod group_norm;
pub mod normalization;
pub mod reduction;
pub mod reshape;
pub mod scalar;
pub mod unary;

#[cfg(test)]
mod tests;

pub use basic::{Add, Div, Mul, Sub};
pub use group_norm::{
    ForwardCache, GroupNormConfig, GroupNormGrads, GroupStatistics, Precision, backward,
    batch_statistics, forward, forward_with_stats, group_statistics,
};
pub use normalization::{FrozenGroupNormOp, GroupNormOp};
pub use reduction::{Mean, Sum};
pub use reshape::Reshape;
pub use scalar::AddScalar;
pub use unary::Sqrt;
