// reduction.rs
// Reduction operations for the computational graph.
// These wrap tensor API methods to enable automatic differentiation.

use crate::backend::Float;
use crate::error::Result;
use crate::ops::{Operator, expect_inputs};
use crate::tensor::Tensor;

// Shape of the input with every reduced axis set to 1, i.e. the keep_dims shape.
fn kept_shape(input_shape: &[usize], axes: &[usize]) -> Vec<usize> {
    input_shape
        .iter()
        .enumerate()
        .map(|(i, &dim)| if axes.contains(&i) { 1 } else { dim })
        .collect()
}

/// Sum of all elements, producing a rank 0 tensor.
/// Mostly useful to turn an output into a scalar loss.
#[derive(Debug, Clone, Default)]
pub struct Sum;

impl<T> Operator<T> for Sum
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Sum", inputs, 1)?;
        Ok(Tensor::full(&[], inputs[0].sum_all()))
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Sum", inputs, 1)?;
        Ok(vec![grad_output.broadcast_to(inputs[0].shape())?])
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Mean reduction: output = mean(input, axes)
#[derive(Debug, Clone)]
pub struct Mean {
    /// Axes to reduce along
    pub axes: Vec<usize>,
    /// Whether to keep the reduced dimensions as size 1
    pub keep_dims: bool,
}

impl Mean {
    pub fn along_axes(axes: Vec<usize>, keep_dims: bool) -> Self {
        Self { axes, keep_dims }
    }
}

impl<T> Operator<T> for Mean
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Mean", inputs, 1)?;
        inputs[0].mean_axes(&self.axes, self.keep_dims)
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Mean", inputs, 1)?;
        let input_shape = inputs[0].shape();

        // Every element contributed 1/count to its mean; repeated axes count once
        let mut axes = self.axes.clone();
        axes.sort_unstable();
        axes.dedup();
        let count: usize = axes
            .iter()
            .map(|&ax| input_shape.get(ax).copied().unwrap_or(1))
            .product();

        let grad = if self.keep_dims {
            grad_output.clone()
        } else {
            grad_output.reshape(&kept_shape(input_shape, &self.axes))?
        };

        let grad = grad
            .broadcast_to(input_shape)?
            .mul_scalar(T::one() / T::from_usize(count));
        Ok(vec![grad])
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
