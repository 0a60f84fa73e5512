// reshape.rs
use crate::backend::Float;
use crate::error::Result;
use crate::ops::{Operator, expect_inputs};
use crate::tensor::Tensor;

/// Reshape: same elements in row-major order, new shape.
/// The gradient is simply reshaped back.
#[derive(Debug, Clone)]
pub struct Reshape {
    pub new_shape: Vec<usize>,
}

impl Reshape {
    pub fn new(new_shape: Vec<usize>) -> Self {
        Self { new_shape }
    }
}

impl<T> Operator<T> for Reshape
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Reshape", inputs, 1)?;
        inputs[0].reshape(&self.new_shape)
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Reshape", inputs, 1)?;
        Ok(vec![grad_output.reshape(inputs[0].shape())?])
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
