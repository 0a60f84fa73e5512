// scalar.rs
use crate::backend::Float;
use crate::error::Result;
use crate::ops::{Operator, expect_inputs};
use crate::tensor::Tensor;

/// Adds a constant to every element: output = x + scalar.
/// Used for the `var + eps` step of the symbolic graph.
#[derive(Debug, Clone)]
pub struct AddScalar<T>
where
    T: Float,
{
    pub scalar: T,
}

impl<T> AddScalar<T>
where
    T: Float,
{
    pub fn new(scalar: T) -> Self {
        Self { scalar }
    }
}

impl<T> Operator<T> for AddScalar<T>
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("AddScalar", inputs, 1)?;
        Ok(inputs[0].add_scalar(self.scalar))
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        _inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        Ok(vec![grad_output.clone()])
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
