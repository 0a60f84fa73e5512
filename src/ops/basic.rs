// basic.rs
// Element-wise binary operators. All of them broadcast their operands, so every
// gradient is summed back down to the shape of the input it belongs to.

use crate::backend::Float;
use crate::error::Result;
use crate::ops::{Operator, expect_inputs};
use crate::tensor::Tensor;

/// Element-wise addition: output = a + b
#[derive(Debug, Clone, Default)]
pub struct Add;

impl<T> Operator<T> for Add
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Add", inputs, 2)?;
        inputs[0].add(inputs[1])
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Add", inputs, 2)?;
        // Both inputs get the upstream gradient unchanged
        Ok(vec![
            grad_output.sum_to_shape(inputs[0].shape())?,
            grad_output.sum_to_shape(inputs[1].shape())?,
        ])
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Element-wise subtraction: output = a - b
#[derive(Debug, Clone, Default)]
pub struct Sub;

impl<T> Operator<T> for Sub
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Sub", inputs, 2)?;
        inputs[0].sub(inputs[1])
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Sub", inputs, 2)?;
        Ok(vec![
            grad_output.sum_to_shape(inputs[0].shape())?,
            grad_output.negate().sum_to_shape(inputs[1].shape())?,
        ])
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Element-wise multiplication: output = a * b
#[derive(Debug, Clone, Default)]
pub struct Mul;

impl<T> Operator<T> for Mul
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Mul", inputs, 2)?;
        inputs[0].mul(inputs[1])
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        _output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Mul", inputs, 2)?;
        // d(a*b)/da = b, d(a*b)/db = a
        let grad_a = grad_output.mul(inputs[1])?.sum_to_shape(inputs[0].shape())?;
        let grad_b = grad_output.mul(inputs[0])?.sum_to_shape(inputs[1].shape())?;
        Ok(vec![grad_a, grad_b])
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Element-wise division: output = a / b
#[derive(Debug, Clone, Default)]
pub struct Div;

impl<T> Operator<T> for Div
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Div", inputs, 2)?;
        inputs[0].div(inputs[1])
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        inputs: &[&Tensor<T>],
        output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        expect_inputs("Div", inputs, 2)?;
        // d(a/b)/da = 1/b
        // d(a/b)/db = -a/b² = -(a/b)/b
        let grad_a = grad_output.div(inputs[1])?.sum_to_shape(inputs[0].shape())?;
        let grad_b = grad_output
            .mul(output)?
            .div(inputs[1])?
            .negate()
            .sum_to_shape(inputs[1].shape())?;
        Ok(vec![grad_a, grad_b])
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
