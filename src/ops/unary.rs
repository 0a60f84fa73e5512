// unary.rs
use crate::backend::Float;
use crate::error::Result;
use crate::ops::{Operator, expect_inputs};
use crate::tensor::Tensor;

/// Element-wise square root: output = sqrt(x)
#[derive(Debug, Clone, Default)]
pub struct Sqrt;

impl<T> Operator<T> for Sqrt
where
    T: Float,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>> {
        expect_inputs("Sqrt", inputs, 1)?;
        Ok(inputs[0].sqrt())
    }

    fn gradient(
        &self,
        grad_output: &Tensor<T>,
        _inputs: &[&Tensor<T>],
        output: &Tensor<T>,
    ) -> Result<Vec<Tensor<T>>> {
        // d(sqrt(x))/dx = 1 / (2 * sqrt(x)), and sqrt(x) is the cached output
        let two = T::from_f64(2.0);
        Ok(vec![grad_output.div(&output.mul_scalar(two))?])
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
