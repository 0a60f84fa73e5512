use crate::backend::Float;
use crate::error::Result;
use crate::graph::{Engine, NodeId};
use crate::tensor::Tensor;

/// A learnable tensor. Modules hand parameters to the graph as leaf nodes and
/// read their gradients back from it.
#[derive(Debug, Clone)]
pub struct Parameter<T>
where
    T: Float,
{
    pub data: Tensor<T>,
    pub requires_grad: bool,
    /// Optional name for debugging
    pub name: Option<String>,
}

impl<T> Parameter<T>
where
    T: Float,
{
    pub fn new(data: Tensor<T>) -> Self {
        Self {
            data,
            requires_grad: true,
            name: None,
        }
    }

    pub fn new_named(data: Tensor<T>, name: &str) -> Self {
        Self {
            data,
            requires_grad: true,
            name: Some(name.to_string()),
        }
    }

    /// A parameter that takes part in the computation but is never trained.
    pub fn frozen(data: Tensor<T>, name: &str) -> Self {
        Self {
            data,
            requires_grad: false,
            name: Some(name.to_string()),
        }
    }

    /// Fills a new parameter by calling `init_fn` once per element.
    ///
    /// ```rust
    /// use groupnorm::initializers::uniform;
    /// use groupnorm::nn::Parameter;
    ///
    /// let weight = Parameter::<f32>::from_init(&[8], uniform(0.0, 1.0).unwrap()).unwrap();
    /// assert_eq!(weight.shape(), &[8]);
    /// ```
    pub fn from_init<F>(shape: &[usize], init_fn: F) -> Result<Self>
    where
        F: Fn() -> f64,
    {
        Ok(Self::new(init_tensor(shape, init_fn)?))
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn size(&self) -> usize {
        self.data.size()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// Registers the current value as a leaf of `graph`.
    pub fn create_in_graph(&self, graph: &mut Engine<T>) -> NodeId {
        graph.create_variable(self.data.clone(), self.requires_grad)
    }
}

impl<T> From<Tensor<T>> for Parameter<T>
where
    T: Float,
{
    fn from(tensor: Tensor<T>) -> Self {
        Self::new(tensor)
    }
}

fn init_tensor<T, F>(shape: &[usize], init_fn: F) -> Result<Tensor<T>>
where
    T: Float,
    F: Fn() -> f64,
{
    let total_elements: usize = shape.iter().product();
    let data: Vec<T> = (0..total_elements).map(|_| T::from_f64(init_fn())).collect();
    Tensor::from_vec(data, shape)
}
