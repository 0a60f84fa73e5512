use crate::backend::Float;
use crate::error::Result;
use crate::graph::{Engine, NodeId};
use crate::nn::parameter::Parameter;

/// The base trait for all neural network modules.
///
/// A module adds its computation to a graph it is handed and returns the output
/// node. It never owns the graph, so the same module can be used with an eager
/// engine and a lazy one.
///
/// # Examples
///
/// ```rust
/// use groupnorm::graph::{Engine, NodeId};
/// use groupnorm::nn::{Module, Parameter};
/// use groupnorm::{Result, Tensor};
///
/// struct Shift {
///     bias: Parameter<f64>,
///     training: bool,
/// }
///
/// impl Module<f64> for Shift {
///     fn forward(&self, graph: &mut Engine<f64>, input: NodeId) -> Result<NodeId> {
///         let bias = self.bias.create_in_graph(graph);
///         graph.add(input, bias)
///     }
///
///     fn parameters(&self) -> Vec<&Parameter<f64>> {
///         vec![&self.bias]
///     }
///
///     fn training(&self) -> bool {
///         self.training
///     }
///
///     fn set_training(&mut self, training: bool) {
///         self.training = training;
///     }
/// }
///
/// let layer = Shift { bias: Parameter::new(Tensor::ones(&[3])), training: true };
/// let mut graph = Engine::new();
/// let x = graph.create_variable(Tensor::zeros(&[3]), true);
/// let y = layer.forward(&mut graph, x).unwrap();
/// assert_eq!(graph.get_tensor(y).unwrap().to_vec(), vec![1.0; 3]);
/// assert_eq!(layer.num_parameters(), 3);
/// ```
pub trait Module<T>
where
    T: Float,
{
    /// Performs the forward pass of the module.
    fn forward(&self, graph: &mut Engine<T>, input: NodeId) -> Result<NodeId>;

    /// Returns all learnable parameters of this module.
    fn parameters(&self) -> Vec<&Parameter<T>> {
        Vec::new()
    }

    /// Returns whether the module is in training mode.
    fn training(&self) -> bool {
        true
    }

    /// Sets the training mode for this module.
    fn set_training(&mut self, training: bool);

    /// Sets the module to evaluation mode.
    fn eval(&mut self) {
        self.set_training(false);
    }

    /// Sets the module to training mode.
    fn train(&mut self) {
        self.set_training(true);
    }

    /// Total number of learnable scalars.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.size()).sum()
    }
}
