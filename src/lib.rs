//! # groupnorm
//!
//! Group Normalization (Wu & He, 2018) for 4-D `(N, C, H, W)` tensors: channels are
//! split into groups, each group of each sample is normalized by its own mean and
//! variance, then a per-channel scale and shift is applied.
//!
//! ## Features
//!
//! - One kernel (`ops::group_norm`) with forward statistics and closed-form backward
//! - Native or f64-widened accumulation of the statistics (`f32`, `f64`, `f16`)
//! - A computation graph with eager and lazy evaluation and reverse-mode autograd
//! - Group normalization as a graph operator, and as a composition of primitive ops
//! - `GroupNorm` and `RunningGroupNorm` layers, the latter with moving averages
//! - Finite-difference gradient checking
//!
//! ```rust
//! use groupnorm::{GroupNormConfig, Tensor};
//!
//! let config = GroupNormConfig::new(4, 2, 1e-5).unwrap();
//! let x = Tensor::<f64>::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[1, 4, 1, 1]).unwrap();
//! let (y, cache) = config.forward(&x, &Tensor::ones(&[4]), &Tensor::zeros(&[4])).unwrap();
//! assert!((y.to_vec()[0] + 1.0).abs() < 1e-3);
//!
//! let grads = config.backward(&Tensor::ones(&[1, 4, 1, 1]), &cache, &Tensor::ones(&[4])).unwrap();
//! assert_eq!(grads.dx.shape(), &[1, 4, 1, 1]);
//! ```
pub mod backend;
pub mod error;
pub mod gradcheck;
pub mod graph;
pub mod initializers;
pub mod nn;
pub mod ops;
pub mod tensor;

// Re-export commonly used types for convenience
pub use backend::Float;
pub use error::{GroupNormError, Result};
pub use graph::{Engine, EvaluationMode, NodeId};
pub use nn::{GroupNorm, Module, Parameter, RunningGroupNorm};
pub use ops::{ForwardCache, GroupNormConfig, GroupNormGrads, GroupNormOp, Precision};
pub use tensor::Tensor;
