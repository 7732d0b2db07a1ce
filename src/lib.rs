//! Feedforward neural network training engine.
//!
//! This crate provides a composable set of differentiable layers, a network
//! container that chains them, and mini-batch optimizers that fit the network
//! parameters to labeled data. Every layer hand-implements its own forward
//! value and backward (gradient) rule; there is no computation-graph tracing.
//!
//! # Modules
//!
//! - `tensor`: dense 3D buffer used by the spatially-structured layers
//! - `layers`: Layer trait and implementations (Dense, Conv, MaxPooling, ...)
//! - `network`: ordered layer sequence with forward/backward propagation
//! - `cost`: cost functions (mean squared, cross entropy, dot)
//! - `gradient`: gradient accumulation over single samples and batches
//! - `optimizers`: Optimizer trait, SGD/Adam/RMSProp, and the training loop
//! - `samples`: immutable input/target sample pairs and sample sets
//! - `serializer`: stable byte encoding of a trained network
//! - `architecture`: JSON architecture and training configuration
//!
//! # Example
//!
//! ```
//! use gradnet::layers::{DenseLayer, Sigmoid};
//! use gradnet::network::Network;
//! use gradnet::utils::SimpleRng;
//!
//! let mut rng = SimpleRng::new(42);
//! let network = Network::new(vec![
//!     Box::new(DenseLayer::new(2, 4, &mut rng).unwrap()),
//!     Box::new(Sigmoid::new(4)),
//!     Box::new(DenseLayer::new(4, 1, &mut rng).unwrap()),
//!     Box::new(Sigmoid::new(1)),
//! ])
//! .unwrap();
//!
//! let trace = network.forward(&[0.0, 1.0]).unwrap();
//! assert_eq!(trace.output().len(), 1);
//! ```

pub mod architecture;
pub mod cost;
pub mod error;
pub mod gradient;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod samples;
pub mod serializer;
pub mod tensor;
pub mod utils;

pub use error::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
