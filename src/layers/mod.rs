//! Layer trait and implementations.
//!
//! Every layer exposes a pure forward transform and a backward transform
//! that turns the gradient at its output into the gradient at its input
//! while accumulating into an externally-owned parameter gradient buffer.
//! Layers carry no hidden per-sample state: backward receives the exact
//! input and output vectors produced by the paired forward call, so any
//! number of samples can be propagated concurrently against shared,
//! read-only parameters.

pub mod activation;
pub mod border;
pub mod conv;
pub mod dense;
pub mod pooling;
pub mod softmax;

pub use activation::{Relu, Sigmoid, Tanh};
pub use border::BorderLayer;
pub use conv::ConvLayer;
pub use dense::DenseLayer;
pub use pooling::MaxPoolingLayer;
pub use softmax::{LogSoftmax, Softmax};

use crate::Result;

/// Core trait for neural network layers.
///
/// All layer types implement this trait to provide a uniform interface for
/// forward and backward propagation. Parameters live in one flat slice per
/// layer (weights first, then biases) so optimizers can update them with
/// plain slice arithmetic.
///
/// # Contract
///
/// `backward` must be driven with the same `input`/`output` pair that the
/// immediately preceding `forward` produced for that sample. The network
/// enforces this by recording every intermediate vector in an
/// [`Activations`](crate::network::Activations) context and replaying it
/// in reverse.
pub trait Layer: Send + Sync {
    /// Expected input vector length.
    fn input_size(&self) -> usize;

    /// Produced output vector length.
    fn output_size(&self) -> usize;

    /// Total count of trainable parameters (weights plus biases).
    fn parameter_count(&self) -> usize {
        0
    }

    /// Flat view of the trainable parameters, `[weights..., biases...]`.
    ///
    /// Empty for parameterless layers.
    fn parameters(&self) -> &[f64] {
        &[]
    }

    /// Mutable flat view of the trainable parameters.
    fn parameters_mut(&mut self) -> &mut [f64] {
        &mut []
    }

    /// Forward propagation: a pure function of `input` and the current
    /// parameters. `output` has length `output_size()`.
    ///
    /// Buffer lengths are validated by the network before dispatch;
    /// implementations may assume they are correct.
    fn forward(&self, input: &[f64], output: &mut [f64]);

    /// Backward propagation.
    ///
    /// Given the `input`/`output` pair cached from the paired forward call
    /// and `grad_output` (the cost gradient w.r.t. this layer's output),
    /// writes the cost gradient w.r.t. the input into `grad_input` and
    /// accumulates (`+=`) the parameter gradient into `param_grad`, whose
    /// length is `parameter_count()`.
    fn backward(
        &self,
        input: &[f64],
        output: &[f64],
        grad_output: &[f64],
        grad_input: &mut [f64],
        param_grad: &mut [f64],
    );

    /// Re-initialize the layer's parameters, if it has any.
    fn randomize(&mut self, _rng: &mut crate::utils::SimpleRng) {}

    /// Unique tag identifying this layer type in the serialized format.
    fn type_tag(&self) -> &'static str;

    /// Encode this layer's shape parameters and weights as a payload for
    /// the serializer.
    fn encode_payload(&self) -> Result<Vec<u8>>;
}
