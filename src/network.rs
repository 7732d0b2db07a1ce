//! Network composition: an ordered sequence of layers forming one
//! end-to-end differentiable function.
//!
//! Forward propagation records every intermediate vector in an
//! [`Activations`] context; backward propagation replays that context in
//! reverse, threading the cost gradient through each layer and accumulating
//! per-layer parameter gradients. Because the context is an explicit value
//! rather than hidden layer state, any number of samples can be propagated
//! concurrently against the same (read-only) network.

use crate::error::Error;
use crate::gradient::NetworkGrad;
use crate::layers::Layer;
use crate::utils::SimpleRng;
use crate::Result;

/// Propagation context produced by [`Network::forward`].
///
/// Holds the input vector and every layer output, in order. Consumed by
/// [`Network::backward`] to replay the chain rule.
#[derive(Debug, Clone)]
pub struct Activations {
    values: Vec<Vec<f64>>,
}

impl Activations {
    /// The network output: the last layer's output vector.
    pub fn output(&self) -> &[f64] {
        self.values.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// The input vector the forward pass was driven with.
    pub fn input(&self) -> &[f64] {
        self.values.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of recorded vectors (layer count plus one).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An ordered sequence of layers.
///
/// The constructor validates that each layer's output shape equals the next
/// layer's input shape, so shape errors surface at construction and never
/// during propagation.
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
}

impl Network {
    /// Build a network from a layer sequence.
    ///
    /// Fails with `ShapeMismatch` if the sequence is empty or any adjacent
    /// pair of layers disagrees on its shared vector length.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::shape("network needs at least one layer".to_string()));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            let out = pair[0].output_size();
            let expected = pair[1].input_size();
            if out != expected {
                return Err(Error::shape(format!(
                    "layer {} ({}) outputs {} values but layer {} ({}) expects {}",
                    i,
                    pair[0].type_tag(),
                    out,
                    i + 1,
                    pair[1].type_tag(),
                    expected
                )));
            }
        }
        Ok(Self { layers })
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Borrow the layer sequence.
    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    /// Expected input vector length.
    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    /// Produced output vector length.
    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    /// Total trainable parameter count across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Re-initialize every parameterized layer.
    pub fn randomize(&mut self, rng: &mut SimpleRng) {
        for layer in &mut self.layers {
            layer.randomize(rng);
        }
    }

    /// Forward-propagate `input` through every layer, retaining each
    /// intermediate output for a subsequent [`backward`](Self::backward).
    ///
    /// Fails with `ShapeMismatch` if `input` has the wrong length. Forward
    /// is idempotent: the same input and parameters give the same context.
    pub fn forward(&self, input: &[f64]) -> Result<Activations> {
        if input.len() != self.input_size() {
            return Err(Error::shape(format!(
                "network expects {} inputs, got {}",
                self.input_size(),
                input.len()
            )));
        }
        let mut values = Vec::with_capacity(self.layers.len() + 1);
        values.push(input.to_vec());
        for layer in &self.layers {
            let mut output = vec![0.0; layer.output_size()];
            layer.forward(&values[values.len() - 1], &mut output);
            values.push(output);
        }
        Ok(Activations { values })
    }

    /// Backward-propagate a cost gradient through the network.
    ///
    /// `trace` must be the context from a forward call on this same network
    /// and `grad_output` the cost gradient with respect to its output.
    /// Parameter gradients are accumulated into `grads`; the return value is
    /// the cost gradient with respect to the network input.
    ///
    /// Fails with `InvalidState` if the context does not match this network,
    /// and `ShapeMismatch` if `grad_output` or `grads` has the wrong shape.
    pub fn backward(
        &self,
        trace: &Activations,
        grad_output: &[f64],
        grads: &mut NetworkGrad,
    ) -> Result<Vec<f64>> {
        if trace.values.len() != self.layers.len() + 1 {
            return Err(Error::InvalidState(format!(
                "propagation context has {} vectors, expected {}; backward must \
                 consume the context of a forward call on the same network",
                trace.values.len(),
                self.layers.len() + 1
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if trace.values[i].len() != layer.input_size()
                || trace.values[i + 1].len() != layer.output_size()
            {
                return Err(Error::InvalidState(format!(
                    "propagation context does not match layer {} ({})",
                    i,
                    layer.type_tag()
                )));
            }
        }
        if grad_output.len() != self.output_size() {
            return Err(Error::shape(format!(
                "output gradient has {} values, expected {}",
                grad_output.len(),
                self.output_size()
            )));
        }
        grads.check_shape(self)?;

        let mut upstream = grad_output.to_vec();
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let mut grad_input = vec![0.0; layer.input_size()];
            layer.backward(
                &trace.values[i],
                &trace.values[i + 1],
                &upstream,
                &mut grad_input,
                grads.layer_mut(i),
            );
            upstream = grad_input;
        }
        Ok(upstream)
    }

    /// Apply `f` to each layer's mutable parameter slice, in layer order.
    ///
    /// Used by optimizers to walk the parameters alongside a gradient buffer.
    pub fn visit_parameters_mut(&mut self, mut f: impl FnMut(usize, &mut [f64])) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            f(i, layer.parameters_mut());
        }
    }
}
