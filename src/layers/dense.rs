//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer that performs the affine transformation
//! `output = weights · input + bias`. To introduce non-linearities, follow a
//! DenseLayer with an activation layer such as Sigmoid or Tanh.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::Layer;
use crate::utils::SimpleRng;
use crate::Result;

/// Serialized form of a dense layer.
#[derive(Serialize, Deserialize)]
struct DensePayload {
    input_count: usize,
    output_count: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
}

/// Dense (fully connected) layer with weights and biases.
///
/// Performs `y = W x + b` where W is the weight matrix stored row-major
/// with shape `[output_count][input_count]` and b has length `output_count`.
///
/// Parameters are stored flat as `[weights..., biases...]` so the optimizer
/// can update them as a single slice.
///
/// # Example
///
/// ```
/// use gradnet::layers::{DenseLayer, Layer};
/// use gradnet::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(784, 512, &mut rng).unwrap();
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 512);
/// ```
pub struct DenseLayer {
    input_count: usize,
    output_count: usize,
    /// `[output_count * input_count]` weights followed by `[output_count]` biases.
    params: Vec<f64>,
}

impl DenseLayer {
    /// Create a new DenseLayer with Xavier initialization.
    ///
    /// Weights are sampled uniformly from `[-limit, limit]` with
    /// `limit = sqrt(6 / (input_count + output_count))`; biases start at zero.
    ///
    /// Fails with `ShapeMismatch` if either count is zero.
    pub fn new(input_count: usize, output_count: usize, rng: &mut SimpleRng) -> Result<Self> {
        if input_count == 0 || output_count == 0 {
            return Err(Error::shape(format!(
                "dense layer sizes must be at least 1, got {}x{}",
                input_count, output_count
            )));
        }
        let mut layer = Self {
            input_count,
            output_count,
            params: vec![0.0; output_count * input_count + output_count],
        };
        layer.randomize(rng);
        Ok(layer)
    }

    /// Reconstruct a DenseLayer from explicit weights and biases.
    ///
    /// `weights` must hold `output_count * input_count` values and `biases`
    /// `output_count` values; anything else is a `ShapeMismatch`.
    pub fn from_parts(
        input_count: usize,
        output_count: usize,
        weights: Vec<f64>,
        biases: Vec<f64>,
    ) -> Result<Self> {
        if input_count == 0 || output_count == 0 {
            return Err(Error::shape(format!(
                "dense layer sizes must be at least 1, got {}x{}",
                input_count, output_count
            )));
        }
        if weights.len() != output_count * input_count {
            return Err(Error::shape(format!(
                "expected {} dense weights, got {}",
                output_count * input_count,
                weights.len()
            )));
        }
        if biases.len() != output_count {
            return Err(Error::shape(format!(
                "expected {} dense biases, got {}",
                output_count,
                biases.len()
            )));
        }
        let mut params = weights;
        params.extend_from_slice(&biases);
        Ok(Self {
            input_count,
            output_count,
            params,
        })
    }

    /// Decode the payload produced by `encode_payload`.
    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        let p: DensePayload = serde_json::from_slice(data)
            .map_err(|e| Error::corrupt(format!("dense layer payload: {}", e)))?;
        Self::from_parts(p.input_count, p.output_count, p.weights, p.biases)
            .map_err(|e| Error::corrupt(e.to_string()))
    }

    fn weights(&self) -> &[f64] {
        &self.params[..self.output_count * self.input_count]
    }

    fn biases(&self) -> &[f64] {
        &self.params[self.output_count * self.input_count..]
    }
}

impl Layer for DenseLayer {
    fn input_size(&self) -> usize {
        self.input_count
    }

    fn output_size(&self) -> usize {
        self.output_count
    }

    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn parameters(&self) -> &[f64] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        let weights = self.weights();
        let biases = self.biases();
        for (j, out) in output.iter_mut().enumerate() {
            let row = &weights[j * self.input_count..(j + 1) * self.input_count];
            let mut sum = biases[j];
            for (w, x) in row.iter().zip(input) {
                sum += w * x;
            }
            *out = sum;
        }
    }

    fn backward(
        &self,
        input: &[f64],
        _output: &[f64],
        grad_output: &[f64],
        grad_input: &mut [f64],
        param_grad: &mut [f64],
    ) {
        let weight_count = self.output_count * self.input_count;
        let (grad_weights, grad_biases) = param_grad.split_at_mut(weight_count);
        let weights = self.weights();

        // Weight gradient is the outer product of the upstream gradient and
        // the input; bias gradient equals the upstream gradient.
        for (j, &g) in grad_output.iter().enumerate() {
            let grad_row = &mut grad_weights[j * self.input_count..(j + 1) * self.input_count];
            for (gw, x) in grad_row.iter_mut().zip(input) {
                *gw += g * x;
            }
            grad_biases[j] += g;
        }

        // Input gradient is W^T · upstream.
        for g in grad_input.iter_mut() {
            *g = 0.0;
        }
        for (j, &g) in grad_output.iter().enumerate() {
            let row = &weights[j * self.input_count..(j + 1) * self.input_count];
            for (gi, w) in grad_input.iter_mut().zip(row) {
                *gi += w * g;
            }
        }
    }

    fn randomize(&mut self, rng: &mut SimpleRng) {
        // Xavier initialization: limit = sqrt(6 / (fan_in + fan_out))
        let limit = (6.0 / (self.input_count + self.output_count) as f64).sqrt();
        let weight_count = self.output_count * self.input_count;
        for w in &mut self.params[..weight_count] {
            *w = rng.gen_range_f64(-limit, limit);
        }
        for b in &mut self.params[weight_count..] {
            *b = 0.0;
        }
    }

    fn type_tag(&self) -> &'static str {
        "dense"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        let payload = DensePayload {
            input_count: self.input_count,
            output_count: self.output_count,
            weights: self.weights().to_vec(),
            biases: self.biases().to_vec(),
        };
        serde_json::to_vec(&payload).map_err(|e| Error::corrupt(e.to_string()))
    }
}
