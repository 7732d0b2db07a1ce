//! Elementwise activation layers
//!
//! Sigmoid, Tanh, and ReLU applied componentwise. Sigmoid and Tanh
//! derivatives are computed from the cached forward output alone
//! (`o(1-o)` and `1-o²`); ReLU uses the sign of the cached input.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::Layer;
use crate::Result;

#[derive(Serialize, Deserialize)]
struct SizePayload {
    size: usize,
}

fn decode_size(data: &[u8], what: &str) -> Result<usize> {
    let p: SizePayload = serde_json::from_slice(data)
        .map_err(|e| Error::corrupt(format!("{} payload: {}", what, e)))?;
    if p.size == 0 {
        return Err(Error::corrupt(format!("{} size must be at least 1", what)));
    }
    Ok(p.size)
}

fn encode_size(size: usize) -> Result<Vec<u8>> {
    serde_json::to_vec(&SizePayload { size }).map_err(|e| Error::corrupt(e.to_string()))
}

/// Logistic sigmoid activation, `f(x) = 1 / (1 + e^-x)`.
pub struct Sigmoid {
    size: usize,
}

impl Sigmoid {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_size(data, "sigmoid")?))
    }
}

impl Layer for Sigmoid {
    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = 1.0 / (1.0 + (-x).exp());
        }
    }

    fn backward(
        &self,
        _input: &[f64],
        output: &[f64],
        grad_output: &[f64],
        grad_input: &mut [f64],
        _param_grad: &mut [f64],
    ) {
        // f'(x) = f(x)(1 - f(x)), computable from the cached output.
        for ((gi, &o), &g) in grad_input.iter_mut().zip(output).zip(grad_output) {
            *gi = g * o * (1.0 - o);
        }
    }

    fn type_tag(&self) -> &'static str {
        "sigmoid"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        encode_size(self.size)
    }
}

/// Hyperbolic tangent activation.
pub struct Tanh {
    size: usize,
}

impl Tanh {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_size(data, "tanh")?))
    }
}

impl Layer for Tanh {
    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x.tanh();
        }
    }

    fn backward(
        &self,
        _input: &[f64],
        output: &[f64],
        grad_output: &[f64],
        grad_input: &mut [f64],
        _param_grad: &mut [f64],
    ) {
        // f'(x) = 1 - tanh(x)^2.
        for ((gi, &o), &g) in grad_input.iter_mut().zip(output).zip(grad_output) {
            *gi = g * (1.0 - o * o);
        }
    }

    fn type_tag(&self) -> &'static str {
        "tanh"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        encode_size(self.size)
    }
}

/// Rectified linear unit, `f(x) = max(0, x)`.
pub struct Relu {
    size: usize,
}

impl Relu {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_size(data, "relu")?))
    }
}

impl Layer for Relu {
    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        for (out, &x) in output.iter_mut().zip(input) {
            *out = if x > 0.0 { x } else { 0.0 };
        }
    }

    fn backward(
        &self,
        input: &[f64],
        _output: &[f64],
        grad_output: &[f64],
        grad_input: &mut [f64],
        _param_grad: &mut [f64],
    ) {
        for ((gi, &x), &g) in grad_input.iter_mut().zip(input).zip(grad_output) {
            *gi = if x > 0.0 { g } else { 0.0 };
        }
    }

    fn type_tag(&self) -> &'static str {
        "relu"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        encode_size(self.size)
    }
}
