//! Softmax and log-softmax layers
//!
//! Both use the max-shifted formulation so large inputs cannot overflow the
//! exponentials. Softmax backward applies the full Jacobian-vector product
//! `(diag(p) - p p^T) · g`, not an elementwise product.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::Layer;
use crate::Result;

#[derive(Serialize, Deserialize)]
struct SoftmaxPayload {
    size: usize,
}

fn decode_size(data: &[u8], what: &str) -> Result<usize> {
    let p: SoftmaxPayload = serde_json::from_slice(data)
        .map_err(|e| Error::corrupt(format!("{} payload: {}", what, e)))?;
    if p.size == 0 {
        return Err(Error::corrupt(format!("{} size must be at least 1", what)));
    }
    Ok(p.size)
}

fn encode_size(size: usize) -> Result<Vec<u8>> {
    serde_json::to_vec(&SoftmaxPayload { size }).map_err(|e| Error::corrupt(e.to_string()))
}

/// Softmax layer normalizing an input vector into a probability distribution.
pub struct Softmax {
    size: usize,
}

impl Softmax {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_size(data, "softmax")?))
    }
}

impl Layer for Softmax {
    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        let max = input.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for (out, &x) in output.iter_mut().zip(input) {
            let e = (x - max).exp();
            *out = e;
            sum += e;
        }
        for out in output.iter_mut() {
            *out /= sum;
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
        // (diag(p) - p p^T) g  =  p .* (g - p.g)
        let dot: f64 = output.iter().zip(grad_output).map(|(p, g)| p * g).sum();
        for ((gi, &p), &g) in grad_input.iter_mut().zip(output).zip(grad_output) {
            *gi = p * (g - dot);
        }
    }

    fn type_tag(&self) -> &'static str {
        "softmax"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        encode_size(self.size)
    }
}

/// Log-softmax layer producing log-probabilities.
///
/// Pairs with [`DotCost`](crate::cost::DotCost) against one-hot targets to
/// form a numerically stable negative log-likelihood.
pub struct LogSoftmax {
    size: usize,
}

impl LogSoftmax {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        Ok(Self::new(decode_size(data, "log softmax")?))
    }
}

impl Layer for LogSoftmax {
    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        let max = input.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let log_sum = input.iter().map(|&x| (x - max).exp()).sum::<f64>().ln() + max;
        for (out, &x) in output.iter_mut().zip(input) {
            *out = x - log_sum;
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
        // d/dx_i = g_i - softmax(x)_i * sum(g)
        let grad_sum: f64 = grad_output.iter().sum();
        for ((gi, &log_p), &g) in grad_input.iter_mut().zip(output).zip(grad_output) {
            *gi = g - log_p.exp() * grad_sum;
        }
    }

    fn type_tag(&self) -> &'static str {
        "logsoftmax"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        encode_size(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_softmax_sums_to_one() {
        let layer = Softmax::new(4);
        let mut out = vec![0.0; 4];
        layer.forward(&[1.0, 2.0, 3.0, 4.0], &mut out);
        let sum: f64 = out.iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_softmax_large_inputs_stable() {
        let layer = Softmax::new(2);
        let mut out = vec![0.0; 2];
        layer.forward(&[1000.0, 1000.0], &mut out);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_softmax_jacobian_rows_sum_to_zero() {
        // Softmax output sums to 1, so the input gradient of any upstream
        // vector must sum to zero.
        let layer = Softmax::new(3);
        let input = [0.3, -1.2, 2.0];
        let mut output = vec![0.0; 3];
        layer.forward(&input, &mut output);

        let mut grad_in = vec![0.0; 3];
        layer.backward(&input, &output, &[1.0, -0.5, 0.25], &mut grad_in, &mut []);
        let sum: f64 = grad_in.iter().sum();
        assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_softmax_matches_softmax_log() {
        let soft = Softmax::new(3);
        let log_soft = LogSoftmax::new(3);
        let input = [0.5, -0.3, 1.7];

        let mut p = vec![0.0; 3];
        soft.forward(&input, &mut p);
        let mut log_p = vec![0.0; 3];
        log_soft.forward(&input, &mut log_p);

        for (lp, pv) in log_p.iter().zip(&p) {
            assert_abs_diff_eq!(*lp, pv.ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_log_softmax_backward_one_hot() {
        // With upstream gradient -t (DotCost on a one-hot target), the input
        // gradient is softmax(x) - t.
        let layer = LogSoftmax::new(3);
        let input = [0.1, 0.2, 0.3];
        let mut output = vec![0.0; 3];
        layer.forward(&input, &mut output);

        let mut grad_in = vec![0.0; 3];
        layer.backward(&input, &output, &[0.0, -1.0, 0.0], &mut grad_in, &mut []);

        let p: Vec<f64> = output.iter().map(|lp| lp.exp()).collect();
        assert_abs_diff_eq!(grad_in[0], p[0], epsilon = 1e-12);
        assert_abs_diff_eq!(grad_in[1], p[1] - 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad_in[2], p[2], epsilon = 1e-12);
    }
}
