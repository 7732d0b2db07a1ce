//! Max pooling layer implementation
//!
//! Reduces the width and height of an input tensor by keeping the maximum
//! value from each of many small two-dimensional regions in each depth
//! channel. Trailing windows at the right and bottom edges may be truncated
//! when the spans do not divide the input dimensions evenly.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::Layer;
use crate::Result;

/// Serialized form of a max pooling layer.
#[derive(Serialize, Deserialize)]
struct MaxPoolingPayload {
    x_span: usize,
    y_span: usize,
    input_width: usize,
    input_height: usize,
    input_depth: usize,
}

/// Max pooling layer over `x_span × y_span` windows, per depth channel.
///
/// Output dimensions are `ceil(input / span)` in each axis; depth is
/// unchanged. The layer has no trainable parameters.
///
/// Backward routes the entire upstream gradient for each window to the
/// position that held the window's maximum during forward; everything else
/// receives zero. Ties are broken deterministically by the first maximum in
/// scan order (x outer, y inner).
pub struct MaxPoolingLayer {
    x_span: usize,
    y_span: usize,
    input_width: usize,
    input_height: usize,
    input_depth: usize,
}

impl MaxPoolingLayer {
    /// Create a new MaxPoolingLayer.
    ///
    /// Fails with `ShapeMismatch` if any span or input dimension is zero.
    pub fn new(
        x_span: usize,
        y_span: usize,
        input_width: usize,
        input_height: usize,
        input_depth: usize,
    ) -> Result<Self> {
        if x_span == 0 || y_span == 0 {
            return Err(Error::shape("pooling spans must be at least 1".to_string()));
        }
        if input_width == 0 || input_height == 0 || input_depth == 0 {
            return Err(Error::shape(
                "pooling input dimensions must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            x_span,
            y_span,
            input_width,
            input_height,
            input_depth,
        })
    }

    /// Decode the payload produced by `encode_payload`.
    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        let p: MaxPoolingPayload = serde_json::from_slice(data)
            .map_err(|e| Error::corrupt(format!("max pooling payload: {}", e)))?;
        Self::new(
            p.x_span,
            p.y_span,
            p.input_width,
            p.input_height,
            p.input_depth,
        )
        .map_err(|e| Error::corrupt(e.to_string()))
    }

    /// Output tensor width: `ceil(input_width / x_span)`.
    pub fn output_width(&self) -> usize {
        self.input_width.div_ceil(self.x_span)
    }

    /// Output tensor height: `ceil(input_height / y_span)`.
    pub fn output_height(&self) -> usize {
        self.input_height.div_ceil(self.y_span)
    }

    /// Find the maximum value and its position for one window and channel.
    ///
    /// Scans x in the outer loop and y in the inner loop with a strict
    /// comparison, so the first maximum encountered in that order wins ties.
    fn window_max(&self, input: &[f64], ox: usize, oy: usize, z: usize) -> (f64, usize, usize) {
        let x0 = ox * self.x_span;
        let x1 = (x0 + self.x_span - 1).min(self.input_width - 1);
        let y0 = oy * self.y_span;
        let y1 = (y0 + self.y_span - 1).min(self.input_height - 1);

        let mut best = f64::NEG_INFINITY;
        let mut best_x = x0;
        let mut best_y = y0;
        for x in x0..=x1 {
            for y in y0..=y1 {
                let v = input[(x + y * self.input_width) * self.input_depth + z];
                if v > best {
                    best = v;
                    best_x = x;
                    best_y = y;
                }
            }
        }
        (best, best_x, best_y)
    }
}

impl Layer for MaxPoolingLayer {
    fn input_size(&self) -> usize {
        self.input_width * self.input_height * self.input_depth
    }

    fn output_size(&self) -> usize {
        self.output_width() * self.output_height() * self.input_depth
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        let out_w = self.output_width();
        let out_h = self.output_height();
        for oy in 0..out_h {
            for ox in 0..out_w {
                for z in 0..self.input_depth {
                    let (value, _, _) = self.window_max(input, ox, oy, z);
                    output[(ox + oy * out_w) * self.input_depth + z] = value;
                }
            }
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
        // The argmax is recomputed from the cached forward input; the scan
        // order is identical to forward, so the same cell is chosen.
        for g in grad_input.iter_mut() {
            *g = 0.0;
        }
        let out_w = self.output_width();
        let out_h = self.output_height();
        for oy in 0..out_h {
            for ox in 0..out_w {
                for z in 0..self.input_depth {
                    let (_, best_x, best_y) = self.window_max(input, ox, oy, z);
                    let g = grad_output[(ox + oy * out_w) * self.input_depth + z];
                    grad_input[(best_x + best_y * self.input_width) * self.input_depth + z] += g;
                }
            }
        }
    }

    fn type_tag(&self) -> &'static str {
        "maxpool"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        let payload = MaxPoolingPayload {
            x_span: self.x_span,
            y_span: self.y_span,
            input_width: self.input_width,
            input_height: self.input_height,
            input_depth: self.input_depth,
        };
        serde_json::to_vec(&payload).map_err(|e| Error::corrupt(e.to_string()))
    }
}
