//! Zero-padding border layer implementation
//!
//! Adds zero-valued border cells around a 3D tensor, with independent
//! left/right/top/bottom widths. Commonly placed before a ConvLayer so the
//! convolution can reach the input edges.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::Layer;
use crate::Result;

/// Serialized form of a border layer.
#[derive(Serialize, Deserialize)]
struct BorderPayload {
    input_width: usize,
    input_height: usize,
    input_depth: usize,
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
}

/// Layer that pads a tensor with a zero border on each side.
///
/// Forward copies the input into the interior of a larger all-zero tensor;
/// backward crops the same border amounts from the upstream gradient.
/// The layer has no trainable parameters.
pub struct BorderLayer {
    input_width: usize,
    input_height: usize,
    input_depth: usize,
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
}

impl BorderLayer {
    /// Create a new BorderLayer.
    ///
    /// Border widths may be zero; input dimensions must not be.
    pub fn new(
        input_width: usize,
        input_height: usize,
        input_depth: usize,
        left: usize,
        right: usize,
        top: usize,
        bottom: usize,
    ) -> Result<Self> {
        if input_width == 0 || input_height == 0 || input_depth == 0 {
            return Err(Error::shape(
                "border input dimensions must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            input_width,
            input_height,
            input_depth,
            left,
            right,
            top,
            bottom,
        })
    }

    /// Decode the payload produced by `encode_payload`.
    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        let p: BorderPayload = serde_json::from_slice(data)
            .map_err(|e| Error::corrupt(format!("border layer payload: {}", e)))?;
        Self::new(
            p.input_width,
            p.input_height,
            p.input_depth,
            p.left,
            p.right,
            p.top,
            p.bottom,
        )
        .map_err(|e| Error::corrupt(e.to_string()))
    }

    /// Output tensor width: input width plus left and right borders.
    pub fn output_width(&self) -> usize {
        self.input_width + self.left + self.right
    }

    /// Output tensor height: input height plus top and bottom borders.
    pub fn output_height(&self) -> usize {
        self.input_height + self.top + self.bottom
    }
}

impl Layer for BorderLayer {
    fn input_size(&self) -> usize {
        self.input_width * self.input_height * self.input_depth
    }

    fn output_size(&self) -> usize {
        self.output_width() * self.output_height() * self.input_depth
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        for v in output.iter_mut() {
            *v = 0.0;
        }
        let out_w = self.output_width();
        let row = self.input_width * self.input_depth;
        for y in 0..self.input_height {
            let src = y * row;
            let dst = ((y + self.top) * out_w + self.left) * self.input_depth;
            output[dst..dst + row].copy_from_slice(&input[src..src + row]);
        }
    }

    fn backward(
        &self,
        _input: &[f64],
        _output: &[f64],
        grad_output: &[f64],
        grad_input: &mut [f64],
        _param_grad: &mut [f64],
    ) {
        let out_w = self.output_width();
        let row = self.input_width * self.input_depth;
        for y in 0..self.input_height {
            let src = ((y + self.top) * out_w + self.left) * self.input_depth;
            let dst = y * row;
            grad_input[dst..dst + row].copy_from_slice(&grad_output[src..src + row]);
        }
    }

    fn type_tag(&self) -> &'static str {
        "border"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        let payload = BorderPayload {
            input_width: self.input_width,
            input_height: self.input_height,
            input_depth: self.input_depth,
            left: self.left,
            right: self.right,
            top: self.top,
            bottom: self.bottom,
        };
        serde_json::to_vec(&payload).map_err(|e| Error::corrupt(e.to_string()))
    }
}
