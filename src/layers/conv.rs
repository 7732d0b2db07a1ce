//! Convolutional layer implementation
//!
//! This module provides a ConvLayer that slides a bank of learnable filters
//! over a 3D input tensor. Each filter spans the full input depth, so the
//! output tensor has one channel per filter. There is no implicit padding;
//! precede the layer with a BorderLayer when padding is needed.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::Layer;
use crate::utils::SimpleRng;
use crate::Result;

/// Serialized form of a convolutional layer.
#[derive(Serialize, Deserialize)]
struct ConvPayload {
    filter_count: usize,
    filter_width: usize,
    filter_height: usize,
    stride: usize,
    input_width: usize,
    input_height: usize,
    input_depth: usize,
    filters: Vec<f64>,
    biases: Vec<f64>,
}

/// Convolutional layer with learnable filters.
///
/// The input is interpreted as a tensor `input_width × input_height ×
/// input_depth` in the standard crate layout (see [`Tensor3`]); the
/// output is `output_width() × output_height() × filter_count`, where
/// each output dimension is `floor((input - filter) / stride) + 1`.
/// Windows that would extend past the input bounds are not evaluated.
///
/// Parameters are stored flat as all filters (each `filter_width ×
/// filter_height × input_depth`, one after the other) followed by one bias
/// per filter.
///
/// [`Tensor3`]: crate::tensor::Tensor3
pub struct ConvLayer {
    filter_count: usize,
    filter_width: usize,
    filter_height: usize,
    stride: usize,
    input_width: usize,
    input_height: usize,
    input_depth: usize,
    /// `[filter_count * filter_size]` filter weights then `[filter_count]` biases.
    params: Vec<f64>,
}

impl ConvLayer {
    /// Create a new ConvLayer with Xavier initialization.
    ///
    /// Fails with `ShapeMismatch` if any dimension is zero, the stride is
    /// zero, or the filter does not fit inside the input at least once.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filter_count: usize,
        filter_width: usize,
        filter_height: usize,
        stride: usize,
        input_width: usize,
        input_height: usize,
        input_depth: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        Self::validate(
            filter_count,
            filter_width,
            filter_height,
            stride,
            input_width,
            input_height,
            input_depth,
        )?;
        let filter_size = filter_width * filter_height * input_depth;
        let mut layer = Self {
            filter_count,
            filter_width,
            filter_height,
            stride,
            input_width,
            input_height,
            input_depth,
            params: vec![0.0; filter_count * filter_size + filter_count],
        };
        layer.randomize(rng);
        Ok(layer)
    }

    /// Reconstruct a ConvLayer from explicit filter weights and biases.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        filter_count: usize,
        filter_width: usize,
        filter_height: usize,
        stride: usize,
        input_width: usize,
        input_height: usize,
        input_depth: usize,
        filters: Vec<f64>,
        biases: Vec<f64>,
    ) -> Result<Self> {
        Self::validate(
            filter_count,
            filter_width,
            filter_height,
            stride,
            input_width,
            input_height,
            input_depth,
        )?;
        let filter_size = filter_width * filter_height * input_depth;
        if filters.len() != filter_count * filter_size {
            return Err(Error::shape(format!(
                "expected {} filter weights, got {}",
                filter_count * filter_size,
                filters.len()
            )));
        }
        if biases.len() != filter_count {
            return Err(Error::shape(format!(
                "expected {} filter biases, got {}",
                filter_count,
                biases.len()
            )));
        }
        let mut params = filters;
        params.extend_from_slice(&biases);
        Ok(Self {
            filter_count,
            filter_width,
            filter_height,
            stride,
            input_width,
            input_height,
            input_depth,
            params,
        })
    }

    /// Decode the payload produced by `encode_payload`.
    pub fn decode_payload(data: &[u8]) -> Result<Self> {
        let p: ConvPayload = serde_json::from_slice(data)
            .map_err(|e| Error::corrupt(format!("conv layer payload: {}", e)))?;
        Self::from_parts(
            p.filter_count,
            p.filter_width,
            p.filter_height,
            p.stride,
            p.input_width,
            p.input_height,
            p.input_depth,
            p.filters,
            p.biases,
        )
        .map_err(|e| Error::corrupt(e.to_string()))
    }

    fn validate(
        filter_count: usize,
        filter_width: usize,
        filter_height: usize,
        stride: usize,
        input_width: usize,
        input_height: usize,
        input_depth: usize,
    ) -> Result<()> {
        if filter_count == 0
            || filter_width == 0
            || filter_height == 0
            || input_width == 0
            || input_height == 0
            || input_depth == 0
        {
            return Err(Error::shape(
                "convolution dimensions must be at least 1".to_string(),
            ));
        }
        if stride == 0 {
            return Err(Error::shape("convolution stride must be at least 1".to_string()));
        }
        if filter_width > input_width || filter_height > input_height {
            return Err(Error::shape(format!(
                "{}x{} filter does not fit in {}x{} input",
                filter_width, filter_height, input_width, input_height
            )));
        }
        Ok(())
    }

    /// Output tensor width: `floor((input_width - filter_width) / stride) + 1`.
    pub fn output_width(&self) -> usize {
        (self.input_width - self.filter_width) / self.stride + 1
    }

    /// Output tensor height: `floor((input_height - filter_height) / stride) + 1`.
    pub fn output_height(&self) -> usize {
        (self.input_height - self.filter_height) / self.stride + 1
    }

    /// Output tensor depth: one channel per filter.
    pub fn output_depth(&self) -> usize {
        self.filter_count
    }

    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    fn filter_size(&self) -> usize {
        self.filter_width * self.filter_height * self.input_depth
    }

    fn filters(&self) -> &[f64] {
        &self.params[..self.filter_count * self.filter_size()]
    }

    fn biases(&self) -> &[f64] {
        &self.params[self.filter_count * self.filter_size()..]
    }
}

impl Layer for ConvLayer {
    fn input_size(&self) -> usize {
        self.input_width * self.input_height * self.input_depth
    }

    fn output_size(&self) -> usize {
        self.output_width() * self.output_height() * self.filter_count
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
        let out_w = self.output_width();
        let out_h = self.output_height();
        let filter_size = self.filter_size();
        let filters = self.filters();
        let biases = self.biases();

        for oy in 0..out_h {
            let in_y0 = oy * self.stride;
            for ox in 0..out_w {
                let in_x0 = ox * self.stride;
                for f in 0..self.filter_count {
                    let filter = &filters[f * filter_size..(f + 1) * filter_size];
                    let mut sum = biases[f];
                    for fy in 0..self.filter_height {
                        let in_row = ((in_y0 + fy) * self.input_width + in_x0) * self.input_depth;
                        let f_row = fy * self.filter_width * self.input_depth;
                        let span = self.filter_width * self.input_depth;
                        for (w, x) in filter[f_row..f_row + span]
                            .iter()
                            .zip(&input[in_row..in_row + span])
                        {
                            sum += w * x;
                        }
                    }
                    output[(ox + oy * out_w) * self.filter_count + f] = sum;
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
        param_grad: &mut [f64],
    ) {
        let out_w = self.output_width();
        let out_h = self.output_height();
        let filter_size = self.filter_size();
        let filters = self.filters();
        let (grad_filters, grad_biases) = param_grad.split_at_mut(self.filter_count * filter_size);

        for g in grad_input.iter_mut() {
            *g = 0.0;
        }

        for oy in 0..out_h {
            let in_y0 = oy * self.stride;
            for ox in 0..out_w {
                let in_x0 = ox * self.stride;
                for f in 0..self.filter_count {
                    let g = grad_output[(ox + oy * out_w) * self.filter_count + f];
                    if g == 0.0 {
                        continue;
                    }
                    grad_biases[f] += g;
                    let filter = &filters[f * filter_size..(f + 1) * filter_size];
                    let grad_filter = &mut grad_filters[f * filter_size..(f + 1) * filter_size];
                    for fy in 0..self.filter_height {
                        let in_row = ((in_y0 + fy) * self.input_width + in_x0) * self.input_depth;
                        let f_row = fy * self.filter_width * self.input_depth;
                        let span = self.filter_width * self.input_depth;
                        // Filter gradient correlates the input window with the
                        // upstream value; input gradient scatters the filter
                        // weights back through the same window.
                        for k in 0..span {
                            grad_filter[f_row + k] += g * input[in_row + k];
                            grad_input[in_row + k] += g * filter[f_row + k];
                        }
                    }
                }
            }
        }
    }

    fn randomize(&mut self, rng: &mut SimpleRng) {
        // Xavier initialization adapted for convolutions:
        // fan_in = fan over one filter window, fan_out = filter_count * window.
        let window = self.filter_width * self.filter_height;
        let fan_in = (self.input_depth * window) as f64;
        let fan_out = (self.filter_count * window) as f64;
        let limit = (6.0 / (fan_in + fan_out)).sqrt();

        let weight_count = self.filter_count * self.filter_size();
        for w in &mut self.params[..weight_count] {
            *w = rng.gen_range_f64(-limit, limit);
        }
        for b in &mut self.params[weight_count..] {
            *b = 0.0;
        }
    }

    fn type_tag(&self) -> &'static str {
        "conv"
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        let payload = ConvPayload {
            filter_count: self.filter_count,
            filter_width: self.filter_width,
            filter_height: self.filter_height,
            stride: self.stride,
            input_width: self.input_width,
            input_height: self.input_height,
            input_depth: self.input_depth,
            filters: self.filters().to_vec(),
            biases: self.biases().to_vec(),
        };
        serde_json::to_vec(&payload).map_err(|e| Error::corrupt(e.to_string()))
    }
}
