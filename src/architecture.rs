//! JSON configuration for network architectures and training runs.
//!
//! An architecture file lists layers in order; [`ArchitectureConfig::build`]
//! instantiates them with freshly randomized parameters. A training file
//! names the optimizer and its hyperparameters. Both are plain serde
//! structures, so configs can also be built in code and serialized back out.
//!
//! ```json
//! {
//!   "layers": [
//!     { "type": "dense", "inputs": 4, "outputs": 8 },
//!     { "type": "sigmoid", "size": 8 },
//!     { "type": "dense", "inputs": 8, "outputs": 3 },
//!     { "type": "softmax", "size": 3 }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layers::{
    BorderLayer, ConvLayer, DenseLayer, Layer, LogSoftmax, MaxPoolingLayer, Relu, Sigmoid,
    Softmax, Tanh,
};
use crate::network::Network;
use crate::utils::SimpleRng;
use crate::Result;

/// One layer description in an architecture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerConfig {
    Dense {
        inputs: usize,
        outputs: usize,
    },
    Conv {
        filters: usize,
        filter_width: usize,
        filter_height: usize,
        stride: usize,
        input_width: usize,
        input_height: usize,
        input_depth: usize,
    },
    Maxpool {
        x_span: usize,
        y_span: usize,
        input_width: usize,
        input_height: usize,
        input_depth: usize,
    },
    Border {
        input_width: usize,
        input_height: usize,
        input_depth: usize,
        left: usize,
        right: usize,
        top: usize,
        bottom: usize,
    },
    Sigmoid {
        size: usize,
    },
    Tanh {
        size: usize,
    },
    Relu {
        size: usize,
    },
    Softmax {
        size: usize,
    },
    Logsoftmax {
        size: usize,
    },
}

impl LayerConfig {
    fn build(&self, rng: &mut SimpleRng) -> Result<Box<dyn Layer>> {
        Ok(match *self {
            LayerConfig::Dense { inputs, outputs } => {
                Box::new(DenseLayer::new(inputs, outputs, rng)?)
            }
            LayerConfig::Conv {
                filters,
                filter_width,
                filter_height,
                stride,
                input_width,
                input_height,
                input_depth,
            } => Box::new(ConvLayer::new(
                filters,
                filter_width,
                filter_height,
                stride,
                input_width,
                input_height,
                input_depth,
                rng,
            )?),
            LayerConfig::Maxpool {
                x_span,
                y_span,
                input_width,
                input_height,
                input_depth,
            } => Box::new(MaxPoolingLayer::new(
                x_span,
                y_span,
                input_width,
                input_height,
                input_depth,
            )?),
            LayerConfig::Border {
                input_width,
                input_height,
                input_depth,
                left,
                right,
                top,
                bottom,
            } => Box::new(BorderLayer::new(
                input_width,
                input_height,
                input_depth,
                left,
                right,
                top,
                bottom,
            )?),
            LayerConfig::Sigmoid { size } => Box::new(Sigmoid::new(size)),
            LayerConfig::Tanh { size } => Box::new(Tanh::new(size)),
            LayerConfig::Relu { size } => Box::new(Relu::new(size)),
            LayerConfig::Softmax { size } => Box::new(Softmax::new(size)),
            LayerConfig::Logsoftmax { size } => Box::new(LogSoftmax::new(size)),
        })
    }
}

/// An ordered list of layer descriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerConfig>,
}

impl ArchitectureConfig {
    /// Instantiate the architecture with randomized parameters.
    ///
    /// Shape validation happens in [`Network::new`], so an architecture
    /// whose layers do not chain fails here with `ShapeMismatch`.
    pub fn build(&self, rng: &mut SimpleRng) -> Result<Network> {
        let layers = self
            .layers
            .iter()
            .map(|config| config.build(rng))
            .collect::<Result<Vec<_>>>()?;
        Network::new(layers)
    }
}

/// Which optimizer a training config selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
    Rmsprop,
}

/// Hyperparameters for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub optimizer: OptimizerKind,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// L2 weight-decay penalty. Zero disables regularization.
    #[serde(default)]
    pub l2_penalty: f64,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidState(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidState("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidState("batch size must be at least 1".into()));
        }
        if !(self.l2_penalty.is_finite() && self.l2_penalty >= 0.0) {
            return Err(Error::InvalidState(format!(
                "l2 penalty must be non-negative and finite, got {}",
                self.l2_penalty
            )));
        }
        Ok(())
    }
}

/// Read and parse an architecture file.
pub fn load_architecture(path: impl AsRef<Path>) -> Result<ArchitectureConfig> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| Error::corrupt(format!("invalid architecture config: {}", e)))
}

/// Read, parse, and validate a training file.
pub fn load_training_config(path: impl AsRef<Path>) -> Result<TrainingConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&text)
        .map_err(|e| Error::corrupt(format!("invalid training config: {}", e)))?;
    config.validate()?;
    Ok(config)
}
