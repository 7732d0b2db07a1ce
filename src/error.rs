//! Error types shared across the crate.
//!
//! Construction-time shape errors are fatal and surfaced immediately; no
//! partially-built network or tensor is ever returned alongside an error.

use thiserror::Error;

/// Errors produced by tensors, layers, networks, and the serializer.
#[derive(Error, Debug)]
pub enum Error {
    /// Layer or tensor dimensions are inconsistent, either at construction
    /// time (an invalid layer chain, a zero-sized tensor) or at call time
    /// (an input vector whose length does not match the declared shape).
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Tensor indexing outside the declared extents.
    #[error("index ({x}, {y}, {z}) out of bounds for {width}x{height}x{depth} tensor")]
    OutOfBounds {
        x: usize,
        y: usize,
        z: usize,
        width: usize,
        height: usize,
        depth: usize,
    },

    /// Backward propagation was driven with a context that does not belong
    /// to a matching forward call on the same network.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Deserialization encountered a layer type tag with no registered
    /// decoder.
    #[error("unknown layer type {0:?}")]
    UnknownLayerType(String),

    /// Deserialization encountered a truncated envelope or a payload whose
    /// contents disagree with the shape implied by its header.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// File I/O failure while saving or loading a network or configuration.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        Error::ShapeMismatch(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptData(msg.into())
    }
}
