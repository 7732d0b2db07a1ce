//! Stable byte encoding of a trained network.
//!
//! The format is a little-endian envelope of self-describing records:
//!
//! ```text
//! [u32 layer_count]
//! per layer:
//!   [u32 tag_len] [tag bytes] [u64 payload_len] [payload bytes]
//! ```
//!
//! The tag names the layer type and selects the decoder; the payload is the
//! layer's own JSON record. Unknown tags fail with `UnknownLayerType` so a
//! file written by a newer build fails loudly instead of being misread.
//! Encoding the same network twice yields identical bytes.

use std::path::Path;

use crate::error::Error;
use crate::layers::{
    BorderLayer, ConvLayer, DenseLayer, Layer, LogSoftmax, MaxPoolingLayer, Relu, Sigmoid,
    Softmax, Tanh,
};
use crate::network::Network;
use crate::Result;

/// Encode `network` into the tag-and-length envelope.
pub fn encode(network: &Network) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let count = u32::try_from(network.len())
        .map_err(|_| Error::shape(format!("too many layers to encode: {}", network.len())))?;
    out.extend_from_slice(&count.to_le_bytes());
    for layer in network.layers() {
        let tag = layer.type_tag().as_bytes();
        out.extend_from_slice(&(tag.len() as u32).to_le_bytes());
        out.extend_from_slice(tag);
        let payload = layer.encode_payload()?;
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// Decode a network from bytes produced by [`encode`].
pub fn decode(data: &[u8]) -> Result<Network> {
    let mut reader = Reader { data, pos: 0 };
    let count = reader.read_u32()? as usize;
    let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(count);
    for _ in 0..count {
        let tag_len = reader.read_u32()? as usize;
        let tag = reader.read_str(tag_len)?;
        let payload_len = reader.read_u64()?;
        let payload_len = usize::try_from(payload_len)
            .map_err(|_| Error::corrupt(format!("payload length {} too large", payload_len)))?;
        let payload = reader.read_bytes(payload_len)?;
        layers.push(decode_layer(&tag, payload)?);
    }
    if reader.pos != data.len() {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after last layer",
            data.len() - reader.pos
        )));
    }
    Network::new(layers)
}

fn decode_layer(tag: &str, payload: &[u8]) -> Result<Box<dyn Layer>> {
    Ok(match tag {
        "dense" => Box::new(DenseLayer::decode_payload(payload)?),
        "conv" => Box::new(ConvLayer::decode_payload(payload)?),
        "maxpool" => Box::new(MaxPoolingLayer::decode_payload(payload)?),
        "border" => Box::new(BorderLayer::decode_payload(payload)?),
        "sigmoid" => Box::new(Sigmoid::decode_payload(payload)?),
        "tanh" => Box::new(Tanh::decode_payload(payload)?),
        "relu" => Box::new(Relu::decode_payload(payload)?),
        "softmax" => Box::new(Softmax::decode_payload(payload)?),
        "logsoftmax" => Box::new(LogSoftmax::decode_payload(payload)?),
        other => return Err(Error::UnknownLayerType(other.to_string())),
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::corrupt(format!(
                    "truncated: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_str(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::corrupt("layer tag is not valid UTF-8".to_string()))
    }
}

impl Network {
    /// Encode and write this network to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = encode(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read and decode a network from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Network> {
        let bytes = std::fs::read(path)?;
        decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SimpleRng;

    fn sample_network() -> Network {
        let mut rng = SimpleRng::new(17);
        Network::new(vec![
            Box::new(DenseLayer::new(4, 3, &mut rng).unwrap()) as Box<dyn Layer>,
            Box::new(Tanh::new(3)),
            Box::new(DenseLayer::new(3, 2, &mut rng).unwrap()),
            Box::new(Softmax::new(2)),
        ])
        .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_behavior() {
        let net = sample_network();
        let restored = decode(&encode(&net).unwrap()).unwrap();
        let input = [0.1, -0.2, 0.3, 0.4];
        assert_eq!(
            net.forward(&input).unwrap().output(),
            restored.forward(&input).unwrap().output()
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let net = sample_network();
        assert_eq!(encode(&net).unwrap(), encode(&net).unwrap());
        let restored = decode(&encode(&net).unwrap()).unwrap();
        assert_eq!(encode(&net).unwrap(), encode(&restored).unwrap());
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(b"mystery");
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(b"{}");
        assert!(matches!(decode(&bytes), Err(Error::UnknownLayerType(t)) if t == "mystery"));
    }

    #[test]
    fn test_truncated_data() {
        let bytes = encode(&sample_network()).unwrap();
        for cut in [0, 3, bytes.len() / 2, bytes.len() - 1] {
            assert!(decode(&bytes[..cut]).is_err(), "cut at {} decoded", cut);
        }
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let mut bytes = encode(&sample_network()).unwrap();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(Error::CorruptData(_))));
    }

    #[test]
    fn test_corrupt_payload() {
        let net = sample_network();
        let mut bytes = encode(&net).unwrap();
        // First payload starts after count, tag_len, tag ("dense") and
        // payload_len. Smash its opening brace.
        let offset = 4 + 4 + 5 + 8;
        bytes[offset] = b'!';
        assert!(matches!(decode(&bytes), Err(Error::CorruptData(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.bin");
        let net = sample_network();
        net.save(&path).unwrap();
        let restored = Network::load(&path).unwrap();
        assert_eq!(encode(&net).unwrap(), encode(&restored).unwrap());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Network::load(dir.path().join("absent.bin"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
