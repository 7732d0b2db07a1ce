//! Dense 3-dimensional tensor used by the spatially-structured layers.
//!
//! A `Tensor3` is the unit of data moving between convolution, pooling, and
//! border layers. Storage is a flat `Vec<f64>` with the fixed layout
//! `index(x, y, z) = (x + y * width) * depth + z`, so one (x, y) position
//! holds all of its depth channels contiguously.

use crate::error::Error;
use crate::Result;

/// A 3D tensor with values along x (width), y (height), and z (depth) axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    width: usize,
    height: usize,
    depth: usize,
    data: Vec<f64>,
}

impl Tensor3 {
    /// Create an all-zero tensor of the given dimensions.
    ///
    /// Fails with `ShapeMismatch` if any dimension is zero.
    pub fn new(width: usize, height: usize, depth: usize) -> Result<Self> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(Error::shape(format!(
                "tensor dimensions must be at least 1, got {}x{}x{}",
                width, height, depth
            )));
        }
        Ok(Self {
            width,
            height,
            depth,
            data: vec![0.0; width * height * depth],
        })
    }

    /// Wrap an existing flat vector in a tensor of the given dimensions.
    ///
    /// Fails with `ShapeMismatch` if `data.len() != width * height * depth`
    /// or any dimension is zero. No copy is made.
    pub fn from_vec(width: usize, height: usize, depth: usize, data: Vec<f64>) -> Result<Self> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(Error::shape(format!(
                "tensor dimensions must be at least 1, got {}x{}x{}",
                width, height, depth
            )));
        }
        if data.len() != width * height * depth {
            return Err(Error::shape(format!(
                "expected {} values for a {}x{}x{} tensor, got {}",
                width * height * depth,
                width,
                height,
                depth,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            depth,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the element at the given indices.
    ///
    /// Fails with `OutOfBounds` if any index falls outside the declared
    /// dimensions.
    pub fn get(&self, x: usize, y: usize, z: usize) -> Result<f64> {
        self.check_bounds(x, y, z)?;
        Ok(self.data[(x + y * self.width) * self.depth + z])
    }

    /// Write the element at the given indices.
    ///
    /// Fails with `OutOfBounds` if any index falls outside the declared
    /// dimensions.
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f64) -> Result<()> {
        self.check_bounds(x, y, z)?;
        self.data[(x + y * self.width) * self.depth + z] = value;
        Ok(())
    }

    /// Set all entries to zero.
    pub fn reset(&mut self) {
        for v in &mut self.data {
            *v = 0.0;
        }
    }

    /// Borrow the flat backing storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Flatten into the backing vector, consuming the tensor.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    fn check_bounds(&self, x: usize, y: usize, z: usize) -> Result<()> {
        if x >= self.width || y >= self.height || z >= self.depth {
            return Err(Error::OutOfBounds {
                x,
                y,
                z,
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_creation() {
        let t = Tensor3::new(3, 4, 2).unwrap();
        assert_eq!(t.width(), 3);
        assert_eq!(t.height(), 4);
        assert_eq!(t.depth(), 2);
        assert_eq!(t.len(), 24);
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_tensor_zero_dimension() {
        assert!(Tensor3::new(0, 4, 2).is_err());
        assert!(Tensor3::new(3, 0, 2).is_err());
        assert!(Tensor3::new(3, 4, 0).is_err());
    }

    #[test]
    fn test_tensor_layout() {
        // Layout is (x + y*width)*depth + z.
        let mut t = Tensor3::new(3, 2, 2).unwrap();
        t.set(1, 1, 1, 7.0).unwrap();
        assert_eq!(t.as_slice()[(1 + 1 * 3) * 2 + 1], 7.0);
        assert_eq!(t.get(1, 1, 1).unwrap(), 7.0);
    }

    #[test]
    fn test_tensor_get_set_roundtrip() {
        let mut t = Tensor3::new(4, 3, 2).unwrap();
        let mut counter = 0.0;
        for y in 0..3 {
            for x in 0..4 {
                for z in 0..2 {
                    t.set(x, y, z, counter).unwrap();
                    counter += 1.0;
                }
            }
        }
        counter = 0.0;
        for y in 0..3 {
            for x in 0..4 {
                for z in 0..2 {
                    assert_eq!(t.get(x, y, z).unwrap(), counter);
                    counter += 1.0;
                }
            }
        }
    }

    #[test]
    fn test_tensor_out_of_bounds() {
        let mut t = Tensor3::new(2, 2, 2).unwrap();
        assert!(matches!(t.get(2, 0, 0), Err(Error::OutOfBounds { .. })));
        assert!(matches!(t.get(0, 2, 0), Err(Error::OutOfBounds { .. })));
        assert!(matches!(t.get(0, 0, 2), Err(Error::OutOfBounds { .. })));
        assert!(matches!(
            t.set(5, 5, 5, 1.0),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_tensor_from_vec() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let t = Tensor3::from_vec(3, 2, 1, data.clone()).unwrap();
        assert_eq!(t.get(0, 0, 0).unwrap(), 1.0);
        assert_eq!(t.get(2, 1, 0).unwrap(), 6.0);
        assert_eq!(t.into_vec(), data);
    }

    #[test]
    fn test_tensor_from_vec_length_mismatch() {
        assert!(Tensor3::from_vec(3, 2, 1, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_tensor_reset() {
        let mut t = Tensor3::from_vec(2, 1, 1, vec![3.0, -2.0]).unwrap();
        t.reset();
        assert_eq!(t.as_slice(), &[0.0, 0.0]);
    }
}
