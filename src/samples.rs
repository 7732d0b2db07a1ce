//! Training samples: input/target vector pairs and cheaply shareable
//! collections of them.
//!
//! Vectors are held behind `Arc<[f64]>` so shuffling, splitting, and
//! handing subsets to worker threads clone handles rather than data.

use std::sync::Arc;

use crate::error::Error;
use crate::utils::SimpleRng;
use crate::Result;

/// One training example: an input vector and its desired output.
#[derive(Debug, Clone)]
pub struct Sample {
    pub input: Arc<[f64]>,
    pub target: Arc<[f64]>,
}

impl Sample {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Self {
            input: input.into(),
            target: target.into(),
        }
    }
}

/// An ordered collection of samples.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair up parallel input and target vectors.
    ///
    /// Fails with `ShapeMismatch` if the two lists differ in length.
    pub fn from_vectors(inputs: Vec<Vec<f64>>, targets: Vec<Vec<f64>>) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::shape(format!(
                "{} inputs but {} targets",
                inputs.len(),
                targets.len()
            )));
        }
        let samples = inputs
            .into_iter()
            .zip(targets)
            .map(|(i, t)| Sample::new(i, t))
            .collect();
        Ok(Self { samples })
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Shuffle the sample order in place with a Fisher-Yates pass.
    pub fn shuffle(&mut self, rng: &mut SimpleRng) {
        rng.shuffle(&mut self.samples);
    }

    /// Copy out the half-open range `[start, end)` as a new set.
    ///
    /// The range is clamped to the set's bounds; only `Arc` handles are
    /// cloned, never the vector contents.
    pub fn subset(&self, start: usize, end: usize) -> SampleSet {
        let start = start.min(self.samples.len());
        let end = end.min(self.samples.len()).max(start);
        SampleSet {
            samples: self.samples[start..end].to_vec(),
        }
    }

    /// Split into two sets at `at`, the first holding `[0, at)`.
    ///
    /// `at` is clamped to the set length; only `Arc` handles are cloned.
    pub fn split_at(&self, at: usize) -> (SampleSet, SampleSet) {
        let at = at.min(self.samples.len());
        (self.subset(0, at), self.subset(at, self.samples.len()))
    }

    /// Split into consecutive chunks of at most `chunk_size` samples.
    pub fn split(&self, chunk_size: usize) -> Vec<SampleSet> {
        if chunk_size == 0 || self.samples.is_empty() {
            return Vec::new();
        }
        self.samples
            .chunks(chunk_size)
            .map(|c| SampleSet {
                samples: c.to_vec(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> SampleSet {
        let inputs: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let targets = inputs.clone();
        SampleSet::from_vectors(inputs, targets).unwrap()
    }

    #[test]
    fn test_from_vectors_mismatch() {
        let result = SampleSet::from_vectors(vec![vec![1.0]], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subset_clamps() {
        let set = numbered(5);
        assert_eq!(set.subset(3, 10).len(), 2);
        assert_eq!(set.subset(7, 9).len(), 0);
        assert_eq!(set.subset(1, 3).get(0).unwrap().input[0], 1.0);
    }

    #[test]
    fn test_split_chunks() {
        let set = numbered(7);
        let chunks = set.split(3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[2].len(), 1);
        assert_eq!(chunks[2].get(0).unwrap().input[0], 6.0);
    }

    #[test]
    fn test_split_at() {
        let set = numbered(5);
        let (train, held_out) = set.split_at(3);
        assert_eq!(train.len(), 3);
        assert_eq!(held_out.len(), 2);
        assert_eq!(held_out.get(0).unwrap().input[0], 3.0);
        let (all, none) = set.split_at(99);
        assert_eq!(all.len(), 5);
        assert!(none.is_empty());
    }

    #[test]
    fn test_split_zero_chunk() {
        assert!(numbered(4).split(0).is_empty());
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut set = numbered(20);
        let mut rng = SimpleRng::new(42);
        set.shuffle(&mut rng);
        let mut seen: Vec<f64> = set.iter().map(|s| s.input[0]).collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_subset_shares_storage() {
        let set = numbered(3);
        let sub = set.subset(0, 1);
        assert!(Arc::ptr_eq(
            &set.get(0).unwrap().input,
            &sub.get(0).unwrap().input
        ));
    }
}
