//! Parameter optimizers and the mini-batch training loop.
//!
//! An [`Optimizer`] turns an accumulated [`NetworkGrad`] into an in-place
//! parameter update. The [`Trainer`] drives the full loop: shuffle the
//! sample set each epoch, compute per-batch gradients with a
//! [`Gradienter`](crate::gradient::Gradienter), step the optimizer, and
//! report progress to a caller-supplied callback that can stop training.

pub mod adam;
pub mod rmsprop;
pub mod sgd;

pub use adam::Adam;
pub use rmsprop::RmsProp;
pub use sgd::Sgd;

use crate::cost::CostFunc;
use crate::error::Error;
use crate::gradient::{total_cost, Gradienter, NetworkGrad};
use crate::network::Network;
use crate::samples::SampleSet;
use crate::utils::SimpleRng;
use crate::Result;

/// Applies gradient-based parameter updates to a network.
pub trait Optimizer {
    /// Update `network`'s parameters in place from `grads`.
    ///
    /// Fails with `ShapeMismatch` if `grads` is not shaped for `network`.
    fn step(&mut self, network: &mut Network, grads: &NetworkGrad) -> Result<()>;

    /// Clear any accumulated internal state (moment estimates, step counts).
    fn reset(&mut self);

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, rate: f64);
}

/// Snapshot passed to the training callback after every batch step.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Zero-based batch index within the epoch.
    pub batch: usize,
    /// Samples consumed so far in this epoch, including the current batch.
    pub samples_seen: usize,
    /// Mean cost per sample over the current batch, before the update.
    pub mean_cost: f64,
}

/// Mini-batch training loop tying a gradienter and an optimizer together.
pub struct Trainer<G: Gradienter, O: Optimizer> {
    gradienter: G,
    optimizer: O,
    epochs: usize,
    batch_size: usize,
}

impl<G: Gradienter, O: Optimizer> Trainer<G, O> {
    /// Fails with `InvalidState` if `epochs` or `batch_size` is zero.
    pub fn new(gradienter: G, optimizer: O, epochs: usize, batch_size: usize) -> Result<Self> {
        if epochs == 0 {
            return Err(Error::InvalidState("trainer needs at least one epoch".into()));
        }
        if batch_size == 0 {
            return Err(Error::InvalidState("trainer batch size must be nonzero".into()));
        }
        Ok(Self {
            gradienter,
            optimizer,
            epochs,
            batch_size,
        })
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn optimizer_mut(&mut self) -> &mut O {
        &mut self.optimizer
    }

    /// Train `network` on `samples`, reporting after each batch.
    ///
    /// The sample order is reshuffled at the start of every epoch. The
    /// callback returns `true` to continue; returning `false` stops
    /// training cleanly after the current step. The callback's cost is
    /// measured before the parameter update, so a diverging run (NaN or
    /// exploding cost) is visible to the caller as it happens.
    pub fn train<C, F>(
        &mut self,
        network: &mut Network,
        cost: &C,
        samples: &SampleSet,
        rng: &mut SimpleRng,
        mut callback: F,
    ) -> Result<()>
    where
        C: CostFunc,
        F: FnMut(&Progress) -> bool,
    {
        if samples.is_empty() {
            return Err(Error::InvalidState("cannot train on an empty sample set".into()));
        }
        let mut working = samples.clone();
        for epoch in 0..self.epochs {
            working.shuffle(rng);
            let mut samples_seen = 0;
            for (batch_index, batch) in working.split(self.batch_size).into_iter().enumerate() {
                samples_seen += batch.len();
                let batch_cost = total_cost(cost, network, &batch)?;
                let grads = self.gradienter.gradient(network, &batch)?;
                self.optimizer.step(network, &grads)?;
                let progress = Progress {
                    epoch,
                    batch: batch_index,
                    samples_seen,
                    mean_cost: batch_cost / batch.len() as f64,
                };
                if !callback(&progress) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::MeanSquaredCost;
    use crate::gradient::SingleGradienter;
    use crate::layers::{DenseLayer, Sigmoid};

    fn xor_setup() -> (Network, SampleSet, SimpleRng) {
        let mut rng = SimpleRng::new(3);
        let net = Network::new(vec![
            Box::new(DenseLayer::new(2, 4, &mut rng).unwrap()) as Box<dyn crate::layers::Layer>,
            Box::new(Sigmoid::new(4)),
            Box::new(DenseLayer::new(4, 1, &mut rng).unwrap()),
            Box::new(Sigmoid::new(1)),
        ])
        .unwrap();
        let samples = SampleSet::from_vectors(
            vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]],
        )
        .unwrap();
        (net, samples, rng)
    }

    #[test]
    fn test_trainer_rejects_zero_config() {
        let make = |epochs, batch| {
            Trainer::new(SingleGradienter::new(MeanSquaredCost), Sgd::new(0.1), epochs, batch)
        };
        assert!(make(0, 1).is_err());
        assert!(make(1, 0).is_err());
        assert!(make(1, 1).is_ok());
    }

    #[test]
    fn test_training_reduces_cost() {
        let (mut net, samples, mut rng) = xor_setup();
        let before = total_cost(&MeanSquaredCost, &net, &samples).unwrap();
        let mut trainer =
            Trainer::new(SingleGradienter::new(MeanSquaredCost), Sgd::new(0.8), 200, 4).unwrap();
        trainer
            .train(&mut net, &MeanSquaredCost, &samples, &mut rng, |_| true)
            .unwrap();
        let after = total_cost(&MeanSquaredCost, &net, &samples).unwrap();
        assert!(after < before, "cost went from {} to {}", before, after);
    }

    #[test]
    fn test_callback_stops_training() {
        let (mut net, samples, mut rng) = xor_setup();
        let mut trainer =
            Trainer::new(SingleGradienter::new(MeanSquaredCost), Sgd::new(0.1), 50, 1).unwrap();
        let mut calls = 0;
        trainer
            .train(&mut net, &MeanSquaredCost, &samples, &mut rng, |_| {
                calls += 1;
                calls < 3
            })
            .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_progress_counts() {
        let (mut net, samples, mut rng) = xor_setup();
        let mut trainer =
            Trainer::new(SingleGradienter::new(MeanSquaredCost), Sgd::new(0.1), 1, 3).unwrap();
        let mut reports = Vec::new();
        trainer
            .train(&mut net, &MeanSquaredCost, &samples, &mut rng, |p| {
                reports.push((p.batch, p.samples_seen));
                true
            })
            .unwrap();
        assert_eq!(reports, vec![(0, 3), (1, 4)]);
    }

    #[test]
    fn test_empty_sample_set_is_error() {
        let (mut net, _, mut rng) = xor_setup();
        let mut trainer =
            Trainer::new(SingleGradienter::new(MeanSquaredCost), Sgd::new(0.1), 1, 1).unwrap();
        assert!(trainer
            .train(&mut net, &MeanSquaredCost, &SampleSet::new(), &mut rng, |_| true)
            .is_err());
    }
}
