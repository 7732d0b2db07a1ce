//! Plain stochastic gradient descent.

use super::Optimizer;
use crate::gradient::NetworkGrad;
use crate::network::Network;
use crate::Result;

/// Subtracts `learning_rate * gradient` from every parameter.
///
/// Stateless apart from the learning rate, so `reset` is a no-op.
pub struct Sgd {
    learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, network: &mut Network, grads: &NetworkGrad) -> Result<()> {
        grads.check_shape(network)?;
        let rate = self.learning_rate;
        network.visit_parameters_mut(|i, params| {
            for (p, g) in params.iter_mut().zip(grads.layer(i)) {
                *p -= rate * g;
            }
        });
        Ok(())
    }

    fn reset(&mut self) {}

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, rate: f64) {
        self.learning_rate = rate;
    }
}
