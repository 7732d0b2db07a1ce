//! Adam: adaptive moment estimation.

use super::Optimizer;
use crate::gradient::NetworkGrad;
use crate::network::Network;
use crate::Result;

const DEFAULT_BETA1: f64 = 0.9;
const DEFAULT_BETA2: f64 = 0.999;
const DEFAULT_EPSILON: f64 = 1e-8;

/// Adam optimizer with bias-corrected first and second moment estimates.
///
/// Moment buffers are allocated lazily on the first step, sized to the
/// network being optimized. Reusing one `Adam` across networks of different
/// shapes requires a [`reset`](Optimizer::reset) in between; the shape check
/// on each step catches the mismatch otherwise.
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step_count: u64,
    first_moment: Option<NetworkGrad>,
    second_moment: Option<NetworkGrad>,
}

impl Adam {
    /// Adam with the customary defaults: beta1 0.9, beta2 0.999, epsilon 1e-8.
    pub fn new(learning_rate: f64) -> Self {
        Self::with_betas(learning_rate, DEFAULT_BETA1, DEFAULT_BETA2)
    }

    pub fn with_betas(learning_rate: f64, beta1: f64, beta2: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon: DEFAULT_EPSILON,
            step_count: 0,
            first_moment: None,
            second_moment: None,
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, network: &mut Network, grads: &NetworkGrad) -> Result<()> {
        grads.check_shape(network)?;
        let first = self
            .first_moment
            .get_or_insert_with(|| NetworkGrad::zeros_for(network));
        first.check_shape(network)?;
        let second = self
            .second_moment
            .get_or_insert_with(|| NetworkGrad::zeros_for(network));

        self.step_count += 1;
        let t = self.step_count as f64;
        let correction1 = 1.0 - self.beta1.powf(t);
        let correction2 = 1.0 - self.beta2.powf(t);
        let (beta1, beta2) = (self.beta1, self.beta2);
        let (rate, eps) = (self.learning_rate, self.epsilon);

        network.visit_parameters_mut(|i, params| {
            let m = first.layer_mut(i);
            let v = second.layer_mut(i);
            for (((p, &g), m), v) in params.iter_mut().zip(grads.layer(i)).zip(m).zip(v) {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                *p -= rate * m_hat / (v_hat.sqrt() + eps);
            }
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.step_count = 0;
        self.first_moment = None;
        self.second_moment = None;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, rate: f64) {
        self.learning_rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::DenseLayer;
    use crate::utils::SimpleRng;
    use approx::assert_abs_diff_eq;

    fn one_layer_net() -> Network {
        let mut rng = SimpleRng::new(13);
        Network::new(vec![
            Box::new(DenseLayer::new(2, 2, &mut rng).unwrap()) as Box<dyn crate::layers::Layer>
        ])
        .unwrap()
    }

    #[test]
    fn test_first_step_magnitude() {
        // With constant gradient g the bias corrections cancel on step one
        // and the update is learning_rate * g / (|g| + eps).
        let mut net = one_layer_net();
        let before: Vec<f64> = net.layers()[0].parameters().to_vec();
        let mut grads = NetworkGrad::zeros_for(&net);
        for g in grads.layer_mut(0).iter_mut() {
            *g = 2.0;
        }
        let mut adam = Adam::new(0.01);
        adam.step(&mut net, &grads).unwrap();
        for (b, a) in before.iter().zip(net.layers()[0].parameters()) {
            assert_abs_diff_eq!(b - a, 0.01 * 2.0 / (2.0 + 1e-8), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_reset_clears_moments() {
        let mut net = one_layer_net();
        let mut grads = NetworkGrad::zeros_for(&net);
        for g in grads.layer_mut(0).iter_mut() {
            *g = 1.0;
        }
        let mut adam = Adam::new(0.01);
        adam.step(&mut net, &grads).unwrap();
        assert_eq!(adam.step_count, 1);
        adam.reset();
        assert_eq!(adam.step_count, 0);
        assert!(adam.first_moment.is_none());
    }

    #[test]
    fn test_stale_moments_rejected_after_network_change() {
        let mut rng = SimpleRng::new(13);
        let mut small = one_layer_net();
        let mut big = Network::new(vec![
            Box::new(DenseLayer::new(4, 4, &mut rng).unwrap()) as Box<dyn crate::layers::Layer>
        ])
        .unwrap();
        let mut adam = Adam::new(0.01);
        let small_grads = NetworkGrad::zeros_for(&small);
        adam.step(&mut small, &small_grads).unwrap();
        let big_grads = NetworkGrad::zeros_for(&big);
        assert!(adam.step(&mut big, &big_grads).is_err());
    }
}
