//! RMSProp: gradient descent scaled by a running mean of squared gradients.

use super::Optimizer;
use crate::gradient::NetworkGrad;
use crate::network::Network;
use crate::Result;

const DEFAULT_RESILIENCY: f64 = 0.9;
const DEFAULT_EPSILON: f64 = 1e-8;

/// RMSProp optimizer.
///
/// Keeps an exponential moving average of squared gradients per parameter
/// and divides each update by its square root, so steeply varying
/// parameters take smaller steps. The averaging buffer is allocated lazily
/// on the first step.
pub struct RmsProp {
    learning_rate: f64,
    resiliency: f64,
    epsilon: f64,
    mean_square: Option<NetworkGrad>,
}

impl RmsProp {
    /// RMSProp with the customary decay factor of 0.9.
    pub fn new(learning_rate: f64) -> Self {
        Self::with_resiliency(learning_rate, DEFAULT_RESILIENCY)
    }

    pub fn with_resiliency(learning_rate: f64, resiliency: f64) -> Self {
        Self {
            learning_rate,
            resiliency,
            epsilon: DEFAULT_EPSILON,
            mean_square: None,
        }
    }
}

impl Optimizer for RmsProp {
    fn step(&mut self, network: &mut Network, grads: &NetworkGrad) -> Result<()> {
        grads.check_shape(network)?;
        let mean_square = self
            .mean_square
            .get_or_insert_with(|| NetworkGrad::zeros_for(network));
        mean_square.check_shape(network)?;

        let (rate, decay, eps) = (self.learning_rate, self.resiliency, self.epsilon);
        network.visit_parameters_mut(|i, params| {
            let avg = mean_square.layer_mut(i);
            for ((p, &g), a) in params.iter_mut().zip(grads.layer(i)).zip(avg) {
                *a = decay * *a + (1.0 - decay) * g * g;
                *p -= rate * g / (a.sqrt() + eps);
            }
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.mean_square = None;
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
        let mut rng = SimpleRng::new(21);
        Network::new(vec![
            Box::new(DenseLayer::new(2, 2, &mut rng).unwrap()) as Box<dyn crate::layers::Layer>
        ])
        .unwrap()
    }

    #[test]
    fn test_first_step_scaling() {
        // After one step the average is 0.1 * g^2, so the update is
        // rate * g / (|g| * sqrt(0.1) + eps).
        let mut net = one_layer_net();
        let before: Vec<f64> = net.layers()[0].parameters().to_vec();
        let mut grads = NetworkGrad::zeros_for(&net);
        for g in grads.layer_mut(0).iter_mut() {
            *g = 3.0;
        }
        let mut opt = RmsProp::new(0.05);
        opt.step(&mut net, &grads).unwrap();
        let expected = 0.05 * 3.0 / ((0.1f64 * 9.0).sqrt() + 1e-8);
        for (b, a) in before.iter().zip(net.layers()[0].parameters()) {
            assert_abs_diff_eq!(b - a, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_average_decays() {
        let mut net = one_layer_net();
        let mut grads = NetworkGrad::zeros_for(&net);
        for g in grads.layer_mut(0).iter_mut() {
            *g = 1.0;
        }
        let mut opt = RmsProp::new(0.01);
        opt.step(&mut net, &grads).unwrap();
        opt.step(&mut net, &grads).unwrap();
        let avg = opt.mean_square.as_ref().unwrap().layer(0)[0];
        assert_abs_diff_eq!(avg, 0.9 * 0.1 + 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_clears_average() {
        let mut net = one_layer_net();
        let grads = NetworkGrad::zeros_for(&net);
        let mut opt = RmsProp::new(0.01);
        opt.step(&mut net, &grads).unwrap();
        opt.reset();
        assert!(opt.mean_square.is_none());
    }
}
