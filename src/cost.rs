//! Cost functions: scalar loss values and their gradients with respect to
//! network output.
//!
//! Each implementation provides the pair of operations the training loop
//! needs: `cost` for reporting and `deriv` to seed backward propagation.

/// A differentiable scalar loss over an (output, target) pair.
pub trait CostFunc: Send + Sync {
    /// The scalar loss for `output` against `target`.
    fn cost(&self, output: &[f64], target: &[f64]) -> f64;

    /// Write the gradient of the loss with respect to `output` into `grad`.
    ///
    /// All three slices must have the same length.
    fn deriv(&self, output: &[f64], target: &[f64], grad: &mut [f64]);
}

/// Half the summed squared error: `0.5 * sum((o - t)^2)`.
///
/// The factor of one half makes the gradient exactly `o - t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredCost;

impl CostFunc for MeanSquaredCost {
    fn cost(&self, output: &[f64], target: &[f64]) -> f64 {
        output
            .iter()
            .zip(target)
            .map(|(o, t)| {
                let d = o - t;
                d * d
            })
            .sum::<f64>()
            * 0.5
    }

    fn deriv(&self, output: &[f64], target: &[f64], grad: &mut [f64]) {
        for ((g, o), t) in grad.iter_mut().zip(output).zip(target) {
            *g = o - t;
        }
    }
}

/// Binary cross-entropy summed over components:
/// `-sum(t*ln(o) + (1-t)*ln(1-o))`.
///
/// Outputs are clamped away from 0 and 1 so saturated predictions give
/// large finite costs and gradients instead of infinities.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyCost;

const CLAMP_EPS: f64 = 1e-12;

fn clamp_prob(o: f64) -> f64 {
    o.max(CLAMP_EPS).min(1.0 - CLAMP_EPS)
}

impl CostFunc for CrossEntropyCost {
    fn cost(&self, output: &[f64], target: &[f64]) -> f64 {
        output
            .iter()
            .zip(target)
            .map(|(&o, &t)| {
                let o = clamp_prob(o);
                -(t * o.ln() + (1.0 - t) * (1.0 - o).ln())
            })
            .sum()
    }

    fn deriv(&self, output: &[f64], target: &[f64], grad: &mut [f64]) {
        for ((g, &o), &t) in grad.iter_mut().zip(output).zip(target) {
            let o = clamp_prob(o);
            *g = (1.0 - t) / (1.0 - o) - t / o;
        }
    }
}

/// Negated dot product: `-sum(o * t)`.
///
/// Pairs with a log-softmax output layer, where targets are one-hot and the
/// cost becomes the negative log-likelihood of the correct class.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotCost;

impl CostFunc for DotCost {
    fn cost(&self, output: &[f64], target: &[f64]) -> f64 {
        -output.iter().zip(target).map(|(o, t)| o * t).sum::<f64>()
    }

    fn deriv(&self, _output: &[f64], target: &[f64], grad: &mut [f64]) {
        for (g, &t) in grad.iter_mut().zip(target) {
            *g = -t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_squared_known_values() {
        let c = MeanSquaredCost;
        let output = [1.0, 2.0];
        let target = [0.0, 4.0];
        assert_abs_diff_eq!(c.cost(&output, &target), 2.5, epsilon = 1e-12);
        let mut grad = [0.0; 2];
        c.deriv(&output, &target, &mut grad);
        assert_abs_diff_eq!(grad[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_squared_zero_at_target() {
        let c = MeanSquaredCost;
        assert_eq!(c.cost(&[0.3, 0.7], &[0.3, 0.7]), 0.0);
    }

    #[test]
    fn test_cross_entropy_known_values() {
        let c = CrossEntropyCost;
        let output = [0.9, 0.1];
        let target = [1.0, 0.0];
        let expected = -(0.9f64.ln()) - (0.9f64.ln());
        assert_abs_diff_eq!(c.cost(&output, &target), expected, epsilon = 1e-12);
        let mut grad = [0.0; 2];
        c.deriv(&output, &target, &mut grad);
        assert_abs_diff_eq!(grad[0], -1.0 / 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], 1.0 / 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_entropy_saturated_is_finite() {
        let c = CrossEntropyCost;
        let cost = c.cost(&[0.0, 1.0], &[1.0, 0.0]);
        assert!(cost.is_finite());
        assert!(cost > 20.0);
        let mut grad = [0.0; 2];
        c.deriv(&[0.0, 1.0], &[1.0, 0.0], &mut grad);
        assert!(grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn test_dot_cost() {
        let c = DotCost;
        let output = [-2.3, -0.1, -4.0];
        let target = [0.0, 1.0, 0.0];
        assert_abs_diff_eq!(c.cost(&output, &target), 0.1, epsilon = 1e-12);
        let mut grad = [0.0; 3];
        c.deriv(&output, &target, &mut grad);
        assert_eq!(grad, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_deriv_matches_finite_difference() {
        let output = [0.4, 0.6, 0.2];
        let target = [0.0, 1.0, 0.5];
        let eps = 1e-6;
        for c in [&MeanSquaredCost as &dyn CostFunc, &CrossEntropyCost] {
            let mut grad = [0.0; 3];
            c.deriv(&output, &target, &mut grad);
            for i in 0..3 {
                let mut plus = output;
                plus[i] += eps;
                let mut minus = output;
                minus[i] -= eps;
                let numeric = (c.cost(&plus, &target) - c.cost(&minus, &target)) / (2.0 * eps);
                assert_abs_diff_eq!(grad[i], numeric, epsilon = 1e-5);
            }
        }
    }
}
