//! Gradient computation over sample sets.
//!
//! A [`NetworkGrad`] mirrors a network's parameter layout as one flat buffer
//! per layer. [`Gradienter`] implementations fill such a buffer for a set of
//! samples: [`SingleGradienter`] propagates samples sequentially,
//! [`BatchGradienter`] fans sub-batches out across a thread pool, and
//! [`L2Regularizer`] wraps either to add a weight-decay term.

use rayon::prelude::*;

use crate::cost::CostFunc;
use crate::error::Error;
use crate::network::Network;
use crate::samples::SampleSet;
use crate::Result;

/// Per-layer parameter gradient buffers matching a network's layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkGrad {
    layers: Vec<Vec<f64>>,
}

impl NetworkGrad {
    /// A zeroed gradient shaped like `network`'s parameters.
    pub fn zeros_for(network: &Network) -> Self {
        Self {
            layers: network
                .layers()
                .iter()
                .map(|l| vec![0.0; l.parameter_count()])
                .collect(),
        }
    }

    /// Number of per-layer buffers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, index: usize) -> &[f64] {
        &self.layers[index]
    }

    pub fn layer_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.layers[index]
    }

    /// Zero every buffer, keeping the shape.
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Accumulate `other` into `self` elementwise.
    ///
    /// Fails with `ShapeMismatch` if the two gradients have different shapes.
    pub fn add(&mut self, other: &NetworkGrad) -> Result<()> {
        if self.layers.len() != other.layers.len() {
            return Err(Error::shape(format!(
                "gradient has {} layers, other has {}",
                self.layers.len(),
                other.layers.len()
            )));
        }
        for (i, (mine, theirs)) in self.layers.iter_mut().zip(&other.layers).enumerate() {
            if mine.len() != theirs.len() {
                return Err(Error::shape(format!(
                    "gradient layer {} has {} values, other has {}",
                    i,
                    mine.len(),
                    theirs.len()
                )));
            }
            for (m, t) in mine.iter_mut().zip(theirs) {
                *m += t;
            }
        }
        Ok(())
    }

    /// Multiply every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for layer in &mut self.layers {
            for v in layer.iter_mut() {
                *v *= factor;
            }
        }
    }

    /// Verify this gradient is shaped for `network`.
    pub(crate) fn check_shape(&self, network: &Network) -> Result<()> {
        if self.layers.len() != network.len() {
            return Err(Error::shape(format!(
                "gradient has {} layers, network has {}",
                self.layers.len(),
                network.len()
            )));
        }
        for (i, (buf, layer)) in self.layers.iter().zip(network.layers()).enumerate() {
            if buf.len() != layer.parameter_count() {
                return Err(Error::shape(format!(
                    "gradient layer {} has {} values, layer has {} parameters",
                    i,
                    buf.len(),
                    layer.parameter_count()
                )));
            }
        }
        Ok(())
    }
}

/// Computes the summed parameter gradient of a cost over a sample set.
pub trait Gradienter {
    fn gradient(&mut self, network: &Network, samples: &SampleSet) -> Result<NetworkGrad>;
}

/// Propagate one sample and accumulate its gradient into `grads`.
fn accumulate_sample(
    network: &Network,
    cost: &dyn CostFunc,
    sample: &crate::samples::Sample,
    grads: &mut NetworkGrad,
) -> Result<()> {
    let trace = network.forward(&sample.input)?;
    if sample.target.len() != network.output_size() {
        return Err(Error::shape(format!(
            "sample target has {} values, network outputs {}",
            sample.target.len(),
            network.output_size()
        )));
    }
    let mut grad_output = vec![0.0; network.output_size()];
    cost.deriv(trace.output(), &sample.target, &mut grad_output);
    network.backward(&trace, &grad_output, grads)?;
    Ok(())
}

/// Sum of the cost over every sample in `samples`.
pub fn total_cost<C: CostFunc>(cost: &C, network: &Network, samples: &SampleSet) -> Result<f64> {
    let mut total = 0.0;
    for sample in samples {
        let trace = network.forward(&sample.input)?;
        total += cost.cost(trace.output(), &sample.target);
    }
    Ok(total)
}

/// Sequential gradienter: one sample at a time, gradients summed.
pub struct SingleGradienter<C: CostFunc> {
    cost: C,
}

impl<C: CostFunc> SingleGradienter<C> {
    pub fn new(cost: C) -> Self {
        Self { cost }
    }

    pub fn cost_func(&self) -> &C {
        &self.cost
    }
}

impl<C: CostFunc> Gradienter for SingleGradienter<C> {
    fn gradient(&mut self, network: &Network, samples: &SampleSet) -> Result<NetworkGrad> {
        let mut grads = NetworkGrad::zeros_for(network);
        for sample in samples {
            accumulate_sample(network, &self.cost, sample, &mut grads)?;
        }
        Ok(grads)
    }
}

/// Largest sub-batch a worker takes at once.
const DEFAULT_MAX_SUB_BATCH: usize = 15;

/// Parallel gradienter: splits the sample set into sub-batches, computes
/// each on the thread pool, and sums the partial gradients in batch order.
///
/// The merge order is fixed, so results are reproducible run to run; with
/// one sample per sub-batch the result is also identical to
/// [`SingleGradienter`] up to floating-point summation order.
pub struct BatchGradienter<C: CostFunc> {
    cost: C,
    max_sub_batch: usize,
}

impl<C: CostFunc> BatchGradienter<C> {
    pub fn new(cost: C) -> Self {
        Self {
            cost,
            max_sub_batch: DEFAULT_MAX_SUB_BATCH,
        }
    }

    /// Cap sub-batches at `size` samples. Zero falls back to the default.
    pub fn with_max_sub_batch(mut self, size: usize) -> Self {
        self.max_sub_batch = if size == 0 { DEFAULT_MAX_SUB_BATCH } else { size };
        self
    }
}

impl<C: CostFunc> Gradienter for BatchGradienter<C> {
    fn gradient(&mut self, network: &Network, samples: &SampleSet) -> Result<NetworkGrad> {
        let batches = samples.split(self.max_sub_batch);
        let cost = &self.cost;
        let partials: Vec<Result<NetworkGrad>> = batches
            .par_iter()
            .map(|batch| {
                let mut grads = NetworkGrad::zeros_for(network);
                for sample in batch {
                    accumulate_sample(network, cost, sample, &mut grads)?;
                }
                Ok(grads)
            })
            .collect();

        let mut total = NetworkGrad::zeros_for(network);
        for partial in partials {
            total.add(&partial?)?;
        }
        Ok(total)
    }
}

/// Adds an L2 weight-decay term to a wrapped gradienter.
///
/// Every parameter gradient gains `penalty * parameter`, the derivative of
/// `penalty / 2 * sum(p^2)`.
pub struct L2Regularizer<G: Gradienter> {
    inner: G,
    penalty: f64,
}

impl<G: Gradienter> L2Regularizer<G> {
    pub fn new(inner: G, penalty: f64) -> Self {
        Self { inner, penalty }
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }
}

impl<G: Gradienter> Gradienter for L2Regularizer<G> {
    fn gradient(&mut self, network: &Network, samples: &SampleSet) -> Result<NetworkGrad> {
        let mut grads = self.inner.gradient(network, samples)?;
        for (i, layer) in network.layers().iter().enumerate() {
            let buf = grads.layer_mut(i);
            for (g, p) in buf.iter_mut().zip(layer.parameters()) {
                *g += self.penalty * p;
            }
        }
        Ok(grads)
    }
}
