//! Feed-forward network core.
//!
//! A [`Network`] owns one weight matrix per layer transition and trains by
//! plain per-sample gradient descent with the logistic sigmoid activation.
//!
//! # Backward-pass order
//!
//! The backward pass updates weights in place while walking from the output
//! layer down: layer `i` is updated first, and the error is then propagated
//! to layer `i - 1` through the *already updated* `W_i`. This sequential
//! order is a behavioral contract of the engine; tests pin it down.
//!
//! # Activation cache
//!
//! Each `query`/`train` call overwrites the cached per-layer activations.
//! The output reference returned by `query` is valid until the next
//! `query`/`train` call on the same network.

use crate::{Error, Matrix, Model, Result};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use std::path::Path;

#[derive(Debug, Clone)]
pub struct Network {
    learning_rate: f64,
    weights: Vec<Matrix>,
    outputs: Vec<Matrix>,
    error: Option<Matrix>,
}

impl Network {
    /// Creates a network with random weights from a deterministic seed.
    ///
    /// `topology` lists layer widths from input to output and must have at
    /// least two entries. Weight matrix `i` has shape
    /// `(topology[i + 1], topology[i])` and is drawn from
    /// `Normal(0, topology[i + 1]^-0.5)`.
    pub fn new_with_seed(topology: &[usize], learning_rate: f64, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(topology, learning_rate, &mut rng)
    }

    /// Creates a network with random weights from the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(
        topology: &[usize],
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if topology.len() < 2 {
            return Err(Error::InvalidTopology(
                "topology must include input and output widths".to_owned(),
            ));
        }
        if topology.contains(&0) {
            return Err(Error::InvalidTopology(
                "all layer widths must be > 0".to_owned(),
            ));
        }
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::InvalidTopology(format!(
                "learning rate must be finite and > 0, got {learning_rate}"
            )));
        }

        let mut weights = Vec::with_capacity(topology.len() - 1);
        for w in topology.windows(2) {
            let in_dim = w[0];
            let fan_out = w[1];
            let dist = Normal::new(0.0, (fan_out as f64).powf(-0.5))
                .expect("standard deviation is positive and finite");
            weights.push(Matrix::from_fn(fan_out, in_dim, |_, _| dist.sample(&mut *rng)));
        }

        Ok(Self {
            learning_rate,
            weights,
            outputs: Vec::new(),
            error: None,
        })
    }

    /// Rebuilds a network from a persisted model record.
    pub fn from_model(model: Model) -> Result<Self> {
        model.validate()?;
        Ok(Self {
            learning_rate: model.learning_rate,
            weights: model.weights,
            outputs: Vec::new(),
            error: None,
        })
    }

    /// The serializable shadow of this network: learning rate plus weights,
    /// without per-run transient state.
    pub fn to_model(&self) -> Model {
        Model {
            learning_rate: self.learning_rate,
            weights: self.weights.clone(),
        }
    }

    /// Persists the network to `path`; the format is chosen by extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_model().save(path)
    }

    /// Loads a network from `path`; the format is chosen by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_model(Model::load(path)?)
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.weights
            .first()
            .expect("network has at least one layer")
            .cols()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.weights
            .last()
            .expect("network has at least one layer")
            .rows()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.weights.len()
    }

    /// Layer widths from input to output.
    pub fn topology(&self) -> Vec<usize> {
        let mut t = Vec::with_capacity(self.weights.len() + 1);
        t.push(self.input_dim());
        for w in &self.weights {
            t.push(w.rows());
        }
        t
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Forward pass: returns the final layer's activation column vector.
    ///
    /// `input` must be a column vector of length [`Network::input_dim`]. The
    /// returned reference is overwritten by the next `query`/`train` call.
    pub fn query(&mut self, input: &Matrix) -> Result<&Matrix> {
        let mut outputs = Vec::with_capacity(self.weights.len());

        let mut signal = self.weights[0].dot(input)?;
        signal.apply(sigmoid);
        outputs.push(signal);

        for w in &self.weights[1..] {
            let mut signal = w.dot(outputs.last().expect("previous layer output exists"))?;
            signal.apply(sigmoid);
            outputs.push(signal);
        }

        self.outputs = outputs;
        Ok(self.outputs.last().expect("network has at least one layer"))
    }

    /// One supervised step: forward pass, then backpropagation with in-place
    /// weight updates.
    ///
    /// `input` must match the input width, `target` the output width. The
    /// target shape is checked before any weight is touched, so a failed step
    /// leaves all weights unchanged.
    pub fn train(&mut self, input: &Matrix, target: &Matrix) -> Result<()> {
        self.query(input)?;

        let mut error =
            target.sub(self.outputs.last().expect("query populated the activation cache"))?;
        self.error = Some(error.clone());

        for i in (1..self.weights.len()).rev() {
            let delta = self.layer_delta(&error, &self.outputs[i], &self.outputs[i - 1])?;
            self.weights[i].add_in_place(&delta)?;
            // Propagation reads W_i after its update above.
            error = self.weights[i].transpose().dot(&error)?;
        }

        let delta = self.layer_delta(&error, &self.outputs[0], input)?;
        self.weights[0].add_in_place(&delta)?;
        Ok(())
    }

    /// `learning_rate * (error (*) out (*) (1 - out)) . upstream^T`, the
    /// sigmoid-derivative weight delta for one layer.
    fn layer_delta(&self, error: &Matrix, output: &Matrix, upstream: &Matrix) -> Result<Matrix> {
        let grad = error
            .hadamard(output)?
            .hadamard(&output.sub_from_scalar(1.0))?;
        Ok(grad.dot(&upstream.transpose())?.mul_scalar(self.learning_rate))
    }

    /// Root-mean-square of the most recent training residual, or `None` if
    /// the network has not been trained yet.
    pub fn rms_error(&self) -> Option<f64> {
        let error = self.error.as_ref()?;
        let sum_sq: f64 = error.as_slice().iter().map(|v| v * v).sum();
        Some((sum_sq / error.rows() as f64).sqrt())
    }

    /// Approximate generative inverse: reconstructs a plausible input for
    /// `target` by walking the transposed weights from output to input with
    /// the pole-substituted inverse sigmoid.
    ///
    /// No learning occurs. The result is a diagnostic artifact, not a valid
    /// input in any domain sense; the transpose of a non-square weight matrix
    /// is not a true inverse.
    pub fn reverse_query(&self, target: &Matrix) -> Result<Matrix> {
        let last = self.weights.last().expect("network has at least one layer");
        let mut signal = last.transpose().dot(target)?;
        signal.apply(logit);

        for w in self.weights[..self.weights.len() - 1].iter().rev() {
            signal = w.transpose().dot(&signal)?;
            signal.apply(logit);
        }
        Ok(signal)
    }
}

/// Logistic sigmoid, computed branch-wise so large `|x|` never overflows.
#[inline]
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

/// Inverse sigmoid with pole substitution: values at or past the poles at 0
/// and 1 are replaced by 0.01 and 0.99; everything strictly inside (0, 1)
/// passes through unchanged. Lossy by design; reconstruction is approximate.
#[inline]
fn logit(y: f64) -> f64 {
    let y = if y <= 0.0 {
        0.01
    } else if y >= 1.0 {
        0.99
    } else {
        y
    };
    (y / (1.0 - y)).abs().ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_topology_and_zero_widths() {
        assert!(matches!(
            Network::new_with_seed(&[5], 0.1, 0),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            Network::new_with_seed(&[], 0.1, 0),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            Network::new_with_seed(&[3, 0, 2], 0.1, 0),
            Err(Error::InvalidTopology(_))
        ));
        assert!(matches!(
            Network::new_with_seed(&[3, 2], 0.0, 0),
            Err(Error::InvalidTopology(_))
        ));
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let mut a = Network::new_with_seed(&[4, 3, 2], 0.1, 123).unwrap();
        let mut b = Network::new_with_seed(&[4, 3, 2], 0.1, 123).unwrap();

        let input = Matrix::column(&[0.3, -0.7, 0.2, 0.9]);
        let out_a = a.query(&input).unwrap().clone();
        let out_b = b.query(&input).unwrap().clone();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn query_on_zero_input_stays_in_sigmoid_range() {
        for topology in [&[3, 2][..], &[4, 5, 2][..], &[2, 7, 7, 3][..]] {
            let mut net = Network::new_with_seed(topology, 0.1, 7).unwrap();
            let input = Matrix::new(topology[0], 1);

            let out = net.query(&input).unwrap();
            assert_eq!(out.rows(), *topology.last().unwrap());
            assert_eq!(out.cols(), 1);
            for &v in out.as_slice() {
                assert!(v > 0.0 && v < 1.0, "activation {v} outside (0, 1)");
            }
        }
    }

    #[test]
    fn query_rejects_mismatched_input_length() {
        let mut net = Network::new_with_seed(&[4, 3, 2], 0.1, 0).unwrap();
        let input = Matrix::column(&[0.5; 3]);
        assert!(matches!(
            net.query(&input),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn failed_train_leaves_weights_unchanged() {
        let mut net = Network::new_with_seed(&[4, 3, 2], 0.1, 0).unwrap();
        let before = net.to_model();

        let input = Matrix::column(&[0.5; 4]);
        let bad_target = Matrix::column(&[0.5; 3]);
        assert!(matches!(
            net.train(&input, &bad_target),
            Err(Error::DimensionMismatch(_))
        ));
        assert_eq!(net.to_model(), before);
    }

    #[test]
    fn rms_error_is_none_until_first_train() {
        let mut net = Network::new_with_seed(&[2, 3, 1], 0.1, 0).unwrap();
        assert!(net.rms_error().is_none());

        let input = Matrix::column(&[0.2, 0.8]);
        net.query(&input).unwrap();
        assert!(net.rms_error().is_none());

        net.train(&input, &Matrix::column(&[0.99])).unwrap();
        let rms = net.rms_error().unwrap();
        assert!(rms.is_finite() && rms >= 0.0);
    }

    #[test]
    fn rms_error_matches_the_stored_residual() {
        // Single layer with fixed weights so the residual is predictable.
        let weights = vec![Matrix::from_flat(2, 2, vec![0.0, 0.0, 0.0, 0.0]).unwrap()];
        let mut net = Network::from_model(Model {
            learning_rate: 0.1,
            weights,
        })
        .unwrap();

        // Zero weights: output is sigmoid(0) = 0.5 on both rows.
        let input = Matrix::column(&[0.3, 0.6]);
        net.train(&input, &Matrix::column(&[0.9, 0.1])).unwrap();

        // Residual is (0.4, -0.4); RMS is 0.4.
        let rms = net.rms_error().unwrap();
        assert!((rms - 0.4).abs() < 1e-12, "rms={rms}");
    }

    #[test]
    fn backward_pass_propagates_through_the_just_updated_layer() {
        let w0 = Matrix::from_flat(2, 2, vec![0.5, -0.25, 0.3, 0.1]).unwrap();
        let w1 = Matrix::from_flat(1, 2, vec![0.2, -0.4]).unwrap();
        let lr = 0.5;

        let mut net = Network::from_model(Model {
            learning_rate: lr,
            weights: vec![w0.clone(), w1.clone()],
        })
        .unwrap();

        let x = [0.1, 0.9];
        let t = 0.8;

        // Replay the sequential update rule with scalar arithmetic.
        let h = [
            sigmoid(0.5 * x[0] + -0.25 * x[1]),
            sigmoid(0.3 * x[0] + 0.1 * x[1]),
        ];
        let y = sigmoid(0.2 * h[0] + -0.4 * h[1]);
        let e1 = t - y;
        let g1 = e1 * y * (1.0 - y);
        let w1_new = [0.2 + lr * g1 * h[0], -0.4 + lr * g1 * h[1]];

        // The error reaching layer 0 flows through the updated W1.
        let e0 = [w1_new[0] * e1, w1_new[1] * e1];
        let g0 = [e0[0] * h[0] * (1.0 - h[0]), e0[1] * h[1] * (1.0 - h[1])];
        let w0_new = [
            0.5 + lr * g0[0] * x[0],
            -0.25 + lr * g0[0] * x[1],
            0.3 + lr * g0[1] * x[0],
            0.1 + lr * g0[1] * x[1],
        ];

        net.train(&Matrix::column(&x), &Matrix::column(&[t])).unwrap();

        let model = net.to_model();
        for (got, expected) in model.weights[1].as_slice().iter().zip(&w1_new) {
            assert!((got - expected).abs() < 1e-12, "w1 got={got} expected={expected}");
        }
        for (got, expected) in model.weights[0].as_slice().iter().zip(&w0_new) {
            assert!((got - expected).abs() < 1e-12, "w0 got={got} expected={expected}");
        }
    }

    #[test]
    fn logit_substitutes_only_at_the_poles() {
        assert_eq!(logit(0.0), logit(0.01));
        assert_eq!(logit(-3.5), logit(0.01));
        assert_eq!(logit(1.0), logit(0.99));
        assert_eq!(logit(42.0), logit(0.99));

        // Values strictly inside (0, 1) pass through unchanged, even in the
        // near-pole bands below 0.01 and above 0.99.
        assert_eq!(logit(0.005), (0.005_f64 / 0.995).abs().ln());
        assert_eq!(logit(0.995), (0.995_f64 / 0.005).abs().ln());
        assert!(logit(0.005) < logit(0.01));
        assert!(logit(0.995) > logit(0.99));

        // Inside (0, 1) it inverts the sigmoid.
        for z in [-6.0, -3.0, -0.5, 0.0, 0.7, 2.5, 6.0] {
            assert!((logit(sigmoid(z)) - z).abs() < 1e-9);
        }
    }

    #[test]
    fn reverse_query_does_not_clamp_near_pole_targets() {
        let net = Network::from_model(Model {
            learning_rate: 0.1,
            weights: vec![Matrix::identity(1, 1)],
        })
        .unwrap();

        let out = net.reverse_query(&Matrix::column(&[0.005])).unwrap();
        let expected = (0.005_f64 / 0.995).ln();
        assert!((out.get(0, 0).unwrap() - expected).abs() < 1e-12);

        let out = net.reverse_query(&Matrix::column(&[0.995])).unwrap();
        let expected = (0.995_f64 / 0.005).ln();
        assert!((out.get(0, 0).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn reverse_query_inverts_a_single_identity_layer() {
        // With W = I the forward pass is y = sigmoid(x), the reverse walk is
        // logit(I^T y), and the two cancel for any y strictly inside (0, 1).
        let mut net = Network::from_model(Model {
            learning_rate: 0.1,
            weights: vec![Matrix::identity(4, 4)],
        })
        .unwrap();

        let input = Matrix::column(&[-2.0, -0.3, 0.5, 1.8]);
        let output = net.query(&input).unwrap().clone();
        let reconstructed = net.reverse_query(&output).unwrap();

        for (got, expected) in reconstructed.as_slice().iter().zip(input.as_slice()) {
            assert!((got - expected).abs() < 1e-9, "got={got} expected={expected}");
        }
    }

    #[test]
    fn reverse_query_matches_the_transposed_walk() {
        let w = Matrix::from_flat(3, 4, vec![
            0.3, -0.1, 0.5, 0.2, //
            -0.4, 0.2, 0.1, 0.6, //
            0.05, 0.3, -0.2, 0.1,
        ])
        .unwrap();
        let net = Network::from_model(Model {
            learning_rate: 0.1,
            weights: vec![w.clone()],
        })
        .unwrap();

        let target = Matrix::column(&[0.9, 0.1, 0.5]);
        let expected = w.transpose().dot(&target).unwrap().map(logit);
        assert_eq!(net.reverse_query(&target).unwrap(), expected);
    }

    #[test]
    fn reverse_query_output_is_shaped_like_the_input_layer() {
        let net = Network::new_with_seed(&[6, 4, 3], 0.1, 5).unwrap();
        let target = Matrix::column(&[0.9, 0.1, 0.1]);
        let reconstructed = net.reverse_query(&target).unwrap();
        assert_eq!(reconstructed.rows(), 6);
        assert_eq!(reconstructed.cols(), 1);
    }

    #[test]
    fn topology_round_trips_through_accessors() {
        let net = Network::new_with_seed(&[784, 100, 10], 0.1, 0).unwrap();
        assert_eq!(net.topology(), vec![784, 100, 10]);
        assert_eq!(net.input_dim(), 784);
        assert_eq!(net.output_dim(), 10);
        assert_eq!(net.num_layers(), 2);
    }
}
