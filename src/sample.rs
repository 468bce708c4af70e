//! Contains the [`Sample`] trait and the samples simulated by this crate.
//!
//! [`KsSample`] simulates the Kolmogorov-Smirnov statistic of values drawn from the reference
//! distribution itself. [`FitTrial`] draws a whole sample matrix from a [`PointCloud`] and runs
//! the Gaussianity test on it.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::ContinuousCDF;

use crate::fitting::ks_statistic;
use crate::pipeline::GaussianFit;

pub mod cloud;

pub use cloud::{GaussianCloud, PointCloud, UniformCube};

/// A dataset that is regenerated at every iteration of a [`MonteCarlo`](crate::MonteCarlo)
/// simulation and reduced to a single statistic.
pub trait Sample {
    /// Replaces the dataset with a fresh random one.
    fn generate(&mut self, rng: &mut impl rand::Rng);

    /// Calculates the statistic of interest from the current dataset.
    fn evaluate(&self) -> f64;
}

/// `num_samples` values from `distr`, evaluated by their Kolmogorov-Smirnov statistic against
/// `distr`.
#[allow(clippy::module_name_repetitions)]
pub struct KsSample<D> {
    distr: D,
    samples: Box<[f64]>,
}

impl<D> Sample for KsSample<D>
where
    D: rand::distributions::Distribution<f64>,
    D: ContinuousCDF<f64, f64>,
{
    fn generate(&mut self, rng: &mut impl rand::Rng) {
        self.samples.fill_with(|| self.distr.sample(rng));
        self.samples.sort_by(f64::total_cmp);
    }

    fn evaluate(&self) -> f64 {
        ks_statistic(&self.samples, &self.distr)
    }
}

impl<D> KsSample<D> {
    /// Returns `None` if `num_samples` is zero.
    pub fn new(distr: D, num_samples: usize) -> Option<Self> {
        if num_samples == 0 {
            return None;
        }
        let samples = vec![0.0; num_samples].into_boxed_slice();
        Some(Self { distr, samples })
    }
}

/// A sample matrix drawn from a [`PointCloud`], evaluated by the p-value of a [`GaussianFit`].
///
/// A draw whose covariance matrix is singular evaluates to `NaN`, which
/// [`MonteCarlo::simulate_pvalue`](crate::MonteCarlo::simulate_pvalue) counts as a
/// non-rejection.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use quatnorm::sample::{FitTrial, UniformCube};
/// use quatnorm::{DistanceScale, GaussianFit, MonteCarlo};
///
/// let cube = UniformCube::standard(4);
/// let fit = GaussianFit {
///     scale: DistanceScale::Squared,
///     ..GaussianFit::default()
/// };
/// let trial = FitTrial::new(cube, fit, 200).unwrap();
/// let mut simulation = MonteCarlo::with_seed(trial, 1);
/// simulation.iterations = 10;
///
/// let rejection_rate = simulation.simulate_pvalue(0.05);
/// assert!((0.0..=1.0).contains(&rejection_rate));
/// ```
pub struct FitTrial<G> {
    cloud: G,
    fit: GaussianFit,
    samples: DMatrix<f64>,
}

impl<G: PointCloud> FitTrial<G> {
    /// Returns `None` if `num_samples` is zero.
    pub fn new(cloud: G, fit: GaussianFit, num_samples: usize) -> Option<Self> {
        if num_samples == 0 {
            return None;
        }
        let samples = DMatrix::zeros(num_samples, cloud.dimension());
        Some(Self {
            cloud,
            fit,
            samples,
        })
    }
}

impl<G: PointCloud> Sample for FitTrial<G> {
    fn generate(&mut self, rng: &mut impl rand::Rng) {
        for i in 0..self.samples.nrows() {
            let point: DVector<f64> = self.cloud.sample(rng);
            self.samples.set_row(i, &point.transpose());
        }
    }

    fn evaluate(&self) -> f64 {
        self.fit
            .analyze(&self.samples)
            .map_or(f64::NAN, |report| report.fit.p_value)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use statrs::distribution::ChiSquared;

    use super::*;
    use crate::MonteCarlo;

    #[test]
    fn empty_samples_are_refused() {
        let reference = ChiSquared::new(4.0).unwrap();
        assert!(KsSample::new(reference, 0).is_none());
        assert!(FitTrial::new(GaussianCloud::standard(4), GaussianFit::default(), 0).is_none());
    }

    #[test]
    fn ks_sample_is_sorted_and_bounded() {
        let reference = ChiSquared::new(4.0).unwrap();
        let mut sample = KsSample::new(reference, 50).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        sample.generate(&mut rng);
        assert!(sample.samples.windows(2).all(|w| w[0] <= w[1]));
        let statistic = sample.evaluate();
        assert!(statistic > 0.0 && statistic < 1.0);
    }

    #[test]
    fn ks_null_distribution_has_known_critical_value() {
        let reference = ChiSquared::new(4.0).unwrap();
        let sample = KsSample::new(reference, 100).unwrap();
        let mut simulation = MonteCarlo::with_seed(sample, 9);
        simulation.iterations = 4_000;
        // The exact 5% critical value for 100 values is about 0.134.
        let tail = simulation.simulate_upper_tail(0.134);
        assert!((tail - 0.05).abs() < 0.015, "{tail}");
    }

    #[test]
    fn trial_fills_every_row() {
        let mut trial = FitTrial::new(GaussianCloud::standard(4), GaussianFit::default(), 30)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        trial.generate(&mut rng);
        assert_eq!(trial.samples.shape(), (30, 4));
        assert!(trial.samples.iter().all(|v| *v != 0.0));
        let p_value = trial.evaluate();
        assert!((0.0..=1.0).contains(&p_value));
    }

    #[test]
    fn degenerate_trial_evaluates_to_nan() {
        let trial = FitTrial::new(GaussianCloud::standard(4), GaussianFit::default(), 30)
            .unwrap();
        // Never generated: every row is zero.
        assert!(trial.evaluate().is_nan());
    }
}
