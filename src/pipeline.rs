//! Contains [`GaussianFit`], the full Gaussianity test of a sample matrix.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::Error;
use crate::fitting::{goodness_of_fit_with, summarize, Computation, PValueMethod, Summary};
use crate::mahalanobis::{Inversion, Metric};
use crate::moments::{compute_mean_and_covariance, matrix_rows};

/// Which values are compared with the chi-squared distribution.
///
/// Under multivariate normality the *squared* Mahalanobis distances follow the chi-squared
/// distribution with `D` degrees of freedom. [`DistanceScale::Raw`] compares the distances
/// themselves, which is how the quaternion analysis has always been run; expect it to reject
/// Gaussian data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceScale {
    /// Test the distances.
    #[default]
    Raw,
    /// Test the squared distances.
    Squared,
}

impl DistanceScale {
    /// Returns `distances` on this scale.
    #[must_use]
    pub fn apply(self, distances: &[f64]) -> Vec<f64> {
        match self {
            Self::Raw => distances.to_vec(),
            Self::Squared => distances.iter().map(|x| x * x).collect(),
        }
    }
}

/// Configuration of the Gaussianity test.
///
/// The default tests the raw distances against chi-squared with as many degrees of freedom as
/// the data has components, inverting the covariance explicitly and using the asymptotic
/// p-value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaussianFit {
    /// Degrees of freedom of the reference distribution, the dimension of the data if `None`.
    pub degrees_of_freedom: Option<usize>,
    /// Whether the distances or their squares are tested.
    pub scale: DistanceScale,
    /// How the covariance matrix is inverted.
    pub inversion: Inversion,
    /// How the p-value is obtained.
    pub method: PValueMethod,
}

/// Everything derived by [`GaussianFit::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    /// Number of samples.
    pub samples: usize,
    /// Number of components of every sample.
    pub dimension: usize,
    /// Degrees of freedom of the reference distribution.
    pub degrees_of_freedom: usize,
    /// The tested scale.
    pub scale: DistanceScale,
    /// How the covariance matrix was inverted.
    pub inversion: Inversion,
    /// How the p-value was obtained.
    pub method: PValueMethod,
    /// The sample mean.
    pub mean: Vec<f64>,
    /// The unbiased sample covariance, row by row.
    pub covariance: Vec<Vec<f64>>,
    /// Mahalanobis distance of every sample, in input order.
    pub distances: Vec<f64>,
    /// Mean and population standard deviation of the distances.
    pub summary: Summary,
    /// The Kolmogorov-Smirnov comparison with the reference distribution.
    pub fit: Computation,
}

impl GaussianFit {
    /// Runs the test on `samples`, one sample per row.
    ///
    /// Every step must succeed for a report to be produced: a singular covariance matrix, an
    /// empty matrix or non-finite values fail the whole analysis.
    ///
    /// # Examples
    ///
    /// ```
    /// use quatnorm::moments::samples_from_rows;
    /// use quatnorm::{DistanceScale, GaussianFit};
    ///
    /// let samples = samples_from_rows(vec![
    ///     vec![0.3, -1.2, 0.8, 0.1],
    ///     vec![-0.7, 0.4, 1.1, -0.5],
    ///     vec![1.4, 0.2, -0.3, 0.9],
    ///     vec![-0.2, -0.8, -1.0, 1.3],
    ///     vec![0.5, 1.6, 0.2, -1.1],
    ///     vec![-1.3, -0.1, 0.6, 0.4],
    /// ])
    /// .unwrap();
    ///
    /// let fit = GaussianFit {
    ///     scale: DistanceScale::Squared,
    ///     ..GaussianFit::default()
    /// };
    /// let report = fit.analyze(&samples).unwrap();
    /// assert_eq!(report.distances.len(), 6);
    /// assert_eq!(report.degrees_of_freedom, 4);
    /// assert!((0.0..=1.0).contains(&report.fit.p_value));
    /// ```
    pub fn analyze(&self, samples: &DMatrix<f64>) -> Result<FitReport, Error> {
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFinite);
        }
        let (n, d) = samples.shape();

        let (mean, covariance) = compute_mean_and_covariance(samples)?;
        let distances = self.metric(&covariance)?.distances(samples, &mean)?;
        let summary = summarize(&distances)?;

        let degrees_of_freedom = self.degrees_of_freedom.unwrap_or(d);
        let fit = goodness_of_fit_with(
            &self.scale.apply(&distances),
            degrees_of_freedom,
            self.method,
        )?;

        tracing::debug!(
            samples = n,
            dimension = d,
            degrees_of_freedom,
            scale = ?self.scale,
            mean_distance = summary.mean,
            statistic = fit.statistic,
            p_value = fit.p_value,
            "gaussian fit computed"
        );

        Ok(FitReport {
            samples: n,
            dimension: d,
            degrees_of_freedom,
            scale: self.scale,
            inversion: self.inversion,
            method: self.method,
            mean: mean.iter().copied().collect(),
            covariance: matrix_rows(&covariance),
            distances,
            summary,
            fit,
        })
    }
}

impl GaussianFit {
    fn metric(&self, covariance: &DMatrix<f64>) -> Result<Metric, Error> {
        Metric::new(covariance, self.inversion)
    }

    /// Returns the Mahalanobis distance of every row of `samples` to their mean, without running
    /// the goodness-of-fit test.
    ///
    /// Fails like [`GaussianFit::analyze`] does on singular or non-finite input.
    pub fn distances(&self, samples: &DMatrix<f64>) -> Result<Vec<f64>, Error> {
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFinite);
        }
        let (mean, covariance) = compute_mean_and_covariance(samples)?;
        self.metric(&covariance)?.distances(samples, &mean)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::distributions::Distribution;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::Singularity;
    use crate::moments::samples_from_rows;
    use crate::sample::{GaussianCloud, PointCloud};

    fn gaussian_samples(n: usize, seed: u64) -> DMatrix<f64> {
        let cloud = GaussianCloud::standard(4);
        let mut rng = StdRng::seed_from_u64(seed);
        let rows = (0..n).map(|_| {
            let point = cloud.sample(&mut rng);
            point.iter().copied().collect::<Vec<_>>()
        });
        assert_eq!(cloud.dimension(), 4);
        samples_from_rows(rows).unwrap()
    }

    #[test]
    fn report_is_consistent() {
        let samples = gaussian_samples(200, 1);
        let report = GaussianFit::default().analyze(&samples).unwrap();
        assert_eq!(report.samples, 200);
        assert_eq!(report.dimension, 4);
        assert_eq!(report.degrees_of_freedom, 4);
        assert_eq!(report.distances.len(), 200);
        assert!(report.distances.iter().all(|d| *d > 0.0));
        assert_eq!(report.mean.len(), 4);
        assert_eq!(report.covariance.len(), 4);
        assert!((0.0..=1.0).contains(&report.fit.p_value));
    }

    #[test]
    fn squared_distances_average_to_the_dimension() {
        // With the sample covariance, the squared distances sum to exactly (n - 1) * d.
        let samples = gaussian_samples(100, 2);
        let report = GaussianFit::default().analyze(&samples).unwrap();
        let mean_square: f64 =
            report.distances.iter().map(|d| d * d).sum::<f64>() / report.samples as f64;
        assert_abs_diff_eq!(mean_square, 4.0 * 99.0 / 100.0, epsilon = 1e-9);
    }

    #[test]
    fn analysis_is_idempotent() {
        let samples = gaussian_samples(150, 3);
        for method in [
            PValueMethod::Asymptotic,
            PValueMethod::MonteCarlo {
                iterations: 500,
                seed: 4,
            },
        ] {
            let fit = GaussianFit {
                method,
                ..GaussianFit::default()
            };
            assert_eq!(fit.analyze(&samples).unwrap(), fit.analyze(&samples).unwrap());
        }
    }

    #[test]
    fn cholesky_and_explicit_reports_agree() {
        let samples = gaussian_samples(80, 5);
        let explicit = GaussianFit::default().analyze(&samples).unwrap();
        let cholesky = GaussianFit {
            inversion: Inversion::Cholesky,
            ..GaussianFit::default()
        }
        .analyze(&samples)
        .unwrap();
        for (a, b) in explicit.distances.iter().zip(&cholesky.distances) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(explicit.fit.p_value, cholesky.fit.p_value, epsilon = 1e-9);
    }

    #[test]
    fn explicit_degrees_of_freedom_are_used() {
        let samples = gaussian_samples(60, 6);
        let fit = GaussianFit {
            degrees_of_freedom: Some(2),
            ..GaussianFit::default()
        };
        assert_eq!(fit.analyze(&samples).unwrap().degrees_of_freedom, 2);
    }

    #[test]
    fn distances_match_the_report() {
        let samples = gaussian_samples(90, 9);
        let fit = GaussianFit {
            scale: DistanceScale::Squared,
            inversion: Inversion::Cholesky,
            ..GaussianFit::default()
        };
        let report = fit.analyze(&samples).unwrap();
        assert_eq!(fit.distances(&samples).unwrap(), report.distances);

        let squared = fit.scale.apply(&report.distances);
        for (d, s) in report.distances.iter().zip(&squared) {
            assert_eq!(d * d, *s);
        }
        assert_eq!(DistanceScale::Raw.apply(&report.distances), report.distances);
        assert!(matches!(
            fit.distances(&gaussian_samples(3, 10)),
            Err(Error::SingularInput(_))
        ));
    }

    #[test]
    fn degenerate_input_fails() {
        let samples = gaussian_samples(4, 7);
        assert!(matches!(
            GaussianFit::default().analyze(&samples),
            Err(Error::SingularInput(Singularity::TooFewSamples {
                given: 4,
                needed: 5
            }))
        ));

        let mut samples = gaussian_samples(20, 8);
        samples[(3, 2)] = f64::INFINITY;
        assert!(matches!(
            GaussianFit::default().analyze(&samples),
            Err(Error::NonFinite)
        ));

        assert!(matches!(
            GaussianFit::default().analyze(&DMatrix::zeros(0, 4)),
            Err(Error::EmptyInput)
        ));
    }
}
