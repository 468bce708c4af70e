//! Mahalanobis distances of samples to their mean.
//!
//! The distance of a point `x` to a distribution with mean `μ` and covariance `Σ` is
//! `sqrt((x - μ)ᵀ Σ⁻¹ (x - μ))`. [`Inversion`] selects whether `Σ⁻¹` is formed explicitly or
//! the quadratic form is evaluated through a Cholesky factor of `Σ`.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{Error, Singularity};

/// Covariance matrices with a larger condition number are treated as singular.
pub const MAX_CONDITION_NUMBER: f64 = 1e12;

/// Returns the ratio of the largest to the smallest singular value of `matrix`.
///
/// Returns infinity for a matrix with a zero singular value.
#[must_use]
pub fn condition_number(matrix: &DMatrix<f64>) -> f64 {
    let singular = matrix.clone().svd(false, false).singular_values;
    let max = singular.iter().copied().fold(0.0, f64::max);
    let min = singular.iter().copied().fold(f64::INFINITY, f64::min);
    if min > 0.0 {
        max / min
    } else {
        f64::INFINITY
    }
}

/// Fails with [`Singularity::IllConditioned`] unless `matrix` is safely invertible.
pub(crate) fn check_conditioning(matrix: &DMatrix<f64>) -> Result<(), Error> {
    let condition = condition_number(matrix);
    // `!(a <= b)` also rejects NaN.
    if !(condition <= MAX_CONDITION_NUMBER) {
        return Err(Singularity::IllConditioned { condition }.into());
    }
    Ok(())
}

fn check_square(matrix: &DMatrix<f64>) -> Result<(), Error> {
    if matrix.is_square() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected: matrix.nrows(),
            given: matrix.ncols(),
        })
    }
}

/// Returns the inverse of `covariance`, the precision matrix.
///
/// Fails with [`Error::SingularInput`] if `covariance` is singular or its condition number
/// exceeds [`MAX_CONDITION_NUMBER`].
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use quatnorm::mahalanobis::invert;
///
/// let covariance = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.25]);
/// let precision = invert(&covariance).unwrap();
/// assert_eq!(precision, DMatrix::from_row_slice(2, 2, &[0.25, 0.0, 0.0, 4.0]));
///
/// let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
/// assert!(invert(&singular).is_err());
/// ```
pub fn invert(covariance: &DMatrix<f64>) -> Result<DMatrix<f64>, Error> {
    check_square(covariance)?;
    check_conditioning(covariance)?;
    covariance
        .clone()
        .try_inverse()
        .ok_or_else(|| {
            Singularity::IllConditioned {
                condition: f64::INFINITY,
            }
            .into()
        })
}

/// Relative size of a negative quadratic form still attributed to rounding.
const ROUNDING_TOLERANCE: f64 = 1e-10;

/// `sqrt(diffᵀ · precision · diff)`.
///
/// Small negative values from rounding are clamped to zero. A clearly negative form means
/// `precision` is not positive definite.
fn quadratic_distance(diff: &DVector<f64>, precision: &DMatrix<f64>) -> Result<f64, Error> {
    let form = diff.dot(&(precision * diff));
    if !form.is_finite() {
        return Err(Error::NonFinite);
    }
    if form < -ROUNDING_TOLERANCE * diff.norm_squared() * precision.amax() {
        return Err(Singularity::NotPositiveDefinite.into());
    }
    Ok(form.max(0.0).sqrt())
}

fn difference(point: &[f64], mean: &DVector<f64>) -> Result<DVector<f64>, Error> {
    if point.len() != mean.len() {
        return Err(Error::DimensionMismatch {
            expected: mean.len(),
            given: point.len(),
        });
    }
    if point.iter().chain(mean.iter()).any(|v| !v.is_finite()) {
        return Err(Error::NonFinite);
    }
    Ok(DVector::from_iterator(
        mean.len(),
        point.iter().zip(mean.iter()).map(|(x, m)| x - m),
    ))
}

/// Returns the Mahalanobis distance of `point` to `mean` under the precision matrix `precision`.
///
/// The result is non-negative and exactly zero when `point` equals `mean`. Fails with
/// [`Error::NonFinite`] if `point` or `mean` holds `NaN` or an infinity, and with
/// [`Singularity::NotPositiveDefinite`] if `precision` gives a negative quadratic form.
///
/// # Examples
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use quatnorm::mahalanobis::mahalanobis_distance;
///
/// let mean = DVector::from_vec(vec![1.0, 1.0]);
/// let precision = DMatrix::from_row_slice(2, 2, &[0.25, 0.0, 0.0, 1.0]);
/// assert_eq!(mahalanobis_distance(&[1.0, 1.0], &mean, &precision).unwrap(), 0.0);
/// assert_eq!(mahalanobis_distance(&[3.0, 1.0], &mean, &precision).unwrap(), 1.0);
/// ```
pub fn mahalanobis_distance(
    point: &[f64],
    mean: &DVector<f64>,
    precision: &DMatrix<f64>,
) -> Result<f64, Error> {
    if precision.shape() != (mean.len(), mean.len()) {
        return Err(Error::DimensionMismatch {
            expected: mean.len(),
            given: precision.nrows(),
        });
    }
    let diff = difference(point, mean)?;
    quadratic_distance(&diff, precision)
}

/// Returns the Mahalanobis distance of every row of `samples`, in row order.
pub fn mahalanobis_distances(
    samples: &DMatrix<f64>,
    mean: &DVector<f64>,
    precision: &DMatrix<f64>,
) -> Result<Vec<f64>, Error> {
    rows(samples)
        .map(|row| mahalanobis_distance(&row, mean, precision))
        .collect()
}

/// Iterates over the rows of a column-major matrix as owned vectors.
fn rows(samples: &DMatrix<f64>) -> impl Iterator<Item = Vec<f64>> + '_ {
    samples.row_iter().map(|row| row.iter().copied().collect())
}

/// How the covariance matrix is used to evaluate distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Inversion {
    /// Form the precision matrix with an explicit inverse.
    #[default]
    Explicit,
    /// Factor the covariance as `L Lᵀ` and solve `L y = x - μ`; the distance is `|y|`.
    Cholesky,
}

/// A covariance matrix prepared for evaluating Mahalanobis distances.
#[derive(Debug, Clone)]
pub enum Metric {
    /// The explicit precision matrix.
    Precision(DMatrix<f64>),
    /// The lower Cholesky factor of the covariance matrix.
    Cholesky(DMatrix<f64>),
}

impl Metric {
    /// Prepares `covariance` according to `inversion`.
    ///
    /// Fails like [`invert`] does, or with [`Singularity::NotPositiveDefinite`] if the
    /// Cholesky factorisation is impossible.
    pub fn new(covariance: &DMatrix<f64>, inversion: Inversion) -> Result<Self, Error> {
        match inversion {
            Inversion::Explicit => Ok(Self::Precision(invert(covariance)?)),
            Inversion::Cholesky => {
                check_square(covariance)?;
                check_conditioning(covariance)?;
                let cholesky = covariance
                    .clone()
                    .cholesky()
                    .ok_or(Error::SingularInput(Singularity::NotPositiveDefinite))?;
                Ok(Self::Cholesky(cholesky.l()))
            }
        }
    }

    /// The dimension of the points this metric measures.
    #[must_use]
    pub fn dimension(&self) -> usize {
        match self {
            Self::Precision(matrix) | Self::Cholesky(matrix) => matrix.nrows(),
        }
    }

    /// Returns the distance of `point` to `mean`.
    pub fn distance(&self, point: &[f64], mean: &DVector<f64>) -> Result<f64, Error> {
        if mean.len() != self.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                given: mean.len(),
            });
        }
        let diff = difference(point, mean)?;
        match self {
            Self::Precision(precision) => quadratic_distance(&diff, precision),
            Self::Cholesky(lower) => {
                let whitened = lower
                    .solve_lower_triangular(&diff)
                    .ok_or(Error::SingularInput(Singularity::NotPositiveDefinite))?;
                Ok(whitened.norm())
            }
        }
    }

    /// Returns the distance of every row of `samples` to `mean`, in row order.
    pub fn distances(&self, samples: &DMatrix<f64>, mean: &DVector<f64>) -> Result<Vec<f64>, Error> {
        rows(samples).map(|row| self.distance(&row, mean)).collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::moments::{compute_mean_and_covariance, samples_from_rows};

    /// `±sqrt(3.5)` along every axis: mean zero, unbiased covariance the identity.
    fn cross() -> DMatrix<f64> {
        let a = 3.5_f64.sqrt();
        let rows = (0..4).flat_map(|axis| {
            [a, -a].into_iter().map(move |value| {
                let mut row = vec![0.0; 4];
                row[axis] = value;
                row
            })
        });
        samples_from_rows(rows).unwrap()
    }

    #[test]
    fn identity_covariance_scenario() {
        let samples = cross();
        let (mean, covariance) = compute_mean_and_covariance(&samples).unwrap();
        assert_eq!(mean.as_slice(), &[0.0; 4]);
        assert_abs_diff_eq!(covariance, DMatrix::identity(4, 4), epsilon = 1e-12);

        let precision = invert(&covariance).unwrap();
        let origin = mahalanobis_distance(&[0.0; 4], &mean, &precision).unwrap();
        assert_eq!(origin, 0.0);
        let unit = mahalanobis_distance(&[1.0, 0.0, 0.0, 0.0], &mean, &precision).unwrap();
        assert_abs_diff_eq!(unit, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn distances_keep_row_order() {
        let samples = cross();
        let (mean, covariance) = compute_mean_and_covariance(&samples).unwrap();
        let precision = invert(&covariance).unwrap();
        let distances = mahalanobis_distances(&samples, &mean, &precision).unwrap();

        assert_eq!(distances.len(), samples.nrows());
        for (i, &distance) in distances.iter().enumerate() {
            let row: Vec<f64> = samples.row(i).iter().copied().collect();
            assert_eq!(distance, mahalanobis_distance(&row, &mean, &precision).unwrap());
            assert_abs_diff_eq!(distance, 3.5_f64.sqrt(), epsilon = 1e-12);
        }
    }

    #[test]
    fn cholesky_agrees_with_explicit_inverse() {
        let samples = samples_from_rows(vec![
            vec![1.0, 2.0, 0.5],
            vec![2.0, 1.0, -0.5],
            vec![0.0, 0.5, 1.5],
            vec![1.5, 3.0, 0.0],
            vec![-1.0, 0.0, 1.0],
            vec![0.5, -1.0, 2.0],
        ])
        .unwrap();
        let (mean, covariance) = compute_mean_and_covariance(&samples).unwrap();
        let explicit = Metric::new(&covariance, Inversion::Explicit).unwrap();
        let cholesky = Metric::new(&covariance, Inversion::Cholesky).unwrap();

        let a = explicit.distances(&samples, &mean).unwrap();
        let b = cholesky.distances(&samples, &mean).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!(*x >= 0.0);
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let mean = DVector::from_vec(vec![0.0; 4]);
        let precision = DMatrix::identity(4, 4);
        assert!(matches!(
            mahalanobis_distance(&[1.0, 2.0], &mean, &precision),
            Err(Error::DimensionMismatch {
                expected: 4,
                given: 2
            })
        ));
        let metric = Metric::Cholesky(DMatrix::identity(3, 3));
        assert!(matches!(
            metric.distance(&[0.0; 4], &mean),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn singular_and_indefinite_matrices_are_rejected() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(
            invert(&singular),
            Err(Error::SingularInput(Singularity::IllConditioned { .. }))
        ));
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert!(invert(&indefinite).is_ok());
        assert!(matches!(
            Metric::new(&indefinite, Inversion::Cholesky),
            Err(Error::SingularInput(Singularity::NotPositiveDefinite))
        ));
        let rectangular = DMatrix::zeros(2, 3);
        assert!(matches!(
            invert(&rectangular),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_points_have_no_distance() {
        let mean = DVector::zeros(4);
        let point = [f64::NAN, 5.0, 5.0, 5.0];
        assert!(matches!(
            mahalanobis_distance(&point, &mean, &DMatrix::identity(4, 4)),
            Err(Error::NonFinite)
        ));
        for metric in [
            Metric::Precision(DMatrix::identity(4, 4)),
            Metric::Cholesky(DMatrix::identity(4, 4)),
        ] {
            assert!(matches!(metric.distance(&point, &mean), Err(Error::NonFinite)));
            let infinite_mean = DVector::from_element(4, f64::INFINITY);
            assert!(matches!(
                metric.distance(&[0.0; 4], &infinite_mean),
                Err(Error::NonFinite)
            ));
        }
    }

    #[test]
    fn indefinite_precision_is_not_a_distance() {
        let mean = DVector::zeros(2);
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert!(matches!(
            mahalanobis_distance(&[0.0, 3.0], &mean, &indefinite),
            Err(Error::SingularInput(Singularity::NotPositiveDefinite))
        ));
        // A form that is exactly zero is still a valid distance.
        assert_eq!(mahalanobis_distance(&[3.0, 3.0], &mean, &indefinite).unwrap(), 0.0);
    }

    #[test]
    fn condition_number_of_diagonal_matrix() {
        let matrix = DMatrix::from_diagonal(&DVector::from_vec(vec![8.0, 2.0, 0.5]));
        assert_abs_diff_eq!(condition_number(&matrix), 16.0, epsilon = 1e-9);
    }
}
