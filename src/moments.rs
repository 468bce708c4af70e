//! First and second moments of a sample matrix.
//!
//! A sample matrix is a [`DMatrix<f64>`] with one sample per row and one component per column.
//! For the quaternion dataset the columns are the `h`, `i`, `j` and `k` components.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{Error, Singularity};
use crate::mahalanobis::check_conditioning;

/// Builds a sample matrix from an iterator of rows.
///
/// Every row must have the same, non-zero, number of components and every value must be finite.
///
/// # Examples
///
/// ```
/// use quatnorm::moments::samples_from_rows;
///
/// let samples = samples_from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// assert_eq!(samples.shape(), (2, 2));
/// assert_eq!(samples[(1, 0)], 3.0);
/// ```
pub fn samples_from_rows<I, J>(rows: I) -> Result<DMatrix<f64>, Error>
where
    I: IntoIterator<Item = J>,
    J: IntoIterator<Item = f64>,
{
    let mut flat = Vec::new();
    let mut n = 0;
    let mut d = 0;

    for row in rows {
        let before = flat.len();
        flat.extend(row);
        let row_len = flat.len() - before;

        if n == 0 {
            d = row_len;
        } else if row_len != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                given: row_len,
            });
        }
        n += 1;
    }

    if n == 0 || d == 0 {
        return Err(Error::EmptyInput);
    }
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFinite);
    }

    Ok(DMatrix::from_row_slice(n, d, &flat))
}

/// Returns the arithmetic mean of the samples along the sample axis.
fn mean_vector(samples: &DMatrix<f64>) -> DVector<f64> {
    samples.row_mean().transpose()
}

/// Returns `samples` with `mean` subtracted from every row.
fn centered(samples: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let mut centered = samples.clone();
    let mean_row = mean.transpose();
    for i in 0..centered.nrows() {
        let mut row = centered.row_mut(i);
        row -= &mean_row;
    }
    centered
}

/// Scatter matrix of the centred samples divided by `denominator`, exactly symmetric.
fn scatter(centered: &DMatrix<f64>, denominator: f64) -> DMatrix<f64> {
    let mut matrix = centered.transpose() * centered / denominator;
    matrix.fill_lower_triangle_with_upper_triangle();
    matrix
}

/// Computes the sample mean vector and the unbiased (`N - 1` denominator) sample covariance
/// matrix.
///
/// Fails with [`Error::EmptyInput`] when there are no samples and with
/// [`Error::SingularInput`] when there are fewer than `D + 1` samples or when the covariance
/// matrix is rank-deficient.
///
/// # Examples
///
/// ```
/// use quatnorm::moments::{compute_mean_and_covariance, samples_from_rows};
///
/// let samples = samples_from_rows(vec![
///     vec![0.0, 0.0],
///     vec![2.0, 0.0],
///     vec![0.0, 2.0],
///     vec![2.0, 2.0],
/// ])
/// .unwrap();
/// let (mean, covariance) = compute_mean_and_covariance(&samples).unwrap();
/// assert_eq!(mean.as_slice(), &[1.0, 1.0]);
/// assert!((covariance[(0, 0)] - 4.0 / 3.0).abs() < 1e-12);
/// assert_eq!(covariance[(0, 1)], 0.0);
/// ```
pub fn compute_mean_and_covariance(
    samples: &DMatrix<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>), Error> {
    let (n, d) = samples.shape();
    if n == 0 || d == 0 {
        return Err(Error::EmptyInput);
    }
    if n <= d {
        return Err(Singularity::TooFewSamples {
            given: n,
            needed: d + 1,
        }
        .into());
    }

    let mean = mean_vector(samples);
    #[allow(clippy::cast_precision_loss)]
    let covariance = scatter(&centered(samples, &mean), (n - 1) as f64);
    check_conditioning(&covariance)?;

    Ok((mean, covariance))
}

/// Returns the population (`N` denominator) variance of every component.
///
/// These are the values `numpy.var(data, axis=0)` reports.
pub fn variances(samples: &DMatrix<f64>) -> Result<DVector<f64>, Error> {
    let n = samples.nrows();
    if n == 0 || samples.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    let mean = mean_vector(samples);
    let centered = centered(samples, &mean);
    #[allow(clippy::cast_precision_loss)]
    let n = n as f64;
    Ok(centered.map(|v| v * v).row_sum().transpose() / n)
}

/// Returns the matrix of Pearson correlation coefficients between components.
///
/// The diagonal is exactly one. Fails with [`Error::ZeroVariance`] if a component is constant.
pub fn correlation(samples: &DMatrix<f64>) -> Result<DMatrix<f64>, Error> {
    if samples.nrows() == 0 || samples.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    let mean = mean_vector(samples);
    // The normalisation cancels out, so the scatter matrix is used directly.
    let scatter = scatter(&centered(samples, &mean), 1.0);
    let d = scatter.nrows();

    if let Some(column) = (0..d).find(|&i| scatter[(i, i)] <= 0.0) {
        return Err(Error::ZeroVariance { column });
    }
    let scales = DVector::from_fn(d, |i, _| scatter[(i, i)].sqrt());

    Ok(DMatrix::from_fn(d, d, |i, j| {
        if i == j {
            1.0
        } else {
            (scatter[(i, j)] / (scales[i] * scales[j])).clamp(-1.0, 1.0)
        }
    }))
}

/// Descriptive statistics of a sample matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    /// Number of samples.
    pub samples: usize,
    /// Mean of every component.
    pub mean: Vec<f64>,
    /// Unbiased sample covariance matrix, row by row.
    pub covariance: Vec<Vec<f64>>,
    /// Population variance of every component.
    pub variances: Vec<f64>,
    /// Pearson correlation matrix, row by row.
    pub correlation: Vec<Vec<f64>>,
}

/// Computes mean, covariance, variances and correlations in one go.
///
/// Unlike [`compute_mean_and_covariance`] this does not require the covariance matrix to be
/// invertible, only that there are at least two samples and no constant component.
pub fn describe(samples: &DMatrix<f64>) -> Result<Description, Error> {
    let n = samples.nrows();
    if n == 0 || samples.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    if n < 2 {
        return Err(Singularity::TooFewSamples { given: n, needed: 2 }.into());
    }

    let mean = mean_vector(samples);
    #[allow(clippy::cast_precision_loss)]
    let covariance = scatter(&centered(samples, &mean), (n - 1) as f64);

    Ok(Description {
        samples: n,
        mean: mean.iter().copied().collect(),
        covariance: matrix_rows(&covariance),
        variances: variances(samples)?.iter().copied().collect(),
        correlation: matrix_rows(&correlation(samples)?),
    })
}

/// Copies a matrix into a vector of rows.
pub(crate) fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}
