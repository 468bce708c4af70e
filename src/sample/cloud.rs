//! Random point generators with a prescribed mean and covariance.
//!
//! Both generators colour independent unit-variance components with the lower Cholesky factor
//! `L` of the covariance matrix, `x = μ + L z`, so they share their first two moments and differ
//! only in the shape of the distribution.

use nalgebra::{DMatrix, DVector};
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Error, Singularity};

/// A distribution of points of a fixed dimension.
pub trait PointCloud: Distribution<DVector<f64>> {
    /// Number of components of every point.
    fn dimension(&self) -> usize;
}

/// Mean and Cholesky factor shared by the generators.
#[derive(Debug, Clone)]
struct Colouring {
    mean: DVector<f64>,
    factor: DMatrix<f64>,
}

impl Colouring {
    fn new(mean: DVector<f64>, covariance: &DMatrix<f64>) -> Result<Self, Error> {
        if covariance.shape() != (mean.len(), mean.len()) {
            return Err(Error::DimensionMismatch {
                expected: mean.len(),
                given: covariance.nrows(),
            });
        }
        let factor = covariance
            .clone()
            .cholesky()
            .ok_or(Error::SingularInput(Singularity::NotPositiveDefinite))?
            .l();
        Ok(Self { mean, factor })
    }

    fn standard(dimension: usize) -> Self {
        Self {
            mean: DVector::zeros(dimension),
            factor: DMatrix::identity(dimension, dimension),
        }
    }

    fn apply(&self, z: &DVector<f64>) -> DVector<f64> {
        &self.mean + &self.factor * z
    }
}

/// The multivariate normal distribution.
#[derive(Debug, Clone)]
pub struct GaussianCloud {
    colouring: Colouring,
}

impl GaussianCloud {
    /// Fails with [`Error::SingularInput`] unless `covariance` is positive definite.
    pub fn new(mean: DVector<f64>, covariance: &DMatrix<f64>) -> Result<Self, Error> {
        Ok(Self {
            colouring: Colouring::new(mean, covariance)?,
        })
    }

    /// Zero mean and identity covariance.
    #[must_use]
    pub fn standard(dimension: usize) -> Self {
        Self {
            colouring: Colouring::standard(dimension),
        }
    }
}

impl Distribution<DVector<f64>> for GaussianCloud {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let z: DVector<f64> = DVector::from_fn(self.dimension(), |_, _| StandardNormal.sample(rng));
        self.colouring.apply(&z)
    }
}

impl PointCloud for GaussianCloud {
    fn dimension(&self) -> usize {
        self.colouring.mean.len()
    }
}

/// Points uniformly distributed in a hypercube (a parallelepiped after colouring).
///
/// Every component is uniform on `[-√3, √3]` before colouring, which has unit variance, so the
/// points have exactly the requested mean and covariance while being far from Gaussian.
#[derive(Debug, Clone)]
pub struct UniformCube {
    colouring: Colouring,
}

impl UniformCube {
    /// Fails with [`Error::SingularInput`] unless `covariance` is positive definite.
    pub fn new(mean: DVector<f64>, covariance: &DMatrix<f64>) -> Result<Self, Error> {
        Ok(Self {
            colouring: Colouring::new(mean, covariance)?,
        })
    }

    /// Zero mean and identity covariance.
    #[must_use]
    pub fn standard(dimension: usize) -> Self {
        Self {
            colouring: Colouring::standard(dimension),
        }
    }
}

impl Distribution<DVector<f64>> for UniformCube {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let half_width = 3.0_f64.sqrt();
        let z = DVector::from_fn(self.dimension(), |_, _| {
            rng.gen_range(-half_width..half_width)
        });
        self.colouring.apply(&z)
    }
}

impl PointCloud for UniformCube {
    fn dimension(&self) -> usize {
        self.colouring.mean.len()
    }
}
