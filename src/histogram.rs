//! Data for plotting the distances against the density of the reference distribution.

use serde::Serialize;
use statrs::distribution::{ChiSquared, Continuous};

use crate::error::Error;

/// The number of bins of the distance histogram.
pub const DEFAULT_BINS: usize = 30;

/// An equal-width histogram normalised to a probability density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` increasing bin edges.
    pub edges: Vec<f64>,
    /// Number of values in every bin.
    pub counts: Vec<usize>,
    /// `counts[i] / (n * width)`, so that the densities integrate to one.
    pub densities: Vec<f64>,
}

impl Histogram {
    /// Bins `values` into `bins` equal bins spanning their range.
    ///
    /// Every bin is half-open except the last, which also contains the maximum. A constant
    /// input is binned over `[value - 0.5, value + 0.5]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quatnorm::histogram::Histogram;
    ///
    /// let histogram = Histogram::density(&[0.0, 1.0, 1.0, 2.0], 2).unwrap();
    /// assert_eq!(histogram.edges, vec![0.0, 1.0, 2.0]);
    /// assert_eq!(histogram.counts, vec![1, 3]);
    /// assert_eq!(histogram.densities, vec![0.25, 0.75]);
    /// ```
    pub fn density(values: &[f64], bins: usize) -> Result<Self, Error> {
        if bins == 0 {
            return Err(Error::InvalidBins);
        }
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFinite);
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (low, high) = if min < max { (min, max) } else { (min - 0.5, max + 0.5) };

        #[allow(clippy::cast_precision_loss)]
        let width = (high - low) / bins as f64;
        #[allow(clippy::cast_precision_loss)]
        let edges: Vec<f64> = (0..=bins).map(|i| low + width * i as f64).collect();

        let mut counts = vec![0; bins];
        for &value in values {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = ((value - low) / width) as usize;
            counts[index.min(bins - 1)] += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let total = values.len() as f64 * width;
        #[allow(clippy::cast_precision_loss)]
        let densities = counts.iter().map(|&count| count as f64 / total).collect();

        Ok(Self {
            edges,
            counts,
            densities,
        })
    }

    /// Returns the centre of every bin.
    #[must_use]
    pub fn centres(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }
}

/// Samples the density of the chi-squared distribution with `df` degrees of freedom at `points`
/// equally spaced abscissas from `start` to `stop` inclusive.
///
/// # Examples
///
/// ```
/// use quatnorm::histogram::chi_squared_curve;
///
/// let curve = chi_squared_curve(4, 0.0, 8.0, 100).unwrap();
/// assert_eq!(curve.len(), 100);
/// assert_eq!(curve[0], (0.0, 0.0));
/// assert_eq!(curve[99].0, 8.0);
/// ```
pub fn chi_squared_curve(
    df: usize,
    start: f64,
    stop: f64,
    points: usize,
) -> Result<Vec<(f64, f64)>, Error> {
    #[allow(clippy::cast_precision_loss)]
    let reference = ChiSquared::new(df as f64)?;
    #[allow(clippy::cast_precision_loss)]
    let step = if points > 1 {
        (stop - start) / (points - 1) as f64
    } else {
        0.0
    };
    #[allow(clippy::cast_precision_loss)]
    let curve = (0..points)
        .map(|i| {
            let x = if i + 1 == points { stop } else { start + step * i as f64 };
            (x, reference.pdf(x))
        })
        .collect();
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn densities_integrate_to_one() {
        let values: Vec<f64> = (0..97).map(|i| (f64::from(i) * 0.37).sin().abs() * 5.0).collect();
        let histogram = Histogram::density(&values, DEFAULT_BINS).unwrap();
        assert_eq!(histogram.edges.len(), DEFAULT_BINS + 1);
        assert_eq!(histogram.counts.iter().sum::<usize>(), values.len());
        let width = histogram.edges[1] - histogram.edges[0];
        let integral: f64 = histogram.densities.iter().sum::<f64>() * width;
        assert_abs_diff_eq!(integral, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn maximum_falls_in_last_bin() {
        let histogram = Histogram::density(&[1.0, 2.0, 3.0], 4).unwrap();
        assert_eq!(histogram.counts, vec![1, 0, 1, 1]);
        assert_eq!(histogram.centres(), vec![1.25, 1.75, 2.25, 2.75]);
    }

    #[test]
    fn constant_values_are_widened() {
        let histogram = Histogram::density(&[2.0, 2.0], 1).unwrap();
        assert_eq!(histogram.edges, vec![1.5, 2.5]);
        assert_eq!(histogram.densities, vec![1.0]);
    }

    #[test]
    fn invalid_histograms_are_rejected() {
        assert!(matches!(Histogram::density(&[1.0], 0), Err(Error::InvalidBins)));
        assert!(matches!(Histogram::density(&[], 3), Err(Error::EmptyInput)));
        assert!(matches!(
            Histogram::density(&[f64::INFINITY], 3),
            Err(Error::NonFinite)
        ));
    }

    #[test]
    fn curve_matches_closed_form() {
        // The density of chi-squared with 4 degrees of freedom is x e^(-x/2) / 4.
        let curve = chi_squared_curve(4, 0.0, 8.0, 100).unwrap();
        for (x, y) in curve {
            assert_abs_diff_eq!(y, x * (-x / 2.0).exp() / 4.0, epsilon = 1e-12);
        }
        assert!(chi_squared_curve(0, 0.0, 8.0, 10).is_err());
        assert_eq!(chi_squared_curve(4, 1.0, 8.0, 1).unwrap().len(), 1);
    }
}
