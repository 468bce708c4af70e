//! Contains the [`Error`] type returned by every fallible operation of the crate.

use thiserror::Error as ThisError;

/// The reason a covariance matrix could not be used.
#[derive(Debug, Clone, Copy, PartialEq, ThisError)]
pub enum Singularity {
    /// There are not enough samples for a full-rank covariance matrix.
    #[error("at least {needed} samples are needed, but {given} were given")]
    TooFewSamples {
        /// Number of samples given.
        given: usize,
        /// Minimal number of samples, i.e. the dimension plus one.
        needed: usize,
    },
    /// The ratio of the largest to the smallest singular value is too large
    /// (or infinite, for an exactly singular matrix).
    #[error("condition number {condition:e} is too large")]
    IllConditioned {
        /// The estimated condition number.
        condition: f64,
    },
    /// The Cholesky factorisation failed, or a quadratic form came out negative.
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
}

/// Represents errors that can occur while analysing a dataset.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    /// The covariance matrix is not invertible.
    #[error("Covariance matrix is singular: {0}.")]
    SingularInput(#[from] Singularity),

    /// The input is empty, but at least one sample or value is required.
    #[error("Input must contain at least one value.")]
    EmptyInput,

    /// A point, row or matrix has the wrong number of components.
    #[error("Expected {expected} components, but was given {given}.")]
    DimensionMismatch {
        /// The dimension implied by the rest of the input.
        expected: usize,
        /// The offending dimension.
        given: usize,
    },

    /// The input contains `NaN` or infinite values.
    #[error("Input data must contain only finite values.")]
    NonFinite,

    /// A component is constant, so its correlation is undefined.
    #[error("Component {column} has zero variance.")]
    ZeroVariance {
        /// Index of the constant component.
        column: usize,
    },

    /// A histogram was requested with zero bins.
    #[error("The number of histogram bins must be positive.")]
    InvalidBins,

    /// A row of a dataset file has a different number of columns than the first row.
    #[error("Line {line}: expected {expected} columns, but found {given}.")]
    RaggedRow {
        /// One-based line number.
        line: usize,
        /// Column count of the first data row.
        expected: usize,
        /// Column count of this row.
        given: usize,
    },

    /// A token of a dataset file is not a finite number.
    #[error("Line {line}: cannot parse {token:?} as a finite number.")]
    Parse {
        /// One-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// See [`std::io::Error`].
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// See [`statrs::StatsError`].
    #[error("{0}")]
    Distribution(#[from] statrs::StatsError),
}
