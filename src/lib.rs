// Copyright 2024 Vladimir Kharchev

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at

//     http://www.apache.org/licenses/LICENSE-2.0

// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Testing whether a set of four-component vectors (quaternions) is multivariate Gaussian.
//!
//! Quatnorm measures every sample by its Mahalanobis distance to the sample mean under the
//! sample covariance, and compares the distribution of those distances with the chi-squared
//! distribution using a Kolmogorov-Smirnov test. Nothing is specific to four components: any
//! sample matrix with more samples than components can be tested.
//!
//! # Examples
//!
//! Reading a dataset and running the test the way the quaternion analysis does:
//! ```
//! use quatnorm::loader::parse_samples;
//! use quatnorm::GaussianFit;
//!
//! let text = "\
//!     0.12 -1.03 0.44 0.91
//!     -0.87 0.35 1.20 -0.42
//!     1.51 0.08 -0.66 0.27
//!     -0.31 -0.72 -1.14 1.38
//!     0.64 1.47 0.19 -1.05
//!     -1.22 -0.18 0.73 0.36
//!     0.05 0.93 -0.48 -0.77
//! ";
//! let samples = parse_samples(text.as_bytes()).unwrap();
//! let report = GaussianFit::default().analyze(&samples).unwrap();
//!
//! println!("Mean Mahalanobis Distance: {}", report.summary.mean);
//! println!("Standard Deviation of Mahalanobis Distances: {}", report.summary.std_dev);
//! println!("KS Statistic: {}", report.fit.statistic);
//! println!("P-Value: {}", report.fit.p_value);
//! assert_eq!(report.distances.len(), 7);
//! ```
//!
//! # Raw or squared distances
//!
//! Under multivariate normality it is the *squared* distance that follows the chi-squared
//! distribution. The default [`DistanceScale::Raw`] keeps the historical comparison of the
//! distances themselves, which rejects even perfectly Gaussian data; choose
//! [`DistanceScale::Squared`] for the textbook test.
//!
//! # Rejection rates
//!
//! How often the test rejects data of a known shape can be measured with a [`MonteCarlo`]
//! simulation of [`FitTrial`](sample::FitTrial)s:
//! ```
//! use quatnorm::sample::{FitTrial, GaussianCloud};
//! use quatnorm::{DistanceScale, GaussianFit, MonteCarlo};
//!
//! let fit = GaussianFit {
//!     scale: DistanceScale::Squared,
//!     ..GaussianFit::default()
//! };
//! let trial = FitTrial::new(GaussianCloud::standard(4), fit, 200).unwrap();
//! let mut simulation = MonteCarlo::with_seed(trial, 17);
//! simulation.iterations = 20;
//!
//! // Gaussian data is rarely rejected at the 5% level.
//! let rejection_rate = simulation.simulate_pvalue(0.05);
//! assert!(rejection_rate < 0.5);
//! ```
#![deny(clippy::pedantic)]
#![deny(missing_docs)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
pub mod fitting;
pub mod histogram;
pub mod loader;
pub mod mahalanobis;
pub mod moments;
pub mod monte_carlo;
mod pipeline;
pub mod sample;

pub use error::{Error, Singularity};
pub use fitting::{Computation, PValueMethod, Summary};
pub use mahalanobis::Inversion;
pub use monte_carlo::MonteCarlo;
pub use pipeline::{DistanceScale, FitReport, GaussianFit};
