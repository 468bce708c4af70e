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

//! Contains the [`MonteCarlo`] struct.
//!
//! The crate uses it in two places: to simulate the null distribution of the Kolmogorov-Smirnov
//! statistic (see [`PValueMethod::MonteCarlo`](crate::fitting::PValueMethod::MonteCarlo)) and to
//! measure how often the whole Gaussianity test rejects data from a known generator (see
//! [`FitTrial`](crate::sample::FitTrial)).

use std::cmp;

use rand::SeedableRng;

use crate::sample::Sample;

/// A struct to keep track of the fraction of the values less then the test value.
struct CmlRatio {
    /// Number of smaller values
    left: usize,
    /// Total number of values
    total: usize,
}

impl CmlRatio {
    /// Returns the initial `CmlRatio`
    fn new() -> CmlRatio {
        CmlRatio { left: 0, total: 0 }
    }

    /// Updates the ratio. `ord` describes whether the new value is less, equal or greater than the
    /// test value.
    fn update(&mut self, ord: cmp::Ordering) {
        // Only the values that are strictly less increase the ratio.
        if let cmp::Ordering::Less = ord {
            self.left += 1;
        }
        self.total += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    /// Gives the ratio so far.
    fn ratio(&self) -> f64 {
        self.left as f64 / self.total as f64
    }

    #[allow(clippy::cast_precision_loss)]
    /// Gives the fraction of values greater than or equal to the test value.
    fn upper(&self) -> f64 {
        (self.total - self.left) as f64 / self.total as f64
    }
}

/// The struct that contains the state of a Monte-Carlo simulation.
///
/// [`MonteCarlo<S>`] repeatedly calls [`Sample::generate`] and [`Sample::evaluate`] methods of `S`
/// and calculates a result from the statistics returned by [`Sample::evaluate`].
///
/// A simulation created with [`MonteCarlo::with_seed`] is reproducible: two simulations with the
/// same sample, seed and number of iterations give the same results.
pub struct MonteCarlo<S> {
    /// Number of iterations of the Monte-Carlo simulation.
    pub iterations: usize,
    sample: S,
    /// The random generator used by `sample.generate`
    rng: rand::rngs::StdRng,
}

impl<S: Sample> MonteCarlo<S> {
    /// Returns the statistic calculated from one iteration of a Monte-Carlo simulation.
    fn simulate_iteration(&mut self) -> f64 {
        self.sample.generate(&mut self.rng);
        self.sample.evaluate()
    }

    fn simulate_ratio(&mut self, test_statistic: f64) -> CmlRatio {
        let mut ratio = CmlRatio::new();
        for _ in 0..self.iterations {
            let statistic = self.simulate_iteration();
            ratio.update(statistic.total_cmp(&test_statistic));
        }
        ratio
    }

    /// Runs a Monte-Carlo simulations and returns the fraction of iterations where
    /// the statistic is less than `test_statistic`.
    ///
    /// When the statistic is a p-value, this is the rejection rate at level `test_statistic`.
    /// Returns `NaN` if `self.iterations` is zero.
    pub fn simulate_pvalue(mut self, test_statistic: f64) -> f64 {
        self.simulate_ratio(test_statistic).ratio()
    }

    /// Runs a Monte-Carlo simulation and returns the fraction of iterations where the statistic
    /// is greater than or equal to `test_statistic`, i.e. the upper-tail p-value.
    ///
    /// Returns `NaN` if `self.iterations` is zero.
    pub fn simulate_upper_tail(mut self, test_statistic: f64) -> f64 {
        self.simulate_ratio(test_statistic).upper()
    }
}

impl<S> MonteCarlo<S> {
    /// The default value of `self.iterations`
    pub const DEFAULT_ITERATIONS: usize = 1_000_000;

    /// Constructs a seeded Monte-Carlo simulation based on the implementation of [`Sample`] by
    /// `S`.
    pub fn with_seed(sample: S, seed: u64) -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            sample,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}
