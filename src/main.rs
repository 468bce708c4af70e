//! Quatnorm CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::DMatrix;
use quatnorm::histogram::{chi_squared_curve, Histogram, DEFAULT_BINS};
use quatnorm::loader::load_samples;
use quatnorm::moments::describe;
use quatnorm::{DistanceScale, GaussianFit, Inversion, PValueMethod};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "quatnorm")]
#[command(about = "Quatnorm - Mahalanobis-distance Gaussianity tests")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test the distances against the chi-squared distribution
    Fit {
        /// Whitespace-delimited dataset, one sample per line
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Degrees of freedom (defaults to the number of columns)
        #[arg(long)]
        df: Option<usize>,

        /// Test squared distances instead of distances
        #[arg(long)]
        squared: bool,

        /// Use a Cholesky solve instead of an explicit inverse
        #[arg(long)]
        cholesky: bool,

        /// Simulate the p-value with this many iterations
        #[arg(long, value_name = "ITERATIONS")]
        monte_carlo: Option<usize>,

        /// Seed of the simulated p-value
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print mean, covariance, variances and correlations
    Describe {
        /// Whitespace-delimited dataset, one sample per line
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the distance histogram and the chi-squared density
    Histogram {
        /// Whitespace-delimited dataset, one sample per line
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Number of bins
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,

        /// Degrees of freedom of the overlay (defaults to the number of columns)
        #[arg(long)]
        df: Option<usize>,

        /// Bin squared distances instead of distances
        #[arg(long)]
        squared: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Fit {
            input,
            df,
            squared,
            cholesky,
            monte_carlo,
            seed,
            json,
        } => {
            let fit = GaussianFit {
                degrees_of_freedom: df,
                scale: if squared { DistanceScale::Squared } else { DistanceScale::Raw },
                inversion: if cholesky { Inversion::Cholesky } else { Inversion::Explicit },
                method: monte_carlo.map_or(PValueMethod::Asymptotic, |iterations| {
                    PValueMethod::MonteCarlo { iterations, seed }
                }),
            };
            cmd_fit(&input, &fit, json)
        }
        Commands::Describe { input, json } => cmd_describe(&input, json),
        Commands::Histogram {
            input,
            bins,
            df,
            squared,
            json,
        } => {
            let scale = if squared { DistanceScale::Squared } else { DistanceScale::Raw };
            cmd_histogram(&input, bins, df, scale, json)
        }
    }
}

fn load(input: &Path) -> Result<DMatrix<f64>> {
    let samples =
        load_samples(input).with_context(|| format!("failed to load {}", input.display()))?;
    tracing::info!(
        path = %input.display(),
        samples = samples.nrows(),
        components = samples.ncols(),
        "loaded dataset"
    );
    Ok(samples)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_fit(input: &Path, fit: &GaussianFit, json: bool) -> Result<()> {
    let samples = load(input)?;
    if fit.scale == DistanceScale::Raw {
        tracing::warn!(
            "testing raw distances; squared distances are what follow chi-squared (use --squared)"
        );
    }
    let report = fit.analyze(&samples).context("gaussian fit failed")?;

    if json {
        return print_json(&report);
    }
    println!("Mean Mahalanobis Distance: {}", report.summary.mean);
    println!("Standard Deviation of Mahalanobis Distances: {}", report.summary.std_dev);
    println!("KS Statistic: {}", report.fit.statistic);
    println!("P-Value: {}", report.fit.p_value);
    Ok(())
}

fn cmd_describe(input: &Path, json: bool) -> Result<()> {
    let samples = load(input)?;
    let description = describe(&samples).context("descriptive statistics failed")?;

    if json {
        return print_json(&description);
    }
    println!("Mean: {:?}", description.mean);
    println!("Covariance Matrix:");
    for row in &description.covariance {
        println!("  {row:?}");
    }
    println!("Variances of Components: {:?}", description.variances);
    println!("Correlation Matrix:");
    for row in &description.correlation {
        println!("  {row:?}");
    }
    Ok(())
}

#[derive(Serialize)]
struct HistogramOutput {
    scale: DistanceScale,
    histogram: Histogram,
    reference: Vec<(f64, f64)>,
    degrees_of_freedom: usize,
}

fn cmd_histogram(
    input: &Path,
    bins: usize,
    df: Option<usize>,
    scale: DistanceScale,
    json: bool,
) -> Result<()> {
    let samples = load(input)?;
    let distances = GaussianFit::default()
        .distances(&samples)
        .context("mahalanobis distances failed")?;
    let degrees_of_freedom = df.unwrap_or(samples.ncols());

    let output = HistogramOutput {
        scale,
        histogram: Histogram::density(&scale.apply(&distances), bins)?,
        reference: chi_squared_curve(degrees_of_freedom, 0.0, 8.0, 100)?,
        degrees_of_freedom,
    };

    if json {
        return print_json(&output);
    }
    match scale {
        DistanceScale::Raw => println!("Mahalanobis Distances (density)"),
        DistanceScale::Squared => println!("Squared Mahalanobis Distances (density)"),
    }
    for (centre, density) in output.histogram.centres().iter().zip(&output.histogram.densities) {
        println!("{centre:>10.4} {density:>10.6}");
    }
    println!("Chi-Squared (df={degrees_of_freedom})");
    for (x, pdf) in &output.reference {
        println!("{x:>10.4} {pdf:>10.6}");
    }
    Ok(())
}
