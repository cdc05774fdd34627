//! Repeated-sampling experiments over one screened population.
//!
//! An experiment normalizes the screen once, draws `sample_count`
//! independent samples of `sample_size` diameters each, summarizes every
//! sample, and then summarizes the collection of sample means (the
//! empirical sampling distribution of the mean).
//!
//! A single failed draw aborts the whole run. Partial results are never
//! returned, since a sample with a missing or substituted diameter would
//! bias every statistic computed from it.
//!
//! # Parallelism
//!
//! Samples share nothing but the read-only normalization, so
//! [`run_parallel`] computes them on the rayon pool. Sample `i` always uses
//! [`stream_rng`]`(seed, i)`, which makes the result independent of the
//! number of threads and of scheduling order.

use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;

use crate::distributions::LogNormal;
use crate::error::{Error, Result};
use crate::random::{create_rng, stream_rng};
use crate::sampler::{InverseCdfTable, Sample, VariateSampler};
use crate::stats::{self, SampleSummary, WelfordAccumulator};
use crate::truncated::{normalize, NormalizationConstants, TruncatedLogNormal, TruncationBounds};

/// How each diameter is obtained from its uniform draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingStrategy {
    /// Solve `F_trunc(D) = u` exactly for every draw.
    #[default]
    RootFinding,
    /// Interpolate in an inverse-CDF table with `nodes` grid points, built
    /// once per run.
    Tabulated { nodes: usize },
}

/// Parameters of one experiment.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `distribution` | μ = ln 2, σ = 1 |
/// | `bounds` | `[0.375, 1]` |
/// | `sample_size` | 100 |
/// | `sample_count` | 11 |
/// | `strategy` | [`SamplingStrategy::RootFinding`] |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperimentConfig {
    pub distribution: LogNormal,
    pub bounds: TruncationBounds,
    /// Diameters per sample; at least 2.
    pub sample_size: usize,
    /// Number of independent samples; at least 1.
    pub sample_count: usize,
    pub strategy: SamplingStrategy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            distribution: LogNormal::from_parts(std::f64::consts::LN_2, 1.0),
            bounds: TruncationBounds::from_parts(0.375, 1.0),
            sample_size: 100,
            sample_count: 11,
            strategy: SamplingStrategy::RootFinding,
        }
    }
}

impl ExperimentConfig {
    /// Checks the sizes and the strategy. The law and the window are
    /// validated when they are constructed.
    ///
    /// # Errors
    /// [`Error::Validation`] naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size < 2 {
            return Err(Error::validation(
                "sample size",
                format!("need at least 2 diameters per sample, got {}", self.sample_size),
            ));
        }
        if self.sample_count < 1 {
            return Err(Error::validation(
                "sample count",
                "need at least 1 sample, got 0",
            ));
        }
        if let SamplingStrategy::Tabulated { nodes } = self.strategy {
            if nodes < 2 {
                return Err(Error::validation(
                    "table nodes",
                    format!("need at least 2, got {nodes}"),
                ));
            }
        }
        Ok(())
    }
}

/// Everything one run produced. Read-only once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    normalization: NormalizationConstants,
    samples: Vec<Sample>,
    sample_summaries: Vec<SampleSummary>,
    means_summary: Option<SampleSummary>,
}

impl ExperimentResult {
    /// Untruncated CDF at the apertures, computed once for the run.
    pub fn normalization(&self) -> &NormalizationConstants {
        &self.normalization
    }

    /// The samples in draw order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// One summary per sample, aligned with [`samples`](Self::samples).
    pub fn sample_summaries(&self) -> &[SampleSummary] {
        &self.sample_summaries
    }

    /// Summary of the per-sample means. `None` for a single-sample run,
    /// where the variance of the mean is undefined.
    ///
    /// This is the one place a run does not propagate a statistics error:
    /// [`Error::InsufficientData`] from summarizing a single mean is
    /// reported as `None` instead of failing an otherwise valid run. Every
    /// other failure aborts the run.
    pub fn means_summary(&self) -> Option<&SampleSummary> {
        self.means_summary.as_ref()
    }

    /// Summary over every diameter of every sample, obtained by merging
    /// one accumulator per sample.
    ///
    /// # Errors
    /// [`Error::InsufficientData`] if fewer than 2 diameters were drawn in
    /// total.
    pub fn pooled_summary(&self) -> Result<SampleSummary> {
        let pooled = self
            .samples
            .iter()
            .map(|s| s.iter().collect::<WelfordAccumulator>())
            .fold(WelfordAccumulator::new(), |mut acc, part| {
                acc.merge(&part);
                acc
            });
        pooled.summary().ok_or(Error::InsufficientData {
            count: pooled.count(),
        })
    }
}

/// Per-run drawing machinery, shared read-only between samples.
enum Drawer<'a> {
    Exact(VariateSampler<'a>),
    Table(InverseCdfTable),
}

impl<'a> Drawer<'a> {
    fn new(screen: &'a TruncatedLogNormal, strategy: SamplingStrategy) -> Result<Self> {
        match strategy {
            SamplingStrategy::RootFinding => Ok(Drawer::Exact(VariateSampler::new(screen))),
            SamplingStrategy::Tabulated { nodes } => {
                Ok(Drawer::Table(InverseCdfTable::build(screen, nodes)?))
            }
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Sample> {
        match self {
            Drawer::Exact(sampler) => sampler.sample(rng, n),
            Drawer::Table(table) => table.sample(rng, n),
        }
    }
}

fn prepare(config: &ExperimentConfig) -> Result<TruncatedLogNormal> {
    config.validate()?;
    let norm = normalize(&config.distribution, &config.bounds)?;
    info!(
        "experiment: {} samples of {} diameters, window [{}, {}], {:?}",
        config.sample_count,
        config.sample_size,
        config.bounds.d_min(),
        config.bounds.d_max(),
        config.strategy
    );
    Ok(TruncatedLogNormal::with_normalization(
        config.distribution,
        config.bounds,
        norm,
    ))
}

fn finish(screen: &TruncatedLogNormal, samples: Vec<Sample>) -> Result<ExperimentResult> {
    let sample_summaries = samples
        .iter()
        .map(Sample::summary)
        .collect::<Result<Vec<_>>>()?;
    for (i, s) in sample_summaries.iter().enumerate() {
        debug!("sample {}: mean {:.6}, variance {:.6}", i + 1, s.mean, s.variance);
    }

    let means: Vec<f64> = sample_summaries.iter().map(|s| s.mean).collect();
    let means_summary = match stats::summarize(&means) {
        Ok(summary) => Some(summary),
        Err(Error::InsufficientData { .. }) => None,
        Err(e) => return Err(e),
    };

    Ok(ExperimentResult {
        normalization: *screen.normalization(),
        samples,
        sample_summaries,
        means_summary,
    })
}

/// Runs an experiment on a generator seeded with `seed`.
///
/// # Examples
/// ```
/// use u_sieve::experiment::{run, ExperimentConfig};
///
/// let config = ExperimentConfig { sample_size: 20, sample_count: 3, ..Default::default() };
/// let result = run(&config, 42).unwrap();
/// assert_eq!(result.samples().len(), 3);
/// let means = result.means_summary().unwrap();
/// assert!(means.mean > 0.375 && means.mean < 1.0);
/// ```
///
/// # Errors
/// - [`Error::Validation`] for an invalid configuration.
/// - [`Error::Integration`] or [`Error::Sampling`] from any draw.
pub fn run(config: &ExperimentConfig, seed: u64) -> Result<ExperimentResult> {
    run_with_rng(config, &mut create_rng(seed))
}

/// Runs an experiment drawing every uniform from `rng`, sample after
/// sample.
pub fn run_with_rng<R: Rng + ?Sized>(
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<ExperimentResult> {
    let screen = prepare(config)?;
    let drawer = Drawer::new(&screen, config.strategy)?;
    let samples = draw_samples(&drawer, rng, config.sample_size, config.sample_count)?;
    finish(&screen, samples)
}

/// Draws `count` samples in order; the first failed draw aborts.
fn draw_samples<R: Rng + ?Sized>(
    drawer: &Drawer<'_>,
    rng: &mut R,
    size: usize,
    count: usize,
) -> Result<Vec<Sample>> {
    (0..count)
        .map(|_| drawer.sample(rng, size))
        .collect::<Result<Vec<_>>>()
}

/// Runs an experiment with the samples computed in parallel.
///
/// Sample `i` draws from [`stream_rng`]`(seed, i)`; results are collected
/// in sample order, so the output is deterministic for a given seed.
pub fn run_parallel(config: &ExperimentConfig, seed: u64) -> Result<ExperimentResult> {
    let screen = prepare(config)?;
    let drawer = Drawer::new(&screen, config.strategy)?;
    let samples = (0..config.sample_count)
        .into_par_iter()
        .map(|i| drawer.sample(&mut stream_rng(seed, i as u64), config.sample_size))
        .collect::<Result<Vec<_>>>()?;
    finish(&screen, samples)
}
