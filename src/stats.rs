//! Descriptive statistics for samples and for collections of sample means.
//!
//! # Algorithms
//!
//! - **Mean**: Neumaier–Kahan compensated summation, O(ε) error
//!   independent of n.
//! - **Variance**: Welford's online algorithm with Bessel's correction
//!   (denominator n − 1).
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **Merging**: Chan, Golub & LeVeque (1979) pairwise update, so
//!   per-sample accumulators can be pooled without revisiting the data.
//!
//! The free functions follow the `Option` convention for degenerate input;
//! [`summarize`] combines them into the fallible entry point the
//! experiment uses. [`WelfordAccumulator`] pools samples after the fact.

use crate::error::{Error, Result};

/// Summary of one collection of values: a sample of diameters, or the
/// collection of per-sample means.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    pub count: usize,
    pub mean: f64,
    /// Unbiased sample variance (n − 1 denominator).
    pub variance: f64,
    pub min: f64,
    pub max: f64,
}

impl SampleSummary {
    /// Sample standard deviation, √variance.
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Computes mean, unbiased variance and range of `values`.
///
/// # Errors
/// - [`Error::InsufficientData`] if fewer than 2 values are given: the
///   variance is undefined, and a variance of 0 is never reported instead.
/// - [`Error::Validation`] if any value is NaN or infinite.
///
/// # Examples
/// ```
/// use u_sieve::stats::summarize;
/// let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
/// assert_eq!(s.count, 8);
/// assert!((s.mean - 5.0).abs() < 1e-15);
/// assert!((s.variance - 4.571428571428571).abs() < 1e-10);
/// ```
pub fn summarize(values: &[f64]) -> Result<SampleSummary> {
    if values.len() < 2 {
        return Err(Error::InsufficientData {
            count: values.len(),
        });
    }
    if let Some(bad) = values.iter().find(|x| !x.is_finite()) {
        return Err(Error::validation(
            "values",
            format!("statistics require finite values, got {bad}"),
        ));
    }
    let missing = || Error::InsufficientData {
        count: values.len(),
    };
    Ok(SampleSummary {
        count: values.len(),
        mean: mean(values).ok_or_else(missing)?,
        variance: variance(values).ok_or_else(missing)?,
        min: min(values).ok_or_else(missing)?,
        max: max(values).ok_or_else(missing)?,
    })
}

/// Computes the arithmetic mean using compensated summation.
///
/// # Returns
/// - `None` if `data` is empty or contains any NaN/Inf.
///
/// # Examples
/// ```
/// use u_sieve::stats::mean;
/// let diameters = [0.4, 0.5, 0.75, 0.95];
/// assert!((mean(&diameters).unwrap() - 0.65).abs() < 1e-15);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Computes the sample variance (n − 1 denominator).
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    data.iter()
        .copied()
        .collect::<WelfordAccumulator>()
        .sample_variance()
}

/// Smallest value, or `None` if `data` is empty or holds a NaN.
pub fn min(data: &[f64]) -> Option<f64> {
    extreme(data, f64::min)
}

/// Largest value, or `None` if `data` is empty or holds a NaN.
pub fn max(data: &[f64]) -> Option<f64> {
    extreme(data, f64::max)
}

fn extreme(data: &[f64], pick: fn(f64, f64) -> f64) -> Option<f64> {
    let (&first, rest) = data.split_first()?;
    if data.iter().any(|x| x.is_nan()) {
        return None;
    }
    Some(rest.iter().fold(first, |acc, &x| pick(acc, x)))
}

/// Neumaier compensated summation.
///
/// Improved Kahan summation that also handles an addend larger in
/// magnitude than the running sum.
///
/// Reference: Neumaier (1974), *Zeitschrift für Angewandte Mathematik
/// und Mechanik* 54(1), pp. 39–51.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

/// Streaming accumulator for count, mean, variance and range.
///
/// Single pass, O(1) memory. Two accumulators can be merged, which is how
/// per-sample statistics are pooled across an experiment.
///
/// # Examples
/// ```
/// use u_sieve::stats::WelfordAccumulator;
/// let mut first: WelfordAccumulator = [0.4, 0.6].into_iter().collect();
/// let second: WelfordAccumulator = [0.8, 1.0].into_iter().collect();
/// first.merge(&second);
/// let pooled = first.summary().unwrap();
/// assert_eq!(pooled.count, 4);
/// assert!((pooled.mean - 0.7).abs() < 1e-15);
/// assert!((pooled.variance - 0.2 / 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WelfordAccumulator {
    count: usize,
    mean_acc: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl WelfordAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean_acc: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Feeds one value.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if self.count == 1 {
            self.mean_acc = value;
            return;
        }
        let delta = value - self.mean_acc;
        self.mean_acc += delta / self.count as f64;
        self.m2 += delta * (value - self.mean_acc);
    }

    /// Number of values seen.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Running mean, or `None` before the first value.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean_acc)
    }

    /// Sample variance (n − 1), or `None` with fewer than 2 values.
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2 / (self.count - 1) as f64)
    }

    /// Snapshot as a [`SampleSummary`], or `None` with fewer than 2 values.
    pub fn summary(&self) -> Option<SampleSummary> {
        Some(SampleSummary {
            count: self.count,
            mean: self.mean()?,
            variance: self.sample_variance()?,
            min: self.min,
            max: self.max,
        })
    }

    /// Merges another accumulator into this one.
    ///
    /// Reference: Chan, Golub & LeVeque (1979), "Updating Formulae and a
    /// Pairwise Algorithm for Computing Sample Variances".
    pub fn merge(&mut self, other: &WelfordAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean_acc - self.mean_acc;

        self.mean_acc += delta * (nb / n);
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

impl Default for WelfordAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<f64> for WelfordAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        for x in iter {
            acc.update(x);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [f64; 8] = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

    #[test]
    fn test_summarize_basic() {
        let s = summarize(&DATA).unwrap();
        assert_eq!(s.count, 8);
        assert!((s.mean - 5.0).abs() < 1e-15);
        assert!((s.variance - 4.571428571428571).abs() < 1e-10);
        assert!((s.std_dev() - 4.571428571428571_f64.sqrt()).abs() < 1e-10);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
    }

    #[test]
    fn test_summarize_two_values() {
        let s = summarize(&[1.0, 3.0]).unwrap();
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.variance, 2.0);
    }

    #[test]
    fn test_summarize_single_value_is_insufficient() {
        assert_eq!(
            summarize(&[0.5]),
            Err(Error::InsufficientData { count: 1 })
        );
        assert_eq!(summarize(&[]), Err(Error::InsufficientData { count: 0 }));
    }

    #[test]
    fn test_summarize_rejects_non_finite() {
        assert!(matches!(
            summarize(&[1.0, f64::NAN, 3.0]),
            Err(Error::Validation { .. })
        ));
        assert!(summarize(&[1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_summarize_mean_is_compensated() {
        // A running mean loses the two 1.0 addends next to ±1e16.
        let s = summarize(&[1e16, 1.0, -1e16, 1.0]).unwrap();
        assert_eq!(s.mean, 0.5);
        assert_eq!(Some(s.mean), mean(&[1e16, 1.0, -1e16, 1.0]));
    }

    #[test]
    fn test_mean_and_variance() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, f64::NAN]), None);
        assert!((variance(&DATA).unwrap() - 4.571428571428571).abs() < 1e-10);
        assert_eq!(variance(&[1.0]), None);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min(&DATA), Some(2.0));
        assert_eq!(max(&DATA), Some(9.0));
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn test_kahan_sum_precision() {
        let result = kahan_sum(&[1e16, 1.0, -1e16]);
        assert!((result - 1.0).abs() < 1e-10, "got {result}");
    }

    #[test]
    fn test_welford_single_value() {
        let mut acc = WelfordAccumulator::new();
        acc.update(5.0);
        assert_eq!(acc.count(), 1);
        assert_eq!(acc.mean(), Some(5.0));
        assert_eq!(acc.sample_variance(), None);
        assert_eq!(acc.summary(), None);
    }

    #[test]
    fn test_welford_merge_matches_batch() {
        let (left, right) = DATA.split_at(3);
        let mut acc: WelfordAccumulator = left.iter().copied().collect();
        acc.merge(&right.iter().copied().collect());
        let merged = acc.summary().unwrap();
        let batch = summarize(&DATA).unwrap();
        assert_eq!(merged.count, batch.count);
        assert!((merged.mean - batch.mean).abs() < 1e-14);
        assert!((merged.variance - batch.variance).abs() < 1e-12);
        assert_eq!(merged.min, 2.0);
        assert_eq!(merged.max, 9.0);
    }

    #[test]
    fn test_welford_merge_empty() {
        let mut acc: WelfordAccumulator = DATA.iter().copied().collect();
        let before = acc.clone();
        acc.merge(&WelfordAccumulator::new());
        assert_eq!(acc, before);

        let mut empty = WelfordAccumulator::new();
        empty.merge(&before);
        assert_eq!(empty, before);
    }

    #[test]
    fn test_variance_large_offset() {
        let data: Vec<f64> = (1..=5).map(|i| 1e9 + i as f64).collect();
        let var = summarize(&data).unwrap().variance;
        assert!((var - 2.5).abs() < 1e-5, "got {var}");
    }
}
