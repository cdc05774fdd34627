//! The pre-screening particle size law.
//!
//! Before screening, diameters follow a log-normal distribution: ln(D) is
//! normal with mean μ and standard deviation σ. [`LogNormal`] carries those
//! two parameters and evaluates the untruncated density.
//!
//! | Quantity | Formula |
//! |---|---|
//! | PDF | 1/(D·σ·√(2π)) · exp(−(ln D − μ)²/(2σ²)) |
//! | CDF | Φ((ln D − μ)/σ) |
//! | Mean | exp(μ + σ²/2) |
//! | Variance | (exp(σ²) − 1) · exp(2μ + σ²) |
//!
//! The screening engine never uses the closed-form CDF: normalization and
//! cumulative probabilities are integrated numerically from [`LogNormal::pdf`]
//! (see [`crate::truncated`]). [`LogNormal::cdf`] exists as an independent
//! reference for checking those integrals.

use crate::error::{Error, Result};
use crate::special;

/// Log-normal distribution of particle diameters: ln(D) ~ N(μ, σ²).
///
/// # Examples
/// ```
/// use u_sieve::distributions::LogNormal;
/// let law = LogNormal::new(2.0_f64.ln(), 1.0).unwrap();
/// assert_eq!(law.pdf(0.0), 0.0);
/// assert!(law.pdf(1.0) > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormal {
    mu: f64,
    sigma: f64,
}

impl LogNormal {
    /// Creates a log-normal law from the mean and standard deviation of ln(D).
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if `sigma ≤ 0` or either parameter is
    /// not finite.
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !mu.is_finite() {
            return Err(Error::validation(
                "mean of ln(D)",
                format!("must be finite, got {mu}"),
            ));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::validation(
                "standard deviation of ln(D)",
                format!("must be finite and > 0, got {sigma}"),
            ));
        }
        Ok(Self { mu, sigma })
    }

    /// Builds a law from parameters already known to be valid.
    pub(crate) const fn from_parts(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Mean of ln(D).
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Standard deviation of ln(D).
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Mean diameter of the untruncated law, exp(μ + σ²/2).
    pub fn mean(&self) -> f64 {
        (self.mu + self.sigma * self.sigma / 2.0).exp()
    }

    /// Variance of the untruncated law, (exp(σ²) − 1) · exp(2μ + σ²).
    pub fn variance(&self) -> f64 {
        let s2 = self.sigma * self.sigma;
        (s2.exp() - 1.0) * (2.0 * self.mu + s2).exp()
    }

    /// Density at diameter `d`.
    ///
    /// Total over the real line: diameters `d ≤ 0` lie outside the support
    /// and yield 0, which is also the limit of the density as `d → 0⁺`.
    pub fn pdf(&self, d: f64) -> f64 {
        if d <= 0.0 {
            return 0.0;
        }
        let z = (d.ln() - self.mu) / self.sigma;
        special::standard_normal_pdf(z) / self.sigma / d
    }

    /// Closed-form CDF Φ((ln d − μ)/σ); 0 for `d ≤ 0`.
    pub fn cdf(&self, d: f64) -> f64 {
        if d <= 0.0 {
            return 0.0;
        }
        special::standard_normal_cdf((d.ln() - self.mu) / self.sigma)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn pdf_non_negative(
            mu in -3.0_f64..3.0,
            sigma in 0.05_f64..3.0,
            d in -5.0_f64..50.0,
        ) {
            let law = LogNormal::new(mu, sigma).unwrap();
            let p = law.pdf(d);
            prop_assert!(p.is_finite() && p >= 0.0, "pdf({}) = {}", d, p);
        }

        #[test]
        fn cdf_monotonic(
            mu in -3.0_f64..3.0,
            sigma in 0.05_f64..3.0,
            d1 in 0.001_f64..50.0,
            d2 in 0.001_f64..50.0,
        ) {
            let law = LogNormal::new(mu, sigma).unwrap();
            let (lo, hi) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            // Within the accuracy of the Φ approximation.
            prop_assert!(law.cdf(lo) <= law.cdf(hi) + 1e-7);
        }
    }
}
