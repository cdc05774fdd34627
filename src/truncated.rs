//! The screened (truncated) log-normal law.
//!
//! Screening keeps only diameters in `[d_min, d_max]`. The surviving
//! population has density
//!
//! ```text
//! f_trunc(D) = f(D) / (F(d_max) − F(d_min))    for d_min ≤ D ≤ d_max
//! ```
//!
//! where `f` is the untruncated log-normal density and `F` its CDF. Both
//! `F(d_min)` and `F(d_max)` are obtained by integrating `f` from 0
//! ([`normalize`]), and the truncated CDF is the integral of `f_trunc` from
//! `d_min` ([`TruncatedLogNormal::cdf`]). No closed-form CDF is used.
//!
//! # Domain convention
//!
//! [`TruncatedLogNormal::cdf`] is defined on the window only and returns 0
//! for any `D` outside it, including above `d_max`. Callers that need a true
//! cumulative probability everywhere use [`TruncatedLogNormal::cdf_clamped`].

use log::debug;

use crate::distributions::LogNormal;
use crate::error::{Error, Result};
use crate::quadrature::{integrate_points, QuadratureOptions};

/// Screens with less surviving probability than this are rejected: the
/// normalization would be dominated by quadrature error.
const MIN_WINDOW_MASS: f64 = 1e-9;

/// Breakpoints are placed at exp(μ + kσ) for |k| ≤ this.
const BREAKPOINT_SIGMAS: i32 = 8;

/// Screen apertures: the closed interval of diameters that survive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationBounds {
    d_min: f64,
    d_max: f64,
}

impl TruncationBounds {
    /// Creates the window `[d_min, d_max]`.
    ///
    /// # Errors
    /// [`Error::Validation`] unless both are finite, `d_min ≥ 0` and
    /// `d_min < d_max`. A zero-width window is rejected.
    pub fn new(d_min: f64, d_max: f64) -> Result<Self> {
        if !d_min.is_finite() || d_min < 0.0 {
            return Err(Error::validation(
                "minimum diameter",
                format!("must be finite and >= 0, got {d_min}"),
            ));
        }
        if !d_max.is_finite() {
            return Err(Error::validation(
                "maximum diameter",
                format!("must be finite, got {d_max}"),
            ));
        }
        if d_min >= d_max {
            return Err(Error::validation(
                "truncation bounds",
                format!("minimum diameter must be below maximum, got [{d_min}, {d_max}]"),
            ));
        }
        Ok(Self { d_min, d_max })
    }

    /// Builds a window already known to satisfy `0 ≤ d_min < d_max`.
    pub(crate) const fn from_parts(d_min: f64, d_max: f64) -> Self {
        Self { d_min, d_max }
    }

    pub fn d_min(&self) -> f64 {
        self.d_min
    }

    pub fn d_max(&self) -> f64 {
        self.d_max
    }

    /// Midpoint of the window, the root-finder's seed.
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.d_min + self.d_max)
    }

    pub fn width(&self) -> f64 {
        self.d_max - self.d_min
    }

    pub fn contains(&self, d: f64) -> bool {
        d >= self.d_min && d <= self.d_max
    }
}

/// Untruncated CDF at both screen apertures.
///
/// Derived from one (law, bounds) pair; a new pair needs a new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationConstants {
    pub f_at_d_min: f64,
    pub f_at_d_max: f64,
}

impl NormalizationConstants {
    /// Probability mass that survives screening, `F(d_max) − F(d_min)`.
    pub fn mass(&self) -> f64 {
        self.f_at_d_max - self.f_at_d_min
    }
}

/// Integrates the untruncated density from 0 to each aperture.
///
/// # Errors
/// - [`Error::Integration`] if either integral fails to converge.
/// - [`Error::Validation`] if the window holds (numerically) no mass.
///
/// # Examples
/// ```
/// use u_sieve::distributions::LogNormal;
/// use u_sieve::truncated::{normalize, TruncationBounds};
/// let law = LogNormal::new(2.0_f64.ln(), 1.0).unwrap();
/// let bounds = TruncationBounds::new(0.375, 1.0).unwrap();
/// let norm = normalize(&law, &bounds).unwrap();
/// assert!(0.0 <= norm.f_at_d_min && norm.f_at_d_min < norm.f_at_d_max && norm.f_at_d_max <= 1.0);
/// ```
pub fn normalize(law: &LogNormal, bounds: &TruncationBounds) -> Result<NormalizationConstants> {
    let points = breakpoints(law);
    let options = QuadratureOptions {
        abs_tol: 1e-13,
        ..QuadratureOptions::default()
    };
    let pdf = |d: f64| law.pdf(d);
    let below_min = integrate_points(pdf, 0.0, bounds.d_min, &points, &options)?;
    let below_max = integrate_points(pdf, 0.0, bounds.d_max, &points, &options)?;

    let norm = NormalizationConstants {
        f_at_d_min: below_min.value.clamp(0.0, 1.0),
        f_at_d_max: below_max.value.clamp(0.0, 1.0),
    };
    debug!(
        "normalize μ={} σ={} [{}, {}]: F(d_min)={:.8} F(d_max)={:.8} (err {:.1e}, {:.1e})",
        law.mu(),
        law.sigma(),
        bounds.d_min,
        bounds.d_max,
        norm.f_at_d_min,
        norm.f_at_d_max,
        below_min.error,
        below_max.error,
    );

    if norm.mass() <= MIN_WINDOW_MASS {
        return Err(Error::validation(
            "truncation bounds",
            format!(
                "window [{}, {}] keeps only {:e} of the distribution",
                bounds.d_min,
                bounds.d_max,
                norm.mass()
            ),
        ));
    }
    Ok(norm)
}

/// Diameters exp(μ + kσ), k = −8..=8, used to pre-split integration
/// intervals so that the bulk of a narrow law is never stepped over.
pub fn breakpoints(law: &LogNormal) -> Vec<f64> {
    (-BREAKPOINT_SIGMAS..=BREAKPOINT_SIGMAS)
        .map(|k| (law.mu() + f64::from(k) * law.sigma()).exp())
        .filter(|d| d.is_finite() && *d > 0.0)
        .collect()
}

/// A log-normal law screened to a window, with its normalization.
///
/// Immutable once built and safe to share across threads.
#[derive(Debug, Clone)]
pub struct TruncatedLogNormal {
    law: LogNormal,
    bounds: TruncationBounds,
    norm: NormalizationConstants,
    points: Vec<f64>,
    options: QuadratureOptions,
}

impl TruncatedLogNormal {
    /// Screens `law` to `bounds`, computing the normalization constants.
    ///
    /// # Examples
    /// ```
    /// use u_sieve::distributions::LogNormal;
    /// use u_sieve::truncated::{TruncatedLogNormal, TruncationBounds};
    /// let law = LogNormal::new(2.0_f64.ln(), 1.0).unwrap();
    /// let screened = TruncatedLogNormal::new(law, TruncationBounds::new(0.375, 1.0).unwrap()).unwrap();
    /// assert_eq!(screened.cdf(0.375).unwrap(), 0.0);
    /// assert!((screened.cdf(1.0).unwrap() - 1.0).abs() < 1e-6);
    /// ```
    pub fn new(law: LogNormal, bounds: TruncationBounds) -> Result<Self> {
        let norm = normalize(&law, &bounds)?;
        Ok(Self::with_normalization(law, bounds, norm))
    }

    /// Assembles from constants computed elsewhere (for example by a
    /// caller that already ran [`normalize`] for the same pair).
    pub fn with_normalization(
        law: LogNormal,
        bounds: TruncationBounds,
        norm: NormalizationConstants,
    ) -> Self {
        let points = breakpoints(&law)
            .into_iter()
            .filter(|&d| bounds.contains(d))
            .collect();
        Self {
            law,
            bounds,
            norm,
            points,
            options: QuadratureOptions {
                abs_tol: 1e-12,
                ..QuadratureOptions::default()
            },
        }
    }

    /// Replaces the quadrature options used by every CDF and moment
    /// evaluation.
    pub fn with_quadrature(mut self, options: QuadratureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn law(&self) -> &LogNormal {
        &self.law
    }

    pub fn bounds(&self) -> &TruncationBounds {
        &self.bounds
    }

    pub fn normalization(&self) -> &NormalizationConstants {
        &self.norm
    }

    /// Truncated density; 0 outside the window.
    pub fn pdf(&self, d: f64) -> f64 {
        if !self.bounds.contains(d) {
            return 0.0;
        }
        self.law.pdf(d) / self.norm.mass()
    }

    /// Truncated CDF on the window: ∫ f_trunc from `d_min` to `d`.
    ///
    /// Returns 0 for `d` outside `[d_min, d_max]` (see module docs).
    ///
    /// # Errors
    /// [`Error::Integration`] if the quadrature fails.
    pub fn cdf(&self, d: f64) -> Result<f64> {
        if !self.bounds.contains(d) {
            return Ok(0.0);
        }
        self.probability(self.bounds.d_min, d)
    }

    /// Probability that a screened diameter falls in `[a, b]`, for
    /// `d_min ≤ a ≤ b ≤ d_max`.
    ///
    /// # Errors
    /// [`Error::Integration`] if the quadrature fails or `a > b`.
    pub fn probability(&self, a: f64, b: f64) -> Result<f64> {
        let q = integrate_points(|x| self.pdf(x), a, b, &self.points, &self.options)?;
        Ok(q.value)
    }

    /// Cumulative probability everywhere: 0 below the window, 1 above it.
    pub fn cdf_clamped(&self, d: f64) -> Result<f64> {
        if d < self.bounds.d_min {
            Ok(0.0)
        } else if d > self.bounds.d_max {
            Ok(1.0)
        } else {
            self.cdf(d)
        }
    }

    /// Expected diameter of the screened population, ∫ D·f_trunc(D) dD.
    pub fn mean(&self) -> Result<f64> {
        self.moment(1)
    }

    /// Variance of the screened population, E[D²] − E[D]².
    pub fn variance(&self) -> Result<f64> {
        let m1 = self.moment(1)?;
        let m2 = self.moment(2)?;
        Ok((m2 - m1 * m1).max(0.0))
    }

    fn moment(&self, order: i32) -> Result<f64> {
        let q = integrate_points(
            |x| x.powi(order) * self.pdf(x),
            self.bounds.d_min,
            self.bounds.d_max,
            &self.points,
            &self.options,
        )?;
        Ok(q.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::standard_normal_cdf;

    fn default_screen() -> TruncatedLogNormal {
        let law = LogNormal::new(2.0_f64.ln(), 1.0).unwrap();
        TruncatedLogNormal::new(law, TruncationBounds::new(0.375, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn test_bounds_validation() {
        assert!(TruncationBounds::new(0.0, 1.0).is_ok());
        for (lo, hi) in [(1.0, 1.0), (1.0, 0.5), (-0.1, 1.0), (0.1, f64::INFINITY)] {
            assert!(
                matches!(TruncationBounds::new(lo, hi), Err(Error::Validation { .. })),
                "[{lo}, {hi}] should be rejected"
            );
        }
    }

    #[test]
    fn test_degenerate_bounds_name_the_constraint() {
        let err = TruncationBounds::new(0.5, 0.5).unwrap_err();
        match err {
            Error::Validation { field, .. } => assert_eq!(field, "truncation bounds"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bounds_accessors() {
        let b = TruncationBounds::new(0.375, 1.0).unwrap();
        assert_eq!(b.midpoint(), 0.6875);
        assert_eq!(b.width(), 0.625);
        assert!(b.contains(0.375) && b.contains(1.0));
        assert!(!b.contains(0.374) && !b.contains(1.01));
    }

    #[test]
    fn test_normalization_matches_closed_form() {
        let screen = default_screen();
        let law = screen.law();
        let norm = screen.normalization();
        assert!((norm.f_at_d_min - law.cdf(0.375)).abs() < 1e-6);
        assert!((norm.f_at_d_max - law.cdf(1.0)).abs() < 1e-6);
        // Φ(−ln 2) − Φ(ln 0.375 − ln 2) ≈ 0.2440 − 0.0471
        assert!((norm.mass() - 0.1966).abs() < 1e-3, "mass {}", norm.mass());
    }

    #[test]
    fn test_cdf_endpoints() {
        let screen = default_screen();
        assert_eq!(screen.cdf(0.375).unwrap(), 0.0);
        let top = screen.cdf(1.0).unwrap();
        assert!((top - 1.0).abs() < 1e-8, "cdf(d_max) = {top}");
    }

    #[test]
    fn test_cdf_outside_window_is_zero() {
        let screen = default_screen();
        assert_eq!(screen.cdf(0.1).unwrap(), 0.0);
        assert_eq!(screen.cdf(1.5).unwrap(), 0.0);
        assert_eq!(screen.cdf(-1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_cdf_clamped() {
        let screen = default_screen();
        assert_eq!(screen.cdf_clamped(0.1).unwrap(), 0.0);
        assert_eq!(screen.cdf_clamped(1.5).unwrap(), 1.0);
        let mid = screen.cdf_clamped(0.7).unwrap();
        assert_eq!(mid, screen.cdf(0.7).unwrap());
    }

    #[test]
    fn test_probability_is_additive() {
        let screen = default_screen();
        let left = screen.probability(0.375, 0.6).unwrap();
        let right = screen.probability(0.6, 1.0).unwrap();
        assert!((left + right - 1.0).abs() < 1e-8);
        assert!((left - screen.cdf(0.6).unwrap()).abs() < 1e-15);
        assert!(screen.probability(0.8, 0.7).is_err());
    }

    #[test]
    fn test_with_normalization_reuses_constants() {
        let law = LogNormal::new(2.0_f64.ln(), 1.0).unwrap();
        let bounds = TruncationBounds::new(0.375, 1.0).unwrap();
        let norm = normalize(&law, &bounds).unwrap();
        let screen = TruncatedLogNormal::with_normalization(law, bounds, norm);
        assert_eq!(screen.normalization(), &norm);
        assert_eq!(screen.cdf(0.7).unwrap(), default_screen().cdf(0.7).unwrap());
    }

    #[test]
    fn test_pdf_scaling_and_support() {
        let screen = default_screen();
        let mass = screen.normalization().mass();
        let d = 0.6;
        assert!((screen.pdf(d) - screen.law().pdf(d) / mass).abs() < 1e-14);
        assert_eq!(screen.pdf(0.3), 0.0);
        assert_eq!(screen.pdf(1.2), 0.0);
    }

    #[test]
    fn test_zero_lower_aperture() {
        let law = LogNormal::new(0.0, 0.5).unwrap();
        let screen = TruncatedLogNormal::new(law, TruncationBounds::new(0.0, 1.0).unwrap()).unwrap();
        assert_eq!(screen.normalization().f_at_d_min, 0.0);
        assert!((screen.normalization().f_at_d_max - 0.5).abs() < 1e-8);
        assert!((screen.cdf(1.0).unwrap() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_window_without_mass_rejected() {
        // 40σ above the median: the density underflows to 0 on the window.
        let law = LogNormal::new(0.0, 0.1).unwrap();
        let bounds = TruncationBounds::new(50.0, 60.0).unwrap();
        assert!(matches!(
            TruncatedLogNormal::new(law, bounds),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_narrow_law_on_wide_window() {
        // All the mass sits in a sliver around D = 1 on a window of width 50.
        let law = LogNormal::new(0.0, 0.01).unwrap();
        let screen = TruncatedLogNormal::new(law, TruncationBounds::new(0.0, 50.0).unwrap()).unwrap();
        assert!((screen.normalization().mass() - 1.0).abs() < 1e-8);
        assert!((screen.cdf(1.0).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mean_matches_closed_form() {
        let screen = default_screen();
        let (mu, s) = (2.0_f64.ln(), 1.0);
        let z = |d: f64| (d.ln() - mu) / s;
        let (a, b) = (0.375_f64, 1.0_f64);
        let expected = (mu + s * s / 2.0).exp()
            * (standard_normal_cdf(z(b) - s) - standard_normal_cdf(z(a) - s))
            / (standard_normal_cdf(z(b)) - standard_normal_cdf(z(a)));
        let mean = screen.mean().unwrap();
        assert!((mean - expected).abs() < 1e-5, "mean {mean}, expected {expected}");
        assert!(a < mean && mean < b);
    }

    #[test]
    fn test_variance_bounded_by_window() {
        let screen = default_screen();
        let var = screen.variance().unwrap();
        // Any law on an interval of width w has variance ≤ w²/4.
        assert!(var > 0.0 && var <= 0.625 * 0.625 / 4.0, "variance {var}");
    }

    #[test]
    fn test_breakpoints_span_the_bulk() {
        let law = LogNormal::new(1.0, 0.5).unwrap();
        let points = breakpoints(&law);
        assert_eq!(points.len(), 17);
        assert!((points[8] - 1.0_f64.exp()).abs() < 1e-12);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
    }
}
