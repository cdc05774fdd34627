//! Adaptive numerical quadrature over finite intervals.
//!
//! # Algorithm
//!
//! Globally adaptive Gauss–Kronrod integration (QUADPACK `QAG`/`QAGP`
//! scheme). Each subinterval is integrated with the 15-point Kronrod rule;
//! the embedded 7-point Gauss rule gives the local error estimate
//! `|K₁₅ − G₇|`. The subinterval with the largest error estimate is
//! bisected until the summed error satisfies
//! `error ≤ max(abs_tol, rel_tol · |value|)`.
//!
//! Reference: Piessens, de Doncker-Kapenga, Überhuber & Kahaner (1983),
//! *QUADPACK: A Subroutine Package for Automatic Integration*, Springer.
//!
//! # Breakpoints
//!
//! A narrow peak on a wide interval can fall entirely between the initial
//! Kronrod nodes, in which case every node samples ≈ 0 and the estimate
//! "converges" to 0. [`integrate_points`] takes interior breakpoints that
//! seed the initial partition so such features are always bracketed.

use log::trace;
use thiserror::Error;

use crate::stats::kahan_sum;

/// Kronrod abscissae on [−1, 1] (non-negative half, descending).
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod weights matching [`XGK`].
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Gauss weights for the odd-indexed Kronrod abscissae `XGK[1], XGK[3], XGK[5], XGK[7]`.
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Failure modes of [`integrate`] and friends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadratureError {
    /// Limits are not finite or `lower > upper`.
    #[error("invalid integration limits [{lower}, {upper}]")]
    InvalidLimits { lower: f64, upper: f64 },

    /// The integrand returned NaN or ±∞.
    #[error("integrand is not finite at x = {x}")]
    NonFinite { x: f64 },

    /// Tolerance not met within the subdivision budget.
    #[error("tolerance not reached within {limit} subintervals")]
    MaxSubdivisions { limit: usize },

    /// A subinterval became too small to bisect in floating point.
    #[error("subinterval at x = {x} cannot be bisected further")]
    Roundoff { x: f64 },
}

/// Stopping rule for the adaptive scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureOptions {
    /// Absolute error tolerance.
    pub abs_tol: f64,
    /// Relative error tolerance (relative to |value|).
    pub rel_tol: f64,
    /// Maximum number of subintervals before giving up.
    pub max_subdivisions: usize,
}

impl Default for QuadratureOptions {
    fn default() -> Self {
        Self {
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            max_subdivisions: 200,
        }
    }
}

/// Outcome of a converged integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    /// Integral estimate.
    pub value: f64,
    /// Estimated absolute error. Informational only.
    pub error: f64,
    /// Number of integrand evaluations.
    pub evaluations: usize,
    /// Number of subintervals in the final partition.
    pub intervals: usize,
}

impl Quadrature {
    fn zero() -> Self {
        Self {
            value: 0.0,
            error: 0.0,
            evaluations: 0,
            intervals: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Integrates `f` over `[lower, upper]` with default options.
///
/// `lower == upper` yields 0; `lower > upper` is an error.
///
/// # Examples
/// ```
/// use u_sieve::quadrature::integrate;
/// let q = integrate(|x| x * x, 0.0, 3.0).unwrap();
/// assert!((q.value - 9.0).abs() < 1e-12);
/// ```
pub fn integrate<F>(f: F, lower: f64, upper: f64) -> Result<Quadrature, QuadratureError>
where
    F: Fn(f64) -> f64,
{
    integrate_points(f, lower, upper, &[], &QuadratureOptions::default())
}

/// Integrates `f` over `[lower, upper]` with explicit options.
pub fn integrate_with<F>(
    f: F,
    lower: f64,
    upper: f64,
    options: &QuadratureOptions,
) -> Result<Quadrature, QuadratureError>
where
    F: Fn(f64) -> f64,
{
    integrate_points(f, lower, upper, &[], options)
}

/// Integrates `f` over `[lower, upper]`, starting from a partition cut at
/// every breakpoint strictly inside the interval.
///
/// Breakpoints outside `(lower, upper)` are ignored, so callers can pass
/// one fixed set of points for many different limits.
///
/// # Complexity
/// 15 evaluations per initial segment plus 30 per bisection.
pub fn integrate_points<F>(
    f: F,
    lower: f64,
    upper: f64,
    points: &[f64],
    options: &QuadratureOptions,
) -> Result<Quadrature, QuadratureError>
where
    F: Fn(f64) -> f64,
{
    if !lower.is_finite() || !upper.is_finite() || lower > upper {
        return Err(QuadratureError::InvalidLimits { lower, upper });
    }
    if lower == upper {
        return Ok(Quadrature::zero());
    }

    let mut cuts: Vec<f64> = Vec::with_capacity(points.len() + 2);
    cuts.push(lower);
    cuts.extend(points.iter().copied().filter(|&p| p > lower && p < upper));
    cuts.push(upper);
    cuts.sort_unstable_by(f64::total_cmp);
    cuts.dedup();

    let mut segments = Vec::with_capacity(options.max_subdivisions.max(cuts.len()));
    for w in cuts.windows(2) {
        segments.push(kronrod_segment(&f, w[0], w[1])?);
    }
    let mut evaluations = 15 * segments.len();

    loop {
        let values: Vec<f64> = segments.iter().map(|s| s.value).collect();
        let value = kahan_sum(&values);
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = options.abs_tol.max(options.rel_tol * value.abs());

        if error <= tolerance {
            trace!(
                "integrate [{lower}, {upper}] = {value} (err {error:.3e}, {evaluations} evals, {} intervals)",
                segments.len()
            );
            return Ok(Quadrature {
                value,
                error,
                evaluations,
                intervals: segments.len(),
            });
        }
        if segments.len() >= options.max_subdivisions {
            return Err(QuadratureError::MaxSubdivisions {
                limit: options.max_subdivisions,
            });
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, s), (_, t)| s.error.total_cmp(&t.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if mid <= seg.a || mid >= seg.b {
            return Err(QuadratureError::Roundoff { x: seg.a });
        }
        segments.push(kronrod_segment(&f, seg.a, mid)?);
        segments.push(kronrod_segment(&f, mid, seg.b)?);
        evaluations += 30;
    }
}

/// Applies the 15-point Kronrod rule on `[a, b]` with the embedded 7-point
/// Gauss rule as error estimate.
fn kronrod_segment<F>(f: &F, a: f64, b: f64) -> Result<Segment, QuadratureError>
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let eval = |x: f64| -> Result<f64, QuadratureError> {
        let y = f(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(QuadratureError::NonFinite { x })
        }
    };

    let fc = eval(center)?;
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;
    for (j, (&x, &w)) in XGK.iter().zip(WGK.iter()).take(7).enumerate() {
        let dx = half * x;
        let pair = eval(center - dx)? + eval(center + dx)?;
        kronrod += w * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Ok(Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_exact() {
        // G7 is exact to degree 13, so the first pass already converges.
        let q = integrate(|x| 3.0 * x * x - 2.0 * x + 1.0, -1.0, 2.0).unwrap();
        assert!((q.value - 9.0).abs() < 1e-13, "got {}", q.value);
        assert_eq!(q.evaluations, 15);
        assert_eq!(q.intervals, 1);
    }

    #[test]
    fn test_transcendental() {
        let q = integrate(f64::sin, 0.0, std::f64::consts::PI).unwrap();
        assert!((q.value - 2.0).abs() < 1e-12);
        let q = integrate(f64::exp, 0.0, 1.0).unwrap();
        assert!((q.value - (1.0_f64.exp() - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_adaptive_refinement_on_sharp_peak() {
        // Lorentzian with width 1e-3: ∫ = atan(1/w) + atan(1/w) ≈ π
        let w = 1e-3;
        let q = integrate(|x| w / (x * x + w * w), -1.0, 1.0).unwrap();
        let exact = 2.0 * (1.0 / w).atan();
        assert!((q.value - exact).abs() < 1e-8, "got {}, want {exact}", q.value);
        assert!(q.intervals > 1);
    }

    #[test]
    fn test_equal_limits_is_zero() {
        let q = integrate(|_| 1.0, 0.5, 0.5).unwrap();
        assert_eq!(q.value, 0.0);
        assert_eq!(q.error, 0.0);
        assert_eq!(q.evaluations, 0);
    }

    #[test]
    fn test_reversed_limits_rejected() {
        assert_eq!(
            integrate(|_| 1.0, 1.0, 0.0),
            Err(QuadratureError::InvalidLimits {
                lower: 1.0,
                upper: 0.0
            })
        );
        assert!(integrate(|_| 1.0, 0.0, f64::INFINITY).is_err());
        assert!(integrate(|_| 1.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_non_finite_integrand() {
        let err = integrate(|x: f64| (x - 0.25).sqrt(), 0.0, 1.0).unwrap_err();
        assert!(matches!(err, QuadratureError::NonFinite { .. }), "{err:?}");
    }

    #[test]
    fn test_max_subdivisions() {
        let opts = QuadratureOptions {
            abs_tol: 1e-14,
            rel_tol: 0.0,
            max_subdivisions: 2,
        };
        let err = integrate_with(|x| x.abs().sqrt(), -1.0, 1.0, &opts).unwrap_err();
        assert_eq!(err, QuadratureError::MaxSubdivisions { limit: 2 });
    }

    #[test]
    fn test_breakpoints_find_narrow_peak() {
        // Gaussian bump of width 1e-3 at 37.3 on [0, 100]. Without
        // breakpoints around the bump every Kronrod node sees exp(-huge) = 0.
        let peak = |x: f64| (-((x - 37.3) / 1e-3).powi(2)).exp();
        let exact = 1e-3 * std::f64::consts::PI.sqrt();

        let blind = integrate(peak, 0.0, 100.0).unwrap();
        assert!(blind.value.abs() < 1e-12);

        let opts = QuadratureOptions::default();
        let q = integrate_points(peak, 0.0, 100.0, &[37.29, 37.31], &opts).unwrap();
        assert!((q.value - exact).abs() < 1e-10, "got {}", q.value);
    }

    #[test]
    fn test_breakpoints_outside_interval_ignored() {
        let opts = QuadratureOptions::default();
        let q = integrate_points(|x| x, 0.0, 1.0, &[-5.0, 0.0, 1.0, 7.0], &opts).unwrap();
        assert!((q.value - 0.5).abs() < 1e-15);
        assert_eq!(q.intervals, 1);
    }
}
