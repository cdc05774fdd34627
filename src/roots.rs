//! Scalar root-finding.
//!
//! Two solvers with different trade-offs:
//!
//! - [`newton`]: quadratic convergence from a single seed when the
//!   derivative is available, but no global guarantee. It refuses to step
//!   outside a caller-supplied domain instead of evaluating there.
//! - [`brent`]: Brent's method (inverse quadratic interpolation safeguarded
//!   by bisection). Needs a sign-changing bracket; then it always converges.
//!
//! Reference: Brent (1973), *Algorithms for Minimization without
//! Derivatives*, ch. 4; Press et al. (2007), *Numerical Recipes*, §9.3.
//!
//! Objectives are fallible: an objective error aborts the solve and is
//! returned as [`RootError::Objective`], distinct from solver failures.

use thiserror::Error;

/// Stopping rule shared by both solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOptions {
    /// Step tolerance, relative to `|x|`. Convergence does not depend on
    /// the unit the root is measured in.
    pub x_tol: f64,
    /// Accept `x` as soon as `|f(x)| ≤ f_tol`.
    pub f_tol: f64,
    /// Iteration cap.
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            x_tol: 1e-12,
            f_tol: 1e-12,
            max_iterations: 100,
        }
    }
}

/// A converged root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Objective value at the last evaluated iterate.
    pub residual: f64,
    pub iterations: usize,
}

/// Root-finding failures. `E` is the objective's own error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RootError<E> {
    #[error("objective failed: {0}")]
    Objective(E),

    #[error("no convergence after {iterations} iterations (last x = {x})")]
    NoConvergence { iterations: usize, x: f64 },

    #[error("iterate {x} left the domain [{lower}, {upper}]")]
    OutOfDomain { x: f64, lower: f64, upper: f64 },

    #[error("zero derivative at x = {x}")]
    ZeroDerivative { x: f64 },

    #[error("objective not finite at x = {x}")]
    NonFinite { x: f64 },

    #[error("root not bracketed: f(a) = {fa}, f(b) = {fb}")]
    NotBracketed { fa: f64, fb: f64 },
}

/// Newton's method from `x0`, confined to `domain = (lower, upper)`.
///
/// `f` returns the pair `(f(x), f'(x))`. The solve fails with
/// [`RootError::OutOfDomain`] rather than evaluating outside the domain.
///
/// # Examples
/// ```
/// use std::convert::Infallible;
/// use u_sieve::roots::{newton, RootOptions};
/// let root = newton(
///     |x| Ok::<_, Infallible>((x * x - 2.0, 2.0 * x)),
///     1.0,
///     (0.0, 2.0),
///     &RootOptions::default(),
/// )
/// .unwrap();
/// assert!((root.x - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
pub fn newton<F, E>(
    mut f: F,
    x0: f64,
    domain: (f64, f64),
    options: &RootOptions,
) -> Result<Root, RootError<E>>
where
    F: FnMut(f64) -> Result<(f64, f64), E>,
{
    let (lower, upper) = domain;
    let inside = |x: f64| x >= lower && x <= upper;
    if !inside(x0) {
        return Err(RootError::OutOfDomain { x: x0, lower, upper });
    }

    let mut x = x0;
    for iteration in 1..=options.max_iterations {
        let (fx, dfx) = f(x).map_err(RootError::Objective)?;
        if !fx.is_finite() || !dfx.is_finite() {
            return Err(RootError::NonFinite { x });
        }
        if fx.abs() <= options.f_tol {
            return Ok(Root {
                x,
                residual: fx,
                iterations: iteration,
            });
        }
        if dfx == 0.0 {
            return Err(RootError::ZeroDerivative { x });
        }

        let step = fx / dfx;
        let next = x - step;
        if !inside(next) {
            return Err(RootError::OutOfDomain { x: next, lower, upper });
        }
        if step.abs() <= options.x_tol * x.abs() {
            return Ok(Root {
                x: next,
                residual: fx,
                iterations: iteration,
            });
        }
        x = next;
    }

    Err(RootError::NoConvergence {
        iterations: options.max_iterations,
        x,
    })
}

/// Brent's method on the bracket `[lower, upper]`.
///
/// Requires `f(lower)` and `f(upper)` to differ in sign. An endpoint whose
/// objective is already within `f_tol` of zero is accepted as the root, so
/// brackets that only touch zero up to rounding still resolve.
///
/// # Examples
/// ```
/// use std::convert::Infallible;
/// use u_sieve::roots::{brent, RootOptions};
/// let root = brent(|x: f64| Ok::<_, Infallible>(x.cos() - x), 0.0, 1.0, &RootOptions::default())
///     .unwrap();
/// assert!((root.x - 0.739_085_133_215_160_6).abs() < 1e-10);
/// ```
pub fn brent<F, E>(
    mut f: F,
    lower: f64,
    upper: f64,
    options: &RootOptions,
) -> Result<Root, RootError<E>>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let mut a = lower;
    let mut b = upper;
    let mut fa = f(a).map_err(RootError::Objective)?;
    let mut fb = f(b).map_err(RootError::Objective)?;
    if !fa.is_finite() {
        return Err(RootError::NonFinite { x: a });
    }
    if !fb.is_finite() {
        return Err(RootError::NonFinite { x: b });
    }

    let endpoint = |x: f64, fx: f64| Root {
        x,
        residual: fx,
        iterations: 0,
    };
    if fa == 0.0 {
        return Ok(endpoint(a, fa));
    }
    if fb == 0.0 {
        return Ok(endpoint(b, fb));
    }
    if fa.signum() == fb.signum() {
        let (x, fx) = if fa.abs() <= fb.abs() { (a, fa) } else { (b, fb) };
        if fx.abs() <= options.f_tol {
            return Ok(endpoint(x, fx));
        }
        return Err(RootError::NotBracketed { fa, fb });
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=options.max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = (2.0 * f64::EPSILON + 0.5 * options.x_tol) * b.abs();
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb.abs() <= options.f_tol {
            return Ok(Root {
                x: b,
                residual: fb,
                iterations: iteration,
            });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            // Inverse quadratic interpolation, or secant when a == c.
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            let min1 = 3.0 * xm * q - (tol * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(xm) };
        fb = f(b).map_err(RootError::Objective)?;
        if !fb.is_finite() {
            return Err(RootError::NonFinite { x: b });
        }
    }

    Err(RootError::NoConvergence {
        iterations: options.max_iterations,
        x: b,
    })
}
