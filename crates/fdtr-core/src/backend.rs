//! Matrix-evaluation backends.
//!
//! The hyperbolic terms `cosh(μd)`/`sinh(μd)` in a layer matrix overflow
//! f64 for thick, low-diffusivity layers at high frequency (large
//! `Re(μd)`). Two selectable backends cover this; the choice is always the
//! caller's, never switched silently.
//!
//! - [`Backend::Standard`] — plain f64 hyperbolics. Overflow is detected
//!   downstream and surfaced as an explicit numeric error.
//! - [`Backend::Scaled`] — every layer matrix is scaled by
//!   `exp(−|Re(μd)|)`, which keeps all entries finite. A scalar multiple
//!   of a path's composite matrix cancels in every consumed ratio
//!   (`−M₁₁/M₁₀` and each factor of the top-path combination), so phases
//!   agree with the standard backend wherever both are representable.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Numeric backend used when evaluating layer matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Standard,
    Scaled,
}

impl Backend {
    /// Evaluate `(cosh(arg), sinh(arg))`, in the scaled backend both
    /// multiplied by the common factor `exp(−|Re(arg)|)`.
    pub(crate) fn hyperbolic_pair(self, arg: Complex64) -> (Complex64, Complex64) {
        match self {
            Backend::Standard => (arg.cosh(), arg.sinh()),
            Backend::Scaled => {
                let re = arg.re;
                // e_plus = exp(arg − |re|), e_minus = exp(−arg − |re|);
                // both exponents have non-positive real part.
                let (e_plus, e_minus) = if re >= 0.0 {
                    (
                        Complex64::new(0.0, arg.im).exp(),
                        Complex64::new(-2.0 * re, -arg.im).exp(),
                    )
                } else {
                    (
                        Complex64::new(2.0 * re, arg.im).exp(),
                        Complex64::new(0.0, -arg.im).exp(),
                    )
                };
                (0.5 * (e_plus + e_minus), 0.5 * (e_plus - e_minus))
            }
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Standard => write!(f, "standard"),
            Backend::Scaled => write!(f, "scaled"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Backend::Standard),
            "scaled" => Ok(Backend::Scaled),
            other => Err(format!(
                "unknown backend '{other}' (expected 'standard' or 'scaled')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scaled_matches_standard_up_to_common_factor() {
        let arg = Complex64::new(2.3, -1.7);
        let (ch, sh) = Backend::Standard.hyperbolic_pair(arg);
        let (chs, shs) = Backend::Scaled.hyperbolic_pair(arg);
        let scale = (-arg.re.abs()).exp();
        assert_relative_eq!(chs.re, (ch * scale).re, epsilon = 1e-12);
        assert_relative_eq!(chs.im, (ch * scale).im, epsilon = 1e-12);
        assert_relative_eq!(shs.re, (sh * scale).re, epsilon = 1e-12);
        assert_relative_eq!(shs.im, (sh * scale).im, epsilon = 1e-12);
    }

    #[test]
    fn test_scaled_is_finite_where_standard_overflows() {
        let arg = Complex64::new(800.0, 3.0);
        let (ch, _) = Backend::Standard.hyperbolic_pair(arg);
        assert!(!ch.re.is_finite());

        let (chs, shs) = Backend::Scaled.hyperbolic_pair(arg);
        assert!(chs.re.is_finite() && chs.im.is_finite());
        assert!(shs.re.is_finite() && shs.im.is_finite());
        // For large Re(arg), scaled cosh and sinh both approach 1/2.
        assert_relative_eq!(chs.re, 0.5 * arg.im.cos(), epsilon = 1e-12);
        assert_relative_eq!(shs.re, 0.5 * arg.im.cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_negative_real_part() {
        let arg = Complex64::new(-3.1, 0.4);
        let (ch, sh) = Backend::Standard.hyperbolic_pair(arg);
        let (chs, shs) = Backend::Scaled.hyperbolic_pair(arg);
        let scale = (-arg.re.abs()).exp();
        assert_relative_eq!(chs.re, (ch * scale).re, epsilon = 1e-12);
        assert_relative_eq!(shs.im, (sh * scale).im, epsilon = 1e-12);
    }
}
