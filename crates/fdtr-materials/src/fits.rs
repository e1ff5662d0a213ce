//! Polynomial and power-law fit evaluation for tabulated thermal data.
//!
//! Temperature-dependent catalog entries store their measured property
//! curves as low-order polynomial coefficients or three-parameter power
//! laws fitted to handbook data.

/// Evaluate a polynomial with coefficients in ascending-power order:
/// `c[0] + c[1]·x + c[2]·x² + …`
pub fn polynomial(x: f64, coeffs: &[f64]) -> f64 {
    // Horner form, highest power first.
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Evaluate the three-parameter power law `a + b·x^c`.
pub fn power_law(x: f64, a: f64, b: f64, c: f64) -> f64 {
    a + b * x.powf(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_polynomial_ascending_order() {
        // 1 + 2x + 3x² at x = 2 → 1 + 4 + 12 = 17
        assert_abs_diff_eq!(polynomial(2.0, &[1.0, 2.0, 3.0]), 17.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polynomial_empty_is_zero() {
        assert_abs_diff_eq!(polynomial(5.0, &[]), 0.0);
    }

    #[test]
    fn test_power_law() {
        // 1 + 2·x^(-1) at x = 4 → 1.5
        assert_abs_diff_eq!(power_law(4.0, 1.0, 2.0, -1.0), 1.5, epsilon = 1e-12);
    }
}
