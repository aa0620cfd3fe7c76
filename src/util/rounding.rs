//! Decimal rounding of binary floats.
//!
//! Scores and confidences are rounded the way a decimal calculator would:
//! the exact binary value is rounded to `digits` decimal places (ties to
//! even) and the result is the `f64` nearest to that decimal. Multiplying and
//! calling `f64::round` instead drifts on values such as `1.005`.

/// Round `value` to `digits` decimal places.
///
/// Non-finite inputs are returned unchanged.
#[must_use]
pub fn round_to(value: f64, digits: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.digits$}").parse().unwrap_or(value)
}
