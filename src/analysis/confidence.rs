//! Confidence percentage of a prediction relative to the decision threshold.

use crate::util::rounding::round_to;

use super::error::{AnalysisError, RangeCheck};

/// Default decision boundary between "Neutral" and "Misinformation".
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// How far `prediction_value` sits from `threshold`, as a percentage of the
/// threshold.
///
/// The distance is divided by the threshold on both sides of the boundary,
/// rounded to two decimals, scaled by 100 and truncated. Scores far below a
/// low threshold can therefore exceed 100; the value is not clamped.
///
/// # Errors
/// [`AnalysisError::DivideByZero`] when `threshold` is zero,
/// [`AnalysisError::RangeViolation`] when `prediction_value` is outside `[0, 1]`.
pub fn calculate_confidence(prediction_value: f64, threshold: f64) -> Result<i64, AnalysisError> {
    if threshold == 0.0 {
        return Err(AnalysisError::DivideByZero);
    }
    if !(0.0..=1.0).contains(&prediction_value) {
        return Err(AnalysisError::RangeViolation {
            value: prediction_value,
            check: RangeCheck::Confidence,
        });
    }

    let distance = if prediction_value >= threshold {
        prediction_value - threshold
    } else {
        threshold - prediction_value
    };
    let ratio = round_to(distance / threshold, 2);

    #[allow(clippy::cast_possible_truncation)]
    let confidence = (ratio * 100.0).trunc() as i64;
    Ok(confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_confidence_values_at_default_threshold() {
        let cases = [
            (0.0, 100),
            (0.5, 0),
            (1.0, 100),
            (0.25, 50),
            (0.49, 2),
            (0.51, 2),
            (0.75, 50),
            (0.9, 80),
        ];
        for (value, expected) in cases {
            assert_eq!(
                calculate_confidence(value, DEFAULT_THRESHOLD).unwrap(),
                expected,
                "confidence for {value}"
            );
        }
    }

    #[test]
    fn truncates_after_scaling() {
        // (0.645 - 0.5) / 0.5 = 0.29 and 0.29 * 100 is just below 29
        assert_eq!(calculate_confidence(0.645, 0.5).unwrap(), 28);
    }

    #[test]
    fn zero_threshold_is_divide_by_zero() {
        for value in [0.0, 0.3, 1.0, 7.0] {
            let err = calculate_confidence(value, 0.0).unwrap_err();
            assert!(matches!(err, AnalysisError::DivideByZero));
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for value in [-0.001, 1.001, -5.0, f64::NAN] {
            let err = calculate_confidence(value, DEFAULT_THRESHOLD).unwrap_err();
            assert!(
                matches!(
                    err,
                    AnalysisError::RangeViolation {
                        check: RangeCheck::Confidence,
                        ..
                    }
                ),
                "{value} should be a range violation"
            );
        }
    }

    #[test]
    fn low_threshold_can_exceed_one_hundred() {
        // (1.0 - 0.2) / 0.2 = 4.0
        assert_eq!(calculate_confidence(1.0, 0.2).unwrap(), 400);
        assert_eq!(calculate_confidence(0.0, 0.2).unwrap(), 100);
    }
}
