use regex::Regex;

use crate::error::{CleanupError, Result};

/// Accepts a fraction ("1/32") or a decimal ("0.03").
const FRACTION_PATTERN: &str = r"^\s*(\d+)\s*/\s*(\d+)\s*$";
const DECIMAL_PATTERN: &str = r"^\s*(\d+(\.\d*)?|\.\d+)\s*$";

/// Parses the acceptance threshold. Must lie in [0, 1].
pub fn parse_threshold(input: &str) -> Result<f32> {
    let invalid = |reason: &str| CleanupError::InvalidThreshold {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let fraction = Regex::new(FRACTION_PATTERN).map_err(|e| invalid(&e.to_string()))?;
    let decimal = Regex::new(DECIMAL_PATTERN).map_err(|e| invalid(&e.to_string()))?;

    let value = if let Some(caps) = fraction.captures(input) {
        let num: f64 = caps[1]
            .parse()
            .map_err(|_| invalid("numerator is not a number"))?;
        let den: f64 = caps[2]
            .parse()
            .map_err(|_| invalid("denominator is not a number"))?;
        if den == 0.0 {
            return Err(invalid("denominator is zero"));
        }
        num / den
    } else if decimal.is_match(input) {
        input
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("not a decimal number"))?
    } else {
        return Err(invalid("expected a fraction like 1/32 or a decimal like 0.03"));
    };

    if !(0.0..=1.0).contains(&value) {
        return Err(invalid("must be between 0 and 1"));
    }

    Ok(value as f32)
}
