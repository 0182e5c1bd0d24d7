use serde::Deserialize;

use super::TransportError;

/// Numeric field returned either as a JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TransportNumber {
    Number(serde_json::Number),
    String(String),
}

impl TransportNumber {
    /// Integer value; fractional amounts are truncated toward zero.
    pub(crate) fn into_i64(self, field: &'static str) -> Result<i64, TransportError> {
        let invalid = |value: String| TransportError::InvalidNumber { field, value };
        match self {
            Self::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(truncate))
                .ok_or_else(|| invalid(number.to_string())),
            Self::String(value) => {
                let trimmed = value.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(truncate))
                    .ok_or_else(|| invalid(value))
            }
        }
    }
}

/// `None` for non-finite values and anything outside the `i64` range.
fn truncate(value: f64) -> Option<i64> {
    let value = value.trunc();
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    (value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64)
        .then_some(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<i64, TransportError> {
        serde_json::from_str::<TransportNumber>(json)
            .unwrap()
            .into_i64("credit")
    }

    #[test]
    fn integers_floats_and_strings_coerce() {
        assert_eq!(parse("1500").unwrap(), 1500);
        assert_eq!(parse("1500.75").unwrap(), 1500);
        assert_eq!(parse(r#"" 320 ""#).unwrap(), 320);
        assert_eq!(parse(r#""320.9""#).unwrap(), 320);
    }

    #[test]
    fn out_of_range_values_are_rejected_not_saturated() {
        for json in ["1e30", "-1e30", r#""1e30""#, "18446744073709551615", r#""NaN""#] {
            assert!(
                matches!(parse(json), Err(TransportError::InvalidNumber { .. })),
                "accepted {json}"
            );
        }
        assert_eq!(parse("-2.5").unwrap(), -2);
    }

    #[test]
    fn non_numeric_strings_are_rejected() {
        assert!(matches!(
            parse(r#""lots""#),
            Err(TransportError::InvalidNumber {
                field: "credit",
                ..
            })
        ));
    }
}
