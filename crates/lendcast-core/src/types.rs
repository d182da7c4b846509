use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 8.5x EV/EBITDA)
pub type Multiple = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// A coverage or leverage ratio that may be undefined.
///
/// DSCR and ICR have no meaning when the denominator (debt service,
/// interest expense) is zero. That state is `NotApplicable`, never a
/// numeric cap, so covenant comparisons and aggregates cannot mistake
/// "no debt" for "very strong coverage".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Ratio {
    Value(Decimal),
    NotApplicable,
}

impl Ratio {
    /// Divide, yielding `NotApplicable` on a zero denominator.
    pub fn from_div(numerator: Decimal, denominator: Decimal) -> Self {
        if denominator.is_zero() {
            Ratio::NotApplicable
        } else {
            Ratio::Value(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Ratio::Value(v) => Some(*v),
            Ratio::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Ratio::Value(_))
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ratio::Value(v) => write!(f, "{v:.2}"),
            Ratio::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Min/max/mean over the defined values of a ratio series.
/// `NotApplicable` entries are excluded; all-NA yields `NotApplicable`.
pub fn summarize_ratios(ratios: &[Ratio]) -> RatioSummary {
    let values: Vec<Decimal> = ratios.iter().filter_map(|r| r.value()).collect();
    if values.is_empty() {
        return RatioSummary {
            min: Ratio::NotApplicable,
            max: Ratio::NotApplicable,
            mean: Ratio::NotApplicable,
        };
    }
    let min = values.iter().copied().min().unwrap_or(Decimal::ZERO);
    let max = values.iter().copied().max().unwrap_or(Decimal::ZERO);
    let sum: Decimal = values.iter().copied().sum();
    RatioSummary {
        min: Ratio::Value(min),
        max: Ratio::Value(max),
        mean: Ratio::Value(sum / Decimal::from(values.len() as i64)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioSummary {
    pub min: Ratio,
    pub max: Ratio,
    pub mean: Ratio,
}

/// Divide with a documented fallback instead of letting a degenerate
/// denominator propagate.
pub fn safe_div(numerator: Decimal, denominator: Decimal, fallback: Decimal) -> Decimal {
    if denominator.is_zero() {
        fallback
    } else {
        numerator / denominator
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ratio_from_div() {
        assert_eq!(Ratio::from_div(dec!(10), dec!(4)), Ratio::Value(dec!(2.5)));
        assert_eq!(Ratio::from_div(dec!(10), Decimal::ZERO), Ratio::NotApplicable);
    }

    #[test]
    fn test_ratio_summary_skips_na() {
        let ratios = vec![
            Ratio::Value(dec!(1.5)),
            Ratio::NotApplicable,
            Ratio::Value(dec!(2.5)),
        ];
        let s = summarize_ratios(&ratios);
        assert_eq!(s.min, Ratio::Value(dec!(1.5)));
        assert_eq!(s.max, Ratio::Value(dec!(2.5)));
        assert_eq!(s.mean, Ratio::Value(dec!(2.0)));
    }

    #[test]
    fn test_ratio_summary_all_na() {
        let s = summarize_ratios(&[Ratio::NotApplicable, Ratio::NotApplicable]);
        assert_eq!(s.min, Ratio::NotApplicable);
        assert_eq!(s.mean, Ratio::NotApplicable);
    }

    #[test]
    fn test_safe_div_fallback() {
        assert_eq!(safe_div(dec!(5), Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(safe_div(dec!(5), dec!(2), Decimal::ZERO), dec!(2.5));
    }
}
