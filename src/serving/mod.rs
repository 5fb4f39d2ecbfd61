//! Serving size parsing
//!
//! Sources describe servings as free text ("4 oz", "2 fl oz", "1 donut",
//! "1 cup (240 ml)", "30g"). This module turns that text into a gram weight
//! when the text allows it. Volumes are taken at 1 g/ml.

pub mod units;

pub use units::{categorize_unit, grams_per_unit, ml_per_unit, UnitCategory};

/// A parsed serving description
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedServing {
    /// Leading amount, e.g. 4.0 from "4 oz"; 1.0 when the text has no number
    pub quantity: f64,
    /// Unit text after the amount, lowercased ("oz", "fl oz", "donut")
    pub unit: String,
    /// Total grams from a "(30 g)" style annotation
    pub gram_weight: Option<f64>,
    /// Total milliliters from a "(240 ml)" style annotation
    pub ml_amount: Option<f64>,
    pub category: UnitCategory,
}

/// Parse a serving description
///
/// Returns `None` for blank text.
pub fn parse_serving(text: &str) -> Option<ParsedServing> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (main, annotation) = match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            (trimmed[..open].trim(), Some(&trimmed[open + 1..close]))
        }
        _ => (trimmed, None),
    };

    let (quantity, unit) = split_amount(main).unwrap_or((1.0, main.to_lowercase()));

    let mut gram_weight = None;
    let mut ml_amount = None;
    if let Some((amount, annotation_unit)) = annotation.and_then(split_amount) {
        if let Some(factor) = grams_per_unit(&annotation_unit) {
            gram_weight = Some(amount * factor);
        } else if let Some(factor) = ml_per_unit(&annotation_unit) {
            ml_amount = Some(amount * factor);
        }
    }

    let category = categorize_unit(&unit);
    Some(ParsedServing {
        quantity,
        unit,
        gram_weight,
        ml_amount,
        category,
    })
}

/// Gram weight of a serving description, when it can be known
pub fn serving_grams(text: &str) -> Option<f64> {
    let parsed = parse_serving(text)?;

    if let Some(grams) = parsed.gram_weight {
        return Some(grams);
    }
    if let Some(ml) = parsed.ml_amount {
        return Some(ml);
    }

    grams_per_unit(&parsed.unit)
        .or_else(|| ml_per_unit(&parsed.unit))
        .map(|factor| parsed.quantity * factor)
        .filter(|grams| *grams > 0.0)
}

/// Split "4 oz", "30g", "1/2 cup" into an amount and a lowercased unit
fn split_amount(text: &str) -> Option<(f64, String)> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '/'))
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    if end == 0 {
        return None;
    }

    let amount = parse_amount(&text[..end])?;
    Some((amount, text[end..].trim().to_lowercase()))
}

fn parse_amount(number: &str) -> Option<f64> {
    let number = number.replace(',', ".");
    match number.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => number.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight_serving() {
        let parsed = parse_serving("4 oz").unwrap();
        assert_eq!(parsed.quantity, 4.0);
        assert_eq!(parsed.unit, "oz");
        assert_eq!(parsed.category, UnitCategory::Weight);
    }

    #[test]
    fn test_parse_annotation() {
        let parsed = parse_serving("1 cup (240 ml)").unwrap();
        assert_eq!(parsed.unit, "cup");
        assert_eq!(parsed.ml_amount, Some(240.0));

        let parsed = parse_serving("2 tbsp (32g)").unwrap();
        assert_eq!(parsed.gram_weight, Some(32.0));
    }

    #[test]
    fn test_serving_grams() {
        assert!((serving_grams("4 oz").unwrap() - 113.398).abs() < 0.001);
        assert_eq!(serving_grams("30g"), Some(30.0));
        assert_eq!(serving_grams("1 cup (240 ml)"), Some(240.0));
        assert!((serving_grams("2 fl oz").unwrap() - 59.147).abs() < 0.001);
        assert_eq!(serving_grams("1/2 cup"), Some(ML_HALF_CUP));
    }

    const ML_HALF_CUP: f64 = units::ML_PER_CUP / 2.0;

    #[test]
    fn test_count_servings_have_no_weight() {
        assert_eq!(serving_grams("1 ea"), None);
        assert_eq!(serving_grams("1 donut"), None);
        assert_eq!(serving_grams("1 sandwich"), None);
        assert_eq!(serving_grams(""), None);
    }

    #[test]
    fn test_parse_without_amount() {
        let parsed = parse_serving("slice").unwrap();
        assert_eq!(parsed.quantity, 1.0);
        assert_eq!(parsed.category, UnitCategory::Count);
    }
}
