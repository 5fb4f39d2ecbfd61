//! Glycemic index estimation from a food name
//!
//! Cascade, first match wins:
//! 1. exact lowercase name
//! 2. whitespace tokens, left to right
//! 3. keyword substring, longest keyword first
//! 4. fallback rules, top to bottom
//!
//! No match means unknown; callers never substitute 0.

use std::fmt;

use serde::Serialize;

use super::table::GlycemicTable;

/// Cascade stage that produced an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Exact,
    Token,
    Substring,
    Fallback,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStage::Exact => "exact",
            MatchStage::Token => "token",
            MatchStage::Substring => "substring",
            MatchStage::Fallback => "fallback",
        })
    }
}

/// An estimate and where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GiMatch {
    pub index: u8,
    pub stage: MatchStage,
    /// Reference keyword, or the fallback rule label
    pub keyword: String,
}

/// Estimate a glycemic index, reporting the matching stage
pub fn estimate_match(table: &GlycemicTable, name: &str) -> Option<GiMatch> {
    let lower = name.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let found = |stage: MatchStage, keyword: &str, index: u8| GiMatch {
        index,
        stage,
        keyword: keyword.to_string(),
    };

    if let Some(entry) = table.get(&lower) {
        return Some(found(MatchStage::Exact, &entry.keyword, entry.index));
    }

    // Edge punctuation is trimmed so "(taco)" and "taco," count as whole words
    for token in lower.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if let Some(entry) = table.get(token) {
            return Some(found(MatchStage::Token, &entry.keyword, entry.index));
        }
    }

    if let Some(entry) = table.scan_order().find(|e| lower.contains(e.keyword.as_str())) {
        return Some(found(MatchStage::Substring, &entry.keyword, entry.index));
    }

    table
        .rules()
        .iter()
        .find(|rule| rule.matches(&lower))
        .map(|rule| found(MatchStage::Fallback, rule.label, rule.index))
}

/// Estimate a glycemic index for a food name
pub fn estimate_gi(table: &GlycemicTable, name: &str) -> Option<u8> {
    estimate_match(table, name).map(|m| m.index)
}

impl GlycemicTable {
    /// Shorthand for `estimate_gi(self, name)`
    pub fn estimate(&self, name: &str) -> Option<u8> {
        estimate_gi(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GlycemicTable {
        GlycemicTable::builtin()
    }

    #[test]
    fn test_exact_match() {
        let m = estimate_match(&table(), "Taco").unwrap();
        assert_eq!(m.index, 52);
        assert_eq!(m.stage, MatchStage::Exact);
    }

    #[test]
    fn test_brown_rice_bowl() {
        let m = estimate_match(&table(), "Brown Rice Bowl").unwrap();
        assert_eq!(m.index, 68);
        assert_eq!(m.stage, MatchStage::Substring);
        assert_eq!(m.keyword, "brown rice");
    }

    #[test]
    fn test_frosted_flakes_is_a_cereal() {
        let m = estimate_match(&table(), "Frosted Flakes").unwrap();
        assert_eq!(m.index, 74);
        assert_eq!(m.stage, MatchStage::Token);
    }

    #[test]
    fn test_token_outranks_substring() {
        // "sweet tea": the word "tea" wins before any longer substring scan
        let m = estimate_match(&table(), "Large Sweet Tea").unwrap();
        assert_eq!(m.stage, MatchStage::Token);
        assert_eq!(m.keyword, "tea");
        assert_eq!(m.index, 0);
    }

    #[test]
    fn test_token_punctuation_trimmed() {
        let m = estimate_match(&table(), "Flour Tortilla (taco)").unwrap();
        assert_eq!(m.stage, MatchStage::Token);
        assert_eq!(m.index, 52);

        let m = estimate_match(&table(), "Tortilla, Taco").unwrap();
        assert_eq!(m.stage, MatchStage::Token);
        assert_eq!(m.keyword, "taco");
    }

    #[test]
    fn test_substring_prefers_longest_keyword() {
        // Both "sweet potato" (54) and "potato" (85) are substrings
        let m = estimate_match(&table(), "Jumbo-Sweet Potato-Wedges").unwrap();
        assert_eq!(m.stage, MatchStage::Substring);
        assert_eq!(m.keyword, "sweet potato");
        assert_eq!(m.index, 54);

        let m = estimate_match(&table(), "Sprouted-Ezekiel Bread-Loaf").unwrap();
        assert_eq!(m.keyword, "ezekiel bread");
        assert_eq!(m.index, 36);
    }

    #[test]
    fn test_fallback_rules() {
        let t = table();
        assert_eq!(estimate_gi(&t, "Big Mac Burger"), Some(66));
        assert_eq!(estimate_gi(&t, "Turkey Wrap"), Some(57));
        assert_eq!(estimate_gi(&t, "Club Sandwich"), Some(70));
        assert_eq!(estimate_gi(&t, "Whole Grain Turkey Sandwich"), Some(54));
        assert_eq!(estimate_gi(&t, "Lentil Soup"), Some(30));
        assert_eq!(estimate_gi(&t, "Banh Mi"), Some(75));
    }

    #[test]
    fn test_unknown_is_absent() {
        let t = table();
        assert_eq!(estimate_gi(&t, "Xyzzy"), None);
        assert_eq!(estimate_gi(&t, ""), None);
        assert_eq!(estimate_gi(&t, "   "), None);
    }

    #[test]
    fn test_estimates_are_deterministic() {
        let t = table();
        let names = ["Chicken Burrito Bowl", "Iced Coffee", "Chips (regular)", "Supergreens Salad Mix"];
        for name in names {
            let first = estimate_match(&t, name);
            for _ in 0..10 {
                assert_eq!(estimate_match(&t, name), first);
            }
            // A rebuilt table scans in the same order
            assert_eq!(estimate_match(&table(), name), first);
        }
    }
}
