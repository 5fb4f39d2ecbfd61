//! Glycemic index reference data
//!
//! Keyword → index values grouped by food group, plus the ordered fallback
//! rules used when no keyword matches. Built once per process into an
//! immutable `GlycemicTable` and passed to whoever needs it.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use rusqlite::{params, Connection};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::db::DbResult;

/// Highest index a reference entry may carry
pub const MAX_GLYCEMIC_INDEX: u32 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("glycemic index {index} for '{keyword}' is above {MAX_GLYCEMIC_INDEX}")]
    IndexOutOfRange { keyword: String, index: u32 },

    #[error("glycemic override keyword is blank")]
    BlankKeyword,
}

/// Food group a reference keyword belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodGroup {
    Fruit,
    Vegetable,
    Grain,
    Bread,
    Pasta,
    Legume,
    Dairy,
    Protein,
    NutsSeeds,
    Snack,
    Beverage,
    FastFood,
    Breakfast,
    Condiment,
    /// Added through configuration
    Custom,
}

impl FoodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodGroup::Fruit => "fruit",
            FoodGroup::Vegetable => "vegetable",
            FoodGroup::Grain => "grain",
            FoodGroup::Bread => "bread",
            FoodGroup::Pasta => "pasta",
            FoodGroup::Legume => "legume",
            FoodGroup::Dairy => "dairy",
            FoodGroup::Protein => "protein",
            FoodGroup::NutsSeeds => "nuts_seeds",
            FoodGroup::Snack => "snack",
            FoodGroup::Beverage => "beverage",
            FoodGroup::FastFood => "fast_food",
            FoodGroup::Breakfast => "breakfast",
            FoodGroup::Condiment => "condiment",
            FoodGroup::Custom => "custom",
        }
    }
}

impl fmt::Display for FoodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reference keyword
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlycemicIndexEntry {
    pub keyword: String,
    pub index: u8,
    pub food_group: FoodGroup,
}

/// Ordered fallback predicate
///
/// Matches when every group in `all_of` has at least one term that is a
/// substring of the name, and no term of `none_of` is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackRule {
    pub label: &'static str,
    pub all_of: &'static [&'static [&'static str]],
    pub none_of: &'static [&'static str],
    pub index: u8,
}

impl FallbackRule {
    pub fn matches(&self, lowercase_name: &str) -> bool {
        self.all_of
            .iter()
            .all(|group| group.iter().any(|term| lowercase_name.contains(term)))
            && !self.none_of.iter().any(|term| lowercase_name.contains(term))
    }
}

// ============================================================================
// Reference keywords
// ============================================================================

const FRUIT: &[(&str, u8)] = &[
    ("apple", 36),
    ("pear", 38),
    ("orange", 43),
    ("grapefruit", 25),
    ("cherries", 22),
    ("plum", 39),
    ("peach", 42),
    ("strawberries", 40),
    ("strawberry", 40),
    ("blackberries", 25),
    ("raspberries", 32),
    ("blueberries", 53),
    ("grapes", 46),
    ("kiwi", 53),
    ("avocado", 15),
    ("mango", 60),
    ("papaya", 59),
    ("pineapple", 59),
    ("cantaloupe", 65),
    ("raisins", 64),
    ("watermelon", 72),
    // Published value is 103; capped to the stored range
    ("dates", 100),
];

const VEGETABLE: &[(&str, u8)] = &[
    ("broccoli", 15),
    ("cauliflower", 15),
    ("spinach", 15),
    ("lettuce", 15),
    ("kale", 15),
    ("cabbage", 10),
    ("mushroom", 15),
    ("tomato", 15),
    ("cucumber", 15),
    ("bell pepper", 15),
    ("pepper", 15),
    ("asparagus", 15),
    ("celery", 15),
    ("zucchini", 15),
    ("eggplant", 15),
    ("green beans", 15),
    ("carrots", 35),
    ("carrot", 35),
    ("sweet potato", 54),
    ("yam", 54),
    ("corn", 60),
    ("beets", 61),
    ("beetroot", 61),
    ("potato", 85),
    ("russet potato", 85),
    ("instant mashed potato", 87),
    ("pumpkin", 75),
];

const GRAIN: &[(&str, u8)] = &[
    ("quinoa", 53),
    ("steel cut oats", 42),
    ("oatmeal", 55),
    ("oats", 55),
    ("barley", 28),
    ("bulgur", 48),
    ("buckwheat", 54),
    ("brown rice", 68),
    ("basmati rice", 58),
    ("couscous", 65),
    ("wild rice", 57),
    ("white rice", 73),
    ("jasmine rice", 89),
    ("instant rice", 87),
    ("rice cakes", 82),
    ("cornflakes", 81),
    ("corn flakes", 81),
    ("rice krispies", 82),
    ("cheerios", 74),
    // Sweetened flake cereals
    ("flakes", 74),
    ("instant oatmeal", 79),
];

const BREAD: &[(&str, u8)] = &[
    ("whole grain bread", 51),
    ("whole wheat bread", 54),
    ("sourdough bread", 54),
    ("rye bread", 51),
    ("pumpernickel", 46),
    ("ezekiel bread", 36),
    ("pita bread", 57),
    ("naan", 62),
    ("croissant", 67),
    ("white bread", 75),
    ("french bread", 95),
    ("baguette", 95),
    ("bagel", 72),
    ("english muffin", 77),
    ("hamburger bun", 75),
    ("hot dog bun", 75),
];

const PASTA: &[(&str, u8)] = &[
    ("whole wheat pasta", 42),
    ("pasta", 49),
    ("spaghetti", 49),
    ("fettuccine", 47),
    ("linguine", 49),
    ("ravioli", 39),
    ("tortellini", 50),
    ("soba noodles", 46),
    ("rice noodles", 61),
    ("udon noodles", 62),
    ("instant noodles", 70),
    ("overcooked pasta", 70),
];

const LEGUME: &[(&str, u8)] = &[
    ("lentils", 32),
    ("chickpeas", 28),
    ("garbanzo beans", 28),
    ("black beans", 30),
    ("kidney beans", 24),
    ("pinto beans", 39),
    ("navy beans", 31),
    ("soybeans", 16),
    ("split peas", 25),
    ("hummus", 6),
];

const DAIRY: &[(&str, u8)] = &[
    ("milk", 31),
    ("skim milk", 32),
    ("whole milk", 27),
    ("yogurt", 33),
    ("greek yogurt", 11),
    ("plain yogurt", 14),
    ("cottage cheese", 10),
    ("cheese", 0),
    ("cheddar", 0),
    ("mozzarella", 0),
    ("parmesan", 0),
    ("butter", 0),
    ("ice cream", 61),
    ("frozen yogurt", 65),
];

const PROTEIN: &[(&str, u8)] = &[
    ("chicken", 0),
    ("beef", 0),
    ("pork", 0),
    ("fish", 0),
    ("salmon", 0),
    ("tuna", 0),
    ("shrimp", 0),
    ("eggs", 0),
    ("egg", 0),
    ("tofu", 15),
    ("tempeh", 15),
];

const NUTS_SEEDS: &[(&str, u8)] = &[
    ("almonds", 15),
    ("almond", 15),
    ("walnuts", 15),
    ("walnut", 15),
    ("cashews", 22),
    ("cashew", 22),
    ("peanuts", 14),
    ("peanut", 14),
    ("pistachios", 15),
    ("pecans", 10),
    ("macadamia", 10),
    ("chia seeds", 1),
    ("flax seeds", 1),
    ("pumpkin seeds", 10),
    ("sunflower seeds", 35),
];

const SNACK: &[(&str, u8)] = &[
    ("dark chocolate", 23),
    ("nuts", 15),
    ("popcorn", 55),
    ("milk chocolate", 49),
    ("potato chips", 56),
    ("tortilla chips", 63),
    ("pretzels", 83),
    ("crackers", 74),
    ("rice crackers", 91),
    ("jelly beans", 78),
    ("gummy bears", 78),
    ("donuts", 76),
    ("donut", 76),
    ("cookies", 77),
    ("oreos", 77),
    ("cake", 73),
    ("muffin", 71),
];

const BEVERAGE: &[(&str, u8)] = &[
    ("water", 0),
    ("coffee", 0),
    ("tea", 0),
    ("diet soda", 0),
    ("almond milk", 25),
    ("soy milk", 34),
    ("orange juice", 50),
    ("apple juice", 41),
    ("cranberry juice", 68),
    ("soda", 70),
    ("cola", 70),
    ("coca-cola", 70),
    ("pepsi", 70),
    ("sprite", 70),
    ("gatorade", 78),
    ("energy drink", 70),
];

const FAST_FOOD: &[(&str, u8)] = &[
    ("french fries", 75),
    ("fries", 75),
    ("pizza", 60),
    ("hamburger", 66),
    ("cheeseburger", 66),
    ("burrito", 55),
    ("taco", 52),
    ("fried chicken", 70),
];

const BREAKFAST: &[(&str, u8)] = &[
    ("pancakes", 67),
    ("waffles", 76),
    ("french toast", 75),
    ("granola", 61),
    ("muesli", 56),
];

const CONDIMENT: &[(&str, u8)] = &[
    ("ketchup", 55),
    ("bbq sauce", 70),
    ("honey", 61),
    ("maple syrup", 54),
    ("jam", 65),
    ("peanut butter", 14),
    ("nutella", 55),
];

const REFERENCE: &[(FoodGroup, &[(&str, u8)])] = &[
    (FoodGroup::Fruit, FRUIT),
    (FoodGroup::Vegetable, VEGETABLE),
    (FoodGroup::Grain, GRAIN),
    (FoodGroup::Bread, BREAD),
    (FoodGroup::Pasta, PASTA),
    (FoodGroup::Legume, LEGUME),
    (FoodGroup::Dairy, DAIRY),
    (FoodGroup::Protein, PROTEIN),
    (FoodGroup::NutsSeeds, NUTS_SEEDS),
    (FoodGroup::Snack, SNACK),
    (FoodGroup::Beverage, BEVERAGE),
    (FoodGroup::FastFood, FAST_FOOD),
    (FoodGroup::Breakfast, BREAKFAST),
    (FoodGroup::Condiment, CONDIMENT),
];

// ============================================================================
// Fallback rules (evaluated top to bottom)
// ============================================================================

macro_rules! rule {
    ($label:literal => $index:literal, all [$([$($term:literal),+]),+] $(, except [$($not:literal),+])?) => {
        FallbackRule {
            label: $label,
            all_of: &[$(&[$($term),+]),+],
            none_of: &[$($($not),+)?],
            index: $index,
        }
    };
}

pub const FALLBACK_RULES: &[FallbackRule] = &[
    rule!("burger" => 66, all [["burger", "cheeseburger", "hamburger"]]),
    rule!("pizza" => 60, all [["pizza"]]),
    rule!("fries" => 75, all [["fries", "french fries"]]),
    rule!("salad" => 15, all [["salad"]], except ["pasta"]),
    rule!("grilled protein" => 0, all [["grilled chicken", "grilled fish"]]),
    rule!("donut" => 76, all [["donut", "doughnut"]]),
    rule!("pancake" => 67, all [["pancake"]]),
    rule!("waffle" => 76, all [["waffle"]]),
    rule!("taco" => 52, all [["taco"]]),
    rule!("burrito" => 55, all [["burrito"]]),
    rule!("whole grain sandwich" => 54, all [["sandwich"], ["whole wheat", "whole grain"]]),
    rule!("sandwich" => 70, all [["sandwich"]]),
    rule!("wrap" => 57, all [["wrap"]]),
    rule!("brown rice" => 68, all [["rice"], ["brown"]]),
    rule!("fried rice" => 75, all [["rice"], ["fried"]]),
    rule!("rice" => 73, all [["rice"]]),
    rule!("pasta" => 49, all [["pasta", "spaghetti", "fettuccine"]]),
    rule!("rice noodle" => 61, all [["noodle"], ["rice"]]),
    rule!("noodle" => 55, all [["noodle"]]),
    rule!("whole grain bread" => 51, all [["bread"], ["whole wheat", "whole grain", "rye"]]),
    rule!("bread" => 75, all [["bread"]]),
    rule!("coffee" => 0, all [["coffee"]], except ["frapp"]),
    rule!("tea" => 0, all [["tea"]], except ["sweet"]),
    rule!("soda" => 70, all [["soda", "cola", "pepsi", "sprite"]]),
    rule!("juice" => 50, all [["juice"]]),
    rule!("smoothie" => 55, all [["smoothie"]]),
    rule!("shake" => 61, all [["shake"]]),
    rule!("ice cream" => 61, all [["ice cream"]]),
    rule!("cookie" => 77, all [["cookie"]]),
    rule!("cake" => 73, all [["cake"]]),
    rule!("muffin" => 71, all [["muffin"]]),
    rule!("bagel" => 72, all [["bagel"]]),
    rule!("croissant" => 67, all [["croissant"]]),
    rule!("potato chips" => 56, all [["chips"], ["potato"]]),
    rule!("tortilla chips" => 63, all [["chips"], ["tortilla"]]),
    rule!("chips" => 60, all [["chips"]]),
    rule!("fried wings" => 70, all [["wings", "chicken tender"], ["fried", "buffalo"]]),
    rule!("wings" => 0, all [["wings", "chicken tender"]]),
    rule!("bean soup" => 30, all [["soup"], ["lentil", "bean"]]),
    rule!("soup" => 40, all [["soup"]]),
    rule!("pho" => 40, all [["pho"]]),
    rule!("banh mi" => 75, all [["banh mi"]]),
];

/// Immutable reference table used by the estimator
#[derive(Debug, Clone)]
pub struct GlycemicTable {
    entries: BTreeMap<String, GlycemicIndexEntry>,
    /// Keywords in substring-scan order: longest first, ties lexicographic
    scan_order: Vec<String>,
    rules: &'static [FallbackRule],
}

impl GlycemicTable {
    /// Table with the built-in reference keywords and fallback rules
    pub fn builtin() -> Self {
        let entries = REFERENCE
            .iter()
            .flat_map(|(group, keywords)| {
                keywords.iter().map(move |(keyword, index)| {
                    (
                        keyword.to_string(),
                        GlycemicIndexEntry {
                            keyword: keyword.to_string(),
                            index: *index,
                            food_group: *group,
                        },
                    )
                })
            })
            .collect();

        Self::from_entries(entries, FALLBACK_RULES)
    }

    fn from_entries(entries: BTreeMap<String, GlycemicIndexEntry>, rules: &'static [FallbackRule]) -> Self {
        let mut scan_order: Vec<String> = entries.keys().cloned().collect();
        scan_order.sort_by(|a, b| {
            (Reverse(a.chars().count()), a.as_str()).cmp(&(Reverse(b.chars().count()), b.as_str()))
        });
        Self {
            entries,
            scan_order,
            rules,
        }
    }

    /// Add or replace keywords
    ///
    /// Keywords are lowercased and trimmed. Existing keywords keep their food
    /// group; new ones are filed under `FoodGroup::Custom`.
    pub fn with_overrides<'a, I>(self, overrides: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (&'a String, &'a u32)>,
    {
        let mut entries = self.entries;
        for (keyword, index) in overrides {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(TableError::BlankKeyword);
            }
            let index = u8::try_from(*index)
                .ok()
                .filter(|i| u32::from(*i) <= MAX_GLYCEMIC_INDEX)
                .ok_or_else(|| TableError::IndexOutOfRange {
                    keyword: keyword.clone(),
                    index: *index,
                })?;

            let food_group = entries
                .get(&keyword)
                .map(|e| e.food_group)
                .unwrap_or(FoodGroup::Custom);
            debug!(keyword = %keyword, index, "glycemic override");
            entries.insert(
                keyword.clone(),
                GlycemicIndexEntry {
                    keyword,
                    index,
                    food_group,
                },
            );
        }
        Ok(Self::from_entries(entries, self.rules))
    }

    /// Exact keyword lookup
    pub fn get(&self, keyword: &str) -> Option<&GlycemicIndexEntry> {
        self.entries.get(keyword)
    }

    /// All entries, sorted by keyword
    pub fn entries(&self) -> impl Iterator<Item = &GlycemicIndexEntry> {
        self.entries.values()
    }

    /// Keywords in the order the substring stage scans them
    pub fn scan_order(&self) -> impl Iterator<Item = &GlycemicIndexEntry> {
        self.scan_order.iter().filter_map(|k| self.entries.get(k))
    }

    pub fn rules(&self) -> &'static [FallbackRule] {
        self.rules
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the `glycemic_index_ref` table with this table's keywords
    pub fn write_reference_table(&self, conn: &Connection) -> DbResult<usize> {
        conn.execute("DELETE FROM glycemic_index_ref", [])?;
        let mut stmt = conn.prepare(
            "INSERT INTO glycemic_index_ref (keyword, glycemic_index, food_group) VALUES (?1, ?2, ?3)",
        )?;
        for entry in self.entries() {
            stmt.execute(params![entry.keyword, entry.index, entry.food_group.as_str()])?;
        }
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_builtin_keywords_are_unique_and_in_range() {
        let table = GlycemicTable::builtin();
        let total: usize = REFERENCE.iter().map(|(_, k)| k.len()).sum();
        assert_eq!(table.len(), total);
        assert!(table.entries().all(|e| u32::from(e.index) <= MAX_GLYCEMIC_INDEX));
        assert_eq!(table.get("dates").unwrap().index, 100);
    }

    #[test]
    fn test_scan_order_longest_first_then_lexicographic() {
        let table = GlycemicTable::builtin();
        let order: Vec<&str> = table.scan_order().map(|e| e.keyword.as_str()).collect();
        assert_eq!(order[0], "instant mashed potato");
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(a.len() > b.len() || (a.len() == b.len() && a < b), "{} before {}", a, b);
        }
    }

    #[test]
    fn test_overrides_add_and_replace() {
        let overrides: BTreeMap<String, u32> =
            [("Taco".to_string(), 50), ("jicama".to_string(), 17)].into_iter().collect();
        let table = GlycemicTable::builtin().with_overrides(&overrides).unwrap();

        assert_eq!(table.get("taco").unwrap().index, 50);
        assert_eq!(table.get("taco").unwrap().food_group, FoodGroup::FastFood);
        assert_eq!(table.get("jicama").unwrap().food_group, FoodGroup::Custom);
        assert!(table.scan_order().any(|e| e.keyword == "jicama"));
    }

    #[test]
    fn test_override_above_range_rejected() {
        let overrides: BTreeMap<String, u32> = [("dates".to_string(), 103)].into_iter().collect();
        let err = GlycemicTable::builtin().with_overrides(&overrides).unwrap_err();
        assert_eq!(
            err,
            TableError::IndexOutOfRange {
                keyword: "dates".to_string(),
                index: 103
            }
        );
    }

    #[test]
    fn test_fallback_rule_exclusions() {
        let salad = FALLBACK_RULES.iter().find(|r| r.label == "salad").unwrap();
        assert!(salad.matches("garden salad"));
        assert!(!salad.matches("pasta salad"));

        let brown = FALLBACK_RULES.iter().find(|r| r.label == "brown rice").unwrap();
        assert!(brown.matches("brown rice bowl"));
        assert!(!brown.matches("rice bowl"));
    }

    #[test]
    fn test_write_reference_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let table = GlycemicTable::builtin();

        assert_eq!(table.write_reference_table(&conn).unwrap(), table.len());
        // Rewriting replaces rather than duplicates
        table.write_reference_table(&conn).unwrap();

        let (count, taco): (i64, i64) = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM glycemic_index_ref),
                        (SELECT glycemic_index FROM glycemic_index_ref WHERE keyword = 'taco')",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(count as usize, table.len());
        assert_eq!(taco, 52);
    }
}
