//! Nutrient values shared by stored records and import candidates
//!
//! Every value is optional: `None` means the source did not report it, which
//! is not the same as zero.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

macro_rules! nutrient_fields {
    ($($field:ident),+ $(,)?) => {
        /// Nutritional values, one optional slot per stored column
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct Nutrients {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<f64>,
            )+
        }

        impl Nutrients {
            /// Column names, in table order
            pub const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];

            /// Values in `COLUMNS` order
            pub fn values(&self) -> Vec<Option<f64>> {
                vec![$(self.$field),+]
            }

            /// Mutable slot for a column name
            pub fn slot_mut(&mut self, column: &str) -> Option<&mut Option<f64>> {
                match column {
                    $(stringify!($field) => Some(&mut self.$field),)+
                    _ => None,
                }
            }

            /// Overwrite every slot that `other` reports; returns how many changed
            pub fn merge_from(&mut self, other: &Nutrients) -> usize {
                let mut changed = 0;
                $(
                    if let Some(value) = other.$field {
                        if self.$field != Some(value) {
                            self.$field = Some(value);
                            changed += 1;
                        }
                    }
                )+
                changed
            }

            /// Clear slots holding NaN or infinity; returns the cleared columns
            pub fn drop_non_finite(&mut self) -> Vec<&'static str> {
                let mut dropped = Vec::new();
                $(
                    if matches!(self.$field, Some(value) if !value.is_finite()) {
                        self.$field = None;
                        dropped.push(stringify!($field));
                    }
                )+
                dropped
            }

            pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
                Ok(Self {
                    $($field: row.get(stringify!($field))?,)+
                })
            }
        }
    };
}

nutrient_fields!(
    calories,
    calories_from_fat,
    total_fat_g,
    saturated_fat_g,
    trans_fat_g,
    polyunsaturated_fat_g,
    monounsaturated_fat_g,
    cholesterol_mg,
    sodium_mg,
    total_carbohydrate_g,
    dietary_fiber_g,
    sugars_g,
    added_sugars_g,
    protein_g,
    vitamin_a_mcg_rae,
    vitamin_c_mg,
    vitamin_d_mcg,
    vitamin_e_mg,
    vitamin_k_mcg,
    thiamin_mg,
    riboflavin_mg,
    niacin_mg,
    vitamin_b6_mg,
    folate_mcg,
    vitamin_b12_mcg,
    calcium_mg,
    iron_mg,
    magnesium_mg,
    phosphorus_mg,
    potassium_mg,
    zinc_mg,
    selenium_mcg,
    caffeine_mg,
    alcohol_g,
    omega3_fatty_acids_mg,
);

impl Nutrients {
    /// True when no nutrient is known
    pub fn is_empty(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }

    /// Number of known nutrient values
    pub fn known_count(&self) -> usize {
        self.values().iter().filter(|v| v.is_some()).count()
    }
}

/// Build a `Nutrients` value from `field: value` pairs, leaving the rest unknown
#[macro_export]
macro_rules! nutrients {
    ($($field:ident : $value:expr),* $(,)?) => {
        $crate::models::Nutrients {
            $($field: Some($value as f64),)*
            ..$crate::models::Nutrients::default()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_unknown() {
        let n = Nutrients::default();
        assert!(n.is_empty());
        assert_eq!(n.values().len(), Nutrients::COLUMNS.len());
    }

    #[test]
    fn test_merge_overwrites_only_reported_fields() {
        let mut stored = crate::nutrients!(calories: 170, sodium_mg: 530, protein_g: 24);
        let incoming = crate::nutrients!(calories: 175);

        let changed = stored.merge_from(&incoming);

        assert_eq!(changed, 1);
        assert_eq!(stored.calories, Some(175.0));
        assert_eq!(stored.sodium_mg, Some(530.0));
        assert_eq!(stored.protein_g, Some(24.0));
    }

    #[test]
    fn test_merge_zero_is_a_value() {
        let mut stored = crate::nutrients!(sugars_g: 4);
        let changed = stored.merge_from(&crate::nutrients!(sugars_g: 0));
        assert_eq!(changed, 1);
        assert_eq!(stored.sugars_g, Some(0.0));
    }

    #[test]
    fn test_merge_identical_reports_no_change() {
        let mut stored = crate::nutrients!(calories: 80, total_carbohydrate_g: 13);
        let same = stored.clone();
        assert_eq!(stored.merge_from(&same), 0);
    }

    #[test]
    fn test_slot_mut_by_column() {
        let mut n = Nutrients::default();
        *n.slot_mut("iron_mg").unwrap() = Some(2.7);
        assert_eq!(n.iron_mg, Some(2.7));
        assert!(n.slot_mut("not_a_column").is_none());
        assert_eq!(n.known_count(), 1);
    }
}
