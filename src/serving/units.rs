//! Measurement units and conversion constants

/// Category of a measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    /// g, oz, lb, kg
    Weight,
    /// ml, tbsp, cup, fl oz
    Volume,
    /// each, piece, slice, donut, sandwich ... no fixed weight
    Count,
}

// ============================================================================
// Volume (to milliliters)
// ============================================================================

pub const ML_PER_TSP: f64 = 4.92892;
pub const ML_PER_TBSP: f64 = 14.7868;
pub const ML_PER_FL_OZ: f64 = 29.5735;
pub const ML_PER_CUP: f64 = 236.588;
pub const ML_PER_PINT: f64 = 473.176;
pub const ML_PER_LITER: f64 = 1000.0;

// ============================================================================
// Weight (to grams)
// ============================================================================

pub const G_PER_MG: f64 = 0.001;
pub const G_PER_KG: f64 = 1000.0;
pub const G_PER_OZ: f64 = 28.3495;
pub const G_PER_LB: f64 = 453.592;

/// Conversion factor to grams for a weight unit
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "g" | "gr" | "gram" | "grams" => Some(1.0),
        "mg" | "milligram" | "milligrams" => Some(G_PER_MG),
        "kg" | "kilogram" | "kilograms" => Some(G_PER_KG),
        "oz" | "ounce" | "ounces" => Some(G_PER_OZ),
        "lb" | "lbs" | "pound" | "pounds" => Some(G_PER_LB),
        _ => None,
    }
}

/// Conversion factor to milliliters for a volume unit
pub fn ml_per_unit(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Some(1.0),
        "cl" => Some(10.0),
        "l" | "liter" | "liters" | "litre" | "litres" => Some(ML_PER_LITER),
        "tsp" | "teaspoon" | "teaspoons" => Some(ML_PER_TSP),
        "tbsp" | "tablespoon" | "tablespoons" => Some(ML_PER_TBSP),
        "fl oz" | "floz" | "fl. oz" | "fluid ounce" | "fluid ounces" => Some(ML_PER_FL_OZ),
        "cup" | "cups" => Some(ML_PER_CUP),
        "pint" | "pints" => Some(ML_PER_PINT),
        _ => None,
    }
}

/// Determine the category of a unit string
pub fn categorize_unit(unit: &str) -> UnitCategory {
    if grams_per_unit(unit).is_some() {
        UnitCategory::Weight
    } else if ml_per_unit(unit).is_some() {
        UnitCategory::Volume
    } else {
        UnitCategory::Count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_units() {
        assert_eq!(categorize_unit("oz"), UnitCategory::Weight);
        assert_eq!(categorize_unit(" G "), UnitCategory::Weight);
        assert_eq!(categorize_unit("fl oz"), UnitCategory::Volume);
        assert_eq!(categorize_unit("cup"), UnitCategory::Volume);
        assert_eq!(categorize_unit("ea"), UnitCategory::Count);
        assert_eq!(categorize_unit("donut"), UnitCategory::Count);
    }

    #[test]
    fn test_unit_factors() {
        assert_eq!(grams_per_unit("lb"), Some(G_PER_LB));
        assert_eq!(grams_per_unit("tbsp"), None);
        assert_eq!(ml_per_unit("tbsp"), Some(ML_PER_TBSP));
        assert_eq!(ml_per_unit("g"), None);
    }
}
