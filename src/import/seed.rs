//! Built-in seed data
//!
//! Whole-food reference values and international dishes are per 100 g.
//! Restaurant menus are per serving, with the published portion text. The
//! larger chain menus ship as JSON under `seeds/` and go through the same
//! field handling as `import-json`.

use std::collections::VecDeque;

use super::json_file::JsonImporter;
use super::{ImportBatch, ImportError, Importer};
use crate::models::{DataSource, FoodCandidate, NutrientBasis, Nutrients};

const EXPANDED_RESTAURANTS: &str = include_str!("../../seeds/restaurants_expanded.json");
const ADDITIONAL_RESTAURANTS: &str = include_str!("../../seeds/restaurants_additional.json");

/// A group of built-in seed records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSet {
    Manual,
    International,
    Chipotle,
    /// Coffee, pizza, sandwich and sit-down chains
    Restaurants,
    /// Burger, chicken and Asian chains plus Chipotle entrees
    MoreRestaurants,
}

impl SeedSet {
    pub const ALL: [SeedSet; 5] = [
        SeedSet::Manual,
        SeedSet::International,
        SeedSet::Chipotle,
        SeedSet::Restaurants,
        SeedSet::MoreRestaurants,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SeedSet::Manual => "manual reference foods",
            SeedSet::International => "international dishes",
            SeedSet::Chipotle => "Chipotle",
            SeedSet::Restaurants => "restaurants_expanded.json",
            SeedSet::MoreRestaurants => "restaurants_additional.json",
        }
    }

    /// Batches for this set; bundled menus yield one batch per restaurant
    pub fn batches(&self) -> Result<Vec<ImportBatch>, ImportError> {
        let candidates = match self {
            SeedSet::Manual => manual_foods(),
            SeedSet::International => international_dishes(),
            SeedSet::Chipotle => chipotle_menu(),
            SeedSet::Restaurants => return bundled_menu(self.label(), EXPANDED_RESTAURANTS),
            SeedSet::MoreRestaurants => return bundled_menu(self.label(), ADDITIONAL_RESTAURANTS),
        };
        Ok(vec![ImportBatch::new(self.label(), candidates)])
    }
}

fn bundled_menu(label: &str, text: &str) -> Result<Vec<ImportBatch>, ImportError> {
    let value = serde_json::from_str(text)?;
    let mut importer = JsonImporter::from_value(label, value, DataSource::RestaurantMenu)?;
    let mut batches = Vec::new();
    while let Some(batch) = importer.next_batch()? {
        batches.push(batch);
    }
    Ok(batches)
}

/// Yields the batches of each seed set in order
pub struct SeedImporter {
    pending: VecDeque<SeedSet>,
    ready: VecDeque<ImportBatch>,
}

impl SeedImporter {
    pub fn new(sets: impl IntoIterator<Item = SeedSet>) -> Self {
        Self {
            pending: sets.into_iter().collect(),
            ready: VecDeque::new(),
        }
    }

    pub fn all() -> Self {
        Self::new(SeedSet::ALL)
    }
}

impl Importer for SeedImporter {
    fn name(&self) -> &str {
        "seed"
    }

    fn next_batch(&mut self) -> Result<Option<ImportBatch>, ImportError> {
        while self.ready.is_empty() {
            let Some(set) = self.pending.pop_front() else {
                return Ok(None);
            };
            self.ready.extend(set.batches()?);
        }
        Ok(self.ready.pop_front())
    }
}

// ============================================================================
// Manual whole foods (per 100 g)
// ============================================================================

// name, kcal, protein, fat, sat fat, trans fat, carbs, fiber, sugar,
// sodium mg, cholesterol mg, calcium mg, iron mg, potassium mg, vitamin C mg
type ManualRow = (&'static str, [f64; 14]);

const MANUAL_FOODS: &[ManualRow] = &[
    ("Banana", [89.0, 1.1, 0.3, 0.1, 0.0, 22.8, 2.6, 12.2, 1.0, 0.0, 5.0, 0.3, 358.0, 8.7]),
    ("Apple", [52.0, 0.3, 0.2, 0.0, 0.0, 13.8, 2.4, 10.4, 2.0, 0.0, 6.0, 0.1, 107.0, 4.6]),
    ("Orange", [47.0, 0.9, 0.1, 0.0, 0.0, 11.8, 2.4, 9.4, 0.0, 0.0, 40.0, 0.1, 181.0, 53.2]),
    ("Strawberry", [32.0, 0.7, 0.3, 0.0, 0.0, 7.7, 2.0, 4.9, 1.0, 0.0, 16.0, 0.4, 153.0, 58.8]),
    ("Chicken Breast", [165.0, 31.0, 3.6, 1.0, 0.1, 0.0, 0.0, 0.0, 74.0, 85.0, 11.0, 0.7, 256.0, 0.0]),
    ("Salmon", [208.0, 25.4, 12.4, 2.5, 0.0, 0.0, 0.0, 0.0, 59.0, 63.0, 31.0, 0.3, 384.0, 0.0]),
    ("Egg", [155.0, 13.0, 11.0, 3.1, 0.0, 1.1, 0.0, 1.1, 124.0, 372.0, 50.0, 1.8, 126.0, 0.0]),
    ("White Rice", [130.0, 2.7, 0.3, 0.1, 0.0, 28.0, 0.4, 0.1, 1.0, 0.0, 10.0, 1.2, 35.0, 0.0]),
    ("Pasta", [131.0, 5.0, 1.1, 0.2, 0.0, 25.0, 1.8, 0.9, 1.0, 0.0, 7.0, 0.9, 44.0, 0.0]),
    ("Whole Wheat Bread", [247.0, 13.0, 3.4, 0.7, 0.0, 41.0, 6.0, 5.0, 450.0, 0.0, 37.0, 2.5, 248.0, 0.0]),
    ("Broccoli", [34.0, 2.8, 0.4, 0.0, 0.0, 6.6, 2.6, 1.7, 33.0, 0.0, 47.0, 0.7, 316.0, 89.2]),
    ("Carrot", [41.0, 0.9, 0.2, 0.0, 0.0, 9.6, 2.8, 4.7, 69.0, 0.0, 33.0, 0.3, 320.0, 5.9]),
    ("Spinach", [23.0, 2.9, 0.4, 0.1, 0.0, 3.6, 2.2, 0.4, 79.0, 0.0, 99.0, 2.7, 558.0, 28.1]),
];

fn manual_foods() -> Vec<FoodCandidate> {
    MANUAL_FOODS
        .iter()
        .map(|(name, v)| {
            let nutrients = Nutrients {
                calories: Some(v[0]),
                protein_g: Some(v[1]),
                total_fat_g: Some(v[2]),
                saturated_fat_g: Some(v[3]),
                trans_fat_g: Some(v[4]),
                total_carbohydrate_g: Some(v[5]),
                dietary_fiber_g: Some(v[6]),
                sugars_g: Some(v[7]),
                sodium_mg: Some(v[8]),
                cholesterol_mg: Some(v[9]),
                calcium_mg: Some(v[10]),
                iron_mg: Some(v[11]),
                potassium_mg: Some(v[12]),
                vitamin_c_mg: Some(v[13]),
                ..Default::default()
            };
            FoodCandidate::new(*name, DataSource::Manual)
                .with_basis(NutrientBasis::Per100g)
                .with_serving("100 g")
                .with_nutrients(nutrients)
        })
        .collect()
}

// ============================================================================
// International dishes (per 100 g)
// ============================================================================

// name, category, kcal, protein, fat, sat fat, trans fat, carbs, fiber, sugar,
// sodium mg, cholesterol mg
type DishRow = (&'static str, &'static str, [f64; 10]);

const INTERNATIONAL_DISHES: &[DishRow] = &[
    ("Sushi Roll", "Japanese", [143.0, 3.2, 0.4, 0.1, 0.0, 30.0, 0.8, 5.0, 428.0, 5.0]),
    ("Pad Thai", "Thai", [165.0, 6.0, 7.0, 1.0, 0.0, 20.0, 1.5, 8.0, 380.0, 25.0]),
    ("Fried Rice", "Chinese", [163.0, 4.0, 5.0, 0.8, 0.0, 25.0, 1.2, 2.0, 480.0, 15.0]),
    ("Taco", "Mexican", [216.0, 9.5, 9.5, 4.0, 0.0, 20.0, 3.0, 2.0, 370.0, 25.0]),
    ("Burrito", "Mexican", [206.0, 7.0, 7.0, 2.5, 0.0, 28.0, 4.0, 2.5, 490.0, 15.0]),
    ("Hummus", "Mediterranean", [166.0, 8.0, 10.0, 1.4, 0.0, 14.0, 6.0, 0.3, 379.0, 0.0]),
    ("Falafel", "Mediterranean", [333.0, 13.3, 17.8, 2.3, 0.0, 31.8, 4.9, 4.9, 585.0, 0.0]),
];

fn international_dishes() -> Vec<FoodCandidate> {
    INTERNATIONAL_DISHES
        .iter()
        .map(|(name, category, v)| {
            let nutrients = Nutrients {
                calories: Some(v[0]),
                protein_g: Some(v[1]),
                total_fat_g: Some(v[2]),
                saturated_fat_g: Some(v[3]),
                trans_fat_g: Some(v[4]),
                total_carbohydrate_g: Some(v[5]),
                dietary_fiber_g: Some(v[6]),
                sugars_g: Some(v[7]),
                sodium_mg: Some(v[8]),
                cholesterol_mg: Some(v[9]),
                ..Default::default()
            };
            FoodCandidate::new(*name, DataSource::International)
                .with_category(*category)
                .with_serving("100 g")
                .with_nutrients(nutrients)
        })
        .collect()
}

// ============================================================================
// Chipotle menu (per serving)
// ============================================================================

pub const CHIPOTLE: &str = "Chipotle";

// name, portion, kcal, kcal from fat, fat, sat fat, trans fat, cholesterol mg,
// sodium mg, carbs, fiber, sugar, protein
type MenuRow = (&'static str, &'static str, [f64; 11]);

const CHIPOTLE_MENU: &[MenuRow] = &[
    ("Flour Tortilla (burrito)", "1 ea", [320.0, 80.0, 9.0, 0.5, 0.0, 0.0, 600.0, 50.0, 3.0, 0.0, 8.0]),
    ("Flour Tortilla (taco)", "1 ea", [80.0, 25.0, 2.5, 0.0, 0.0, 0.0, 160.0, 13.0, 0.5, 0.0, 2.0]),
    ("Crispy Corn Tortilla", "1 ea", [70.0, 25.0, 3.0, 0.0, 0.0, 0.0, 0.0, 10.0, 1.0, 0.0, 1.0]),
    ("Cilantro-Lime Brown Rice", "4 oz", [210.0, 50.0, 6.0, 0.0, 0.0, 0.0, 190.0, 36.0, 2.0, 0.0, 4.0]),
    ("Cilantro-Lime White Rice", "4 oz", [210.0, 35.0, 4.0, 1.0, 0.0, 0.0, 350.0, 40.0, 1.0, 0.0, 4.0]),
    ("Black Beans", "4 oz", [130.0, 15.0, 1.5, 0.0, 0.0, 0.0, 210.0, 22.0, 7.0, 2.0, 8.0]),
    ("Pinto Beans", "4 oz", [130.0, 10.0, 1.5, 0.0, 0.0, 0.0, 210.0, 21.0, 8.0, 1.0, 8.0]),
    ("Fajita Vegetables", "2 oz", [20.0, 0.0, 0.0, 0.0, 0.0, 0.0, 150.0, 5.0, 1.0, 2.0, 1.0]),
    ("Barbacoa", "4 oz", [170.0, 60.0, 7.0, 2.5, 0.0, 65.0, 530.0, 2.0, 1.0, 0.0, 24.0]),
    ("Chicken", "4 oz", [180.0, 60.0, 7.0, 3.0, 0.0, 125.0, 310.0, 0.0, 0.0, 0.0, 32.0]),
    ("Carnitas", "4 oz", [210.0, 120.0, 12.0, 7.0, 0.0, 65.0, 450.0, 0.0, 0.0, 0.0, 23.0]),
    ("Steak", "4 oz", [150.0, 60.0, 6.0, 2.5, 0.0, 80.0, 330.0, 1.0, 1.0, 0.0, 21.0]),
    ("Sofritas", "4 oz", [150.0, 80.0, 10.0, 1.5, 0.0, 0.0, 560.0, 9.0, 3.0, 5.0, 8.0]),
    ("Fresh Tomato Salsa", "4 oz", [25.0, 0.0, 0.0, 0.0, 0.0, 0.0, 550.0, 4.0, 1.0, 1.0, 0.0]),
    ("Roasted Chili-Corn Salsa", "4 oz", [80.0, 15.0, 1.5, 0.0, 0.0, 0.0, 330.0, 16.0, 3.0, 4.0, 3.0]),
    ("Tomatillo-Green Chili Salsa", "2 fl oz", [15.0, 5.0, 0.0, 0.0, 0.0, 0.0, 260.0, 4.0, 0.0, 2.0, 0.0]),
    ("Tomatillo-Red Chili Salsa", "2 fl oz", [30.0, 5.0, 0.0, 0.0, 0.0, 0.0, 500.0, 4.0, 1.0, 0.0, 0.0]),
    ("Cheese", "1 oz", [110.0, 70.0, 8.0, 5.0, 0.0, 30.0, 190.0, 1.0, 0.0, 0.0, 6.0]),
    ("Sour Cream", "2 oz", [110.0, 90.0, 9.0, 7.0, 0.0, 40.0, 30.0, 2.0, 0.0, 2.0, 2.0]),
    ("Guacamole (topping/side)", "4 oz", [230.0, 190.0, 22.0, 3.5, 0.0, 0.0, 370.0, 8.0, 6.0, 1.0, 2.0]),
    ("Guacamole (large)", "8 oz", [460.0, 380.0, 44.0, 7.0, 0.0, 0.0, 740.0, 16.0, 12.0, 2.0, 4.0]),
    ("Queso Blanco (entreé)", "2 oz", [120.0, 80.0, 9.0, 6.0, 0.0, 30.0, 250.0, 4.0, 0.0, 1.0, 5.0]),
    ("Queso Blanco (side)", "4 oz", [240.0, 170.0, 18.0, 12.0, 1.0, 60.0, 490.0, 7.0, 0.0, 2.0, 10.0]),
    ("Queso Blanco (large)", "8 oz", [480.0, 330.0, 37.0, 23.0, 1.5, 120.0, 980.0, 14.0, 0.5, 5.0, 20.0]),
    ("Supergreens Salad Mix", "3 oz", [15.0, 0.0, 0.0, 0.0, 0.0, 0.0, 15.0, 3.0, 2.0, 1.0, 1.0]),
    ("Romaine Lettuce (tacos)", "1 oz", [5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]),
    ("Chips (regular)", "4 oz", [540.0, 230.0, 25.0, 3.5, 0.0, 0.0, 390.0, 73.0, 7.0, 1.0, 7.0]),
    ("Chips (large)", "6 oz", [810.0, 350.0, 38.0, 5.0, 0.0, 0.0, 590.0, 110.0, 11.0, 2.0, 11.0]),
    ("Chipotle-Honey Vinaigrette", "2 fl oz", [220.0, 140.0, 16.0, 2.5, 0.0, 0.0, 850.0, 18.0, 1.0, 12.0, 1.0]),
];

fn chipotle_menu() -> Vec<FoodCandidate> {
    CHIPOTLE_MENU
        .iter()
        .map(|(name, portion, v)| {
            let nutrients = Nutrients {
                calories: Some(v[0]),
                calories_from_fat: Some(v[1]),
                total_fat_g: Some(v[2]),
                saturated_fat_g: Some(v[3]),
                trans_fat_g: Some(v[4]),
                cholesterol_mg: Some(v[5]),
                sodium_mg: Some(v[6]),
                total_carbohydrate_g: Some(v[7]),
                dietary_fiber_g: Some(v[8]),
                sugars_g: Some(v[9]),
                protein_g: Some(v[10]),
                ..Default::default()
            };
            FoodCandidate::new(*name, DataSource::RestaurantMenu)
                .with_restaurant(CHIPOTLE)
                .with_category("Mexican")
                .with_serving(*portion)
                .with_nutrients(nutrients)
        })
        .collect()
}
