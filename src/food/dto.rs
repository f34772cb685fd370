use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::nutrition::NutritionInfo;

/// A food from the external database. Transient, never stored as such.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodItem {
    pub fdc_id: String,
    pub description: String,
    pub brand_owner: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub nutrition: NutritionInfo,
    pub food_category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodSearchResult {
    pub foods: Vec<FoodItem>,
    pub total_hits: u64,
    pub current_page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// One row of the "frequently logged" list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularFood {
    /// The food name; `_id` on the wire for client compatibility.
    #[serde(rename = "_id")]
    pub food_name: String,
    pub count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_used: OffsetDateTime,
    pub fdc_id: Option<String>,
    pub brand: Option<String>,
    pub nutrition: NutritionInfo,
}
