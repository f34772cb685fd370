use std::ops::AddAssign;

use serde::{Deserialize, Deserializer, Serialize};

/// Nutrient snapshot embedded in diary entries, custom foods and lookups.
/// Absent or `null` values read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub calories: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub protein: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fat: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fiber: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub sugar: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub sodium: f64,
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

impl AddAssign<&NutritionInfo> for NutritionInfo {
    fn add_assign(&mut self, rhs: &NutritionInfo) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
        self.fiber += rhs.fiber;
        self.sugar += rhs.sugar;
        self.sodium += rhs.sodium;
    }
}
