use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::{DiaryEntry, MealType};
use crate::dates::iso_date;

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_filter: Option<String>,
    #[serde(default)]
    pub meal_type: Option<MealType>,
}

#[derive(Debug, Deserialize)]
pub struct WeightQuery {
    #[serde(default = "default_weight_limit")]
    pub limit: i64,
}

fn default_weight_limit() -> i64 {
    30
}

#[derive(Debug, Default, Serialize)]
pub struct MealBuckets {
    pub breakfast: Vec<DiaryEntry>,
    pub lunch: Vec<DiaryEntry>,
    pub dinner: Vec<DiaryEntry>,
    pub snack: Vec<DiaryEntry>,
}

impl MealBuckets {
    pub fn bucket_mut(&mut self, meal: MealType) -> &mut Vec<DiaryEntry> {
        match meal {
            MealType::Breakfast => &mut self.breakfast,
            MealType::Lunch => &mut self.lunch,
            MealType::Dinner => &mut self.dinner,
            MealType::Snack => &mut self.snack,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DailyNutritionSummary {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub total_sugar: f64,
    pub total_sodium: f64,
    pub meals: MealBuckets,
}
