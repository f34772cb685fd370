use time::Date;

use super::{
    dto::{DailyNutritionSummary, MealBuckets},
    repo_types::DiaryEntry,
};
use crate::nutrition::NutritionInfo;

/// Totals and per-meal buckets for one day. Buckets are in creation order.
pub fn daily_summary(date: Date, mut entries: Vec<DiaryEntry>) -> DailyNutritionSummary {
    entries.sort_by_key(|e| e.created_at);

    let mut totals = NutritionInfo::default();
    let mut meals = MealBuckets::default();
    for entry in entries {
        totals += &entry.nutrition;
        meals.bucket_mut(entry.meal_type).push(entry);
    }

    DailyNutritionSummary {
        date,
        total_calories: totals.calories,
        total_protein: totals.protein,
        total_carbs: totals.carbs,
        total_fat: totals.fat,
        total_fiber: totals.fiber,
        total_sugar: totals.sugar,
        total_sodium: totals.sodium,
        meals,
    }
}
