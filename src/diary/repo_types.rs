use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{dates::iso_date, nutrition::NutritionInfo, store::Owner};

/// Meal slot of a diary entry. Closed set; anything else is rejected on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown meal type {0:?}")]
pub struct UnknownMealType(String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(UnknownMealType(other.to_string())),
        }
    }
}

/// One logged food consumption. `nutrition` is a snapshot taken at logging time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meal_type: MealType,
    pub fdc_id: Option<String>,
    pub food_name: String,
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub nutrition: NutritionInfo,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDiaryEntry {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meal_type: MealType,
    #[serde(default)]
    pub fdc_id: Option<String>,
    pub food_name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    #[serde(default)]
    pub nutrition: NutritionInfo,
}

/// Partial update of a diary entry. Only serving and nutrition are mutable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiaryEntryPatch {
    #[serde(default)]
    pub serving_size: Option<f64>,
    #[serde(default)]
    pub serving_unit: Option<String>,
    #[serde(default)]
    pub nutrition: Option<NutritionInfo>,
}

impl DiaryEntryPatch {
    pub fn is_empty(&self) -> bool {
        self.serving_size.is_none() && self.serving_unit.is_none() && self.nutrition.is_none()
    }
}

/// Criteria for listing diary entries; the owner is always implied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiaryFilter {
    pub date: Option<Date>,
    pub meal_type: Option<MealType>,
}

impl DiaryFilter {
    pub fn on(date: Date) -> Self {
        Self {
            date: Some(date),
            meal_type: None,
        }
    }
}

impl DiaryEntry {
    pub fn create(owner: &Owner, new: NewDiaryEntry, now: OffsetDateTime) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            user_id: owner.id(),
            date: new.date,
            meal_type: new.meal_type,
            fdc_id: new.fdc_id,
            food_name: new.food_name,
            brand: new.brand,
            serving_size: new.serving_size,
            serving_unit: new.serving_unit,
            nutrition: new.nutrition,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body-weight log entry. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub weight: f64, // kg
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWeightEntry {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub weight: f64,
}

impl WeightEntry {
    pub fn create(owner: &Owner, new: NewWeightEntry, now: OffsetDateTime) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            user_id: owner.id(),
            date: new.date,
            weight: new.weight,
            created_at: now,
        }
    }
}
