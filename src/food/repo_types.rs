use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{nutrition::NutritionInfo, store::Owner};

/// Reusable user-defined food template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomFood {
    pub food_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
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
pub struct NewCustomFood {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub serving_size: f64,
    pub serving_unit: String,
    #[serde(default)]
    pub nutrition: NutritionInfo,
}

impl CustomFood {
    pub fn create(owner: &Owner, new: NewCustomFood, now: OffsetDateTime) -> Self {
        Self {
            food_id: Uuid::new_v4(),
            user_id: owner.id(),
            name: new.name,
            brand: new.brand,
            serving_size: new.serving_size,
            serving_unit: new.serving_unit,
            nutrition: new.nutrition,
            created_at: now,
            updated_at: now,
        }
    }
}
