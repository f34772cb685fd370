use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub user_id: Uuid,                 // application-generated ID
    pub username: String,              // unique, token subject
    pub email: String,                 // unique
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub height: Option<f64>,           // cm
    pub weight: Option<f64>,           // kg
    pub activity_level: Option<String>,
    pub goal: Option<String>,          // maintain, lose, gain
    pub target_calories: Option<i32>,
    #[serde(skip_serializing)]
    pub hashed_password: String,       // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Self-service profile fields. Used both at registration and for partial
/// updates, where `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub target_calories: Option<i32>,
}

impl ProfileFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl User {
    pub fn new(
        username: String,
        email: String,
        hashed_password: String,
        profile: ProfileFields,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            username,
            email,
            full_name: profile.full_name,
            age: profile.age,
            gender: profile.gender,
            height: profile.height,
            weight: profile.weight,
            activity_level: profile.activity_level.or_else(|| Some("sedentary".into())),
            goal: profile.goal.or_else(|| Some("maintain".into())),
            target_calories: profile.target_calories,
            hashed_password,
            created_at: now,
            updated_at: now,
        }
    }
}
