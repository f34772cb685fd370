use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::{Owner, Store, StoreError, StoreResult};
use crate::{
    auth::repo_types::{ProfileFields, User},
    diary::repo_types::{
        DiaryEntry, DiaryEntryPatch, DiaryFilter, MealType, NewDiaryEntry, NewWeightEntry,
        WeightEntry,
    },
    food::{
        dto::PopularFood,
        repo_types::{CustomFood, NewCustomFood},
    },
    nutrition::NutritionInfo,
};

const USER_COLUMNS: &str = "user_id, username, email, full_name, age, gender, height, weight, \
     activity_level, goal, target_calories, hashed_password, created_at, updated_at";

const DIARY_COLUMNS: &str = "entry_id, user_id, date, meal_type, fdc_id, food_name, brand, \
     serving_size, serving_unit, nutrition, created_at, updated_at";

const CUSTOM_FOOD_COLUMNS: &str = "food_id, user_id, name, brand, serving_size, serving_unit, \
     nutrition, created_at, updated_at";

/// Postgres-backed store. Identifiers are generated by the application, never
/// by the database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct DiaryEntryRow {
    entry_id: Uuid,
    user_id: Uuid,
    date: Date,
    meal_type: String,
    fdc_id: Option<String>,
    food_name: String,
    brand: Option<String>,
    serving_size: f64,
    serving_unit: String,
    nutrition: Json<NutritionInfo>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<DiaryEntryRow> for DiaryEntry {
    type Error = sqlx::Error;

    fn try_from(r: DiaryEntryRow) -> Result<Self, Self::Error> {
        let meal_type = r
            .meal_type
            .parse::<MealType>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Self {
            entry_id: r.entry_id,
            user_id: r.user_id,
            date: r.date,
            meal_type,
            fdc_id: r.fdc_id,
            food_name: r.food_name,
            brand: r.brand,
            serving_size: r.serving_size,
            serving_unit: r.serving_unit,
            nutrition: r.nutrition.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CustomFoodRow {
    food_id: Uuid,
    user_id: Uuid,
    name: String,
    brand: Option<String>,
    serving_size: f64,
    serving_unit: String,
    nutrition: Json<NutritionInfo>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CustomFoodRow> for CustomFood {
    fn from(r: CustomFoodRow) -> Self {
        Self {
            food_id: r.food_id,
            user_id: r.user_id,
            name: r.name,
            brand: r.brand,
            serving_size: r.serving_size,
            serving_unit: r.serving_unit,
            nutrition: r.nutrition.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WeightEntryRow {
    entry_id: Uuid,
    user_id: Uuid,
    date: Date,
    weight: f64,
    created_at: OffsetDateTime,
}

impl From<WeightEntryRow> for WeightEntry {
    fn from(r: WeightEntryRow) -> Self {
        Self {
            entry_id: r.entry_id,
            user_id: r.user_id,
            date: r.date,
            weight: r.weight,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PopularFoodRow {
    food_name: String,
    count: i64,
    last_used: OffsetDateTime,
    fdc_id: Option<String>,
    brand: Option<String>,
    nutrition: Json<NutritionInfo>,
}

impl From<PopularFoodRow> for PopularFood {
    fn from(r: PopularFoodRow) -> Self {
        Self {
            food_name: r.food_name,
            count: r.count.max(0) as u64,
            last_used: r.last_used,
            fdc_id: r.fdc_id,
            brand: r.brand,
            nutrition: r.nutrition.0,
        }
    }
}

/// Maps unique-constraint violations on `users` to a conflict on the field.
fn user_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => StoreError::Conflict("Email"),
                _ => StoreError::Conflict("Username"),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, full_name, age, gender, height, weight,
                               activity_level, goal, target_calories, hashed_password,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.age)
        .bind(&user.gender)
        .bind(user.height)
        .bind(user.weight)
        .bind(&user.activity_level)
        .bind(&user.goal)
        .bind(user.target_calories)
        .bind(&user.hashed_password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(user_insert_error)?;
        Ok(())
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        patch: &ProfileFields,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET full_name       = COALESCE($2, full_name),
                   age             = COALESCE($3, age),
                   gender          = COALESCE($4, gender),
                   height          = COALESCE($5, height),
                   weight          = COALESCE($6, weight),
                   activity_level  = COALESCE($7, activity_level),
                   goal            = COALESCE($8, goal),
                   target_calories = COALESCE($9, target_calories),
                   updated_at      = $10
             WHERE user_id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&patch.full_name)
        .bind(patch.age)
        .bind(&patch.gender)
        .bind(patch.height)
        .bind(patch.weight)
        .bind(&patch.activity_level)
        .bind(&patch.goal)
        .bind(patch.target_calories)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_diary_entry(
        &self,
        owner: &Owner,
        new: NewDiaryEntry,
        now: OffsetDateTime,
    ) -> StoreResult<DiaryEntry> {
        let entry = DiaryEntry::create(owner, new, now);
        sqlx::query(
            r#"
            INSERT INTO diary_entries (entry_id, user_id, date, meal_type, fdc_id, food_name,
                                       brand, serving_size, serving_unit, nutrition,
                                       created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.entry_id)
        .bind(owner.id())
        .bind(entry.date)
        .bind(entry.meal_type.as_str())
        .bind(&entry.fdc_id)
        .bind(&entry.food_name)
        .bind(&entry.brand)
        .bind(entry.serving_size)
        .bind(&entry.serving_unit)
        .bind(Json(entry.nutrition))
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_diary_entries(
        &self,
        owner: &Owner,
        filter: DiaryFilter,
    ) -> StoreResult<Vec<DiaryEntry>> {
        let rows = sqlx::query_as::<_, DiaryEntryRow>(&format!(
            r#"
            SELECT {DIARY_COLUMNS}
              FROM diary_entries
             WHERE user_id = $1
               AND ($2::date IS NULL OR date = $2)
               AND ($3::text IS NULL OR meal_type = $3)
             ORDER BY created_at DESC
            "#
        ))
        .bind(owner.id())
        .bind(filter.date)
        .bind(filter.meal_type.map(|m| m.as_str()))
        .fetch_all(&self.pool)
        .await?;
        let entries = rows
            .into_iter()
            .map(DiaryEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn find_diary_entry(
        &self,
        owner: &Owner,
        entry_id: Uuid,
    ) -> StoreResult<Option<DiaryEntry>> {
        let row = sqlx::query_as::<_, DiaryEntryRow>(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary_entries WHERE entry_id = $1 AND user_id = $2"
        ))
        .bind(entry_id)
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DiaryEntry::try_from).transpose()?)
    }

    async fn update_diary_entry(
        &self,
        owner: &Owner,
        entry_id: Uuid,
        patch: &DiaryEntryPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<DiaryEntry>> {
        let row = sqlx::query_as::<_, DiaryEntryRow>(&format!(
            r#"
            UPDATE diary_entries
               SET serving_size = COALESCE($3, serving_size),
                   serving_unit = COALESCE($4, serving_unit),
                   nutrition    = COALESCE($5, nutrition),
                   updated_at   = $6
             WHERE entry_id = $1 AND user_id = $2
            RETURNING {DIARY_COLUMNS}
            "#
        ))
        .bind(entry_id)
        .bind(owner.id())
        .bind(patch.serving_size)
        .bind(&patch.serving_unit)
        .bind(patch.nutrition.map(Json))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DiaryEntry::try_from).transpose()?)
    }

    async fn delete_diary_entry(&self, owner: &Owner, entry_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM diary_entries WHERE entry_id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(owner.id())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn popular_foods(&self, owner: &Owner, limit: i64) -> StoreResult<Vec<PopularFood>> {
        // rn = 1 is the first-seen entry of each name; it supplies the snapshot
        let rows = sqlx::query_as::<_, PopularFoodRow>(
            r#"
            WITH grouped AS (
                SELECT food_name, fdc_id, brand, nutrition, created_at,
                       count(*)        OVER (PARTITION BY food_name) AS count,
                       max(created_at) OVER (PARTITION BY food_name) AS last_used,
                       row_number()    OVER (PARTITION BY food_name
                                             ORDER BY created_at, entry_id) AS rn
                  FROM diary_entries
                 WHERE user_id = $1
            )
            SELECT food_name, count, last_used, fdc_id, brand, nutrition
              FROM grouped
             WHERE rn = 1
             ORDER BY count DESC, created_at ASC
             LIMIT $2
            "#,
        )
        .bind(owner.id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PopularFood::from).collect())
    }

    async fn insert_custom_food(
        &self,
        owner: &Owner,
        new: NewCustomFood,
        now: OffsetDateTime,
    ) -> StoreResult<CustomFood> {
        let food = CustomFood::create(owner, new, now);
        sqlx::query(
            r#"
            INSERT INTO custom_foods (food_id, user_id, name, brand, serving_size, serving_unit,
                                      nutrition, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(food.food_id)
        .bind(owner.id())
        .bind(&food.name)
        .bind(&food.brand)
        .bind(food.serving_size)
        .bind(&food.serving_unit)
        .bind(Json(food.nutrition))
        .bind(food.created_at)
        .bind(food.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(food)
    }

    async fn list_custom_foods(&self, owner: &Owner) -> StoreResult<Vec<CustomFood>> {
        let rows = sqlx::query_as::<_, CustomFoodRow>(&format!(
            "SELECT {CUSTOM_FOOD_COLUMNS} FROM custom_foods \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CustomFood::from).collect())
    }

    async fn delete_custom_food(&self, owner: &Owner, food_id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM custom_foods WHERE food_id = $1 AND user_id = $2")
            .bind(food_id)
            .bind(owner.id())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_weight_entry(
        &self,
        owner: &Owner,
        new: NewWeightEntry,
        now: OffsetDateTime,
    ) -> StoreResult<WeightEntry> {
        let entry = WeightEntry::create(owner, new, now);
        sqlx::query(
            r#"
            INSERT INTO weight_entries (entry_id, user_id, date, weight, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.entry_id)
        .bind(owner.id())
        .bind(entry.date)
        .bind(entry.weight)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_weight_entries(
        &self,
        owner: &Owner,
        limit: i64,
    ) -> StoreResult<Vec<WeightEntry>> {
        let rows = sqlx::query_as::<_, WeightEntryRow>(
            r#"
            SELECT entry_id, user_id, date, weight, created_at
              FROM weight_entries
             WHERE user_id = $1
             ORDER BY date DESC, created_at DESC
             LIMIT $2
            "#,
        )
        .bind(owner.id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WeightEntry::from).collect())
    }
}
