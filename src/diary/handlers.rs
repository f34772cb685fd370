use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{DailyNutritionSummary, EntriesQuery, WeightQuery},
    repo_types::{
        DiaryEntry, DiaryEntryPatch, DiaryFilter, NewDiaryEntry, NewWeightEntry, WeightEntry,
    },
    services::daily_summary,
};
use crate::{
    auth::{dto::MessageResponse, extractors::CurrentUser},
    dates::{self, parse_date},
    error::ApiError,
    extract::{record_id, require_non_blank, require_positive, AppJson, AppQuery},
    state::AppState,
    store::Owner,
};

const MAX_WEIGHT_LIMIT: i64 = 100;

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/diary/entries", post(create_entry).get(list_entries))
        .route("/diary/entries/:entry_id", put(update_entry).delete(delete_entry))
        .route("/diary/summary/:date", get(summary))
}

pub fn weight_routes() -> Router<AppState> {
    Router::new().route("/diary/weight", post(log_weight).get(weight_history))
}

fn date_param(raw: &str) -> Result<time::Date, ApiError> {
    parse_date(raw).ok_or_else(|| ApiError::validation("Invalid date format, expected YYYY-MM-DD"))
}

#[instrument(skip(state, user, new), fields(user_id = %user.user_id))]
pub async fn create_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(new): AppJson<NewDiaryEntry>,
) -> Result<Json<DiaryEntry>, ApiError> {
    require_non_blank("food_name", &new.food_name)?;
    require_non_blank("serving_unit", &new.serving_unit)?;
    require_positive("serving_size", new.serving_size)?;

    let entry = state
        .store
        .insert_diary_entry(&Owner::from(&user), new, dates::now_utc())
        .await?;
    info!(
        entry_id = %entry.entry_id,
        date = %entry.date,
        meal = %entry.meal_type,
        "diary entry logged"
    );
    Ok(Json(entry))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppQuery(q): AppQuery<EntriesQuery>,
) -> Result<Json<Vec<DiaryEntry>>, ApiError> {
    let filter = DiaryFilter {
        date: q.date_filter.as_deref().map(date_param).transpose()?,
        meal_type: q.meal_type,
    };
    let entries = state.store.list_diary_entries(&Owner::from(&user), filter).await?;
    Ok(Json(entries))
}

#[instrument(skip(state, user, patch), fields(user_id = %user.user_id))]
pub async fn update_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<String>,
    AppJson(patch): AppJson<DiaryEntryPatch>,
) -> Result<Json<DiaryEntry>, ApiError> {
    let entry_id = record_id(&entry_id, "Diary entry not found")?;
    if let Some(unit) = &patch.serving_unit {
        require_non_blank("serving_unit", unit)?;
    }
    if let Some(size) = patch.serving_size {
        require_positive("serving_size", size)?;
    }

    let owner = Owner::from(&user);
    let entry = if patch.is_empty() {
        state.store.find_diary_entry(&owner, entry_id).await?
    } else {
        state
            .store
            .update_diary_entry(&owner, entry_id, &patch, dates::now_utc())
            .await?
    };
    entry
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Diary entry not found"))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let entry_id = record_id(&entry_id, "Diary entry not found")?;
    if !state.store.delete_diary_entry(&Owner::from(&user), entry_id).await? {
        return Err(ApiError::not_found("Diary entry not found"));
    }
    info!(%entry_id, "diary entry deleted");
    Ok(Json(MessageResponse::new("Diary entry deleted successfully")))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(date): Path<String>,
) -> Result<Json<DailyNutritionSummary>, ApiError> {
    let date = date_param(&date)?;
    let entries = state
        .store
        .list_diary_entries(&Owner::from(&user), DiaryFilter::on(date))
        .await?;
    Ok(Json(daily_summary(date, entries)))
}

#[instrument(skip(state, user, new), fields(user_id = %user.user_id))]
pub async fn log_weight(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(new): AppJson<NewWeightEntry>,
) -> Result<Json<WeightEntry>, ApiError> {
    require_positive("weight", new.weight)?;
    let entry = state
        .store
        .insert_weight_entry(&Owner::from(&user), new, dates::now_utc())
        .await?;
    info!(entry_id = %entry.entry_id, date = %entry.date, "weight logged");
    Ok(Json(entry))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn weight_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppQuery(q): AppQuery<WeightQuery>,
) -> Result<Json<Vec<WeightEntry>>, ApiError> {
    if !(1..=MAX_WEIGHT_LIMIT).contains(&q.limit) {
        return Err(ApiError::validation(format!(
            "limit must be between 1 and {MAX_WEIGHT_LIMIT}"
        )));
    }
    let entries = state
        .store
        .list_weight_entries(&Owner::from(&user), q.limit)
        .await?;
    Ok(Json(entries))
}
