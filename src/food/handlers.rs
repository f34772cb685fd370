use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{FoodItem, FoodSearchResult, PopularFood, SearchQuery},
    repo_types::{CustomFood, NewCustomFood},
};
use crate::{
    auth::{dto::MessageResponse, extractors::CurrentUser},
    dates,
    error::ApiError,
    extract::{record_id, require_non_blank, require_positive, AppJson, AppQuery},
    state::AppState,
    store::Owner,
};

const MAX_PAGE_SIZE: u32 = 100;
const POPULAR_LIMIT: i64 = 10;

pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/food/search", get(search_foods))
        .route("/food/details/:fdc_id", get(food_details))
        .route("/food/popular", get(popular))
}

pub fn custom_routes() -> Router<AppState> {
    Router::new()
        .route("/food/custom", post(create_custom_food).get(list_custom_foods))
        .route("/food/custom/:food_id", delete(delete_custom_food))
}

#[instrument(skip(state, _user))]
pub async fn search_foods(
    State(state): State<AppState>,
    _user: CurrentUser,
    AppQuery(q): AppQuery<SearchQuery>,
) -> Result<Json<FoodSearchResult>, ApiError> {
    require_non_blank("query", &q.query)?;
    if q.page < 1 {
        return Err(ApiError::validation("page must be at least 1"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&q.page_size) {
        return Err(ApiError::validation(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let result = state.foods.search(q.query.trim(), q.page, q.page_size).await?;
    Ok(Json(result))
}

#[instrument(skip(state, _user))]
pub async fn food_details(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(fdc_id): Path<String>,
) -> Result<Json<FoodItem>, ApiError> {
    // FDC ids are numeric; don't forward anything else upstream
    if fdc_id.is_empty() || !fdc_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::not_found("Food not found"));
    }
    state
        .foods
        .details(&fdc_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Food not found"))
}

#[instrument(skip_all)]
pub async fn popular(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<PopularFood>>, ApiError> {
    let foods = state
        .store
        .popular_foods(&Owner::from(&user), POPULAR_LIMIT)
        .await?;
    Ok(Json(foods))
}

#[instrument(skip(state, user, new), fields(user_id = %user.user_id))]
pub async fn create_custom_food(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(new): AppJson<NewCustomFood>,
) -> Result<Json<CustomFood>, ApiError> {
    require_non_blank("name", &new.name)?;
    require_non_blank("serving_unit", &new.serving_unit)?;
    require_positive("serving_size", new.serving_size)?;

    let food = state
        .store
        .insert_custom_food(&Owner::from(&user), new, dates::now_utc())
        .await?;
    info!(food_id = %food.food_id, "custom food created");
    Ok(Json(food))
}

#[instrument(skip_all)]
pub async fn list_custom_foods(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CustomFood>>, ApiError> {
    let foods = state.store.list_custom_foods(&Owner::from(&user)).await?;
    Ok(Json(foods))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn delete_custom_food(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(food_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let food_id = record_id(&food_id, "Custom food not found")?;
    if !state.store.delete_custom_food(&Owner::from(&user), food_id).await? {
        return Err(ApiError::not_found("Custom food not found"));
    }
    info!(%food_id, "custom food deleted");
    Ok(Json(MessageResponse::new("Custom food deleted successfully")))
}
