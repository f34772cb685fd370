use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginForm, MessageResponse, RegisterRequest, RegisterResponse, TokenResponse},
        extractors::CurrentUser,
        repo_types::{ProfileFields, User},
        services::{authenticate, register_user},
    },
    dates,
    error::ApiError,
    extract::{AppForm, AppJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me).put(update_me))
        .route("/protected", get(protected))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let user = register_user(state.store.as_ref(), payload).await?;
    Ok(Json(RegisterResponse {
        message: "User created successfully".into(),
        user_id: user.user_id,
    }))
}

#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = authenticate(state.store.as_ref(), &form.username, &form.password).await?;
    let access_token = state.jwt.sign(&user.username)?;

    info!(user_id = %user.user_id, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[instrument(skip(state, user, patch), fields(user_id = %user.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(patch): AppJson<ProfileFields>,
) -> Result<Json<User>, ApiError> {
    if patch.is_empty() {
        return Ok(Json(user));
    }
    let updated = state
        .store
        .update_user(user.user_id, &patch, dates::now_utc())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;
    info!("profile updated");
    Ok(Json(updated))
}

#[instrument(skip_all)]
pub async fn protected(CurrentUser(user): CurrentUser) -> Json<MessageResponse> {
    Json(MessageResponse::new(format!(
        "Hello {}, this is a protected route!",
        user.username
    )))
}
