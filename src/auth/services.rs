use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::RegisterRequest,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo_types::User,
};
use crate::{dates, error::ApiError, store::Store};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Validates, checks uniqueness of username then email, hashes and persists.
pub async fn register_user(store: &dyn Store, req: RegisterRequest) -> Result<User, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("Password too short"));
    }

    if store.find_user_by_username(&username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(ApiError::Conflict("Username already registered".into()));
    }
    if store.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hashed = hash_password(&req.password)?;
    let user = User::new(username, email, hashed, req.profile, dates::now_utc());
    // unique constraints still catch a concurrent registration
    store.insert_user(&user).await?;

    info!(user_id = %user.user_id, username = %user.username, "user registered");
    Ok(user)
}

/// Unknown user and wrong password are reported identically.
pub async fn authenticate(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<User, ApiError> {
    let invalid = || ApiError::unauthorized("Incorrect username or password");

    let Some(user) = store.find_user_by_username(username.trim()).await? else {
        warn!(%username, "login unknown username");
        return Err(invalid());
    };
    if !verify_password(password, &user.hashed_password)? {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err(invalid());
    }
    Ok(user)
}

/// Verifies the token and loads its subject. Any failure is `Unauthorized`.
pub async fn resolve_current_user(
    store: &dyn Store,
    keys: &JwtKeys,
    token: &str,
) -> Result<User, ApiError> {
    let credentials = || ApiError::unauthorized("Could not validate credentials");

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        credentials()
    })?;
    match store.find_user_by_username(&claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            warn!(username = %claims.sub, "token subject no longer exists");
            Err(credentials())
        }
    }
}
