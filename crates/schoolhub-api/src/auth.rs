use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};
use uuid::Uuid;

use schoolhub_db::Database;
use schoolhub_db::queries::NewUser;
use schoolhub_gateway::Hub;
use schoolhub_gateway::credential::issue_token;
use schoolhub_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use schoolhub_types::models::Role;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub hub: Hub,
    pub token_ttl: chrono::Duration,
}

/// Register a student account. Director accounts are only created by
/// [`seed_director`].
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let fields = [&req.first_name, &req.last_name, &req.grade, &req.login];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Check if login is taken
    if state
        .hub
        .db()
        .get_user_by_login(req.login.trim())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some()
    {
        return Err(StatusCode::CONFLICT);
    }

    let password_hash = hash_password(&req.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let user_id = Uuid::new_v4().to_string();

    state
        .hub
        .db()
        .create_user(&NewUser {
            id: &user_id,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            grade: req.grade.trim(),
            login: req.login.trim(),
            password_hash: &password_hash,
            role: Role::Student.as_str(),
        })
        .map_err(|e| {
            error!("Failed to create user: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let response = auth_response(&state, &user_id)?;
    info!("Registered {} {}", response.user.first_name, response.user.last_name);

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .hub
        .db()
        .get_user_by_login(req.login.trim())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(Json(auth_response(&state, &user.id)?))
}

/// Create the director account unless a user with `login` already exists.
/// Returns whether an account was created.
pub fn seed_director(db: &Database, login: &str, password: &str) -> anyhow::Result<bool> {
    if db.get_user_by_login(login)?.is_some() {
        info!("Director account already exists");
        return Ok(false);
    }

    let password_hash = hash_password(password)?;
    db.create_user(&NewUser {
        id: &Uuid::new_v4().to_string(),
        first_name: "Director",
        last_name: "Admin",
        grade: "Administration",
        login,
        password_hash: &password_hash,
        role: Role::Director.as_str(),
    })?;

    info!("Director account created successfully");
    Ok(true)
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn auth_response(state: &AppStateInner, user_id: &str) -> Result<AuthResponse, StatusCode> {
    let profile = state
        .hub
        .db()
        .get_user_by_id(user_id)
        .and_then(|row| row.ok_or_else(|| anyhow::anyhow!("user {} vanished", user_id)))
        .and_then(|row| row.profile())
        .map_err(|e| {
            error!("Failed to load profile: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let token = issue_token(state.hub.jwt_secret(), profile.id, profile.role, state.token_ttl)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(AuthResponse { token, user: profile })
}
