/// User account endpoints
///
/// # Endpoints
///
/// - `POST /api/user/create` - Register a new user
/// - `POST /api/user/token` - Exchange email and password for tokens
/// - `POST /api/user/token/refresh` - Exchange a refresh token for an access token
/// - `GET /api/user/me` - Current user
/// - `PATCH /api/user/me` - Update any of email, password, name
/// - `PUT /api/user/me` - Update with email and password required

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, NON_FIELD_ERRORS},
    extract::Json,
};
use axum::{extract::State, http::StatusCode, Extension};
use recipe_shared::{
    auth::{context::AuthContext, jwt},
    models::user::{UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    #[serde(default)]
    pub name: String,
}

/// Public view of a user; never includes the password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Token request
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token for the `Authorization: Bearer` header
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Account update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

impl From<UpdateMeRequest> for UpdateUser {
    fn from(req: UpdateMeRequest) -> Self {
        UpdateUser {
            email: req.email,
            password: req.password,
            name: req.name,
        }
    }
}

/// Registers a user
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email, short password, or email already taken
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;

    let user = User::create_user_with_name(&state.db, &req.email, &req.password, req.name.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Issues an access and a refresh token for valid credentials
///
/// Unknown emails, wrong passwords and inactive accounts all produce the same
/// 400 response.
pub async fn create_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let invalid = || {
        ApiError::field(
            NON_FIELD_ERRORS,
            "Unable to authenticate with provided credentials.",
        )
    };

    if req.password.is_empty() {
        return Err(ApiError::field("password", "This field may not be blank."));
    }

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;

    if !user.check_password(&req.password) {
        tracing::info!(user_id = %user.id, "Rejected token request with wrong password");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let access_claims =
        jwt::Claims::with_expiration(user.id, jwt::TokenType::Access, state.config.access_ttl());
    let refresh_claims = jwt::Claims::new(user.id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
    }))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or the user is gone
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let (access_token, claims) = jwt::refresh_access_token(
        &req.refresh_token,
        state.jwt_secret(),
        state.config.access_ttl(),
    )?;

    let active = User::find_by_id(&state.db, claims.sub)
        .await?
        .is_some_and(|user| user.is_active);
    if !active {
        return Err(ApiError::Unauthorized("User not found or inactive.".to_string()));
    }

    Ok(Json(RefreshResponse { access_token }))
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(UserResponse::from(&user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;
    apply_update(&state, &auth, req).await
}

/// Full update; email and password must both be present
pub async fn replace_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let mut missing = Vec::new();
    if req.email.is_none() {
        missing.push("email");
    }
    if req.password.is_none() {
        missing.push("password");
    }
    if !missing.is_empty() {
        return Err(ApiError::required(&missing));
    }

    apply_update(&state, &auth, req).await
}

async fn apply_update(
    state: &AppState,
    auth: &AuthContext,
    req: UpdateMeRequest,
) -> ApiResult<Json<UserResponse>> {
    let user = User::update(&state.db, auth.user_id, req.into())
        .await?
        .ok_or_else(ApiError::not_found)?;

    tracing::info!(user_id = %user.id, "Updated user");
    Ok(Json(UserResponse::from(&user)))
}
