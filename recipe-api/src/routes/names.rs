/// Tag and ingredient endpoints
///
/// Tags and ingredients share one set of handlers, instantiated per model in
/// the router (`names::list::<Tag>`, `names::list::<Ingredient>`, ...).
/// Rows are only ever created as a side effect of recipe writes, so there is
/// no create endpoint.
///
/// # Endpoints
///
/// - `GET /api/recipe/{tags,ingredients}` - List, name descending
/// - `GET /api/recipe/{tags,ingredients}/:id` - Retrieve
/// - `PATCH /api/recipe/{tags,ingredients}/:id` - Rename (name optional)
/// - `PUT /api/recipe/{tags,ingredients}/:id` - Rename (name required)
/// - `DELETE /api/recipe/{tags,ingredients}/:id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use recipe_shared::{
    auth::context::AuthContext,
    models::owned_name::{self, OwnedName},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Tag or ingredient as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameResponse {
    pub id: i64,
    pub name: String,
}

impl NameResponse {
    pub fn from_row<T: OwnedName>(row: &T) -> Self {
        Self {
            id: row.id(),
            name: row.name().to_string(),
        }
    }
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// `1` to return only rows attached to at least one recipe
    pub assigned_only: Option<String>,
}

impl ListParams {
    /// Interprets `assigned_only` as an integer flag; absent means false
    pub fn assigned_only(&self) -> ApiResult<bool> {
        match self.assigned_only.as_deref().map(str::trim) {
            None | Some("") => Ok(false),
            Some(raw) => raw
                .parse::<i64>()
                .map(|value| value != 0)
                .map_err(|_| ApiError::field("assigned_only", "A valid integer is required.")),
        }
    }
}

/// Rename payload
#[derive(Debug, Deserialize, Validate)]
pub struct NamePayload {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters."))]
    pub name: Option<String>,
}

impl NamePayload {
    fn trimmed(self) -> Option<String> {
        self.name.map(|name| name.trim().to_string())
    }
}

pub async fn list<T: OwnedName>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<NameResponse>>> {
    let assigned_only = params.assigned_only()?;
    let rows: Vec<T> = owned_name::list_for_user(&state.db, auth.user_id, assigned_only).await?;

    Ok(Json(rows.iter().map(NameResponse::from_row).collect()))
}

pub async fn retrieve<T: OwnedName>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<NameResponse>> {
    let row: T = owned_name::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(NameResponse::from_row(&row)))
}

/// Partial update; an absent name returns the row unchanged
pub async fn update<T: OwnedName>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<NamePayload>,
) -> ApiResult<Json<NameResponse>> {
    payload.validate()?;

    let row: T = match payload.trimmed() {
        Some(name) => rename(&state, &auth, id, &name).await?,
        None => owned_name::find_for_user(&state.db, id, auth.user_id)
            .await?
            .ok_or_else(ApiError::not_found)?,
    };

    Ok(Json(NameResponse::from_row(&row)))
}

/// Full update; the name is required
pub async fn replace<T: OwnedName>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<NamePayload>,
) -> ApiResult<Json<NameResponse>> {
    payload.validate()?;

    let name = payload
        .trimmed()
        .ok_or_else(|| ApiError::field("name", "This field is required."))?;
    let row: T = rename(&state, &auth, id, &name).await?;

    Ok(Json(NameResponse::from_row(&row)))
}

pub async fn destroy<T: OwnedName>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !owned_name::delete_for_user::<T>(&state.db, id, auth.user_id).await? {
        return Err(ApiError::not_found());
    }

    tracing::info!(kind = T::TABLE.label, id, user_id = %auth.user_id, "Deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn rename<T: OwnedName>(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    name: &str,
) -> ApiResult<T> {
    if name.is_empty() {
        return Err(ApiError::field("name", "This field may not be blank."));
    }

    let row = owned_name::rename(&state.db, id, auth.user_id, name)
        .await?
        .ok_or_else(ApiError::not_found)?;

    tracing::info!(kind = T::TABLE.label, id, user_id = %auth.user_id, "Renamed");
    Ok(row)
}
