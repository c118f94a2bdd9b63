/// Recipe endpoints
///
/// All routes are scoped to the authenticated user; another user's recipe
/// answers 404.
///
/// # Endpoints
///
/// - `GET /api/recipe/recipes` - List (`?tags=1,2&ingredients=3`)
/// - `POST /api/recipe/recipes` - Create
/// - `GET /api/recipe/recipes/:id` - Retrieve
/// - `PATCH /api/recipe/recipes/:id` - Partial update
/// - `PUT /api/recipe/recipes/:id` - Full update
/// - `DELETE /api/recipe/recipes/:id` - Delete
/// - `POST /api/recipe/recipes/:id/upload-image` - Upload image (multipart `image`)
///
/// # Request body
///
/// ```json
/// {
///   "title": "Thai Prawn Curry",
///   "time_minutes": 30,
///   "price": "2.50",
///   "link": "https://example.com/curry",
///   "description": "Sample description",
///   "tags": [{ "name": "Thai" }, { "name": "Dinner" }],
///   "ingredients": [{ "name": "Prawns" }]
/// }
/// ```
///
/// `tags` and `ingredients` hold names. Each name resolves to one of the
/// user's existing rows or creates it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Multipart, Path, Query},
    routes::names::NameResponse,
};
use axum::{extract::State, http::StatusCode, Extension};
use recipe_shared::{
    auth::context::AuthContext,
    media::{detect_image_format, recipe_image_path_for},
    models::recipe::{
        validate_price, NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeWithRelations,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// A tag or ingredient reference inside a recipe payload
#[derive(Debug, Clone, Deserialize)]
pub struct NameInput {
    pub name: String,
}

/// Recipe create/update payload
///
/// Every field is optional at the serde level; create and PUT check the
/// required ones explicitly so a missing field reports as a field error.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RecipePayload {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub title: Option<String>,

    pub time_minutes: Option<i32>,

    /// Accepts `"5.50"` or `5.5`
    pub price: Option<Decimal>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,

    pub description: Option<String>,

    pub tags: Option<Vec<NameInput>>,

    pub ingredients: Option<Vec<NameInput>>,
}

impl RecipePayload {
    /// Fields a create or full update must carry
    fn check_required(&self) -> ApiResult<()> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.time_minutes.is_none() {
            missing.push("time_minutes");
        }
        if self.price.is_none() {
            missing.push("price");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::required(&missing))
        }
    }

    /// Validates and normalizes into a partial update
    fn into_changes(self) -> ApiResult<RecipeChanges> {
        self.validate()?;

        let title = self.title.map(|title| title.trim().to_string());
        if title.as_deref() == Some("") {
            return Err(ApiError::field("title", "This field may not be blank."));
        }

        Ok(RecipeChanges {
            title,
            time_minutes: self.time_minutes,
            price: self.price.map(validate_price).transpose()?,
            link: self.link.map(|link| link.trim().to_string()),
            description: self.description,
            tags: names_of("tags", self.tags)?,
            ingredients: names_of("ingredients", self.ingredients)?,
        })
    }
}

/// Trims and checks each referenced name
fn names_of(field: &str, inputs: Option<Vec<NameInput>>) -> ApiResult<Option<Vec<String>>> {
    let Some(inputs) = inputs else {
        return Ok(None);
    };

    inputs
        .into_iter()
        .map(|input| {
            let name = input.name.trim().to_string();
            match name.chars().count() {
                0 => Err(ApiError::field(field, "Names may not be blank.")),
                1..=255 => Ok(name),
                _ => Err(ApiError::field(
                    field,
                    "Names may have no more than 255 characters.",
                )),
            }
        })
        .collect::<ApiResult<Vec<_>>>()
        .map(Some)
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    /// Comma-separated tag ids
    pub tags: Option<String>,

    /// Comma-separated ingredient ids
    pub ingredients: Option<String>,
}

impl RecipeListParams {
    pub fn filter(&self) -> ApiResult<RecipeFilter> {
        Ok(RecipeFilter {
            tags: parse_id_list("tags", self.tags.as_deref())?,
            ingredients: parse_id_list("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// Parses `"1,2,3"` into ids; empty segments are skipped
pub fn parse_id_list(field: &str, raw: Option<&str>) -> ApiResult<Vec<i64>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment.parse::<i64>().map_err(|_| {
                ApiError::field(field, format!("'{}' is not a valid id.", segment))
            })
        })
        .collect()
}

/// Recipe as it appears in lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,

    /// Decimal rendered as a string, e.g. `"5.50"`
    pub price: Decimal,

    pub link: String,
    pub tags: Vec<NameResponse>,
    pub ingredients: Vec<NameResponse>,
}

impl From<&RecipeWithRelations> for RecipeResponse {
    fn from(loaded: &RecipeWithRelations) -> Self {
        let recipe = &loaded.recipe;
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.clone(),
            tags: loaded.tags.iter().map(NameResponse::from_row).collect(),
            ingredients: loaded.ingredients.iter().map(NameResponse::from_row).collect(),
        }
    }
}

/// Recipe with description and image URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeDetailResponse {
    #[serde(flatten)]
    pub recipe: RecipeResponse,

    pub description: String,

    /// Public URL of the image, `null` without one
    pub image: Option<String>,
}

impl RecipeDetailResponse {
    fn new(state: &AppState, loaded: &RecipeWithRelations) -> Self {
        Self {
            recipe: RecipeResponse::from(loaded),
            description: loaded.recipe.description.clone(),
            image: image_url(state, &loaded.recipe),
        }
    }
}

/// Upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeImageResponse {
    pub id: i64,
    pub image: Option<String>,
}

fn image_url(state: &AppState, recipe: &Recipe) -> Option<String> {
    recipe.image.as_deref().map(|path| state.media_url(path))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<RecipeListParams>,
) -> ApiResult<Json<Vec<RecipeResponse>>> {
    let filter = params.filter()?;
    let recipes = Recipe::list_for_user(&state.db, auth.user_id, &filter).await?;

    Ok(Json(recipes.iter().map(RecipeResponse::from).collect()))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<RecipePayload>,
) -> ApiResult<(StatusCode, Json<RecipeDetailResponse>)> {
    payload.check_required()?;
    let changes = payload.into_changes()?;

    let (Some(title), Some(time_minutes), Some(price)) =
        (changes.title, changes.time_minutes, changes.price)
    else {
        return Err(ApiError::required(&["title", "time_minutes", "price"]));
    };

    let data = NewRecipe {
        title,
        time_minutes,
        price,
        link: changes.link.unwrap_or_default(),
        description: changes.description.unwrap_or_default(),
        tags: changes.tags.unwrap_or_default(),
        ingredients: changes.ingredients.unwrap_or_default(),
    };

    let created = Recipe::create(&state.db, auth.user_id, data).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecipeDetailResponse::new(&state, &created)),
    ))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let loaded = Recipe::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(RecipeDetailResponse::new(&state, &loaded)))
}

/// Partial update
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<RecipePayload>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let changes = payload.into_changes()?;
    apply_changes(&state, &auth, id, changes).await
}

/// Full update; title, time_minutes and price are required
pub async fn replace_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<RecipePayload>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    payload.check_required()?;
    let changes = payload.into_changes()?;
    apply_changes(&state, &auth, id, changes).await
}

async fn apply_changes(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    changes: RecipeChanges,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let updated = Recipe::update(&state.db, id, auth.user_id, changes)
        .await?
        .ok_or_else(ApiError::not_found)?;

    tracing::info!(recipe_id = id, user_id = %auth.user_id, "Updated recipe");
    Ok(Json(RecipeDetailResponse::new(state, &updated)))
}

/// Deletes the recipe and its stored image
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deleted = Recipe::delete_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if let Some(image) = deleted.image.as_deref() {
        remove_stored_image(&state, image).await;
    }

    tracing::info!(recipe_id = id, user_id = %auth.user_id, "Deleted recipe");
    Ok(StatusCode::NO_CONTENT)
}

/// Stores an uploaded image and points the recipe at it
///
/// # Errors
///
/// - `400 Bad Request`: No `image` field, an empty file, or not an image
/// - `404 Not Found`: No such recipe for this user
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Multipart(mut multipart): Multipart,
) -> ApiResult<Json<RecipeImageResponse>> {
    if Recipe::find_for_user(&state.db, id, auth.user_id).await?.is_none() {
        return Err(ApiError::not_found());
    }

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        upload = Some(field.bytes().await?);
        break;
    }

    let bytes = upload.ok_or_else(|| ApiError::field(IMAGE_FIELD, "No file was submitted."))?;

    if bytes.is_empty() {
        return Err(ApiError::field(IMAGE_FIELD, "The submitted file is empty."));
    }

    let format = detect_image_format(&bytes).ok_or_else(|| {
        ApiError::field(
            IMAGE_FIELD,
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        )
    })?;

    // Extension follows the content; the client's file name is ignored
    let relative_path = recipe_image_path_for(format);

    state.media.save(&relative_path, &bytes).await?;

    let Some((recipe, previous)) =
        Recipe::set_image(&state.db, id, auth.user_id, &relative_path).await?
    else {
        // Deleted between the lookup and the update
        remove_stored_image(&state, &relative_path).await;
        return Err(ApiError::not_found());
    };

    if let Some(previous) = previous.as_deref().filter(|path| *path != relative_path) {
        remove_stored_image(&state, previous).await;
    }

    tracing::info!(
        recipe_id = recipe.id,
        path = %relative_path,
        content_type = format.content_type(),
        size = bytes.len(),
        "Stored recipe image"
    );

    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image: image_url(&state, &recipe),
    }))
}

/// Best-effort removal; a leftover file is logged, never surfaced
async fn remove_stored_image(state: &AppState, relative_path: &str) {
    if let Err(e) = state.media.delete(relative_path).await {
        tracing::warn!(path = %relative_path, error = %e, "Failed to remove recipe image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn payload(json: serde_json::Value) -> RecipePayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("tags", None).unwrap(), Vec::<i64>::new());
        assert_eq!(parse_id_list("tags", Some("1,2")).unwrap(), vec![1, 2]);
        assert_eq!(parse_id_list("tags", Some(" 3 , ,4,")).unwrap(), vec![3, 4]);
        assert!(parse_id_list("tags", Some("1,abc")).is_err());
    }

    #[test]
    fn test_price_accepts_string_and_number() {
        let changes = payload(serde_json::json!({ "price": "5.50" }))
            .into_changes()
            .unwrap();
        assert_eq!(changes.price.unwrap().to_string(), "5.50");

        let changes = payload(serde_json::json!({ "price": 5.5 }))
            .into_changes()
            .unwrap();
        assert_eq!(changes.price.unwrap().to_string(), "5.50");
    }

    #[test]
    fn test_price_out_of_range_is_rejected() {
        assert!(payload(serde_json::json!({ "price": "1000.00" }))
            .into_changes()
            .is_err());
        assert!(payload(serde_json::json!({ "price": "1.234" }))
            .into_changes()
            .is_err());
    }

    #[test]
    fn test_check_required_lists_missing_fields() {
        match payload(serde_json::json!({ "title": "Only a title" })).check_required() {
            Err(ApiError::ValidationError(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["time_minutes", "price"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_absent_tags_differ_from_empty_tags() {
        let changes = payload(serde_json::json!({ "title": "A" })).into_changes().unwrap();
        assert_eq!(changes.tags, None);

        let changes = payload(serde_json::json!({ "tags": [] })).into_changes().unwrap();
        assert_eq!(changes.tags, Some(Vec::new()));

        let changes = payload(serde_json::json!({ "tags": [{ "name": " Lunch " }] }))
            .into_changes()
            .unwrap();
        assert_eq!(changes.tags, Some(vec!["Lunch".to_string()]));
    }

    #[test]
    fn test_blank_names_are_rejected() {
        assert!(payload(serde_json::json!({ "ingredients": [{ "name": "  " }] }))
            .into_changes()
            .is_err());
        assert!(payload(serde_json::json!({ "title": "   " }))
            .into_changes()
            .is_err());
    }

    #[test]
    fn test_detail_response_flattens_list_fields() {
        let response = RecipeDetailResponse {
            recipe: RecipeResponse {
                id: 1,
                title: "Sample recipe".to_string(),
                time_minutes: 22,
                price: Decimal::from_str("5.25").unwrap(),
                link: "http://example.com/recipe.pdf".to_string(),
                tags: vec![],
                ingredients: vec![],
            },
            description: "Sample description".to_string(),
            image: None,
        };

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["title"], "Sample recipe");
        assert_eq!(json["price"], "5.25");
        assert_eq!(json["description"], "Sample description");
        assert!(json["image"].is_null());
    }
}
