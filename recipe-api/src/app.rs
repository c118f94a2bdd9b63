/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use recipe_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = recipe_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use recipe_shared::{
    auth::context::{authenticate, AuthError},
    media::{LocalMediaStorage, MediaStorage},
    models::{ingredient::Ingredient, tag::Tag},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted image upload body
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned into every handler through axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Where uploaded images are written
    pub media: Arc<dyn MediaStorage>,
}

impl AppState {
    /// Creates state backed by local storage under `config.media.root`
    pub fn new(db: PgPool, config: Config) -> Self {
        let media = Arc::new(LocalMediaStorage::new(config.media.root.clone()));
        Self::with_media(db, config, media)
    }

    /// Creates state with a caller-provided storage backend
    pub fn with_media(db: PgPool, config: Config, media: Arc<dyn MediaStorage>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            media,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Public URL for a stored media path
    pub fn media_url(&self, relative_path: &str) -> String {
        recipe_shared::media::media_url(&self.config.media.url, relative_path)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── /health                               # Health check (public)
/// ├── /api/user/
/// │   ├── POST /create                      # Register (public)
/// │   ├── POST /token                       # Obtain tokens (public)
/// │   ├── POST /token/refresh               # Refresh access token (public)
/// │   └── GET|PATCH|PUT /me                 # Own account (authenticated)
/// ├── /api/recipe/                          # Authenticated
/// │   ├── GET|POST /recipes
/// │   ├── GET|PATCH|PUT|DELETE /recipes/:id
/// │   ├── POST /recipes/:id/upload-image
/// │   ├── GET /tags, GET|PATCH|PUT|DELETE /tags/:id
/// │   └── GET /ingredients, GET|PATCH|PUT|DELETE /ingredients/:id
/// └── /static/media/*                       # Stored images
/// ```
///
/// Middleware, outermost first: security headers, CORS, request tracing,
/// then JWT authentication on the protected groups.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{health, names, recipes, users};

    let health_routes = Router::new().route("/health", get(health::health_check));

    let public_user_routes = Router::new()
        .route("/create", post(users::create_user))
        .route("/token", post(users::create_token))
        .route("/token/refresh", post(users::refresh_token));

    let me_routes = Router::new()
        .route(
            "/me",
            get(users::get_me).patch(users::update_me).put(users::replace_me),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let recipe_routes = Router::new()
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/:id",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .put(recipes::replace_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipes/:id/upload-image",
            post(recipes::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/tags", get(names::list::<Tag>))
        .route(
            "/tags/:id",
            get(names::retrieve::<Tag>)
                .patch(names::update::<Tag>)
                .put(names::replace::<Tag>)
                .delete(names::destroy::<Tag>),
        )
        .route("/ingredients", get(names::list::<Ingredient>))
        .route(
            "/ingredients/:id",
            get(names::retrieve::<Ingredient>)
                .patch(names::update::<Ingredient>)
                .put(names::replace::<Ingredient>)
                .delete(names::destroy::<Ingredient>),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let media_service = ServeDir::new(state.config.media.root.clone());
    let media_prefix = state.config.media.url.trim_end_matches('/').to_string();

    Router::new()
        .merge(health_routes)
        .nest("/api/user", public_user_routes.merge(me_routes))
        .nest("/api/recipe", recipe_routes)
        .nest_service(&media_prefix, media_service)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Resolves the bearer token to an active user and inserts the resulting
/// `AuthContext` into the request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            AuthError::InvalidFormat("Authorization header is not valid ASCII".to_string())
        })?),
        None => None,
    };

    let auth_context = authenticate(&state.db, state.jwt_secret(), header_value).await?;

    tracing::debug!(user_id = %auth_context.user_id, "Authenticated request");
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
