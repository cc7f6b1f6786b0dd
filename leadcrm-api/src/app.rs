/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use leadcrm_api::{app::{build_router, AppState}, config::Config};
/// use leadcrm_shared::notify::LogNotifier;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config, Arc::new(LogNotifier)));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::{require_actor, require_organizer},
        security::{security_headers, SecurityHeaders},
    },
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use leadcrm_shared::notify::{self, Notification, Notifier};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    /// Outgoing mail
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            notifier,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Sends a notification in the background
    pub fn notify(&self, notification: Notification) {
        notify::dispatch(self.notifier.clone(), notification);
    }
}

/// Builds the router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1
///     ├── /auth          signup, login, refresh (public)
///     ├── /leads         list, create, detail, update, delete, assign, category
///     ├── /categories    list, create, detail, rename, delete
///     └── /agents        list, invite, detail, update, delete
/// ```
///
/// Everything below `/v1` except `/auth` requires a bearer access token.
/// Mutating lead and category routes and all agent routes are gated to
/// organizers before their request is parsed.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Routes added before `route_layer(from_fn(require_organizer))` are organizer-only
    let lead_routes = Router::new()
        .route("/", post(routes::leads::create_lead))
        .route(
            "/:id",
            put(routes::leads::update_lead).delete(routes::leads::delete_lead),
        )
        .route("/:id/assign", post(routes::leads::assign_lead))
        .route_layer(from_fn(require_organizer))
        .route("/", get(routes::leads::list_leads))
        .route("/:id", get(routes::leads::get_lead))
        .route("/:id/category", put(routes::leads::update_lead_category));

    let category_routes = Router::new()
        .route("/", post(routes::categories::create_category))
        .route(
            "/:id",
            put(routes::categories::rename_category).delete(routes::categories::delete_category),
        )
        .route_layer(from_fn(require_organizer))
        .route("/", get(routes::categories::list_categories))
        .route("/:id", get(routes::categories::get_category));

    let agent_routes = Router::new()
        .route(
            "/",
            get(routes::agents::list_agents).post(routes::agents::invite_agent),
        )
        .route(
            "/:id",
            get(routes::agents::get_agent)
                .put(routes::agents::update_agent)
                .delete(routes::agents::delete_agent),
        )
        .route_layer(from_fn(require_organizer));

    let protected_routes = Router::new()
        .nest("/leads", lead_routes)
        .nest("/categories", category_routes)
        .nest("/agents", agent_routes)
        .layer(from_fn_with_state(state.clone(), require_actor));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(from_fn_with_state(
            SecurityHeaders::new(state.config.api.production),
            security_headers,
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allows_any() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
