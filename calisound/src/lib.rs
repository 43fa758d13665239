//! # calisound: Backend for the CALI Sound Site
//!
//! `calisound` is the content-managed backend behind the CALI Sound music brand
//! site. It serves the public catalog of DJ sets and cities, takes listener
//! comments and contact messages, runs the virtual club over WebSockets, and
//! exposes an admin API for managing all of it.
//!
//! ## Overview
//!
//! The application has two HTTP surfaces. The public API at `/api/v1/*` is
//! unauthenticated and read-mostly: set and city listings, approved comments,
//! FAQ/link/page content, a tracked link redirect, the contact form, and a
//! cached search proxy against YouTube and Spotify. The admin API at
//! `/admin/api/v1/*` is cookie-session authenticated and covers catalog CRUD,
//! comment moderation, the contact inbox, the activity log, release planning
//! with AI-assisted promo copy, the social post composer, and club character
//! management.
//!
//! Admin sessions are JWTs carried in an HTTP-only cookie, with an optional
//! TOTP second step at login and a double-submit CSRF token required on
//! mutating requests. See the [`auth`] module.
//!
//! The real-time club at `/club/ws` upgrades to a WebSocket and fans presence,
//! chat, and movement events out per room. See the [`club`] module.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use calisound::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = calisound::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     calisound::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires PostgreSQL and runs migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! calisound::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod club;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod limits;
pub mod media_search;
mod openapi;
pub mod planning;
pub mod platforms;
mod static_assets;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password,
    club::ClubState,
    config::CorsOrigin,
    db::handlers::{Repository, users::Users},
    db::models::users::UserCreateDBRequest,
    email::EmailService,
    limits::RateLimiter,
    media_search::SearchService,
    openapi::ApiDoc,
    planning::copy::CopyGenerator,
};
use axum::{
    Router, http,
    http::HeaderValue,
    routing::{delete, get, patch, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{CharacterId, CityId, CommentId, ContentId, PlanId, PostId, SetId, TaskId, UserId};

/// Application state shared across all request handlers.
///
/// Everything in here is cheap to clone: the pool is an `Arc` internally and
/// the services are wrapped explicitly.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .limiter(limiter)
///     .club(club)
///     .search(search)
///     .copy(copy)
///     .email(email)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Fixed-window rate limiter for public submission endpoints
    pub limiter: Arc<RateLimiter>,
    /// In-memory room registry for the virtual club
    pub club: Arc<ClubState>,
    /// Cached YouTube/Spotify search proxy
    pub search: Arc<SearchService>,
    /// AI promo copy generator (disabled without an API key)
    pub copy: Arc<CopyGenerator>,
    /// Contact notification sender
    pub email: Arc<EmailService>,
}

/// Get the calisound database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the admin on first startup, or updates the password if
/// the user already exists and a password is configured.
///
/// # Arguments
///
/// - `email`: Email address for the admin user (also used as username)
/// - `password`: Optional password. If `None`, the user will have no password set
/// - `db`: PostgreSQL connection pool
///
/// # Returns
///
/// Returns the user ID of the created or existing admin user.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> Result<UserId, sqlx::Error> {
    let password_hash = if let Some(pwd) = password {
        Some(password::hash_string(pwd).map_err(|e| sqlx::Error::Encode(format!("Failed to hash admin password: {e}").into()))?)
    } else {
        None
    };

    // Transaction so a concurrent replica can't race us into a duplicate
    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo
        .get_by_email(email)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to check existing user: {e}")))?
    {
        if let Some(password_hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
                .bind(&password_hash)
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let user_create = UserCreateDBRequest {
        username: email.to_string(),
        email: email.to_string(),
        display_name: None,
        is_admin: true,
        password_hash,
    };

    let created_user = user_repo
        .create(&user_create)
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Failed to create admin user: {e}")))?;

    tx.commit().await?;
    Ok(created_user.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.cors.allow_credentials)
        // Link redirects cross the API boundary, let browsers read the target
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This constructs the complete Axum router with:
/// - Authentication routes (login, TOTP, logout, session info)
/// - The public site API under `/api/v1`
/// - The admin API under `/admin/api/v1`
/// - The club WebSocket at `/club/ws`
/// - API docs, static asset serving, SPA fallback, CORS, and tracing
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Authentication routes stay at root level so the admin frontend can share
    // them regardless of which API surface it talks to
    let auth_routes = Router::new()
        .route("/authentication/login", post(api::handlers::auth::login))
        .route(
            "/authentication/totp",
            post(api::handlers::auth::verify_totp).delete(api::handlers::auth::disable_totp),
        )
        .route("/authentication/totp/enroll", post(api::handlers::auth::enroll_totp))
        .route("/authentication/totp/confirm", post(api::handlers::auth::confirm_totp))
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route("/authentication/me", get(api::handlers::auth::me))
        .route("/authentication/password-change", post(api::handlers::auth::change_password))
        .with_state(state.clone());

    // Public site API
    let public_routes = Router::new()
        .route("/cities", get(api::handlers::cities::list_public_cities))
        .route("/cities/{slug}", get(api::handlers::cities::get_public_city))
        .route("/sets", get(api::handlers::sets::list_public_sets))
        .route("/sets/{slug}", get(api::handlers::sets::get_public_set))
        .route(
            "/sets/{slug}/comments",
            get(api::handlers::comments::list_set_comments).post(api::handlers::comments::submit_comment),
        )
        .route("/content/{kind}", get(api::handlers::content::list_public_content))
        .route("/links/{id}/go", get(api::handlers::content::follow_link))
        .route("/contact", post(api::handlers::content::submit_contact))
        .route("/search", get(api::handlers::search::search_media))
        .with_state(state.clone());

    // Admin API
    let admin_routes = Router::new()
        // Catalog
        .route("/cities", get(api::handlers::cities::list_cities))
        .route("/cities", post(api::handlers::cities::create_city))
        .route("/cities/{id}", get(api::handlers::cities::get_city))
        .route("/cities/{id}", patch(api::handlers::cities::update_city))
        .route("/cities/{id}", delete(api::handlers::cities::delete_city))
        .route("/sets", get(api::handlers::sets::list_sets))
        .route("/sets", post(api::handlers::sets::create_set))
        .route("/sets/import", post(api::handlers::sets::import_sets))
        .route("/sets/{id}", get(api::handlers::sets::get_set))
        .route("/sets/{id}", patch(api::handlers::sets::update_set))
        .route("/sets/{id}", delete(api::handlers::sets::delete_set))
        // Moderation and inbox
        .route("/comments", get(api::handlers::comments::list_comments))
        .route("/comments/{id}", delete(api::handlers::comments::delete_comment))
        .route("/comments/{id}/status", patch(api::handlers::comments::update_comment_status))
        .route("/content", get(api::handlers::content::list_content))
        .route("/content", post(api::handlers::content::create_content))
        .route("/content/{id}", patch(api::handlers::content::update_content))
        .route("/content/{id}", delete(api::handlers::content::delete_content))
        .route("/links/stats", get(api::handlers::content::link_stats))
        .route("/contact", get(api::handlers::content::list_contact_messages))
        .route("/contact/{id}", patch(api::handlers::content::update_contact_message))
        .route("/activity", get(api::handlers::activity::list_activity))
        // Release planning
        .route("/releases", get(api::handlers::releases::list_plans))
        .route("/releases", post(api::handlers::releases::create_plan))
        .route("/releases/{id}", get(api::handlers::releases::get_plan))
        .route("/releases/{id}", patch(api::handlers::releases::update_plan))
        .route("/releases/{id}", delete(api::handlers::releases::delete_plan))
        .route("/releases/{id}/tasks/{task_id}", patch(api::handlers::releases::toggle_task))
        .route(
            "/releases/{id}/copy/{platform}/regenerate",
            post(api::handlers::releases::regenerate_copy),
        )
        // Social composer
        .route("/social/posts", get(api::handlers::social::list_posts))
        .route("/social/posts", post(api::handlers::social::create_post))
        .route("/social/posts/{id}", get(api::handlers::social::get_post))
        .route("/social/posts/{id}", patch(api::handlers::social::update_post))
        .route("/social/posts/{id}", delete(api::handlers::social::delete_post))
        .route(
            "/social/posts/{id}/variants/{variant_id}",
            delete(api::handlers::social::delete_variant),
        )
        .route("/social/posts/{id}/validate", post(api::handlers::social::validate_post))
        .route("/social/posts/{id}/schedule", post(api::handlers::social::schedule_post))
        .route("/social/jobs", get(api::handlers::social::list_jobs))
        .route("/social/jobs/{id}/cancel", post(api::handlers::social::cancel_job))
        // Club characters
        .route("/characters", get(api::handlers::club::list_characters))
        .route("/characters", post(api::handlers::club::create_character))
        .route("/characters/{id}", patch(api::handlers::club::update_character))
        .route("/characters/{id}", delete(api::handlers::club::delete_character))
        .with_state(state.clone());

    // Serve embedded static assets, falling back to SPA for unmatched routes
    let fallback = get(api::handlers::static_assets::serve_embedded_asset).fallback(get(api::handlers::static_assets::spa_fallback));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/club/ws", get(api::handlers::club::club_ws))
        .with_state(state.clone())
        .merge(auth_routes)
        .nest("/api/v1", public_routes)
        .nest("/admin/api/v1", admin_routes)
        .merge(Scalar::with_url("/admin/docs", ApiDoc::openapi()))
        .fallback_service(fallback);

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, ensures the initial admin user, and builds the router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
/// 3. **Shutdown**: on the shutdown signal, drains in-flight requests and
///    closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting CALI Sound backend with configuration: {:#?}", config);

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.database.acquire_timeout_secs))
            .connect(&config.database.url)
            .await?;

        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

        Self::new_with_pool(config, pool)
    }

    /// Build the application around an existing pool, skipping migrations and
    /// admin seeding. Used by tests where `#[sqlx::test]` owns the database.
    pub fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .limiter(Arc::new(RateLimiter::new()))
            .club(Arc::new(ClubState::new(&config.club)))
            .search(Arc::new(SearchService::new(config.search.clone())))
            .copy(Arc::new(CopyGenerator::new(&config.ai)?))
            .email(Arc::new(EmailService::new(&config.email)?))
            .build();

        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "CALI Sound backend listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::{create_initial_admin_user, db::handlers::users::Users, test_utils::create_test_app};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz(pool: PgPool) {
        let server = create_test_app(pool).await;
        let response = server.get("/healthz").await;
        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(response.text(), "OK");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_docs_served(pool: PgPool) {
        let server = create_test_app(pool).await;
        let response = server.get("/admin/docs").await;
        assert_eq!(response.status_code().as_u16(), 200);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_route_serves_spa_shell(pool: PgPool) {
        let server = create_test_app(pool).await;
        let response = server.get("/cities/los-angeles/about").await;
        assert_eq!(response.status_code().as_u16(), 200);
        assert!(response.text().contains("CALI SOUND"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_is_idempotent(pool: PgPool) {
        let first = create_initial_admin_user("admin@calisound.example", Some("first-password"), &pool)
            .await
            .expect("first create");
        let second = create_initial_admin_user("admin@calisound.example", Some("second-password"), &pool)
            .await
            .expect("second create");
        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .get_by_email("admin@calisound.example")
            .await
            .unwrap()
            .expect("admin exists");
        assert!(user.is_admin);
        // Password was rotated on the second call
        assert!(crate::auth::password::verify_string("second-password", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_passwordless_admin_cannot_login(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        create_initial_admin_user("admin@calisound.example", None, &pool)
            .await
            .expect("create admin");

        let response = server
            .post("/authentication/login")
            .json(&serde_json::json!({"email": "admin@calisound.example", "password": ""}))
            .await;
        assert_eq!(response.status_code().as_u16(), 401);
    }
}
