//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use super::auth::{AuthState, require_auth};
use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::{audit, auth, categories, choruses, health, hymns, search, users};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);

        Self {
            app,
            allowed_origins,
        }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        // Clone shutdown before moving app
        let shutdown = app.shutdown.clone();

        let host = app.config.server.host.clone();
        let port = app.config.server.port;
        let addr = SocketAddr::new(host.parse()?, port);

        let auth_state = AuthState {
            auth_manager: app.auth.clone(),
            database: app.database.clone(),
        };
        let require_auth_layer =
            axum::middleware::from_fn_with_state(auth_state.clone(), require_auth);

        // Session endpoints stay outside the auth middleware
        let auth_routes = auth::routes(app.auth.clone(), app.database.clone());

        let users_routes = users::routes(app.database.clone()).layer(require_auth_layer.clone());
        let hymns_routes = hymns::routes(app.database.clone()).layer(require_auth_layer.clone());
        let categories_routes =
            categories::routes(app.database.clone()).layer(require_auth_layer.clone());
        let choruses_routes =
            choruses::routes(app.database.clone()).layer(require_auth_layer.clone());
        let search_routes = search::routes(app.database.clone()).layer(require_auth_layer.clone());
        let audit_routes = audit::routes(app.database.clone()).layer(require_auth_layer);

        let router = Router::new()
            .route("/api/v1/health", get(health::health))
            .route("/api/openapi.json", get(openapi_json))
            .route("/api/docs", get(swagger_ui_html))
            .route("/api/docs/", get(swagger_ui_html))
            .nest("/api/v1/auth", auth_routes)
            .nest("/api/v1/users", users_routes)
            .nest("/api/v1/hymns", hymns_routes)
            .nest("/api/v1/categories", categories_routes)
            .nest("/api/v1/choruses", choruses_routes)
            .nest("/api/v1/search", search_routes)
            .nest("/api/v1/audit", audit_routes)
            .fallback(middleware::handle_404)
            .layer(CompressionLayer::new())
            .layer(middleware::cors(&allowed_origins))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

        tracing::info!("Listening on http://{}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        Ok(app)
    }
}
