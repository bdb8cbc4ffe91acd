//! OpenAPI specification and Swagger UI

use axum::http::header;
use axum::response::{Html, IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{audit, auth, categories, choruses, health, hymns, search, users};
use crate::data::query::{PageCursors, PageMeta, PaginationType, SortDirection};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hymnal API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Hymn catalog server"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "User accounts and roles"),
        (name = "hymns", description = "Hymn catalog"),
        (name = "verses", description = "Verses of a hymn"),
        (name = "categories", description = "Hymn categories"),
        (name = "choruses", description = "Chorus catalog"),
        (name = "search", description = "Cross-catalog search"),
        (name = "audit", description = "Audit trail")
    ),
    paths(
        // Health
        health::health,
        // Auth
        auth::register,
        auth::login,
        // Users
        users::list_users,
        users::get_current_user,
        users::update_current_user,
        users::update_user_role,
        // Hymns
        hymns::list_hymns,
        hymns::create_hymn,
        hymns::get_hymn,
        hymns::update_hymn,
        hymns::delete_hymn,
        hymns::restore_hymn,
        // Verses
        hymns::list_verses,
        hymns::create_verse,
        hymns::get_verse,
        hymns::update_verse,
        hymns::delete_verse,
        // Categories
        categories::list_categories,
        categories::create_category,
        categories::get_category,
        categories::update_category,
        categories::delete_category,
        categories::restore_category,
        // Choruses
        choruses::list_choruses,
        choruses::create_chorus,
        choruses::get_chorus,
        choruses::update_chorus,
        choruses::delete_chorus,
        choruses::restore_chorus,
        // Search
        search::search,
        // Audit
        audit::list_audit_logs,
    ),
    components(schemas(
        // Pagination
        PageMeta,
        PageCursors,
        PaginationType,
        SortDirection,
        // Health
        health::HealthResponse,
        // Auth
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::SessionResponse,
        // Users
        users::types::UserDto,
        users::types::UpdateProfileRequest,
        users::types::UpdateUserRoleRequest,
        // Hymns and verses
        hymns::types::HymnDto,
        hymns::types::VerseDto,
        hymns::types::HymnDetailResponse,
        hymns::types::CreateHymnRequest,
        hymns::types::UpdateHymnRequest,
        hymns::types::CreateVerseRequest,
        hymns::types::UpdateVerseRequest,
        // Categories
        categories::types::CategoryDto,
        categories::types::CreateCategoryRequest,
        categories::types::UpdateCategoryRequest,
        // Choruses
        choruses::types::ChorusDto,
        choruses::types::CreateChorusRequest,
        choruses::types::UpdateChorusRequest,
        // Search
        search::SearchHitDto,
        // Audit
        audit::AuditLogDto,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI spec as JSON
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

/// Serve Swagger UI from CDN
pub async fn swagger_ui_html() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Hymnal API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = () => {
            window.ui = SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout",
            });
        };
    </script>
</body>
</html>"#;
