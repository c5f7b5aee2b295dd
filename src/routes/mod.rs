pub mod admin;
pub mod auth;
pub mod download;
pub mod gallery;
pub mod health;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::AppState;

pub use download::download_image;
pub use gallery::{list_gallery, upload_image};
pub use health::health_check;

/// All HTTP routes, without transport layers such as CORS or tracing
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).delete(admin::delete_users))
        .route(
            "/gallery",
            get(admin::list_gallery_tiers).delete(admin::delete_gallery_item),
        )
        .route("/clear-memory", delete(admin::clear_memory))
        .route("/clear-uploads", delete(admin::clear_uploads))
        .route("/clear-gallery", delete(admin::clear_gallery))
        .route("/clear-documents", delete(admin::clear_documents))
        .route("/stats", get(admin::admin_stats));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/gallery", get(list_gallery).post(upload_image))
        .route("/api/download/:id", get(download_image))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .layer(body_limit)
        .with_state(state)
}
