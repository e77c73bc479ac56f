use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has successfully passed the
/// authentication layer. This module implements all core application features:
/// profile management and the image upload/read/update/delete lifecycle.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. This guarantees that
/// all handlers receive a validated `AuthUser` struct containing the user's ID,
/// which is then used for all Owner-Only authorization checks (e.g., in
/// `update_image` and `delete_image`).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users ---
        // GET /api/users/me
        // Retrieves the currently authenticated user's profile.
        .route("/api/users/me", get(handlers::get_me))
        // POST /api/users/change-password
        // Rotates the password and returns a freshly issued token.
        .route(
            "/api/users/change-password",
            post(handlers::change_password),
        )
        // GET /api/users
        // Lists all registered users (public projections only).
        .route("/api/users", get(handlers::get_users))
        // GET /api/users/username/{username}
        // Lookup by unique username. Registered before the {id} route so the
        // literal segment wins.
        .route(
            "/api/users/username/{username}",
            get(handlers::get_user_by_username),
        )
        // GET/PUT/DELETE /api/users/{id}
        // Reads are open to any authenticated user; mutation is Owner-Only.
        .route(
            "/api/users/{id}",
            get(handlers::get_user_by_id)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // --- Images ---
        // POST /api/images
        // Multipart upload: 'image' part required, 'title'/'description'
        // optional. Content-type whitelist enforced before any write.
        .route("/api/images", post(handlers::upload_image))
        // GET /api/images
        // Lists all images. Reads are intentionally visible across owners.
        .route("/api/images", get(handlers::get_images))
        // GET /api/images/{id}
        .route("/api/images/{id}", get(handlers::get_image))
        // PATCH/DELETE /api/images/{id}
        // Strict ownership check is enforced in the image service.
        .route(
            "/api/images/{id}",
            patch(handlers::update_image).delete(handlers::delete_image),
        )
}
