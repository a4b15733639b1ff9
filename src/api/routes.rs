use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Auth
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/signin", post(handlers::sign_in))
        .route("/auth/oauth/:provider", get(handlers::oauth_url))
        .route("/auth/signout", post(handlers::sign_out))
        // Own collection
        .route(
            "/movies",
            get(handlers::list_movies).post(handlers::create_movie),
        )
        .route("/movies/import", post(handlers::import_movies))
        .route(
            "/movies/:id",
            put(handlers::update_movie).delete(handlers::delete_movie),
        )
        // Sharing
        .route(
            "/shares",
            get(handlers::list_shares).post(handlers::share_collection),
        )
        .route("/shares/:user_id", delete(handlers::revoke_share))
        .route("/shared-with-me", get(handlers::shared_with_me))
        .route("/shared/movies/:id", put(handlers::update_shared_movie))
        // Wishlist
        .route(
            "/wishlist",
            get(handlers::list_wishlist).post(handlers::add_wishlist_item),
        )
        .route("/wishlist/:id", delete(handlers::remove_wishlist_item))
        .route("/wishlist/:id/watched", post(handlers::mark_wishlist_watched))
        // Catalog
        .route("/catalog/search", get(handlers::search_catalog))
        .route("/catalog/:id", get(handlers::catalog_details))
        // Layers run outside-in: request id first, then the traced span.
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
