// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{playlists, users},
    state::AppState,
    utils::auth::{auth_middleware, basic_auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * `/api/v1/users`: registration, account updates, profiles and favourites.
/// * `/api/v1/playlists`: playlist creation.
/// * Applies global middleware (Trace, CORS) and injects the shared state.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let bearer = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let optional_bearer = middleware::from_fn_with_state(state.clone(), optional_auth_middleware);
    let basic = middleware::from_fn_with_state(state.clone(), basic_auth_middleware);

    // Methods on the same path carry different auth requirements, so layers
    // are attached per method router.
    let user_routes: Router<AppState> = Router::new()
        .route("/", post(users::register))
        .route(
            "/",
            get(users::list_users)
                .put(users::update_account)
                .route_layer(bearer.clone()),
        )
        .route(
            "/{token}",
            get(users::get_profile).route_layer(optional_bearer.clone()),
        )
        .route(
            "/{token}/favourites",
            get(users::get_favourites).route_layer(optional_bearer),
        )
        .route(
            "/{token}",
            put(users::update_favourites).route_layer(bearer.clone()),
        )
        .route("/login/{token}", get(users::login).route_layer(basic));

    let playlist_routes: Router<AppState> = Router::new()
        .route("/", post(playlists::create_playlist).route_layer(bearer));

    Router::new()
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/playlists", playlist_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
