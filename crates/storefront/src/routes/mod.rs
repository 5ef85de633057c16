//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Storage readiness
//!
//! # Sessions
//! POST /api/sessions/register           - Create account and log in (201)
//! POST /api/sessions/login              - Password login
//! POST /api/sessions/logout             - End the session
//! GET  /api/sessions/current            - Logged-in user
//! GET  /api/sessions/check-auth         - Whether anyone is logged in
//! GET  /api/sessions/{provider}         - Redirect to GitHub / Google
//! GET  /api/sessions/{provider}/callback
//!
//! # Users
//! GET|PUT /api/users/profile            - Own profile
//! DELETE  /api/users                    - Delete own account
//! PUT     /api/users/{uid}/role         - Change role (admin)
//!
//! # Products
//! GET  /api/products                    - Listing (?category&page&limit&sort)
//! GET  /api/products/categories
//! GET  /api/products/{pid}
//! POST /api/products, PUT|DELETE /api/products/{pid}   (admin)
//!
//! # Cart (own)
//! GET    /api/carts                     - Cart with totals
//! GET    /api/carts/count
//! POST   /api/carts/add                 - {productId, quantity} (201)
//! PUT    /api/carts/update/{itemId}     - {quantity}
//! DELETE /api/carts/remove/{itemId}
//! DELETE /api/carts/clear
//! POST   /api/carts/finalize            - Checkout
//!
//! # Cart by id (admin)
//! GET /api/carts/all, GET|DELETE /api/carts/{cid}
//! POST /api/carts/{cid}/product/{pid}, DELETE /api/carts/{cid}/products/{pid}
//!
//! # Orders
//! POST /api/orders                      - Checkout (201)
//! GET  /api/orders, GET /api/orders/{id}
//!
//! # Admin panel
//! GET  /admin/categories
//! POST /admin/stock/update              - {productId, newStock}
//! GET  /admin/tickets, GET /admin/tickets/{code}
//! ```

pub mod admin;
pub mod carts;
pub mod extract;
pub mod health;
pub mod orders;
pub mod products;
pub mod sessions;
pub mod users;

use axum::{
    Router,
    extract::Request,
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{
    api_rate_limiter, create_session_layer, request_id_middleware, security_headers_middleware,
    session_rate_limiter,
};
use crate::state::AppState;

/// Create the session routes router.
///
/// Credential and OAuth endpoints carry the strict rate limiter.
pub fn session_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(sessions::register))
        .route("/login", post(sessions::login))
        .route("/{provider}", get(sessions::oauth_start))
        .route("/{provider}/callback", get(sessions::oauth_callback))
        .layer(session_rate_limiter());

    Router::new()
        .route("/logout", post(sessions::logout))
        .route("/current", get(sessions::current))
        .route("/check-auth", get(sessions::check_auth))
        .merge(limited)
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", delete(users::delete_account))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile),
        )
        .route("/{uid}/role", put(users::set_role))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/categories", get(products::categories))
        .route(
            "/{pid}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(carts::show))
        .route("/count", get(carts::count))
        .route("/add", post(carts::add))
        .route("/update/{item_id}", put(carts::update))
        .route("/remove/{item_id}", delete(carts::remove))
        .route("/clear", delete(carts::clear))
        .route("/finalize", post(carts::finalize))
        // Admin
        .route("/all", get(carts::list_all))
        .route("/{cid}", get(carts::get_by_id).delete(carts::delete))
        .route("/{cid}/product/{pid}", post(carts::add_product))
        .route("/{cid}/products/{pid}", delete(carts::remove_product))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create the admin panel routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(admin::categories))
        .route("/stock/update", post(admin::update_stock))
        .route("/tickets", get(admin::tickets))
        .route("/tickets/{code}", get(admin::ticket))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/sessions", session_routes())
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/carts", cart_routes())
        .nest("/orders", order_routes());

    Router::new()
        .nest("/api", api)
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter())
}

/// Build the complete application router over a session store.
///
/// Sentry layers are added by the binary, outside this router.
pub fn build_router<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
