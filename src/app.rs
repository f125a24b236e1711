use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::database::Datastore;
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::notifier::Notifier;
use crate::services::Services;

/// Shared by every request. The datastore is opened before the router is
/// built and closed after the server stops.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Datastore>,
    pub services: Services,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Datastore>, notifier: Arc<dyn Notifier>) -> Self {
        let services = Services::new(store.clone(), notifier, &config);
        Self {
            config: Arc::new(config),
            store,
            services,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.api.max_request_size_bytes;

    Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(item_routes())
        .merge(tag_routes())
        .merge(contact_routes())
        .merge(directory_routes())
        .fallback(handlers::health::not_found)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware)),
        )
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION])
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", get(auth::verify_email))
        .route("/auth/verify/resend", post(auth::resend_verification))
}

fn user_routes() -> Router<AppState> {
    use handlers::{profile, users};

    Router::new()
        .route("/users", axum::routing::delete(users::clear_users))
        .route("/users/me", get(users::me))
        .route("/users/handle", get(users::find_by_handle))
        .route("/profile", get(profile::my_profile).patch(profile::edit_profile))
        .route("/profile/:id", get(profile::profile_by_id))
}

fn item_routes() -> Router<AppState> {
    use handlers::items;

    Router::new()
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item).patch(items::edit_item).delete(items::delete_item),
        )
}

fn tag_routes() -> Router<AppState> {
    use handlers::tags;

    Router::new()
        .route("/tags", get(tags::list_tags).post(tags::create_tag).delete(tags::clear_tags))
        .route("/tags/:id", get(tags::get_tag).patch(tags::edit_tag).delete(tags::delete_tag))
}

fn contact_routes() -> Router<AppState> {
    use handlers::contacts;

    Router::new()
        .route("/contacts", get(contacts::list_contacts).post(contacts::create_contact))
        .route(
            "/contacts/:id",
            get(contacts::get_contact).patch(contacts::edit_contact).delete(contacts::delete_contact),
        )
}

fn directory_routes() -> Router<AppState> {
    use handlers::directory;

    Router::new()
        .route(
            "/directory/:profile_id",
            get(directory::get_categories).post(directory::add_category),
        )
        .route(
            "/directory/:profile_id/:category_id",
            patch(directory::edit_category).delete(directory::delete_category),
        )
}
