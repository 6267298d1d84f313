use crate::{accounts::Accounts, catalog::Catalog, catalog::storage::SharedStore};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    routing::{delete, get, post},
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::{ApiDoc, openapi};

use handlers::{health, items, menus, restaurants, root, sections, session};

const RESTAURANT: &str = "/v1/restaurants/:restaurant_slug";
const MENU: &str = "/v1/restaurants/:restaurant_slug/menus/:menu_slug";
const SECTION: &str = "/v1/restaurants/:restaurant_slug/menus/:menu_slug/sections/:section_slug";

/// Build the application router with the catalog and accounts wired in.
#[must_use]
pub fn router(catalog: Catalog, accounts: Accounts) -> Router {
    let v1 = Router::new()
        .route("/v1/users", post(session::register))
        .route("/v1/me", get(session::me))
        .route("/v1/logout", post(session::logout))
        .route(
            "/v1/restaurants",
            get(restaurants::list_restaurants).post(restaurants::create_restaurant),
        )
        .route(
            RESTAURANT,
            get(restaurants::get_restaurant)
                .patch(restaurants::update_restaurant)
                .delete(restaurants::delete_restaurant),
        )
        .route(
            &format!("{RESTAURANT}/admins"),
            post(restaurants::add_admin),
        )
        .route(
            &format!("{RESTAURANT}/admins/:user_id"),
            delete(restaurants::remove_admin),
        )
        .route(
            &format!("{RESTAURANT}/menus"),
            get(menus::list_menus).post(menus::create_menu),
        )
        .route(
            MENU,
            get(menus::get_menu)
                .patch(menus::update_menu)
                .delete(menus::delete_menu),
        )
        .route(
            &format!("{MENU}/sections"),
            get(sections::list_sections).post(sections::create_section),
        )
        .route(
            SECTION,
            get(sections::get_section)
                .patch(sections::update_section)
                .delete(sections::delete_section),
        )
        .route(
            &format!("{SECTION}/items"),
            get(items::list_items).post(items::create_item),
        )
        .route(
            &format!("{SECTION}/items/:item_slug"),
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        );

    Router::new()
        .merge(v1)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .route("/", get(root::root))
        .route("/health", get(health::health).head(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(catalog))
                .layer(Extension(accounts)),
        )
}

/// Serve the API on `port` until ctrl-c.
/// # Errors
/// Returns an error if the listener cannot bind or the server fails
pub async fn new(port: u16, store: SharedStore, session_ttl: Duration) -> Result<()> {
    let catalog = Catalog::new(store.clone());
    let accounts = Accounts::new(store, session_ttl);
    let app = router(catalog, accounts);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!("http.request", http.method = method, path, request_id)
}
