//! Multi-tenant API server core.
//!
//! Every protected request is authenticated (optional application API key,
//! mandatory OAuth2 bearer token), bound to an application within an
//! organization, and authorized against the roles the user holds there.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum, with auth as a route-layer middleware
//! - **Database**: PostgreSQL with sqlx, behind the [`store::AuthStore`] trait
//! - **Provider**: OAuth2 token exchange over reqwest, behind [`services::provider::TokenExchange`]
//! - **Secrets**: API keys stored AES-256-GCM encrypted

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::config::AuthSettings;
use crate::services::flow::AuthFlow;
use crate::services::provider::TokenExchange;
use crate::store::AuthStore;

/// Shared, read-only state handed to middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuthStore>,
    pub exchanger: Arc<dyn TokenExchange>,
    pub settings: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AuthStore>,
        exchanger: Arc<dyn TokenExchange>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            exchanger,
            settings: Arc::new(settings),
        }
    }

    pub fn auth_flow(&self) -> AuthFlow<'_> {
        AuthFlow::new(
            self.store.as_ref(),
            self.exchanger.as_ref(),
            self.settings.as_ref(),
        )
    }
}

/// Build the HTTP router.
///
/// `/health` is public. Everything under `/v1` goes through
/// [`middleware::auth::auth_middleware`].
pub fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/v1/whoami", get(handlers::whoami::whoami))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
