//! Flower shop API library
//!
//! Order placement with hosted card payments, payment webhook reconciliation,
//! customer blocking and an admin back-office over a small bouquet catalog.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod repositories;
pub mod services;
pub mod tracing;

use std::{sync::Arc, time::Duration};

use axum::{
    http::HeaderValue,
    response::Json,
    routing::{get, patch, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::notifications::NotificationDispatcher;
use crate::payments::{PaymentGateway, WebhookVerifier};
use crate::services::AppServices;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
        notifications: NotificationDispatcher,
    ) -> Self {
        let services = AppServices::new(db.clone(), gateway, verifier, notifications);
        let auth = Arc::new(AuthService::new(AuthConfig::new(config.jwt_secret.clone())));
        Self {
            db,
            config,
            services,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    // Storefront and provider callbacks, no token
    let public = Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route("/customers/is-blocked", get(handlers::customers::is_blocked))
        .route(
            "/payments/webhook",
            post(handlers::payment_webhooks::payment_webhook),
        )
        .route("/bouquets", get(handlers::catalog::list_bouquets))
        .route("/bouquets/popular", get(handlers::catalog::popular_bouquets))
        .route("/bouquets/search", get(handlers::catalog::search_bouquets))
        .route("/bouquets/types", get(handlers::catalog::list_bouquet_types))
        .route("/bouquets/:id", get(handlers::catalog::get_bouquet))
        .route("/flowers", get(handlers::catalog::list_flowers));

    let orders_read = Router::new()
        .route("/admin/orders", get(handlers::admin_orders::list_orders))
        .route("/admin/orders/:id", get(handlers::admin_orders::get_order))
        .with_permission(perm::ORDERS_READ);

    let orders_update = Router::new()
        .route(
            "/admin/orders/:id/status",
            patch(handlers::admin_orders::update_order_status),
        )
        .route(
            "/admin/orders/:id/archive",
            post(handlers::admin_orders::archive_order),
        )
        .with_permission(perm::ORDERS_UPDATE);

    let orders_delete = Router::new()
        .route(
            "/admin/orders/:id",
            axum::routing::delete(handlers::admin_orders::delete_order),
        )
        .with_permission(perm::ORDERS_DELETE);

    let customers_read = Router::new()
        .route("/admin/customers", get(handlers::customers::list_customers))
        .with_permission(perm::CUSTOMERS_READ);

    let customers_manage = Router::new()
        .route(
            "/admin/customers/:email/block",
            post(handlers::customers::block_customer),
        )
        .route(
            "/admin/customers/:email/unblock",
            post(handlers::customers::unblock_customer),
        )
        .with_permission(perm::CUSTOMERS_MANAGE);

    let catalog_manage = Router::new()
        .route("/admin/bouquets", post(handlers::catalog::create_bouquet))
        .route(
            "/admin/bouquets/:id",
            patch(handlers::catalog::update_bouquet).delete(handlers::catalog::delete_bouquet),
        )
        .route(
            "/admin/bouquets/:id/stock",
            put(handlers::catalog::update_stock),
        )
        .route(
            "/admin/bouquets/:id/archive",
            post(handlers::catalog::archive_bouquet),
        )
        .route(
            "/admin/bouquet-types",
            post(handlers::catalog::create_bouquet_type),
        )
        .route("/admin/flowers", post(handlers::catalog::create_flower_type))
        .with_permission(perm::CATALOG_MANAGE);

    Router::new()
        .merge(public)
        .merge(orders_read)
        .merge(orders_update)
        .merge(orders_delete)
        .merge(customers_read)
        .merge(customers_manage)
        .merge(catalog_manage)
}

/// Full application router: health, the v1 API, Swagger UI and the shared middleware stack.
/// CORS is left to the caller, see [`cors_layer`].
pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::<AppState>::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        // auth middleware looks the verifier up in the request extensions
        .layer(Extension(state.auth.clone()))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

/// Explicit origins win; otherwise permissive CORS is only allowed in development
/// or with `cors_allow_any_origin`.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, errors::ServiceError> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        ::tracing::error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        Err(errors::ServiceError::InternalError(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
        ))
    }
}

#[cfg(test)]
mod cors_tests {
    use super::*;

    fn cfg(environment: &str) -> config::AppConfig {
        config::AppConfig::new(
            "sqlite::memory:".into(),
            "a_jwt_secret_that_is_long_enough_for_hs256_use".into(),
            "127.0.0.1".into(),
            8080,
            environment.into(),
        )
    }

    #[test]
    fn production_without_origins_is_rejected() {
        assert!(cors_layer(&cfg("production")).is_err());
    }

    #[test]
    fn explicit_origins_or_development_are_accepted() {
        let mut production = cfg("production");
        production.cors_allowed_origins = Some("https://shop.example.com, ".into());
        assert!(cors_layer(&production).is_ok());
        assert!(cors_layer(&cfg("development")).is_ok());
    }
}
