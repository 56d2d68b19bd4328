//! Storefront HTTP application wiring.
//!
//! # Purpose
//! Builds the axum router, configures middleware, and defines the shared
//! application state injected into handlers. Route composition lives here
//! to keep `main` small and testable.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::api::types::FeatureFlags;
use crate::domains::DomainService;
use crate::domains::resolver::TenantResolver;
use crate::observability;
use crate::store::StorefrontStore;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub platform_suffix: String,
    pub features: FeatureFlags,
    pub store: Arc<dyn StorefrontStore>,
    pub domains: Arc<DomainService>,
    pub resolver: Arc<TenantResolver>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/attractions",
            axum::routing::post(api::attractions::create_attraction),
        )
        .route(
            "/v1/attractions/:tenant_id/storefront",
            axum::routing::put(api::attractions::upsert_storefront),
        )
        .route(
            "/v1/attractions/:tenant_id/domains",
            axum::routing::get(api::domains::list_domains).post(api::domains::add_domain),
        )
        .route(
            "/v1/attractions/:tenant_id/domains/:domain_id",
            axum::routing::delete(api::domains::delete_domain),
        )
        .route(
            "/v1/attractions/:tenant_id/domains/:domain_id/verify",
            axum::routing::post(api::domains::verify_domain),
        )
        .route(
            "/v1/attractions/:tenant_id/domains/:domain_id/primary",
            axum::routing::post(api::domains::set_primary_domain),
        )
        .route(
            "/v1/public/storefront",
            axum::routing::get(api::public::public_storefront),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
