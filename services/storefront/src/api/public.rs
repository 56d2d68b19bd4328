//! Anonymous public resolution handler.
//!
//! # Purpose
//! The endpoint behind every storefront page view: turns a host (or slug)
//! into a tenant context, or a deliberately uninformative 404.
//!
//! # Security considerations
//! The 404 is identical for "no such tenant" and "tenant unpublished" so
//! anonymous traffic cannot probe which domains exist.
use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::api::types::PublicStorefrontResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct PublicStorefrontQuery {
    /// Identifier to resolve; falls back to the request `Host` header.
    host: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/public/storefront",
    tag = "public",
    params(
        ("host" = Option<String>, Query, description = "Host or slug to resolve; defaults to the Host header")
    ),
    responses(
        (status = 200, description = "Resolved storefront context", body = PublicStorefrontResponse),
        (status = 404, description = "No published storefront for this identifier", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn public_storefront(
    Query(query): Query<PublicStorefrontQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<PublicStorefrontResponse>, ApiError> {
    let identifier = query.host.or_else(|| {
        headers
            .get(axum::http::header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });
    let Some(identifier) = identifier else {
        return Err(api_not_found("storefront not found"));
    };

    let context = state
        .resolver
        .resolve_public_tenant(&identifier)
        .await
        .map_err(|err| api_internal("resolution failed", &err))?;

    match context {
        Some(context) => Ok(Json(PublicStorefrontResponse { context })),
        None => Err(api_not_found("storefront not found")),
    }
}
