//! Attraction registry and storefront settings handlers.
//!
//! # Purpose
//! Minimal tenant-directory surface: registering an attraction and writing
//! its storefront settings. The settings write is also the trigger for the
//! one-time subdomain provisioning.
use crate::api::error::{
    ApiError, api_conflict, api_domain_error, api_internal, api_not_found, api_validation_error,
};
use crate::api::types::{
    AttractionCreateRequest, AttractionResponse, StorefrontSettingsRequest,
    StorefrontSettingsResponse,
};
use crate::app::AppState;
use crate::domains::hostname;
use crate::model::{Attraction, StorefrontSettings};
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[utoipa::path(
    post,
    path = "/v1/attractions",
    tag = "attractions",
    request_body = AttractionCreateRequest,
    responses(
        (status = 201, description = "Attraction registered", body = AttractionResponse),
        (status = 400, description = "Invalid slug", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Attraction or slug already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_attraction(
    State(state): State<AppState>,
    Json(body): Json<AttractionCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let slug = body.slug.to_ascii_lowercase();
    // The slug becomes the leftmost label of the platform subdomain, so it
    // must satisfy the single-label hostname grammar.
    if !hostname::is_valid_label(&slug) {
        return Err(api_validation_error("invalid attraction slug"));
    }
    let attraction = Attraction {
        tenant_id: body.tenant_id,
        slug,
        display_name: body.display_name,
    };
    match state.store.create_attraction(attraction.clone()).await {
        Ok(attraction) => Ok((StatusCode::CREATED, Json(AttractionResponse { attraction }))),
        Err(StoreError::Conflict(message)) => Err(api_conflict("already_exists", &message)),
        Err(err) => Err(api_internal("failed to register attraction", &err)),
    }
}

#[utoipa::path(
    put,
    path = "/v1/attractions/{tenant_id}/storefront",
    tag = "attractions",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier")
    ),
    request_body = StorefrontSettingsRequest,
    responses(
        (status = 200, description = "Settings stored", body = StorefrontSettingsResponse),
        (status = 404, description = "Attraction not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn upsert_storefront(
    Path(tenant_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<StorefrontSettingsRequest>,
) -> Result<Json<StorefrontSettingsResponse>, ApiError> {
    let attraction = match state.store.get_attraction(&tenant_id).await {
        Ok(attraction) => attraction,
        Err(StoreError::NotFound(_)) => return Err(api_not_found("attraction not found")),
        Err(err) => return Err(api_internal("failed to load attraction", &err)),
    };

    let settings = state
        .store
        .upsert_settings(StorefrontSettings {
            tenant_id: tenant_id.clone(),
            headline: body.headline,
            is_published: body.is_published,
        })
        .await
        .map_err(|err| api_internal("failed to store settings", &err))?;

    // First successful settings write provisions the platform subdomain;
    // afterwards this is a no-op.
    state
        .domains
        .ensure_subdomain(&tenant_id, &attraction.slug)
        .await
        .map_err(api_domain_error)?;

    let subdomain = state
        .store
        .subdomain_for(&tenant_id)
        .await
        .map_err(|err| api_internal("failed to load subdomain", &err))?;

    Ok(Json(StorefrontSettingsResponse {
        settings,
        subdomain,
    }))
}
