//! Domain management handlers.
//!
//! # Purpose
//! Operator-facing CRUD over a tenant's domain bindings. Handlers stay
//! thin: every invariant lives in [`crate::domains::DomainService`], and
//! these functions only translate between HTTP and the lifecycle API.
use crate::api::error::{ApiError, api_domain_error, api_internal, api_not_found};
use crate::api::types::{DomainCreateRequest, DomainCreateResponse, DomainListResponse};
use crate::app::AppState;
use crate::model::DomainBinding;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/v1/attractions/{tenant_id}/domains",
    tag = "domains",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier")
    ),
    responses(
        (status = 200, description = "Tenant's domain bindings", body = DomainListResponse),
        (status = 404, description = "Attraction not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_domains(
    Path(tenant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DomainListResponse>, ApiError> {
    if let Err(err) = state.store.get_attraction(&tenant_id).await {
        return Err(match err {
            StoreError::NotFound(_) => api_not_found("attraction not found"),
            err => api_internal("failed to load attraction", &err),
        });
    }
    let items = state
        .store
        .list_domains(&tenant_id)
        .await
        .map_err(|err| api_internal("failed to list domains", &err))?;
    Ok(Json(DomainListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/attractions/{tenant_id}/domains",
    tag = "domains",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier")
    ),
    request_body = DomainCreateRequest,
    responses(
        (status = 201, description = "Domain added, verification pending", body = DomainCreateResponse),
        (status = 400, description = "Malformed hostname", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Domain already bound", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn add_domain(
    Path(tenant_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<DomainCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (binding, dns_record) = state
        .domains
        .add_domain(&tenant_id, &body.domain, body.verification_method)
        .await
        .map_err(api_domain_error)?;
    Ok((
        StatusCode::CREATED,
        Json(DomainCreateResponse {
            binding,
            dns_record,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/attractions/{tenant_id}/domains/{domain_id}/verify",
    tag = "domains",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("domain_id" = Uuid, Path, description = "Domain binding id")
    ),
    responses(
        (status = 200, description = "Domain verified", body = DomainBinding),
        (status = 400, description = "DNS verification failed", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Binding not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn verify_domain(
    Path((tenant_id, domain_id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<Json<DomainBinding>, ApiError> {
    let binding = state
        .domains
        .verify_domain(&tenant_id, domain_id)
        .await
        .map_err(api_domain_error)?;
    Ok(Json(binding))
}

#[utoipa::path(
    post,
    path = "/v1/attractions/{tenant_id}/domains/{domain_id}/primary",
    tag = "domains",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("domain_id" = Uuid, Path, description = "Domain binding id")
    ),
    responses(
        (status = 204, description = "Primary domain updated"),
        (status = 400, description = "Binding is not active", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Binding not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn set_primary_domain(
    Path((tenant_id, domain_id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .domains
        .set_primary_domain(&tenant_id, domain_id)
        .await
        .map_err(api_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/attractions/{tenant_id}/domains/{domain_id}",
    tag = "domains",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("domain_id" = Uuid, Path, description = "Domain binding id")
    ),
    responses(
        (status = 204, description = "Domain deleted"),
        (status = 400, description = "Deletion forbidden", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Binding not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_domain(
    Path((tenant_id, domain_id)): Path<(String, Uuid)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .domains
        .delete_domain(&tenant_id, domain_id)
        .await
        .map_err(api_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}
