//! OpenAPI schema aggregation for the storefront API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for
//! docs and client generation.
use crate::api::{
    attractions, domains, public, system,
    types::{
        AttractionCreateRequest, AttractionResponse, DomainCreateRequest, DomainCreateResponse,
        DomainListResponse, ErrorResponse, FeatureFlags, HealthStatus, PublicStorefrontResponse,
        StorefrontSettingsRequest, StorefrontSettingsResponse, SystemInfo,
    },
};
use crate::domains::DnsRecordInstructions;
use crate::domains::resolver::{DomainContext, PublicTenantContext};
use crate::model::{
    Attraction, DomainBinding, DomainStatus, DomainType, SslStatus, StorefrontSettings,
    VerificationMethod,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "haunt-storefront",
        version = "v1",
        description = "Haunt storefront domain binding and public resolution API"
    ),
    paths(
        system::system_info,
        system::system_health,
        attractions::create_attraction,
        attractions::upsert_storefront,
        domains::list_domains,
        domains::add_domain,
        domains::verify_domain,
        domains::set_primary_domain,
        domains::delete_domain,
        public::public_storefront
    ),
    components(schemas(
        FeatureFlags,
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        Attraction,
        AttractionCreateRequest,
        AttractionResponse,
        StorefrontSettings,
        StorefrontSettingsRequest,
        StorefrontSettingsResponse,
        DomainBinding,
        DomainStatus,
        DomainType,
        SslStatus,
        VerificationMethod,
        DomainCreateRequest,
        DomainCreateResponse,
        DomainListResponse,
        DnsRecordInstructions,
        DomainContext,
        PublicTenantContext,
        PublicStorefrontResponse
    )),
    tags(
        (name = "system", description = "Service metadata and health"),
        (name = "attractions", description = "Attraction registry and storefront settings"),
        (name = "domains", description = "Domain binding lifecycle"),
        (name = "public", description = "Anonymous storefront resolution")
    )
)]
pub struct ApiDoc;
