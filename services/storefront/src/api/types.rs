//! HTTP API request/response types.
//!
//! # Purpose
//! Shared payload shapes for the storefront REST API and OpenAPI schema
//! generation.
use crate::domains::DnsRecordInstructions;
use crate::domains::resolver::PublicTenantContext;
use crate::model::{Attraction, DomainBinding, StorefrontSettings, VerificationMethod};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeatureFlags {
    pub durable_storage: bool,
    pub live_dns_verification: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub api_version: String,
    pub platform_suffix: String,
    pub features: FeatureFlags,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AttractionCreateRequest {
    pub tenant_id: String,
    pub slug: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StorefrontSettingsRequest {
    pub headline: String,
    pub is_published: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StorefrontSettingsResponse {
    pub settings: StorefrontSettings,
    /// The tenant's platform subdomain, provisioned alongside the first
    /// settings write.
    pub subdomain: Option<DomainBinding>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DomainCreateRequest {
    pub domain: String,
    /// Defaults to TXT verification when omitted.
    pub verification_method: Option<VerificationMethod>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DomainCreateResponse {
    pub binding: DomainBinding,
    pub dns_record: DnsRecordInstructions,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DomainListResponse {
    pub items: Vec<DomainBinding>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AttractionResponse {
    pub attraction: Attraction,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PublicStorefrontResponse {
    pub context: PublicTenantContext,
}
