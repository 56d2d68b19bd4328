//! Attraction (tenant) model definitions.
//!
//! # Purpose
//! Defines the tenant directory record and the public storefront settings
//! consumed by the resolver's publish gate.
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A tenant of the platform. Owns exactly one storefront configuration and
/// zero-or-more domain bindings.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Attraction {
    pub tenant_id: String,
    /// Unique, lowercase, label-grammar identifier. Doubles as the leftmost
    /// label of the auto-provisioned subdomain.
    pub slug: String,
    pub display_name: String,
}

/// Public storefront configuration for an attraction.
///
/// Anonymous resolution only succeeds while `is_published` is true; the rest
/// of the storefront content (pages, FAQs, announcements) lives in sibling
/// services.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StorefrontSettings {
    pub tenant_id: String,
    pub headline: String,
    pub is_published: bool,
}
