//! Domain binding model definitions.
//!
//! # Purpose
//! Defines the hostname→tenant binding record and its closed status enums.
//!
//! # Key invariants
//! - `domain` is globally unique across all tenants.
//! - At most one binding per tenant carries `is_primary = true`, and that
//!   binding is always `Active`.
//! - Exactly one `Subdomain` binding exists per tenant once the storefront is
//!   configured; it is never deletable.
//!
//! Transitions between these states happen only inside
//! [`crate::domains::DomainService`]; the store layer persists whatever it is
//! handed.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Verification lifecycle of a binding. Governs participation in public
/// resolution: only `Active` bindings resolve.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// Created, DNS proof not yet observed.
    Pending,
    /// DNS proof observed; binding serves public traffic.
    Active,
    /// Last verification attempt did not find the proof. Retryable.
    Failed,
}

/// Advisory certificate-provisioning marker. Certificate automation lives
/// outside this service; nothing here reads this field back.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SslStatus {
    Pending,
    Provisioning,
    Active,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    /// Platform-issued `<slug>.<platform suffix>` binding, born verified.
    Subdomain,
    /// Operator-supplied hostname requiring DNS proof of ownership.
    Custom,
}

/// Ownership proof mechanism for custom domains. Fixed at creation.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// TXT record at `_haunt-verify.<domain>` containing the token.
    DnsTxt,
    /// CNAME at `<domain>` pointing at the platform routing target.
    DnsCname,
}

/// The mapping from a hostname string to a tenant, with verification and
/// primary metadata.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DomainBinding {
    pub id: Uuid,
    pub tenant_id: String,
    /// Stored lowercase; the only natural key across all tenants.
    pub domain: String,
    pub domain_type: DomainType,
    pub is_primary: bool,
    pub status: DomainStatus,
    pub ssl_status: SslStatus,
    /// `None` for subdomains, which never verify.
    pub verification_method: Option<VerificationMethod>,
    /// Proof value the operator publishes in DNS. Derived deterministically
    /// from the tenant id so retried adds hand out identical instructions.
    pub verification_token: Option<String>,
    /// Set on the first successful transition to `Active`.
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DomainBinding {
    /// Whether this binding participates in anonymous public resolution.
    pub fn is_resolvable(&self) -> bool {
        self.status == DomainStatus::Active
    }
}
