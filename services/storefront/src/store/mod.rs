//! Storage abstraction for the storefront service.
//!
//! # Purpose
//! Declares the [`StorefrontStore`] trait implemented by the in-memory and
//! Postgres backends. The store is intentionally thin: it persists records
//! and enforces only the constraints that must be atomic with a write
//! (domain uniqueness, single-primary promotion, the sole-binding delete
//! guard). Every other invariant check lives in
//! [`crate::domains::DomainService`], which is the trust boundary for
//! domain mutations.
use crate::model::{Attraction, DomainBinding, StorefrontSettings};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait StorefrontStore: Send + Sync {
    // Attractions (tenant directory).
    async fn create_attraction(&self, attraction: Attraction) -> StoreResult<Attraction>;
    async fn get_attraction(&self, tenant_id: &str) -> StoreResult<Attraction>;
    /// Slug lookup for the resolver's fallback path. `None` is an expected
    /// outcome, not an error.
    async fn get_attraction_by_slug(&self, slug: &str) -> StoreResult<Option<Attraction>>;

    // Storefront settings.
    async fn upsert_settings(&self, settings: StorefrontSettings)
    -> StoreResult<StorefrontSettings>;
    async fn get_settings(&self, tenant_id: &str) -> StoreResult<Option<StorefrontSettings>>;

    // Domain bindings.
    //
    // `insert_domain` must reject a duplicate `domain` atomically with the
    // insert (unique constraint, not check-then-act) and surface it as
    // `Conflict`.
    async fn insert_domain(&self, binding: DomainBinding) -> StoreResult<DomainBinding>;
    /// Tenant-scoped fetch. A binding owned by another tenant is `NotFound`
    /// here; existence must not leak across tenants.
    async fn get_domain(&self, tenant_id: &str, domain_id: Uuid) -> StoreResult<DomainBinding>;
    /// Global lookup by normalized hostname. The one read that intentionally
    /// crosses tenant boundaries (uniqueness pre-check and public
    /// resolution).
    async fn find_domain(&self, domain: &str) -> StoreResult<Option<DomainBinding>>;
    async fn list_domains(&self, tenant_id: &str) -> StoreResult<Vec<DomainBinding>>;
    /// Persist verification-state changes (`status`, `ssl_status`,
    /// `verified_at`) for an existing binding.
    async fn update_domain(&self, binding: &DomainBinding) -> StoreResult<()>;
    /// Atomically clear `is_primary` across the tenant's bindings and set it
    /// on `domain_id`, requiring that binding to be `Active`. No
    /// interleaving of two promotions may observe zero or two primaries.
    /// Returns `Conflict` if the target is not `Active` at commit time.
    async fn promote_primary(&self, tenant_id: &str, domain_id: Uuid) -> StoreResult<()>;
    /// Delete a binding. With `require_sole_binding`, the delete only
    /// succeeds if the binding is the tenant's last one, evaluated
    /// atomically with the delete; otherwise returns `Conflict`.
    async fn delete_domain(
        &self,
        tenant_id: &str,
        domain_id: Uuid,
        require_sole_binding: bool,
    ) -> StoreResult<()>;
    async fn subdomain_for(&self, tenant_id: &str) -> StoreResult<Option<DomainBinding>>;
    async fn primary_for(&self, tenant_id: &str) -> StoreResult<Option<DomainBinding>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
