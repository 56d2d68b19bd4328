//! In-memory implementation of the storefront store.
//!
//! # Purpose
//! Implements [`StorefrontStore`] with `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: every domain mutation takes the single
//!   write lock over the bindings map, so the uniqueness check, the
//!   promotion clear-then-set, and the sole-binding delete guard each run
//!   against a consistent snapshot. The Postgres backend gets the same
//!   guarantees from constraints and transactions.
use super::{StoreError, StoreResult, StorefrontStore};
use crate::model::{Attraction, DomainBinding, DomainStatus, DomainType, StorefrontSettings};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory storefront store.
///
/// Attractions and settings are keyed by `tenant_id`; bindings are keyed by
/// their id with the global `domain` uniqueness enforced by a scan under the
/// same write lock that performs the insert.
pub struct InMemoryStore {
    attractions: Arc<RwLock<HashMap<String, Attraction>>>,
    settings: Arc<RwLock<HashMap<String, StorefrontSettings>>>,
    domains: Arc<RwLock<HashMap<Uuid, DomainBinding>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            attractions: Arc::new(RwLock::new(HashMap::new())),
            settings: Arc::new(RwLock::new(HashMap::new())),
            domains: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorefrontStore for InMemoryStore {
    async fn create_attraction(&self, attraction: Attraction) -> StoreResult<Attraction> {
        let mut attractions = self.attractions.write().await;
        if attractions.contains_key(&attraction.tenant_id) {
            return Err(StoreError::Conflict("attraction exists".into()));
        }
        if attractions
            .values()
            .any(|existing| existing.slug == attraction.slug)
        {
            return Err(StoreError::Conflict("slug taken".into()));
        }
        attractions.insert(attraction.tenant_id.clone(), attraction.clone());
        Ok(attraction)
    }

    async fn get_attraction(&self, tenant_id: &str) -> StoreResult<Attraction> {
        self.attractions
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("attraction".into()))
    }

    async fn get_attraction_by_slug(&self, slug: &str) -> StoreResult<Option<Attraction>> {
        Ok(self
            .attractions
            .read()
            .await
            .values()
            .find(|attraction| attraction.slug == slug)
            .cloned())
    }

    async fn upsert_settings(
        &self,
        settings: StorefrontSettings,
    ) -> StoreResult<StorefrontSettings> {
        if !self
            .attractions
            .read()
            .await
            .contains_key(&settings.tenant_id)
        {
            return Err(StoreError::NotFound("attraction".into()));
        }
        self.settings
            .write()
            .await
            .insert(settings.tenant_id.clone(), settings.clone());
        Ok(settings)
    }

    async fn get_settings(&self, tenant_id: &str) -> StoreResult<Option<StorefrontSettings>> {
        Ok(self.settings.read().await.get(tenant_id).cloned())
    }

    async fn insert_domain(&self, binding: DomainBinding) -> StoreResult<DomainBinding> {
        // Uniqueness scan and insert happen under the same write guard, so
        // two concurrent adds of the same hostname serialize and exactly one
        // wins.
        let mut domains = self.domains.write().await;
        if domains
            .values()
            .any(|existing| existing.domain == binding.domain)
        {
            return Err(StoreError::Conflict("domain exists".into()));
        }
        domains.insert(binding.id, binding.clone());
        metrics::gauge!("haunt_domain_bindings_total").set(domains.len() as f64);
        Ok(binding)
    }

    async fn get_domain(&self, tenant_id: &str, domain_id: Uuid) -> StoreResult<DomainBinding> {
        self.domains
            .read()
            .await
            .get(&domain_id)
            .filter(|binding| binding.tenant_id == tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("domain binding".into()))
    }

    async fn find_domain(&self, domain: &str) -> StoreResult<Option<DomainBinding>> {
        Ok(self
            .domains
            .read()
            .await
            .values()
            .find(|binding| binding.domain == domain)
            .cloned())
    }

    async fn list_domains(&self, tenant_id: &str) -> StoreResult<Vec<DomainBinding>> {
        let mut items: Vec<_> = self
            .domains
            .read()
            .await
            .values()
            .filter(|binding| binding.tenant_id == tenant_id)
            .cloned()
            .collect();
        items.sort_by_key(|binding| binding.created_at);
        Ok(items)
    }

    async fn update_domain(&self, binding: &DomainBinding) -> StoreResult<()> {
        let mut domains = self.domains.write().await;
        match domains.get_mut(&binding.id) {
            Some(existing) if existing.tenant_id == binding.tenant_id => {
                *existing = binding.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound("domain binding".into())),
        }
    }

    async fn promote_primary(&self, tenant_id: &str, domain_id: Uuid) -> StoreResult<()> {
        let mut domains = self.domains.write().await;
        let target = domains
            .get(&domain_id)
            .filter(|binding| binding.tenant_id == tenant_id)
            .ok_or_else(|| StoreError::NotFound("domain binding".into()))?;
        if target.status != DomainStatus::Active {
            return Err(StoreError::Conflict("binding is not active".into()));
        }
        // Clear-then-set under one guard; no interleaving can observe two
        // primaries or none.
        for binding in domains.values_mut() {
            if binding.tenant_id == tenant_id {
                binding.is_primary = binding.id == domain_id;
            }
        }
        Ok(())
    }

    async fn delete_domain(
        &self,
        tenant_id: &str,
        domain_id: Uuid,
        require_sole_binding: bool,
    ) -> StoreResult<()> {
        let mut domains = self.domains.write().await;
        if !domains
            .get(&domain_id)
            .is_some_and(|binding| binding.tenant_id == tenant_id)
        {
            return Err(StoreError::NotFound("domain binding".into()));
        }
        if require_sole_binding {
            let siblings = domains
                .values()
                .filter(|binding| binding.tenant_id == tenant_id && binding.id != domain_id)
                .count();
            if siblings > 0 {
                return Err(StoreError::Conflict("tenant has other bindings".into()));
            }
        }
        domains.remove(&domain_id);
        metrics::gauge!("haunt_domain_bindings_total").set(domains.len() as f64);
        Ok(())
    }

    async fn subdomain_for(&self, tenant_id: &str) -> StoreResult<Option<DomainBinding>> {
        Ok(self
            .domains
            .read()
            .await
            .values()
            .find(|binding| {
                binding.tenant_id == tenant_id && binding.domain_type == DomainType::Subdomain
            })
            .cloned())
    }

    async fn primary_for(&self, tenant_id: &str) -> StoreResult<Option<DomainBinding>> {
        Ok(self
            .domains
            .read()
            .await
            .values()
            .find(|binding| binding.tenant_id == tenant_id && binding.is_primary)
            .cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SslStatus, VerificationMethod};
    use chrono::Utc;

    fn binding(tenant_id: &str, domain: &str, status: DomainStatus) -> DomainBinding {
        DomainBinding {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            domain: domain.to_string(),
            domain_type: DomainType::Custom,
            is_primary: false,
            status,
            ssl_status: SslStatus::Pending,
            verification_method: Some(VerificationMethod::DnsTxt),
            verification_token: Some("haunt-verify-test".to_string()),
            verified_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn domain_uniqueness_is_global() {
        let store = InMemoryStore::new();
        store
            .insert_domain(binding("t1", "spooky.example", DomainStatus::Pending))
            .await
            .expect("first insert");
        let err = store
            .insert_domain(binding("t2", "spooky.example", DomainStatus::Pending))
            .await
            .expect_err("duplicate across tenants");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn promotion_moves_the_primary_flag() {
        let store = InMemoryStore::new();
        let mut first = binding("t1", "a.example", DomainStatus::Active);
        first.is_primary = true;
        let second = binding("t1", "b.example", DomainStatus::Active);
        let second_id = second.id;
        store.insert_domain(first).await.expect("first");
        store.insert_domain(second).await.expect("second");

        store
            .promote_primary("t1", second_id)
            .await
            .expect("promote");

        let primaries: Vec<_> = store
            .list_domains("t1")
            .await
            .expect("list")
            .into_iter()
            .filter(|b| b.is_primary)
            .collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, second_id);
    }

    #[tokio::test]
    async fn promotion_requires_active_status() {
        let store = InMemoryStore::new();
        let pending = binding("t1", "a.example", DomainStatus::Pending);
        let id = pending.id;
        store.insert_domain(pending).await.expect("insert");
        let err = store
            .promote_primary("t1", id)
            .await
            .expect_err("pending binding");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn sole_binding_guard_blocks_delete() {
        let store = InMemoryStore::new();
        let first = binding("t1", "a.example", DomainStatus::Active);
        let first_id = first.id;
        store.insert_domain(first).await.expect("first");
        store
            .insert_domain(binding("t1", "b.example", DomainStatus::Pending))
            .await
            .expect("second");

        let err = store
            .delete_domain("t1", first_id, true)
            .await
            .expect_err("guard");
        assert!(matches!(err, StoreError::Conflict(_)));

        // Without the guard the same delete goes through.
        store
            .delete_domain("t1", first_id, false)
            .await
            .expect("delete");
    }

    #[tokio::test]
    async fn tenant_scope_hides_foreign_bindings() {
        let store = InMemoryStore::new();
        let foreign = binding("t1", "a.example", DomainStatus::Active);
        let id = foreign.id;
        store.insert_domain(foreign).await.expect("insert");
        let err = store.get_domain("t2", id).await.expect_err("scoped");
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
