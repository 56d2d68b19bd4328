//! Public tenant resolution.
//!
//! # Purpose
//! Maps an arbitrary public-facing identifier (a request host or an
//! attraction slug) to the owning tenant and its canonical URL. This is the
//! read path exercised on every anonymous storefront request: it only reads
//! persisted state and never performs DNS lookups.
//!
//! # Resolution order
//! 1. `identifier` as an `Active` domain binding — authoritative when found.
//! 2. `identifier` as an attraction slug, synthesizing the expected platform
//!    subdomain as the current domain (gated by the slug-fallback policy).
//! 3. Neither → `None`. "Not found" is an expected outcome for public
//!    traffic, not an error, and the caller cannot distinguish an unknown
//!    identifier from an unpublished storefront.
use crate::config::SlugFallback;
use crate::domains::hostname;
use crate::model::{Attraction, DomainStatus, DomainType};
use crate::store::{StoreError, StoreResult, StorefrontStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Domain facts attached to a resolved tenant.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DomainContext {
    /// The identifier the visitor arrived on, normalized.
    pub current: String,
    /// Outward-facing base URL: the active primary domain when one exists,
    /// otherwise the current domain.
    pub canonical_url: String,
}

/// Everything the storefront assembly layer needs to render for a tenant.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PublicTenantContext {
    pub tenant_id: String,
    pub slug: String,
    pub display_name: String,
    pub headline: String,
    pub domain: DomainContext,
}

#[derive(Debug, Clone)]
pub struct ResolverPolicy {
    pub platform_suffix: String,
    pub slug_fallback: SlugFallback,
}

pub struct TenantResolver {
    store: Arc<dyn StorefrontStore>,
    policy: ResolverPolicy,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn StorefrontStore>, policy: ResolverPolicy) -> Self {
        Self { store, policy }
    }

    /// Resolve a host header or slug to a published tenant.
    ///
    /// # Errors
    /// Only store failures propagate; every "no such tenant" shape is
    /// `Ok(None)`.
    pub async fn resolve_public_tenant(
        &self,
        identifier: &str,
    ) -> StoreResult<Option<PublicTenantContext>> {
        let ident = hostname::normalize(hostname::strip_port(identifier));
        if ident.is_empty() {
            return Ok(None);
        }

        let resolved = match self.resolve_identifier(&ident).await? {
            Some(resolved) => resolved,
            None => {
                metrics::counter!("haunt_public_resolutions_total", "outcome" => "miss")
                    .increment(1);
                return Ok(None);
            }
        };
        let (attraction, current_domain) = resolved;

        // Unpublished tenants are invisible to anonymous traffic no matter
        // how valid their domains are.
        let published = self
            .store
            .get_settings(&attraction.tenant_id)
            .await?
            .filter(|settings| settings.is_published);
        let Some(settings) = published else {
            metrics::counter!("haunt_public_resolutions_total", "outcome" => "miss").increment(1);
            return Ok(None);
        };

        let canonical_domain = self
            .store
            .primary_for(&attraction.tenant_id)
            .await?
            .filter(|binding| binding.is_resolvable())
            .map(|binding| binding.domain)
            .unwrap_or_else(|| current_domain.clone());

        metrics::counter!("haunt_public_resolutions_total", "outcome" => "hit").increment(1);
        Ok(Some(PublicTenantContext {
            tenant_id: attraction.tenant_id,
            slug: attraction.slug,
            display_name: attraction.display_name,
            headline: settings.headline,
            domain: DomainContext {
                current: current_domain,
                canonical_url: format!("https://{canonical_domain}"),
            },
        }))
    }

    /// Steps 1 and 2: domain binding first, slug fallback second.
    async fn resolve_identifier(&self, ident: &str) -> StoreResult<Option<(Attraction, String)>> {
        if let Some(binding) = self.store.find_domain(ident).await? {
            if binding.is_resolvable() {
                return match self.store.get_attraction(&binding.tenant_id).await {
                    Ok(attraction) => Ok(Some((attraction, ident.to_string()))),
                    // A binding without its attraction is unexpected but
                    // must read as "not found", not a 500, on this path.
                    Err(StoreError::NotFound(_)) => Ok(None),
                    Err(err) => Err(err),
                };
            }
            // An existing but inactive binding does not shadow the slug
            // fallback; fall through.
        }

        let Some(attraction) = self.store.get_attraction_by_slug(ident).await? else {
            return Ok(None);
        };
        if self.policy.slug_fallback == SlugFallback::UntilCustomDomain
            && self.has_active_custom_domain(&attraction.tenant_id).await?
        {
            return Ok(None);
        }
        let current = format!("{}.{}", attraction.slug, self.policy.platform_suffix);
        Ok(Some((attraction, current)))
    }

    async fn has_active_custom_domain(&self, tenant_id: &str) -> StoreResult<bool> {
        Ok(self
            .store
            .list_domains(tenant_id)
            .await?
            .iter()
            .any(|binding| {
                binding.domain_type == DomainType::Custom && binding.status == DomainStatus::Active
            }))
    }
}
