//! Domain lifecycle management.
//!
//! # Purpose
//! [`DomainService`] is the trust boundary for every domain-binding
//! mutation: adding custom domains, DNS verification, primary promotion,
//! deletion, and the one-time subdomain provisioning that accompanies a
//! tenant's first storefront configuration. All invariant checks happen
//! here; the store stays a thin persistence mechanism and only enforces the
//! constraints that must be atomic with a write.
//!
//! # Where it fits
//! HTTP handlers call into this service and translate [`DomainError`] into
//! API responses. The public resolver (read path) lives in
//! [`resolver`] and never performs the network calls made here.
pub mod hostname;
pub mod resolver;
pub mod verifier;

use crate::model::{
    DomainBinding, DomainStatus, DomainType, SslStatus, VerificationMethod,
};
use crate::store::{StoreError, StorefrontStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;
use verifier::{DnsVerifier, txt_record_name};

/// Error taxonomy for lifecycle operations.
///
/// `Validation` and `Conflict` carry operator-facing messages and are never
/// retried automatically. Infrastructure problems during verification are
/// logged and mapped to a verification failure; retrying is simply calling
/// the operation again.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        // Contextual store outcomes (NotFound/Conflict) are translated at
        // each call site; anything that reaches this blanket conversion is
        // unexpected.
        DomainError::Store(err)
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// What an operator must publish in DNS to prove control of a domain.
/// Returned from the add-domain operation and displayed verbatim.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DnsRecordInstructions {
    /// `TXT` or `CNAME`.
    pub record_type: String,
    /// Fully qualified record name to create.
    pub name: String,
    /// Expected record value (TXT) or target (CNAME).
    pub value: String,
    /// Human-readable setup text.
    pub instructions: String,
}

/// Tunable behavior of the lifecycle manager.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    /// Zone under which tenant subdomains are issued.
    pub platform_suffix: String,
    /// Canonical routing target for CNAME verification.
    pub cname_target: String,
    /// Key for deterministic verification-token derivation.
    pub token_secret: String,
    /// Minimum spacing between verification attempts per binding.
    /// Zero disables throttling.
    pub verify_cooldown: Duration,
}

/// Lifecycle manager for domain bindings. Cheap to share behind an `Arc`.
pub struct DomainService {
    store: Arc<dyn StorefrontStore>,
    verifier: Arc<dyn DnsVerifier>,
    policy: DomainPolicy,
    /// Last verification attempt per binding, for the optional cooldown.
    /// In-process state only; a multi-instance deployment throttles per
    /// instance.
    recent_attempts: Mutex<HashMap<Uuid, Instant>>,
}

impl DomainService {
    pub fn new(
        store: Arc<dyn StorefrontStore>,
        verifier: Arc<dyn DnsVerifier>,
        policy: DomainPolicy,
    ) -> Self {
        Self {
            store,
            verifier,
            policy,
            recent_attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Register a custom domain for a tenant.
    ///
    /// The returned instructions tell the operator which DNS record to
    /// publish before requesting verification.
    ///
    /// # Errors
    /// - `Validation` for a malformed hostname.
    /// - `Conflict` if the hostname is already bound, to this tenant or any
    ///   other.
    /// - `NotFound` if the tenant does not exist.
    pub async fn add_domain(
        &self,
        tenant_id: &str,
        raw_domain: &str,
        method: Option<VerificationMethod>,
    ) -> DomainResult<(DomainBinding, DnsRecordInstructions)> {
        match self.store.get_attraction(tenant_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => return Err(DomainError::NotFound("attraction")),
            Err(err) => return Err(err.into()),
        }

        let domain = hostname::normalize(raw_domain);
        if !hostname::is_valid_domain(&domain) {
            return Err(DomainError::Validation("invalid domain name".to_string()));
        }

        // Pre-check purely for the distinct operator messages; the store's
        // unique constraint is what actually closes the race between
        // concurrent adds of the same hostname.
        if let Some(existing) = self.store.find_domain(&domain).await? {
            return Err(if existing.tenant_id == tenant_id {
                DomainError::Conflict("domain is already added to this storefront".to_string())
            } else {
                DomainError::Conflict("domain is registered to another attraction".to_string())
            });
        }

        let binding = DomainBinding {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            domain,
            domain_type: DomainType::Custom,
            is_primary: false,
            status: DomainStatus::Pending,
            ssl_status: SslStatus::Pending,
            verification_method: Some(method.unwrap_or(VerificationMethod::DnsTxt)),
            verification_token: Some(derive_token(&self.policy.token_secret, tenant_id)),
            verified_at: None,
            created_at: Utc::now(),
        };

        let binding = match self.store.insert_domain(binding).await {
            Ok(binding) => binding,
            Err(StoreError::Conflict(_)) => {
                return Err(DomainError::Conflict(
                    "domain is registered to another attraction".to_string(),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(tenant_id, domain = %binding.domain, "custom domain added");
        let instructions = self.instructions_for(&binding);
        Ok((binding, instructions))
    }

    /// Run DNS verification for a binding and persist the outcome.
    ///
    /// Already-`Active` bindings return unchanged without touching DNS.
    /// `Failed` is not terminal: calling again re-attempts verification.
    ///
    /// # Errors
    /// - `NotFound` if the binding is missing under this tenant.
    /// - `Validation` when the proof is absent or the lookup failed.
    pub async fn verify_domain(
        &self,
        tenant_id: &str,
        domain_id: Uuid,
    ) -> DomainResult<DomainBinding> {
        let mut binding = match self.store.get_domain(tenant_id, domain_id).await {
            Ok(binding) => binding,
            Err(StoreError::NotFound(_)) => return Err(DomainError::NotFound("domain binding")),
            Err(err) => return Err(err.into()),
        };

        if binding.status == DomainStatus::Active {
            return Ok(binding);
        }

        let (Some(method), Some(token)) = (
            binding.verification_method,
            binding.verification_token.clone(),
        ) else {
            // Subdomains are born verified and never reach this branch via
            // the short-circuit above; a custom binding without proof
            // material is corrupt.
            return Err(DomainError::Store(StoreError::Unexpected(anyhow::anyhow!(
                "binding {domain_id} has no verification material"
            ))));
        };

        self.check_cooldown(domain_id).await?;

        let verified = match self.verifier.verify(&binding.domain, method, &token).await {
            Ok(verified) => verified,
            Err(err) => {
                // Infrastructure failure, not "record absent". Kept distinct
                // for logs/metrics, but the caller sees a verification
                // failure either way and simply retries.
                tracing::warn!(
                    tenant_id,
                    domain = %binding.domain,
                    error = %err,
                    "dns lookup failed during verification"
                );
                metrics::counter!("haunt_domain_verifications_total", "outcome" => "error")
                    .increment(1);
                false
            }
        };

        if verified {
            binding.status = DomainStatus::Active;
            binding.ssl_status = SslStatus::Provisioning;
            if binding.verified_at.is_none() {
                binding.verified_at = Some(Utc::now());
            }
            self.store.update_domain(&binding).await?;
            metrics::counter!("haunt_domain_verifications_total", "outcome" => "verified")
                .increment(1);
            tracing::info!(tenant_id, domain = %binding.domain, "domain verified");
            self.recent_attempts.lock().await.remove(&domain_id);
            Ok(binding)
        } else {
            binding.status = DomainStatus::Failed;
            self.store.update_domain(&binding).await?;
            metrics::counter!("haunt_domain_verifications_total", "outcome" => "failed")
                .increment(1);
            Err(DomainError::Validation(
                "DNS verification failed".to_string(),
            ))
        }
    }

    /// Make `domain_id` the tenant's canonical domain.
    ///
    /// # Errors
    /// - `NotFound` if the binding is missing under this tenant.
    /// - `Validation` unless the binding is `Active` — including when a
    ///   concurrent transition wins the race against the promotion.
    pub async fn set_primary_domain(&self, tenant_id: &str, domain_id: Uuid) -> DomainResult<()> {
        let binding = match self.store.get_domain(tenant_id, domain_id).await {
            Ok(binding) => binding,
            Err(StoreError::NotFound(_)) => return Err(DomainError::NotFound("domain binding")),
            Err(err) => return Err(err.into()),
        };
        if binding.status != DomainStatus::Active {
            return Err(DomainError::Validation(
                "cannot set an unverified domain as primary".to_string(),
            ));
        }
        match self.store.promote_primary(tenant_id, domain_id).await {
            Ok(()) => {
                tracing::info!(tenant_id, domain = %binding.domain, "primary domain changed");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(DomainError::NotFound("domain binding")),
            Err(StoreError::Conflict(_)) => Err(DomainError::Validation(
                "cannot set an unverified domain as primary".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a custom domain binding.
    ///
    /// # Errors
    /// - `NotFound` if the binding is missing under this tenant.
    /// - `Validation` for subdomains (never deletable) and for a primary
    ///   that still has sibling bindings.
    pub async fn delete_domain(&self, tenant_id: &str, domain_id: Uuid) -> DomainResult<()> {
        let binding = match self.store.get_domain(tenant_id, domain_id).await {
            Ok(binding) => binding,
            Err(StoreError::NotFound(_)) => return Err(DomainError::NotFound("domain binding")),
            Err(err) => return Err(err.into()),
        };
        if binding.domain_type == DomainType::Subdomain {
            return Err(DomainError::Validation(
                "cannot delete the auto-generated subdomain".to_string(),
            ));
        }
        // A primary may only go when it is the tenant's last binding; the
        // store re-evaluates that condition atomically with the delete.
        match self
            .store
            .delete_domain(tenant_id, domain_id, binding.is_primary)
            .await
        {
            Ok(()) => {
                tracing::info!(tenant_id, domain = %binding.domain, "domain deleted");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(DomainError::NotFound("domain binding")),
            Err(StoreError::Conflict(_)) => Err(DomainError::Validation(
                "set another domain as primary first".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Create the tenant's platform subdomain if it does not exist yet.
    ///
    /// Idempotent; invoked on every storefront-settings write and a no-op
    /// after the first. The subdomain is the only binding born `Active`,
    /// because the platform controls its DNS zone.
    pub async fn ensure_subdomain(&self, tenant_id: &str, slug: &str) -> DomainResult<()> {
        if self.store.subdomain_for(tenant_id).await?.is_some() {
            return Ok(());
        }
        // Usually the tenant's first binding, and then it becomes primary.
        // If a custom domain was promoted before the storefront was ever
        // configured, leave that primary in place.
        let is_primary = self.store.primary_for(tenant_id).await?.is_none();
        let now = Utc::now();
        let binding = DomainBinding {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            domain: format!("{slug}.{}", self.policy.platform_suffix),
            domain_type: DomainType::Subdomain,
            is_primary,
            status: DomainStatus::Active,
            ssl_status: SslStatus::Active,
            verification_method: None,
            verification_token: None,
            verified_at: Some(now),
            created_at: now,
        };
        match self.store.insert_domain(binding.clone()).await {
            Ok(binding) => {
                tracing::info!(tenant_id, domain = %binding.domain, "subdomain provisioned");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => {
                // Either a concurrent provisioning won, or a racing primary
                // promotion claimed the flag first. In the latter case the
                // subdomain still needs to exist, just not as primary.
                if self.store.subdomain_for(tenant_id).await?.is_some() {
                    return Ok(());
                }
                let retry = DomainBinding {
                    is_primary: false,
                    ..binding
                };
                match self.store.insert_domain(retry).await {
                    Ok(_) | Err(StoreError::Conflict(_)) => Ok(()),
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// DNS setup instructions for a binding, shown to the operator.
    pub fn instructions_for(&self, binding: &DomainBinding) -> DnsRecordInstructions {
        let token = binding.verification_token.clone().unwrap_or_default();
        match binding.verification_method {
            Some(VerificationMethod::DnsCname) => DnsRecordInstructions {
                record_type: "CNAME".to_string(),
                name: binding.domain.clone(),
                value: self.policy.cname_target.clone(),
                instructions: format!(
                    "Create a CNAME record for {} pointing at {}, then request verification. \
                     DNS changes can take up to an hour to propagate.",
                    binding.domain, self.policy.cname_target
                ),
            },
            _ => DnsRecordInstructions {
                record_type: "TXT".to_string(),
                name: txt_record_name(&binding.domain),
                value: token.clone(),
                instructions: format!(
                    "Create a TXT record named {} with the value {}, then request verification. \
                     DNS changes can take up to an hour to propagate.",
                    txt_record_name(&binding.domain),
                    token
                ),
            },
        }
    }

    async fn check_cooldown(&self, domain_id: Uuid) -> DomainResult<()> {
        if self.policy.verify_cooldown.is_zero() {
            return Ok(());
        }
        let mut attempts = self.recent_attempts.lock().await;
        let now = Instant::now();
        if let Some(last) = attempts.get(&domain_id) {
            if now.duration_since(*last) < self.policy.verify_cooldown {
                return Err(DomainError::Validation(
                    "verification was attempted too recently; try again shortly".to_string(),
                ));
            }
        }
        attempts.insert(domain_id, now);
        Ok(())
    }
}

/// Deterministic, keyed verification token: stable across retries so the
/// operator's published record stays valid, keyed so it cannot be predicted
/// from the tenant id alone.
pub fn derive_token(secret: &str, tenant_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b"|");
    hasher.update(tenant_id.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("haunt-verify-{}", &digest[..32])
}
