//! Lifecycle-manager property tests against the in-memory store.
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use storefront::domains::verifier::{DnsLookupError, DnsVerifier, StaticDnsVerifier};
use storefront::domains::{DomainError, DomainPolicy, DomainService, derive_token};
use storefront::model::{Attraction, DomainStatus, SslStatus, VerificationMethod};
use storefront::store::StorefrontStore;
use storefront::store::memory::InMemoryStore;

const SECRET: &str = "lifecycle-secret";
const SUFFIX: &str = "haunt.site";
const CNAME_TARGET: &str = "storefronts.haunt.site";

/// Counts verify calls so tests can assert when DNS was (not) consulted.
struct CountingVerifier {
    inner: Arc<dyn DnsVerifier>,
    calls: AtomicUsize,
}

impl CountingVerifier {
    fn wrapping(inner: Arc<dyn DnsVerifier>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsVerifier for CountingVerifier {
    async fn verify(
        &self,
        domain: &str,
        method: VerificationMethod,
        token: &str,
    ) -> Result<bool, DnsLookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(domain, method, token).await
    }
}

/// Verifier that always fails with an infrastructure error.
struct BrokenResolver;

#[async_trait]
impl DnsVerifier for BrokenResolver {
    async fn verify(
        &self,
        _domain: &str,
        _method: VerificationMethod,
        _token: &str,
    ) -> Result<bool, DnsLookupError> {
        Err(DnsLookupError::Timeout)
    }
}

fn service_with(
    store: Arc<dyn StorefrontStore>,
    verifier: Arc<dyn DnsVerifier>,
) -> DomainService {
    DomainService::new(
        store,
        verifier,
        DomainPolicy {
            platform_suffix: SUFFIX.to_string(),
            cname_target: CNAME_TARGET.to_string(),
            token_secret: SECRET.to_string(),
            verify_cooldown: std::time::Duration::ZERO,
        },
    )
}

async fn seed_attractions(store: &dyn StorefrontStore, tenants: &[(&str, &str)]) {
    for (tenant_id, slug) in tenants {
        store
            .create_attraction(Attraction {
                tenant_id: tenant_id.to_string(),
                slug: slug.to_string(),
                display_name: slug.to_string(),
            })
            .await
            .expect("attraction");
    }
}

#[tokio::test]
async fn concurrent_adds_of_one_domain_yield_one_binding() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one"), ("t2", "two")]).await;
    let service = Arc::new(service_with(
        store.clone(),
        Arc::new(StaticDnsVerifier::new(CNAME_TARGET)),
    ));

    let (a, b) = tokio::join!(
        service.add_domain("t1", "contested.example", None),
        service.add_domain("t2", "contested.example", None),
    );

    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(
        outcomes.iter().filter(|ok| **ok).count(),
        1,
        "exactly one add should win"
    );
    let loser = if outcomes[0] { b } else { a };
    assert!(matches!(loser, Err(DomainError::Conflict(_))));

    let binding = store
        .find_domain("contested.example")
        .await
        .expect("lookup")
        .expect("binding");
    let total = store
        .list_domains(&binding.tenant_id)
        .await
        .expect("list")
        .len();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn re_adding_your_own_domain_is_a_distinct_conflict() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one"), ("t2", "two")]).await;
    let service = service_with(store, Arc::new(StaticDnsVerifier::new(CNAME_TARGET)));

    service
        .add_domain("t1", "mine.example", None)
        .await
        .expect("add");

    let same_tenant = service
        .add_domain("t1", "mine.example", None)
        .await
        .expect_err("own duplicate");
    match same_tenant {
        DomainError::Conflict(message) => assert!(message.contains("this storefront")),
        other => panic!("unexpected error: {other:?}"),
    }

    let other_tenant = service
        .add_domain("t2", "mine.example", None)
        .await
        .expect_err("foreign duplicate");
    match other_tenant {
        DomainError::Conflict(message) => assert!(message.contains("another attraction")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn verification_success_failure_and_retry() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let token = derive_token(SECRET, "t1");

    // No TXT record yet: verification fails and the binding is retryable.
    let service = service_with(store.clone(), Arc::new(StaticDnsVerifier::new(CNAME_TARGET)));
    let (binding, _) = service
        .add_domain("t1", "wavering.example", None)
        .await
        .expect("add");
    let err = service
        .verify_domain("t1", binding.id)
        .await
        .expect_err("no record");
    assert!(matches!(err, DomainError::Validation(_)));
    let stored = store
        .get_domain("t1", binding.id)
        .await
        .expect("stored binding");
    assert_eq!(stored.status, DomainStatus::Failed);
    assert!(stored.verified_at.is_none());

    // Operator publishes the record; the same call now succeeds.
    let service = service_with(
        store.clone(),
        Arc::new(
            StaticDnsVerifier::new(CNAME_TARGET)
                .with_txt("_haunt-verify.wavering.example", &token),
        ),
    );
    let verified = service
        .verify_domain("t1", binding.id)
        .await
        .expect("verify");
    assert_eq!(verified.status, DomainStatus::Active);
    assert_eq!(verified.ssl_status, SslStatus::Provisioning);
    assert!(verified.verified_at.is_some());
}

#[tokio::test]
async fn verifying_an_active_binding_skips_dns() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let token = derive_token(SECRET, "t1");
    let counting = CountingVerifier::wrapping(Arc::new(
        StaticDnsVerifier::new(CNAME_TARGET).with_txt("_haunt-verify.steady.example", &token),
    ));
    let service = service_with(store.clone(), counting.clone());

    let (binding, _) = service
        .add_domain("t1", "steady.example", None)
        .await
        .expect("add");
    let first = service
        .verify_domain("t1", binding.id)
        .await
        .expect("first verify");
    assert_eq!(counting.calls(), 1);

    let second = service
        .verify_domain("t1", binding.id)
        .await
        .expect("idempotent verify");
    assert_eq!(counting.calls(), 1, "no further DNS query");
    assert_eq!(second.verified_at, first.verified_at);
}

#[tokio::test]
async fn resolver_outage_reads_as_failure_but_retries() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let token = derive_token(SECRET, "t1");

    let service = service_with(store.clone(), Arc::new(BrokenResolver));
    let (binding, _) = service
        .add_domain("t1", "flaky.example", None)
        .await
        .expect("add");
    let err = service
        .verify_domain("t1", binding.id)
        .await
        .expect_err("outage");
    assert!(matches!(err, DomainError::Validation(_)));

    // Once the resolver recovers, the existing binding verifies.
    let service = service_with(
        store.clone(),
        Arc::new(
            StaticDnsVerifier::new(CNAME_TARGET).with_txt("_haunt-verify.flaky.example", &token),
        ),
    );
    let verified = service
        .verify_domain("t1", binding.id)
        .await
        .expect("retry succeeds");
    assert_eq!(verified.status, DomainStatus::Active);
}

#[tokio::test]
async fn cname_method_verifies_against_platform_target() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let service = service_with(
        store.clone(),
        Arc::new(
            StaticDnsVerifier::new(CNAME_TARGET)
                .with_cname("aliased.example", "storefronts.haunt.site."),
        ),
    );

    let (binding, instructions) = service
        .add_domain("t1", "aliased.example", Some(VerificationMethod::DnsCname))
        .await
        .expect("add");
    assert_eq!(instructions.record_type, "CNAME");
    assert_eq!(instructions.name, "aliased.example");
    assert_eq!(instructions.value, CNAME_TARGET);

    let verified = service
        .verify_domain("t1", binding.id)
        .await
        .expect("verify");
    assert_eq!(verified.status, DomainStatus::Active);
}

#[tokio::test]
async fn promotion_requires_verification_and_survives_races() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let token = derive_token(SECRET, "t1");
    let verifier = Arc::new(
        StaticDnsVerifier::new(CNAME_TARGET)
            .with_txt("_haunt-verify.first.example", &token)
            .with_txt("_haunt-verify.second.example", &token),
    );
    let service = Arc::new(service_with(store.clone(), verifier));

    let (pending, _) = service
        .add_domain("t1", "unready.example", None)
        .await
        .expect("add");
    let err = service
        .set_primary_domain("t1", pending.id)
        .await
        .expect_err("pending cannot be primary");
    assert!(matches!(err, DomainError::Validation(_)));

    let (first, _) = service
        .add_domain("t1", "first.example", None)
        .await
        .expect("add first");
    let (second, _) = service
        .add_domain("t1", "second.example", None)
        .await
        .expect("add second");
    service
        .verify_domain("t1", first.id)
        .await
        .expect("verify first");
    service
        .verify_domain("t1", second.id)
        .await
        .expect("verify second");

    let (a, b) = tokio::join!(
        service.set_primary_domain("t1", first.id),
        service.set_primary_domain("t1", second.id),
    );
    a.expect("first promotion");
    b.expect("second promotion");

    let primaries: Vec<_> = store
        .list_domains("t1")
        .await
        .expect("list")
        .into_iter()
        .filter(|binding| binding.is_primary)
        .collect();
    assert_eq!(primaries.len(), 1, "never two primaries");
    assert_eq!(primaries[0].status, DomainStatus::Active);
}

#[tokio::test]
async fn subdomain_provisioning_is_idempotent_and_immortal() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "phantom")]).await;
    let service = service_with(store.clone(), Arc::new(StaticDnsVerifier::new(CNAME_TARGET)));

    service
        .ensure_subdomain("t1", "phantom")
        .await
        .expect("provision");
    service
        .ensure_subdomain("t1", "phantom")
        .await
        .expect("no-op");

    let bindings = store.list_domains("t1").await.expect("list");
    assert_eq!(bindings.len(), 1);
    let subdomain = &bindings[0];
    assert_eq!(subdomain.domain, "phantom.haunt.site");
    assert_eq!(subdomain.status, DomainStatus::Active);
    assert_eq!(subdomain.ssl_status, SslStatus::Active);
    assert!(subdomain.is_primary);
    assert!(subdomain.verified_at.is_some());
    assert!(subdomain.verification_method.is_none());

    let err = service
        .delete_domain("t1", subdomain.id)
        .await
        .expect_err("subdomains are permanent");
    match err {
        DomainError::Validation(message) => assert!(message.contains("subdomain")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn primary_deletion_guard_allows_only_the_last_binding() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let token = derive_token(SECRET, "t1");
    let service = service_with(
        store.clone(),
        Arc::new(
            StaticDnsVerifier::new(CNAME_TARGET)
                .with_txt("_haunt-verify.keeper.example", &token)
                .with_txt("_haunt-verify.spare.example", &token),
        ),
    );

    let (keeper, _) = service
        .add_domain("t1", "keeper.example", None)
        .await
        .expect("add keeper");
    let (spare, _) = service
        .add_domain("t1", "spare.example", None)
        .await
        .expect("add spare");
    service
        .verify_domain("t1", keeper.id)
        .await
        .expect("verify");
    service
        .set_primary_domain("t1", keeper.id)
        .await
        .expect("promote");

    let err = service
        .delete_domain("t1", keeper.id)
        .await
        .expect_err("primary with siblings");
    assert!(matches!(err, DomainError::Validation(_)));

    // Non-primary siblings delete freely; the now-sole primary may go too.
    service
        .delete_domain("t1", spare.id)
        .await
        .expect("delete spare");
    service
        .delete_domain("t1", keeper.id)
        .await
        .expect("delete last binding");
    assert!(store.list_domains("t1").await.expect("list").is_empty());
}

#[tokio::test]
async fn cooldown_throttles_repeated_verification() {
    let store: Arc<dyn StorefrontStore> = Arc::new(InMemoryStore::new());
    seed_attractions(store.as_ref(), &[("t1", "one")]).await;
    let service = DomainService::new(
        store.clone(),
        Arc::new(StaticDnsVerifier::new(CNAME_TARGET)),
        DomainPolicy {
            platform_suffix: SUFFIX.to_string(),
            cname_target: CNAME_TARGET.to_string(),
            token_secret: SECRET.to_string(),
            verify_cooldown: std::time::Duration::from_secs(60),
        },
    );

    let (binding, _) = service
        .add_domain("t1", "throttled.example", None)
        .await
        .expect("add");
    let _ = service
        .verify_domain("t1", binding.id)
        .await
        .expect_err("no record");
    let err = service
        .verify_domain("t1", binding.id)
        .await
        .expect_err("cooldown");
    match err {
        DomainError::Validation(message) => assert!(message.contains("too recently")),
        other => panic!("unexpected error: {other:?}"),
    }
}
