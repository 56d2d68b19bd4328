//! Haunt storefront HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, the DNS verifier, and the HTTP router,
//! then starts the API server and the metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup
//! logic.
mod api;
mod app;
mod config;
mod domains;
mod model;
mod observability;
mod store;

use anyhow::Context;
use api::types::FeatureFlags;
use app::{AppState, build_router};
use domains::resolver::{ResolverPolicy, TenantResolver};
use domains::verifier::{AcceptAllVerifier, DnsVerifier, PublicDnsVerifier};
use domains::{DomainPolicy, DomainService};
use std::future::Future;
use std::sync::Arc;
use store::{StorefrontStore, memory::InMemoryStore, postgres::PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::StorefrontConfig::from_env_or_yaml().expect("storefront config");
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: config::StorefrontConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("haunt-storefront");
    let state = build_state(config.clone()).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);

    let addr = config.bind_addr;
    tracing::info!(%addr, "storefront service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: config::StorefrontConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn StorefrontStore> = match config.storage {
        config::StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        config::StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };

    let verifier: Arc<dyn DnsVerifier> = match config.dns_mode {
        config::DnsMode::Live => Arc::new(PublicDnsVerifier::new(
            &config.dns_resolvers,
            &config.cname_target,
            config.dns_timeout,
        )),
        config::DnsMode::AcceptAll => Arc::new(AcceptAllVerifier::new()),
    };

    let domains = Arc::new(DomainService::new(
        store.clone(),
        verifier,
        DomainPolicy {
            platform_suffix: config.platform_suffix.clone(),
            cname_target: config.cname_target.clone(),
            token_secret: config.token_secret.clone(),
            verify_cooldown: config.verify_cooldown,
        },
    ));

    let resolver = Arc::new(TenantResolver::new(
        store.clone(),
        ResolverPolicy {
            platform_suffix: config.platform_suffix.clone(),
            slug_fallback: config.slug_fallback,
        },
    ));

    Ok(AppState {
        api_version: "v1".to_string(),
        platform_suffix: config.platform_suffix.clone(),
        features: FeatureFlags {
            durable_storage: store.is_durable(),
            live_dns_verification: config.dns_mode == config::DnsMode::Live,
        },
        store,
        domains,
        resolver,
    })
}
