#![cfg(feature = "pg-tests")]
//! Postgres store tests. Require a reachable database; skipped (with a
//! notice) when none is configured.
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront::config::PostgresConfig;
use storefront::model::{
    Attraction, DomainBinding, DomainStatus, DomainType, SslStatus, StorefrontSettings,
    VerificationMethod,
};
use storefront::store::postgres::PostgresStore;
use storefront::store::{StoreError, StorefrontStore};
use uuid::Uuid;

static PG_STORE: tokio::sync::OnceCell<Arc<PostgresStore>> = tokio::sync::OnceCell::const_new();

async fn reset_postgres(url: &str) -> Result<(), sqlx::Error> {
    let pool = match tokio::time::timeout(
        std::time::Duration::from_secs(2),
        PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect(url),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => return Err(sqlx::Error::PoolTimedOut),
    };
    sqlx::query("TRUNCATE domain_bindings, storefront_settings, attractions")
        .execute(&pool)
        .await
        .map(|_| ())
}

async fn pg_store() -> Option<Arc<PostgresStore>> {
    let url = match std::env::var("HAUNT_TEST_POSTGRES_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping pg-tests: set HAUNT_TEST_POSTGRES_URL or DATABASE_URL");
            return None;
        }
    };
    let pg_cfg = PostgresConfig {
        url: url.clone(),
        max_connections: 5,
        connect_timeout_ms: 5_000,
        acquire_timeout_ms: 5_000,
    };
    let store = match PG_STORE
        .get_or_try_init(|| async { PostgresStore::connect(&pg_cfg).await.map(Arc::new) })
        .await
    {
        Ok(store) => store.clone(),
        Err(err) => {
            eprintln!("skipping pg-tests: cannot connect to postgres: {err}");
            return None;
        }
    };
    if let Err(err) = reset_postgres(&url).await {
        eprintln!("skipping pg-tests: cannot reset postgres: {err}");
        return None;
    }
    Some(store)
}

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
        verification_token: Some("haunt-verify-pg".to_string()),
        verified_at: None,
        created_at: Utc::now(),
    }
}

async fn seed_attraction(store: &PostgresStore, tenant_id: &str, slug: &str) {
    store
        .create_attraction(Attraction {
            tenant_id: tenant_id.to_string(),
            slug: slug.to_string(),
            display_name: slug.to_string(),
        })
        .await
        .expect("attraction");
}

#[tokio::test]
async fn unique_constraint_maps_to_conflict() {
    let Some(store) = pg_store().await else { return };
    seed_attraction(&store, "pg-t1", "pg-one").await;
    seed_attraction(&store, "pg-t2", "pg-two").await;

    store
        .insert_domain(binding("pg-t1", "pg-contested.example", DomainStatus::Pending))
        .await
        .expect("first insert");
    let err = store
        .insert_domain(binding("pg-t2", "pg-contested.example", DomainStatus::Pending))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn promote_and_delete_guards_round_trip() {
    let Some(store) = pg_store().await else { return };
    seed_attraction(&store, "pg-t3", "pg-three").await;

    let first = binding("pg-t3", "pg-a.example", DomainStatus::Active);
    let second = binding("pg-t3", "pg-b.example", DomainStatus::Pending);
    let first_id = first.id;
    let second_id = second.id;
    store.insert_domain(first).await.expect("first");
    store.insert_domain(second).await.expect("second");

    // Pending bindings cannot be promoted.
    let err = store
        .promote_primary("pg-t3", second_id)
        .await
        .expect_err("pending");
    assert!(matches!(err, StoreError::Conflict(_)));

    store
        .promote_primary("pg-t3", first_id)
        .await
        .expect("promote");
    let primary = store
        .primary_for("pg-t3")
        .await
        .expect("primary")
        .expect("exists");
    assert_eq!(primary.id, first_id);

    // Primary with a sibling cannot go under the sole-binding guard.
    let err = store
        .delete_domain("pg-t3", first_id, true)
        .await
        .expect_err("guard");
    assert!(matches!(err, StoreError::Conflict(_)));

    store
        .delete_domain("pg-t3", second_id, false)
        .await
        .expect("delete sibling");
    store
        .delete_domain("pg-t3", first_id, true)
        .await
        .expect("delete last");
    assert!(store.list_domains("pg-t3").await.expect("list").is_empty());
}

#[tokio::test]
async fn settings_upsert_requires_attraction() {
    let Some(store) = pg_store().await else { return };
    let err = store
        .upsert_settings(StorefrontSettings {
            tenant_id: "pg-ghost".to_string(),
            headline: String::new(),
            is_published: false,
        })
        .await
        .expect_err("missing attraction");
    assert!(matches!(err, StoreError::NotFound(_)));
}
