//! Postgres-backed implementation of the storefront store.
//!
//! # What this module is
//! Implements [`StorefrontStore`] using Postgres (via `sqlx`) as the durable
//! backing store for attractions, storefront settings, and domain bindings.
//!
//! # Key invariants
//! - Global hostname uniqueness is the `domain` column's unique constraint;
//!   the violation (SQLSTATE 23505) is mapped to [`StoreError::Conflict`]
//!   rather than being pre-checked in application code.
//! - Single primary per tenant is a partial unique index on
//!   `(tenant_id) WHERE is_primary`, and `is_primary` implies
//!   `status = 'active'` via a table CHECK. The schema refuses states the
//!   lifecycle layer must never produce.
//! - Primary promotion is one transaction (clear, then set with a status
//!   guard), so concurrent promotions serialize on the row locks.
//!
//! # Concurrency model
//! The store is shared across async handlers; `sqlx::PgPool` manages
//! connection concurrency. Pool acquisition is time-bounded so a saturated
//! database fails fast instead of hanging request handlers.
//!
//! # Operational notes
//! Migrations run at startup via `sqlx::migrate!("./migrations")` so handlers
//! can assume the schema exists. Database URLs may carry credentials; they
//! are never logged.
use super::{StoreError, StoreResult, StorefrontStore};
use crate::config::PostgresConfig;
use crate::model::{
    Attraction, DomainBinding, DomainStatus, DomainType, SslStatus, StorefrontSettings,
    VerificationMethod,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Durable storefront store backed by Postgres.
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for the `domain_bindings` table.
///
/// DB-facing structs stay separate from the domain model so schema details
/// (string enums, column names) and the parsing they require remain
/// localized here.
#[derive(Debug, Clone, FromRow)]
struct DbDomainBinding {
    id: Uuid,
    tenant_id: String,
    domain: String,
    domain_type: String,
    is_primary: bool,
    status: String,
    ssl_status: String,
    verification_method: Option<String>,
    verification_token: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbAttraction {
    tenant_id: String,
    slug: String,
    display_name: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbSettings {
    tenant_id: String,
    headline: String,
    is_published: bool,
}

const SELECT_BINDING: &str = "SELECT id, tenant_id, domain, domain_type, is_primary, status, \
     ssl_status, verification_method, verification_token, verified_at, created_at \
     FROM domain_bindings";

impl PostgresStore {
    /// Connect to Postgres and run migrations.
    ///
    /// # Errors
    /// - Connection, pool setup, or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations. For tests that manage the schema
    /// externally.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // Bounded pool acquisition: a control-path service should fail fast
        // and surface unhealth rather than hang on an overloaded database.
        let connect_options =
            PgConnectOptions::from_str(&pg.url).map_err(|err| anyhow!(err.to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;

        if run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|err| StoreError::Unexpected(err.into()))?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl StorefrontStore for PostgresStore {
    async fn create_attraction(&self, attraction: Attraction) -> StoreResult<Attraction> {
        let insert = sqlx::query(
            r#"INSERT INTO attractions (tenant_id, slug, display_name) VALUES ($1, $2, $3)"#,
        )
        .bind(&attraction.tenant_id)
        .bind(&attraction.slug)
        .bind(&attraction.display_name)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("attraction exists".into()));
            }
            return Err(StoreError::Unexpected(err.into()));
        }
        Ok(attraction)
    }

    async fn get_attraction(&self, tenant_id: &str) -> StoreResult<Attraction> {
        let row = sqlx::query_as::<_, DbAttraction>(
            "SELECT tenant_id, slug, display_name FROM attractions WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        row.map(attraction_from_db)
            .ok_or_else(|| StoreError::NotFound("attraction".into()))
    }

    async fn get_attraction_by_slug(&self, slug: &str) -> StoreResult<Option<Attraction>> {
        let row = sqlx::query_as::<_, DbAttraction>(
            "SELECT tenant_id, slug, display_name FROM attractions WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        Ok(row.map(attraction_from_db))
    }

    async fn upsert_settings(
        &self,
        settings: StorefrontSettings,
    ) -> StoreResult<StorefrontSettings> {
        let result = sqlx::query(
            r#"INSERT INTO storefront_settings (tenant_id, headline, is_published)
               VALUES ($1, $2, $3)
               ON CONFLICT (tenant_id)
               DO UPDATE SET headline = EXCLUDED.headline, is_published = EXCLUDED.is_published"#,
        )
        .bind(&settings.tenant_id)
        .bind(&settings.headline)
        .bind(settings.is_published)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(settings),
            // FK violation: the attraction does not exist.
            Err(err) if is_foreign_key_violation(&err) => {
                Err(StoreError::NotFound("attraction".into()))
            }
            Err(err) => Err(StoreError::Unexpected(err.into())),
        }
    }

    async fn get_settings(&self, tenant_id: &str) -> StoreResult<Option<StorefrontSettings>> {
        let row = sqlx::query_as::<_, DbSettings>(
            "SELECT tenant_id, headline, is_published FROM storefront_settings WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        Ok(row.map(|row| StorefrontSettings {
            tenant_id: row.tenant_id,
            headline: row.headline,
            is_published: row.is_published,
        }))
    }

    async fn insert_domain(&self, binding: DomainBinding) -> StoreResult<DomainBinding> {
        // The unique constraint on `domain` is the uniqueness guarantee;
        // two racing inserts of the same hostname resolve here, not in
        // application code.
        let insert = sqlx::query(
            r#"INSERT INTO domain_bindings
               (id, tenant_id, domain, domain_type, is_primary, status, ssl_status,
                verification_method, verification_token, verified_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(binding.id)
        .bind(&binding.tenant_id)
        .bind(&binding.domain)
        .bind(domain_type_str(binding.domain_type))
        .bind(binding.is_primary)
        .bind(status_str(binding.status))
        .bind(ssl_status_str(binding.ssl_status))
        .bind(binding.verification_method.map(method_str))
        .bind(&binding.verification_token)
        .bind(binding.verified_at)
        .bind(binding.created_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("domain exists".into()));
            }
            if is_foreign_key_violation(&err) {
                return Err(StoreError::NotFound("attraction".into()));
            }
            return Err(StoreError::Unexpected(err.into()));
        }
        Ok(binding)
    }

    async fn get_domain(&self, tenant_id: &str, domain_id: Uuid) -> StoreResult<DomainBinding> {
        let row = sqlx::query_as::<_, DbDomainBinding>(&format!(
            "{SELECT_BINDING} WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(domain_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        row.map(binding_from_db)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound("domain binding".into()))
    }

    async fn find_domain(&self, domain: &str) -> StoreResult<Option<DomainBinding>> {
        let row =
            sqlx::query_as::<_, DbDomainBinding>(&format!("{SELECT_BINDING} WHERE domain = $1"))
                .bind(domain)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| StoreError::Unexpected(err.into()))?;
        row.map(binding_from_db).transpose()
    }

    async fn list_domains(&self, tenant_id: &str) -> StoreResult<Vec<DomainBinding>> {
        let rows = sqlx::query_as::<_, DbDomainBinding>(&format!(
            "{SELECT_BINDING} WHERE tenant_id = $1 ORDER BY created_at"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        rows.into_iter().map(binding_from_db).collect()
    }

    async fn update_domain(&self, binding: &DomainBinding) -> StoreResult<()> {
        let result = sqlx::query(
            r#"UPDATE domain_bindings
               SET status = $3, ssl_status = $4, verified_at = $5
               WHERE id = $1 AND tenant_id = $2"#,
        )
        .bind(binding.id)
        .bind(&binding.tenant_id)
        .bind(status_str(binding.status))
        .bind(ssl_status_str(binding.ssl_status))
        .bind(binding.verified_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("domain binding".into()));
        }
        Ok(())
    }

    async fn promote_primary(&self, tenant_id: &str, domain_id: Uuid) -> StoreResult<()> {
        // Clear-then-set in one transaction. The second UPDATE carries the
        // status guard, so a binding that lost its Active status between the
        // caller's check and this commit cannot become primary.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        sqlx::query(
            "UPDATE domain_bindings SET is_primary = FALSE WHERE tenant_id = $1 AND is_primary",
        )
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        let promoted = sqlx::query(
            r#"UPDATE domain_bindings SET is_primary = TRUE
               WHERE id = $1 AND tenant_id = $2 AND status = 'active'"#,
        )
        .bind(domain_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        if promoted.rows_affected() == 0 {
            // Dropping the transaction rolls back the clear.
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM domain_bindings WHERE id = $1 AND tenant_id = $2",
            )
            .bind(domain_id)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?
                > 0;
            return Err(if exists {
                StoreError::Conflict("binding is not active".into())
            } else {
                StoreError::NotFound("domain binding".into())
            });
        }
        tx.commit()
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        Ok(())
    }

    async fn delete_domain(
        &self,
        tenant_id: &str,
        domain_id: Uuid,
        require_sole_binding: bool,
    ) -> StoreResult<()> {
        // The sole-binding guard is part of the DELETE itself so it is
        // evaluated against the same snapshot that performs the delete.
        let result = if require_sole_binding {
            sqlx::query(
                r#"DELETE FROM domain_bindings
                   WHERE id = $1 AND tenant_id = $2
                     AND NOT EXISTS (
                       SELECT 1 FROM domain_bindings
                       WHERE tenant_id = $2 AND id <> $1
                     )"#,
            )
            .bind(domain_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query("DELETE FROM domain_bindings WHERE id = $1 AND tenant_id = $2")
                .bind(domain_id)
                .bind(tenant_id)
                .execute(&self.pool)
                .await
        }
        .map_err(|err| StoreError::Unexpected(err.into()))?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM domain_bindings WHERE id = $1 AND tenant_id = $2",
            )
            .bind(domain_id)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?
                > 0;
            return Err(if exists {
                StoreError::Conflict("tenant has other bindings".into())
            } else {
                StoreError::NotFound("domain binding".into())
            });
        }
        Ok(())
    }

    async fn subdomain_for(&self, tenant_id: &str) -> StoreResult<Option<DomainBinding>> {
        let row = sqlx::query_as::<_, DbDomainBinding>(&format!(
            "{SELECT_BINDING} WHERE tenant_id = $1 AND domain_type = 'subdomain'"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        row.map(binding_from_db).transpose()
    }

    async fn primary_for(&self, tenant_id: &str) -> StoreResult<Option<DomainBinding>> {
        let row = sqlx::query_as::<_, DbDomainBinding>(&format!(
            "{SELECT_BINDING} WHERE tenant_id = $1 AND is_primary"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Unexpected(err.into()))?;
        row.map(binding_from_db).transpose()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23503").unwrap_or(false);
    }
    false
}

fn attraction_from_db(row: DbAttraction) -> Attraction {
    Attraction {
        tenant_id: row.tenant_id,
        slug: row.slug,
        display_name: row.display_name,
    }
}

fn binding_from_db(row: DbDomainBinding) -> StoreResult<DomainBinding> {
    Ok(DomainBinding {
        id: row.id,
        tenant_id: row.tenant_id,
        domain: row.domain,
        domain_type: parse_domain_type(&row.domain_type)?,
        is_primary: row.is_primary,
        status: parse_status(&row.status)?,
        ssl_status: parse_ssl_status(&row.ssl_status)?,
        verification_method: row
            .verification_method
            .as_deref()
            .map(parse_method)
            .transpose()?,
        verification_token: row.verification_token,
        verified_at: row.verified_at,
        created_at: row.created_at,
    })
}

fn domain_type_str(value: DomainType) -> &'static str {
    match value {
        DomainType::Subdomain => "subdomain",
        DomainType::Custom => "custom",
    }
}

fn status_str(value: DomainStatus) -> &'static str {
    match value {
        DomainStatus::Pending => "pending",
        DomainStatus::Active => "active",
        DomainStatus::Failed => "failed",
    }
}

fn ssl_status_str(value: SslStatus) -> &'static str {
    match value {
        SslStatus::Pending => "pending",
        SslStatus::Provisioning => "provisioning",
        SslStatus::Active => "active",
    }
}

fn method_str(value: VerificationMethod) -> &'static str {
    match value {
        VerificationMethod::DnsTxt => "dns_txt",
        VerificationMethod::DnsCname => "dns_cname",
    }
}

fn parse_domain_type(value: &str) -> StoreResult<DomainType> {
    match value {
        "subdomain" => Ok(DomainType::Subdomain),
        "custom" => Ok(DomainType::Custom),
        other => Err(StoreError::Unexpected(anyhow!(
            "unknown domain_type: {other}"
        ))),
    }
}

fn parse_status(value: &str) -> StoreResult<DomainStatus> {
    match value {
        "pending" => Ok(DomainStatus::Pending),
        "active" => Ok(DomainStatus::Active),
        "failed" => Ok(DomainStatus::Failed),
        other => Err(StoreError::Unexpected(anyhow!("unknown status: {other}"))),
    }
}

fn parse_ssl_status(value: &str) -> StoreResult<SslStatus> {
    match value {
        "pending" => Ok(SslStatus::Pending),
        "provisioning" => Ok(SslStatus::Provisioning),
        "active" => Ok(SslStatus::Active),
        other => Err(StoreError::Unexpected(anyhow!(
            "unknown ssl_status: {other}"
        ))),
    }
}

fn parse_method(value: &str) -> StoreResult<VerificationMethod> {
    match value {
        "dns_txt" => Ok(VerificationMethod::DnsTxt),
        "dns_cname" => Ok(VerificationMethod::DnsCname),
        other => Err(StoreError::Unexpected(anyhow!(
            "unknown verification_method: {other}"
        ))),
    }
}
