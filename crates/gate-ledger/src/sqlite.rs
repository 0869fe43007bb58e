//! SQLite Ledger
//!
//! One `payments` table keyed by `(tenant_key, label)` instead of a table
//! per tenant, so an unexpected tenant key can never turn into dynamic DDL.
//! Connections come from a shared pool and are checked out per operation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use gate_core::TenantKey;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::Result;
use crate::record::{PaymentMethod, PaymentRecord, PaymentStatus};
use crate::store::{LedgerStore, MarkOutcome};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS payments (
    tenant_key      TEXT NOT NULL,
    label           TEXT NOT NULL,
    beneficiary     TEXT NOT NULL,
    status          TEXT NOT NULL,
    payment_method  TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    PRIMARY KEY (tenant_key, label)
)
";

/// sqlx-backed ledger over a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (creating if missing) and migrate the database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let ledger = Self { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    /// Wrap an existing pool (tests use `sqlite::memory:`).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let ledger = Self { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn upsert_pending(
        &self,
        tenant: &TenantKey,
        label: &str,
        beneficiary: &str,
        method: Option<PaymentMethod>,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO payments \
             (tenant_key, label, beneficiary, status, payment_method, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
             ON CONFLICT (tenant_key, label) DO UPDATE \
             SET beneficiary = excluded.beneficiary, \
                 status = excluded.status, \
                 payment_method = excluded.payment_method, \
                 updated_at = excluded.updated_at",
        )
        .bind(tenant.as_str())
        .bind(label)
        .bind(beneficiary)
        .bind(PaymentStatus::Pending)
        .bind(method)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(tenant = %tenant, label = %label, "Stored pending payment");
        Ok(())
    }

    async fn lookup_beneficiary(
        &self,
        tenant: &TenantKey,
        label: &str,
    ) -> Result<Option<String>> {
        let beneficiary = sqlx::query_scalar(
            "SELECT beneficiary FROM payments WHERE tenant_key = ?1 AND label = ?2",
        )
        .bind(tenant.as_str())
        .bind(label)
        .fetch_optional(&self.pool)
        .await?;
        Ok(beneficiary)
    }

    async fn mark_success(&self, tenant: &TenantKey, label: &str) -> Result<MarkOutcome> {
        // Guarded update: of any number of concurrent callers, exactly one
        // can see rows_affected == 1. Everyone else reads back the status
        // the row settled on.
        loop {
            let updated = sqlx::query(
                "UPDATE payments SET status = ?3, updated_at = ?4 \
                 WHERE tenant_key = ?1 AND label = ?2 AND status <> ?3",
            )
            .bind(tenant.as_str())
            .bind(label)
            .bind(PaymentStatus::Success)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

            if updated.rows_affected() == 1 {
                tracing::info!(tenant = %tenant, label = %label, "Payment marked success");
                return Ok(MarkOutcome::Transitioned);
            }

            let status: Option<PaymentStatus> = sqlx::query_scalar(
                "SELECT status FROM payments WHERE tenant_key = ?1 AND label = ?2",
            )
            .bind(tenant.as_str())
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;

            match status {
                None => return Ok(MarkOutcome::NotFound),
                Some(PaymentStatus::Success) => return Ok(MarkOutcome::AlreadySuccess),
                // A concurrent upsert reset the row to pending between the
                // two statements; take another pass.
                Some(PaymentStatus::Pending) => {}
            }
        }
    }

    async fn contains(&self, tenant: &TenantKey, label: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM payments WHERE tenant_key = ?1 AND label = ?2",
        )
        .bind(tenant.as_str())
        .bind(label)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn get(&self, tenant: &TenantKey, label: &str) -> Result<Option<PaymentRecord>> {
        let record = sqlx::query_as(
            "SELECT label, beneficiary, status, payment_method, created_at, updated_at \
             FROM payments WHERE tenant_key = ?1 AND label = ?2",
        )
        .bind(tenant.as_str())
        .bind(label)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ledger() -> SqliteLedger {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteLedger::from_pool(pool).await.unwrap()
    }

    fn key(s: &str) -> TenantKey {
        TenantKey::new(s).unwrap()
    }

    #[tokio::test]
    async fn upsert_then_lookup_round_trip() {
        let ledger = ledger().await;
        let tenant = key("bot1");
        let label = uuid::Uuid::new_v4().to_string();

        ledger
            .upsert_pending(&tenant, &label, "555", Some(PaymentMethod::Redirect))
            .await
            .unwrap();

        assert_eq!(
            ledger.lookup_beneficiary(&tenant, &label).await.unwrap(),
            Some("555".to_string())
        );
        let record = ledger.get(&tenant, &label).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.payment_method, Some(PaymentMethod::Redirect));
    }

    #[tokio::test]
    async fn upsert_overwrites_and_resets_status() {
        let ledger = ledger().await;
        let tenant = key("bot1");

        ledger
            .upsert_pending(&tenant, "lbl", "111", None)
            .await
            .unwrap();
        assert_eq!(
            ledger.mark_success(&tenant, "lbl").await.unwrap(),
            MarkOutcome::Transitioned
        );

        // Retried session initiation overwrites the beneficiary and resets
        // the record to pending.
        ledger
            .upsert_pending(&tenant, "lbl", "222", None)
            .await
            .unwrap();
        let record = ledger.get(&tenant, "lbl").await.unwrap().unwrap();
        assert_eq!(record.beneficiary, "222");
        assert_eq!(record.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn mark_success_is_idempotent() {
        let ledger = ledger().await;
        let tenant = key("bot1");

        ledger
            .upsert_pending(&tenant, "lbl", "111", None)
            .await
            .unwrap();

        assert_eq!(
            ledger.mark_success(&tenant, "lbl").await.unwrap(),
            MarkOutcome::Transitioned
        );
        assert_eq!(
            ledger.mark_success(&tenant, "lbl").await.unwrap(),
            MarkOutcome::AlreadySuccess
        );
        assert_eq!(
            ledger.mark_success(&tenant, "missing").await.unwrap(),
            MarkOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn partitions_are_isolated_per_tenant() {
        let ledger = ledger().await;
        ledger
            .upsert_pending(&key("bot1"), "lbl", "111", None)
            .await
            .unwrap();

        assert!(ledger.contains(&key("bot1"), "lbl").await.unwrap());
        assert!(!ledger.contains(&key("bot2"), "lbl").await.unwrap());
        assert_eq!(
            ledger.mark_success(&key("bot2"), "lbl").await.unwrap(),
            MarkOutcome::NotFound
        );
    }
}
