//! PostgreSQL account table.
//!
//! Expects a table of the configured name shaped as
//! `(address TEXT PRIMARY KEY, token_balance NUMERIC(28, 18) CHECK (token_balance >= 0))`
//! holding lower-case addresses. Creating and seeding it is left to the
//! deployment.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::{address::Address, config::LedgerConfig, lock::LockKey};

use super::{LedgerStore, LedgerTx, StoreError};

/// SQLSTATE raised when a value exceeds the column precision.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    table: String,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, config: &LedgerConfig) -> Self {
        Self {
            pool,
            table: config.table().to_owned(),
        }
    }

    pub async fn connect(database_url: &str, config: &LedgerConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!(table = config.table(), "PostgreSQL connection pool established");
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(PgLedgerTx {
            tx: self.pool.begin().await?,
            table: self.table.clone(),
        })
    }

    async fn balance(&self, address: &Address) -> Result<Decimal, StoreError> {
        let sql = format!(
            "SELECT token_balance FROM {} WHERE address = $1",
            self.table
        );
        sqlx::query_scalar::<_, Decimal>(&sql)
            .bind(address.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::AccountNotFound {
                address: address.clone(),
            })
    }
}

/// A `sqlx` transaction; dropping it unfinished rolls it back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
    table: String,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    /// Mirrors the in-process locks with transaction-scoped advisory locks,
    /// so several processes sharing the table stay serialized too.
    async fn lock_keys(&mut self, keys: &[LockKey]) -> Result<(), StoreError> {
        for key in keys {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(key.as_i64())
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn read_balance(&mut self, address: &Address) -> Result<Decimal, StoreError> {
        let sql = format!(
            "SELECT token_balance FROM {} WHERE address = $1",
            self.table
        );
        sqlx::query_scalar::<_, Decimal>(&sql)
            .bind(address.as_str())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| StoreError::AccountNotFound {
                address: address.clone(),
            })
    }

    async fn create_account(&mut self, address: &Address) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (address, token_balance) VALUES ($1, 0)",
            self.table
        );
        sqlx::query(&sql)
            .bind(address.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|err| classify(err, address))?;
        Ok(())
    }

    async fn apply_delta(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        self.add(from, -amount).await?;
        self.add(to, amount).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

impl PgLedgerTx {
    async fn add(&mut self, address: &Address, delta: Decimal) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET token_balance = token_balance + $1 WHERE address = $2",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(delta)
            .bind(address.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|err| classify(err, address))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AccountNotFound {
                address: address.clone(),
            });
        }
        Ok(())
    }
}

fn classify(err: sqlx::Error, address: &Address) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateAccount {
                address: address.clone(),
            };
        }
        if db.is_check_violation() || db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return StoreError::ConstraintViolation {
                address: address.clone(),
                value: db.message().to_owned(),
            };
        }
    }
    StoreError::Database(err)
}
