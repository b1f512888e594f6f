use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{address::Address, lock::LockKey};

pub mod in_memory_store;
#[cfg(feature = "postgres")]
pub mod postgres_store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account {address} not found")]
    AccountNotFound { address: Address },
    #[error("Account {address} already exists")]
    DuplicateAccount { address: Address },
    #[error("Balance of {address} would violate the balance column constraint: {value}")]
    ConstraintViolation { address: Address, value: String },
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistent account table.
///
/// Reads through [`LedgerStore::balance`] take no locks and see only
/// committed state. All writes go through a [`LedgerTx`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTx;

    /// Opens a new atomic unit of work.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Point lookup of a committed balance.
    async fn balance(&self, address: &Address) -> Result<Decimal, StoreError>;
}

/// One atomic unit of work against the account table.
///
/// Writes stay invisible to other units until [`LedgerTx::commit`].
/// Dropping a unit without committing rolls it back.
#[async_trait]
pub trait LedgerTx: Send {
    /// Takes store-native locks for `keys`, in the given order, scoped to
    /// this unit. Stores that rely solely on the in-process
    /// [`crate::lock::LockCoordinator`] keep the default.
    async fn lock_keys(&mut self, _keys: &[LockKey]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn read_balance(&mut self, address: &Address) -> Result<Decimal, StoreError>;

    /// Inserts a zero balance row.
    async fn create_account(&mut self, address: &Address) -> Result<(), StoreError>;

    /// Moves `amount` from `from` to `to`.
    async fn apply_delta(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
