use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    account::{Account, SEED_BALANCE, fits_balance_column},
    address::Address,
    config::LedgerConfig,
};

use super::{LedgerStore, LedgerTx, StoreError};

type Table = BTreeMap<Address, Decimal>;

/// In-process database of named account tables.
///
/// Clones and [`InMemoryStore::with_table`] views share the same data.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
    table: String,
}

impl InMemoryStore {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            tables: Arc::default(),
            table: config.table().to_owned(),
        }
    }

    /// Another table of the same database.
    pub fn with_table(&self, config: &LedgerConfig) -> Self {
        Self {
            tables: self.tables.clone(),
            table: config.table().to_owned(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Out-of-band provisioning of an account row.
    pub fn insert_account(&self, address: &Address, balance: Decimal) -> Result<(), StoreError> {
        check_column(address, balance)?;
        let mut tables = self.lock_tables();
        let table = tables.entry(self.table.clone()).or_default();
        if table.contains_key(address) {
            return Err(StoreError::DuplicateAccount {
                address: address.clone(),
            });
        }
        table.insert(address.clone(), balance);
        Ok(())
    }

    /// Funds the well-known seed account.
    pub fn seed(&self) -> Result<(), StoreError> {
        self.insert_account(&Address::zero(), SEED_BALANCE)
    }

    /// Removes every row of this table.
    pub fn clear(&self) {
        self.lock_tables().remove(&self.table);
    }

    /// Committed rows, ordered by address.
    pub fn accounts(&self) -> Vec<Account> {
        self.lock_tables()
            .get(&self.table)
            .map(|table| {
                table
                    .iter()
                    .map(|(address, balance)| Account {
                        address: address.clone(),
                        balance: *balance,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn committed(&self, address: &Address) -> Option<Decimal> {
        self.lock_tables()
            .get(&self.table)
            .and_then(|table| table.get(address).copied())
    }

    fn lock_tables(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        // critical sections never leave a table half written
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTx {
            store: self.clone(),
            created: BTreeSet::new(),
            pending: BTreeMap::new(),
        })
    }

    async fn balance(&self, address: &Address) -> Result<Decimal, StoreError> {
        self.committed(address)
            .ok_or_else(|| StoreError::AccountNotFound {
                address: address.clone(),
            })
    }
}

/// Unit of work buffering its writes until commit.
///
/// Dropping it discards the buffer, which is all a rollback needs to do.
#[derive(Debug)]
pub struct InMemoryTx {
    store: InMemoryStore,
    created: BTreeSet<Address>,
    pending: Table,
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn read_balance(&mut self, address: &Address) -> Result<Decimal, StoreError> {
        self.visible(address)
            .ok_or_else(|| StoreError::AccountNotFound {
                address: address.clone(),
            })
    }

    async fn create_account(&mut self, address: &Address) -> Result<(), StoreError> {
        if self.visible(address).is_some() {
            return Err(StoreError::DuplicateAccount {
                address: address.clone(),
            });
        }
        self.created.insert(address.clone());
        self.pending.insert(address.clone(), Decimal::ZERO);
        Ok(())
    }

    async fn apply_delta(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let debited = self.read_balance(from).await?.checked_sub(amount);
        let debited = column_value(from, debited)?;
        self.pending.insert(from.clone(), debited);

        let credited = self.read_balance(to).await?.checked_add(amount);
        let credited = column_value(to, credited)?;
        self.pending.insert(to.clone(), credited);
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut tables = self.store.lock_tables();
        let table = tables.entry(self.store.table.clone()).or_default();
        if let Some(address) = self.created.iter().find(|a| table.contains_key(*a)) {
            return Err(StoreError::DuplicateAccount {
                address: address.clone(),
            });
        }
        debug!(
            table = %self.store.table,
            rows = self.pending.len(),
            "Committing unit of work"
        );
        table.extend(self.pending);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl InMemoryTx {
    fn visible(&self, address: &Address) -> Option<Decimal> {
        self.pending
            .get(address)
            .copied()
            .or_else(|| self.store.committed(address))
    }
}

fn check_column(address: &Address, value: Decimal) -> Result<(), StoreError> {
    if fits_balance_column(value) {
        Ok(())
    } else {
        Err(StoreError::ConstraintViolation {
            address: address.clone(),
            value: value.to_string(),
        })
    }
}

fn column_value(address: &Address, value: Option<Decimal>) -> Result<Decimal, StoreError> {
    let Some(value) = value else {
        return Err(StoreError::ConstraintViolation {
            address: address.clone(),
            value: "overflow".to_owned(),
        });
    };
    check_column(address, value)?;
    Ok(value)
}
