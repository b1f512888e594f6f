use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::address::Address;

/// Integer name of an account lock, derived from [`Address::lock_key`].
///
/// Unrelated addresses may share a key. That only serializes transfers
/// that could have run in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockKey(pub u64);

impl LockKey {
    pub fn of(address: &Address) -> Self {
        Self(address.lock_key())
    }

    /// Same bits, as the signed key taken by SQL advisory locks.
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

/// Lock keys for a transfer between `a` and `b`, in acquisition order.
///
/// Keys ascend; equal keys fall back to address order and then collapse,
/// since they name the same lock.
pub fn lock_order(a: &Address, b: &Address) -> Vec<LockKey> {
    ordered([(LockKey::of(a), a), (LockKey::of(b), b)])
}

fn ordered(mut entries: [(LockKey, &Address); 2]) -> Vec<LockKey> {
    entries.sort();
    let mut keys: Vec<LockKey> = entries.iter().map(|(key, _)| *key).collect();
    keys.dedup();
    keys
}

/// Named-mutex table guarding account rows during a transfer.
///
/// Entries are created on first use and dropped again once the last
/// holder releases them and nobody else is queued.
#[derive(Debug, Clone, Default)]
pub struct LockCoordinator {
    table: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

impl LockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until both accounts are exclusively held by the caller.
    pub async fn acquire(&self, a: &Address, b: &Address) -> AccountLocks {
        // built up front so a cancelled wait still releases what it got
        let mut locks = AccountLocks {
            guards: Vec::with_capacity(2),
            table: self.table.clone(),
        };
        for key in lock_order(a, b) {
            let pending = PendingLock {
                key,
                mutex: self.table.entry(key).or_default().clone(),
                table: &self.table,
            };
            locks.guards.push((key, pending.lock().await));
        }
        locks
    }

    /// Number of keys currently held or awaited.
    pub fn active_locks(&self) -> usize {
        self.table.len()
    }
}

/// A queued request for one key. Dropping it unfinished clears the entry
/// if nobody else is left on it.
struct PendingLock<'a> {
    key: LockKey,
    mutex: Arc<Mutex<()>>,
    table: &'a DashMap<LockKey, Arc<Mutex<()>>>,
}

impl PendingLock<'_> {
    async fn lock(&self) -> OwnedMutexGuard<()> {
        self.mutex.clone().lock_owned().await
    }
}

impl Drop for PendingLock<'_> {
    fn drop(&mut self) {
        // the table and this request; a granted guard keeps a third clone
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 2);
    }
}

/// Held account locks. Dropping releases them in reverse order.
#[derive(Debug)]
pub struct AccountLocks {
    guards: Vec<(LockKey, OwnedMutexGuard<()>)>,
    table: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn keys(&self) -> Vec<LockKey> {
        self.guards.iter().map(|(key, _)| *key).collect()
    }
}

impl Drop for AccountLocks {
    fn drop(&mut self) {
        while let Some((key, guard)) = self.guards.pop() {
            drop(guard);
            // a waiter holds its own clone, so a count of one means idle
            self.table
                .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}
