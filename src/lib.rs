/// Canonical account addresses and the lock key derived from them.
pub mod address;

/// Exact decimal transfer amounts, bounded by the balance column.
pub mod amount;

/// Account rows, the caller-facing wallet view and seed constants.
pub mod account;

/// Validated transfer requests, built from [`address`] and [`amount`].
pub mod command;

/// Per-account mutual exclusion, always acquired in ascending key order
/// so two transfers over the same pair of accounts cannot deadlock.
pub mod lock;

/// Account table interface and its implementations.
///
/// NOTE: the in-memory store backs the binary and the tests, the
/// Postgres store is behind the `postgres` feature.
pub mod store;

/// Transfer engine plus the error taxonomy shared by every operation.
pub mod engine;

/// Stateless balance lookups for the query path.
pub mod reader;

/// Query and mutation entry points bundled over one store.
pub mod ledger;

pub mod config;
pub mod logging;

/// Bootstraps the ledger for the CSV batch binary. Lives in the library
/// so integration tests can drive it too.
pub mod bin_utils;

pub use engine::{ErrorCategory, ErrorKind, LedgerError};
pub use ledger::Ledger;
