//! Bootstraps [`token_ledger`](crate) for the batch binary: provisions an
//! in-memory ledger, replays transfers from CSV and prints the final wallets.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use csv_parser::{AccountRow, CsvRecords, TransferRow};
use csv_printer::print_wallets;

use crate::{
    account::Wallet, address::Address, config::LedgerConfig, engine::LedgerError,
    ledger::Ledger, store::in_memory_store::InMemoryStore,
};

pub mod csv_parser;
pub mod csv_printer;

pub struct Service<'w, T, A, W: 'w> {
    /// `from,to,amount` rows, applied in file order.
    pub transfers: T,
    /// `address,balance` rows. Without them only the seed account exists.
    pub accounts: Option<A>,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    pub error_printer: Box<dyn FnMut(u64, LedgerError)>,
}

impl<'w, T, A, W> Service<'w, T, A, W>
where
    T: Read,
    A: Read,
    W: Write + 'w,
{
    pub async fn run(mut self) -> Result<()> {
        let store = InMemoryStore::new(&self.config);
        match self.accounts {
            Some(source) => provision(&store, source)?,
            None => store.seed().context("Failed to seed the ledger")?,
        }

        let ledger = Ledger::new(store);
        for (line, row) in CsvRecords::<_, TransferRow>::new(self.transfers) {
            let row = row.with_context(|| format!("Malformed transfer at line {line}"))?;
            if let Err(err) = ledger.transfer(&row.from, &row.to, &row.amount).await {
                (self.error_printer)(line, err);
            }
        }

        print_wallets(
            self.output,
            ledger.store().accounts().into_iter().map(Wallet::from),
        )
    }
}

fn provision<R: Read>(store: &InMemoryStore, source: R) -> Result<()> {
    for (line, row) in CsvRecords::<_, AccountRow>::new(source) {
        let row = row.with_context(|| format!("Malformed account at line {line}"))?;
        let address = Address::parse(&row.address)
            .with_context(|| format!("Invalid account at line {line}"))?;
        store
            .insert_account(&address, row.balance)
            .with_context(|| format!("Cannot provision account at line {line}"))?;
    }
    Ok(())
}
