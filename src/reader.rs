use crate::{
    account::{Account, Wallet},
    address::Address,
    engine::LedgerError,
    store::LedgerStore,
};

/// Lock-free point lookups of committed balances.
///
/// A returned balance may already be stale by the time the caller sees it.
pub struct BalanceReader<S> {
    store: S,
}

impl<S> BalanceReader<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn wallet(&self, address: &str) -> Result<Wallet, LedgerError> {
        let address = Address::parse(address)?;
        let balance = self.store.balance(&address).await?;
        Ok(Account { address, balance }.into())
    }
}
