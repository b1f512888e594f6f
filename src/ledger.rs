use tokio_util::sync::CancellationToken;

use crate::{
    account::Wallet,
    engine::{LedgerError, transfer_engine::TransferEngine},
    reader::BalanceReader,
    store::LedgerStore,
};

/// The two operations the ledger exposes, over one shared store.
pub struct Ledger<S> {
    reader: BalanceReader<S>,
    engine: TransferEngine<S>,
}

impl<S> Ledger<S>
where
    S: LedgerStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            reader: BalanceReader::new(store.clone()),
            engine: TransferEngine::new(store),
        }
    }

    /// Query: the account at `address`.
    pub async fn wallet(&self, address: &str) -> Result<Wallet, LedgerError> {
        self.reader.wallet(address).await
    }

    /// Mutation: moves `amount` and returns the sender's new balance.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: &str,
    ) -> Result<String, LedgerError> {
        self.engine.transfer(from, to, amount).await
    }

    pub async fn transfer_with_cancellation(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LedgerError> {
        self.engine
            .transfer_with_cancellation(from, to, amount, cancel)
            .await
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }
}
