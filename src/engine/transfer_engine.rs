use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    amount::render_balance,
    command::TransferCommand,
    lock::{AccountLocks, LockCoordinator},
    store::{LedgerStore, LedgerTx, StoreError},
};

use super::{LedgerError, TransferState};

/// Moves value between two accounts in one unit of work.
///
/// Every transfer holds the locks of both accounts from before its first
/// read until after its commit or rollback, so transfers sharing an
/// account serialize and the rest run in parallel.
pub struct TransferEngine<S> {
    store: S,
    locks: LockCoordinator,
}

impl<S> TransferEngine<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: LockCoordinator::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lock_coordinator(&self) -> &LockCoordinator {
        &self.locks
    }

    /// Transfers `amount` and returns the sender's new balance at full scale.
    ///
    /// Not idempotent: calling it twice moves the amount twice.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: &str,
    ) -> Result<String, LedgerError> {
        let command = match TransferCommand::parse(from, to, amount) {
            Ok(command) => command,
            Err(err) => {
                warn!(
                    from,
                    to,
                    amount,
                    state = ?TransferState::Validating,
                    error = %err,
                    "Transfer rejected"
                );
                return Err(err.into());
            }
        };
        let balance = self.execute(&command).await?;
        Ok(render_balance(balance))
    }

    /// Same as [`TransferEngine::transfer`], but gives up as soon as
    /// `cancel` fires. The in-flight unit of work is rolled back and the
    /// call fails with [`LedgerError::Cancelled`].
    pub async fn transfer_with_cancellation(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        cancel: &CancellationToken,
    ) -> Result<String, LedgerError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(from, to, amount, "Transfer cancelled");
                Err(LedgerError::Cancelled)
            }
            result = self.transfer(from, to, amount) => result,
        }
    }

    /// Runs a validated command and returns the sender's new balance.
    pub async fn execute(&self, command: &TransferCommand) -> Result<Decimal, LedgerError> {
        let mut state = TransferState::Locking;
        debug!(
            from = %command.from,
            to = %command.to,
            amount = %command.amount,
            ?state,
            "Transfer started"
        );

        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(err) => return Err(failed(command, state, err.into())),
        };
        let locks = self.locks.acquire(&command.from, &command.to).await;

        match self.apply(&mut tx, &locks, command, &mut state).await {
            Ok(balance) => {
                if let Err(err) = tx.commit().await {
                    return Err(failed(command, state, err.into()));
                }
                drop(locks);
                info!(
                    from = %command.from,
                    to = %command.to,
                    amount = %command.amount,
                    state = ?TransferState::Committed,
                    "Transfer committed"
                );
                Ok(balance)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed, unit of work discarded");
                }
                drop(locks);
                Err(failed(command, state, err))
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut S::Tx,
        locks: &AccountLocks,
        command: &TransferCommand,
        state: &mut TransferState,
    ) -> Result<Decimal, LedgerError> {
        tx.lock_keys(&locks.keys()).await?;

        advance(state, TransferState::Reading);
        let balance = tx.read_balance(&command.from).await?;
        let amount = command.amount.value();
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                address: command.from.clone(),
                balance,
                amount,
            });
        }

        match tx.read_balance(&command.to).await {
            Ok(_) => {}
            Err(StoreError::AccountNotFound { .. }) => {
                advance(state, TransferState::CreatingRecipient);
                tx.create_account(&command.to).await?;
            }
            Err(err) => return Err(err.into()),
        }

        advance(state, TransferState::Updating);
        tx.apply_delta(&command.from, &command.to, amount).await?;
        Ok(balance - amount)
    }
}

fn advance(state: &mut TransferState, next: TransferState) {
    let current = *state;
    debug!(prev = ?current, state = ?next, "Transfer state");
    *state = next;
}

fn failed(command: &TransferCommand, state: TransferState, err: LedgerError) -> LedgerError {
    warn!(
        from = %command.from,
        to = %command.to,
        amount = %command.amount,
        failed_in = ?state,
        state = ?TransferState::Failed,
        error = %err,
        "Transfer failed"
    );
    err
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rust_decimal_macros::dec;

    use crate::{
        address::Address, config::LedgerConfig, engine::ErrorKind,
        store::in_memory_store::InMemoryStore,
    };

    use super::*;

    const A: &str = "0xa000000000000000000000000000000000000000";
    const B: &str = "0xb000000000000000000000000000000000000000";
    const C: &str = "0xc000000000000000000000000000000000000000";

    fn engine_with(accounts: &[(&str, Decimal)]) -> TransferEngine<InMemoryStore> {
        let store = InMemoryStore::new(&LedgerConfig::test());
        for (address, balance) in accounts {
            store
                .insert_account(&Address::parse(address).unwrap(), *balance)
                .unwrap();
        }
        TransferEngine::new(store)
    }

    async fn balance(engine: &TransferEngine<InMemoryStore>, address: &str) -> Decimal {
        engine
            .store()
            .balance(&Address::parse(address).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn transfer_back_and_forth() {
        let engine = engine_with(&[(A, dec!(1000)), (B, dec!(1000))]);

        let sender = engine.transfer(A, B, "100").await.unwrap();
        assert_eq!(sender, "900.000000000000000000");
        assert_eq!(balance(&engine, A).await, dec!(900));
        assert_eq!(balance(&engine, B).await, dec!(1100));

        engine.transfer(B, A, "100").await.unwrap();
        assert_eq!(balance(&engine, A).await, dec!(1000));
        assert_eq!(balance(&engine, B).await, dec!(1000));
        assert_eq!(engine.lock_coordinator().active_locks(), 0);
    }

    #[tokio::test]
    async fn creates_missing_recipient() {
        let engine = engine_with(&[(A, dec!(1000))]);
        engine.transfer(A, C, "100").await.unwrap();
        assert_eq!(balance(&engine, C).await, dec!(100));
    }

    #[tokio::test]
    async fn missing_sender_is_rejected() {
        let engine = engine_with(&[(A, dec!(1000))]);
        let err = engine.transfer(C, A, "100").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountNotFound);
        assert_eq!(balance(&engine, A).await, dec!(1000));
        assert_eq!(engine.store().accounts().len(), 1);
    }

    #[tokio::test]
    async fn insufficient_balance_leaves_no_trace() {
        let engine = engine_with(&[(A, dec!(1000))]);
        let err = engine.transfer(A, B, "1100").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert!(err.to_string().starts_with("Insufficient balance"));
        // recipient was never created
        assert_eq!(engine.store().accounts().len(), 1);
    }

    #[tokio::test]
    async fn validation_happens_before_locking() {
        let engine = engine_with(&[(A, dec!(1000))]);
        let held = engine
            .lock_coordinator()
            .acquire(&Address::parse(A).unwrap(), &Address::parse(B).unwrap())
            .await;

        // would hang on the held locks if validation came later
        let err = engine
            .transfer(A, B, "1.0000000000000000001")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyDecimalPlaces);
        let shouted = A.to_uppercase().replacen("0X", "0x", 1);
        let err = engine.transfer(A, &shouted, "1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SameAddress);
        drop(held);
    }

    #[tokio::test]
    async fn recipient_overflow_rolls_back_debit() {
        let engine = engine_with(&[(A, dec!(1000)), (B, dec!(9999999999))]);
        let err = engine.transfer(A, B, "1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreError);
        assert_eq!(balance(&engine, A).await, dec!(1000));
        assert_eq!(balance(&engine, B).await, dec!(9999999999));
    }

    #[derive(Clone, Default)]
    struct FieldNames(Arc<Mutex<Vec<Vec<&'static str>>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FieldNames {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let names = event.metadata().fields().iter().map(|f| f.name()).collect();
            self.0.lock().unwrap().push(names);
        }
    }

    #[tokio::test]
    async fn state_events_keep_addresses_out_of_from_and_to() {
        use tracing_subscriber::layer::SubscriberExt;

        let events = FieldNames::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        let _default = tracing::subscriber::set_default(subscriber);

        let engine = engine_with(&[(A, dec!(10))]);
        engine.transfer(A, B, "1").await.unwrap();

        let events = events.0.lock().unwrap();
        let transitions: Vec<_> = events.iter().filter(|f| f.contains(&"prev")).collect();
        assert!(!transitions.is_empty());
        assert!(transitions.iter().all(|f| f.contains(&"state")));
        assert!(
            transitions
                .iter()
                .all(|f| !f.contains(&"from") && !f.contains(&"to"))
        );
    }
}
