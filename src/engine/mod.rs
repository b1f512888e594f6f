use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    address::{Address, AddressError},
    amount::AmountError,
    command::TransferCommandError,
    store::StoreError,
};

pub mod transfer_engine;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Command(#[from] TransferCommandError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("Account {address} not found")]
    AccountNotFound { address: Address },
    #[error("Insufficient balance: {address} holds {balance}, transfer needs {amount}")]
    InsufficientBalance {
        address: Address,
        balance: Decimal,
        amount: Decimal,
    },
    #[error("Storage failure: {0}")]
    Store(StoreError),
    #[error("Transfer cancelled")]
    Cancelled,
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound { address } => Self::AccountNotFound { address },
            err => Self::Store(err),
        }
    }
}

/// Flat classification of every [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAddressFormat,
    SameAddress,
    InvalidAmountFormat,
    NonPositiveAmount,
    TooManyDecimalPlaces,
    TooManyDigits,
    AccountNotFound,
    InsufficientBalance,
    StoreError,
    Cancelled,
}

/// What a caller should make of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself is wrong; resending it unchanged fails again.
    Malformed,
    /// The ledger's current state does not allow the operation.
    Rejected,
    /// The store failed; the caller may retry.
    Storage,
    Cancelled,
}

impl ErrorKind {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::InvalidAddressFormat
            | Self::SameAddress
            | Self::InvalidAmountFormat
            | Self::NonPositiveAmount
            | Self::TooManyDecimalPlaces
            | Self::TooManyDigits => ErrorCategory::Malformed,
            Self::AccountNotFound | Self::InsufficientBalance => ErrorCategory::Rejected,
            Self::StoreError => ErrorCategory::Storage,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Command(TransferCommandError::Address(_)) | Self::Address(_) => {
                ErrorKind::InvalidAddressFormat
            }
            Self::Command(TransferCommandError::SameAddress { .. }) => ErrorKind::SameAddress,
            Self::Command(TransferCommandError::Amount(err)) => match err {
                AmountError::InvalidFormat { .. } => ErrorKind::InvalidAmountFormat,
                AmountError::NonPositive { .. } => ErrorKind::NonPositiveAmount,
                AmountError::TooManyDecimalPlaces { .. } => ErrorKind::TooManyDecimalPlaces,
                AmountError::TooManyDigits { .. } => ErrorKind::TooManyDigits,
            },
            Self::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Store(_) => ErrorKind::StoreError,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind().category()
    }
}

/// Stages a transfer goes through. Any non-terminal stage may end in
/// [`TransferState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Validating,
    Locking,
    Reading,
    CreatingRecipient,
    Updating,
    Committed,
    Failed,
}
