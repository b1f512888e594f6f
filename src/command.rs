use thiserror::Error;

use crate::{
    address::{Address, AddressError},
    amount::{Amount, AmountError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferCommandError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("Sender and recipient are the same account {address}")]
    SameAddress { address: Address },
}

/// Transfer request that passed every check not requiring the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

impl TransferCommand {
    pub fn parse(from: &str, to: &str, amount: &str) -> Result<Self, TransferCommandError> {
        let from = Address::parse(from)?;
        let to = Address::parse(to)?;
        if from == to {
            return Err(TransferCommandError::SameAddress { address: from });
        }
        let amount = Amount::parse(amount)?;
        Ok(Self { from, to, amount })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const A: &str = "0xA000000000000000000000000000000000000000";
    const B: &str = "0xB000000000000000000000000000000000000000";

    #[test]
    fn parse_valid_command() {
        let cmd = TransferCommand::parse(A, B, "100").unwrap();
        assert_eq!(cmd.from.as_str(), "0xa000000000000000000000000000000000000000");
        assert_eq!(cmd.to.as_str(), "0xb000000000000000000000000000000000000000");
        assert_eq!(cmd.amount.value(), dec!(100));
    }

    #[test]
    fn same_address_differing_in_case() {
        let err = TransferCommand::parse(A, &A.to_lowercase(), "1").unwrap_err();
        assert!(matches!(err, TransferCommandError::SameAddress { .. }));
        assert_eq!(
            err.to_string(),
            "Sender and recipient are the same account 0xa000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn address_checked_before_amount() {
        let err = TransferCommand::parse("0xnope", B, "not a number").unwrap_err();
        assert!(matches!(err, TransferCommandError::Address(_)));

        let err = TransferCommand::parse(A, A, "not a number").unwrap_err();
        assert!(matches!(err, TransferCommandError::SameAddress { .. }));

        let err = TransferCommand::parse(A, B, "-5").unwrap_err();
        assert!(matches!(
            err,
            TransferCommandError::Amount(AmountError::NonPositive { .. })
        ));
    }
}
