use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    address::Address,
    amount::{BALANCE_PRECISION, BALANCE_SCALE, render_balance},
};

/// Well-known account funded when a fresh ledger is provisioned,
/// the text form of [`Address::zero`].
pub const SEED_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Initial balance of [`SEED_ADDRESS`].
pub const SEED_BALANCE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// A row of the account table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub balance: Decimal,
}

/// Account as shown to callers, balance rendered at full scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wallet {
    pub address: Address,
    pub balance: String,
}

impl From<Account> for Wallet {
    fn from(account: Account) -> Self {
        Self {
            address: account.address,
            balance: render_balance(account.balance),
        }
    }
}

/// Whether `value` can be stored in the balance column,
/// `NUMERIC(28, 18) CHECK (value >= 0)`.
pub fn fits_balance_column(value: Decimal) -> bool {
    let integer_digits = BALANCE_PRECISION as u32 - BALANCE_SCALE;
    let limit = Decimal::from(10u64.pow(integer_digits));
    value >= Decimal::ZERO && value < limit && value.scale() <= BALANCE_SCALE
}
