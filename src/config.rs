use thiserror::Error;

/// Environment variable naming the account table.
pub const TABLE_ENV: &str = "LEDGER_TABLE";

pub const DEFAULT_TABLE: &str = "wallets";
pub const TEST_TABLE: &str = "test_wallets";

// Postgres truncates identifiers past this length
const MAX_TABLE_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid table name `{name}`: expected a plain SQL identifier")]
    InvalidTableName { name: String },
}

/// Everything the ledger core needs from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    table: String,
}

impl LedgerConfig {
    pub fn new(table: impl Into<String>) -> Result<Self, ConfigError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(ConfigError::InvalidTableName { name: table });
        }
        Ok(Self { table })
    }

    /// Config pointing at the isolated test table.
    pub fn test() -> Self {
        Self {
            table: TEST_TABLE.to_owned(),
        }
    }

    /// Reads [`TABLE_ENV`], falling back to [`DEFAULT_TABLE`] when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(TABLE_ENV) {
            Ok(table) => Self::new(table),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_owned(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    let Some(first) = bytes.next() else {
        return false;
    };
    name.len() <= MAX_TABLE_NAME_LEN
        && (first.is_ascii_alphabetic() || first == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
