use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, de::DeserializeOwned};

/// A transfer request, fields kept raw so the ledger does the validation.
#[derive(Debug, Deserialize)]
pub struct TransferRow {
    pub from: String,
    pub to: String,
    pub amount: String,
}

/// An account to provision before any transfer runs.
#[derive(Debug, Deserialize)]
pub struct AccountRow {
    pub address: String,
    // parsed from the text, never through f64
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

/// Reads CSV records of type `T`, each paired with the line it starts on.
pub struct CsvRecords<R, T> {
    iter: DeserializeRecordsIntoIter<R, T>,
}

impl<R, T> CsvRecords<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R, T> Iterator for CsvRecords<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    type Item = (u64, csv::Result<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
