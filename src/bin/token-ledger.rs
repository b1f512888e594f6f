use std::fs::File;

use anyhow::{Context, Result};
use token_ledger::{bin_utils::Service, config::LedgerConfig, logging::init_logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let filename = args
        .next()
        .context("Expected a transfers file name as the first argument")?;
    let transfers =
        File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;
    let accounts = args
        .next()
        .map(|filename| {
            File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))
        })
        .transpose()?;

    let service = Service {
        transfers,
        accounts,
        output: &mut std::io::stdout(),
        config: LedgerConfig::from_env()?,
        error_printer: Box::new(|line, err| {
            eprintln!("Error at line {line} ({:?}): {err}", err.category())
        }),
    };
    service.run().await
}
