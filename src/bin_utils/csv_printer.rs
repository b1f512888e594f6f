use std::io::Write;

use csv::Writer;

use crate::account::Wallet;

pub fn print_wallets<W>(output: &mut W, wallets: impl Iterator<Item = Wallet>) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for wallet in wallets {
        if let Err(err) = writer.serialize(wallet) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
