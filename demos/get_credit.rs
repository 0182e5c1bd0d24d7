use std::io;

use smsgate::{BackendRegistry, parse_raw_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let backend_id = std::env::var("SMSGATE_BACKEND").unwrap_or_else(|_| "ippanel".to_owned());
    let config = std::env::var("SMSGATE_CONFIG").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMSGATE_CONFIG environment variable is required (JSON object)",
        )
    })?;

    let backend = BackendRegistry::with_defaults().create(&backend_id, &parse_raw_config(&config)?)?;
    println!("{backend} credit: {}", backend.get_credit().await?);

    Ok(())
}
