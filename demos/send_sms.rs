use std::io;

use smsgate::{BackendRegistry, MessageText, RawPhoneNumber, SendOptions, parse_raw_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let backend_id = std::env::var("SMSGATE_BACKEND").unwrap_or_else(|_| "ippanel".to_owned());
    let config = std::env::var("SMSGATE_CONFIG").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMSGATE_CONFIG environment variable is required (JSON object)",
        )
    })?;
    let phone_raw = std::env::var("SMSGATE_PHONE").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMSGATE_PHONE environment variable is required",
        )
    })?;
    let message = std::env::var("SMSGATE_MESSAGE")
        .unwrap_or_else(|_| "Hello from the smsgate demo.".to_owned());

    let backend = BackendRegistry::with_defaults().create(&backend_id, &parse_raw_config(&config)?)?;
    let phone = RawPhoneNumber::new(phone_raw)?;
    let text = MessageText::new(message)?;

    let response = backend.send(&text, &phone, &SendOptions::default()).await?;
    println!("{backend}: {response}");

    Ok(())
}
