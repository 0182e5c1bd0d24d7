//! Pluggable SMS provider backends behind one typed async interface.
//!
//! The crate is layered the usual way: a domain layer of strong types and
//! configuration validation, a transport layer for wire-format details, and a
//! backend layer mapping the uniform [`Backend`] operations onto each
//! provider. [`Dispatcher`] records a [`Message`] around outbound sends.
//!
//! ```rust,no_run
//! use smsgate::{BackendRegistry, MessageText, RawPhoneNumber, SendOptions, parse_raw_config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = parse_raw_config(r#"{"token": "...", "from": "+983000505"}"#)?;
//!     let backend = BackendRegistry::with_defaults().create("ippanel", &config)?;
//!     let to = RawPhoneNumber::new("+989121234567")?;
//!     let text = MessageText::new("hello")?;
//!     let _resp = backend.send(&text, &to, &SendOptions::default()).await?;
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod backend;
pub mod dispatch;
pub mod domain;
pub mod transport;

pub use backend::ippanel::{IpPanel, IpPanelBuilder, IpPanelConfig};
pub use backend::melipayamak::{MeliPayamak, MeliPayamakBuilder, MeliPayamakConfig};
pub use backend::registry::{BackendRegistry, Constructor};
pub use backend::{Backend, BackendError, ProviderResponse};
pub use dispatch::{
    DeferredSend, DispatchError, DispatchOptions, Dispatcher, InMemoryMessageStore, MessageStore,
    Sent, StoreError, TaskQueue,
};
pub use domain::{
    ConfigError, IranSenderNumber, LineNumber, Message, MessageStatus, MessageText, NewMessage,
    Pattern, PatternId, PhoneNumber, RawConfig, RawPhoneNumber, RecipientFormat, ScheduleTime,
    SendOptions, Token, parse_raw_config,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
