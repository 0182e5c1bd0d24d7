//! Domain layer: strong types with validation and invariants (no I/O).

mod config;
mod message;
mod request;
mod validation;
mod value;

pub use config::{PATTERNS_FIELD, RawConfig, parse_raw_config};
pub(crate) use config::{optional_str, patterns, required_str};
pub use message::{Message, MessageStatus, NewMessage};
pub use request::{ScheduleTime, SendOptions};
pub(crate) use request::{format_padded, format_unpadded};
pub use validation::ConfigError;
pub use value::{
    IranSenderNumber, LineNumber, MessageText, Pattern, PatternId, PhoneNumber, RawPhoneNumber,
    RecipientFormat, Token, find_pattern,
};
