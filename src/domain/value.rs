use std::borrow::Cow;
use std::fmt;

use phonenumber::country;
use serde::{Serialize, Serializer};

use crate::domain::validation::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Provider API token.
///
/// Invariant: non-empty after trimming.
pub struct Token(String);

impl Token {
    /// Configuration key holding the token (`token`).
    pub const FIELD: &'static str = "token";

    /// Create a validated [`Token`].
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Iranian sender number in international form, as IPPanel expects it (`from`).
///
/// Invariant: matches `^\+98\d+$`.
pub struct IranSenderNumber(String);

impl IranSenderNumber {
    /// Configuration key holding the sender (`from`).
    pub const FIELD: &'static str = "from";
    const PREFIX: &'static str = "+98";

    /// Create a validated [`IranSenderNumber`].
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let digits = value.strip_prefix(Self::PREFIX).unwrap_or_default();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidFormat {
                field: Self::FIELD,
                expected: "+98<digits>",
                input: value,
            });
        }
        Ok(Self(value))
    }

    /// Borrow the sender number.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Dedicated line number registered with MeliPayamak (`number`).
///
/// Invariant: at least four ASCII digits and nothing else.
pub struct LineNumber(String);

impl LineNumber {
    /// Configuration key holding the line number (`number`).
    pub const FIELD: &'static str = "number";
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 4;

    /// Create a validated [`LineNumber`].
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.len() < Self::MIN_DIGITS || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidFormat {
                field: Self::FIELD,
                expected: "at least 4 digits",
                input: value,
            });
        }
        Ok(Self(value))
    }

    /// Borrow the line number.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// SMS message text.
///
/// Invariant: non-empty after trimming. The original value (including whitespace) is preserved.
pub struct MessageText(String);

impl MessageText {
    /// Field name used in error reports (`text`).
    pub const FIELD: &'static str = "text";

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    /// Borrow the message text as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for MessageText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Unvalidated recipient phone number (`to`).
///
/// Invariant: non-empty after trimming. This type does not normalize; backends built
/// with [`RecipientFormat::E164`] rewrite it through [`PhoneNumber`] before encoding.
pub struct RawPhoneNumber(String);

impl RawPhoneNumber {
    /// Field name used in error reports (`to`).
    pub const FIELD: &'static str = "to";

    /// Create a validated (non-empty) raw phone number.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Raw (trimmed) value as sent to the provider.
    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Serialize for RawPhoneNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl From<PhoneNumber> for RawPhoneNumber {
    fn from(value: PhoneNumber) -> Self {
        Self(value.e164)
    }
}

#[derive(Debug, Clone)]
/// Parsed phone number with an E.164 representation.
///
/// Equality is based on the E.164 form.
pub struct PhoneNumber {
    raw: String,
    e164: String,
}

impl PhoneNumber {
    /// Field name used in error reports (`to`).
    pub const FIELD: &'static str = "to";

    /// Parse an Iranian phone number; local forms like `09121234567` are accepted.
    pub fn parse_iran(input: impl Into<String>) -> Result<Self, ConfigError> {
        Self::parse(Some(country::Id::IR), input)
    }

    /// Parse and normalize a phone number into E.164.
    ///
    /// `default_region` is used when the input does not contain an explicit country prefix.
    pub fn parse(
        default_region: Option<country::Id>,
        input: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let input = input.into();
        let raw = input.trim().to_owned();
        if raw.is_empty() {
            return Err(ConfigError::Empty { field: Self::FIELD });
        }

        let parsed =
            phonenumber::parse(default_region, &raw).map_err(|_| ConfigError::InvalidFormat {
                field: Self::FIELD,
                expected: "a phone number",
                input: raw.clone(),
            })?;

        let e164 = phonenumber::format(&parsed)
            .mode(phonenumber::Mode::E164)
            .to_string();

        Ok(Self { raw, e164 })
    }

    /// Raw input after trimming.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized E.164 representation.
    pub fn e164(&self) -> &str {
        &self.e164
    }
}

impl PartialEq for PhoneNumber {
    fn eq(&self, other: &Self) -> bool {
        self.e164 == other.e164
    }
}

impl Eq for PhoneNumber {}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// How a backend writes recipients into request bodies.
pub enum RecipientFormat {
    /// Recipients are sent exactly as given.
    #[default]
    AsGiven,
    /// Every recipient is normalized to E.164; local forms are read in `default_region`.
    E164 { default_region: country::Id },
}

impl RecipientFormat {
    /// E.164 with Iranian local forms (`0912...`) accepted.
    pub fn e164_iran() -> Self {
        Self::E164 {
            default_region: country::Id::IR,
        }
    }

    /// Rewrite one recipient; unparsable numbers are rejected before any I/O.
    pub fn apply<'a>(
        &self,
        recipient: &'a RawPhoneNumber,
    ) -> Result<Cow<'a, RawPhoneNumber>, ConfigError> {
        match self {
            Self::AsGiven => Ok(Cow::Borrowed(recipient)),
            Self::E164 { default_region } => {
                let parsed = PhoneNumber::parse(Some(*default_region), recipient.raw())?;
                Ok(Cow::Owned(parsed.into()))
            }
        }
    }

    pub fn apply_all<'a>(
        &self,
        recipients: &'a [RawPhoneNumber],
    ) -> Result<Cow<'a, [RawPhoneNumber]>, ConfigError> {
        match self {
            Self::AsGiven => Ok(Cow::Borrowed(recipients)),
            Self::E164 { .. } => recipients
                .iter()
                .map(|recipient| self.apply(recipient).map(Cow::into_owned))
                .collect::<Result<Vec<_>, _>>()
                .map(Cow::Owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Identifier of a provider-stored pattern: numeric for MeliPayamak body ids,
/// free-form codes for IPPanel.
pub enum PatternId {
    Number(i64),
    Code(String),
}

impl PatternId {
    /// Whether `key` names this id (numbers compare by their decimal form).
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Number(value) => key.trim().parse::<i64>().is_ok_and(|it| it == *value),
            Self::Code(value) => value == key,
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Code(value) => f.write_str(value),
        }
    }
}

impl Serialize for PatternId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(value) => serializer.serialize_i64(*value),
            Self::Code(value) => serializer.serialize_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message template stored on the provider side.
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    pub body: String,
}

/// Find a pattern by id, falling back to its name.
pub fn find_pattern<'a>(patterns: &'a [Pattern], key: &str) -> Result<&'a Pattern, ConfigError> {
    patterns
        .iter()
        .find(|pattern| pattern.id.matches(key))
        .or_else(|| patterns.iter().find(|pattern| pattern.name == key))
        .ok_or_else(|| ConfigError::UnknownPattern {
            pattern: key.to_owned(),
        })
}
