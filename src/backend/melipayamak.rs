//! MeliPayamak (`console.melipayamak.com`) backend.
//!
//! Every endpoint is `{base}/{operation path}/{token}`; there is no auth header.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::backend::{
    Backend, BackendError, BackendResult, HttpSettings, ProviderResponse, ensure_recipients,
    ensure_same_length, execute, execute_json,
};
use crate::domain::{
    ConfigError, LineNumber, MessageText, Pattern, RawConfig, RawPhoneNumber, RecipientFormat,
    ScheduleTime, SendOptions, Token, find_pattern, format_unpadded, optional_str, patterns,
    required_str,
};
use crate::transport::melipayamak::{
    RECEIVE_CREDIT, RECEIVE_STATUS, SEND_ADVANCED, SEND_MULTIPLE, SEND_SCHEDULE, SEND_SHARED,
    SEND_SIMPLE,
};
use crate::transport::{self, HttpRequest, HttpTransport};

pub const IDENTIFIER: &str = "melipayamak";
pub const LABEL: &str = "MeliPayamak";

const DEFAULT_BASE_URL: &str = "https://console.melipayamak.com/api";

/// Validated MeliPayamak settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeliPayamakConfig {
    pub token: Token,
    /// Default sender line; calls without one omit `from`.
    pub number: Option<LineNumber>,
    pub udh: Option<String>,
    pub patterns: Vec<Pattern>,
}

impl MeliPayamakConfig {
    /// Pattern entries are keyed by `id`.
    pub const PATTERN_ID_FIELD: &'static str = "id";
    /// Older settings name the sender `from`.
    pub const NUMBER_ALIAS: &'static str = "from";
    pub const UDH_FIELD: &'static str = "udh";

    /// Check `token`, the optional `number` (4+ digits), `udh` and `patterns`.
    pub fn validate(raw: &RawConfig) -> Result<Self, ConfigError> {
        let number = match optional_str(raw, LineNumber::FIELD)? {
            Some(number) => Some(number),
            None => optional_str(raw, Self::NUMBER_ALIAS)?,
        };

        Ok(Self {
            token: Token::new(required_str(raw, Token::FIELD)?)?,
            number: number.map(LineNumber::new).transpose()?,
            udh: optional_str(raw, Self::UDH_FIELD)?.map(str::to_owned),
            patterns: patterns(raw, Self::PATTERN_ID_FIELD)?,
        })
    }
}

#[derive(Clone)]
/// Builder for [`MeliPayamak`].
pub struct MeliPayamakBuilder {
    raw: RawConfig,
    http: HttpSettings,
    recipients: RecipientFormat,
}

impl MeliPayamakBuilder {
    pub fn new(raw: RawConfig) -> Self {
        Self {
            raw,
            http: HttpSettings::default(),
            recipients: RecipientFormat::default(),
        }
    }

    /// Override the API base URL (default `https://console.melipayamak.com/api`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.http.user_agent(user_agent.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http.transport(transport);
        self
    }

    pub fn recipient_format(mut self, recipients: RecipientFormat) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn build(self) -> Result<MeliPayamak, BackendError> {
        let config = MeliPayamakConfig::validate(&self.raw)?;
        let (base_url, http) = self.http.resolve(DEFAULT_BASE_URL)?;
        let base_url = match Url::parse(&base_url) {
            Ok(url) if !url.cannot_be_a_base() => url,
            _ => return Err(ConfigError::InvalidUrl { input: base_url }.into()),
        };
        Ok(MeliPayamak {
            config,
            base_url,
            http,
            recipients: self.recipients,
        })
    }
}

#[derive(Clone)]
pub struct MeliPayamak {
    config: MeliPayamakConfig,
    base_url: Url,
    http: Arc<dyn HttpTransport>,
    recipients: RecipientFormat,
}

impl MeliPayamak {
    pub fn new(raw: &RawConfig) -> Result<Self, BackendError> {
        Self::builder(raw.clone()).build()
    }

    pub fn builder(raw: RawConfig) -> MeliPayamakBuilder {
        MeliPayamakBuilder::new(raw)
    }

    pub fn config(&self) -> &MeliPayamakConfig {
        &self.config
    }

    /// Raw `receive/credit` response, for callers that need more than the amount.
    pub async fn credit_raw(&self) -> Result<ProviderResponse, BackendError> {
        let request = HttpRequest::get(self.url(RECEIVE_CREDIT)?);
        execute_json(self.http.as_ref(), IDENTIFIER, "get_credit", request).await
    }

    /// `{base}/{path}/{token}`, with the token escaped as a single segment.
    fn url(&self, path: &str) -> Result<String, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidUrl {
                input: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(path.split('/'))
            .push(self.config.token.as_str());
        Ok(url.into())
    }

    fn sender<'a>(&'a self, options: &'a SendOptions) -> Option<&'a str> {
        options
            .from
            .as_deref()
            .or_else(|| self.config.number.as_ref().map(LineNumber::as_str))
    }

    fn udh<'a>(&'a self, options: &'a SendOptions) -> &'a str {
        options
            .udh
            .as_deref()
            .or(self.config.udh.as_deref())
            .unwrap_or_default()
    }

    async fn post(
        &self,
        operation: &'static str,
        path: &str,
        body: Value,
    ) -> Result<ProviderResponse, BackendError> {
        let request = HttpRequest::post_json(self.url(path)?, body);
        execute_json(self.http.as_ref(), IDENTIFIER, operation, request).await
    }
}

impl Backend for MeliPayamak {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn label(&self) -> &'static str {
        LABEL
    }

    fn send<'a>(
        &'a self,
        text: &'a MessageText,
        to: &'a RawPhoneNumber,
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        Box::pin(async move {
            let to = self.recipients.apply(to)?;
            let body = transport::melipayamak::encode_simple(text, &to, self.sender(options));
            self.post("send", SEND_SIMPLE, body).await
        })
    }

    fn send_bulk<'a>(
        &'a self,
        text: &'a MessageText,
        to: &'a [RawPhoneNumber],
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        Box::pin(async move {
            ensure_recipients(to)?;
            let to = self.recipients.apply_all(to)?;
            let body = transport::melipayamak::encode_advanced(
                text,
                &to,
                self.sender(options),
                self.udh(options),
            );
            self.post("send_bulk", SEND_ADVANCED, body).await
        })
    }

    fn send_schedule<'a>(
        &'a self,
        text: &'a MessageText,
        to: &'a RawPhoneNumber,
        schedule: ScheduleTime,
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        Box::pin(async move {
            let at = schedule.at(options.seconds)?;
            let to = self.recipients.apply(to)?;
            let body = transport::melipayamak::encode_schedule(
                text,
                &to,
                self.sender(options),
                format_unpadded(&at),
                options.period.as_deref(),
            );
            self.post("send_schedule", SEND_SCHEDULE, body).await
        })
    }

    fn send_pattern<'a>(
        &'a self,
        pattern: &'a str,
        to: &'a RawPhoneNumber,
        args: &'a [String],
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        let _ = options;
        Box::pin(async move {
            let pattern = find_pattern(&self.config.patterns, pattern)?;
            let to = self.recipients.apply(to)?;
            let body = transport::melipayamak::encode_shared(&pattern.id, &to, args);
            self.post("send_pattern", SEND_SHARED, body).await
        })
    }

    fn send_multiple<'a>(
        &'a self,
        texts: &'a [MessageText],
        recipients: &'a [RawPhoneNumber],
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        Box::pin(async move {
            ensure_same_length(texts, recipients)?;
            let recipients = self.recipients.apply_all(recipients)?;
            let body = transport::melipayamak::encode_multiple(
                texts,
                &recipients,
                self.sender(options),
                self.udh(options),
            );
            self.post("send_multiple", SEND_MULTIPLE, body).await
        })
    }

    fn get_credit(&self) -> BackendResult<'_, i64> {
        Box::pin(async move {
            let request = HttpRequest::get(self.url(RECEIVE_CREDIT)?);
            let body = execute(self.http.as_ref(), IDENTIFIER, "get_credit", request).await?;
            transport::melipayamak::decode_credit_json_response(&body)
                .map_err(|err| BackendError::Parse(Box::new(err)))
        })
    }

    fn get_status<'a>(&'a self, ids: &'a [i64]) -> BackendResult<'a, ProviderResponse> {
        Box::pin(async move {
            let body = transport::melipayamak::encode_status(ids);
            self.post("get_status", RECEIVE_STATUS, body).await
        })
    }
}
