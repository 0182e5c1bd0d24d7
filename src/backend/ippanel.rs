//! IPPanel (`edge.ippanel.com`) backend.
//!
//! Authenticates with the raw token in the `Authorization` header. IPPanel has
//! no pattern or delivery-status operation here; those calls fail with
//! [`BackendError::NotImplemented`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::backend::{
    Backend, BackendError, BackendResult, HttpSettings, ProviderResponse, ensure_recipients,
    ensure_same_length, execute, execute_json,
};
use crate::domain::{
    ConfigError, IranSenderNumber, MessageText, Pattern, RawConfig, RawPhoneNumber,
    RecipientFormat, ScheduleTime, SendOptions, Token, format_padded, patterns, required_str,
};
use crate::transport::{self, HttpRequest, HttpTransport};

pub const IDENTIFIER: &str = "ippanel";
pub const LABEL: &str = "IPPanel";

const DEFAULT_BASE_URL: &str = "https://edge.ippanel.com/v1";
const SEND_PATH: &str = "api/send";
const CREDIT_PATH: &str = "api/payment/credit/mine";

/// Validated IPPanel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpPanelConfig {
    pub token: Token,
    pub from: IranSenderNumber,
    pub patterns: Vec<Pattern>,
}

impl IpPanelConfig {
    /// Pattern entries are keyed by `code`.
    pub const PATTERN_ID_FIELD: &'static str = "code";

    /// Check `token`, `from` (`+98<digits>`) and the optional `patterns` list.
    pub fn validate(raw: &RawConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            token: Token::new(required_str(raw, Token::FIELD)?)?,
            from: IranSenderNumber::new(required_str(raw, IranSenderNumber::FIELD)?)?,
            patterns: patterns(raw, Self::PATTERN_ID_FIELD)?,
        })
    }
}

#[derive(Clone)]
/// Builder for [`IpPanel`].
///
/// Use this when you need to customize the base URL, timeout, user-agent, or transport.
pub struct IpPanelBuilder {
    raw: RawConfig,
    http: HttpSettings,
    recipients: RecipientFormat,
}

impl IpPanelBuilder {
    pub fn new(raw: RawConfig) -> Self {
        Self {
            raw,
            http: HttpSettings::default(),
            recipients: RecipientFormat::default(),
        }
    }

    /// Override the API base URL (default `https://edge.ippanel.com/v1`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url(base_url.into());
        self
    }

    /// Set an HTTP client timeout applied to the entire request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.http.user_agent(user_agent.into());
        self
    }

    /// Use a custom HTTP transport instead of `reqwest`.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http.transport(transport);
        self
    }

    /// Normalize recipients (for example to E.164) before they are sent.
    pub fn recipient_format(mut self, recipients: RecipientFormat) -> Self {
        self.recipients = recipients;
        self
    }

    /// Validate the configuration and build an [`IpPanel`].
    pub fn build(self) -> Result<IpPanel, BackendError> {
        let config = IpPanelConfig::validate(&self.raw)?;
        let (base_url, http) = self.http.resolve(DEFAULT_BASE_URL)?;
        Ok(IpPanel {
            config,
            base_url,
            http,
            recipients: self.recipients,
        })
    }
}

#[derive(Clone)]
pub struct IpPanel {
    config: IpPanelConfig,
    base_url: String,
    http: Arc<dyn HttpTransport>,
    recipients: RecipientFormat,
}

impl IpPanel {
    /// Validate `raw` and create a backend with default HTTP settings.
    pub fn new(raw: &RawConfig) -> Result<Self, BackendError> {
        Self::builder(raw.clone()).build()
    }

    pub fn builder(raw: RawConfig) -> IpPanelBuilder {
        IpPanelBuilder::new(raw)
    }

    pub fn config(&self) -> &IpPanelConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request.header("Authorization", self.config.token.as_str())
    }

    fn from_number<'a>(&'a self, options: &'a SendOptions) -> &'a str {
        options
            .from
            .as_deref()
            .unwrap_or_else(|| self.config.from.as_str())
    }

    async fn post(
        &self,
        operation: &'static str,
        body: Value,
    ) -> Result<ProviderResponse, BackendError> {
        let request = self.authorized(HttpRequest::post_json(self.url(SEND_PATH), body));
        execute_json(self.http.as_ref(), IDENTIFIER, operation, request).await
    }
}

impl Backend for IpPanel {
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
            let body = transport::ippanel::encode_webservice(
                self.from_number(options),
                text,
                std::slice::from_ref(&*to),
                None,
            );
            self.post("send", body).await
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
            let body =
                transport::ippanel::encode_webservice(self.from_number(options), text, &to, None);
            self.post("send_bulk", body).await
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
            if options.period.is_some() {
                return Err(BackendError::NotImplemented {
                    backend: IDENTIFIER,
                    operation: "send_schedule(period)",
                });
            }
            let at = schedule.at(options.seconds)?;
            let to = self.recipients.apply(to)?;
            let body = transport::ippanel::encode_webservice(
                self.from_number(options),
                text,
                std::slice::from_ref(&*to),
                Some(format_padded(&at)),
            );
            self.post("send_schedule", body).await
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
            let body = transport::ippanel::encode_peer_to_peer(
                self.from_number(options),
                texts,
                &recipients,
            );
            self.post("send_multiple", body).await
        })
    }

    fn get_credit(&self) -> BackendResult<'_, i64> {
        Box::pin(async move {
            let request = self.authorized(HttpRequest::get(self.url(CREDIT_PATH)));
            let body = execute(self.http.as_ref(), IDENTIFIER, "get_credit", request).await?;
            transport::ippanel::decode_credit_json_response(&body)
                .map_err(|err| BackendError::Parse(Box::new(err)))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::Method;
    use crate::transport::fake::FakeTransport;

    fn raw(value: Value) -> RawConfig {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn valid_config() -> RawConfig {
        raw(json!({
            "token": "secret-token",
            "from": "+983000505",
            "patterns": [{"code": "abc123", "name": "otp", "body": "code: %code%"}],
        }))
    }

    fn make_backend(transport: FakeTransport) -> IpPanel {
        IpPanel::builder(valid_config())
            .base_url("https://example.invalid/v1/")
            .transport(Arc::new(transport))
            .build()
            .unwrap()
    }

    fn phone(raw: &str) -> RawPhoneNumber {
        RawPhoneNumber::new(raw).unwrap()
    }

    fn text(value: &str) -> MessageText {
        MessageText::new(value).unwrap()
    }

    #[test]
    fn valid_config_builds() {
        let backend = IpPanel::new(&valid_config()).unwrap();
        assert_eq!(backend.config().from.as_str(), "+983000505");
        assert_eq!(backend.config().patterns[0].name, "otp");
        assert_eq!(backend.identifier(), "ippanel");
    }

    #[test]
    fn config_requires_token() {
        let mut config = valid_config();
        config.remove("token");
        assert!(matches!(
            IpPanel::new(&config),
            Err(BackendError::ImproperlyConfigured(ConfigError::Missing {
                field: "token"
            }))
        ));

        config.insert("token".to_owned(), json!("  "));
        assert!(matches!(
            IpPanel::new(&config),
            Err(BackendError::ImproperlyConfigured(ConfigError::Empty {
                field: "token"
            }))
        ));
    }

    #[test]
    fn config_requires_iranian_sender() {
        for from in ["", "3000505", "+13000505", "+98", "+98300x505"] {
            let mut config = valid_config();
            config.insert("from".to_owned(), json!(from));
            assert!(
                matches!(
                    IpPanel::new(&config),
                    Err(BackendError::ImproperlyConfigured(
                        ConfigError::InvalidFormat { field: "from", .. }
                    ))
                ),
                "accepted {from:?}"
            );
        }

        let mut config = valid_config();
        config.remove("from");
        assert!(IpPanel::new(&config).is_err());
    }

    #[test]
    fn config_rejects_pattern_without_code() {
        let mut config = valid_config();
        config.insert(
            "patterns".to_owned(),
            json!([{"id": 1, "name": "otp", "body": "x"}]),
        );
        assert!(matches!(
            IpPanel::new(&config),
            Err(BackendError::ImproperlyConfigured(
                ConfigError::MalformedPattern { index: 0, .. }
            ))
        ));
    }

    #[tokio::test]
    async fn send_posts_webservice_payload_with_token_header() {
        let transport = FakeTransport::ok(r#"{"data": {"message_outbox_ids": [1]}}"#);
        let backend = make_backend(transport.clone());

        let response = backend
            .send(&text("hello"), &phone("+989121234567"), &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(response["data"]["message_outbox_ids"][0], 1);

        let request = transport.last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://example.invalid/v1/api/send");
        assert_eq!(
            request.headers,
            vec![("Authorization".to_owned(), "secret-token".to_owned())]
        );
        assert_eq!(
            request.body.unwrap(),
            json!({
                "sending_type": "webservice",
                "from_number": "+983000505",
                "message": "hello",
                "params": { "recipients": ["+989121234567"] },
            })
        );
    }

    #[tokio::test]
    async fn call_time_sender_overrides_configured_one() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        backend
            .send(
                &text("hello"),
                &phone("+989121234567"),
                &SendOptions::from("+9810001000"),
            )
            .await
            .unwrap();
        assert_eq!(transport.last_body()["from_number"], "+9810001000");
    }

    #[tokio::test]
    async fn send_bulk_sends_all_recipients_at_once() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());
        let to = vec![phone("+989121111111"), phone("+989122222222")];

        backend
            .send_bulk(&text("news"), &to, &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            transport.last_body()["params"]["recipients"],
            json!(["+989121111111", "+989122222222"])
        );
    }

    #[tokio::test]
    async fn send_bulk_rejects_empty_recipients_without_request() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        let err = backend
            .send_bulk(&text("news"), &[], &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::ImproperlyConfigured(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn e164_recipient_format_normalizes_before_encoding() {
        let transport = FakeTransport::ok("{}");
        let backend = IpPanel::builder(valid_config())
            .base_url("https://example.invalid/v1")
            .transport(Arc::new(transport.clone()))
            .recipient_format(RecipientFormat::e164_iran())
            .build()
            .unwrap();

        backend
            .send_bulk(
                &text("news"),
                &[phone("09121111111"), phone("+989122222222")],
                &SendOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            transport.last_body()["params"]["recipients"],
            json!(["+989121111111", "+989122222222"])
        );

        let err = backend
            .send(&text("hello"), &phone("abc"), &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::ImproperlyConfigured(ConfigError::InvalidFormat { field: "to", .. })
        ));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn send_schedule_zero_pads_send_time() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        backend
            .send_schedule(
                &text("later"),
                &phone("+989121234567"),
                ScheduleTime::new(2024, 3, 5, 9, 7),
                &SendOptions::default(),
            )
            .await
            .unwrap();

        let body = transport.last_body();
        assert_eq!(body["send_time"], "2024-03-05 09:07:00");
        assert_eq!(body["sending_type"], "webservice");
        assert_eq!(body["params"]["recipients"], json!(["+989121234567"]));
    }

    #[tokio::test]
    async fn send_schedule_uses_seconds_option() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());
        let options = SendOptions {
            seconds: Some(4),
            ..Default::default()
        };

        backend
            .send_schedule(
                &text("later"),
                &phone("+989121234567"),
                ScheduleTime::new(2025, 12, 31, 23, 59),
                &options,
            )
            .await
            .unwrap();
        assert_eq!(transport.last_body()["send_time"], "2025-12-31 23:59:04");
    }

    #[tokio::test]
    async fn send_schedule_rejects_impossible_date_without_request() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        let err = backend
            .send_schedule(
                &text("later"),
                &phone("+989121234567"),
                ScheduleTime::new(2024, 13, 1, 0, 0),
                &SendOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::ImproperlyConfigured(ConfigError::InvalidSchedule { .. })
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn send_schedule_refuses_recurring_period_without_request() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());
        let options = SendOptions {
            period: Some("daily".to_owned()),
            ..Default::default()
        };

        let err = backend
            .send_schedule(
                &text("later"),
                &phone("+989121234567"),
                ScheduleTime::new(2024, 3, 5, 9, 7),
                &options,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::NotImplemented {
                backend: "ippanel",
                operation: "send_schedule(period)"
            }
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn send_multiple_builds_peer_to_peer_entries() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        backend
            .send_multiple(
                &[text("one"), text("two")],
                &[phone("+989121111111"), phone("+989122222222")],
                &SendOptions::default(),
            )
            .await
            .unwrap();

        let body = transport.last_body();
        assert_eq!(body["sending_type"], "peer_to_peer");
        assert_eq!(body["from_number"], "+983000505");
        assert_eq!(
            body["params"],
            json!([
                { "recipients": ["+989121111111"], "message": "one" },
                { "recipients": ["+989122222222"], "message": "two" },
            ])
        );
    }

    #[tokio::test]
    async fn send_multiple_length_mismatch_never_reaches_transport() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        let err = backend
            .send_multiple(
                &[text("one"), text("two")],
                &[phone("+989121111111")],
                &SendOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::ImproperlyConfigured(ConfigError::LengthMismatch {
                texts: 2,
                recipients: 1
            })
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn get_credit_reads_nested_credit_as_integer() {
        let transport = FakeTransport::ok(r#"{"data": {"credit": 98765.4}, "meta": {}}"#);
        let backend = make_backend(transport.clone());

        assert_eq!(backend.get_credit().await.unwrap(), 98765);

        let request = transport.last_request();
        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            "https://example.invalid/v1/api/payment/credit/mine"
        );
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn get_credit_maps_unexpected_shape_to_parse_error() {
        let transport = FakeTransport::ok(r#"{"data": {}}"#);
        let backend = make_backend(transport);

        let err = backend.get_credit().await.unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[tokio::test]
    async fn pattern_and_status_are_not_implemented() {
        let transport = FakeTransport::ok("{}");
        let backend = make_backend(transport.clone());

        let err = backend
            .send_pattern(
                "abc123",
                &phone("+989121234567"),
                &["1234".to_owned()],
                &SendOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::NotImplemented {
                backend: "ippanel",
                operation: "send_pattern"
            }
        ));

        let err = backend.get_status(&[1]).await.unwrap_err();
        assert!(matches!(err, BackendError::NotImplemented { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let transport = FakeTransport::new(401, r#"{"meta": {"message": "unauthorized"}}"#);
        let backend = make_backend(transport);

        let err = backend
            .send(&text("hello"), &phone("+989121234567"), &SendOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::HttpStatus { status: 401, .. }));
    }
}
