//! Backend layer: the provider contract, its implementations, and the registry.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::domain::{ConfigError, MessageText, RawPhoneNumber, ScheduleTime, SendOptions};
use crate::transport::{
    BoxFuture, HttpRequest, HttpTransport, ReqwestTransport, TransportFailure,
};

pub mod ippanel;
pub mod melipayamak;
pub mod registry;

/// Provider response body, passed through as parsed JSON.
pub type ProviderResponse = Value;

pub type BackendResult<'a, T> = BoxFuture<'a, Result<T, BackendError>>;

#[derive(Debug, thiserror::Error)]
/// Errors returned by a [`Backend`].
///
/// Configuration problems are reported before any request is made; everything
/// else comes from the single request the operation issued.
pub enum BackendError {
    /// Settings or call arguments were rejected before any network I/O.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(#[from] ConfigError),

    /// The provider has no counterpart for this operation.
    #[error("{backend} does not implement {operation}")]
    NotImplemented {
        backend: &'static str,
        operation: &'static str,
    },

    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] TransportFailure),

    /// Non-successful HTTP status code returned by the provider.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// Response body could not be parsed as the expected format.
    #[error("parse error: {0}")]
    Parse(#[source] Box<dyn StdError + Send + Sync>),
}

/// The operations every SMS provider exposes.
///
/// Each call issues at most one HTTP request. Operations a provider cannot
/// serve keep the default body and fail with [`BackendError::NotImplemented`].
pub trait Backend: Send + Sync {
    /// Stable identifier used by the registry and recorded on messages.
    fn identifier(&self) -> &'static str;

    /// Human readable provider name.
    fn label(&self) -> &'static str;

    /// Send one text to one recipient.
    fn send<'a>(
        &'a self,
        text: &'a MessageText,
        to: &'a RawPhoneNumber,
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        let _ = (text, to, options);
        not_implemented(self.identifier(), "send")
    }

    /// Send one text to many recipients in a single provider call.
    fn send_bulk<'a>(
        &'a self,
        text: &'a MessageText,
        to: &'a [RawPhoneNumber],
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        let _ = (text, to, options);
        not_implemented(self.identifier(), "send_bulk")
    }

    /// Ask the provider to deliver at `schedule` (plus `options.seconds`).
    fn send_schedule<'a>(
        &'a self,
        text: &'a MessageText,
        to: &'a RawPhoneNumber,
        schedule: ScheduleTime,
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        let _ = (text, to, schedule, options);
        not_implemented(self.identifier(), "send_schedule")
    }

    /// Send a provider-stored pattern, looked up by id or name.
    fn send_pattern<'a>(
        &'a self,
        pattern: &'a str,
        to: &'a RawPhoneNumber,
        args: &'a [String],
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        let _ = (pattern, to, args, options);
        not_implemented(self.identifier(), "send_pattern")
    }

    /// Send `texts[i]` to `recipients[i]` in a single provider call.
    fn send_multiple<'a>(
        &'a self,
        texts: &'a [MessageText],
        recipients: &'a [RawPhoneNumber],
        options: &'a SendOptions,
    ) -> BackendResult<'a, ProviderResponse> {
        let _ = (texts, recipients, options);
        not_implemented(self.identifier(), "send_multiple")
    }

    /// Remaining account balance.
    fn get_credit(&self) -> BackendResult<'_, i64> {
        not_implemented(self.identifier(), "get_credit")
    }

    /// Delivery status of previously sent messages.
    fn get_status<'a>(&'a self, ids: &'a [i64]) -> BackendResult<'a, ProviderResponse> {
        let _ = ids;
        not_implemented(self.identifier(), "get_status")
    }
}

impl fmt::Debug for dyn Backend + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("identifier", &self.identifier())
            .field("label", &self.label())
            .finish()
    }
}

impl fmt::Display for dyn Backend + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn not_implemented<'a, T: Send + 'a>(
    backend: &'static str,
    operation: &'static str,
) -> BackendResult<'a, T> {
    Box::pin(std::future::ready(Err(BackendError::NotImplemented {
        backend,
        operation,
    })))
}

pub(crate) fn ensure_same_length(
    texts: &[MessageText],
    recipients: &[RawPhoneNumber],
) -> Result<(), ConfigError> {
    if texts.len() != recipients.len() {
        return Err(ConfigError::LengthMismatch {
            texts: texts.len(),
            recipients: recipients.len(),
        });
    }
    ensure_recipients(recipients)
}

pub(crate) fn ensure_recipients(recipients: &[RawPhoneNumber]) -> Result<(), ConfigError> {
    if recipients.is_empty() {
        return Err(ConfigError::Empty {
            field: RawPhoneNumber::FIELD,
        });
    }
    Ok(())
}

/// Issue `request` and return the response body of a 2xx answer.
///
/// `operation` only labels log lines; URLs are not logged since some providers
/// embed the token in them.
pub(crate) async fn execute(
    http: &dyn HttpTransport,
    backend: &'static str,
    operation: &'static str,
    request: HttpRequest,
) -> Result<String, BackendError> {
    log::debug!("{backend}: {} {operation}", request.method);

    let response = http
        .execute(request)
        .await
        .map_err(BackendError::Transport)?;

    if !response.is_success() {
        log::debug!("{backend}: {operation} answered HTTP {}", response.status);
        let body = if response.body.trim().is_empty() {
            None
        } else {
            Some(response.body)
        };
        return Err(BackendError::HttpStatus {
            status: response.status,
            body,
        });
    }

    Ok(response.body)
}

pub(crate) async fn execute_json(
    http: &dyn HttpTransport,
    backend: &'static str,
    operation: &'static str,
    request: HttpRequest,
) -> Result<ProviderResponse, BackendError> {
    let body = execute(http, backend, operation, request).await?;
    serde_json::from_str(&body).map_err(|err| BackendError::Parse(Box::new(err)))
}

/// HTTP knobs shared by every backend builder.
#[derive(Clone, Default)]
pub(crate) struct HttpSettings {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl HttpSettings {
    pub(crate) fn base_url(&mut self, base_url: String) {
        self.base_url = Some(base_url);
    }

    pub(crate) fn timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub(crate) fn user_agent(&mut self, user_agent: String) {
        self.user_agent = Some(user_agent);
    }

    pub(crate) fn transport(&mut self, transport: Arc<dyn HttpTransport>) {
        self.transport = Some(transport);
    }

    /// Validated base URL (no trailing slash) and the transport to use.
    pub(crate) fn resolve(
        self,
        default_base_url: &str,
    ) -> Result<(String, Arc<dyn HttpTransport>), BackendError> {
        let base_url = match self.base_url {
            Some(base_url) => {
                url::Url::parse(&base_url)
                    .map_err(|_| ConfigError::InvalidUrl {
                        input: base_url.clone(),
                    })?;
                base_url.trim_end_matches('/').to_owned()
            }
            None => default_base_url.to_owned(),
        };

        if let Some(transport) = self.transport {
            return Ok((base_url, transport));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|err| BackendError::Transport(Box::new(err)))?;

        Ok((base_url, Arc::new(ReqwestTransport::new(client))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;

    struct Silent;

    fn probe() -> HttpRequest {
        HttpRequest::get("https://example.invalid")
    }

    impl Backend for Silent {
        fn identifier(&self) -> &'static str {
            "silent"
        }

        fn label(&self) -> &'static str {
            "Silent"
        }
    }

    #[tokio::test]
    async fn default_operations_are_not_implemented() {
        let backend: Box<dyn Backend> = Box::new(Silent);
        let err = backend.get_credit().await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::NotImplemented {
                backend: "silent",
                operation: "get_credit"
            }
        ));

        let err = backend.get_status(&[1, 2]).await.unwrap_err();
        assert_eq!(err.to_string(), "silent does not implement get_status");
    }

    #[test]
    fn backend_formats_like_its_label() {
        let backend: Box<dyn Backend> = Box::new(Silent);
        assert_eq!(backend.to_string(), "Silent");
        assert_eq!(
            format!("{backend:?}"),
            r#"Backend { identifier: "silent", label: "Silent" }"#
        );
    }

    #[test]
    fn length_mismatch_is_reported_with_both_sizes() {
        let texts = vec![MessageText::new("a").unwrap()];
        let recipients = vec![
            RawPhoneNumber::new("1").unwrap(),
            RawPhoneNumber::new("2").unwrap(),
        ];
        assert_eq!(
            ensure_same_length(&texts, &recipients),
            Err(ConfigError::LengthMismatch {
                texts: 1,
                recipients: 2
            })
        );
        assert!(ensure_same_length(&[], &[]).is_err());
    }

    #[tokio::test]
    async fn execute_maps_non_success_http_status() {
        let transport = FakeTransport::new(500, "oops");
        let err = execute(&transport, "test", "probe", probe())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::HttpStatus {
                status: 500,
                body: Some(_)
            }
        ));

        let transport = FakeTransport::new(503, "   ");
        let err = execute(&transport, "test", "probe", probe())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::HttpStatus {
                status: 503,
                body: None
            }
        ));
    }

    #[tokio::test]
    async fn execute_json_maps_invalid_json_to_parse_error() {
        let transport = FakeTransport::ok("{ not json }");
        let err = execute_json(&transport, "test", "probe", probe())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[tokio::test]
    async fn execute_propagates_transport_failure() {
        let transport = FakeTransport::unreachable();
        let err = execute(&transport, "test", "probe", probe())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[test]
    fn settings_reject_invalid_base_url() {
        let mut settings = HttpSettings::default();
        settings.base_url("not a url".to_owned());
        assert!(matches!(
            settings.resolve("https://example.invalid"),
            Err(BackendError::ImproperlyConfigured(ConfigError::InvalidUrl { .. }))
        ));
    }
}
