use serde::Deserialize;
use serde_json::{Value, json};

use super::TransportError;
use super::number::TransportNumber;
use crate::domain::{MessageText, PatternId, RawPhoneNumber};

pub const SEND_SIMPLE: &str = "send/simple";
pub const SEND_ADVANCED: &str = "send/advanced";
pub const SEND_SCHEDULE: &str = "send/schedule";
pub const SEND_SHARED: &str = "send/shared";
pub const SEND_MULTIPLE: &str = "send/multiple";
pub const RECEIVE_CREDIT: &str = "receive/credit";
pub const RECEIVE_STATUS: &str = "receive/status";

#[derive(Debug, Clone, Deserialize)]
struct CreditJsonResponse {
    amount: TransportNumber,
}

fn with_from(mut body: Value, from: Option<&str>) -> Value {
    if let Some(from) = from {
        body["from"] = Value::String(from.to_owned());
    }
    body
}

pub fn encode_simple(text: &MessageText, to: &RawPhoneNumber, from: Option<&str>) -> Value {
    with_from(json!({ "text": text, "to": to }), from)
}

pub fn encode_advanced(
    text: &MessageText,
    to: &[RawPhoneNumber],
    from: Option<&str>,
    udh: &str,
) -> Value {
    with_from(json!({ "text": text, "to": to, "udh": udh }), from)
}

pub fn encode_schedule(
    text: &MessageText,
    to: &RawPhoneNumber,
    from: Option<&str>,
    date: String,
    period: Option<&str>,
) -> Value {
    let mut body = json!({ "message": text, "to": to, "data": date });
    if let Some(period) = period {
        body["period"] = Value::String(period.to_owned());
    }
    with_from(body, from)
}

pub fn encode_shared(body_id: &PatternId, to: &RawPhoneNumber, args: &[String]) -> Value {
    json!({ "bodyId": body_id, "to": to, "args": args })
}

pub fn encode_multiple(
    texts: &[MessageText],
    recipients: &[RawPhoneNumber],
    from: Option<&str>,
    udh: &str,
) -> Value {
    with_from(
        json!({ "to": recipients, "text": texts, "udh": udh }),
        from,
    )
}

pub fn encode_status(ids: &[i64]) -> Value {
    json!({ "recIds": ids })
}

pub fn decode_credit_json_response(json: &str) -> Result<i64, TransportError> {
    let parsed: CreditJsonResponse = serde_json::from_str(json)?;
    parsed.amount.into_i64("amount")
}
