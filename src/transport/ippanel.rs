use serde::Deserialize;
use serde_json::{Value, json};

use super::TransportError;
use super::number::TransportNumber;
use crate::domain::{MessageText, RawPhoneNumber};

const WEBSERVICE: &str = "webservice";
const PEER_TO_PEER: &str = "peer_to_peer";

#[derive(Debug, Clone, Deserialize)]
struct CreditJsonResponse {
    data: CreditData,
}

#[derive(Debug, Clone, Deserialize)]
struct CreditData {
    credit: TransportNumber,
}

/// Body for a one-text send (single, bulk, or scheduled when `send_time` is set).
pub fn encode_webservice(
    from_number: &str,
    message: &MessageText,
    recipients: &[RawPhoneNumber],
    send_time: Option<String>,
) -> Value {
    let mut body = json!({
        "sending_type": WEBSERVICE,
        "from_number": from_number,
        "message": message,
        "params": { "recipients": recipients },
    });
    if let Some(send_time) = send_time {
        body["send_time"] = Value::String(send_time);
    }
    body
}

/// Body pairing each text with its own recipient.
pub fn encode_peer_to_peer(
    from_number: &str,
    texts: &[MessageText],
    recipients: &[RawPhoneNumber],
) -> Value {
    let params = texts
        .iter()
        .zip(recipients)
        .map(|(message, recipient)| json!({ "recipients": [recipient], "message": message }))
        .collect::<Vec<_>>();

    json!({
        "sending_type": PEER_TO_PEER,
        "from_number": from_number,
        "params": params,
    })
}

pub fn decode_credit_json_response(json: &str) -> Result<i64, TransportError> {
    let parsed: CreditJsonResponse = serde_json::from_str(json)?;
    parsed.data.credit.into_i64("data.credit")
}
