//! Event dispatcher: turns a web app JSON payload into a chat reply.
//!
//! The payload's `action` selects one of four templates; anything else is echoed back
//! as a pretty-printed JSON block. [`render`] is total: malformed input yields an
//! error reply instead of an error value.

use crate::channels::OutboundMessage;
use crate::markup;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Signature characters shown before the ellipsis.
const SIGNATURE_PREVIEW_CHARS: usize = 20;

const ECHO_HEADER: &str = "📨 Received data from the mini app:";
const TRUNCATION_MARKER: &str = "\n… (truncated)";

/// Known `action` tags plus the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    SignMessage,
    TransactionSent,
    TransactionConfirmed,
    TransactionFailed,
    Unknown,
}

impl AppAction {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("signMessage") => Self::SignMessage,
            Some("transaction_sent") => Self::TransactionSent,
            Some("transaction_confirmed") => Self::TransactionConfirmed,
            Some("transaction_failed") => Self::TransactionFailed,
            _ => Self::Unknown,
        }
    }
}

/// Fields the templates read. Every field is optional; non-string scalars are kept as their JSON text.
#[derive(Debug, Default, Deserialize)]
pub struct InboundPayload {
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub signature: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(default, rename = "txHash", deserialize_with = "lenient_text")]
    pub tx_hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub error: Option<String>,
    #[serde(default, rename = "userId", deserialize_with = "lenient_text")]
    pub user_id: Option<String>,
}

/// Accept any JSON value: strings as-is, null as None, anything else as its JSON text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

impl InboundPayload {
    /// Action derived from the `action` field. Only exact tags match.
    pub fn action(&self) -> AppAction {
        AppAction::from_tag(self.action.as_deref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// First `max` characters of `s` (whole string when shorter). Never splits a character.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Render the reply for a raw `web_app_data` payload. Never fails.
pub fn render(payload_json: &str) -> OutboundMessage {
    match try_render(payload_json) {
        Ok(msg) => msg,
        Err(e) => {
            log::error!("error processing web app data: {}", e);
            plain_reply(format!("❌ Error while processing data: {}", e))
        }
    }
}

fn try_render(payload_json: &str) -> Result<OutboundMessage, DispatchError> {
    let value: Value = serde_json::from_str(payload_json)?;
    if !value.is_object() {
        return Err(DispatchError::NotAnObject);
    }
    let payload = InboundPayload::deserialize(&value)?;
    log::debug!(
        "web app data: action={:?} user={:?}",
        payload.action,
        payload.user_id
    );

    let msg = match payload.action() {
        AppAction::SignMessage => plain_reply(format!(
            "✅ Message signed!\n\n📝 Message: {}\n🔐 Signature: {}...\n⏰ Time: {}",
            field(&payload.message),
            truncate_chars(field(&payload.signature), SIGNATURE_PREVIEW_CHARS),
            field(&payload.timestamp),
        )),
        AppAction::TransactionSent => plain_reply(format!(
            "📤 Transaction sent!\n\n🔗 Hash: {}\n📊 Status: {}\n⏰ Time: {}\n\n⏳ Waiting for blockchain confirmation...",
            field(&payload.tx_hash),
            field(&payload.status),
            field(&payload.timestamp),
        )),
        AppAction::TransactionConfirmed => plain_reply(format!(
            "🎉 Transaction confirmed!\n\n🔗 Hash: {}\n📊 Final status: {}\n⏰ Completed at: {}\n\n✅ The transaction completed successfully!",
            field(&payload.tx_hash),
            field(&payload.status),
            field(&payload.timestamp),
        )),
        AppAction::TransactionFailed => plain_reply(format!(
            "❌ Transaction failed!\n\n🚫 Error: {}\n⏰ Time: {}\n\nPlease try again.",
            field(&payload.error),
            field(&payload.timestamp),
        )),
        AppAction::Unknown => render_raw(&value)?,
    };
    Ok(msg)
}

/// Template reply, clipped to what sendMessage accepts.
fn plain_reply(text: String) -> OutboundMessage {
    OutboundMessage::plain(markup::clip(&text, markup::MESSAGE_LIMIT))
}

/// Echo the whole payload as an indented JSON code block (MarkdownV2), with a plain-text twin.
/// Oversized JSON is cut so both renditions fit in one message.
fn render_raw(value: &Value) -> Result<OutboundMessage, DispatchError> {
    let pretty = serde_json::to_string_pretty(value)?;
    let header = markup::escape_markdown_v2(ECHO_HEADER);
    let text = format!("{}\n\n{}", header, markup::code_block("json", &pretty));
    let plain = format!("{}\n\n{}", ECHO_HEADER, pretty);
    if markup::utf16_len(&text) <= markup::MESSAGE_LIMIT
        && markup::utf16_len(&plain) <= markup::MESSAGE_LIMIT
    {
        return Ok(OutboundMessage::markdown_v2(text, plain));
    }

    let marker = markup::utf16_len(TRUNCATION_MARKER);
    let fence = markup::utf16_len(&markup::code_block("json", ""));
    let text_budget = markup::MESSAGE_LIMIT.saturating_sub(markup::utf16_len(&header) + 2 + fence + marker);
    let plain_budget = markup::MESSAGE_LIMIT.saturating_sub(markup::utf16_len(ECHO_HEADER) + 2 + marker);
    let body = format!(
        "{}{}",
        json_prefix(&pretty, text_budget, plain_budget),
        TRUNCATION_MARKER
    );
    let text = format!("{}\n\n{}", header, markup::code_block("json", &body));
    let plain = format!("{}\n\n{}", ECHO_HEADER, body);
    Ok(OutboundMessage::markdown_v2(text, plain))
}

/// Longest prefix of `pretty` whose code-block escaping fits `text_budget` and whose raw form
/// fits `plain_budget` (both in UTF-16 units).
fn json_prefix(pretty: &str, text_budget: usize, plain_budget: usize) -> &str {
    let (mut text_used, mut plain_used, mut end) = (0, 0, 0);
    for (idx, c) in pretty.char_indices() {
        let units = c.len_utf16();
        let escaped = if c == '\\' || c == '`' { units + 1 } else { units };
        if text_used + escaped > text_budget || plain_used + units > plain_budget {
            break;
        }
        text_used += escaped;
        plain_used += units;
        end = idx + c.len_utf8();
    }
    &pretty[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ParseMode;

    const TEMPLATE_MARKERS: &[&str] = &[
        "Message signed",
        "Transaction sent",
        "Waiting for blockchain confirmation",
        "Transaction confirmed",
        "completed successfully",
        "Transaction failed",
        "Please try again",
        "Received data from the mini app",
        "Error while processing data",
    ];

    fn markers_in(text: &str) -> Vec<&'static str> {
        TEMPLATE_MARKERS
            .iter()
            .copied()
            .filter(|m| text.contains(m))
            .collect()
    }

    #[test]
    fn transaction_failed_example() {
        let msg = render(
            r#"{"action":"transaction_failed","error":"insufficient funds","timestamp":"2024-01-01T00:00:00Z"}"#,
        );
        assert!(msg.text.contains("insufficient funds"));
        assert!(msg.text.contains("2024-01-01T00:00:00Z"));
        assert_eq!(markers_in(&msg.text), vec!["Transaction failed", "Please try again"]);
        assert_eq!(msg.parse_mode, None);
    }

    #[test]
    fn sign_message_truncates_signature() {
        let sig = "0x1234567890abcdef1234567890abcdef";
        let msg = render(&format!(
            r#"{{"action":"signMessage","message":"hello","signature":"{}","timestamp":"t1","userId":42}}"#,
            sig
        ));
        assert!(msg.text.contains("Message: hello"));
        assert!(msg.text.contains("Signature: 0x1234567890abcdef12..."));
        assert!(!msg.text.contains(sig));
        assert!(msg.text.contains("Time: t1"));
        assert_eq!(markers_in(&msg.text), vec!["Message signed"]);
    }

    #[test]
    fn short_signature_is_kept_whole() {
        let msg = render(r#"{"action":"signMessage","signature":"0xabc"}"#);
        assert!(msg.text.contains("Signature: 0xabc..."));
    }

    #[test]
    fn multibyte_signature_truncates_on_char_boundary() {
        let sig = "서".repeat(25);
        let msg = render(&format!(r#"{{"action":"signMessage","signature":"{}"}}"#, sig));
        assert!(msg.text.contains(&format!("Signature: {}...", "서".repeat(20))));
    }

    #[test]
    fn transaction_sent_and_confirmed() {
        let sent = render(
            r#"{"action":"transaction_sent","txHash":"0xdead","status":"pending","timestamp":"t2"}"#,
        );
        assert!(sent.text.contains("Hash: 0xdead"));
        assert!(sent.text.contains("Status: pending"));
        assert!(sent.text.contains("Time: t2"));
        assert_eq!(
            markers_in(&sent.text),
            vec!["Transaction sent", "Waiting for blockchain confirmation"]
        );

        let confirmed = render(
            r#"{"action":"transaction_confirmed","txHash":"0xbeef","status":"confirmed","timestamp":"t3"}"#,
        );
        assert!(confirmed.text.contains("Hash: 0xbeef"));
        assert!(confirmed.text.contains("Final status: confirmed"));
        assert!(confirmed.text.contains("Completed at: t3"));
        assert_eq!(
            markers_in(&confirmed.text),
            vec!["Transaction confirmed", "completed successfully"]
        );
    }

    #[test]
    fn missing_fields_render_empty() {
        let msg = render(r#"{"action":"transaction_sent"}"#);
        assert!(msg.text.contains("🔗 Hash: \n"));
        assert!(msg.text.contains("📊 Status: \n"));
        let msg = render(r#"{"action":"transaction_failed","error":null}"#);
        assert!(msg.text.contains("🚫 Error: \n"));
    }

    #[test]
    fn non_string_fields_render_as_json_text() {
        let msg = render(r#"{"action":"transaction_failed","error":{"code":4001},"timestamp":1700000000}"#);
        assert!(msg.text.contains(r#"Error: {"code":4001}"#));
        assert!(msg.text.contains("Time: 1700000000"));
    }

    #[test]
    fn unknown_action_echoes_pretty_json() {
        let input = r#"{"action":"custom_thing","nested":{"b":2,"a":[1,2]},"name":"테스트"}"#;
        let msg = render(input);
        assert_eq!(msg.parse_mode, Some(ParseMode::MarkdownV2));
        assert!(msg.text.contains("```json\n{\n  \"action\": \"custom_thing\""));
        assert!(msg.text.ends_with("\n```"));
        assert!(msg.text.contains("테스트"));
        assert_eq!(markers_in(&msg.text), vec!["Received data from the mini app"]);

        let plain = msg.plain_text.unwrap();
        let json_start = plain.find('{').unwrap();
        let echoed: Value = serde_json::from_str(&plain[json_start..]).unwrap();
        assert_eq!(echoed, serde_json::from_str::<Value>(input).unwrap());
        // key order is preserved
        assert!(plain.find("\"b\"").unwrap() < plain.find("\"a\"").unwrap());
    }

    #[test]
    fn missing_null_or_non_string_action_falls_back() {
        for input in [
            r#"{"txHash":"0x1"}"#,
            r#"{"action":null}"#,
            r#"{"action":7}"#,
            r#"{"action":"SignMessage"}"#,
            r#"{}"#,
        ] {
            let msg = render(input);
            assert_eq!(msg.parse_mode, Some(ParseMode::MarkdownV2), "input: {}", input);
            assert_eq!(markers_in(&msg.text), vec!["Received data from the mini app"]);
        }
    }

    #[test]
    fn fallback_keeps_integers_beyond_u64() {
        let msg = render(r#"{"action":"other","valueWei":100000000000000000000}"#);
        let plain = msg.plain_text.unwrap();
        assert!(plain.contains(r#""valueWei": 100000000000000000000"#), "{}", plain);
        assert!(msg.text.contains("100000000000000000000"));
        assert!(!plain.contains("e+20"));
    }

    #[test]
    fn oversized_fallback_is_cut_to_one_message() {
        let items: Vec<String> = (0..300).map(|k| format!(r#"{{"k":{}}}"#, k)).collect();
        let input = format!(r#"{{"items":[{}]}}"#, items.join(","));
        let msg = render(&input);
        let plain = msg.plain_text.clone().unwrap();
        assert!(markup::utf16_len(&msg.text) <= markup::MESSAGE_LIMIT, "text: {}", msg.text.len());
        assert!(markup::utf16_len(&plain) <= markup::MESSAGE_LIMIT, "plain: {}", plain.len());
        assert!(msg.text.starts_with("📨 Received data from the mini app:\n\n```json\n{"));
        assert!(msg.text.ends_with("… (truncated)\n```"));
        assert!(plain.ends_with("… (truncated)"));
        assert!(plain.contains(r#""k": 0"#));
        assert!(!plain.contains(r#""k": 299"#));
    }

    #[test]
    fn oversized_fallback_counts_escapes() {
        let input = format!(r#"{{"note":"{}"}}"#, "`".repeat(3000));
        let msg = render(&input);
        assert!(markup::utf16_len(&msg.text) <= markup::MESSAGE_LIMIT);
        assert!(markup::utf16_len(msg.plain_text.as_deref().unwrap()) <= markup::MESSAGE_LIMIT);
        assert!(msg.text.ends_with("… (truncated)\n```"));
    }

    #[test]
    fn long_template_fields_are_clipped() {
        let input = format!(r#"{{"action":"signMessage","message":"{}"}}"#, "m".repeat(5000));
        let msg = render(&input);
        assert_eq!(markup::utf16_len(&msg.text), markup::MESSAGE_LIMIT);
        assert!(msg.text.starts_with("✅ Message signed!"));
        assert!(msg.text.ends_with('…'));
    }

    #[test]
    fn fallback_escapes_markup_inside_code_block() {
        let msg = render(r#"{"note":"use `code` here"}"#);
        assert!(msg.text.contains("\\`code\\`"));
        assert!(msg.plain_text.unwrap().contains("`code`"));
    }

    #[test]
    fn non_json_input_yields_error_message() {
        for input in ["not json", "", "{\"action\":", "[1,2,3]", "\"signMessage\"", "42"] {
            let msg = render(input);
            assert!(
                msg.text.starts_with("❌ Error while processing data: "),
                "input {:?} gave {:?}",
                input,
                msg.text
            );
            assert_eq!(msg.parse_mode, None);
        }
        assert!(render("[1]").text.contains("not a JSON object"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let input = r#"{"action":"transaction_confirmed","txHash":"0x1"}"#;
        assert_eq!(render(input), render(input));
    }

    #[test]
    fn action_tags_are_exact() {
        assert_eq!(AppAction::from_tag(Some("signMessage")), AppAction::SignMessage);
        assert_eq!(AppAction::from_tag(Some("transaction_sent")), AppAction::TransactionSent);
        assert_eq!(AppAction::from_tag(Some("transaction_sent ")), AppAction::Unknown);
        assert_eq!(AppAction::from_tag(None), AppAction::Unknown);
    }
}
