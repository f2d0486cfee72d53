//! Menu builder: reply-keyboard entries that open pages of the web app.
//!
//! The custom-transaction entry carries a prepared transaction as a base64-encoded
//! JSON `startapp` query parameter, which the web app decodes on launch.

use crate::channels::{KeyboardButton, ReplyKeyboard, WebAppInfo};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One labeled button and the URL it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub target_url: String,
}

/// Main menu: (label, path under the web app base URL).
const MAIN_MENU: &[(&str, &str)] = &[
    ("💰 Send sample transaction", "/send-transaction"),
    ("🔐 Sign message", "/sign-message"),
    ("🧪 Transaction tester", "/transaction-tester"),
];

const CUSTOM_TRANSACTION_LABEL: &str = "💸 Execute transaction";

/// Query parameter the web app reads the prepared transaction from.
pub const START_PARAM: &str = "startapp";

/// Transaction prepared by the bot and executed by the web app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTransaction {
    pub to: String,
    /// Amount in ETH, as a decimal string.
    pub value: String,
    pub description: String,
    pub chain_id: u64,
}

impl CustomTransaction {
    /// The fixed transaction offered by `/custom`.
    pub fn sample() -> Self {
        Self {
            to: "0x742d35Cc6537C0532925a3b8C17Eb02b80D4E4AE".to_string(),
            value: "0.005".to_string(),
            description: "Custom transaction - send 0.005 ETH".to_string(),
            chain_id: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("start parameter is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("start parameter is not a transaction record: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Main menu entries for a web app base URL, in display order.
pub fn build_menu(base_url: &str) -> Vec<MenuEntry> {
    MAIN_MENU
        .iter()
        .map(|(label, path)| MenuEntry {
            label: label.to_string(),
            target_url: join_url(base_url, path),
        })
        .collect()
}

/// Compact JSON, standard base64 alphabet with padding, no line wrapping.
pub fn encode_start_param(tx: &CustomTransaction) -> String {
    // Serializing a struct of strings and an integer cannot fail.
    let json = serde_json::to_string(tx).unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

/// Inverse of [`encode_start_param`].
pub fn decode_start_param(param: &str) -> Result<CustomTransaction, MenuError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(param.as_bytes())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `{base}/send-transaction?startapp=<encoded>`, the encoded value percent-escaped.
pub fn custom_transaction_url(base_url: &str, tx: &CustomTransaction) -> String {
    let encoded: String =
        url::form_urlencoded::byte_serialize(encode_start_param(tx).as_bytes()).collect();
    format!(
        "{}?{}={}",
        join_url(base_url, "/send-transaction"),
        START_PARAM,
        encoded
    )
}

/// Single-entry menu that opens the web app with the sample transaction prefilled.
pub fn build_custom_menu(base_url: &str) -> (CustomTransaction, Vec<MenuEntry>) {
    let tx = CustomTransaction::sample();
    let entry = MenuEntry {
        label: CUSTOM_TRANSACTION_LABEL.to_string(),
        target_url: custom_transaction_url(base_url, &tx),
    };
    (tx, vec![entry])
}

/// Reply keyboard with one web app button per row.
pub fn keyboard(entries: &[MenuEntry], one_time: bool) -> ReplyKeyboard {
    ReplyKeyboard {
        keyboard: entries
            .iter()
            .map(|e| {
                vec![KeyboardButton {
                    text: e.label.clone(),
                    web_app: WebAppInfo {
                        url: e.target_url.clone(),
                    },
                }]
            })
            .collect(),
        resize_keyboard: true,
        one_time_keyboard: one_time,
    }
}
