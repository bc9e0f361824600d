//! Configuration schema for graphchat.

use graphchat_protocol::DEFAULT_ENDPOINT_PATH;
use serde::{Deserialize, Serialize};

/// Root config for the graphchat client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphChatConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Which transport carries questions to the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One HTTP POST per question.
    #[default]
    Http,
    /// A long-lived WebSocket connection.
    Websocket,
}

impl TransportKind {
    /// Return the transport kind as its config string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::Websocket => "websocket",
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Ok(TransportKind::Http),
            "websocket" | "ws" => Ok(TransportKind::Websocket),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint_path: default_endpoint_path(),
            transport: TransportKind::default(),
            ws_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Full URL of the question endpoint.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_path
        )
    }

    /// WebSocket URL, derived from the base URL when not set explicitly.
    pub fn websocket_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}/ws")
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Terminal UI settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfig {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default = "default_suggestions")]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            user_name: None,
            suggestions: default_suggestions(),
            log_file: None,
        }
    }
}

fn default_suggestions() -> Vec<String> {
    [
        "How old is LeBron James?",
        "List all players on the Brooklyn Nets.",
        "Is James Harden a teammate of Kevin Durant?",
        "Who are the teammates of the players coached by Doc Rivers?",
        "what is the age difference between Luka Doncic and LeBron James?",
        "who is the highest paid person from lakers?",
    ]
    .iter()
    .map(|question| question.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn endpoint_url_joins_without_double_slash() {
        let backend = BackendConfig {
            base_url: "http://graph.local:5000/".to_string(),
            ..BackendConfig::default()
        };
        assert_eq!(
            backend.endpoint_url(),
            "http://graph.local:5000/api/generate-query"
        );
    }

    #[test]
    fn websocket_url_derives_scheme_from_base() {
        let backend = BackendConfig {
            base_url: "https://graph.example.com".to_string(),
            ..BackendConfig::default()
        };
        assert_eq!(backend.websocket_url(), "wss://graph.example.com/ws");

        let explicit = BackendConfig {
            ws_url: Some("ws://127.0.0.1:9000/chat".to_string()),
            ..BackendConfig::default()
        };
        assert_eq!(explicit.websocket_url(), "ws://127.0.0.1:9000/chat");
    }

    #[test]
    fn transport_kind_parses_aliases() {
        assert_eq!("HTTP".parse::<TransportKind>(), Ok(TransportKind::Http));
        assert_eq!("ws".parse::<TransportKind>(), Ok(TransportKind::Websocket));
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
    }

    #[test]
    fn default_ui_ships_six_suggestions() {
        let ui = UiConfig::default();
        assert_eq!(ui.suggestions.len(), 6);
        assert_eq!(ui.suggestions[0], "How old is LeBron James?");
    }
}
