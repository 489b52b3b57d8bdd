use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::PayloadDecodeError;
use crate::cfg::RelayConfig;

/// A push payload, classified once when the event arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Absent,
    PlainText(String),
    Structured(StructuredPayload),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    /// The nested `data` object, if the payload carried one.
    pub data: Option<Map<String, Value>>,
}

impl Payload {
    /// Decodes raw push bytes. A body that is not JSON becomes plain text.
    pub fn decode(bytes: Option<&[u8]>) -> Self {
        let Some(bytes) = bytes else {
            return Payload::Absent;
        };
        let text = String::from_utf8_lossy(bytes);
        match StructuredPayload::parse(&text) {
            Ok(structured) => Payload::Structured(structured),
            Err(err) => {
                tracing::warn!(error = %err, "push payload is not JSON, using plain text");
                Payload::PlainText(text.into_owned())
            }
        }
    }

    pub fn resolve(self, config: &RelayConfig) -> NotificationRequest {
        let structured = match self {
            Payload::Absent => StructuredPayload {
                title: Some(config.fallback_title.clone()),
                body: Some(config.empty_body.clone()),
                ..Default::default()
            },
            Payload::PlainText(text) => StructuredPayload {
                title: Some(config.fallback_title.clone()),
                body: Some(text),
                ..Default::default()
            },
            Payload::Structured(structured) => structured,
        };
        structured.resolve(config)
    }
}

impl StructuredPayload {
    pub fn parse(text: &str) -> Result<Self, PayloadDecodeError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut fields) = value else {
            return Ok(Self::default());
        };
        let data = match fields.remove("data") {
            Some(Value::Object(data)) => Some(data),
            _ => None,
        };
        Ok(Self {
            title: string_field(&fields, "title"),
            body: string_field(&fields, "body"),
            icon: string_field(&fields, "icon"),
            badge: string_field(&fields, "badge"),
            data,
        })
    }

    fn resolve(self, config: &RelayConfig) -> NotificationRequest {
        let or_default = |value: Option<String>, default: &str| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut extra = self.data.unwrap_or_default();
        let url = match extra.remove("url") {
            Some(Value::String(url)) => Some(url),
            _ => None,
        };

        NotificationRequest {
            title: or_default(self.title, &config.default_title),
            options: NotificationOptions {
                body: or_default(self.body, &config.default_body),
                icon: or_default(self.icon, &config.default_icon),
                badge: or_default(self.badge, &config.default_badge),
                data: NotificationData {
                    url: or_default(url, &config.default_url),
                    extra,
                },
            },
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Everything needed for one `showNotification` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub options: NotificationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: NotificationData,
}

/// Stored on the displayed notification and read back on click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotificationData {
    /// Reads `url` back from the data the platform kept on a shown
    /// notification. Anything but a non-empty string counts as absent.
    pub fn stored_url(data: &Value) -> Option<String> {
        data.get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}
