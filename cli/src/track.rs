//! Track records and normalization of the API's response shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::GenerationError, GenerationResult};

pub const UNTITLED: &str = "Untitled";

/// Keys an object may use to wrap the track list.
const ENVELOPE_KEYS: [&str; 2] = ["clips", "data"];

const KNOWN_KEYS: [&str; 9] = [
    "id",
    "title",
    "status",
    "model_name",
    "created_at",
    "audio_url",
    "image_url",
    "lyric",
    "error_message",
];

/// One generated piece of music, normalized from a remote track object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Remote keys this client does not interpret.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

impl Track {
    /// A track is settled once it carries audio or an error.
    pub fn is_settled(&self) -> bool {
        self.audio_url.is_some() || self.error_message.is_some()
    }

    fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let id = match object.get("id")? {
            Value::String(id) if !id.trim().is_empty() => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => return None,
        };

        let extras = object
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(Self {
            id,
            title: text_field(object, "title")
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            status: text_field(object, "status"),
            model_name: text_field(object, "model_name"),
            created_at: text_field(object, "created_at"),
            audio_url: text_field(object, "audio_url"),
            image_url: text_field(object, "image_url"),
            lyrics: text_field(object, "lyric"),
            error_message: text_field(object, "error_message"),
            extras,
        })
    }
}

/// Top-level body of a successful response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawResponse {
    Many(Vec<Value>),
    Single(Map<String, Value>),
    Other(Value),
}

/// Parses a success body into tracks, in response order.
pub(crate) fn normalize_body(body: &str) -> GenerationResult {
    let raw: RawResponse =
        serde_json::from_str(body).map_err(|_| GenerationError::unexpected(body))?;

    let elements = match raw {
        RawResponse::Many(items) => items,
        RawResponse::Single(mut object) => match take_envelope(&mut object) {
            Some(items) => items,
            None => vec![Value::Object(object)],
        },
        RawResponse::Other(_) => return Err(GenerationError::unexpected(body)),
    };

    elements
        .iter()
        .map(|element| {
            element
                .as_object()
                .and_then(Track::from_object)
                .ok_or_else(|| GenerationError::unexpected(body))
        })
        .collect()
}

fn take_envelope(object: &mut Map<String, Value>) -> Option<Vec<Value>> {
    if object.contains_key("id") {
        return None;
    }
    ENVELOPE_KEYS.iter().find_map(|key| match object.remove(*key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
