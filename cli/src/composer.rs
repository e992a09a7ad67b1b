//! Prompt composition from a base description and labeled musical attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const SEPARATOR: &str = ". ";

/// Attributes that always lead the composed prompt, in this order.
const LEADING: [Attribute; 3] = [Attribute::Genre, Attribute::Mood, Attribute::VoiceGender];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Genre,
    Mood,
    VoiceGender,
    Instruments,
    Era,
    Language,
    Tempo,
    Duration,
    Key,
}

impl Attribute {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Genre => "Genre",
            Self::Mood => "Mood",
            Self::VoiceGender => "Voice",
            Self::Instruments => "Instruments",
            Self::Era => "Era",
            Self::Language => "Language",
            Self::Tempo => "Tempo",
            Self::Duration => "Duration",
            Self::Key => "Key",
        }
    }
}

/// Ordered attribute values. Values are stored already formatted, units included.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Attributes(IndexMap<Attribute, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `attribute`, keeping its original position if it was already present.
    pub fn set(&mut self, attribute: Attribute, value: impl Into<String>) -> &mut Self {
        self.0.insert(attribute, value.into());
        self
    }

    /// Sets `attribute` only when a value is given.
    pub fn set_opt(&mut self, attribute: Attribute, value: Option<impl Into<String>>) -> &mut Self {
        if let Some(value) = value {
            self.set(attribute, value);
        }
        self
    }

    pub fn with(mut self, attribute: Attribute, value: impl Into<String>) -> Self {
        self.set(attribute, value);
        self
    }

    /// Stores a tempo as `"<bpm> BPM"`.
    pub fn tempo_bpm(&mut self, bpm: u16) -> &mut Self {
        self.set(Attribute::Tempo, format!("{bpm} BPM"))
    }

    /// Stores a duration as `"<seconds> seconds"`.
    pub fn duration_seconds(&mut self, seconds: u32) -> &mut Self {
        self.set(Attribute::Duration, format!("{seconds} seconds"))
    }

    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.0.get(&attribute).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.0.iter().map(|(attribute, value)| (*attribute, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Attribute, String)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (Attribute, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds the prompt sent to the generation endpoint.
///
/// The trimmed base prompt comes first, followed by genre, mood and voice,
/// then every other attribute in insertion order. Blank values are skipped.
/// Always succeeds, so it can back a live preview of partial input.
pub fn compose(base_prompt: &str, attributes: &Attributes) -> String {
    let mut segments = vec![base_prompt.trim().to_string()];

    let leading = LEADING.iter().filter_map(|attribute| {
        attributes.get(*attribute).map(|value| (*attribute, value))
    });
    let remaining = attributes.iter().filter(|(attribute, _)| !LEADING.contains(attribute));

    for (attribute, value) in leading.chain(remaining) {
        let value = value.trim();
        if !value.is_empty() {
            segments.push(format!("{}: {value}", attribute.label()));
        }
    }

    segments.join(SEPARATOR)
}
