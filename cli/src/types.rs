use serde::{Deserialize, Serialize};

use crate::composer::{compose, Attributes};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GenerationMode {
    #[default]
    Standard,
    /// Custom-mode endpoint; `tags` and `title` are sent verbatim.
    Custom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tags: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

impl GenerationMode {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Standard => "generate",
            Self::Custom { .. } => "generate/custom-mode",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub base_prompt: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub make_instrumental: bool,
    #[serde(default = "default_wait_for_audio")]
    pub wait_for_audio: bool,
    #[serde(default)]
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn new(base_prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            attributes: Attributes::new(),
            make_instrumental: false,
            wait_for_audio: default_wait_for_audio(),
            mode: GenerationMode::Standard,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn instrumental(mut self, make_instrumental: bool) -> Self {
        self.make_instrumental = make_instrumental;
        self
    }

    pub fn wait_audio(mut self, wait: bool) -> Self {
        self.wait_for_audio = wait;
        self
    }

    pub fn custom(mut self, tags: Option<String>, title: Option<String>) -> Self {
        self.mode = GenerationMode::Custom { tags, title };
        self
    }

    pub fn composed_prompt(&self) -> String {
        compose(&self.base_prompt, &self.attributes)
    }

    pub(crate) fn payload(&self) -> GeneratePayload<'_> {
        let (tags, title) = match &self.mode {
            GenerationMode::Standard => (None, None),
            GenerationMode::Custom { tags, title } => (non_blank(tags), non_blank(title)),
        };
        GeneratePayload {
            prompt: self.composed_prompt(),
            make_instrumental: self.make_instrumental,
            wait_audio: self.wait_for_audio,
            tags,
            title,
        }
    }
}

/// JSON body of the generate endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct GeneratePayload<'a> {
    pub prompt: String,
    pub make_instrumental: bool,
    pub wait_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

fn default_wait_for_audio() -> bool {
    true
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}
