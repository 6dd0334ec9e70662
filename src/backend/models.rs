/*!
 * Wire types shared by the HTTP API and the streaming socket.
 */

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model size served by the backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelVariant {
    #[default]
    #[serde(rename = "4b")]
    Small,
    #[serde(rename = "12b")]
    Large,
}

impl ModelVariant {
    /// Short wire identifier ("4b" / "12b")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "4b",
            Self::Large => "12b",
        }
    }

    /// Hub identifier of the checkpoint the backend loads for this variant
    pub fn model_id(&self) -> &'static str {
        match self {
            Self::Small => "google/translategemma-4b-it",
            Self::Large => "google/translategemma-12b-it",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "4b" => Ok(Self::Small),
            "12b" => Ok(Self::Large),
            _ => Err(anyhow!("Invalid model variant: {} (expected 4b or 12b)", s)),
        }
    }
}

/// Kind of content carried by a translation request
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Image,
}

/// Body of `POST /api/translate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslateRequest {
    /// Content kind
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Source language tag
    pub source_lang: String,
    /// Target language tag
    pub target_lang: String,
    /// Text to translate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Base64 encoded image, for image requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    /// Model variant to use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelVariant>,
}

impl TranslateRequest {
    /// Create a text translation request
    pub fn text(
        content: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            content_type: ContentType::Text,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            content: Some(content.into()),
            image_data: None,
            model: None,
        }
    }

    /// Create an image translation request from base64 data
    pub fn image(
        image_data: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            content_type: ContentType::Image,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            content: None,
            image_data: Some(image_data.into()),
            model: None,
        }
    }

    /// Set the model variant
    pub fn model(mut self, model: ModelVariant) -> Self {
        self.model = Some(model);
        self
    }
}

/// Response of `POST /api/translate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslateResponse {
    /// Translated text
    pub translation: String,
    /// Checkpoint that produced the translation
    pub model_used: String,
    /// Server-side duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<f64>,
}

/// Body of `POST /api/model/switch`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchModelRequest {
    pub model: ModelVariant,
}

/// Accelerator section of the status response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GpuStatus {
    pub available: bool,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_device: Option<u32>,
}

/// Whether the backend has a model in memory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelLoadState {
    Loaded,
    NotLoaded,
    #[serde(other)]
    Unknown,
}

/// Model section of the status response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelStatus {
    pub status: ModelLoadState,
    #[serde(default)]
    pub model: Option<String>,
    /// Memory held by the model, in GB
    #[serde(default)]
    pub vram_usage: f64,
}

/// Response of `GET /api/status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemStatus {
    pub gpu: GpuStatus,
    pub model: ModelStatus,
}

impl SystemStatus {
    /// Whether a model is loaded and ready to translate
    pub fn is_ready(&self) -> bool {
        self.model.status == ModelLoadState::Loaded
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = if self.gpu.available {
            self.gpu.device_name.as_deref().unwrap_or("GPU")
        } else {
            "CPU Mode"
        };
        let model = match self.model.status {
            ModelLoadState::Loaded => self.model.model.as_deref().unwrap_or("loaded"),
            ModelLoadState::NotLoaded => "not loaded",
            ModelLoadState::Unknown => "unknown",
        };
        write!(f, "{} | {} | {:.1} GB", device, model, self.model.vram_usage)
    }
}
