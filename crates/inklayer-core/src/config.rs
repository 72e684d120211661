// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process settings, loaded once at startup and passed explicitly to the
// components that need them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InklayerError, Result};
use crate::types::{OverlayFont, PaperSize};

/// Default settings file name, resolved relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "config.json";

/// Immutable settings for one process run.
#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /// OCR service endpoint, e.g. `https://<resource>.cognitiveservices.azure.com/`.
    #[serde(rename = "DOCUMENT_INTELLIGENCE_URL")]
    pub endpoint: String,
    /// OCR service access key.
    #[serde(rename = "DOCUMENT_INTELLIGENCE_KEY")]
    pub key: String,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
}

/// Tuning for the OCR service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Analysis model identifier.
    pub model_id: String,
    /// REST API version query parameter.
    pub api_version: String,
    /// Upper bound on the whole analysis (submit + polling), in seconds.
    pub timeout_secs: u64,
    /// Poll interval used when the service sends no `Retry-After`.
    pub poll_interval_ms: u64,
    /// Maximum retries for transient HTTP failures per request.
    pub max_retries: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            model_id: "prebuilt-read".into(),
            api_version: "2023-07-31".into(),
            timeout_secs: 300,
            poll_interval_ms: 1000,
            max_retries: 5,
        }
    }
}

/// Overlay composition options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Font used to measure and emit the invisible text.
    pub font: OverlayFont,
    /// Reference page whose longer side normalises every page's size.
    pub reference_page: PaperSize,
    /// Suffix appended to the input stem to form the output file name.
    pub output_suffix: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            font: OverlayFont::default(),
            reference_page: PaperSize::Letter,
            output_suffix: "_searchable.pdf".into(),
        }
    }
}

impl Settings {
    /// Build settings directly, with default OCR and overlay options.
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            ocr: OcrSettings::default(),
            overlay: OverlaySettings::default(),
        }
    }

    /// Load and validate settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            InklayerError::ConfigLoad(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_json(&raw)
            .map_err(|err| InklayerError::ConfigLoad(format!("{}: {}", path.display(), err)))
    }

    /// Parse and validate settings from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)
            .map_err(|err| InklayerError::ConfigLoad(format!("malformed settings: {err}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the required values are usable.
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(InklayerError::ConfigLoad(format!(
                "DOCUMENT_INTELLIGENCE_URL must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.key.trim().is_empty() {
            return Err(InklayerError::ConfigLoad(
                "DOCUMENT_INTELLIGENCE_KEY must not be empty".into(),
            ));
        }
        if self.ocr.timeout_secs == 0 {
            return Err(InklayerError::ConfigLoad(
                "ocr.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("ocr", &self.ocr)
            .field("overlay", &self.overlay)
            .finish()
    }
}
