//! Persisted generation parameters and display theme.
//!
//! Settings live in the `settings` table under fixed keys. Reads fall back to
//! defaults for anything missing or unreadable; writes of the generation
//! fields happen in a single transaction so a failed save never leaves a
//! half-updated set behind.

use crate::db::{Database, StorageError};
use serde::Serialize;
use std::fmt;

pub const KEY_THEME: &str = "theme";
pub const KEY_API_KEY: &str = "apiKey";
pub const KEY_BASE_URL: &str = "llmApiBase";
pub const KEY_MODEL_NAME: &str = "llmModel";
pub const KEY_TEMPERATURE: &str = "temperature";
pub const KEY_CHUNK_SIZE: &str = "maxTokens";

pub const DEFAULT_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_CHUNK_SIZE: u32 = 4000;

const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;
const CHUNK_SIZE_RANGE: std::ops::RangeInclusive<u32> = 100..=8000;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid {field} '{value}': {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Settings storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SettingsError {
    fn invalid(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        SettingsError::Invalid {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub temperature: f64,
    pub chunk_size: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            model_name: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.temperature.is_finite() || !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(SettingsError::invalid(
                "temperature",
                self.temperature.to_string(),
                "must be between 0 and 2",
            ));
        }
        if !CHUNK_SIZE_RANGE.contains(&self.chunk_size) {
            return Err(SettingsError::invalid(
                "chunk size",
                self.chunk_size.to_string(),
                "must be between 100 and 8000",
            ));
        }
        Ok(())
    }

    /// API key shortened for display. Keys of 8 characters or fewer are shown as-is.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            self.api_key.clone()
        }
    }

    fn entries(&self) -> [(&'static str, String); 5] {
        [
            (KEY_API_KEY, self.api_key.clone()),
            (KEY_BASE_URL, self.base_url.clone()),
            (KEY_MODEL_NAME, self.model_name.clone()),
            (KEY_TEMPERATURE, self.temperature.to_string()),
            (KEY_CHUNK_SIZE, self.chunk_size.to_string()),
        ]
    }
}

/// Editable, free-form string version of [`GenerationSettings`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettingsDraft {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub temperature: String,
    pub chunk_size: String,
}

impl From<&GenerationSettings> for SettingsDraft {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            model_name: settings.model_name.clone(),
            temperature: settings.temperature.to_string(),
            chunk_size: settings.chunk_size.to_string(),
        }
    }
}

impl SettingsDraft {
    /// Coerce the string fields into typed settings and check their ranges.
    pub fn parse(&self) -> Result<GenerationSettings, SettingsError> {
        let temperature = self
            .temperature
            .trim()
            .parse::<f64>()
            .map_err(|e| SettingsError::invalid("temperature", &self.temperature, e.to_string()))?;
        let chunk_size = self
            .chunk_size
            .trim()
            .parse::<u32>()
            .map_err(|e| SettingsError::invalid("chunk size", &self.chunk_size, e.to_string()))?;

        let settings = GenerationSettings {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model_name: self.model_name.clone(),
            temperature,
            chunk_size,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the settings surface shows, with the API key masked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSnapshot {
    #[serde(flatten)]
    pub settings: GenerationSettings,
    pub theme: Theme,
}

/// Sole reader and writer of persisted settings.
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.db.get_setting(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read setting, using default");
                None
            }
        }
    }

    fn read_number<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.read(key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, "Stored setting is not a number, using default");
                default
            }),
            None => default,
        }
    }

    /// Read the generation settings. Missing or unreadable fields take their defaults.
    pub fn load(&self) -> GenerationSettings {
        GenerationSettings {
            api_key: self.read(KEY_API_KEY).unwrap_or_default(),
            base_url: self.read(KEY_BASE_URL).unwrap_or_default(),
            model_name: self.read(KEY_MODEL_NAME).unwrap_or_default(),
            temperature: self.read_number(KEY_TEMPERATURE, DEFAULT_TEMPERATURE),
            chunk_size: self.read_number(KEY_CHUNK_SIZE, DEFAULT_CHUNK_SIZE),
        }
    }

    /// Persist all five generation fields, or none of them.
    pub fn save(&self, settings: &GenerationSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.db.set_settings(&settings.entries())?;
        tracing::info!(
            model = %settings.model_name,
            temperature = settings.temperature,
            chunk_size = settings.chunk_size,
            "Saved generation settings"
        );
        Ok(())
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        let mut settings = self.load();
        settings.api_key = settings.masked_api_key();
        SettingsSnapshot {
            settings,
            theme: self.load_theme(),
        }
    }

    pub fn load_theme(&self) -> Theme {
        match self.read(KEY_THEME).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), SettingsError> {
        self.db.set_setting(KEY_THEME, theme.as_str())?;
        Ok(())
    }

    /// Flip between light and dark, persisting the new value immediately.
    pub fn toggle_theme(&self) -> Result<Theme, SettingsError> {
        let theme = self.load_theme().toggled();
        self.set_theme(theme)?;
        tracing::debug!(theme = %theme, "Theme toggled");
        Ok(theme)
    }
}

/// The settings surface: a transient draft loaded on open and written on save.
pub struct SettingsPanel<'a> {
    store: &'a SettingsStore,
    draft: Option<SettingsDraft>,
}

impl<'a> SettingsPanel<'a> {
    pub fn new(store: &'a SettingsStore) -> Self {
        Self { store, draft: None }
    }

    /// Load persisted values into a fresh draft, discarding unsaved edits.
    pub fn open(&mut self) -> &mut SettingsDraft {
        let loaded = SettingsDraft::from(&self.store.load());
        self.draft.insert(loaded)
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&SettingsDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut SettingsDraft> {
        self.draft.as_mut()
    }

    /// Validate and persist the draft. Closes the panel on success; on failure
    /// the panel stays open with the edits intact. Saving a closed panel is a no-op.
    pub fn save(&mut self) -> Result<Option<GenerationSettings>, SettingsError> {
        let Some(draft) = self.draft.as_ref() else {
            return Ok(None);
        };
        let settings = draft.parse()?;
        self.store.save(&settings)?;
        self.draft = None;
        Ok(Some(settings))
    }

    pub fn close(&mut self) {
        self.draft = None;
    }
}
