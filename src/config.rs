use crate::constants::{DEFAULT_CHAT_URL, DEFAULT_MODEL};
use crate::error::TaggerError;
use crate::models::TagCategory;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub files: FileTaggingConfig,
    #[serde(default)]
    pub folders: FolderTaggingConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
    /// Lower the default log level to debug
    #[serde(default)]
    pub debug_log: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_chat_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_chat_url() -> String {
    DEFAULT_CHAT_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            url: default_chat_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTaggingConfig {
    #[serde(default = "default_true")]
    pub label_types: bool,
    #[serde(default = "default_true")]
    pub label_genres: bool,
    #[serde(default = "default_true")]
    pub label_objects: bool,
    #[serde(default = "default_objects_min")]
    pub objects_min: u32,
    #[serde(default = "default_objects_max")]
    pub objects_max: u32,
    #[serde(default = "default_images_per_request")]
    pub images_per_request: usize,
    /// Preview generations allowed in flight at once
    #[serde(default = "default_preview_window")]
    pub preview_window: usize,
    #[serde(default = "default_max_preview_dimension")]
    pub max_preview_dimension: u32,
    #[serde(default)]
    pub skip_existing: bool,
}

fn default_true() -> bool {
    true
}

fn default_objects_min() -> u32 {
    1
}

fn default_objects_max() -> u32 {
    5
}

fn default_images_per_request() -> usize {
    10
}

fn default_preview_window() -> usize {
    10
}

fn default_max_preview_dimension() -> u32 {
    128
}

impl Default for FileTaggingConfig {
    fn default() -> Self {
        Self {
            label_types: true,
            label_genres: true,
            label_objects: true,
            objects_min: default_objects_min(),
            objects_max: default_objects_max(),
            images_per_request: default_images_per_request(),
            preview_window: default_preview_window(),
            max_preview_dimension: default_max_preview_dimension(),
            skip_existing: false,
        }
    }
}

impl FileTaggingConfig {
    /// Enabled file categories in request order
    pub fn categories(&self) -> Vec<TagCategory> {
        TagCategory::FILE
            .into_iter()
            .filter(|category| match category {
                TagCategory::Types => self.label_types,
                TagCategory::Genres => self.label_genres,
                TagCategory::Objects => self.label_objects,
                TagCategory::Engines => false,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderTaggingConfig {
    #[serde(default = "default_true")]
    pub use_engines: bool,
    #[serde(default = "default_true")]
    pub use_types: bool,
    #[serde(default = "default_true")]
    pub use_genres: bool,
}

impl Default for FolderTaggingConfig {
    fn default() -> Self {
        Self {
            use_engines: true,
            use_types: true,
            use_genres: true,
        }
    }
}

impl FolderTaggingConfig {
    /// Enabled folder categories in answer order
    pub fn categories(&self) -> Vec<TagCategory> {
        TagCategory::FOLDER
            .into_iter()
            .filter(|category| match category {
                TagCategory::Engines => self.use_engines,
                TagCategory::Types => self.use_types,
                TagCategory::Genres => self.use_genres,
                TagCategory::Objects => false,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_input_token_price")]
    pub input_token_price: f64,
    #[serde(default = "default_input_pixel_price")]
    pub input_pixel_price: f64,
    #[serde(default = "default_output_token_price")]
    pub output_token_price: f64,
    #[serde(default = "default_output_tokens")]
    pub output_tokens_per_image: usize,
    #[serde(default = "default_output_tokens")]
    pub output_tokens_per_folder: usize,
}

fn default_input_token_price() -> f64 {
    0.000_000_15
}

fn default_input_pixel_price() -> f64 {
    // $0.00765 per million pixels
    0.00765 / 1_000_000.0
}

fn default_output_token_price() -> f64 {
    0.000_000_16
}

fn default_output_tokens() -> usize {
    100
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_token_price: default_input_token_price(),
            input_pixel_price: default_input_pixel_price(),
            output_token_price: default_output_token_price(),
            output_tokens_per_image: default_output_tokens(),
            output_tokens_per_folder: default_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "~/.local/share/asset-tagger/attributes.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Directory holding previews the host already rendered
    #[serde(default)]
    pub existing_dir: Option<String>,
    #[serde(default = "default_render_size")]
    pub render_size: u32,
}

fn default_render_size() -> u32 {
    512
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            existing_dir: None,
            render_size: default_render_size(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from default location or return defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "config/settings.toml",
            "./config/settings.toml",
            "~/.config/asset-tagger/settings.toml",
        ];

        for path in default_paths.iter().map(|p| expand_path(p)) {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// API key from config or the OPENAI_API_KEY environment variable
    pub fn api_key(&self) -> std::result::Result<String, TaggerError> {
        self.openai
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                TaggerError::Configuration(
                    "no API key set, add openai.api_key to settings.toml or export OPENAI_API_KEY"
                        .to_string(),
                )
            })
    }

    /// Enabled file categories, failing when none is selected
    pub fn file_categories(&self) -> std::result::Result<Vec<TagCategory>, TaggerError> {
        let categories = self.files.categories();
        if categories.is_empty() {
            return Err(TaggerError::Configuration(
                "no file tag category enabled".to_string(),
            ));
        }
        Ok(categories)
    }

    /// Enabled folder categories, failing when none is selected
    pub fn folder_categories(&self) -> std::result::Result<Vec<TagCategory>, TaggerError> {
        let categories = self.folders.categories();
        if categories.is_empty() {
            return Err(TaggerError::Configuration(
                "no folder tag category enabled".to_string(),
            ));
        }
        Ok(categories)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            files: FileTaggingConfig::default(),
            folders: FolderTaggingConfig::default(),
            pricing: PricingConfig::default(),
            store: StoreConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            debug_log: false,
        }
    }
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.files.images_per_request, 10);
        assert_eq!(config.files.preview_window, 10);
        assert_eq!(config.files.max_preview_dimension, 128);
        assert_eq!(config.pricing.output_tokens_per_image, 100);
        assert_eq!(
            config.files.categories(),
            vec![TagCategory::Types, TagCategory::Genres, TagCategory::Objects]
        );
    }

    #[test]
    fn test_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
debug_log = true

[openai]
api_key = "sk-test"
model = "gpt-4o"

[files]
label_genres = false
images_per_request = 4

[folders]
use_engines = false
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.debug_log);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.url, DEFAULT_CHAT_URL);
        assert_eq!(config.files.images_per_request, 4);
        assert_eq!(
            config.files.categories(),
            vec![TagCategory::Types, TagCategory::Objects]
        );
        assert_eq!(
            config.folders.categories(),
            vec![TagCategory::Types, TagCategory::Genres]
        );
        assert_eq!(config.api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_blank_api_key_is_configuration_error() {
        let mut config = Config::default();
        config.openai.api_key = Some("   ".to_string());
        // Blank config key falls through to the environment, which may be set on a dev machine
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(config.api_key(), Err(TaggerError::Configuration(_))));
        }
    }

    #[test]
    fn test_no_file_categories_is_configuration_error() {
        let mut config = Config::default();
        config.files.label_types = false;
        config.files.label_genres = false;
        config.files.label_objects = false;
        assert!(matches!(
            config.file_categories(),
            Err(TaggerError::Configuration(_))
        ));
    }
}
