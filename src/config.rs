//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\cover-minder\config.toml
//! - macOS: ~/Library/Application Support/cover-minder/config.toml
//! - Linux: ~/.config/cover-minder/config.toml
//!
//! The config file is human-readable and editable. Every section and key is
//! optional; missing values take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::providers::ProviderId;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where accepted images go
    pub saving: SavingConfig,

    /// Provider order and enable flags
    pub providers: ProvidersConfig,

    /// Local file provider
    pub local: LocalConfig,

    /// Cover Art Archive providers
    pub caa: CaaConfig,

    /// Candidate filters
    pub filters: FiltersConfig,

    /// Resize/convert per save target
    pub processing: ProcessingConfig,

    /// HTTP settings
    pub network: NetworkConfig,

    /// Temporary image storage
    pub storage: StorageConfig,
}

/// Image saving settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingConfig {
    /// Embed images in file tags
    pub save_images_to_tags: bool,

    /// Write images as separate files next to the audio files
    pub save_images_to_files: bool,

    /// Embed only the first front image
    pub embed_only_one_front_image: bool,

    /// Stop collecting archive images after the first front image
    pub save_only_one_front_image: bool,

    /// Name non-front images after their type
    pub image_type_as_filename: bool,

    /// Filename template, without extension
    pub cover_image_filename: String,

    /// Replace existing files instead of numbering new ones
    pub save_images_overwrite: bool,
}

impl Default for SavingConfig {
    fn default() -> Self {
        Self {
            save_images_to_tags: true,
            save_images_to_files: false,
            embed_only_one_front_image: true,
            save_only_one_front_image: false,
            image_type_as_filename: false,
            cover_image_filename: "cover".to_string(),
            save_images_overwrite: false,
        }
    }
}

impl SavingConfig {
    /// Whether cover art is wanted at all.
    pub fn enabled(&self) -> bool {
        self.save_images_to_tags || self.save_images_to_files
    }
}

/// Provider chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Providers in priority order
    pub order: Vec<ProviderId>,

    pub use_local: bool,
    pub use_caa: bool,
    pub use_caa_release_group: bool,
    pub use_url_relationships: bool,
    pub use_whitelist: bool,
    pub use_amazon: bool,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: ProviderId::ALL.to_vec(),
            use_local: true,
            use_caa: true,
            use_caa_release_group: true,
            use_url_relationships: true,
            use_whitelist: true,
            use_amazon: false,
        }
    }
}

impl ProvidersConfig {
    pub fn is_enabled(&self, id: ProviderId) -> bool {
        match id {
            ProviderId::Local => self.use_local,
            ProviderId::Caa => self.use_caa,
            ProviderId::CaaReleaseGroup => self.use_caa_release_group,
            ProviderId::UrlRelationships => self.use_url_relationships,
            ProviderId::Whitelist => self.use_whitelist,
            ProviderId::Amazon => self.use_amazon,
        }
    }
}

/// Local file provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Case-insensitive pattern for image file names. The first capture
    /// group, if any, is scanned for type names.
    pub cover_regex: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            cover_regex: r"^(?:cover|folder|albumart)(.*)\.(?:jpe?g|png|gif|tiff?|webp)$".to_string(),
        }
    }
}

/// Cover Art Archive settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaaConfig {
    /// Only use images approved by the archive's editors
    pub approved_only: bool,

    /// Preferred thumbnail size: 250, 500, 1200 or -1 for the full image
    pub image_size: i32,

    /// Only accept the types listed in `image_types`
    pub restrict_image_types: bool,

    pub image_types: Vec<String>,

    /// Types that veto an image even if it also has a wanted type
    pub image_types_to_omit: Vec<String>,

    pub base_url: String,
}

impl Default for CaaConfig {
    fn default() -> Self {
        Self {
            approved_only: false,
            image_size: 500,
            restrict_image_types: true,
            image_types: vec!["front".to_string()],
            image_types_to_omit: vec!["raw/unedited".to_string(), "watermark".to_string()],
            base_url: "https://coverartarchive.org".to_string(),
        }
    }
}

/// Candidate filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Reject images smaller than the minimum dimensions
    pub filter_by_size: bool,
    pub minimum_width: u32,
    pub minimum_height: u32,

    /// Keep already embedded images that are larger
    pub dont_replace_with_smaller: bool,

    /// Keep already embedded images of the `never_replace_types`
    pub dont_replace_included_types: bool,
    pub never_replace_types: Vec<String>,

    /// Types that may replace an existing image regardless
    pub always_replace_types: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            filter_by_size: false,
            minimum_width: 250,
            minimum_height: 250,
            dont_replace_with_smaller: false,
            dont_replace_included_types: false,
            never_replace_types: vec!["front".to_string()],
            always_replace_types: Vec::new(),
        }
    }
}

/// Processing settings for both save targets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Images embedded in tags
    pub tags: TargetProcessing,

    /// Images written as files
    pub file: TargetProcessing,
}

/// Output image format for conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertFormat {
    Jpeg,
    Png,
    Gif,
}

/// Processing settings for one save target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetProcessing {
    /// Scale down images exceeding the maximum dimensions
    pub resize: bool,
    pub max_width: u32,
    pub max_height: u32,

    /// Re-encode into `convert_to`
    pub convert: bool,
    pub convert_to: ConvertFormat,
}

impl Default for TargetProcessing {
    fn default() -> Self {
        Self {
            resize: false,
            max_width: 500,
            max_height: 500,
            convert: false,
            convert_to: ConvertFormat::Jpeg,
        }
    }
}

impl TargetProcessing {
    pub fn is_active(&self) -> bool {
        self.resize || self.convert
    }
}

/// HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub user_agent: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("cover-minder/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

/// Temporary storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for downloaded image data (system temp dir if unset)
    pub temp_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cover-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, with the same fallbacks as [`load`].
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[saving]"));
        assert!(toml.contains("[providers]"));
        assert!(toml.contains("[caa]"));
        assert!(toml.contains("[filters]"));
        assert!(toml.contains("[processing.tags]"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.saving.save_images_to_tags);
        assert!(!config.saving.save_images_to_files);
        assert!(config.saving.embed_only_one_front_image);
        assert_eq!(config.caa.image_size, 500);
        assert_eq!(config.caa.image_types, vec!["front"]);
        assert_eq!(config.providers.order, ProviderId::ALL.to_vec());
        assert!(!config.providers.is_enabled(ProviderId::Amazon));
        assert!(config.providers.is_enabled(ProviderId::Caa));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.saving.save_images_to_files = true;
        config.caa.image_size = -1;
        config.providers.order = vec![ProviderId::Caa, ProviderId::Local];
        config.processing.file.convert_to = ConvertFormat::Png;

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert!(parsed.saving.save_images_to_files);
        assert_eq!(parsed.caa.image_size, -1);
        assert_eq!(parsed.providers.order, vec![ProviderId::Caa, ProviderId::Local]);
        assert_eq!(parsed.processing.file.convert_to, ConvertFormat::Png);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[saving]
save_images_to_files = true

[providers]
order = ["caa_release_group", "amazon"]
"#;
        let config: Config = toml::from_str(toml).unwrap();

        // Specified fields are set
        assert!(config.saving.save_images_to_files);
        assert_eq!(
            config.providers.order,
            vec![ProviderId::CaaReleaseGroup, ProviderId::Amazon]
        );

        // Other fields use defaults
        assert!(config.saving.save_images_to_tags);
        assert_eq!(config.saving.cover_image_filename, "cover");
        assert_eq!(config.filters.minimum_width, 250);
        assert_eq!(config.network.timeout_secs, 30);
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.filters.filter_by_size = true;
        save_to(&config, &path).unwrap();

        let loaded = load_from(&path);
        assert!(loaded.filters.filter_by_size);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_load_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let config = load_from(&path);
        assert_eq!(config.caa.image_size, 500);
    }

    #[test]
    fn test_saving_enabled() {
        let mut saving = SavingConfig::default();
        assert!(saving.enabled());
        saving.save_images_to_tags = false;
        assert!(!saving.enabled());
    }
}
