//! Configuration system
//!
//! Settings are plain serde structs that load from `.toml` or `.ron` files.
//! Every field has a default so partial files are accepted.

pub use serde::{Serialize, Deserialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => Self::from_toml_str(&contents),
            ConfigFormat::Ron => Self::from_ron_str(&contents),
        }
    }

    /// Save configuration to file
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => self.to_toml_string()?,
            ConfigFormat::Ron => self.to_ron_string()?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse from TOML text
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse from RON text
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize to TOML text
    fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Serialize to RON text
    fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Window settings for the demo frame loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width in screen coordinates
    pub width: u32,
    /// Window height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Instanced Models".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Settings for the model repository and the scene it is filled with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Number of transform slots in the shared dynamic uniform buffer
    pub transform_capacity: u32,
    /// OBJ file to import; a built-in triangle is used when absent
    pub model_path: Option<String>,
    /// Instances spawned per registered resource
    pub instances_per_resource: u32,
    /// Spacing between spawned instances along the x axis
    pub instance_spacing: f32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            transform_capacity: 256,
            model_path: None,
            instances_per_resource: 16,
            instance_spacing: 2.5,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application name reported to the Vulkan driver
    pub app_name: String,
    /// Enable Vulkan validation layers (debug builds only)
    pub enable_validation: bool,
    /// Window settings
    pub window: WindowConfig,
    /// Repository settings
    pub repository: RepositoryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "instancing_demo".to_string(),
            enable_validation: cfg!(debug_assertions),
            window: WindowConfig::default(),
            repository: RepositoryConfig::default(),
        }
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            "app_name = \"asteroids\"\n[repository]\ntransform_capacity = 8\n",
        )
        .expect("valid toml");

        assert_eq!(config.app_name, "asteroids");
        assert_eq!(config.repository.transform_capacity, 8);
        assert_eq!(config.repository.instances_per_resource, 16);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn test_toml_and_ron_round_trip() {
        let mut config = EngineConfig::default();
        config.repository.model_path = Some("models/teapot.obj".to_string());
        config.window.width = 640;

        let toml_text = config.to_toml_string().expect("toml serialize");
        assert_eq!(EngineConfig::from_toml_str(&toml_text).expect("toml parse"), config);

        let ron_text = config.to_ron_string().expect("ron serialize");
        assert_eq!(EngineConfig::from_ron_str(&ron_text).expect("ron parse"), config);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = EngineConfig::load_from_file("settings.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir()
            .join(format!("instanced_engine_config_{}.toml", std::process::id()));
        let config = EngineConfig::default();

        config.save_to_file(&path).expect("save");
        let loaded = EngineConfig::load_from_file(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
