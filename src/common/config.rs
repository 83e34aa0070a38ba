use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::common::error::{ConsoleError, Result};
use crate::common::paths;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Unset means requests wait for the server indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_warmup_frames() -> u32 { 3 }
fn default_warmup_delay() -> u64 { 50 }
fn default_jpeg_quality() -> u8 { 92 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: default_width(),
            height: default_height(),
            warmup_frames: default_warmup_frames(),
            warmup_delay_ms: default_warmup_delay(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognitionConfig {
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    #[serde(default = "default_true")]
    pub show_details: bool,
}

fn default_confidence() -> u8 { 30 }
fn default_true() -> bool { true }

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            confidence: default_confidence(),
            show_details: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PreviewConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub width: Option<usize>,
    #[serde(default)]
    pub height: Option<usize>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: None,
            height: None,
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the first default location that exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        for candidate in paths::config_candidates() {
            if candidate.exists() {
                return Self::load_from_path(&candidate);
            }
        }

        tracing::debug!("No config file found, using built-in defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConsoleError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConsoleError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.server.base_url).is_err() {
            return Err(ConsoleError::Config(format!(
                "Server base_url is not a valid URL: {}", self.server.base_url
            )));
        }

        if self.camera.width == 0 || self.camera.width > 4096 {
            return Err(ConsoleError::Config(format!(
                "Camera width must be between 1 and 4096, got {}", self.camera.width
            )));
        }
        if self.camera.height == 0 || self.camera.height > 4096 {
            return Err(ConsoleError::Config(format!(
                "Camera height must be between 1 and 4096, got {}", self.camera.height
            )));
        }

        if self.camera.jpeg_quality == 0 || self.camera.jpeg_quality > 100 {
            return Err(ConsoleError::Config(format!(
                "JPEG quality must be between 1 and 100, got {}", self.camera.jpeg_quality
            )));
        }

        if self.recognition.confidence > 100 {
            return Err(ConsoleError::Config(format!(
                "Confidence threshold must be between 0 and 100, got {}",
                self.recognition.confidence
            )));
        }

        Ok(())
    }

    pub fn with_server_override(mut self, base_url: Option<String>) -> Result<Self> {
        if let Some(url) = base_url {
            self.server.base_url = url;
            self.validate()?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_capture_target() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert_eq!((config.camera.width, config.camera.height), (640, 480));
        assert_eq!(config.recognition.confidence, 30);
        assert!(config.recognition.show_details);
        assert!(config.server.request_timeout_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbase_url = \"http://10.0.0.5:5000\"\n\n[camera]\ndevice_index = 2").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.base_url, "http://10.0.0.5:5000");
        assert_eq!(config.camera.device_index, 2);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.camera.jpeg_quality, 92);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut config = Config::default();
        config.recognition.confidence = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_quality() {
        let mut config = Config::default();
        config.camera.jpeg_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_override_validates_url() {
        let config = Config::default()
            .with_server_override(Some("http://face.local:8080".into()))
            .unwrap();
        assert_eq!(config.server.base_url, "http://face.local:8080");

        assert!(Config::default()
            .with_server_override(Some("not a url".into()))
            .is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[camera\nwidth = ").unwrap();
        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Config parse error"));
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(paths::LOCAL_CONFIG_FILE);
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert!(config.preview.enabled);
    }
}
