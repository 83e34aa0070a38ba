use std::path::PathBuf;
use std::fs;
use crate::common::error::Result;

#[derive(Debug, Clone)]
pub struct DevMode {
    enabled: bool,
    base_dir: PathBuf,
}

impl DevMode {
    pub fn new(enabled: bool) -> Result<Self> {
        Self::with_base_dir(enabled, PathBuf::from("./dev_data"))
    }

    pub fn with_base_dir(enabled: bool, base_dir: PathBuf) -> Result<Self> {
        if enabled {
            fs::create_dir_all(base_dir.join("captures"))?;
            tracing::info!(
                "Development mode enabled - captures will be saved to: {}",
                base_dir.join("captures").display()
            );
        }

        Ok(Self { enabled, base_dir })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn captures_dir(&self) -> Option<PathBuf> {
        self.enabled.then(|| self.base_dir.join("captures"))
    }

    /// Timestamped JPEG path for a capture, or `None` outside dev mode.
    pub fn capture_path(&self, prefix: &str) -> Option<PathBuf> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
        self.captures_dir()
            .map(|dir| dir.join(format!("{}_{}.jpg", prefix, timestamp)))
    }

    /// Write JPEG bytes under a timestamped name. No-op outside dev mode.
    pub fn save(&self, prefix: &str, jpeg: &[u8]) -> Result<Option<PathBuf>> {
        let Some(path) = self.capture_path(prefix) else {
            return Ok(None);
        };
        fs::write(&path, jpeg)?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), jpeg.len());
        Ok(Some(path))
    }
}
