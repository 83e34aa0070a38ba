use directories::ProjectDirs;
use std::path::PathBuf;

pub const LOCAL_CONFIG_FILE: &str = "configs/face-console.toml";
pub const CONFIG_FILE_NAME: &str = "face-console.toml";

/// Config locations in lookup order: working directory first, then the per-user config dir.
pub fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dirs) = ProjectDirs::from("com", "faceconsole", "FaceConsole") {
        candidates.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    candidates
}
