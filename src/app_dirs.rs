use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub const LOG_FILE: &'static str = "cubik.log";

    /// `$HOME/.local/state/cubik`, or the platform data-local dir.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("cubik"))
        } else {
            ProjectDirs::from("", "", "cubik").map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }
}
