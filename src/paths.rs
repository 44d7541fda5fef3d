// Filesystem path utilities.
// Locates the config file and the log file in the platform's project directories.

use std::path::PathBuf;

use directories::ProjectDirs;

const APP_NAME: &str = "holocron";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the config directory (~/.config/holocron on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the cache directory (~/.cache/holocron on Linux). Holds logs only.
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the configuration file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the log file.
pub fn log_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(format!("{}.log", APP_NAME)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        // These tests verify path construction, not actual filesystem
        if let Some(config) = config_path() {
            assert!(config.ends_with("config.toml"));
        }
        if let Some(log) = log_path() {
            assert!(log.ends_with("holocron.log"));
        }
    }
}
