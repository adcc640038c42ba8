//! Standard config-file locations, the way the teacher's `csa-config::paths`
//! resolves its own app directory via the `directories` crate.

use directories::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "";
const APPLICATION: &str = "xec";

/// `~/.config/xec` on Linux (or the platform equivalent).
pub fn default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// `~/.config/xec/config.toml` on Linux (or the platform equivalent).
pub fn config_file_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("config.toml"))
}
