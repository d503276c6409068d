pub mod database;

pub use database::{Database, LeaderboardPost, Member, MemberId, ProgressSnapshot};

use std::path::PathBuf;

/// Returns `~/.config/quitboard[-dev]/` based on QUITBOARD_ENV.
///
/// Set QUITBOARD_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUITBOARD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("quitboard-dev")
    } else {
        base_dir.join("quitboard")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
