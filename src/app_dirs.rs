use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// State directory under $HOME/.local/state/letterfall, with a
    /// platform-specific fallback when HOME is not set.
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("letterfall"),
            )
        } else {
            ProjectDirs::from("", "", "letterfall")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("keys.db"))
    }

    pub fn statistics_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("player_statistics.json"))
    }

    pub fn achievements_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("achievements.json"))
    }

    pub fn highscores_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("highscores.json"))
    }

    pub fn saved_games_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("saved_games.json"))
    }

    pub fn session_log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("sessions.csv"))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "letterfall")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
    }
}
