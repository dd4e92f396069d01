use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "guessr";
const DB_FILE: &str = "scores.db";
const CONFIG_FILE: &str = "config.json";

/// Where guessr keeps its leaderboard and remembered setup.
///
/// Scores go to the XDG state dir under $HOME when HOME is set, preferences to
/// the platform config dir. Without a home, both land in the working directory.
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn state_dir() -> Option<PathBuf> {
        match std::env::var_os("HOME") {
            Some(home) => Some(state_dir_in(Path::new(&home))),
            None => Self::project().map(|pd| pd.data_local_dir().to_path_buf()),
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join(DB_FILE))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project().map(|pd| pd.config_dir().join(CONFIG_FILE))
    }

    pub fn db_path_or_local() -> PathBuf {
        Self::db_path().unwrap_or_else(|| PathBuf::from(format!("{}_{}", APP_NAME, DB_FILE)))
    }

    pub fn config_path_or_local() -> PathBuf {
        Self::config_path().unwrap_or_else(|| PathBuf::from(format!("{}_{}", APP_NAME, CONFIG_FILE)))
    }
}

fn state_dir_in(home: &Path) -> PathBuf {
    home.join(".local").join("state").join(APP_NAME)
}
