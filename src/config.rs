use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const LOWEST_BOUND: u32 = 1;
pub const HIGHEST_BOUND: u32 = 1000;

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Number of guesses a game of this difficulty allows
    pub fn max_attempts(&self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 6,
            Difficulty::Hard => 3,
        }
    }
}

/// Settings fixed for the lifetime of one game session, restarts included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub min: u32,
    pub max: u32,
    pub max_attempts: u32,
    pub player_name: String,
}

impl GameConfig {
    pub fn new(player_name: &str, min: u32, max: u32, difficulty: Difficulty) -> Result<Self> {
        Self::with_attempts(player_name, min, max, difficulty.max_attempts())
    }

    pub fn with_attempts(player_name: &str, min: u32, max: u32, max_attempts: u32) -> Result<Self> {
        let cfg = Self {
            min,
            max,
            max_attempts,
            player_name: normalize_name(player_name),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min >= self.max {
            return Err(Error::InvalidConfig(format!(
                "min ({}) must be lower than max ({})",
                self.min, self.max
            )));
        }
        if self.min < LOWEST_BOUND || self.max > HIGHEST_BOUND {
            return Err(Error::InvalidConfig(format!(
                "range must lie within {}..={}",
                LOWEST_BOUND, HIGHEST_BOUND
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "at least one attempt is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Same config with the player name trimmed, blank names becoming `Player`
    pub fn normalized(mut self) -> Self {
        self.player_name = normalize_name(&self.player_name);
        self
    }

    pub fn contains(&self, n: u32) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last submitted setup form, remembered between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub player_name: String,
    pub min: u32,
    pub max: u32,
    pub difficulty: Difficulty,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            min: 1,
            max: 100,
            difficulty: Difficulty::Medium,
        }
    }
}

impl Preferences {
    pub fn to_game_config(&self) -> Result<GameConfig> {
        GameConfig::new(&self.player_name, self.min, self.max, self.difficulty)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Preferences;
    fn save(&self, prefs: &Preferences) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path_or_local(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Preferences {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Preferences>(&bytes) {
                Ok(prefs) => return prefs,
                Err(e) => log::warn!("ignoring unreadable preferences at {:?}: {}", self.path, e),
            }
        }
        Preferences::default()
    }

    fn save(&self, prefs: &Preferences) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(prefs)?;
        fs::write(&self.path, data)
    }
}
