use crate::config::GameConfig;
use crate::engine::Outcome;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier handed out by whatever hosts the game
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Status {
    Setup,
    InProgress,
    Won,
    Lost,
}

impl Status {
    pub fn is_finished(&self) -> bool {
        matches!(self, Status::Won | Status::Lost)
    }
}

/// Mutable state of one game
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub(crate) secret: u32,
    pub(crate) attempts_used: u32,
    pub(crate) hint_used: bool,
    pub(crate) status: Status,
    pub(crate) hint: Option<(u32, u32)>,
    pub(crate) last_outcome: Option<Outcome>,
}

impl GameSession {
    /// Start a game with a uniformly sampled secret.
    pub fn start<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let secret = rng.gen_range(config.min..=config.max);
        Ok(Self::fresh(secret))
    }

    /// Start a game with a known secret, e.g. to replay a recorded game.
    pub fn with_secret(config: &GameConfig, secret: u32) -> Result<Self> {
        config.validate()?;
        if !config.contains(secret) {
            return Err(Error::InvalidConfig(format!(
                "secret {} lies outside {}..={}",
                secret, config.min, config.max
            )));
        }
        Ok(Self::fresh(secret))
    }

    fn fresh(secret: u32) -> Self {
        Self {
            secret,
            attempts_used: 0,
            hint_used: false,
            status: Status::InProgress,
            hint: None,
            last_outcome: None,
        }
    }

    pub fn secret(&self) -> u32 {
        self.secret
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn attempts_left(&self, config: &GameConfig) -> u32 {
        config.max_attempts.saturating_sub(self.attempts_used)
    }

    pub fn hint_used(&self) -> bool {
        self.hint_used
    }

    /// Hint window shown to the player, if one was requested
    pub fn hint(&self) -> Option<(u32, u32)> {
        self.hint
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }
}

/// A live game together with the configuration it was started from
#[derive(Debug, Clone)]
pub struct ActiveGame {
    pub config: GameConfig,
    pub session: GameSession,
}

/// Holds at most one game per session key.
pub trait SessionStore {
    /// Start a new game under `key`, replacing whatever was there.
    fn create(&mut self, key: &SessionKey, config: GameConfig) -> Result<&GameSession>;

    fn get(&self, key: &SessionKey) -> Option<&ActiveGame>;

    fn get_mut(&mut self, key: &SessionKey) -> Option<&mut ActiveGame>;

    /// Drop the game under `key`, handing back its configuration.
    fn clear(&mut self, key: &SessionKey) -> Option<GameConfig>;

    fn status(&self, key: &SessionKey) -> Status {
        self.get(key)
            .map(|g| g.session.status())
            .unwrap_or(Status::Setup)
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    games: HashMap<SessionKey, ActiveGame>,
    rng: StdRng,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            games: HashMap::new(),
            rng,
        }
    }

    /// Put an already started game under `key`
    pub fn insert(&mut self, key: &SessionKey, config: GameConfig, session: GameSession) {
        let config = config.normalized();
        self.games
            .insert(key.clone(), ActiveGame { config, session });
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&mut self, key: &SessionKey, config: GameConfig) -> Result<&GameSession> {
        let session = GameSession::start(&config, &mut self.rng)?;
        log::debug!(
            "session {}: new game in {}..={} with {} attempts",
            key,
            config.min,
            config.max,
            config.max_attempts
        );
        self.insert(key, config, session);
        Ok(&self.games[key].session)
    }

    fn get(&self, key: &SessionKey) -> Option<&ActiveGame> {
        self.games.get(key)
    }

    fn get_mut(&mut self, key: &SessionKey) -> Option<&mut ActiveGame> {
        self.games.get_mut(key)
    }

    fn clear(&mut self, key: &SessionKey) -> Option<GameConfig> {
        self.games.remove(key).map(|g| g.config)
    }
}
