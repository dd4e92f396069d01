use thiserror::Error;

/// Everything that can go wrong at an interaction boundary.
///
/// None of these are fatal: the caller reports them and keeps the game going.
#[derive(Debug, Error)]
pub enum Error {
    /// Setup was rejected; the player has to submit the form again.
    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),

    /// The guess lies outside the configured range. No attempt is consumed.
    #[error("guess {guess} is outside the range {min}..={max}")]
    OutOfRange { guess: u32, min: u32, max: u32 },

    #[error("no hint available: already used or the game is not in progress")]
    HintUnavailable,

    #[error("the game is over, restart to play again")]
    GameFinished,

    /// Restart is only offered once the current game is won or lost.
    #[error("finish the current game before restarting")]
    GameInProgress,

    #[error("no game has been started for this session")]
    NoSession,

    #[error("score store failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
