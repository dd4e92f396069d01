// Library surface shared by the terminal front end and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod scores;
pub mod session;

pub use config::{Difficulty, GameConfig};
pub use engine::{Game, GuessReport, Outcome};
pub use error::{Error, Result};
pub use scores::{MemoryScoreStore, ScoreEntry, ScoreStore, SqliteScoreStore};
pub use session::{GameSession, InMemorySessionStore, SessionKey, SessionStore, Status};
