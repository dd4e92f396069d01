use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::scores::{ScoreEntry, ScoreStore};
use crate::session::{ActiveGame, GameSession, SessionKey, SessionStore, Status};

/// Half-width of the window a hint reveals around the secret
pub const HINT_RADIUS: u32 = 5;

/// Result of one guess.
///
/// `GuessHigher` and `GuessLower` are the "too low" and "too high" hints,
/// named after what the player should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct { attempts_used: u32 },
    Exhausted { secret: u32 },
    /// The guess was below the secret
    GuessHigher,
    /// The guess was above the secret
    GuessLower,
}

impl Outcome {
    pub fn ends_game(&self) -> bool {
        matches!(self, Outcome::Correct { .. } | Outcome::Exhausted { .. })
    }
}

/// Reveal a window of at most `2 * HINT_RADIUS` around the secret, once per game.
pub fn request_hint(session: &mut GameSession, config: &GameConfig) -> Result<(u32, u32)> {
    if session.status != Status::InProgress || session.hint_used {
        return Err(Error::HintUnavailable);
    }
    let lower = session.secret.saturating_sub(HINT_RADIUS).max(config.min);
    let upper = session.secret.saturating_add(HINT_RADIUS).min(config.max);
    session.hint_used = true;
    session.hint = Some((lower, upper));
    log::trace!("hint issued: {}..={}", lower, upper);
    Ok((lower, upper))
}

pub fn submit_guess(session: &mut GameSession, config: &GameConfig, guess: u32) -> Result<Outcome> {
    if session.status != Status::InProgress {
        return Err(Error::GameFinished);
    }
    if !config.contains(guess) {
        return Err(Error::OutOfRange {
            guess,
            min: config.min,
            max: config.max,
        });
    }

    session.attempts_used += 1;

    // A hit on the last attempt is still a win.
    let outcome = if guess == session.secret {
        session.status = Status::Won;
        log::info!(
            "{} won in {} attempts",
            config.player_name,
            session.attempts_used
        );
        Outcome::Correct {
            attempts_used: session.attempts_used,
        }
    } else if session.attempts_used >= config.max_attempts {
        session.status = Status::Lost;
        log::info!("{} ran out of attempts", config.player_name);
        Outcome::Exhausted {
            secret: session.secret,
        }
    } else if guess < session.secret {
        Outcome::GuessHigher
    } else {
        Outcome::GuessLower
    };

    session.last_outcome = Some(outcome);
    Ok(outcome)
}

/// Put a won game on the leaderboard. Games that were not won record nothing.
///
/// Callers invoke this once, on the transition into `Won`.
pub fn finish_and_score<P: ScoreStore + ?Sized>(
    session: &GameSession,
    config: &GameConfig,
    scores: &P,
) -> Result<Option<ScoreEntry>> {
    if session.status != Status::Won {
        return Ok(None);
    }
    scores
        .record(&config.player_name, session.attempts_used)
        .map(Some)
}

/// Drop a finished game under `key` and hand back the configuration to start the next one with.
pub fn restart<S: SessionStore + ?Sized>(store: &mut S, key: &SessionKey) -> Result<GameConfig> {
    match store.status(key) {
        Status::Setup => Err(Error::NoSession),
        Status::InProgress => Err(Error::GameInProgress),
        Status::Won | Status::Lost => store.clear(key).ok_or(Error::NoSession),
    }
}

/// What the presentation layer gets back after a guess
#[derive(Debug)]
pub struct GuessReport {
    pub outcome: Outcome,
    pub attempts_used: u32,
    pub attempts_left: u32,
    /// Leaderboard entry written for a win
    pub score: Option<ScoreEntry>,
    /// Set when a win could not be persisted; the win itself stands.
    pub score_warning: Option<Error>,
}

/// Request/response handlers for every player interaction
pub struct Game<S: SessionStore, P: ScoreStore> {
    sessions: S,
    scores: P,
}

impl<S: SessionStore, P: ScoreStore> Game<S, P> {
    pub fn new(sessions: S, scores: P) -> Self {
        Self { sessions, scores }
    }

    pub fn start(&mut self, key: &SessionKey, config: GameConfig) -> Result<&GameSession> {
        self.sessions.create(key, config)
    }

    pub fn guess(&mut self, key: &SessionKey, guess: u32) -> Result<GuessReport> {
        let game = self.sessions.get_mut(key).ok_or(Error::NoSession)?;
        let outcome = submit_guess(&mut game.session, &game.config, guess)?;

        let mut report = GuessReport {
            outcome,
            attempts_used: game.session.attempts_used,
            attempts_left: game.session.attempts_left(&game.config),
            score: None,
            score_warning: None,
        };

        if let Outcome::Correct { .. } = outcome {
            match finish_and_score(&game.session, &game.config, &self.scores) {
                Ok(entry) => report.score = entry,
                Err(e) => {
                    log::warn!("session {}: could not record score: {}", key, e);
                    report.score_warning = Some(e);
                }
            }
        }

        Ok(report)
    }

    pub fn hint(&mut self, key: &SessionKey) -> Result<(u32, u32)> {
        let game = self.sessions.get_mut(key).ok_or(Error::NoSession)?;
        request_hint(&mut game.session, &game.config)
    }

    /// Start over with the same range, difficulty and player.
    pub fn restart(&mut self, key: &SessionKey) -> Result<&GameSession> {
        let config = restart(&mut self.sessions, key)?;
        self.sessions.create(key, config)
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<ScoreEntry>> {
        self.scores.top(limit)
    }

    pub fn game(&self, key: &SessionKey) -> Option<&ActiveGame> {
        self.sessions.get(key)
    }

    pub fn status(&self, key: &SessionKey) -> Status {
        self.sessions.status(key)
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn scores(&self) -> &P {
        &self.scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::scores::MemoryScoreStore;
    use crate::session::InMemorySessionStore;
    use assert_matches::assert_matches;

    fn config(max_attempts: u32) -> GameConfig {
        GameConfig::with_attempts("Ann", 1, 100, max_attempts).unwrap()
    }

    fn session(cfg: &GameConfig, secret: u32) -> GameSession {
        GameSession::with_secret(cfg, secret).unwrap()
    }

    struct FailingScores;

    impl ScoreStore for FailingScores {
        fn record(&self, _: &str, _: u32) -> Result<ScoreEntry> {
            Err(Error::Persistence(rusqlite::Error::QueryReturnedNoRows))
        }

        fn top(&self, _: usize) -> Result<Vec<ScoreEntry>> {
            Err(Error::Persistence(rusqlite::Error::QueryReturnedNoRows))
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn guess_below_secret_asks_for_higher() {
        let cfg = config(3);
        let mut s = session(&cfg, 50);
        assert_eq!(submit_guess(&mut s, &cfg, 10).unwrap(), Outcome::GuessHigher);
        assert_eq!(submit_guess(&mut s, &cfg, 90).unwrap(), Outcome::GuessLower);
        assert_eq!(s.status(), Status::InProgress);
        assert_eq!(s.attempts_used(), 2);
    }

    #[test]
    fn correct_guess_on_last_attempt_wins() {
        let cfg = config(3);
        let mut s = session(&cfg, 50);
        submit_guess(&mut s, &cfg, 10).unwrap();
        submit_guess(&mut s, &cfg, 90).unwrap();
        assert_eq!(
            submit_guess(&mut s, &cfg, 50).unwrap(),
            Outcome::Correct { attempts_used: 3 }
        );
        assert_eq!(s.status(), Status::Won);
        assert_eq!(s.last_outcome(), Some(Outcome::Correct { attempts_used: 3 }));
    }

    #[test]
    fn wrong_guesses_exhaust_attempts() {
        let cfg = config(3);
        let mut s = session(&cfg, 50);
        submit_guess(&mut s, &cfg, 1).unwrap();
        submit_guess(&mut s, &cfg, 2).unwrap();
        assert_eq!(
            submit_guess(&mut s, &cfg, 3).unwrap(),
            Outcome::Exhausted { secret: 50 }
        );
        assert_eq!(s.status(), Status::Lost);
        assert_eq!(s.attempts_used(), cfg.max_attempts);
    }

    #[test]
    fn out_of_range_guess_consumes_no_attempt() {
        let cfg = config(3);
        let mut s = session(&cfg, 50);
        assert_matches!(
            submit_guess(&mut s, &cfg, 0),
            Err(Error::OutOfRange { guess: 0, min: 1, max: 100 })
        );
        assert_matches!(
            submit_guess(&mut s, &cfg, 101),
            Err(Error::OutOfRange { .. })
        );
        assert_eq!(s.attempts_used(), 0);
    }

    #[test]
    fn finished_games_reject_guesses() {
        let cfg = config(1);
        let mut s = session(&cfg, 50);
        submit_guess(&mut s, &cfg, 50).unwrap();
        assert_matches!(submit_guess(&mut s, &cfg, 50), Err(Error::GameFinished));
        assert_eq!(s.attempts_used(), 1);
    }

    #[test]
    fn hint_brackets_secret() {
        let cfg = config(3);
        let mut s = session(&cfg, 50);
        assert_eq!(request_hint(&mut s, &cfg).unwrap(), (45, 55));
        assert!(s.hint_used());
        assert_eq!(s.hint(), Some((45, 55)));
    }

    #[test]
    fn hint_is_clamped_to_range() {
        let cfg = config(3);
        let mut low = session(&cfg, 2);
        assert_eq!(request_hint(&mut low, &cfg).unwrap(), (1, 7));
        let mut high = session(&cfg, 98);
        assert_eq!(request_hint(&mut high, &cfg).unwrap(), (93, 100));
    }

    #[test]
    fn second_hint_is_unavailable() {
        let cfg = config(3);
        let mut s = session(&cfg, 50);
        request_hint(&mut s, &cfg).unwrap();
        assert_matches!(request_hint(&mut s, &cfg), Err(Error::HintUnavailable));
        assert!(s.hint_used());
        assert_eq!(s.hint(), Some((45, 55)));
    }

    #[test]
    fn hint_unavailable_after_game_ends() {
        let cfg = config(1);
        let mut s = session(&cfg, 50);
        submit_guess(&mut s, &cfg, 7).unwrap();
        assert_matches!(request_hint(&mut s, &cfg), Err(Error::HintUnavailable));
        assert!(!s.hint_used());
    }

    #[test]
    fn finish_and_score_only_records_wins() {
        let cfg = config(2);
        let scores = MemoryScoreStore::new();

        let mut lost = session(&cfg, 50);
        submit_guess(&mut lost, &cfg, 1).unwrap();
        submit_guess(&mut lost, &cfg, 2).unwrap();
        assert!(finish_and_score(&lost, &cfg, &scores).unwrap().is_none());

        let mut won = session(&cfg, 50);
        submit_guess(&mut won, &cfg, 50).unwrap();
        let entry = finish_and_score(&won, &cfg, &scores).unwrap().unwrap();
        assert_eq!((entry.player_name.as_str(), entry.attempts), ("Ann", 1));
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn game_records_win_once() {
        let key = SessionKey::from("ann");
        let mut store = InMemorySessionStore::seeded(5);
        let cfg = config(3);
        store.insert(&key, cfg.clone(), session(&cfg, 50));
        let mut game = Game::new(store, MemoryScoreStore::new());

        let report = game.guess(&key, 50).unwrap();
        assert_eq!(report.outcome, Outcome::Correct { attempts_used: 1 });
        assert_eq!(report.attempts_left, 2);
        assert!(report.score.is_some());
        assert!(report.score_warning.is_none());

        assert_matches!(game.guess(&key, 50), Err(Error::GameFinished));
        assert_eq!(game.scores().len(), 1);
    }

    #[test]
    fn persistence_failure_does_not_undo_win() {
        let key = SessionKey::from("ann");
        let mut store = InMemorySessionStore::seeded(5);
        let cfg = config(3);
        store.insert(&key, cfg.clone(), session(&cfg, 50));
        let mut game = Game::new(store, FailingScores);

        let report = game.guess(&key, 50).unwrap();
        assert_eq!(report.outcome, Outcome::Correct { attempts_used: 1 });
        assert_matches!(report.score_warning, Some(Error::Persistence(_)));
        assert_eq!(game.status(&key), Status::Won);
        assert_matches!(game.leaderboard(5), Err(Error::Persistence(_)));
    }

    #[test]
    fn restart_keeps_config_and_resets_state() {
        let key = SessionKey::from("ann");
        let cfg = GameConfig::new("Ann", 20, 40, Difficulty::Hard).unwrap();
        let mut game = Game::new(InMemorySessionStore::seeded(11), MemoryScoreStore::new());
        game.start(&key, cfg.clone()).unwrap();
        game.hint(&key).unwrap();
        let secret = game.game(&key).unwrap().session.secret();
        let wrong = if secret == 20 { 21 } else { 20 };
        for _ in 0..3 {
            game.guess(&key, wrong).unwrap();
        }
        assert_eq!(game.status(&key), Status::Lost);

        let fresh = game.restart(&key).unwrap();
        assert_eq!(fresh.status(), Status::InProgress);
        assert_eq!(fresh.attempts_used(), 0);
        assert!(!fresh.hint_used());
        assert!(fresh.hint().is_none());
        assert_eq!(game.game(&key).unwrap().config, cfg);
        assert!(game.leaderboard(5).unwrap().is_empty());
    }

    #[test]
    fn interactions_without_session_fail() {
        let key = SessionKey::from("ghost");
        let mut game = Game::new(InMemorySessionStore::seeded(1), MemoryScoreStore::new());
        assert_matches!(game.guess(&key, 5), Err(Error::NoSession));
        assert_matches!(game.hint(&key), Err(Error::NoSession));
        assert_matches!(game.restart(&key), Err(Error::NoSession));
        assert_eq!(game.status(&key), Status::Setup);
    }

    #[test]
    fn restart_function_clears_finished_session() {
        let key = SessionKey::from("a");
        let mut store = InMemorySessionStore::seeded(2);
        let cfg = config(3);
        store.insert(&key, cfg.clone(), session(&cfg, 50));
        submit_guess(&mut store.get_mut(&key).unwrap().session, &cfg, 50).unwrap();

        assert_eq!(restart(&mut store, &key).unwrap(), cfg);
        assert_eq!(store.status(&key), Status::Setup);
    }

    #[test]
    fn restart_is_refused_while_in_progress() {
        let key = SessionKey::from("ann");
        let mut store = InMemorySessionStore::seeded(5);
        let cfg = config(3);
        store.insert(&key, cfg.clone(), session(&cfg, 70));
        let mut game = Game::new(store, MemoryScoreStore::new());

        game.hint(&key).unwrap();
        assert_matches!(game.restart(&key), Err(Error::GameInProgress));

        let active = game.game(&key).unwrap();
        assert_eq!(active.session.secret(), 70);
        assert!(active.session.hint_used());
        assert_eq!(active.session.status(), Status::InProgress);
        assert_matches!(game.hint(&key), Err(Error::HintUnavailable));
    }
}
