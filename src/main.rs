use clap::{error::ErrorKind, CommandFactory, Parser};
use guessr::config::{ConfigStore, FileConfigStore, Preferences};
use guessr::{
    Difficulty, Error as GameError, Game, GameConfig, InMemorySessionStore, Outcome, ScoreStore,
    SessionKey, SqliteScoreStore,
};
use std::{
    error::Error,
    io::{self, BufRead, Write},
    path::PathBuf,
};

const LOCAL_SESSION: &str = "local";

/// number guessing game with hints and a persistent leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Guess the secret number within a limited number of attempts. One hint per game narrows it down; wins land on a leaderboard ranked by fewest attempts."
)]
pub struct Cli {
    /// name to put on the leaderboard (defaults to the last one used)
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// lowest possible secret number
    #[clap(long)]
    min: Option<u32>,

    /// highest possible secret number
    #[clap(long)]
    max: Option<u32>,

    /// attempts budget: easy = 10, medium = 6, hard = 3
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// seed for the secret number generator
    #[clap(long)]
    seed: Option<u64>,

    /// leaderboard database file
    #[clap(long)]
    db: Option<PathBuf>,

    /// number of leaderboard entries to show
    #[clap(short = 't', long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    top: u32,

    /// delete all leaderboard entries before playing
    #[clap(long)]
    reset_leaderboard: bool,

    /// do not remember this setup for the next run
    #[clap(long)]
    no_save: bool,
}

impl Cli {
    /// Overlay explicit arguments on the remembered setup
    fn to_preferences(&self, saved: Preferences) -> Preferences {
        Preferences {
            player_name: self.name.clone().unwrap_or(saved.player_name),
            min: self.min.unwrap_or(saved.min),
            max: self.max.unwrap_or(saved.max),
            difficulty: self.difficulty.unwrap_or(saved.difficulty),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Guess(u32),
    Hint,
    Restart,
    Top,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let cmd = match line.to_lowercase().as_str() {
            "h" | "hint" => Command::Hint,
            "r" | "restart" => Command::Restart,
            "t" | "top" | "leaderboard" => Command::Top,
            "?" | "help" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            other => match other.parse::<u32>() {
                Ok(n) => Command::Guess(n),
                Err(_) => Command::Unknown(line.to_string()),
            },
        };
        Some(cmd)
    }
}

pub struct App<P: ScoreStore> {
    game: Game<InMemorySessionStore, P>,
    key: SessionKey,
    top: usize,
}

impl<P: ScoreStore> App<P> {
    pub fn new(sessions: InMemorySessionStore, scores: P, top: usize) -> Self {
        Self {
            game: Game::new(sessions, scores),
            key: SessionKey::from(LOCAL_SESSION),
            top,
        }
    }

    fn start(&mut self, config: GameConfig) -> guessr::Result<()> {
        self.game.start(&self.key, config)?;
        Ok(())
    }

    fn config(&self) -> Option<&GameConfig> {
        self.game.game(&self.key).map(|g| &g.config)
    }

    fn write_intro<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(cfg) = self.config() {
            writeln!(out, "Welcome, {}!", cfg.player_name)?;
            writeln!(out, "Guess between {} and {}.", cfg.min, cfg.max)?;
            writeln!(out, "You have {} attempts.", cfg.max_attempts)?;
        }
        Ok(())
    }

    fn write_leaderboard<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.game.leaderboard(self.top) {
            Ok(entries) if entries.is_empty() => writeln!(out, "Leaderboard is empty."),
            Ok(entries) => {
                writeln!(out, "Leaderboard")?;
                for (i, entry) in entries.iter().enumerate() {
                    writeln!(
                        out,
                        "{}. {} - {} tries",
                        i + 1,
                        entry.player_name,
                        entry.attempts
                    )?;
                }
                Ok(())
            }
            Err(e) => writeln!(out, "warning: {}", e),
        }
    }

    fn on_guess<W: Write>(&mut self, n: u32, out: &mut W) -> io::Result<()> {
        let report = match self.game.guess(&self.key, n) {
            Ok(report) => report,
            Err(e) => return writeln!(out, "{}", e),
        };
        let max_attempts = self.config().map(|c| c.max_attempts).unwrap_or_default();

        match report.outcome {
            Outcome::Correct { attempts_used } => writeln!(
                out,
                "Correct! The number was {}. You got it in {} tries!",
                n, attempts_used
            )?,
            Outcome::Exhausted { secret } => {
                writeln!(out, "Out of attempts! The number was {}.", secret)?
            }
            Outcome::GuessHigher => writeln!(out, "Try a higher number.")?,
            Outcome::GuessLower => writeln!(out, "Try a lower number.")?,
        }
        writeln!(
            out,
            "Attempts used: {} / {}",
            report.attempts_used, max_attempts
        )?;

        if let Some(e) = report.score_warning {
            writeln!(out, "warning: score not saved: {}", e)?;
        }
        if report.outcome.ends_game() {
            if let Outcome::Correct { .. } = report.outcome {
                self.write_leaderboard(out)?;
            }
            writeln!(out, "Type 'restart' to play again or 'quit' to leave.")?;
        }
        Ok(())
    }

    fn on_hint<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        match self.game.hint(&self.key) {
            Ok((lower, upper)) => writeln!(out, "The number is between {} and {}.", lower, upper),
            Err(e) => writeln!(out, "{}", e),
        }
    }

    fn on_restart<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        match self.game.restart(&self.key) {
            Ok(_) => {
                writeln!(out, "New game started.")?;
                self.write_intro(out)
            }
            Err(e) => writeln!(out, "{}", e),
        }
    }

    /// Process one command per line until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        self.write_intro(out)?;
        writeln!(out, "Type a number to guess, 'hint', 'restart', 'top' or 'quit'.")?;

        for line in input.lines() {
            let Some(cmd) = Command::parse(&line?) else {
                continue;
            };
            match cmd {
                Command::Guess(n) => self.on_guess(n, out)?,
                Command::Hint => self.on_hint(out)?,
                Command::Restart => self.on_restart(out)?,
                Command::Top => self.write_leaderboard(out)?,
                Command::Help => writeln!(
                    out,
                    "Commands: <number>, hint, restart, top, quit"
                )?,
                Command::Quit => break,
                Command::Unknown(s) => writeln!(out, "Unknown command: {}", s)?,
            }
            out.flush()?;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let prefs = cli.to_preferences(config_store.load());
    let config = match prefs.to_game_config() {
        Ok(config) => config,
        Err(GameError::InvalidConfig(msg)) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, msg).exit();
        }
        Err(e) => return Err(e.into()),
    };

    if !cli.no_save {
        if let Err(e) = config_store.save(&prefs) {
            log::warn!("could not save preferences: {}", e);
        }
    }

    let scores = match &cli.db {
        Some(path) => SqliteScoreStore::open(path)?,
        None => SqliteScoreStore::new()?,
    };
    if cli.reset_leaderboard {
        scores.clear()?;
    }

    let sessions = cli
        .seed
        .map(InMemorySessionStore::seeded)
        .unwrap_or_default();

    let mut app = App::new(sessions, scores, cli.top as usize);
    app.start(config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    app.run(stdin.lock(), &mut stdout)?;

    Ok(())
}
