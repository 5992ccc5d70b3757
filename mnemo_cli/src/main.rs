use chrono::Local;
use clap::{Parser, Subcommand};
use mnemo_core::history::activity_window;
use mnemo_core::leveling::level_for_signed;
use mnemo_core::rank::format_accuracy;
use mnemo_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(about = "Memory training progress tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Act as this user instead of the signed-in one
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, creating progress on first use
    Login {
        /// Display name (2-20 characters)
        name: String,
    },

    /// Forget the signed-in user
    Logout,

    /// Record a finished training session
    Record {
        /// Training module (numbers, words, faces, images, flashcards)
        #[arg(long)]
        module: String,

        /// Correct answers
        #[arg(long)]
        correct: u64,

        /// Questions asked
        #[arg(long)]
        total: u64,

        /// XP to award instead of the module's own scoring
        #[arg(long)]
        points: Option<u64>,
    },

    /// Show level, XP, streak and accuracy (default)
    Stats,

    /// Show per-day activity ending today
    Activity {
        /// Number of days to show (defaults to the configured window)
        #[arg(long)]
        days: Option<u32>,
    },

    /// List recently recorded sessions
    History {
        /// How many days back to look
        #[arg(long, default_value_t = 7, allow_negative_numbers = true)]
        days: i64,
    },

    /// Show the level reached with a given amount of XP
    Level {
        /// Total XP
        #[arg(allow_negative_numbers = true)]
        xp: i64,
    },

    /// Show coaching advice for the signed-in user
    Coach,

    /// Manage and study the flashcard deck
    Cards {
        #[command(subcommand)]
        action: CardsCommand,
    },

    /// Roll up journaled sessions to CSV
    Rollup {
        /// Clean up processed journal files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum CardsCommand {
    /// Add a card to the deck
    Add {
        #[arg(long)]
        front: String,

        #[arg(long)]
        back: String,

        #[arg(long, default_value = mnemo_core::flashcards::DEFAULT_CATEGORY)]
        category: String,
    },

    /// List cards with their schedule and mastery
    List,

    /// Delete a card by id
    Remove { id: String },

    /// Review every card in deck order and log the session
    Study {
        /// One grade per card: again, hard, good, easy (or 1, 2, 4, 5)
        #[arg(long, value_delimiter = ',', required = true)]
        grades: Vec<String>,
    },

    /// Write the deck to a JSON file
    Export { path: PathBuf },

    /// Add cards from a JSON file, skipping ids already in the deck
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    // Initialize logging
    mnemo_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Some(Commands::Login { name }) => cmd_login(&data_dir, &name, &config),
        Some(Commands::Logout) => cmd_logout(&data_dir),
        Some(Commands::Record {
            module,
            correct,
            total,
            points,
        }) => {
            let user = resolve_user(&data_dir, cli.user.as_deref())?;
            cmd_record(&data_dir, &user, &module, correct, total, points, &config)
        }
        Some(Commands::Activity { days }) => {
            let user = resolve_user(&data_dir, cli.user.as_deref())?;
            cmd_activity(&data_dir, &user, days, &config)
        }
        Some(Commands::History { days }) => {
            let user = resolve_user(&data_dir, cli.user.as_deref())?;
            cmd_history(&data_dir, &user, days)
        }
        Some(Commands::Level { xp }) => cmd_level(xp),
        Some(Commands::Coach) => {
            let user = resolve_user(&data_dir, cli.user.as_deref())?;
            cmd_coach(&data_dir, &user, &config)
        }
        Some(Commands::Cards { action }) => {
            let user = resolve_user(&data_dir, cli.user.as_deref())?;
            cmd_cards(&data_dir, &user, action, &config)
        }
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&data_dir, cleanup),
        Some(Commands::Stats) | None => {
            // Default to "stats" command
            let user = resolve_user(&data_dir, cli.user.as_deref())?;
            cmd_stats(&data_dir, &user, &config)
        }
    }
}

fn journal_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("journal")
}

fn journal_path(data_dir: &Path) -> PathBuf {
    journal_dir(data_dir).join("sessions.wal")
}

fn csv_path(data_dir: &Path) -> PathBuf {
    data_dir.join("sessions.csv")
}

fn engine(data_dir: &Path, config: &Config) -> ProgressionEngine<FileStore> {
    ProgressionEngine::from_config(FileStore::new(data_dir), config)
        .with_journal(JsonlSink::new(journal_path(data_dir)))
}

/// `--user` if given, otherwise the signed-in user
fn resolve_user(data_dir: &Path, flag: Option<&str>) -> Result<UserId> {
    if let Some(name) = flag {
        return UserId::parse(name);
    }
    mnemo_core::login::current_user(data_dir)?.ok_or_else(|| {
        Error::InvalidInput("no user signed in; run `mnemo login <name>` or pass --user".into())
    })
}

fn cmd_login(data_dir: &Path, name: &str, config: &Config) -> Result<()> {
    let user = UserId::parse(name)?;
    let progress = engine(data_dir, config).sign_in(&user)?;
    mnemo_core::login::remember_user(data_dir, &user)?;

    println!("✓ Signed in as {}", user);
    println!(
        "  Level {} · {} XP · {}-day streak",
        progress.current_level, progress.xp, progress.streak_days
    );
    Ok(())
}

fn cmd_logout(data_dir: &Path) -> Result<()> {
    if mnemo_core::login::forget_user(data_dir)? {
        println!("✓ Signed out");
    } else {
        println!("Nobody is signed in.");
    }
    Ok(())
}

fn cmd_record(
    data_dir: &Path,
    user: &UserId,
    module: &str,
    correct: u64,
    total: u64,
    points: Option<u64>,
    config: &Config,
) -> Result<()> {
    let module = TrainingModule::parse(module).ok_or_else(|| {
        Error::InvalidInput(format!(
            "unknown module '{}'; expected one of: numbers, words, faces, images, flashcards",
            module
        ))
    })?;

    let outcome = match points {
        Some(points) => SessionOutcome::new(points, correct, total)?.with_module(module),
        None => SessionOutcome::scored(module, correct, total)?,
    };

    let mut engine = engine(data_dir, config);
    let report = engine.record_session(user, &outcome)?;
    print_session(&outcome, &report);
    Ok(())
}

fn print_session(outcome: &SessionOutcome, report: &SessionReport) {
    let module = outcome.module.map(|m| m.as_str()).unwrap_or("session");
    println!("✓ Session logged!");
    println!(
        "  +{} XP ({} {}/{})",
        outcome.points, module, outcome.correct, outcome.total
    );
    if report.leveled_up {
        println!("  ★ Level up! You reached level {}", report.level.current_level);
    }
    print_level(report.progress.xp, &report.level);
    println!(
        "  Streak: {} day(s) (best {})",
        report.progress.streak_days, report.progress.personal_best_streak
    );
}

fn cmd_stats(data_dir: &Path, user: &UserId, config: &Config) -> Result<()> {
    let engine = engine(data_dir, config);
    let progress = engine.progress(user)?;
    let level = calculate_level(progress.xp);
    let rank = AccuracyRank::for_accuracy(progress.accuracy_average);

    println!("{}", user);
    print_level(progress.xp, &level);
    println!(
        "  Streak: {} day(s) (best {})",
        progress.streak_days, progress.personal_best_streak
    );
    println!(
        "  Sessions: {} · Answers: {}/{}",
        progress.total_sessions, progress.total_correct_all_time, progress.total_questions_all_time
    );
    println!(
        "  Accuracy: {}% · {}",
        format_accuracy(progress.accuracy_average),
        rank.title()
    );
    println!("  {}", rank.message());
    if let Some(last) = progress.last_active_date {
        println!(
            "  Last active: {}",
            last.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn cmd_activity(data_dir: &Path, user: &UserId, days: Option<u32>, config: &Config) -> Result<()> {
    let engine = engine(data_dir, config);
    let today = engine.today();
    let window = match days {
        Some(days) => activity_window(engine.store(), user, today, days)?,
        None => engine.weekly_activity(user, today)?,
    };

    let peak = window.iter().map(|d| d.score).max().unwrap_or(0);
    for day in &window {
        println!(
            "  {} {}  {:<20} {} XP ({} sessions)",
            day.weekday,
            day.date,
            bar(day.score, peak, 20),
            day.score,
            day.sessions_count
        );
    }
    Ok(())
}

/// Proportional bar of at most `width` characters
fn bar(value: u64, peak: u64, width: u64) -> String {
    if peak == 0 {
        return String::new();
    }
    let len = (u128::from(value) * u128::from(width) / u128::from(peak)) as usize;
    "█".repeat(len)
}

fn cmd_history(data_dir: &Path, user: &UserId, days: i64) -> Result<()> {
    let sessions: Vec<SessionRecord> =
        load_recent_sessions(&journal_path(data_dir), &csv_path(data_dir), days)?
            .into_iter()
            .filter(|s| &s.user == user)
            .collect();

    if sessions.is_empty() {
        println!("No sessions in the last {} days.", days);
        return Ok(());
    }

    for session in &sessions {
        let module = session
            .module
            .map(|m| m.as_str())
            .unwrap_or("unknown");
        println!(
            "  {}  {:<10} {:>3}/{:<3} +{} XP",
            session.completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            module,
            session.correct,
            session.total,
            session.points
        );
    }
    Ok(())
}

fn cmd_level(xp: i64) -> Result<()> {
    let level = level_for_signed(xp)?;
    print_level(xp.unsigned_abs(), &level);
    Ok(())
}

fn cmd_coach(data_dir: &Path, user: &UserId, config: &Config) -> Result<()> {
    let progress = engine(data_dir, config).progress(user)?;
    println!("{}", advice_or_fallback(&TipsCoach, &progress));
    Ok(())
}

fn cmd_cards(data_dir: &Path, user: &UserId, action: CardsCommand, config: &Config) -> Result<()> {
    let store = FileStore::new(data_dir);

    match action {
        CardsCommand::Add {
            front,
            back,
            category,
        } => {
            let card = store.update_deck(user, |deck| {
                deck.add(&front, &back, &category).map(Flashcard::clone)
            })?;
            println!("✓ Added card {} ({})", card.id, card.category);
        }
        CardsCommand::List => {
            let deck = store.load_deck(user)?;
            if deck.is_empty() {
                println!("The deck is empty. Add cards with `mnemo cards add`.");
            }
            for card in deck.cards() {
                println!(
                    "  {}  {:<12} {} → {}  (every {:.1} days, {}% mastered)",
                    card.id, card.category, card.front, card.back, card.interval, card.mastery
                );
            }
        }
        CardsCommand::Remove { id } => {
            if store.update_deck(user, |deck| Ok(deck.remove(&id)))? {
                println!("✓ Removed card {}", id);
            } else {
                return Err(Error::InvalidInput(format!("no card with id '{}'", id)));
            }
        }
        CardsCommand::Study { grades } => {
            let grades = grades
                .iter()
                .map(|g| {
                    ReviewGrade::parse(g).ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "unknown grade '{}'; expected again, hard, good or easy",
                            g
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut engine = engine(data_dir, config);
            let now = chrono::Utc::now();
            let outcome = store.update_deck(user, |deck| deck.study(&grades, now))?;
            println!("✓ Studied {} cards ({} recalled)", outcome.total, outcome.correct);

            let report = engine.record_session(user, &outcome)?;
            print_session(&outcome, &report);
        }
        CardsCommand::Export { path } => {
            let deck = store.load_deck(user)?;
            deck.export_to(&path)?;
            println!("✓ Exported {} cards to {}", deck.len(), path.display());
        }
        CardsCommand::Import { path } => {
            let incoming = Deck::import_from(&path)?;
            let offered = incoming.len();
            let added = store.update_deck(user, |deck| Ok(deck.merge(incoming)))?;
            println!("✓ Imported {} of {} cards", added, offered);
        }
    }

    Ok(())
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let journal = journal_path(data_dir);
    let csv = csv_path(data_dir);

    if !journal.exists() {
        println!("No journal found - nothing to roll up.");
        return Ok(());
    }

    let count = mnemo_core::csv_rollup::journal_to_csv_and_archive(&journal, &csv)?;

    println!("✓ Rolled up {} sessions to CSV", count);
    println!("  CSV: {}", csv.display());

    if cleanup {
        let cleaned = mnemo_core::csv_rollup::cleanup_processed_journals(&journal_dir(data_dir))?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed journal files", cleaned);
        }
    }

    Ok(())
}

fn print_level(xp: u64, level: &LevelInfo) {
    println!(
        "  Level {} · {} XP · {}/{} to next ({}%)",
        level.current_level,
        xp,
        level.current_level_xp,
        level.xp_for_next_level,
        level.progress_pct
    );
}
