//! Integration tests for the mnemo binary.
//!
//! These tests verify end-to-end behavior including:
//! - Sign-in and remembered users
//! - Session recording, scoring and leveling
//! - Activity, history and coaching views
//! - CSV rollup of the session journal

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI isolated from the real config and data directories
fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mnemo"));
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .arg("--data-dir")
        .arg(data_dir(temp_dir));
    cmd
}

fn data_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("data")
}

fn user_dir(data_dir: &Path, name: &str) -> PathBuf {
    let key: String = name.bytes().map(|b| format!("{:02x}", b)).collect();
    data_dir.join("users").join(key)
}

fn read_progress(data_dir: &Path, name: &str) -> serde_json::Value {
    let path = user_dir(data_dir, name).join("progress.json");
    let contents = fs::read_to_string(&path).expect("Failed to read progress");
    serde_json::from_str(&contents).expect("Progress is not JSON")
}

fn login(temp_dir: &TempDir, name: &str) {
    cli(temp_dir).args(["login", name]).assert().success();
}

fn record(temp_dir: &TempDir, module: &str, correct: u32, total: u32) {
    cli(temp_dir)
        .args(["record", "--module", module])
        .args(["--correct", &correct.to_string(), "--total", &total.to_string()])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Memory training progress tracker"));
}

#[test]
fn test_login_creates_progress_and_remembers_user() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);

    cli(&temp_dir)
        .args(["login", "  Ann  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Ann"))
        .stdout(predicate::str::contains("Level 1"));

    assert_eq!(fs::read_to_string(data_dir.join("current_user")).unwrap(), "Ann");

    let progress = read_progress(&data_dir, "Ann");
    assert_eq!(progress["xp"], 0);
    assert_eq!(progress["currentLevel"], 1);
    assert_eq!(progress["revision"], 1);

    // Signing in again keeps the existing record
    login(&temp_dir, "Ann");
    assert_eq!(read_progress(&data_dir, "Ann")["revision"], 1);
}

#[test]
fn test_login_rejects_invalid_names() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["login", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 2 characters"));

    cli(&temp_dir)
        .args(["login", "abcdefghijklmnopqrstu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("20 characters or less"));

    assert!(!data_dir(&temp_dir).join("current_user").exists());
}

#[test]
fn test_record_requires_signed_in_user() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["record", "--module", "words", "--correct", "1", "--total", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user signed in"));
}

#[test]
fn test_record_perfect_numbers_session() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["record", "--module", "numbers", "--correct", "5", "--total", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session logged"))
        .stdout(predicate::str::contains("+100 XP"))
        .stdout(predicate::str::contains("Level up! You reached level 2"))
        .stdout(predicate::str::contains("Streak: 1 day(s)"));

    let progress = read_progress(&data_dir(&temp_dir), "Ann");
    assert_eq!(progress["xp"], 100);
    assert_eq!(progress["currentLevel"], 2);
    assert_eq!(progress["totalSessions"], 1);
    assert_eq!(progress["streakDays"], 1);
    assert_eq!(progress["accuracyAverage"], 100.0);
    assert_eq!(progress["revision"], 2);
    assert!(progress["lastActiveDate"].is_string());
}

#[test]
fn test_record_imperfect_numbers_session_scores_nothing() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["record", "--module", "numbers", "--correct", "4", "--total", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+0 XP"));

    let progress = read_progress(&data_dir(&temp_dir), "Ann");
    assert_eq!(progress["xp"], 0);
    assert_eq!(progress["totalSessions"], 1);
    assert_eq!(progress["accuracyAverage"], 80.0);
}

#[test]
fn test_record_with_explicit_points() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["record", "--module", "Words", "--correct", "12", "--total", "15"])
        .args(["--points", "250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+250 XP (words 12/15)"))
        .stdout(predicate::str::contains("Level 3 · 250 XP · 50/100 to next (50%)"));

    let progress = read_progress(&data_dir(&temp_dir), "Ann");
    assert_eq!(progress["xp"], 250);
    assert_eq!(progress["totalCorrectAllTime"], 12);
    assert_eq!(progress["totalQuestionsAllTime"], 15);
    assert_eq!(progress["accuracyAverage"], 80.0);
}

#[test]
fn test_record_rejects_bad_input() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["record", "--module", "faces", "--correct", "6", "--total", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceed questions asked"));

    cli(&temp_dir)
        .args(["record", "--module", "chess", "--correct", "1", "--total", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown module"));

    cli(&temp_dir)
        .args(["record", "--module", "faces", "--correct", "-1", "--total", "5"])
        .assert()
        .failure();

    // Nothing was recorded
    assert_eq!(read_progress(&data_dir(&temp_dir), "Ann")["totalSessions"], 0);
}

#[test]
fn test_same_day_sessions_accumulate() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    record(&temp_dir, "faces", 2, 3);
    record(&temp_dir, "flashcards", 10, 12);

    let progress = read_progress(&data_dir(&temp_dir), "Ann");
    assert_eq!(progress["xp"], 212);
    assert_eq!(progress["totalSessions"], 2);
    assert_eq!(progress["streakDays"], 1);
    assert_eq!(progress["personalBestStreak"], 1);

    let activity = fs::read_to_string(user_dir(&data_dir(&temp_dir), "Ann").join("activity.json"))
        .unwrap();
    let entries: serde_json::Value = serde_json::from_str(&activity).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["score"], 212);
    assert_eq!(entries[0]["sessionsCount"], 2);
}

#[test]
fn test_user_flag_overrides_signed_in_user() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["--user", "Bob", "record", "--module", "images"])
        .args(["--correct", "7", "--total", "9"])
        .assert()
        .success();

    let data_dir = data_dir(&temp_dir);
    assert_eq!(read_progress(&data_dir, "Bob")["xp"], 7);
    assert_eq!(read_progress(&data_dir, "Ann")["xp"], 0);
}

#[test]
fn test_stats_shows_rank_and_level() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");
    record(&temp_dir, "words", 9, 10);

    cli(&temp_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ann"))
        .stdout(predicate::str::contains("Level 5 · 450 XP"))
        .stdout(predicate::str::contains("Accuracy: 90.00%"))
        .stdout(predicate::str::contains("Professional Mnemonist"));

    // Stats is the default command
    cli(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 5"));
}

#[test]
fn test_stats_for_unknown_user_shows_defaults() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["--user", "Nobody", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 1 · 0 XP · 0/100 to next (0%)"))
        .stdout(predicate::str::contains("Memory Noob"));

    assert!(!data_dir(&temp_dir).join("users").exists());
}

#[test]
fn test_level_command() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["level", "999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 10 · 999 XP · 99/100 to next (99%)"));

    cli(&temp_dir)
        .args(["level", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 11 · 1000 XP · 0/200 to next (0%)"));

    cli(&temp_dir)
        .args(["level", "-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("negative"));
}

#[test]
fn test_activity_window() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");
    record(&temp_dir, "faces", 1, 2);

    let output = cli(&temp_dir).arg("activity").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[6].contains("100 XP (1 sessions)"));
    assert!(lines[0].contains("0 XP (0 sessions)"));

    let output = cli(&temp_dir).args(["activity", "--days", "3"]).assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn test_activity_rejects_oversized_window() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["activity", "--days", "200000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at most 366 days"));

    cli(&temp_dir)
        .args(["activity", "--days", "366"])
        .assert()
        .success();
}

#[test]
fn test_history_rejects_bad_windows() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["history", "--days=-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be negative"));

    cli(&temp_dir)
        .args(["history", "--days", &i64::MAX.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_history_lists_only_own_sessions() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");
    record(&temp_dir, "numbers", 3, 3);

    cli(&temp_dir)
        .args(["--user", "Bob", "record", "--module", "flashcards"])
        .args(["--correct", "2", "--total", "4"])
        .assert()
        .success();

    cli(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("numbers"))
        .stdout(predicate::str::contains("+60 XP"))
        .stdout(predicate::str::contains("flashcards").not());
}

#[test]
fn test_history_without_sessions() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions in the last 7 days."));
}

#[test]
fn test_coach_gives_advice() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .arg("coach")
        .assert()
        .success()
        .stdout(predicate::str::contains("100 XP to reach level 2."));
}

#[test]
fn test_logout_forgets_user() {
    let temp_dir = setup_test_dir();
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    cli(&temp_dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nobody is signed in."));

    cli(&temp_dir).arg("stats").assert().failure();
}

#[test]
fn test_rollup_moves_journal_to_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);
    login(&temp_dir, "Ann");
    record(&temp_dir, "words", 1, 2);
    record(&temp_dir, "images", 3, 4);

    let journal = data_dir.join("journal/sessions.wal");
    assert_eq!(fs::read_to_string(&journal).unwrap().lines().count(), 2);

    cli(&temp_dir)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 2 sessions to CSV"));

    assert!(!journal.exists());
    assert!(data_dir.join("journal/sessions.wal.processed").exists());
    let csv = fs::read_to_string(data_dir.join("sessions.csv")).unwrap();
    assert!(csv.starts_with("id,user,module,points,correct,total,completed_at"));
    assert_eq!(csv.lines().count(), 3);

    // History still sees archived sessions
    cli(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("images"))
        .stdout(predicate::str::contains("words"));
}

#[test]
fn test_rollup_with_cleanup() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);
    login(&temp_dir, "Ann");
    record(&temp_dir, "words", 1, 2);

    cli(&temp_dir)
        .args(["rollup", "--cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned up 1 processed journal files"));

    assert!(!data_dir.join("journal/sessions.wal.processed").exists());
}

#[test]
fn test_rollup_without_journal() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to roll up"));
}

fn read_deck(data_dir: &Path, name: &str) -> serde_json::Value {
    let path = user_dir(data_dir, name).join("flashcards.json");
    let contents = fs::read_to_string(&path).expect("Failed to read deck");
    serde_json::from_str(&contents).expect("Deck is not JSON")
}

fn add_card(temp_dir: &TempDir, front: &str, back: &str) {
    cli(temp_dir)
        .args(["cards", "add", "--front", front, "--back", back])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added card"));
}

#[test]
fn test_cards_study_updates_schedule_and_logs_session() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);
    login(&temp_dir, "Ann");

    add_card(&temp_dir, "Au", "Gold");
    add_card(&temp_dir, "Fe", "Iron");
    add_card(&temp_dir, "Ag", "Silver");

    cli(&temp_dir)
        .args(["cards", "study", "--grades", "good,again,5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Studied 3 cards (2 recalled)"))
        .stdout(predicate::str::contains("+3 XP (flashcards 2/3)"));

    let deck = read_deck(&data_dir, "Ann");
    assert_eq!(deck[0]["interval"], 2.5);
    assert_eq!(deck[0]["mastery"], 20);
    assert_eq!(deck[1]["interval"], 1.0);
    assert_eq!(deck[1]["mastery"], 5);
    assert_eq!(deck[2]["mastery"], 25);
    assert_eq!(deck[0]["category"], "General");
    assert!(deck[0]["lastReviewed"].is_i64());

    let progress = read_progress(&data_dir, "Ann");
    assert_eq!(progress["xp"], 3);
    assert_eq!(progress["totalCorrectAllTime"], 2);
    assert_eq!(progress["totalQuestionsAllTime"], 3);

    cli(&temp_dir)
        .args(["cards", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Au → Gold"))
        .stdout(predicate::str::contains("every 2.5 days, 20% mastered"));
}

#[test]
fn test_cards_study_rejects_bad_grades() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);
    login(&temp_dir, "Ann");

    cli(&temp_dir)
        .args(["cards", "study", "--grades", "good"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no cards to study"));

    add_card(&temp_dir, "Au", "Gold");

    cli(&temp_dir)
        .args(["cards", "study", "--grades", "good,good"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 1 grades"));

    cli(&temp_dir)
        .args(["cards", "study", "--grades", "perfect"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown grade"));

    // Nothing was reviewed or scored
    assert!(read_deck(&data_dir, "Ann")[0].get("lastReviewed").is_none());
    assert_eq!(read_progress(&data_dir, "Ann")["totalSessions"], 0);
}

#[test]
fn test_cards_remove() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);
    login(&temp_dir, "Ann");
    add_card(&temp_dir, "Au", "Gold");
    add_card(&temp_dir, "Fe", "Iron");

    let id = read_deck(&data_dir, "Ann")[0]["id"]
        .as_str()
        .expect("Card id is not a string")
        .to_string();

    cli(&temp_dir)
        .args(["cards", "remove", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed card"));
    cli(&temp_dir)
        .args(["cards", "remove", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no card with id"));

    let deck = read_deck(&data_dir, "Ann");
    assert_eq!(deck.as_array().map(Vec::len), Some(1));
    assert_eq!(deck[0]["front"], "Fe");
}

#[test]
fn test_cards_export_and_import_between_users() {
    let temp_dir = setup_test_dir();
    let data_dir = data_dir(&temp_dir);
    let exported = temp_dir.path().join("deck.json");

    login(&temp_dir, "Ann");
    add_card(&temp_dir, "Au", "Gold");
    add_card(&temp_dir, "Fe", "Iron");
    cli(&temp_dir)
        .args(["cards", "export"])
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 cards"));

    login(&temp_dir, "Bob");
    cli(&temp_dir)
        .args(["cards", "import"])
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 of 2 cards"));

    // Importing again adds nothing
    cli(&temp_dir)
        .args(["cards", "import"])
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 0 of 2 cards"));

    assert_eq!(read_deck(&data_dir, "Bob"), read_deck(&data_dir, "Ann"));
}

#[test]
fn test_cards_import_rejects_malformed_file() {
    let temp_dir = setup_test_dir();
    let bad = temp_dir.path().join("bad.json");
    fs::write(&bad, "not a deck").expect("Failed to write file");

    login(&temp_dir, "Ann");
    cli(&temp_dir).args(["cards", "import"]).arg(&bad).assert().failure();
    cli(&temp_dir)
        .args(["cards", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The deck is empty"));
}
