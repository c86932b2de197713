//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `players_core` linkage.
//! - Exercise open, migrate, save and read against an in-memory database.
//! - Write core log events under the system temp directory.

use players_core::{
    default_log_level, init_logging, AppDatabase, DatabaseQueue, DatabaseReader, Player,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("players_core version={}", players_core::core_version());
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("players_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = std::env::temp_dir().join("players_cli").join("logs");
    init_logging(default_log_level(), &log_dir)?;
    println!("log_dir={}", log_dir.display());

    let config = AppDatabase::<DatabaseQueue>::make_configuration(Default::default());
    let db = AppDatabase::new(DatabaseQueue::open(config)?)?;

    let mut player = Player::new("Arthur", 1000);
    db.save_player(&mut player)?;
    println!(
        "saved id={} name={} score={}",
        player.id.unwrap_or_default(),
        player.name,
        player.score
    );

    let count = db.reader().read(Player::fetch_count)?;
    println!("player_count={count}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_starts_logging_and_saves_a_player() {
        run().unwrap();
        let (_, log_dir) = players_core::logging_status().unwrap();
        assert!(log_dir.ends_with("players_cli/logs"));
    }
}
