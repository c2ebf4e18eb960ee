#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Crystal Miner in a terminal.

mod clock;
mod config;
mod play;
mod store;

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use crystal_miner_core::{AchievementKey, LevelId, PowerUpKind};
use crystal_miner_rendering::{CueLog, Palette, TextPresenter};
use crystal_miner_system_progression::PlayerProfile;
use crystal_miner_system_session::Game;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{clock::SystemClock, store::JsonFileStore};

/// Find the crystals and dig out their multiples before time runs out.
#[derive(Debug, Parser)]
#[command(name = "crystal-miner", version, long_about = None)]
struct Cli {
    /// Campaign configuration file (TOML); the built-in levels are used without it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the player profile is kept.
    #[arg(long, global = true, default_value = "crystal-miner-profile.json")]
    profile: PathBuf,

    /// Seed for power-up rewards and dynamite blasts.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Draw the board without ANSI colors.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a level, reading taps and commands from standard input.
    Play {
        /// Level to start; defaults to the highest unlocked level.
        #[arg(long)]
        level: Option<u32>,
    },
    /// List the levels with their stars and locks.
    Levels,
    /// List the achievements and which ones are unlocked.
    Achievements,
    /// Show the player's level, experience and power-ups.
    Profile,
}

/// Entry point for the Crystal Miner command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let store = JsonFileStore::new(cli.profile);
    debug!(path = %store.path().display(), "using profile file");
    let mut game = Game::new(
        config,
        SystemClock::new(),
        store,
        TextPresenter::new(),
        CueLog::new(),
    );
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command.unwrap_or(Commands::Play { level: None }) {
        Commands::Play { level } => {
            let level = level
                .map(LevelId::new)
                .unwrap_or_else(|| play::default_level(&game));
            let palette = (!cli.no_color).then_some(Palette::MINE);
            play::run(&mut game, level, palette, io::stdin().lock(), &mut out)?;
        }
        Commands::Levels => {
            for line in game.presenter().level_lines() {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Achievements => {
            for line in game.presenter().achievement_lines() {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Profile => write_profile(game.profile(), &mut out)?,
    }
    Ok(())
}

fn write_profile<W: Write>(profile: &PlayerProfile, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "Miner level {} ({}/{} XP)",
        profile.level(),
        profile.xp(),
        profile.xp_threshold()
    )?;
    let stars: u32 = profile.star_record().values().map(|stars| u32::from(*stars)).sum();
    writeln!(out, "Stars collected: {stars}")?;
    writeln!(
        out,
        "Achievements: {}/{}",
        profile.unlocked().len(),
        AchievementKey::ALL.len()
    )?;
    for kind in PowerUpKind::ALL {
        writeln!(out, "  {}: {}", kind.title(), profile.inventory(kind))?;
    }
    Ok(())
}
