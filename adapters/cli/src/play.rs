use std::{
    io::{BufRead, Write},
    time::Duration,
};

use anyhow::{Context, Result};
use crystal_miner_core::{FeedbackCue, LevelId, PowerUpKind, TileValue, GAME_TITLE};
use crystal_miner_rendering::{
    floating_text_line, format_stars, render_board, render_hud, BoardLayout, CueLog, Hud,
    Palette, TextPresenter,
};
use crystal_miner_system_progression::ProfileStore;
use crystal_miner_system_session::{
    Clock, Game, LevelReport, PowerUpOutcome, SessionPhase,
};
use crystal_miner_world::query;
use tracing::debug;

use crate::clock::TickSource;

/// Game wired to the text collaborators.
pub(crate) type TextGame<C, S> = Game<C, S, TextPresenter, CueLog>;

const HELP: &str = "\
Commands:
  <number>            tap the tile with that number
  lightning | l       collect every multiple of the selected crystal
  magnifier | m       reveal the next crystal
  time | t            add 30 seconds
  dynamite | d        blow up to five loose stones
  y / n               answer a power-up tutorial
  pause / resume      stop or restart the countdown
  restart / next      replay this level or move on
  quit                leave the mine";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Input {
    Tap(u32),
    PowerUp(PowerUpKind),
    Answer(bool),
    Pause,
    Resume,
    Restart,
    Next,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let word = line.trim().to_ascii_lowercase();
    if let Ok(value) = word.parse::<u32>() {
        return Input::Tap(value);
    }
    if let Some(kind) = PowerUpKind::from_key(&word) {
        return Input::PowerUp(kind);
    }
    match word.as_str() {
        "l" => Input::PowerUp(PowerUpKind::Lightning),
        "m" => Input::PowerUp(PowerUpKind::Magnifier),
        "t" => Input::PowerUp(PowerUpKind::Time),
        "d" => Input::PowerUp(PowerUpKind::Dynamite),
        "y" | "yes" => Input::Answer(true),
        "n" | "no" => Input::Answer(false),
        "pause" | "p" => Input::Pause,
        "resume" | "r" => Input::Resume,
        "restart" => Input::Restart,
        "next" => Input::Next,
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        _ => Input::Unknown(word),
    }
}

/// Highest level the player may start, used when none is requested.
pub(crate) fn default_level<C, S>(game: &TextGame<C, S>) -> LevelId
where
    C: Clock,
    S: ProfileStore,
{
    game.campaign()
        .levels()
        .iter()
        .map(|level| level.id())
        .filter(|id| !game.is_level_locked(*id))
        .last()
        .unwrap_or(LevelId::new(1))
}

/// Plays from `level` until the input ends or the player quits.
pub(crate) fn run<C, S, R, W>(
    game: &mut TextGame<C, S>,
    level: LevelId,
    palette: Option<Palette>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    C: Clock + TickSource,
    S: ProfileStore,
    R: BufRead,
    W: Write,
{
    game.start_level(level)
        .with_context(|| format!("cannot start level {level}"))?;
    writeln!(out, "{GAME_TITLE}: level {level}. Type `help` for commands.")?;
    let mut last_draw = game.clock().now();
    draw(game, palette.as_ref(), &mut last_draw, out)?;

    for line in input.lines() {
        let line = line.context("failed to read player input")?;
        let was_live = game.phase().is_live();
        for handle in game.clock_mut().due_ticks() {
            game.tick(handle);
        }

        if game.phase().is_live() {
            if !handle_input(game, parse_input(&line), out)? {
                break;
            }
        } else if !handle_menu_input(game, parse_input(&line), out)? {
            break;
        }

        if was_live && !game.phase().is_live() {
            if let Some(report) = game.report() {
                write_report(report, out)?;
                writeln!(out, "Type `restart`, `next` or `quit`.")?;
            }
        }
        draw(game, palette.as_ref(), &mut last_draw, out)?;
    }

    game.leave();
    Ok(())
}

fn handle_input<C, S, W>(game: &mut TextGame<C, S>, input: Input, out: &mut W) -> Result<bool>
where
    C: Clock,
    S: ProfileStore,
    W: Write,
{
    match input {
        Input::Tap(value) => {
            if let Err(error) = game.tap(TileValue::new(value)) {
                writeln!(out, "{error}")?;
            }
        }
        Input::PowerUp(kind) => {
            match game.request_power_up(kind) {
                Ok(outcome) => write_power_up(kind, outcome, out)?,
                Err(error) => writeln!(out, "{error}")?,
            }
        }
        Input::Answer(accept) => match game.pending_confirmation() {
            Some(token) if accept => {
                match game.confirm_power_up(token) {
                    Ok(outcome) => write_power_up(token.kind(), outcome, out)?,
                    Err(error) => writeln!(out, "{error}")?,
                }
            }
            Some(token) => {
                let _ = game.decline_power_up(token);
                writeln!(out, "Maybe later.")?;
            }
            None => writeln!(out, "Nothing to answer.")?,
        },
        Input::Pause => {
            if game.pause() {
                writeln!(out, "Paused. Type `resume` to continue.")?;
            }
        }
        Input::Resume => {
            if game.resume() {
                writeln!(out, "Back to digging.")?;
            }
        }
        other => return handle_menu_input(game, other, out),
    }
    Ok(true)
}

fn handle_menu_input<C, S, W>(game: &mut TextGame<C, S>, input: Input, out: &mut W) -> Result<bool>
where
    C: Clock,
    S: ProfileStore,
    W: Write,
{
    let result = match input {
        Input::Restart => game.restart(),
        Input::Next => game.next_level(),
        Input::Help => {
            writeln!(out, "{HELP}")?;
            Ok(())
        }
        Input::Quit => return Ok(false),
        Input::Unknown(word) => {
            writeln!(out, "Unknown command `{word}`; type `help`.")?;
            Ok(())
        }
        Input::Tap(_) | Input::PowerUp(_) | Input::Answer(_) | Input::Pause | Input::Resume => {
            writeln!(out, "The level is over. Type `restart`, `next` or `quit`.")?;
            Ok(())
        }
    };
    if let Err(error) = result {
        writeln!(out, "{error}")?;
    }
    Ok(true)
}

fn write_power_up<W: Write>(kind: PowerUpKind, outcome: PowerUpOutcome, out: &mut W) -> Result<()> {
    match outcome {
        PowerUpOutcome::Executed { remaining, .. } => {
            writeln!(out, "{} used, {remaining} left.", kind.title())?;
        }
        PowerUpOutcome::NeedsConfirmation(_) => {
            writeln!(out, "{}: {}", kind.title(), kind.tutorial())?;
            writeln!(out, "Use it now? [y/n]")?;
        }
        PowerUpOutcome::Rejected(error) => debug!(%error, "power-up refused"),
    }
    Ok(())
}

fn draw<C, S, W>(
    game: &mut TextGame<C, S>,
    palette: Option<&Palette>,
    last_draw: &mut Duration,
    out: &mut W,
) -> Result<()>
where
    C: Clock,
    S: ProfileStore,
    W: Write,
{
    let now = game.clock().now();
    game.presenter_mut().age(now.saturating_sub(*last_draw));
    *last_draw = now;

    let layout = BoardLayout::new(
        query::max_number(game.world()),
        BoardLayout::DEFAULT_COLUMNS,
    )?;
    for message in game.presenter_mut().take_messages() {
        writeln!(out, "{}", floating_text_line(&layout, &message))?;
    }
    if palette.is_some() && game.feedback_mut().drain().contains(&FeedbackCue::Error) {
        write!(out, "\x07")?;
    }

    if game.phase() == SessionPhase::Running || game.phase() == SessionPhase::Paused {
        let world = game.world();
        let hud = Hud {
            score: query::score(world),
            combo: query::combo(world),
            time_left: game.time_left(),
            primes_completed: query::primes_completed(world),
            prime_count: query::primes(world).len(),
        };
        write!(out, "{}", render_board(game.presenter(), &layout, palette))?;
        writeln!(out, "{}", render_hud(&hud))?;
    }
    out.flush()?;
    Ok(())
}

/// Prints the summary of a finished level.
pub(crate) fn write_report<W: Write>(report: &LevelReport, out: &mut W) -> Result<()> {
    if report.success {
        writeln!(
            out,
            "Level {} cleared! {} Score {} in {}s.",
            report.level,
            format_stars(report.stars),
            report.score,
            report.duration.as_secs()
        )?;
    } else {
        writeln!(out, "Time is up on level {}. Score {}.", report.level, report.score)?;
    }
    writeln!(out, "+{} XP", report.xp_gained)?;
    if report.levels_gained > 0 {
        writeln!(out, "Level up!")?;
    }
    for kind in &report.grants {
        writeln!(out, "Found a {}!", kind.title())?;
    }
    for key in &report.unlocked {
        let info = key.info();
        writeln!(out, "Achievement: {} {}", info.icon, info.title)?;
    }
    Ok(())
}
