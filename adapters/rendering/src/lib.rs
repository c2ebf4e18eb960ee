#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared text rendering contracts for Crystal Miner adapters.
//!
//! [`TextPresenter`] and [`CueLog`] implement the collaborator traits the
//! session controller drives. They only record what they are told; drawing
//! happens when an adapter asks for a frame through [`render_board`],
//! [`render_hud`] and the menu line helpers.

use crystal_miner_core::{
    AchievementKey, FeedbackCue, FeedbackSink, LevelDefinition, LevelId, Presenter, TextAnchor,
    TileState, TileValue, MAX_STARS,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    error::Error,
    fmt::{self, Write as _},
    time::Duration,
};

/// RGB color used when presenting frames on colour terminals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
        }
    }

    /// ANSI escape sequence selecting this color as the 24-bit foreground.
    #[must_use]
    pub fn ansi_foreground(self) -> String {
        format!(
            "\x1b[38;2;{};{};{}m",
            to_byte(self.red),
            to_byte(self.green),
            to_byte(self.blue)
        )
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// ANSI sequence restoring the default terminal colors.
pub const ANSI_RESET: &str = "\x1b[0m";

/// Colors assigned to tile states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Stones still on the board.
    pub normal: Color,
    /// The selected crystal.
    pub prime: Color,
    /// Collected stones.
    pub eliminated: Color,
    /// Crystals whose phase is finished.
    pub completed: Color,
    /// Amount by which magnifier highlights lighten a tile.
    pub highlight_boost: f32,
}

impl Palette {
    /// Default earthy palette.
    pub const MINE: Self = Self {
        normal: Color::from_rgb_u8(0xb0, 0x8d, 0x6e),
        prime: Color::from_rgb_u8(0x7f, 0xdb, 0xff),
        eliminated: Color::from_rgb_u8(0x4a, 0x3b, 0x30),
        completed: Color::from_rgb_u8(0xff, 0xd7, 0x00),
        highlight_boost: 0.6,
    };

    /// Color of a tile in `state`.
    #[must_use]
    pub const fn tile(&self, state: TileState) -> Color {
        match state {
            TileState::Normal => self.normal,
            TileState::Prime => self.prime,
            TileState::Eliminated => self.eliminated,
            TileState::Completed => self.completed,
        }
    }
}

/// Arrangement of tile values into rows of a fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardLayout {
    max_number: u32,
    columns: u32,
}

impl BoardLayout {
    /// Columns used by adapters that do not pick their own width.
    pub const DEFAULT_COLUMNS: u32 = 10;

    /// Creates a layout for a board of `max_number` tiles.
    ///
    /// Returns an error when `columns` is zero.
    pub fn new(max_number: u32, columns: u32) -> Result<Self, RenderingError> {
        if columns == 0 {
            return Err(RenderingError::InvalidColumns { columns });
        }
        Ok(Self {
            max_number,
            columns,
        })
    }

    /// Highest value on the board.
    #[must_use]
    pub const fn max_number(&self) -> u32 {
        self.max_number
    }

    /// Number of tiles per row.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows needed for every tile.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.max_number.div_ceil(self.columns)
    }

    /// Zero-based `(column, row)` of the tile carrying `value`.
    #[must_use]
    pub const fn cell_of(&self, value: TileValue) -> Option<(u32, u32)> {
        let value = value.get();
        if value == 0 || value > self.max_number {
            return None;
        }
        let index = value - 1;
        Some((index % self.columns, index / self.columns))
    }

    /// Tile found at zero-based `(column, row)`.
    #[must_use]
    pub const fn value_at(&self, column: u32, row: u32) -> Option<TileValue> {
        if column >= self.columns {
            return None;
        }
        let value = row * self.columns + column + 1;
        if value > self.max_number {
            return None;
        }
        Some(TileValue::new(value))
    }

    fn cell_width(&self) -> usize {
        self.max_number.max(1).to_string().len()
    }
}

/// Floating text waiting to be shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FloatingText {
    /// Where the text belongs.
    pub anchor: TextAnchor,
    /// Text content.
    pub text: String,
}

/// Presenter that keeps the latest tile states and menu lines in memory.
#[derive(Clone, Debug, Default)]
pub struct TextPresenter {
    tiles: BTreeMap<TileValue, TileState>,
    highlights: BTreeMap<TileValue, Duration>,
    messages: Vec<FloatingText>,
    level_lines: Vec<String>,
    achievement_lines: Vec<String>,
}

impl TextPresenter {
    /// Creates an empty presenter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state reported for `value`.
    #[must_use]
    pub fn tile_state(&self, value: TileValue) -> TileState {
        self.tiles.get(&value).copied().unwrap_or(TileState::Normal)
    }

    /// Whether `value` currently carries a highlight.
    #[must_use]
    pub fn is_highlighted(&self, value: TileValue) -> bool {
        self.highlights.contains_key(&value)
    }

    /// Lets highlights expire after `elapsed` time.
    pub fn age(&mut self, elapsed: Duration) {
        self.highlights.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(elapsed);
            !remaining.is_zero()
        });
    }

    /// Removes and returns the floating texts queued since the last call.
    pub fn take_messages(&mut self) -> Vec<FloatingText> {
        std::mem::take(&mut self.messages)
    }

    /// Level list as rendered by the last menu refresh.
    #[must_use]
    pub fn level_lines(&self) -> &[String] {
        &self.level_lines
    }

    /// Achievement catalog as rendered by the last menu refresh.
    #[must_use]
    pub fn achievement_lines(&self) -> &[String] {
        &self.achievement_lines
    }
}

impl Presenter for TextPresenter {
    fn set_tile_state(&mut self, value: TileValue, state: TileState) {
        let _ = self.tiles.insert(value, state);
    }

    fn highlight_tile(&mut self, value: TileValue, duration: Duration) {
        let _ = self.highlights.insert(value, duration);
    }

    fn show_floating_text(&mut self, anchor: TextAnchor, text: &str) {
        self.messages.push(FloatingText {
            anchor,
            text: text.to_owned(),
        });
    }

    fn render_level_list(
        &mut self,
        levels: &[LevelDefinition],
        stars: &BTreeMap<LevelId, u8>,
        locked: &dyn Fn(LevelId) -> bool,
    ) {
        self.level_lines = levels
            .iter()
            .map(|level| {
                level_line(
                    level,
                    stars.get(&level.id()).copied().unwrap_or(0),
                    locked(level.id()),
                )
            })
            .collect();
    }

    fn render_achievement_list(
        &mut self,
        catalog: &[AchievementKey],
        unlocked: &BTreeSet<AchievementKey>,
    ) {
        self.achievement_lines = catalog
            .iter()
            .map(|key| achievement_line(*key, unlocked.contains(key)))
            .collect();
    }
}

/// Feedback sink that records cues for the adapter to play or print.
#[derive(Clone, Debug, Default)]
pub struct CueLog {
    cues: Vec<FeedbackCue>,
}

impl CueLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the cues recorded since the last call.
    pub fn drain(&mut self) -> Vec<FeedbackCue> {
        std::mem::take(&mut self.cues)
    }
}

impl FeedbackSink for CueLog {
    fn play_cue(&mut self, cue: FeedbackCue) {
        self.cues.push(cue);
    }
}

/// Heads-up display values shown above the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hud {
    /// Current score.
    pub score: u32,
    /// Current combo streak.
    pub combo: u32,
    /// Countdown remaining.
    pub time_left: Duration,
    /// Crystals whose phase is complete.
    pub primes_completed: usize,
    /// Crystals on the board.
    pub prime_count: usize,
}

impl Hud {
    /// Completed crystals as a whole percentage.
    #[must_use]
    pub fn progress_percent(&self) -> usize {
        if self.prime_count == 0 {
            return 0;
        }
        self.primes_completed * 100 / self.prime_count
    }
}

/// Formats a countdown as `MM:SS`.
#[must_use]
pub fn format_clock(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Formats a star rating as filled and empty stars.
#[must_use]
pub fn format_stars(stars: u8) -> String {
    let stars = stars.min(MAX_STARS);
    let mut text = "★".repeat(usize::from(stars));
    text.push_str(&"☆".repeat(usize::from(MAX_STARS - stars)));
    text
}

/// One line of the level selection list.
#[must_use]
pub fn level_line(level: &LevelDefinition, stars: u8, locked: bool) -> String {
    let mut line = format!(
        "{:>2}. {}  1-{:<4} {}",
        level.id().get(),
        format_stars(stars),
        level.max_number(),
        format_clock(level.time_limit())
    );
    if locked {
        line.push_str("  (locked)");
    }
    line
}

/// One line of the achievement catalog.
#[must_use]
pub fn achievement_line(key: AchievementKey, unlocked: bool) -> String {
    let info = key.info();
    let marker = if unlocked { "x" } else { " " };
    format!(
        "[{marker}] {} {}: {}",
        info.icon, info.title, info.description
    )
}

/// Floating text as a log line, placed on the board when it names a tile.
#[must_use]
pub fn floating_text_line(layout: &BoardLayout, message: &FloatingText) -> String {
    match message.anchor {
        TextAnchor::Tile(value) => match layout.cell_of(value) {
            Some((column, row)) => format!(
                "  {value} (row {}, col {}): {}",
                row + 1,
                column + 1,
                message.text
            ),
            None => format!("  {value}: {}", message.text),
        },
        TextAnchor::Center => format!(">> {}", message.text),
    }
}

/// Single status line summarizing the HUD.
#[must_use]
pub fn render_hud(hud: &Hud) -> String {
    format!(
        "Score {}  Combo x{}  Time {}  Crystals {}/{} ({}%)",
        hud.score,
        hud.combo,
        format_clock(hud.time_left),
        hud.primes_completed,
        hud.prime_count,
        hud.progress_percent()
    )
}

/// Draws the board as rows of tiles.
///
/// Selected crystals are wrapped in `[ ]`, finished crystals in `< >`,
/// highlighted tiles in `* *`, and collected stones are blanked out. When a
/// palette is supplied every tile is colored with ANSI escapes.
#[must_use]
pub fn render_board(
    presenter: &TextPresenter,
    layout: &BoardLayout,
    palette: Option<&Palette>,
) -> String {
    let width = layout.cell_width();
    let mut out = String::new();
    for row in 0..layout.rows() {
        let mut cells = Vec::new();
        for column in 0..layout.columns() {
            let Some(value) = layout.value_at(column, row) else {
                break;
            };
            let state = presenter.tile_state(value);
            let highlighted = presenter.is_highlighted(value);
            let cell = tile_cell(value, state, highlighted, width);
            cells.push(match palette {
                Some(palette) => {
                    let mut color = palette.tile(state);
                    if highlighted {
                        color = color.lighten(palette.highlight_boost);
                    }
                    format!("{}{cell}{ANSI_RESET}", color.ansi_foreground())
                }
                None => cell,
            });
        }
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    out
}

fn tile_cell(value: TileValue, state: TileState, highlighted: bool, width: usize) -> String {
    let (open, close) = match (state, highlighted) {
        (TileState::Eliminated, _) => return " ".repeat(width + 2),
        (_, true) => ('*', '*'),
        (TileState::Prime, false) => ('[', ']'),
        (TileState::Completed, false) => ('<', '>'),
        (TileState::Normal, false) => (' ', ' '),
    };
    format!("{open}{:>width$}{close}", value.get())
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Boards need at least one column.
    InvalidColumns {
        /// Provided column count that failed validation.
        columns: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColumns { columns } => {
                write!(f, "columns must be positive (received {columns})")
            }
        }
    }
}

impl Error for RenderingError {}
