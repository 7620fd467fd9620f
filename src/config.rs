use clap::Parser;
use crate::braille::{BLOCK_H, BLOCK_W};
use std::{str::FromStr, time::Duration};

#[derive(Parser, Debug, Clone)]
#[command(name = "braille-life")]
#[command(about = "Conway's Game of Life in the terminal, drawn with Braille dots", long_about = None)]
#[command(version)]
pub(crate) struct Config {
    /// the size of the game board, <width>x<height>
    #[arg(short, long, default_value = "100x80")]
    pub(crate) size: BoardSize,

    /// the time between ticks (in milliseconds)
    #[arg(short, long, default_value_t = 50)]
    pub(crate) tick: u64,

    /// toggle pixels with the digit row (Braille dots 1-8) instead of the numpad
    #[arg(long, default_value_t = false)]
    pub(crate) no_numpad: bool,

    /// start from an empty board
    #[arg(long, default_value_t = false)]
    pub(crate) empty: bool,

    /// seed for the random board (defaults to OS entropy)
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

impl Config {
    pub(crate) fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick)
    }

    pub(crate) fn layout(&self) -> KeyLayout {
        if self.no_numpad {
            KeyLayout::DigitRow
        } else {
            KeyLayout::Numpad
        }
    }
}

/// Which keys toggle the eight pixels under the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeyLayout {
    Numpad,
    DigitRow,
}

/// Board dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BoardSize {
    pub(crate) cols: usize,
    pub(crate) rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum SizeError {
    #[error("size must be in the form <width>x<height>")]
    Malformed,
    #[error("size dimensions must be positive")]
    NotPositive,
    #[error("size is too large to draw")]
    TooLarge,
}

impl FromStr for BoardSize {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.split_once('x').ok_or(SizeError::Malformed)?;
        if h.contains('x') {
            return Err(SizeError::Malformed);
        }
        let cols: usize = w.trim().parse().map_err(|_| SizeError::Malformed)?;
        let rows: usize = h.trim().parse().map_err(|_| SizeError::Malformed)?;
        if cols == 0 || rows == 0 {
            return Err(SizeError::NotPositive);
        }
        // Cursor moves are u16 cells wide.
        let fits = |pixels: usize, block: usize| pixels.div_ceil(block) <= usize::from(u16::MAX);
        if cols.checked_mul(rows).is_none() || !fits(cols, BLOCK_W) || !fits(rows, BLOCK_H) {
            return Err(SizeError::TooLarge);
        }
        Ok(Self { cols, rows })
    }
}
