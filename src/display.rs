use crate::braille::GlyphMatrix;
use crossterm::{
    cursor, execute, queue,
    style::Print,
    terminal,
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Write-only sink for frames and cursor moves.
///
/// The frame origin is the top-left glyph. `paint` starts and ends there;
/// every other operation is relative to wherever the cursor currently is.
pub(crate) trait Display {
    fn paint(&mut self, glyphs: &GlyphMatrix) -> anyhow::Result<()>;
    /// Redraws one glyph at the cursor and leaves the cursor where it was.
    fn paint_cell(&mut self, glyph: char) -> anyhow::Result<()>;
    fn move_cursor(&mut self, dx: isize, dy: isize) -> anyhow::Result<()>;
    fn set_cursor_visible(&mut self, visible: bool) -> anyhow::Result<()>;
    fn flush(&mut self) -> anyhow::Result<()>;
}

// Board sizes are capped at parse time so frame moves always fit.
fn steps(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// In-place renderer for a raw-mode terminal.
pub(crate) struct TerminalDisplay<W: Write> {
    out: W,
}

impl<W: Write> TerminalDisplay<W> {
    pub(crate) fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Display for TerminalDisplay<W> {
    fn paint(&mut self, glyphs: &GlyphMatrix) -> anyhow::Result<()> {
        for row in 0..glyphs.rows() {
            queue!(self.out, Print(glyphs.row_string(row)), Print("\r\n"))?;
        }
        queue!(self.out, cursor::MoveUp(steps(glyphs.rows())))?;
        Ok(())
    }

    fn paint_cell(&mut self, glyph: char) -> anyhow::Result<()> {
        queue!(
            self.out,
            cursor::SavePosition,
            Print(glyph),
            cursor::RestorePosition
        )?;
        Ok(())
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) -> anyhow::Result<()> {
        // A zero count means "one" to most terminals, so skip empty moves.
        if dx > 0 {
            queue!(self.out, cursor::MoveRight(steps(dx.unsigned_abs())))?;
        } else if dx < 0 {
            queue!(self.out, cursor::MoveLeft(steps(dx.unsigned_abs())))?;
        }
        if dy > 0 {
            queue!(self.out, cursor::MoveDown(steps(dy.unsigned_abs())))?;
        } else if dy < 0 {
            queue!(self.out, cursor::MoveUp(steps(dy.unsigned_abs())))?;
        }
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> anyhow::Result<()> {
        if visible {
            queue!(self.out, cursor::Show)?;
        } else {
            queue!(self.out, cursor::Hide)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Raw mode plus hidden cursor for the lifetime of the guard.
pub(crate) struct TermGuard;

impl TermGuard {
    pub(crate) fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Shows the cursor and leaves raw mode. Safe to call from any thread.
pub(crate) fn restore_terminal() {
    let mut out = io::stdout();
    let _ = execute!(out, cursor::Show);
    let _ = out.flush();
    let _ = terminal::disable_raw_mode();
}

/// Relative move from the current cursor to the line below the frame.
///
/// Published by the session after every transition so a thread that never
/// sees the session (the interrupt path) can still park the cursor.
#[derive(Debug, Default)]
pub(crate) struct Parking {
    left: AtomicUsize,
    down: AtomicUsize,
}

impl Parking {
    pub(crate) fn set(&self, left: usize, down: usize) {
        self.left.store(left, Ordering::Relaxed);
        self.down.store(down, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> (usize, usize) {
        (
            self.left.load(Ordering::Relaxed),
            self.down.load(Ordering::Relaxed),
        )
    }

    /// Moves the cursor below the frame, then restores the terminal.
    pub(crate) fn park_and_restore(&self) {
        let (left, down) = self.get();
        let mut d = TerminalDisplay::new(io::stdout());
        let _ = d.move_cursor(-(left as isize), down as isize);
        let _ = d.flush();
        restore_terminal();
    }
}

/// Records display calls for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) ops: Vec<Op>,
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Paint(Vec<String>),
    PaintCell(char),
    Move(isize, isize),
    CursorVisible(bool),
    Flush,
}

#[cfg(test)]
impl Display for Recorder {
    fn paint(&mut self, glyphs: &GlyphMatrix) -> anyhow::Result<()> {
        let rows = (0..glyphs.rows()).map(|r| glyphs.row_string(r)).collect();
        self.ops.push(Op::Paint(rows));
        Ok(())
    }

    fn paint_cell(&mut self, glyph: char) -> anyhow::Result<()> {
        self.ops.push(Op::PaintCell(glyph));
        Ok(())
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) -> anyhow::Result<()> {
        self.ops.push(Op::Move(dx, dy));
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> anyhow::Result<()> {
        self.ops.push(Op::CursorVisible(visible));
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.ops.push(Op::Flush);
        Ok(())
    }
}
