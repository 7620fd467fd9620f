use crate::braille::{GlyphMatrix, BLOCK_H, BLOCK_W};
use crate::display::{Display, Parking};
use crate::grid::Grid;
use crate::input::{Action, Direction, KeyMap};
use crossterm::event::KeyEvent;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Running,
    Paused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// Cursor position in glyph cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub(crate) x: usize,
    pub(crate) y: usize,
}

impl Cursor {
    /// One step in `dir`, staying inside a `cols` x `rows` frame.
    fn stepped(self, dir: Direction, cols: usize, rows: usize) -> Self {
        let mut c = self;
        match dir {
            Direction::Up => c.y = c.y.saturating_sub(1),
            Direction::Down => c.y = (c.y + 1).min(rows.saturating_sub(1)),
            Direction::Left => c.x = c.x.saturating_sub(1),
            Direction::Right => c.x = (c.x + 1).min(cols.saturating_sub(1)),
        }
        c
    }

    fn offset(self) -> (isize, isize) {
        (self.x as isize, self.y as isize)
    }
}

/// Simulation state plus the pause/edit state machine.
///
/// The physical terminal cursor sits on the frame origin while running and
/// on the glyph cell under `cursor` while paused; every transition keeps
/// that true.
pub(crate) struct Session {
    grid: Grid,
    glyphs: GlyphMatrix,
    mode: Mode,
    cursor: Cursor,
    keys: KeyMap,
    rng: StdRng,
    parking: Arc<Parking>,
}

impl Session {
    pub(crate) fn new(grid: Grid, keys: KeyMap, rng: StdRng) -> Self {
        let mut glyphs = GlyphMatrix::for_grid(&grid);
        glyphs.render(&grid);
        let session = Self {
            grid,
            glyphs,
            mode: Mode::Running,
            cursor: Cursor::default(),
            keys,
            rng,
            parking: Arc::default(),
        };
        session.publish_parking();
        session
    }

    /// Shared view of where the cursor must go to leave the frame.
    pub(crate) fn parking(&self) -> Arc<Parking> {
        Arc::clone(&self.parking)
    }

    /// (left, down) from the physical cursor to the line below the frame.
    fn exit_offset(&self) -> (usize, usize) {
        match self.mode {
            Mode::Running => (0, self.glyphs.rows()),
            Mode::Paused => (self.cursor.x, self.glyphs.rows() - self.cursor.y),
        }
    }

    fn publish_parking(&self) {
        let (left, down) = self.exit_offset();
        self.parking.set(left, down);
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[cfg(test)]
    pub(crate) fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Paints the whole frame. Only valid while the cursor is on the origin.
    pub(crate) fn draw(&mut self, display: &mut impl Display) -> anyhow::Result<()> {
        display.paint(&self.glyphs)?;
        display.flush()
    }

    /// One tick: next generation, re-encode, repaint.
    pub(crate) fn step(&mut self, display: &mut impl Display) -> anyhow::Result<()> {
        self.grid.advance();
        self.glyphs.render(&self.grid);
        debug!(population = self.grid.population(), "generation");
        self.draw(display)
    }

    pub(crate) fn handle_key(
        &mut self,
        key: &KeyEvent,
        display: &mut impl Display,
    ) -> anyhow::Result<Flow> {
        match self.keys.action(key) {
            Some(action) => self.handle(action, display),
            None => Ok(Flow::Continue),
        }
    }

    pub(crate) fn handle(
        &mut self,
        action: Action,
        display: &mut impl Display,
    ) -> anyhow::Result<Flow> {
        match (self.mode, action) {
            (_, Action::Quit) => return Ok(Flow::Quit),
            (Mode::Running, Action::TogglePause) => {
                self.mode = Mode::Paused;
                let (dx, dy) = self.cursor.offset();
                display.move_cursor(dx, dy)?;
                display.set_cursor_visible(true)?;
                info!(x = self.cursor.x, y = self.cursor.y, "paused");
            }
            (Mode::Paused, Action::TogglePause) => {
                let (dx, dy) = self.cursor.offset();
                display.set_cursor_visible(false)?;
                display.move_cursor(-dx, -dy)?;
                self.mode = Mode::Running;
                info!("resumed");
            }
            (Mode::Paused, Action::Move(dir)) => {
                let next = self
                    .cursor
                    .stepped(dir, self.glyphs.cols(), self.glyphs.rows());
                if next == self.cursor {
                    return Ok(Flow::Continue);
                }
                let (x0, y0) = self.cursor.offset();
                let (x1, y1) = next.offset();
                self.cursor = next;
                display.move_cursor(x1 - x0, y1 - y0)?;
            }
            (Mode::Paused, Action::TogglePixel { row, col }) => {
                let r = self.cursor.y * BLOCK_H + row;
                let c = self.cursor.x * BLOCK_W + col;
                if self.grid.toggle(r, c).is_none() {
                    return Ok(Flow::Continue);
                }
                self.repaint_cursor_cell(display)?;
            }
            (Mode::Paused, Action::ClearCell) => {
                self.grid.clear_block(
                    self.cursor.y * BLOCK_H,
                    self.cursor.x * BLOCK_W,
                    BLOCK_H,
                    BLOCK_W,
                );
                self.repaint_cursor_cell(display)?;
            }
            (_, Action::ClearAll) => {
                self.grid.clear();
                info!("board cleared");
                self.rerender_all(display)?;
            }
            (_, Action::Randomize) => {
                self.grid.randomize(&mut self.rng);
                info!(population = self.grid.population(), "board randomized");
                self.rerender_all(display)?;
            }
            // Editing is only possible while paused.
            (Mode::Running, _) => return Ok(Flow::Continue),
        }
        self.publish_parking();
        display.flush()?;
        Ok(Flow::Continue)
    }

    fn repaint_cursor_cell(&mut self, display: &mut impl Display) -> anyhow::Result<()> {
        let Cursor { x, y } = self.cursor;
        self.glyphs.render_cell(&self.grid, y, x);
        display.paint_cell(self.glyphs.glyph(y, x))
    }

    /// Re-encodes and repaints the whole board. While paused this hops to the
    /// origin and back to the cursor.
    fn rerender_all(&mut self, display: &mut impl Display) -> anyhow::Result<()> {
        self.glyphs.render(&self.grid);
        let (dx, dy) = match self.mode {
            Mode::Running => return display.paint(&self.glyphs),
            Mode::Paused => self.cursor.offset(),
        };
        display.move_cursor(-dx, -dy)?;
        display.paint(&self.glyphs)?;
        display.move_cursor(dx, dy)
    }

    /// Parks the cursor on the line below the frame, ready for exit.
    pub(crate) fn leave(&mut self, display: &mut impl Display) -> anyhow::Result<()> {
        let (left, down) = self.exit_offset();
        display.move_cursor(-(left as isize), down as isize)?;
        display.set_cursor_visible(true)?;
        display.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyLayout;
    use crate::display::{Op, Recorder};
    use crossterm::event::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    fn session(grid: Grid) -> Session {
        Session::new(grid, KeyMap::new(KeyLayout::Numpad), StdRng::seed_from_u64(1))
    }

    fn differing_pixels(a: &Grid, b: &Grid) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for r in 0..a.rows() {
            for c in 0..a.cols() {
                if a.is_alive(r, c) != b.is_alive(r, c) {
                    out.push((r, c));
                }
            }
        }
        out
    }

    fn paused(grid: Grid) -> (Session, Recorder) {
        let mut s = session(grid);
        let mut d = Recorder::default();
        s.handle(Action::TogglePause, &mut d).unwrap();
        d.ops.clear();
        (s, d)
    }

    #[test]
    fn starts_running_at_origin() {
        let s = session(Grid::new(8, 8));
        assert_eq!(s.mode(), Mode::Running);
        assert_eq!(s.cursor(), Cursor { x: 0, y: 0 });
    }

    #[test]
    fn pause_leaves_grid_untouched_and_shows_cursor() {
        let g = Grid::random(12, 10, &mut StdRng::seed_from_u64(5));
        let mut s = session(g.clone());
        let mut d = Recorder::default();

        assert_eq!(s.handle(Action::TogglePause, &mut d).unwrap(), Flow::Continue);
        assert_eq!(s.mode(), Mode::Paused);
        assert_eq!(s.grid(), &g);
        assert_eq!(
            d.ops,
            vec![Op::Move(0, 0), Op::CursorVisible(true), Op::Flush]
        );
    }

    #[test]
    fn resume_hides_cursor_and_returns_to_origin() {
        let (mut s, mut d) = paused(Grid::new(16, 16));
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        d.ops.clear();

        s.handle(Action::TogglePause, &mut d).unwrap();
        assert_eq!(s.mode(), Mode::Running);
        assert_eq!(
            d.ops,
            vec![Op::CursorVisible(false), Op::Move(-1, -1), Op::Flush]
        );
    }

    #[test]
    fn toggle_flips_exactly_one_pixel() {
        let g = Grid::random(16, 16, &mut StdRng::seed_from_u64(11));
        let (mut s, mut d) = paused(g.clone());
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        d.ops.clear();

        s.handle(Action::TogglePixel { row: 2, col: 1 }, &mut d).unwrap();

        assert_eq!(differing_pixels(&g, s.grid()), vec![(4 + 2, 2 + 1)]);
        let mut expected = GlyphMatrix::for_grid(s.grid());
        expected.render(s.grid());
        assert_eq!(
            d.ops,
            vec![Op::PaintCell(expected.glyph(1, 1)), Op::Flush]
        );
    }

    #[test]
    fn toggle_key_goes_through_key_map() {
        let (mut s, mut d) = paused(Grid::new(4, 2));
        // numpad '.' is the bottom-right dot
        let key = KeyEvent::new(KeyCode::Char('.'), KeyModifiers::NONE);
        s.handle_key(&key, &mut d).unwrap();
        assert!(s.grid().is_alive(3, 1));
        assert_eq!(d.ops, vec![Op::PaintCell('\u{2880}'), Op::Flush]);
    }

    #[test]
    fn toggle_outside_a_partial_block_is_ignored() {
        // 5 rows: the second glyph row only has pixel row 4.
        let (mut s, mut d) = paused(Grid::new(5, 2));
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        d.ops.clear();

        s.handle(Action::TogglePixel { row: 1, col: 0 }, &mut d).unwrap();
        assert_eq!(s.grid().population(), 0);
        assert!(d.ops.is_empty());

        s.handle(Action::TogglePixel { row: 0, col: 0 }, &mut d).unwrap();
        assert!(s.grid().is_alive(4, 0));
    }

    #[test]
    fn clear_cell_zeroes_only_the_block_under_cursor() {
        let mut g = Grid::new(8, 6);
        for r in 0..8 {
            for c in 0..6 {
                g.set(r, c, true);
            }
        }
        let (mut s, mut d) = paused(g.clone());
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        d.ops.clear();

        s.handle(Action::ClearCell, &mut d).unwrap();

        let mut cleared = differing_pixels(&g, s.grid());
        cleared.sort_unstable();
        let expected: Vec<_> = (4..8).flat_map(|r| (2..4).map(move |c| (r, c))).collect();
        assert_eq!(cleared, expected);
        assert_eq!(d.ops, vec![Op::PaintCell('\u{2800}'), Op::Flush]);
    }

    #[test]
    fn cursor_clamps_at_every_edge() {
        // 3x2 glyph cells
        let (mut s, mut d) = paused(Grid::new(8, 6));

        s.handle(Action::Move(Direction::Up), &mut d).unwrap();
        s.handle(Action::Move(Direction::Left), &mut d).unwrap();
        assert_eq!(s.cursor(), Cursor { x: 0, y: 0 });
        assert!(d.ops.is_empty());

        for _ in 0..5 {
            s.handle(Action::Move(Direction::Right), &mut d).unwrap();
            s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        }
        assert_eq!(s.cursor(), Cursor { x: 2, y: 1 });

        d.ops.clear();
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        assert_eq!(s.cursor(), Cursor { x: 2, y: 1 });
        assert!(d.ops.is_empty());
    }

    #[test]
    fn moves_reposition_the_physical_cursor() {
        let (mut s, mut d) = paused(Grid::new(8, 8));
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        s.handle(Action::Move(Direction::Left), &mut d).unwrap();
        let moves: Vec<_> = d.ops.into_iter().filter(|op| *op != Op::Flush).collect();
        assert_eq!(moves, vec![Op::Move(1, 0), Op::Move(0, 1), Op::Move(-1, 0)]);
    }

    #[test]
    fn edits_are_ignored_while_running() {
        let g = Grid::random(8, 8, &mut StdRng::seed_from_u64(2));
        let mut s = session(g.clone());
        let mut d = Recorder::default();
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::TogglePixel { row: 0, col: 0 }, &mut d).unwrap();
        s.handle(Action::ClearCell, &mut d).unwrap();
        assert_eq!(s.grid(), &g);
        assert_eq!(s.cursor(), Cursor::default());
        assert!(d.ops.is_empty());
    }

    #[test]
    fn clear_all_while_paused_repaints_in_place() {
        let g = Grid::random(8, 4, &mut StdRng::seed_from_u64(8));
        let (mut s, mut d) = paused(g);
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        d.ops.clear();

        s.handle(Action::ClearAll, &mut d).unwrap();
        assert_eq!(s.grid().population(), 0);
        let blank = "\u{2800}\u{2800}".to_string();
        assert_eq!(
            d.ops,
            vec![
                Op::Move(0, -1),
                Op::Paint(vec![blank.clone(), blank]),
                Op::Move(0, 1),
                Op::Flush,
            ]
        );
    }

    #[test]
    fn clear_all_while_running_repaints_from_origin() {
        let g = Grid::random(8, 4, &mut StdRng::seed_from_u64(8));
        let mut s = session(g);
        let mut d = Recorder::default();
        s.handle(Action::ClearAll, &mut d).unwrap();
        assert_eq!(s.grid().population(), 0);
        assert_eq!(s.mode(), Mode::Running);
        let blank = "\u{2800}\u{2800}".to_string();
        assert_eq!(
            d.ops,
            vec![Op::Paint(vec![blank.clone(), blank]), Op::Flush]
        );
    }

    #[test]
    fn pause_right_after_clear_all_shows_the_cleared_board() {
        let mut full = Grid::new(4, 2);
        for r in 0..4 {
            for c in 0..2 {
                full.set(r, c, true);
            }
        }
        let mut s = session(full);
        let mut d = Recorder::default();
        s.draw(&mut d).unwrap();

        s.handle(Action::ClearAll, &mut d).unwrap();
        s.handle(Action::TogglePause, &mut d).unwrap();

        assert_eq!(s.mode(), Mode::Paused);
        let last_paint = d.ops.iter().rev().find_map(|op| match op {
            Op::Paint(rows) => Some(rows.clone()),
            _ => None,
        });
        assert_eq!(last_paint, Some(vec!["\u{2800}".to_string()]));
    }

    #[test]
    fn randomize_while_running_is_painted_before_the_next_step() {
        let mut s = session(Grid::new(8, 8));
        let mut d = Recorder::default();
        s.handle(Action::Randomize, &mut d).unwrap();

        let mut shown = GlyphMatrix::for_grid(s.grid());
        shown.render(s.grid());
        let rows: Vec<String> = (0..shown.rows()).map(|r| shown.row_string(r)).collect();
        assert_eq!(d.ops, vec![Op::Paint(rows), Op::Flush]);
    }

    #[test]
    fn randomize_refills_the_board() {
        let (mut s, mut d) = paused(Grid::new(16, 16));
        s.handle(Action::Randomize, &mut d).unwrap();
        assert!(s.grid().population() > 0);
        assert!(d.ops.iter().any(|op| matches!(op, Op::Paint(_))));
    }

    #[test]
    fn quit_from_either_state() {
        let mut d = Recorder::default();
        let mut s = session(Grid::new(4, 4));
        assert_eq!(s.handle(Action::Quit, &mut d).unwrap(), Flow::Quit);
        let (mut s, mut d) = paused(Grid::new(4, 4));
        assert_eq!(s.handle(Action::Quit, &mut d).unwrap(), Flow::Quit);
    }

    #[test]
    fn unmapped_keys_change_nothing() {
        let (mut s, mut d) = paused(Grid::new(4, 4));
        let key = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
        assert_eq!(s.handle_key(&key, &mut d).unwrap(), Flow::Continue);
        assert_eq!(s.mode(), Mode::Paused);
        assert!(d.ops.is_empty());
    }

    #[test]
    fn step_advances_and_paints() {
        let mut g = Grid::new(5, 5);
        for c in 1..4 {
            g.set(2, c, true);
        }
        let mut s = session(g);
        let mut d = Recorder::default();
        s.step(&mut d).unwrap();
        assert!(s.grid().is_alive(1, 2) && s.grid().is_alive(3, 2));
        assert!(!s.grid().is_alive(2, 1));
        assert!(matches!(d.ops.as_slice(), [Op::Paint(rows), Op::Flush] if rows.len() == 2));
    }

    #[test]
    fn parking_follows_pause_and_cursor_moves() {
        // 3 glyph rows x 4 glyph cols
        let mut s = session(Grid::new(12, 8));
        let parking = s.parking();
        let mut d = Recorder::default();
        assert_eq!(parking.get(), (0, 3));

        s.handle(Action::TogglePause, &mut d).unwrap();
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        assert_eq!(parking.get(), (2, 2));

        s.handle(Action::TogglePause, &mut d).unwrap();
        assert_eq!(parking.get(), (0, 3));
    }

    #[test]
    fn leave_parks_below_the_frame() {
        let (mut s, mut d) = paused(Grid::new(12, 8));
        s.handle(Action::Move(Direction::Right), &mut d).unwrap();
        s.handle(Action::Move(Direction::Down), &mut d).unwrap();
        d.ops.clear();

        s.leave(&mut d).unwrap();
        assert_eq!(
            d.ops,
            vec![Op::Move(-1, 2), Op::CursorVisible(true), Op::Flush]
        );
    }
}
