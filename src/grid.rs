use rand::Rng;

/// Live/dead pixel matrix for a bounded (non-toroidal) Life universe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl Grid {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        debug_assert!(rows > 0 && cols > 0, "grid must not be empty");
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    pub(crate) fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let mut grid = Self::new(rows, cols);
        grid.randomize(rng);
        grid
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Anything outside the board reads as dead.
    pub(crate) fn is_alive(&self, row: usize, col: usize) -> bool {
        self.contains(row, col) && self.cells[self.idx(row, col)]
    }

    /// Returns `false` (and does nothing) when the position is off the board.
    pub(crate) fn set(&mut self, row: usize, col: usize, alive: bool) -> bool {
        if !self.contains(row, col) {
            return false;
        }
        let i = self.idx(row, col);
        self.cells[i] = alive;
        true
    }

    /// Flips one pixel and returns its new state, or `None` off the board.
    pub(crate) fn toggle(&mut self, row: usize, col: usize) -> Option<bool> {
        if !self.contains(row, col) {
            return None;
        }
        let i = self.idx(row, col);
        self.cells[i] = !self.cells[i];
        Some(self.cells[i])
    }

    /// Kills every pixel in the `height` x `width` block at (`row`, `col`),
    /// clipped to the board.
    pub(crate) fn clear_block(&mut self, row: usize, col: usize, height: usize, width: usize) {
        for r in row..(row + height).min(self.rows) {
            for c in col..(col + width).min(self.cols) {
                let i = self.idx(r, c);
                self.cells[i] = false;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub(crate) fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for cell in &mut self.cells {
            *cell = rng.gen_bool(0.5);
        }
    }

    pub(crate) fn population(&self) -> usize {
        self.cells.iter().filter(|&&alive| alive).count()
    }

    /// Counts live neighbours, skipping offsets that fall off the board
    /// instead of wrapping: corners see 3 positions, edges 5, interior 8.
    pub(crate) fn live_neighbors(&self, row: usize, col: usize) -> u8 {
        let mut n = 0u8;
        for dy in [-1isize, 0, 1] {
            for dx in [-1isize, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (Some(r), Some(c)) = (row.checked_add_signed(dy), col.checked_add_signed(dx))
                else {
                    continue;
                };
                if self.is_alive(r, c) {
                    n += 1;
                }
            }
        }
        n
    }

    /// Replaces the board with its next generation.
    ///
    /// Neighbour counts are read from a full copy of the current cells, so
    /// each call costs one `rows * cols` allocation and copy; no
    /// half-updated generation is ever visible to the caller.
    pub(crate) fn advance(&mut self) {
        let previous = self.clone();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let alive = previous.is_alive(row, col);
                let n = previous.live_neighbors(row, col);
                let next = match (alive, n) {
                    (true, 2) | (true, 3) => true, // survival
                    (false, 3) => true,            // birth
                    _ => false,
                };
                let i = self.idx(row, col);
                self.cells[i] = next;
            }
        }
    }
}
