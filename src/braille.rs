use crate::grid::Grid;

// Each terminal cell is a 2x4 block of pixels packed into one glyph from the
// Unicode Braille Patterns block (U+2800..=U+28FF).
pub(crate) const BRAILLE_BASE: u32 = 0x2800;
pub(crate) const BLOCK_W: usize = 2;
pub(crate) const BLOCK_H: usize = 4;

// Braille dot numbers by (row, col) inside a block. Dot `n` is bit `n - 1`.
const DOTS: [[u8; BLOCK_W]; BLOCK_H] = [
    [1, 4],
    [2, 5],
    [3, 6],
    [7, 8],
];

/// Bit mask for the pixel at (`row`, `col`) within a block.
pub(crate) fn dot_mask(row: usize, col: usize) -> u8 {
    1 << (DOTS[row][col] - 1)
}

/// Position (row, col) within a block of Braille dot `dot` (1..=8).
pub(crate) fn dot_position(dot: u8) -> Option<(usize, usize)> {
    for (row, cols) in DOTS.iter().enumerate() {
        for (col, &d) in cols.iter().enumerate() {
            if d == dot {
                return Some((row, col));
            }
        }
    }
    None
}

fn braille_char(code: u32) -> char {
    char::from_u32(code).unwrap_or(' ')
}

/// Glyph buffer covering a [`Grid`] at one glyph per 2x4 pixel block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GlyphMatrix {
    rows: usize,
    cols: usize,
    glyphs: Vec<u32>,
}

impl GlyphMatrix {
    /// Sized for `grid`; partial blocks on the right/bottom edge still get a glyph.
    pub(crate) fn for_grid(grid: &Grid) -> Self {
        let rows = grid.rows().div_ceil(BLOCK_H);
        let cols = grid.cols().div_ceil(BLOCK_W);
        Self {
            rows,
            cols,
            glyphs: vec![BRAILLE_BASE; rows * cols],
        }
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

    pub(crate) fn code(&self, row: usize, col: usize) -> u32 {
        self.glyphs[self.idx(row, col)]
    }

    pub(crate) fn glyph(&self, row: usize, col: usize) -> char {
        braille_char(self.code(row, col))
    }

    pub(crate) fn row_string(&self, row: usize) -> String {
        (0..self.cols).map(|col| self.glyph(row, col)).collect()
    }

    /// Re-encodes every glyph from `grid`.
    pub(crate) fn render(&mut self, grid: &Grid) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                self.render_cell(grid, row, col);
            }
        }
    }

    /// Re-encodes the single glyph at (`row`, `col`). Each dot bit is cleared
    /// before the pixel is tested, so pixels that died are erased.
    pub(crate) fn render_cell(&mut self, grid: &Grid, row: usize, col: usize) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let i = self.idx(row, col);
        for dy in 0..BLOCK_H {
            for dx in 0..BLOCK_W {
                let mask = u32::from(dot_mask(dy, dx));
                self.glyphs[i] &= !mask;
                if grid.is_alive(row * BLOCK_H + dy, col * BLOCK_W + dx) {
                    self.glyphs[i] |= mask;
                }
            }
        }
    }
}
