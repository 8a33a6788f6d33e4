//! Rows of cells
//!
//! Row-level editing used by the framebuffer. Every operation clamps its
//! column arguments and leaves wide characters whole: a lead cell always has
//! its continuation on its right, and a continuation always has its lead on
//! its left. Operations that would split a pair blank both halves.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Renditions};

/// A single row of the terminal grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    /// Create a row of `cols` blank cells carrying `renditions`
    pub fn new(cols: usize, renditions: &Renditions) -> Self {
        Self {
            cells: vec![Cell::blank(renditions.clone()); cols],
        }
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cells.len()
    }

    /// Get cell at column
    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    /// Get all cells
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// True when every cell is a default blank
    pub fn is_default_blank(&self) -> bool {
        self.cells
            .iter()
            .all(|c| c.is_blank() && c.renditions == Renditions::default())
    }

    /// Blank the whole row
    pub fn clear(&mut self, renditions: &Renditions) {
        for cell in &mut self.cells {
            cell.reset(renditions);
        }
    }

    /// Resize to `cols` columns, keeping the leftmost cells
    pub fn resize(&mut self, cols: usize, renditions: &Renditions) {
        self.cells.resize(cols, Cell::blank(renditions.clone()));
        self.repair_edges(renditions);
    }

    /// Store `cell` at `col`, blanking the other half of any wide
    /// character it partially overwrites. A wide `cell` also fills the
    /// continuation at `col + 1`; it is dropped if that column does not exist.
    pub fn put(&mut self, col: usize, cell: Cell, renditions: &Renditions) {
        let width = if cell.is_wide() { 2 } else { 1 };
        if col + width > self.cols() {
            return;
        }
        self.break_pair_at(col, renditions);
        self.break_pair_at(col + width - 1, renditions);
        let cont = Cell::continuation(cell.renditions.clone());
        self.cells[col] = cell;
        if width == 2 {
            self.cells[col + 1] = cont;
        }
    }

    /// Mutable access to a cell for in-place edits that keep its width
    /// (combining marks)
    pub fn cell_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    /// Blank columns `start..end`, widened to cover whole wide characters
    pub fn erase(&mut self, start: usize, end: usize, renditions: &Renditions) {
        let end = end.min(self.cols());
        if start >= end {
            return;
        }
        let (start, end) = self.widen(start, end);
        for cell in &mut self.cells[start..end] {
            cell.reset(renditions);
        }
    }

    /// Insert `count` blank cells at `col`, shifting the rest right.
    /// Cells pushed past the right edge are lost.
    pub fn insert_cells(&mut self, col: usize, count: usize, renditions: &Renditions) {
        let cols = self.cols();
        if col >= cols {
            return;
        }
        self.break_pair_at(col, renditions);
        let count = count.min(cols - col);
        self.cells[col..].rotate_right(count);
        for cell in &mut self.cells[col..col + count] {
            cell.reset(renditions);
        }
        self.repair_edges(renditions);
    }

    /// Delete `count` cells at `col`, shifting the rest left and filling
    /// the right edge with blanks
    pub fn delete_cells(&mut self, col: usize, count: usize, renditions: &Renditions) {
        let cols = self.cols();
        if col >= cols {
            return;
        }
        let count = count.min(cols - col);
        self.break_pair_at(col, renditions);
        self.break_pair_at(col + count - 1, renditions);
        self.cells[col..].rotate_left(count);
        for cell in &mut self.cells[cols - count..] {
            cell.reset(renditions);
        }
        self.repair_edges(renditions);
    }

    /// Text content of the row with trailing blanks trimmed
    pub fn text(&self) -> String {
        let mut text = String::new();
        for cell in &self.cells {
            if !cell.is_continuation() {
                text.push_str(cell.display_str());
            }
        }
        text.trim_end().to_string()
    }

    /// Grow `start..end` so it does not split a wide character
    fn widen(&self, mut start: usize, mut end: usize) -> (usize, usize) {
        if start > 0 && self.cells[start].is_continuation() {
            start -= 1;
        }
        if end < self.cols() && self.cells[end].is_continuation() {
            end += 1;
        }
        (start, end)
    }

    /// If `col` holds half of a wide character, blank both halves
    fn break_pair_at(&mut self, col: usize, renditions: &Renditions) {
        let Some(cell) = self.cells.get(col) else {
            return;
        };
        if cell.is_continuation() {
            self.cells[col].reset(renditions);
            if col > 0 && self.cells[col - 1].is_wide() {
                self.cells[col - 1].reset(renditions);
            }
        } else if cell.is_wide() {
            self.cells[col].reset(renditions);
            if let Some(next) = self.cells.get_mut(col + 1) {
                if next.is_continuation() {
                    next.reset(renditions);
                }
            }
        }
    }

    /// Blank orphaned halves left behind by shifting or truncation
    fn repair_edges(&mut self, renditions: &Renditions) {
        for col in 0..self.cols() {
            let orphan = if self.cells[col].is_continuation() {
                col == 0 || !self.cells[col - 1].is_wide()
            } else if self.cells[col].is_wide() {
                self.cells
                    .get(col + 1)
                    .map_or(true, |next| !next.is_continuation())
            } else {
                false
            };
            if orphan {
                self.cells[col].reset(renditions);
            }
        }
    }
}
