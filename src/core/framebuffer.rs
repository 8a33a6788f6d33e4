//! Framebuffer
//!
//! The terminal's addressable state: a grid of cells plus cursor position,
//! scroll region, tab stops, mode flags and the current rendition used by
//! Print. Each semantic terminal operation has one method here. Methods never
//! index out of bounds: every row/column argument is clamped to the grid, and
//! the cursor is never left on the continuation half of a wide character.
//!
//! Autowrap is immediate: printing into the last column moves the cursor to
//! the start of the next row at once, scrolling the region when the cursor
//! was on its bottom row.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::cell::{char_width, Cell, Renditions};
use super::cursor::{Cursor, SavedCursor};
use super::grid::Row;
use super::modes::Modes;

/// Default tab stop interval
const TAB_WIDTH: usize = 8;

/// Terminal framebuffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Framebuffer {
    cols: usize,
    rows: usize,
    /// Visible rows, top first
    grid: Vec<Row>,
    cursor: Cursor,
    /// State captured by DECSC
    saved: SavedCursor,
    /// First row of the scroll region (inclusive)
    scroll_top: usize,
    /// Last row of the scroll region (inclusive)
    scroll_bottom: usize,
    modes: Modes,
    /// Rendition stamped onto printed and erased cells
    renditions: Renditions,
    /// Tab stops, one flag per column
    tabs: Vec<bool>,
    title: String,
    icon_name: String,
    /// Number of BEL characters received
    bell_count: u64,
    /// Cell that received the last printed glyph (target for combining marks)
    last_printed: Option<Cursor>,
    /// Last printed character (for REP)
    last_char: Option<char>,
}

impl Framebuffer {
    /// Create a blank framebuffer. Zero dimensions are raised to 1.
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let renditions = Renditions::default();
        Self {
            cols,
            rows,
            grid: vec![Row::new(cols, &renditions); rows],
            cursor: Cursor::default(),
            saved: SavedCursor::default(),
            scroll_top: 0,
            scroll_bottom: rows - 1,
            modes: Modes::default(),
            renditions,
            tabs: default_tabs(cols),
            title: String::new(),
            icon_name: String::new(),
            bell_count: 0,
            last_printed: None,
            last_char: None,
        }
    }

    /// Get number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// All rows, top first
    pub fn grid(&self) -> &[Row] {
        &self.grid
    }

    /// Get a row
    pub fn row(&self, row: usize) -> Option<&Row> {
        self.grid.get(row)
    }

    /// Get a cell
    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.grid.get(row).and_then(|r| r.cell(col))
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// Direct mode access for flags without side effects (keypad mode)
    pub fn modes_mut(&mut self) -> &mut Modes {
        &mut self.modes
    }

    /// Current rendition register
    pub fn renditions(&self) -> &Renditions {
        &self.renditions
    }

    /// Apply an SGR parameter list to the rendition register
    pub fn set_renditions(&mut self, params: &[u16]) {
        self.renditions.apply_sgr(params);
    }

    /// Scroll region as (top, bottom), inclusive and 0-indexed
    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    pub fn bell_count(&self) -> u64 {
        self.bell_count
    }

    /// Screen text, one line per row with trailing blanks trimmed
    pub fn text(&self) -> String {
        self.grid
            .iter()
            .map(Row::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ---------------------------------------------------------------
    // Printing
    // ---------------------------------------------------------------

    /// Print a character at the cursor and advance
    pub fn print(&mut self, c: char) {
        let width = char_width(c);
        if width == 0 {
            self.combine(c);
            return;
        }
        if width > self.cols {
            trace!(?c, "wide character does not fit a single-column screen");
            return;
        }

        if self.cursor.col + width > self.cols {
            // Wide character starting in the last column
            if self.modes.autowrap {
                self.wrap();
            } else {
                self.cursor.col = self.cols - width;
            }
        }

        let Cursor { col, row } = self.cursor;
        let renditions = self.renditions.clone();
        let line = &mut self.grid[row];
        if self.modes.insert {
            line.insert_cells(col, width, &renditions);
        }
        line.put(col, Cell::with_renditions(c, renditions.clone()), &renditions);
        self.last_printed = Some(Cursor::new(col, row));
        self.last_char = Some(c);

        let next = col + width;
        if next < self.cols {
            self.cursor.col = next;
        } else if self.modes.autowrap {
            self.wrap();
        } else {
            self.cursor.col = self.cols - 1;
            self.snap_cursor();
        }
    }

    /// Repeat the last printed character `n` times (REP)
    pub fn repeat_last(&mut self, n: usize) {
        if let Some(c) = self.last_char {
            for _ in 0..n.min(self.cols * self.rows) {
                self.print(c);
            }
        }
    }

    fn combine(&mut self, mark: char) {
        let Some(at) = self.last_printed else {
            trace!(?mark, "combining mark with nothing to attach to");
            return;
        };
        if let Some(cell) = self.grid.get_mut(at.row).and_then(|r| r.cell_mut(at.col)) {
            if !cell.is_continuation() {
                cell.combine(mark);
            }
        }
    }

    fn wrap(&mut self) {
        self.cursor.col = 0;
        self.index();
    }

    // ---------------------------------------------------------------
    // Line feeds and simple controls
    // ---------------------------------------------------------------

    /// Move down one row, scrolling the region at its bottom (IND)
    pub fn index(&mut self) {
        if self.cursor.row == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
            self.snap_cursor();
        }
    }

    /// LF/VT/FF: index, plus carriage return in newline mode
    pub fn linefeed(&mut self) {
        self.index();
        if self.modes.linefeed_newline {
            self.cursor.col = 0;
        }
    }

    /// Move up one row, scrolling the region down at its top (RI)
    pub fn reverse_index(&mut self) {
        if self.cursor.row == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.snap_cursor();
        }
    }

    /// Carriage return plus index (NEL)
    pub fn next_line(&mut self) {
        self.cursor.col = 0;
        self.index();
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.saturating_sub(1);
        self.snap_cursor();
    }

    /// Advance to the `n`th next tab stop (HT, CHT)
    pub fn tab(&mut self, n: usize) {
        for _ in 0..n.min(self.cols) {
            let next = (self.cursor.col + 1..self.cols).find(|&c| self.tabs[c]);
            self.cursor.col = next.unwrap_or(self.cols - 1);
        }
        self.snap_cursor();
    }

    /// Move back to the `n`th previous tab stop (CBT)
    pub fn back_tab(&mut self, n: usize) {
        for _ in 0..n.min(self.cols) {
            let prev = (0..self.cursor.col).rev().find(|&c| self.tabs[c]);
            self.cursor.col = prev.unwrap_or(0);
        }
        self.snap_cursor();
    }

    /// Set a tab stop at the cursor column (HTS)
    pub fn set_tab_stop(&mut self) {
        self.tabs[self.cursor.col] = true;
    }

    /// Clear tab stops (TBC): mode 0 clears the one at the cursor, 3 clears all
    pub fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => self.tabs[self.cursor.col] = false,
            3 => self.tabs.iter_mut().for_each(|t| *t = false),
            _ => trace!(mode, "unknown TBC mode"),
        }
    }

    pub fn ring_bell(&mut self) {
        self.bell_count = self.bell_count.wrapping_add(1);
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn set_icon_name(&mut self, name: String) {
        self.icon_name = name;
    }

    // ---------------------------------------------------------------
    // Cursor motion
    // ---------------------------------------------------------------

    /// Move cursor up, stopping at the top margin when inside the region
    pub fn move_cursor_up(&mut self, n: usize) {
        let top = if self.cursor.row >= self.scroll_top {
            self.scroll_top
        } else {
            0
        };
        self.cursor.row = self.cursor.row.saturating_sub(n).max(top);
        self.snap_cursor();
    }

    /// Move cursor down, stopping at the bottom margin when inside the region
    pub fn move_cursor_down(&mut self, n: usize) {
        let bottom = if self.cursor.row <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.rows - 1
        };
        self.cursor.row = self.cursor.row.saturating_add(n).min(bottom);
        self.snap_cursor();
    }

    pub fn move_cursor_forward(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_add(n).min(self.cols - 1);
        self.snap_cursor();
    }

    pub fn move_cursor_backward(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(n);
        self.snap_cursor();
    }

    /// Absolute positioning (CUP/HVP), 0-indexed; row is relative to the
    /// scroll region in origin mode
    pub fn move_cursor_to(&mut self, row: usize, col: usize) {
        self.cursor.row = self.clamp_row(row);
        self.cursor.col = col.min(self.cols - 1);
        self.snap_cursor();
    }

    /// Absolute column (CHA/HPA), 0-indexed
    pub fn move_cursor_to_col(&mut self, col: usize) {
        self.cursor.col = col.min(self.cols - 1);
        self.snap_cursor();
    }

    /// Absolute row (VPA), 0-indexed, origin-mode aware
    pub fn move_cursor_to_row(&mut self, row: usize) {
        self.cursor.row = self.clamp_row(row);
        self.snap_cursor();
    }

    fn clamp_row(&self, row: usize) -> usize {
        if self.modes.origin {
            self.scroll_top.saturating_add(row).min(self.scroll_bottom)
        } else {
            row.min(self.rows - 1)
        }
    }

    /// Keep the cursor off wide-character continuation cells
    fn snap_cursor(&mut self) {
        let Cursor { col, row } = self.cursor;
        if col > 0 && self.grid[row].cells()[col].is_continuation() {
            self.cursor.col = col - 1;
        }
    }

    /// DECSC
    pub fn save_cursor(&mut self) {
        self.saved = SavedCursor {
            cursor: self.cursor,
            renditions: self.renditions.clone(),
            origin: self.modes.origin,
            autowrap: self.modes.autowrap,
        };
    }

    /// DECRC
    pub fn restore_cursor(&mut self) {
        let saved = self.saved.clone();
        let row = if saved.origin {
            saved.cursor.row.clamp(self.scroll_top, self.scroll_bottom)
        } else {
            saved.cursor.row.min(self.rows - 1)
        };
        self.cursor = Cursor::new(saved.cursor.col.min(self.cols - 1), row);
        self.renditions = saved.renditions;
        self.modes.origin = saved.origin;
        self.modes.autowrap = saved.autowrap;
        self.snap_cursor();
    }

    // ---------------------------------------------------------------
    // Scrolling
    // ---------------------------------------------------------------

    /// Set the scroll region (DECSTBM), 0-indexed inclusive. Invalid
    /// regions are ignored. The cursor moves home.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = bottom.min(self.rows - 1);
        if top >= bottom {
            trace!(top, bottom, "ignoring empty scroll region");
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.move_cursor_to(0, 0);
    }

    /// Scroll the region up by `n` rows; new rows at the bottom are blank
    pub fn scroll_up(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }
        let renditions = self.renditions.clone();
        self.grid[top..=bottom].rotate_left(n);
        for row in &mut self.grid[bottom + 1 - n..=bottom] {
            row.clear(&renditions);
        }
        self.last_printed = self.last_printed.and_then(|p| {
            if p.row < top || p.row > bottom {
                Some(p)
            } else if p.row >= top + n {
                Some(Cursor::new(p.col, p.row - n))
            } else {
                None
            }
        });
        self.snap_cursor();
    }

    /// Scroll the region down by `n` rows; new rows at the top are blank
    pub fn scroll_down(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }
        let renditions = self.renditions.clone();
        self.grid[top..=bottom].rotate_right(n);
        for row in &mut self.grid[top..top + n] {
            row.clear(&renditions);
        }
        self.last_printed = None;
        self.snap_cursor();
    }

    /// Insert blank lines at the cursor row within the region (IL)
    pub fn insert_lines(&mut self, n: usize) {
        let (row, bottom) = (self.cursor.row, self.scroll_bottom);
        if row < self.scroll_top || row > bottom {
            return;
        }
        let n = n.min(bottom - row + 1);
        let renditions = self.renditions.clone();
        self.grid[row..=bottom].rotate_right(n);
        for line in &mut self.grid[row..row + n] {
            line.clear(&renditions);
        }
        self.cursor.col = 0;
    }

    /// Delete lines at the cursor row within the region (DL)
    pub fn delete_lines(&mut self, n: usize) {
        let (row, bottom) = (self.cursor.row, self.scroll_bottom);
        if row < self.scroll_top || row > bottom {
            return;
        }
        let n = n.min(bottom - row + 1);
        let renditions = self.renditions.clone();
        self.grid[row..=bottom].rotate_left(n);
        for line in &mut self.grid[bottom + 1 - n..=bottom] {
            line.clear(&renditions);
        }
        self.cursor.col = 0;
    }

    // ---------------------------------------------------------------
    // Character editing and erasing
    // ---------------------------------------------------------------

    /// Insert blank characters at the cursor (ICH)
    pub fn insert_chars(&mut self, n: usize) {
        let Cursor { col, row } = self.cursor;
        let renditions = self.renditions.clone();
        self.grid[row].insert_cells(col, n, &renditions);
        self.snap_cursor();
    }

    /// Delete characters at the cursor (DCH)
    pub fn delete_chars(&mut self, n: usize) {
        let Cursor { col, row } = self.cursor;
        let renditions = self.renditions.clone();
        self.grid[row].delete_cells(col, n, &renditions);
        self.snap_cursor();
    }

    /// Erase characters from the cursor without shifting (ECH)
    pub fn erase_chars(&mut self, n: usize) {
        let Cursor { col, row } = self.cursor;
        let renditions = self.renditions.clone();
        self.grid[row].erase(col, col.saturating_add(n), &renditions);
    }

    /// Erase in line (EL): 0 = to end, 1 = to start, 2 = whole line
    pub fn erase_in_line(&mut self, mode: u16) {
        let Cursor { col, row } = self.cursor;
        let renditions = self.renditions.clone();
        let cols = self.cols;
        match mode {
            0 => self.grid[row].erase(col, cols, &renditions),
            1 => self.grid[row].erase(0, col + 1, &renditions),
            2 => self.grid[row].erase(0, cols, &renditions),
            _ => trace!(mode, "unknown EL mode"),
        }
    }

    /// Erase in display (ED): 0 = to end, 1 = to start, 2/3 = everything
    pub fn erase_in_display(&mut self, mode: u16) {
        let row = self.cursor.row;
        let renditions = self.renditions.clone();
        match mode {
            0 => {
                self.erase_in_line(0);
                for line in &mut self.grid[row + 1..] {
                    line.clear(&renditions);
                }
            }
            1 => {
                for line in &mut self.grid[..row] {
                    line.clear(&renditions);
                }
                self.erase_in_line(1);
            }
            2 | 3 => {
                for line in &mut self.grid {
                    line.clear(&renditions);
                }
            }
            _ => trace!(mode, "unknown ED mode"),
        }
    }

    // ---------------------------------------------------------------
    // Modes, resets and geometry
    // ---------------------------------------------------------------

    /// Set or reset a mode (SM/RM, DECSET/DECRST). Returns true if known.
    pub fn set_mode(&mut self, private: bool, mode: u16, on: bool) -> bool {
        let known = if private {
            self.modes.set_dec_mode(mode, on)
        } else {
            self.modes.set_ansi_mode(mode, on)
        };
        if private && mode == 6 {
            // DECOM homes the cursor either way
            self.move_cursor_to(0, 0);
        }
        known
    }

    /// Full reset (RIS). The bell counter survives so observers notice
    /// bells rung before the reset.
    pub fn reset(&mut self) {
        let bell_count = self.bell_count;
        *self = Self::new(self.cols, self.rows);
        self.bell_count = bell_count;
    }

    /// Soft reset (DECSTR)
    pub fn soft_reset(&mut self) {
        self.modes.insert = false;
        self.modes.origin = false;
        self.modes.autowrap = true;
        self.modes.cursor_visible = true;
        self.modes.application_cursor_keys = false;
        self.modes.application_keypad = false;
        self.renditions.reset();
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.saved = SavedCursor::default();
    }

    /// Screen alignment pattern (DECALN): fill with `E`, reset margins,
    /// home the cursor
    pub fn alignment_test(&mut self) {
        let renditions = Renditions::default();
        for line in &mut self.grid {
            for col in 0..self.cols {
                line.put(col, Cell::new('E'), &renditions);
            }
        }
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.cursor = Cursor::default();
    }

    /// Resize the grid, keeping the top-left overlap. New cells are default
    /// blanks; the cursor is clamped and the scroll region reset.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.cols && rows == self.rows {
            return;
        }
        debug!(
            from_cols = self.cols,
            from_rows = self.rows,
            cols,
            rows,
            "resizing framebuffer"
        );

        let blank = Renditions::default();
        for line in &mut self.grid {
            line.resize(cols, &blank);
        }
        self.grid.resize_with(rows, || Row::new(cols, &blank));

        let old_cols = self.cols;
        self.tabs.resize(cols, false);
        for col in old_cols..cols {
            self.tabs[col] = col % TAB_WIDTH == 0;
        }

        self.cols = cols;
        self.rows = rows;
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        self.cursor.col = self.cursor.col.min(cols - 1);
        self.cursor.row = self.cursor.row.min(rows - 1);
        self.last_printed = None;
        self.snap_cursor();
    }

    /// Describe how `other` differs from `self` (cells, cursor, rendition).
    /// An empty list means the two screens are equivalent. Each difference
    /// is also logged at debug level.
    pub fn compare(&self, other: &Framebuffer) -> Vec<String> {
        let mut diffs = Vec::new();
        if self.cols != other.cols || self.rows != other.rows {
            diffs.push(format!(
                "size {}x{} != {}x{}",
                self.cols, self.rows, other.cols, other.rows
            ));
        } else {
            for (row, (a, b)) in self.grid.iter().zip(&other.grid).enumerate() {
                if a == b {
                    continue;
                }
                for (col, (x, y)) in a.cells().iter().zip(b.cells()).enumerate() {
                    if x != y {
                        diffs.push(format!("cell ({}, {}): {:?} != {:?}", col, row, x, y));
                    }
                }
            }
        }
        if self.cursor != other.cursor {
            diffs.push(format!("cursor {:?} != {:?}", self.cursor, other.cursor));
        }
        if self.renditions != other.renditions {
            diffs.push(format!(
                "renditions {:?} != {:?}",
                self.renditions, other.renditions
            ));
        }
        for diff in &diffs {
            debug!("framebuffer mismatch: {}", diff);
        }
        diffs
    }
}

fn default_tabs(cols: usize) -> Vec<bool> {
    (0..cols).map(|c| c % TAB_WIDTH == 0 && c != 0).collect()
}
