//! Differential renderer
//!
//! Computes the bytes that take a real terminal from showing one framebuffer
//! to showing another. The renderer owns neither framebuffer and never
//! mutates them; it keeps a model of the physical screen for the duration of
//! one frame and writes only what differs.
//!
//! The physical cursor position is tracked, never queried. The first cell
//! written in a frame is addressed with an absolute cursor position; later
//! moves, and frames that only move the cursor, are relative to the tracked
//! position.
//!
//! Erase sequences (EL, ECH, scrolling) are only used for blanks the real
//! terminal reproduces on its own: with background color erase the erased
//! cells take the current background, otherwise the default rendition.
//! Any other blank is written as a space.

use std::borrow::Cow;

use tracing::trace;

use super::ansi;
use crate::core::{Cell, Cursor, Framebuffer, Modes, Renditions, Row};

/// Blank runs at least this long are erased with ECH instead of spaces
const ECH_MIN_RUN: usize = 4;

/// Renders framebuffer deltas as escape sequences
#[derive(Debug, Clone)]
pub struct Display {
    /// Terminal supports ECH (erase characters)
    has_ech: bool,
    /// Terminal erases with the current background color (BCE)
    has_bce: bool,
    /// Forward window title changes
    has_title: bool,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            has_ech: true,
            has_bce: true,
            has_title: true,
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ech(mut self, has_ech: bool) -> Self {
        self.has_ech = has_ech;
        self
    }

    pub fn with_bce(mut self, has_bce: bool) -> Self {
        self.has_bce = has_bce;
        self
    }

    pub fn with_title(mut self, has_title: bool) -> Self {
        self.has_title = has_title;
        self
    }

    /// Bytes that prepare the real terminal for rendering
    pub fn open(&self) -> Vec<u8> {
        ansi::OPEN.as_bytes().to_vec()
    }

    /// Bytes that return the real terminal to its normal state
    pub fn close(&self) -> Vec<u8> {
        ansi::CLOSE.as_bytes().to_vec()
    }

    /// Bytes that transform a terminal showing `last` into one showing `f`.
    ///
    /// When `initialized` is false nothing is assumed about the real
    /// terminal and the whole screen is repainted. A size change between the
    /// two framebuffers also forces a repaint.
    pub fn new_frame(&self, initialized: bool, last: &Framebuffer, f: &Framebuffer) -> Vec<u8> {
        let repaint = !initialized || last.cols() != f.cols() || last.rows() != f.rows();
        let mut frame = FrameState::new(self.has_ech, self.has_bce);

        let mut screen: Vec<Cow<'_, Row>>;
        let base_modes = if initialized {
            frame.renditions = last.renditions().clone();
            frame.autowrap = Some(last.modes().autowrap);
            last.modes().clone()
        } else {
            // Hide the cursor while painting; the frame epilogue shows it
            frame.out.push_str("\x1b[?25l");
            Modes {
                cursor_visible: false,
                ..Modes::default()
            }
        };

        if repaint {
            trace!(cols = f.cols(), rows = f.rows(), "full repaint");
            frame.out.push_str(ansi::CLEAR);
            frame.cursor = Some(Cursor::default());
            frame.renditions = Renditions::default();
            let blank = Row::new(f.cols(), &Renditions::default());
            screen = vec![Cow::Owned(blank); f.rows()];
        } else {
            frame.cursor = Some(last.cursor());
            screen = last.grid().iter().map(Cow::Borrowed).collect();
            frame.scroll(&mut screen, f.grid());
        }

        for (row, (old, new)) in screen.iter().zip(f.grid()).enumerate() {
            if old.as_ref() != new {
                frame.update_row(row, old, new);
            }
        }

        frame.finish(f, &base_modes);
        if self.has_title && (f.title() != last.title() || (!initialized && !f.title().is_empty()))
        {
            ansi::title(&mut frame.out, f.title());
        }
        if initialized && f.bell_count() != last.bell_count() {
            frame.out.push('\x07');
        }

        frame.out.into_bytes()
    }
}

/// What the renderer knows about the real terminal while building a frame
struct FrameState {
    out: String,
    /// Physical cursor position, if known
    cursor: Option<Cursor>,
    /// Physical current rendition
    renditions: Renditions,
    /// Physical autowrap mode, if known
    autowrap: Option<bool>,
    /// No cell has been written yet this frame
    fresh: bool,
    has_ech: bool,
    has_bce: bool,
}

impl FrameState {
    fn new(has_ech: bool, has_bce: bool) -> Self {
        Self {
            out: String::new(),
            cursor: None,
            renditions: Renditions::default(),
            autowrap: None,
            fresh: true,
            has_ech,
            has_bce,
        }
    }

    /// The rendition the real terminal gives cells erased under `renditions`
    fn erase_fill(&self, renditions: &Renditions) -> Renditions {
        if self.has_bce {
            renditions.background_only()
        } else {
            Renditions::default()
        }
    }

    /// Detect a block of rows that moved up and reproduce the move with a
    /// scroll region and line feeds, so those rows need not be redrawn.
    fn scroll(&mut self, screen: &mut [Cow<'_, Row>], new: &[Row]) {
        let rows = new.len();
        let Some(top) = (0..rows).find(|&r| screen[r].as_ref() != &new[r]) else {
            return;
        };
        let Some(bottom) = (top..rows).rev().find(|&r| screen[r].as_ref() != &new[r]) else {
            return;
        };
        let Some(shift) = (1..=bottom - top).find(|&k| screen[top + k].as_ref() == &new[top])
        else {
            return;
        };
        let kept = top..=bottom - shift;
        if !kept.clone().all(|r| screen[r + shift].as_ref() == &new[r])
            || kept.clone().all(|r| new[r].is_default_blank())
        {
            return;
        }

        trace!(top, bottom, shift, "scrolling region");
        ansi::scroll_region(&mut self.out, top, bottom);
        ansi::cursor_to(&mut self.out, bottom, 0);
        // Rows scrolled in are blank in whatever the terminal erases with
        let fill = self.erase_fill(&self.renditions);
        self.set_renditions(&fill);
        for _ in 0..shift {
            self.out.push('\n');
        }
        ansi::reset_scroll_region(&mut self.out);
        // DECSTBM homes the cursor
        self.cursor = Some(Cursor::default());

        let cols = new.first().map_or(0, Row::cols);
        screen[top..=bottom].rotate_left(shift);
        for row in &mut screen[bottom + 1 - shift..=bottom] {
            *row = Cow::Owned(Row::new(cols, &fill));
        }
    }

    fn update_row(&mut self, row: usize, old: &Row, new: &Row) {
        let cells = new.cells();
        let prev = old.cells();
        let cols = cells.len();

        let mut col = 0;
        while col < cols {
            let cell = &cells[col];
            if cell.is_continuation() || prev.get(col) == Some(cell) {
                col += 1;
                continue;
            }

            if cell.is_blank() && self.erase_fill(&cell.renditions) == cell.renditions {
                let end = (col..cols)
                    .find(|&c| !cells[c].is_blank() || cells[c].renditions != cell.renditions)
                    .unwrap_or(cols);
                if end == cols {
                    self.position(row, col, true);
                    self.set_renditions(&cell.renditions);
                    ansi::erase_to_end_of_line(&mut self.out);
                    return;
                }
                if self.has_ech && end - col >= ECH_MIN_RUN {
                    self.position(row, col, true);
                    self.set_renditions(&cell.renditions);
                    ansi::erase_chars(&mut self.out, end - col);
                    col = end;
                    continue;
                }
            }

            self.write_cell(row, col, cell, cols);
            col += cell.width.max(1) as usize;
        }
    }

    fn write_cell(&mut self, row: usize, col: usize, cell: &Cell, cols: usize) {
        self.position(row, col, true);
        let end = col + cell.width.max(1) as usize;
        if end >= cols && self.autowrap != Some(false) {
            // Writing the last column must not wrap or scroll
            ansi::dec_mode(&mut self.out, 7, false);
            self.autowrap = Some(false);
        }
        self.set_renditions(&cell.renditions);
        self.out.push_str(cell.display_str());
        self.cursor = (end < cols).then(|| Cursor::new(end, row));
    }

    /// Move the physical cursor. The first write of a frame always uses an
    /// absolute position.
    fn position(&mut self, row: usize, col: usize, writing: bool) {
        let forced = writing && self.fresh;
        if writing {
            self.fresh = false;
        }
        match self.cursor {
            Some(c) if !forced && c.row == row && c.col == col => return,
            Some(c) if !forced && c.row == row && col == 0 => self.out.push('\r'),
            Some(c) if !forced && c.row == row && col > c.col => {
                ansi::cursor_forward(&mut self.out, col - c.col)
            }
            _ => ansi::cursor_to(&mut self.out, row, col),
        }
        self.cursor = Some(Cursor::new(col, row));
    }

    fn set_renditions(&mut self, renditions: &Renditions) {
        if self.renditions != *renditions {
            self.out.push_str(&renditions.sgr());
            self.renditions = renditions.clone();
        }
    }

    /// Leave the real terminal with `f`'s cursor, rendition and modes
    fn finish(&mut self, f: &Framebuffer, base: &Modes) {
        let cursor = f.cursor();
        self.position(cursor.row, cursor.col, false);
        self.set_renditions(f.renditions());

        let modes = f.modes();
        if self.autowrap != Some(modes.autowrap) {
            ansi::dec_mode(&mut self.out, 7, modes.autowrap);
        }
        if base.cursor_visible != modes.cursor_visible {
            ansi::dec_mode(&mut self.out, 25, modes.cursor_visible);
        }
        if base.reverse_video != modes.reverse_video {
            ansi::dec_mode(&mut self.out, 5, modes.reverse_video);
        }
        if base.bracketed_paste != modes.bracketed_paste {
            ansi::dec_mode(&mut self.out, 2004, modes.bracketed_paste);
        }
        if base.mouse_mode != modes.mouse_mode {
            if let Some(mode) = base.mouse_mode.dec_mode() {
                ansi::dec_mode(&mut self.out, mode, false);
            }
            if let Some(mode) = modes.mouse_mode.dec_mode() {
                ansi::dec_mode(&mut self.out, mode, true);
            }
        }
        if base.mouse_sgr != modes.mouse_sgr {
            ansi::dec_mode(&mut self.out, 1006, modes.mouse_sgr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;

    fn frame(last: &Terminal, next: &Terminal) -> String {
        let bytes = Display::new().new_frame(true, last.framebuffer(), next.framebuffer());
        String::from_utf8(bytes).unwrap()
    }

    fn term(cols: usize, rows: usize, input: &[u8]) -> Terminal {
        let mut t = Terminal::new(cols, rows);
        t.act(input);
        t
    }

    #[test]
    fn test_identical_frames_emit_nothing() {
        let t = term(10, 3, b"\x1b[1;32mhello\x1b[2;4Hworld\x1b[?2004h");
        assert_eq!(frame(&t, &t), "");
    }

    #[test]
    fn test_two_chars_on_blank() {
        let last = term(5, 1, b"");
        let next = term(5, 1, b"AB");
        assert_eq!(frame(&last, &next), "\x1b[HAB");
    }

    #[test]
    fn test_first_frame_preamble() {
        let blank = term(5, 1, b"");
        let out = Display::new().new_frame(false, blank.framebuffer(), blank.framebuffer());
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("\x1b[?25l\x1b[r\x1b[0m\x1b[H\x1b[2J"));
        assert!(out.ends_with("\x1b[?7h\x1b[?25h"));
    }

    #[test]
    fn test_run_shares_one_sgr() {
        let last = term(10, 1, b"");
        let next = term(10, 1, b"\x1b[31mabc\x1b[0m");
        let out = frame(&last, &next);
        assert_eq!(out.matches("\x1b[0;31m").count(), 1);
        assert!(out.contains("abc"));
        // back to the default rendition at the end
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    fn test_trailing_blank_uses_erase_to_end() {
        let last = term(10, 1, b"abcdefgh");
        let next = term(10, 1, b"ab");
        assert_eq!(frame(&last, &next), "\x1b[1;3H\x1b[K");
    }

    #[test]
    fn test_blank_gap_uses_ech() {
        let last = term(12, 1, b"abcdefghij");
        let next = term(12, 1, b"a        j");
        let out = frame(&last, &next);
        assert!(out.contains("\x1b[8X"));
    }

    #[test]
    fn test_ech_disabled_writes_spaces() {
        let last = term(12, 1, b"abcdefghij");
        let next = term(12, 1, b"a        j");
        let bytes = Display::new()
            .with_ech(false)
            .new_frame(true, last.framebuffer(), next.framebuffer());
        let out = String::from_utf8(bytes).unwrap();
        assert_eq!(out, "\x1b[1;2H        \x1b[C");
    }

    #[test]
    fn test_last_column_disables_autowrap() {
        let last = term(3, 2, b"");
        let next = term(3, 2, b"\x1b[1;3HZ");
        let out = frame(&last, &next);
        assert_eq!(out, "\x1b[1;3H\x1b[?7lZ\x1b[2;1H\x1b[?7h");
    }

    #[test]
    fn test_wide_char_emitted_once() {
        let last = term(6, 1, b"");
        let next = term(6, 1, "日x".as_bytes());
        assert_eq!(frame(&last, &next), "\x1b[H日x");
    }

    #[test]
    fn test_scroll_detected() {
        let last = term(4, 4, b"a\r\nb\r\nc\r\nd");
        let next = term(4, 4, b"a\r\nb\r\nc\r\nd\r\ne");
        let out = frame(&last, &next);
        assert!(out.starts_with("\x1b[1;4r\x1b[4;1H\n\x1b[r"));
        assert!(!out.contains('b'));
        assert!(out.contains('e'));
    }

    #[test]
    fn test_modes_forwarded() {
        let last = term(4, 2, b"");
        let next = term(4, 2, b"\x1b[?25l\x1b[?2004h\x1b[?1002h\x1b[?5h");
        let out = frame(&last, &next);
        assert!(out.contains("\x1b[?25l"));
        assert!(out.contains("\x1b[?2004h"));
        assert!(out.contains("\x1b[?1002h"));
        assert!(out.contains("\x1b[?5h"));
    }

    #[test]
    fn test_title_and_bell() {
        let last = term(4, 2, b"");
        let next = term(4, 2, b"\x1b]2;vim\x07\x07");
        let out = frame(&last, &next);
        assert_eq!(out, "\x1b]0;vim\x07\x07");
    }

    #[test]
    fn test_title_suppressed() {
        let last = term(4, 2, b"");
        let next = term(4, 2, b"\x1b]2;vim\x07");
        let bytes = Display::new()
            .with_title(false)
            .new_frame(true, last.framebuffer(), next.framebuffer());
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_size_change_repaints() {
        let last = term(4, 2, b"ab");
        let next = term(5, 2, b"ab");
        let out = frame(&last, &next);
        assert!(out.starts_with("\x1b[r\x1b[0m\x1b[H\x1b[2J"));
        assert!(out.contains("ab"));
    }

    #[test]
    fn test_styled_blank_is_written_not_erased() {
        let last = term(8, 1, b"abcdef");
        let next = term(8, 1, b"abcdef\x1b[1;3H\x1b[7m\x1b[K\x1b[0m");
        let out = frame(&last, &next);
        assert!(!out.contains("\x1b[K"), "inverse blanks erased in {:?}", out);
        assert!(out.contains("\x1b[0;7m   "));
    }

    #[test]
    fn test_background_blank_erased_with_bce() {
        let last = term(8, 1, b"abcdef");
        let next = term(8, 1, b"abcdef\x1b[1;3H\x1b[44m\x1b[K\x1b[0m");
        assert_eq!(frame(&last, &next), "\x1b[1;3H\x1b[0;44m\x1b[K\x1b[0m");
    }

    #[test]
    fn test_background_blank_written_without_bce() {
        let last = term(8, 1, b"abcdef");
        let next = term(8, 1, b"abcdef\x1b[1;3H\x1b[44m\x1b[K\x1b[0m");
        let bytes = Display::new()
            .with_bce(false)
            .new_frame(true, last.framebuffer(), next.framebuffer());
        let out = String::from_utf8(bytes).unwrap();
        assert!(!out.contains("\x1b[K"));
        assert!(out.contains("\x1b[0;44m"));
    }

    #[test]
    fn test_scroll_fills_with_background_only() {
        let last = term(4, 3, b"a\r\nb\r\nc\x1b[1;4m");
        let next = term(4, 3, b"a\r\nb\r\nc\x1b[1;4m\r\nd");
        let out = frame(&last, &next);
        // the line feed is sent with a plain rendition, not bold underline
        assert!(out.starts_with("\x1b[1;3r\x1b[3;1H\x1b[0m\n\x1b[r"), "{:?}", out);
    }

    #[test]
    fn test_cursor_only_move_is_relative() {
        let last = term(10, 2, b"abc");
        let next = term(10, 2, b"abc\x1b[1;8H");
        assert_eq!(frame(&last, &next), "\x1b[4C");
    }
}
