//! ANSI/VT100 output vocabulary
//!
//! The fixed set of sequences the renderer writes to a real terminal. All
//! coordinates are 0-based on the way in and 1-based on the wire.

use std::fmt::Write;

/// Enter the alternate screen, keep cursor keys in application mode
pub const OPEN: &str = "\x1b[?1049h\x1b[?1h";

/// Clear the screen from a known state: no scroll region, default rendition
pub const CLEAR: &str = "\x1b[r\x1b[0m\x1b[H\x1b[2J";

/// Reset the modes the renderer may have set, then leave the alternate screen
pub const CLOSE: &str =
    "\x1b[?5l\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l\x1b[?2004l\x1b[?1l\x1b[0m\x1b[?25h\x1b[?1049l";

/// CUP
pub fn cursor_to(out: &mut String, row: usize, col: usize) {
    if row == 0 && col == 0 {
        out.push_str("\x1b[H");
    } else {
        let _ = write!(out, "\x1b[{};{}H", row + 1, col + 1);
    }
}

/// CUF
pub fn cursor_forward(out: &mut String, n: usize) {
    if n == 1 {
        out.push_str("\x1b[C");
    } else {
        let _ = write!(out, "\x1b[{}C", n);
    }
}

/// ECH
pub fn erase_chars(out: &mut String, n: usize) {
    let _ = write!(out, "\x1b[{}X", n);
}

/// EL 0
pub fn erase_to_end_of_line(out: &mut String) {
    out.push_str("\x1b[K");
}

/// DECSTBM with 0-based inclusive bounds
pub fn scroll_region(out: &mut String, top: usize, bottom: usize) {
    let _ = write!(out, "\x1b[{};{}r", top + 1, bottom + 1);
}

pub fn reset_scroll_region(out: &mut String) {
    out.push_str("\x1b[r");
}

/// DECSET / DECRST
pub fn dec_mode(out: &mut String, mode: u16, on: bool) {
    let _ = write!(out, "\x1b[?{}{}", mode, if on { 'h' } else { 'l' });
}

/// OSC 0, with control characters stripped from the text
pub fn title(out: &mut String, text: &str) {
    out.push_str("\x1b]0;");
    out.extend(text.chars().filter(|c| !c.is_control()));
    out.push('\x07');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut String)) -> String {
        let mut out = String::new();
        f(&mut out);
        out
    }

    #[test]
    fn test_cursor_to() {
        assert_eq!(render(|o| cursor_to(o, 0, 0)), "\x1b[H");
        assert_eq!(render(|o| cursor_to(o, 4, 9)), "\x1b[5;10H");
    }

    #[test]
    fn test_cursor_forward() {
        assert_eq!(render(|o| cursor_forward(o, 1)), "\x1b[C");
        assert_eq!(render(|o| cursor_forward(o, 12)), "\x1b[12C");
    }

    #[test]
    fn test_scroll_region() {
        assert_eq!(render(|o| scroll_region(o, 0, 23)), "\x1b[1;24r");
    }

    #[test]
    fn test_dec_mode() {
        assert_eq!(render(|o| dec_mode(o, 2004, true)), "\x1b[?2004h");
        assert_eq!(render(|o| dec_mode(o, 25, false)), "\x1b[?25l");
    }

    #[test]
    fn test_title_strips_controls() {
        assert_eq!(render(|o| title(o, "a\x07b\x1bc")), "\x1b]0;abc\x07");
    }
}
