//! Terminal Executor
//!
//! Ties together the parser, the framebuffer and the user input path. Host
//! output is parsed into actions which are applied to the framebuffer
//! strictly in emission order; user keystrokes are applied as `UserByte`
//! actions. Anything the terminal must say back to the host (query replies,
//! translated keystrokes) is collected and returned to the caller, never
//! written anywhere by the terminal itself.

use tracing::{debug, trace};

use crate::config::Config;
use crate::core::{Framebuffer, Snapshot};
use crate::input::UserInput;
use crate::parser::{Action, CsiDispatch, EscDispatch, OscDispatch, Parser};

/// Terminal executor that processes parsed actions and updates the framebuffer
#[derive(Debug, Clone)]
pub struct Terminal {
    /// The escape sequence parser
    parser: Parser,
    framebuffer: Framebuffer,
    input: UserInput,
    /// Bytes owed to the host
    host_bound: Vec<u8>,
    reply_to_queries: bool,
}

impl Terminal {
    /// Create a new terminal with the given dimensions
    pub fn new(cols: usize, rows: usize) -> Self {
        Self::with_config(&Config {
            cols,
            rows,
            ..Default::default()
        })
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            parser: Parser::with_max_osc_len(config.max_osc_len),
            framebuffer: Framebuffer::new(config.cols, config.rows),
            input: UserInput::new(),
            host_bound: Vec::new(),
            reply_to_queries: config.reply_to_queries,
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_framebuffer(&self.framebuffer)
    }

    /// Process output from the host. Returns bytes to send back to the host.
    pub fn act(&mut self, data: &[u8]) -> Vec<u8> {
        let actions = self.parser.parse(data);
        for action in actions {
            self.apply(action);
        }
        std::mem::take(&mut self.host_bound)
    }

    /// Process bytes typed by the user. Returns bytes to send to the host.
    pub fn user_input(&mut self, data: &[u8]) -> Vec<u8> {
        for &byte in data {
            self.apply(Action::UserByte(byte));
        }
        std::mem::take(&mut self.host_bound)
    }

    /// Apply a new window size
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.apply(Action::Resize { cols, rows });
    }

    /// Apply a single action
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Print(c) => self.framebuffer.print(c),
            Action::Execute(byte) => self.execute(byte),
            Action::CsiDispatch(csi) => self.execute_csi(&csi),
            Action::OscDispatch(osc) => self.execute_osc(&osc),
            Action::EscDispatch(esc) => self.execute_esc(&esc),
            Action::Resize { cols, rows } => self.framebuffer.resize(cols, rows),
            Action::UserByte(byte) => {
                let application = self.framebuffer.modes().application_cursor_keys;
                self.input.input(byte, application, &mut self.host_bound);
            }
            Action::Ignore => {}
        }
    }

    /// Execute a C0 control, or a C1 control reduced to its byte value
    fn execute(&mut self, byte: u8) {
        let fb = &mut self.framebuffer;
        match byte {
            0x07 => {
                // BEL - Bell
                trace!("bell");
                fb.ring_bell();
            }
            0x08 => fb.backspace(),
            0x09 => fb.tab(1),
            // LF, VT, FF - Line Feed (VT and FF treated as LF)
            0x0A..=0x0C => fb.linefeed(),
            0x0D => fb.carriage_return(),
            // IND, NEL, HTS, RI
            0x84 => fb.index(),
            0x85 => fb.next_line(),
            0x88 => fb.set_tab_stop(),
            0x8D => fb.reverse_index(),
            _ => trace!(byte, "ignored control"),
        }
    }

    /// Execute a CSI sequence
    fn execute_csi(&mut self, csi: &CsiDispatch) {
        if !csi.intermediates.is_empty() {
            self.execute_csi_intermediate(csi);
            return;
        }
        match csi.marker {
            None => {}
            Some(b'?') => return self.execute_csi_private(csi),
            Some(b'>') if csi.final_byte == b'c' => {
                // Secondary DA
                return self.reply(b"\x1b[>1;10;0c");
            }
            Some(_) => return self.unhandled_csi(csi),
        }

        let n = csi.param_or_default(0, 1) as usize;
        let fb = &mut self.framebuffer;
        match csi.final_byte {
            // Cursor movement
            b'A' => fb.move_cursor_up(n),
            b'B' | b'e' => fb.move_cursor_down(n),
            b'C' | b'a' => fb.move_cursor_forward(n),
            b'D' => fb.move_cursor_backward(n),
            b'E' => {
                // CNL - Cursor Next Line
                fb.move_cursor_down(n);
                fb.carriage_return();
            }
            b'F' => {
                // CPL - Cursor Previous Line
                fb.move_cursor_up(n);
                fb.carriage_return();
            }
            b'G' | b'`' => fb.move_cursor_to_col(n - 1),
            b'H' | b'f' => {
                // CUP - Cursor Position, HVP
                let row = csi.param_or_default(0, 1) as usize - 1;
                let col = csi.param_or_default(1, 1) as usize - 1;
                fb.move_cursor_to(row, col);
            }
            b'd' => fb.move_cursor_to_row(n - 1),
            b'I' => fb.tab(n),
            b'Z' => fb.back_tab(n),

            // Erase operations
            b'J' => fb.erase_in_display(csi.param(0, 0)),
            b'K' => fb.erase_in_line(csi.param(0, 0)),
            b'X' => fb.erase_chars(n),

            // Insert/Delete
            b'L' => fb.insert_lines(n),
            b'M' => fb.delete_lines(n),
            b'@' => fb.insert_chars(n),
            b'P' => fb.delete_chars(n),
            b'b' => fb.repeat_last(n),

            // Scroll
            b'S' => fb.scroll_up(n),
            b'T' => fb.scroll_down(n),
            b'r' => {
                // DECSTBM - Set Top and Bottom Margins
                let top = csi.param_or_default(0, 1) as usize - 1;
                let bottom = match csi.param(1, 0) {
                    0 => fb.rows() - 1,
                    b => b as usize - 1,
                };
                fb.set_scroll_region(top, bottom);
            }

            b'm' => fb.set_renditions(&csi.params),
            b'g' => fb.clear_tab_stop(csi.param(0, 0)),

            // Cursor save/restore (ANSI)
            b's' => fb.save_cursor(),
            b'u' => fb.restore_cursor(),

            b'h' | b'l' => {
                let on = csi.final_byte == b'h';
                for &mode in &csi.params {
                    if !fb.set_mode(false, mode, on) {
                        debug!(mode, on, "unknown ANSI mode");
                    }
                }
            }

            b'n' => self.device_status(csi.param(0, 0)),
            // Primary DA: VT220-class with no options
            b'c' if csi.param(0, 0) == 0 => self.reply(b"\x1b[?62c"),

            _ => self.unhandled_csi(csi),
        }
    }

    /// Execute a private CSI sequence (starts with ?)
    fn execute_csi_private(&mut self, csi: &CsiDispatch) {
        match csi.final_byte {
            b'h' | b'l' => {
                let on = csi.final_byte == b'h';
                for &mode in &csi.params {
                    if !self.framebuffer.set_mode(true, mode, on) {
                        debug!(mode, on, "unknown DEC private mode");
                    }
                }
            }
            _ => self.unhandled_csi(csi),
        }
    }

    fn execute_csi_intermediate(&mut self, csi: &CsiDispatch) {
        match (csi.intermediates.as_slice(), csi.final_byte) {
            // DECSTR - Soft Terminal Reset
            (b"!", b'p') => self.framebuffer.soft_reset(),
            _ => self.unhandled_csi(csi),
        }
    }

    fn unhandled_csi(&self, csi: &CsiDispatch) {
        debug!(
            "Unhandled CSI: marker={:?} params={:?} intermediates={:?} final={}",
            csi.marker.map(char::from),
            csi.params,
            csi.intermediates,
            csi.final_byte as char
        );
    }

    /// DSR - Device Status Report
    fn device_status(&mut self, request: u16) {
        match request {
            5 => self.reply(b"\x1b[0n"),
            6 => {
                // Cursor position report, relative to the region in origin mode
                let fb = &self.framebuffer;
                let cursor = fb.cursor();
                let row = if fb.modes().origin {
                    cursor.row.saturating_sub(fb.scroll_region().0)
                } else {
                    cursor.row
                };
                let report = format!("\x1b[{};{}R", row + 1, cursor.col + 1);
                self.reply(report.as_bytes());
            }
            _ => debug!(request, "unknown DSR request"),
        }
    }

    fn reply(&mut self, bytes: &[u8]) {
        if self.reply_to_queries {
            self.host_bound.extend_from_slice(bytes);
        }
    }

    /// Execute an ESC sequence
    fn execute_esc(&mut self, esc: &EscDispatch) {
        let fb = &mut self.framebuffer;
        match (esc.intermediates.as_slice(), esc.final_byte) {
            ([], b'7') => fb.save_cursor(),
            ([], b'8') => fb.restore_cursor(),
            ([], b'D') => fb.index(),
            ([], b'E') => fb.next_line(),
            ([], b'H') => fb.set_tab_stop(),
            ([], b'M') => fb.reverse_index(),
            ([], b'c') => fb.reset(),
            ([], b'=') => fb.modes_mut().application_keypad = true,
            ([], b'>') => fb.modes_mut().application_keypad = false,
            // ST closing an OSC or DCS string
            ([], b'\\') => {}
            // DECALN
            (b"#", b'8') => fb.alignment_test(),
            // Character set designation; only UTF-8 is supported
            ([b'(' | b')' | b'*' | b'+'], _) => trace!(final_byte = esc.final_byte, "charset ignored"),
            _ => debug!(
                "Unhandled ESC: intermediates={:?} final={}",
                esc.intermediates,
                esc.final_byte as char
            ),
        }
    }

    /// Execute an OSC command
    fn execute_osc(&mut self, osc: &OscDispatch) {
        match osc.command() {
            (Some(0), text) => {
                self.framebuffer.set_title(text.to_string());
                self.framebuffer.set_icon_name(text.to_string());
            }
            (Some(1), text) => self.framebuffer.set_icon_name(text.to_string()),
            (Some(2), text) => self.framebuffer.set_title(text.to_string()),
            (command, _) => debug!(?command, "ignored OSC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Color, Cursor};

    #[test]
    fn test_print_and_sgr() {
        let mut term = Terminal::new(10, 2);
        term.act(b"\x1b[31mHi\x1b[0m");

        let fb = term.framebuffer();
        assert_eq!(fb.cell(0, 0).unwrap().content, "H");
        assert_eq!(fb.cell(1, 0).unwrap().renditions.fg, Color::RED);
        assert_eq!(fb.renditions().fg, Color::Default);
        assert_eq!(fb.cursor(), Cursor::new(2, 0));
    }

    #[test]
    fn test_cursor_position() {
        let mut term = Terminal::new(80, 24);
        term.act(b"\x1b[5;10H");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(9, 4));
        term.act(b"\x1b[H");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(0, 0));
        term.act(b"\x1b[999;999H");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(79, 23));
    }

    #[test]
    fn test_relative_motion() {
        let mut term = Terminal::new(20, 10);
        term.act(b"\x1b[5;5H\x1b[2A\x1b[3C\x1b[B\x1b[D");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(6, 3));
        term.act(b"\x1b[2E");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(0, 5));
        term.act(b"\x1b[7G\x1b[2d");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(6, 1));
    }

    #[test]
    fn test_erase() {
        let mut term = Terminal::new(10, 3);
        term.act(b"line1\r\nline2\r\nline3");
        term.act(b"\x1b[2;3H\x1b[K");
        assert_eq!(term.framebuffer().text(), "line1\nli\nline3");
        term.act(b"\x1b[2J");
        assert_eq!(term.framebuffer().text(), "\n\n");
    }

    #[test]
    fn test_scroll_region_and_su() {
        let mut term = Terminal::new(5, 4);
        term.act(b"a\r\nb\r\nc\r\nd");
        term.act(b"\x1b[2;3r\x1b[S");
        assert_eq!(term.framebuffer().text(), "a\nc\n\nd");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(0, 0));
    }

    #[test]
    fn test_private_modes() {
        let mut term = Terminal::new(10, 2);
        term.act(b"\x1b[?25l\x1b[?2004h\x1b[?1h");
        let modes = term.framebuffer().modes();
        assert!(!modes.cursor_visible);
        assert!(modes.bracketed_paste);
        assert!(modes.application_cursor_keys);
        term.act(b"\x1b[?25;2004l");
        assert!(term.framebuffer().modes().cursor_visible);
        assert!(!term.framebuffer().modes().bracketed_paste);
    }

    #[test]
    fn test_device_status_replies() {
        let mut term = Terminal::new(80, 24);
        assert_eq!(term.act(b"\x1b[5n"), b"\x1b[0n");
        assert_eq!(term.act(b"\x1b[3;7H\x1b[6n"), b"\x1b[3;7R");
        assert_eq!(term.act(b"\x1b[c"), b"\x1b[?62c");
        assert_eq!(term.act(b"\x1b[>c"), b"\x1b[>1;10;0c");
    }

    #[test]
    fn test_cursor_report_in_origin_mode() {
        let mut term = Terminal::new(80, 24);
        assert_eq!(term.act(b"\x1b[5;10r\x1b[?6h\x1b[2;1H\x1b[6n"), b"\x1b[2;1R");
    }

    #[test]
    fn test_cursor_report_after_restore_outside_region() {
        let mut term = Terminal::new(80, 24);
        let reply = term.act(b"\x1b[?6h\x1b7\x1b[5;10r\x1b8\x1b[6n");
        assert_eq!(reply, b"\x1b[1;1R");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(0, 4));
    }

    #[test]
    fn test_scroll_down_under_cursor_snaps_to_wide_lead() {
        let mut term = Terminal::new(80, 24);
        term.act("本\x1b[2;2H\x1b[T".as_bytes());
        let fb = term.framebuffer();
        assert!(fb.cell(1, 1).unwrap().is_continuation());
        assert_eq!(fb.cursor(), Cursor::new(0, 1));
    }

    #[test]
    fn test_replies_disabled() {
        let config = Config {
            reply_to_queries: false,
            ..Default::default()
        };
        let mut term = Terminal::with_config(&config);
        assert!(term.act(b"\x1b[6n\x1b[c").is_empty());
    }

    #[test]
    fn test_osc_title() {
        let mut term = Terminal::new(10, 2);
        term.act(b"\x1b]0;both\x07");
        assert_eq!(term.framebuffer().title(), "both");
        assert_eq!(term.framebuffer().icon_name(), "both");
        term.act(b"\x1b]2;window\x1b\\");
        assert_eq!(term.framebuffer().title(), "window");
        assert_eq!(term.framebuffer().icon_name(), "both");
    }

    #[test]
    fn test_bell_counted() {
        let mut term = Terminal::new(10, 2);
        term.act(b"\x07\x07");
        assert_eq!(term.framebuffer().bell_count(), 2);
    }

    #[test]
    fn test_esc_save_restore_and_reset() {
        let mut term = Terminal::new(10, 5);
        term.act(b"\x1b[3;4H\x1b7\x1b[H\x1b8");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(3, 2));
        term.act(b"text\x1bc");
        assert_eq!(term.framebuffer().text(), "\n\n\n\n");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(0, 0));
    }

    #[test]
    fn test_soft_reset() {
        let mut term = Terminal::new(10, 5);
        term.act(b"\x1b[1m\x1b[4h\x1b[2;3r\x1b[!p");
        let fb = term.framebuffer();
        assert!(!fb.renditions().style.bold);
        assert!(!fb.modes().insert);
        assert_eq!(fb.scroll_region(), (0, 4));
    }

    #[test]
    fn test_unknown_sequences_ignored() {
        let mut term = Terminal::new(10, 2);
        let replies = term.act(b"\x1b[?9999h\x1b[=5x\x1b[1$zA\x1bP+q\x1b\\B\x1b%G");
        assert!(replies.is_empty());
        assert_eq!(term.framebuffer().text(), "AB\n");
    }

    #[test]
    fn test_user_input_translation_follows_host_mode() {
        let mut term = Terminal::new(10, 2);
        assert_eq!(term.user_input(b"\x1bOA"), b"\x1b[A");
        term.act(b"\x1b[?1h");
        assert_eq!(term.user_input(b"\x1bOA"), b"\x1bOA");
    }

    #[test]
    fn test_resize_action() {
        let mut term = Terminal::new(80, 24);
        term.act(b"\x1b[1;61H");
        term.resize(40, 24);
        assert_eq!(term.framebuffer().cols(), 40);
        assert_eq!(term.framebuffer().cursor().col, 39);
    }

    #[test]
    fn test_wide_and_combining() {
        let mut term = Terminal::new(10, 2);
        term.act("日本e\u{301}".as_bytes());
        let fb = term.framebuffer();
        assert!(fb.cell(0, 0).unwrap().is_wide());
        assert!(fb.cell(3, 0).unwrap().is_continuation());
        assert_eq!(fb.cell(4, 0).unwrap().content, "e\u{301}");
        assert_eq!(fb.cursor(), Cursor::new(5, 0));
    }

    #[test]
    fn test_c1_controls() {
        let mut term = Terminal::new(10, 3);
        // NEL then IND via C1
        term.act("a\u{85}b\u{84}".as_bytes());
        assert_eq!(term.framebuffer().text(), "a\nb\n");
        assert_eq!(term.framebuffer().cursor(), Cursor::new(1, 2));
    }
}
