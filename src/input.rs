//! User input path
//!
//! Keystrokes from the local user pass through here on their way to the
//! host. The real terminal is kept in application cursor-key mode (see
//! `Display::open`), so its arrow keys arrive as `ESC O A`..`ESC O D`. When
//! the host has not asked for application cursor keys those are rewritten to
//! the ANSI form `ESC [ A`..`ESC [ D`, which needs one byte of lookahead.
//!
//! Multi-byte UTF-8 characters are held back until complete, so the host
//! never sees a partial character. Bytes that turn out not to form valid
//! UTF-8 are forwarded unchanged; user input is never dropped.

use crate::parser::{Utf8Decoder, Utf8Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    /// Saw ESC
    Esc,
    /// Saw ESC O and withheld the `O`
    Ss3,
}

/// Stateful translator for user keystrokes
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    state: State,
    utf8: Utf8Decoder,
    /// Raw bytes of an incomplete UTF-8 character
    pending: Vec<u8>,
}

impl UserInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of a multi-byte character still waiting for completion
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Feed one user byte; bytes bound for the host are appended to `out`.
    pub fn input(&mut self, byte: u8, application_cursor_keys: bool, out: &mut Vec<u8>) {
        let mut next = Some(byte);
        while let Some(byte) = next.take() {
            if !self.utf8.is_pending() && byte < 0x80 {
                self.ascii(byte, application_cursor_keys, out);
                continue;
            }
            match self.utf8.feed(byte) {
                Utf8Result::Pending => self.pending.push(byte),
                Utf8Result::Char(_) => {
                    self.flush_lookahead(out);
                    out.append(&mut self.pending);
                    out.push(byte);
                }
                Utf8Result::Invalid { retry } => {
                    self.flush_lookahead(out);
                    out.append(&mut self.pending);
                    if retry {
                        next = Some(byte);
                    } else {
                        out.push(byte);
                    }
                }
            }
        }
    }

    fn ascii(&mut self, byte: u8, application_cursor_keys: bool, out: &mut Vec<u8>) {
        match self.state {
            State::Ground => {
                if byte == 0x1B {
                    self.state = State::Esc;
                }
                out.push(byte);
            }
            State::Esc => {
                if byte == b'O' {
                    // ESC O = 7-bit SS3; hold the O until we see the key
                    self.state = State::Ss3;
                    return;
                }
                if byte != 0x1B {
                    self.state = State::Ground;
                }
                out.push(byte);
            }
            State::Ss3 => {
                self.state = State::Ground;
                if !application_cursor_keys && (b'A'..=b'D').contains(&byte) {
                    out.extend_from_slice(&[b'[', byte]);
                } else {
                    out.extend_from_slice(&[b'O', byte]);
                    if byte == 0x1B {
                        self.state = State::Esc;
                    }
                }
            }
        }
    }

    /// Release a withheld `O` when a non-ASCII byte interrupts the lookahead
    fn flush_lookahead(&mut self, out: &mut Vec<u8>) {
        if self.state == State::Ss3 {
            out.push(b'O');
        }
        self.state = State::Ground;
    }
}
