//! Parser State Machine
//!
//! Implements a VT500-series compatible parser state machine.
//! The parser handles arbitrary chunk boundaries and produces
//! semantic actions for the terminal core.
//!
//! # State Machine
//!
//! The parser follows the state machine model described in:
//! - "A parser for DEC's ANSI-compatible video terminals" by Paul Williams
//! - https://vt100.net/emu/dec_ansi_parser
//!
//! Input bytes first pass through a streaming UTF-8 decoder (the continuation
//! sub-state), so the state machine proper sees codepoints. C1 controls are
//! therefore recognized as the codepoints U+0080..U+009F.
//!
//! States:
//! - Ground: Normal text processing
//! - Escape: After ESC, waiting for next byte
//! - EscapeIntermediate: ESC followed by intermediate bytes
//! - CsiEntry: After CSI (ESC [), collecting parameters
//! - CsiParam: Collecting CSI parameters
//! - CsiIntermediate: CSI with intermediate bytes
//! - CsiIgnore: Malformed CSI, consumed until its final byte
//! - OscString: Collecting OSC payload
//! - DcsEntry/DcsParam/DcsIntermediate/DcsPassthrough/DcsIgnore: DCS handling
//! - SosPmApcString: SOS/PM/APC string, consumed until ST

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::action::{Action, CsiDispatch, EscDispatch, OscDispatch};
use super::params::Params;
use super::utf8::{Utf8Decoder, Utf8Result};

/// Default cap on collected OSC payload bytes
pub const DEFAULT_MAX_OSC_LEN: usize = 4096;

/// Intermediate bytes accepted before a sequence is considered malformed
const MAX_INTERMEDIATES: usize = 2;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    SosPmApcString,
}

impl State {
    /// States whose content ends with a string terminator
    fn is_string(self) -> bool {
        matches!(
            self,
            State::OscString
                | State::DcsEntry
                | State::DcsParam
                | State::DcsIntermediate
                | State::DcsPassthrough
                | State::DcsIgnore
                | State::SosPmApcString
        )
    }
}

/// The terminal parser
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    /// UTF-8 continuation sub-state
    utf8: Utf8Decoder,
    /// Parameters for CSI sequences
    params: Params,
    /// Intermediate bytes collected during parsing
    intermediates: Vec<u8>,
    /// More intermediates arrived than we keep
    intermediates_overflow: bool,
    /// Private marker of the CSI sequence in progress
    marker: Option<u8>,
    /// OSC string payload
    osc: String,
    max_osc_len: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser in the ground state
    pub fn new() -> Self {
        Self::with_max_osc_len(DEFAULT_MAX_OSC_LEN)
    }

    /// Create a parser that keeps at most `max_osc_len` bytes of OSC payload
    pub fn with_max_osc_len(max_osc_len: usize) -> Self {
        Self {
            state: State::Ground,
            utf8: Utf8Decoder::new(),
            params: Params::new(),
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            intermediates_overflow: false,
            marker: None,
            osc: String::new(),
            max_osc_len,
        }
    }

    /// Current state of the escape-sequence machine
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether a multi-byte UTF-8 character is partially received
    pub fn in_utf8_sequence(&self) -> bool {
        self.utf8.is_pending()
    }

    /// Reset the parser to initial state
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.utf8.reset();
        self.clear_sequence();
        self.osc.clear();
    }

    /// Process a chunk of bytes, returning actions
    pub fn parse(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse_with(data, |action| actions.push(action));
        actions
    }

    /// Process a chunk of bytes, handing each action to `sink` in order
    pub fn parse_with<F: FnMut(Action)>(&mut self, data: &[u8], mut sink: F) {
        for &byte in data {
            self.advance(byte, &mut sink);
        }
    }

    /// Process a single byte
    pub fn advance<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        let mut next = Some(byte);
        while let Some(byte) = next.take() {
            match self.utf8.feed(byte) {
                Utf8Result::Pending => {}
                Utf8Result::Char(c) => self.advance_char(c, sink),
                Utf8Result::Invalid { retry } => {
                    trace!(byte, retry, "invalid UTF-8 input");
                    self.advance_char(char::REPLACEMENT_CHARACTER, sink);
                    if retry {
                        next = Some(byte);
                    }
                }
            }
        }
    }

    /// Process one already-decoded codepoint
    pub fn advance_char<F: FnMut(Action)>(&mut self, c: char, sink: &mut F) {
        let cp = c as u32;
        match cp {
            // CAN, SUB - cancel current sequence
            0x18 | 0x1A => {
                self.state = State::Ground;
                self.clear_sequence();
                sink(Action::Execute(cp as u8));
            }
            // ESC - start escape sequence (and terminate any string)
            0x1B => {
                if let Some(done) = self.end_string() {
                    sink(done);
                }
                self.enter(State::Escape);
            }
            0x80..=0x9F => self.process_c1(cp as u8, sink),
            _ => {
                let action = match self.state {
                    State::Ground => self.process_ground(c),
                    State::Escape => self.process_escape(cp),
                    State::EscapeIntermediate => self.process_escape_intermediate(cp),
                    State::CsiEntry => self.process_csi_entry(cp),
                    State::CsiParam => self.process_csi_param(cp),
                    State::CsiIntermediate => self.process_csi_intermediate(cp),
                    State::CsiIgnore => self.process_csi_ignore(cp),
                    State::OscString => self.process_osc_string(c),
                    State::DcsEntry => self.process_dcs_entry(cp),
                    State::DcsParam => self.process_dcs_param(cp),
                    State::DcsIntermediate => self.process_dcs_intermediate(cp),
                    // Payload is consumed, never interpreted
                    State::DcsPassthrough | State::DcsIgnore | State::SosPmApcString => None,
                };
                if let Some(action) = action {
                    sink(action);
                }
            }
        }
    }

    /// Enter a state, clearing accumulators when it begins a new sequence
    fn enter(&mut self, state: State) {
        match state {
            State::Escape | State::CsiEntry | State::DcsEntry => self.clear_sequence(),
            State::OscString => self.osc.clear(),
            _ => {}
        }
        self.state = state;
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.intermediates_overflow = false;
        self.marker = None;
    }

    /// Finish a string-type sequence because a terminator arrived
    fn end_string(&mut self) -> Option<Action> {
        if !self.state.is_string() {
            return None;
        }
        let state = self.state;
        self.state = State::Ground;
        if state == State::OscString {
            Some(Action::OscDispatch(OscDispatch {
                payload: std::mem::take(&mut self.osc),
            }))
        } else {
            Some(Action::Ignore)
        }
    }

    /// Process C1 controls (U+0080-U+009F)
    fn process_c1<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        if let Some(done) = self.end_string() {
            sink(done);
        }
        match byte {
            0x90 => self.enter(State::DcsEntry),
            0x9B => self.enter(State::CsiEntry),
            0x9D => self.enter(State::OscString),
            0x98 | 0x9E | 0x9F => self.enter(State::SosPmApcString),
            // ST outside of a string has nothing to terminate
            0x9C => self.state = State::Ground,
            _ => {
                self.state = State::Ground;
                sink(Action::Execute(byte));
            }
        }
    }

    fn process_ground(&mut self, c: char) -> Option<Action> {
        match c as u32 {
            0x00..=0x1F => Some(Action::Execute(c as u8)),
            0x7F => None,
            _ => Some(Action::Print(c)),
        }
    }

    fn process_escape(&mut self, cp: u32) -> Option<Action> {
        match cp {
            0x00..=0x1F => Some(Action::Execute(cp as u8)),
            0x20..=0x2F => {
                self.collect(cp as u8);
                self.state = State::EscapeIntermediate;
                None
            }
            0x5B => {
                // ESC [
                self.enter(State::CsiEntry);
                None
            }
            0x5D => {
                // ESC ]
                self.enter(State::OscString);
                None
            }
            0x50 => {
                // ESC P
                self.enter(State::DcsEntry);
                None
            }
            0x58 | 0x5E | 0x5F => {
                // ESC X, ESC ^, ESC _
                self.enter(State::SosPmApcString);
                None
            }
            0x30..=0x7E => self.esc_dispatch(cp as u8),
            _ => None,
        }
    }

    fn process_escape_intermediate(&mut self, cp: u32) -> Option<Action> {
        match cp {
            0x00..=0x1F => Some(Action::Execute(cp as u8)),
            0x20..=0x2F => {
                self.collect(cp as u8);
                None
            }
            0x30..=0x7E => self.esc_dispatch(cp as u8),
            _ => None,
        }
    }

    fn process_csi_entry(&mut self, cp: u32) -> Option<Action> {
        match cp {
            0x00..=0x1F => Some(Action::Execute(cp as u8)),
            0x20..=0x2F => {
                self.collect(cp as u8);
                self.state = self.after_intermediate();
                None
            }
            0x30..=0x3B => {
                self.push_param(cp as u8);
                None
            }
            0x3C..=0x3F => {
                self.marker = Some(cp as u8);
                self.state = State::CsiParam;
                None
            }
            0x40..=0x7E => self.csi_dispatch(cp as u8),
            _ => None,
        }
    }

    fn process_csi_param(&mut self, cp: u32) -> Option<Action> {
        match cp {
            0x00..=0x1F => Some(Action::Execute(cp as u8)),
            0x30..=0x3B => {
                self.push_param(cp as u8);
                None
            }
            0x3C..=0x3F => {
                self.state = State::CsiIgnore;
                None
            }
            0x20..=0x2F => {
                self.collect(cp as u8);
                self.state = self.after_intermediate();
                None
            }
            0x40..=0x7E => self.csi_dispatch(cp as u8),
            _ => None,
        }
    }

    fn process_csi_intermediate(&mut self, cp: u32) -> Option<Action> {
        match cp {
            0x00..=0x1F => Some(Action::Execute(cp as u8)),
            0x20..=0x2F => {
                self.collect(cp as u8);
                self.state = self.after_intermediate();
                None
            }
            0x30..=0x3F => {
                self.state = State::CsiIgnore;
                None
            }
            0x40..=0x7E => self.csi_dispatch(cp as u8),
            _ => None,
        }
    }

    fn process_csi_ignore(&mut self, cp: u32) -> Option<Action> {
        match cp {
            0x00..=0x1F => Some(Action::Execute(cp as u8)),
            0x40..=0x7E => {
                self.state = State::Ground;
                self.clear_sequence();
                Some(Action::Ignore)
            }
            _ => None,
        }
    }

    fn process_osc_string(&mut self, c: char) -> Option<Action> {
        match c as u32 {
            // BEL terminates OSC (xterm extension)
            0x07 => self.end_string(),
            0x00..=0x1F => None,
            _ => {
                if self.osc.len() + c.len_utf8() <= self.max_osc_len {
                    self.osc.push(c);
                } else {
                    trace!(limit = self.max_osc_len, "OSC payload truncated");
                }
                None
            }
        }
    }

    fn process_dcs_entry(&mut self, cp: u32) -> Option<Action> {
        self.state = match cp {
            0x20..=0x2F => State::DcsIntermediate,
            0x30..=0x3F => State::DcsParam,
            0x40..=0x7E => State::DcsPassthrough,
            _ => self.state,
        };
        None
    }

    fn process_dcs_param(&mut self, cp: u32) -> Option<Action> {
        self.state = match cp {
            0x30..=0x3B => State::DcsParam,
            0x3C..=0x3F => State::DcsIgnore,
            0x20..=0x2F => State::DcsIntermediate,
            0x40..=0x7E => State::DcsPassthrough,
            _ => self.state,
        };
        None
    }

    fn process_dcs_intermediate(&mut self, cp: u32) -> Option<Action> {
        self.state = match cp {
            0x20..=0x2F => State::DcsIntermediate,
            0x30..=0x3F => State::DcsIgnore,
            0x40..=0x7E => State::DcsPassthrough,
            _ => self.state,
        };
        None
    }

    fn collect(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
        } else {
            self.intermediates_overflow = true;
        }
    }

    fn after_intermediate(&self) -> State {
        if self.intermediates_overflow {
            State::CsiIgnore
        } else {
            State::CsiIntermediate
        }
    }

    fn push_param(&mut self, byte: u8) {
        self.state = if self.params.push(byte) {
            State::CsiParam
        } else {
            State::CsiIgnore
        };
    }

    fn esc_dispatch(&mut self, final_byte: u8) -> Option<Action> {
        self.state = State::Ground;
        if self.intermediates_overflow {
            self.clear_sequence();
            return Some(Action::Ignore);
        }
        Some(Action::EscDispatch(EscDispatch {
            intermediates: std::mem::take(&mut self.intermediates),
            final_byte,
        }))
    }

    fn csi_dispatch(&mut self, final_byte: u8) -> Option<Action> {
        self.state = State::Ground;
        let action = CsiDispatch {
            params: self.params.finish(),
            intermediates: std::mem::take(&mut self.intermediates),
            marker: self.marker.take(),
            final_byte,
        };
        Some(Action::CsiDispatch(action))
    }
}
