//! Terminal mode flags
//!
//! Mode switches set by SM/RM and DECSET/DECRST. Origin mode is stored here
//! but its cursor side effects are applied by the framebuffer.

use serde::{Deserialize, Serialize};

/// Mouse reporting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseMode {
    /// No mouse reporting
    #[default]
    None,
    /// Normal tracking mode - report button press and release (DECSET 1000)
    Normal,
    /// Button-event tracking - report motion while a button is held (DECSET 1002)
    ButtonMotion,
    /// Any-event tracking - report all motion events (DECSET 1003)
    AnyMotion,
}

impl MouseMode {
    /// The DECSET number enabling this mode, if any
    pub fn dec_mode(self) -> Option<u16> {
        match self {
            MouseMode::None => None,
            MouseMode::Normal => Some(1000),
            MouseMode::ButtonMotion => Some(1002),
            MouseMode::AnyMotion => Some(1003),
        }
    }
}

/// Terminal mode flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// DECAWM - Auto wrap mode
    /// When enabled, printing past the right margin continues on the next line
    pub autowrap: bool,

    /// DECOM - Origin mode
    /// When enabled, cursor positions are relative to the scroll region
    pub origin: bool,

    /// IRM - Insert/Replace mode
    pub insert: bool,

    /// LNM - Line feed/new line mode
    /// When enabled, LF also performs CR
    pub linefeed_newline: bool,

    /// DECCKM - Cursor key mode
    /// When enabled, cursor keys send ESC O ... instead of ESC [ ...
    pub application_cursor_keys: bool,

    /// DECKPAM/DECKPNM - Keypad mode
    pub application_keypad: bool,

    /// DECSCNM - Screen mode (reverse video)
    pub reverse_video: bool,

    /// DECTCEM - Show cursor (DECSET 25)
    pub cursor_visible: bool,

    /// Bracketed paste mode (DECSET 2004)
    pub bracketed_paste: bool,

    /// Mouse reporting mode
    pub mouse_mode: MouseMode,

    /// SGR mouse encoding (DECSET 1006)
    pub mouse_sgr: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            autowrap: true,
            origin: false,
            insert: false,
            linefeed_newline: false,
            application_cursor_keys: false,
            application_keypad: false,
            reverse_video: false,
            cursor_visible: true,
            bracketed_paste: false,
            mouse_mode: MouseMode::None,
            mouse_sgr: false,
        }
    }
}

impl Modes {
    /// Create new default modes
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all modes to default values
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Set or reset a DEC private mode (CSI ? Ps h / CSI ? Ps l).
    /// Returns true if the mode was recognized
    pub fn set_dec_mode(&mut self, mode: u16, on: bool) -> bool {
        match mode {
            1 => self.application_cursor_keys = on,
            5 => self.reverse_video = on,
            6 => self.origin = on,
            7 => self.autowrap = on,
            // Cursor blink has no effect on the model
            12 => {}
            25 => self.cursor_visible = on,
            1000 | 1002 | 1003 => {
                self.mouse_mode = match (on, mode) {
                    // Only turning off the active tracking mode stops reporting
                    (false, m) if self.mouse_mode.dec_mode() == Some(m) => MouseMode::None,
                    (false, _) => self.mouse_mode,
                    (true, 1000) => MouseMode::Normal,
                    (true, 1002) => MouseMode::ButtonMotion,
                    (true, _) => MouseMode::AnyMotion,
                }
            }
            1006 => self.mouse_sgr = on,
            2004 => self.bracketed_paste = on,
            _ => return false,
        }
        true
    }

    /// Set or reset an ANSI mode (CSI Ps h / CSI Ps l).
    /// Returns true if the mode was recognized
    pub fn set_ansi_mode(&mut self, mode: u16, on: bool) -> bool {
        match mode {
            4 => self.insert = on,
            20 => self.linefeed_newline = on,
            _ => return false,
        }
        true
    }
}
