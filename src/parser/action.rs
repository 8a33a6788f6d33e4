//! Terminal Actions
//!
//! The closed set of semantic operations produced by the parser. Actions are
//! plain values: they own their parameters and never refer back to parser
//! state, so they can be buffered, logged or serialized freely.

use serde::{Deserialize, Serialize};

/// A terminal action produced by the parser (or synthesized by the caller,
/// in the case of `Resize` and `UserByte`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Print a character at the cursor position
    Print(char),

    /// Execute a C0 control byte, or a C1 control reduced to its byte value
    /// - 0x07 BEL: Bell
    /// - 0x08 BS: Backspace
    /// - 0x09 HT: Horizontal Tab
    /// - 0x0A LF / 0x0B VT / 0x0C FF: Line Feed
    /// - 0x0D CR: Carriage Return
    /// - 0x84 IND, 0x85 NEL, 0x88 HTS, 0x8D RI
    Execute(u8),

    /// CSI (Control Sequence Introducer) dispatch
    /// Format: ESC \[ \[marker\] \[params\] \[intermediates\] final
    CsiDispatch(CsiDispatch),

    /// OSC (Operating System Command) dispatch
    /// Format: ESC ] payload BEL  or  ESC ] payload ST
    OscDispatch(OscDispatch),

    /// ESC dispatch (non-CSI escape sequences)
    /// Format: ESC \[intermediates\] final
    EscDispatch(EscDispatch),

    /// The display geometry changed
    Resize { cols: usize, rows: usize },

    /// A raw byte typed by the user, on its way to the host
    UserByte(u8),

    /// A recognized but unused sequence (DCS, SOS, PM, APC, malformed CSI).
    /// Applying it is a no-op.
    Ignore,
}

impl Action {
    /// Check if this is a print action
    pub fn is_print(&self) -> bool {
        matches!(self, Action::Print(_))
    }

    /// Check if this is a CSI action
    pub fn is_csi(&self) -> bool {
        matches!(self, Action::CsiDispatch(_))
    }

    /// Short mnemonic used by the action dump tool and debug logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::Print(_) => "Print",
            Action::Execute(_) => "Execute",
            Action::CsiDispatch(_) => "CSI_Dispatch",
            Action::OscDispatch(_) => "OSC_Dispatch",
            Action::EscDispatch(_) => "Esc_Dispatch",
            Action::Resize { .. } => "Resize",
            Action::UserByte(_) => "UserByte",
            Action::Ignore => "Ignore",
        }
    }
}

/// Parameters of a completed CSI sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsiDispatch {
    /// Numeric parameters; an empty parameter is recorded as 0.
    /// Values saturate at `u16::MAX`.
    pub params: Vec<u16>,
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Private marker (`?`, `>`, `<` or `=`) if the sequence started with one
    pub marker: Option<u8>,
    /// Final byte (0x40-0x7E) determines the command
    pub final_byte: u8,
}

impl CsiDispatch {
    pub fn new(final_byte: u8) -> Self {
        Self {
            params: Vec::new(),
            intermediates: Vec::new(),
            marker: None,
            final_byte,
        }
    }

    /// Get parameter at index, or default value if not present
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params.get(index).copied().unwrap_or(default)
    }

    /// Get parameter at index, treating 0 as default
    pub fn param_or_default(&self, index: usize, default: u16) -> u16 {
        match self.params.get(index) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    /// True for DEC private sequences (`CSI ? ...`)
    pub fn is_private(&self) -> bool {
        self.marker == Some(b'?')
    }
}

/// Payload of a completed OSC string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OscDispatch {
    pub payload: String,
}

impl OscDispatch {
    /// Split `Ps ; Pt` into the numeric command and its text.
    ///
    /// Returns `None` for the command when the leading field is not a number.
    pub fn command(&self) -> (Option<u16>, &str) {
        let (head, rest) = match self.payload.split_once(';') {
            Some((head, rest)) => (head, rest),
            None => (self.payload.as_str(), ""),
        };
        (head.parse().ok(), rest)
    }
}

/// A completed non-CSI escape sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscDispatch {
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Final byte (0x30-0x7E)
    pub final_byte: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csi_param() {
        let mut csi = CsiDispatch::new(b'H');
        csi.params = vec![10, 20];

        assert_eq!(csi.param(0, 1), 10);
        assert_eq!(csi.param(1, 1), 20);
        assert_eq!(csi.param(2, 1), 1); // default
    }

    #[test]
    fn test_csi_param_or_default() {
        let mut csi = CsiDispatch::new(b'H');
        csi.params = vec![0, 5];

        assert_eq!(csi.param_or_default(0, 1), 1); // 0 treated as default
        assert_eq!(csi.param_or_default(1, 1), 5);
        assert_eq!(csi.param_or_default(2, 1), 1);
    }

    #[test]
    fn test_osc_command_split() {
        let osc = OscDispatch {
            payload: "2;vim: main.rs".to_string(),
        };
        assert_eq!(osc.command(), (Some(2), "vim: main.rs"));

        let bare = OscDispatch {
            payload: "nonsense".to_string(),
        };
        assert_eq!(bare.command(), (None, ""));
    }

    #[test]
    fn test_action_serialization() {
        let action = Action::CsiDispatch(CsiDispatch {
            params: vec![1, 2, 3],
            intermediates: vec![],
            marker: Some(b'?'),
            final_byte: b'h',
        });

        let json = serde_json::to_string(&action).unwrap();
        let restored: Action = serde_json::from_str(&json).unwrap();

        assert_eq!(action, restored);
    }
}
