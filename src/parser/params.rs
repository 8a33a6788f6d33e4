//! CSI parameter accumulation
//!
//! Collects semicolon-separated numeric parameters one byte at a time, so a
//! sequence split across input chunks resumes exactly where it stopped.
//! Colon sub-parameter separators are folded into plain separators.

/// Maximum number of parameters a sequence may carry before it is ignored
pub const MAX_PARAMS: usize = 32;

/// Streaming accumulator for CSI/DCS parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    /// Completed parameter values (0 means default/unspecified)
    values: Vec<u16>,
    /// Parameter currently being built
    current: u16,
    /// Whether any parameter byte has been seen for this sequence
    started: bool,
    /// Set once more than `MAX_PARAMS` parameters were supplied
    overflowed: bool,
}

impl Params {
    /// Create empty params
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(16),
            ..Default::default()
        }
    }

    /// Forget everything, ready for a new sequence
    pub fn clear(&mut self) {
        self.values.clear();
        self.current = 0;
        self.started = false;
        self.overflowed = false;
    }

    /// Feed one parameter byte (`0-9`, `;` or `:`).
    ///
    /// Returns `false` once the sequence carries too many parameters; the
    /// caller should then ignore the rest of the sequence.
    pub fn push(&mut self, byte: u8) -> bool {
        self.started = true;
        match byte {
            b'0'..=b'9' => {
                // Saturate rather than wrap
                self.current = self
                    .current
                    .saturating_mul(10)
                    .saturating_add((byte - b'0') as u16);
            }
            b';' | b':' => {
                if self.values.len() >= MAX_PARAMS - 1 {
                    self.overflowed = true;
                } else {
                    self.values.push(self.current);
                }
                self.current = 0;
            }
            _ => {}
        }
        !self.overflowed
    }

    /// Whether too many parameters were supplied
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Finish the sequence and take the parameter list
    pub fn finish(&mut self) -> Vec<u16> {
        if self.started && !self.overflowed {
            self.values.push(self.current);
        }
        let values = std::mem::take(&mut self.values);
        self.clear();
        values
    }
}
