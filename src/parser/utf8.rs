//! Streaming UTF-8 decoding for the parser
//!
//! The decoder is the parser's continuation sub-state: it remembers how many
//! continuation bytes are still owed and the bits gathered so far. A byte that
//! breaks a partial sequence is reported with `retry` set so the caller can
//! evaluate it again on a clean decoder, which is a single bounded retry.

/// Result of feeding a byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    /// Successfully decoded a character
    Char(char),
    /// Invalid input. When `retry` is set the byte itself was not consumed
    /// and must be fed again.
    Invalid { retry: bool },
}

/// UTF-8 decoder state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Utf8Decoder {
    /// Bits accumulated so far
    codepoint: u32,
    /// Continuation bytes still expected
    remaining: u8,
    /// Allowed range for the next continuation byte (tightened after some
    /// lead bytes to reject overlong forms and surrogates)
    lower: u8,
    upper: u8,
}

impl Utf8Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check if decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    /// Feed a byte to the decoder
    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        if self.remaining == 0 {
            return self.start(byte);
        }

        if byte < self.lower || byte > self.upper {
            self.reset();
            return Utf8Result::Invalid { retry: true };
        }

        self.codepoint = (self.codepoint << 6) | (byte & 0x3F) as u32;
        self.remaining -= 1;
        self.lower = 0x80;
        self.upper = 0xBF;

        if self.remaining > 0 {
            return Utf8Result::Pending;
        }

        let codepoint = self.codepoint;
        self.reset();
        match char::from_u32(codepoint) {
            Some(c) => Utf8Result::Char(c),
            None => Utf8Result::Invalid { retry: false },
        }
    }

    fn start(&mut self, byte: u8) -> Utf8Result {
        let (bits, remaining, lower, upper) = match byte {
            0x00..=0x7F => return Utf8Result::Char(byte as char),
            0xC2..=0xDF => (byte & 0x1F, 1, 0x80, 0xBF),
            0xE0 => (byte & 0x0F, 2, 0xA0, 0xBF),
            0xED => (byte & 0x0F, 2, 0x80, 0x9F),
            0xE1..=0xEF => (byte & 0x0F, 2, 0x80, 0xBF),
            0xF0 => (byte & 0x07, 3, 0x90, 0xBF),
            0xF4 => (byte & 0x07, 3, 0x80, 0x8F),
            0xF1..=0xF3 => (byte & 0x07, 3, 0x80, 0xBF),
            // Stray continuation, overlong lead or out-of-range lead
            _ => return Utf8Result::Invalid { retry: false },
        };
        self.codepoint = bits as u32;
        self.remaining = remaining;
        self.lower = lower;
        self.upper = upper;
        Utf8Result::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<Utf8Result> {
        let mut decoder = Utf8Decoder::new();
        bytes
            .iter()
            .map(|&b| decoder.feed(b))
            .filter(|r| *r != Utf8Result::Pending)
            .collect()
    }

    #[test]
    fn test_ascii() {
        assert_eq!(decode(b"A"), vec![Utf8Result::Char('A')]);
    }

    #[test]
    fn test_multibyte() {
        assert_eq!(decode("é".as_bytes()), vec![Utf8Result::Char('é')]);
        assert_eq!(decode("世".as_bytes()), vec![Utf8Result::Char('世')]);
        assert_eq!(decode("🎉".as_bytes()), vec![Utf8Result::Char('🎉')]);
    }

    #[test]
    fn test_interrupted_sequence_requests_retry() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(0xE4), Utf8Result::Pending);
        assert!(decoder.is_pending());
        assert_eq!(decoder.feed(b'A'), Utf8Result::Invalid { retry: true });
        assert!(!decoder.is_pending());
        assert_eq!(decoder.feed(b'A'), Utf8Result::Char('A'));
    }

    #[test]
    fn test_stray_continuation() {
        assert_eq!(decode(&[0x80]), vec![Utf8Result::Invalid { retry: false }]);
    }

    #[test]
    fn test_overlong_and_surrogate_rejected() {
        // C0 80 is an overlong NUL
        assert_eq!(decode(&[0xC0])[0], Utf8Result::Invalid { retry: false });
        // ED A0 80 would be a UTF-16 surrogate
        let mut decoder = Utf8Decoder::new();
        decoder.feed(0xED);
        assert_eq!(decoder.feed(0xA0), Utf8Result::Invalid { retry: true });
    }
}
