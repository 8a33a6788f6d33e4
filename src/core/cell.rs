//! Terminal Cell
//!
//! Represents a single cell in the terminal grid, containing a character
//! and its associated rendition (colors and style flags).
//!
//! Wide characters occupy two cells: a lead cell of width 2 holding the glyph
//! and a continuation cell of width 0 holding nothing.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

/// A single cell in the terminal grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character(s) in this cell. Empty for blank and continuation
    /// cells; may hold several codepoints when combining marks follow a base.
    pub content: String,
    /// Columns occupied: 1 normally, 2 for a wide lead, 0 for a continuation
    pub width: u8,
    /// Colors and style flags
    pub renditions: Renditions,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Renditions::default())
    }
}

impl Cell {
    /// Create a new cell with a single character and default rendition
    pub fn new(c: char) -> Self {
        Self::with_renditions(c, Renditions::default())
    }

    /// Create a cell holding `c` drawn with `renditions`
    pub fn with_renditions(c: char, renditions: Renditions) -> Self {
        let mut content = String::new();
        // A space is stored as a blank so both compare equal
        if c != ' ' {
            content.push(c);
        }
        Self {
            content,
            width: char_width(c).max(1) as u8,
            renditions,
        }
    }

    /// An empty cell carrying `renditions` (what erase and scroll leave behind)
    pub fn blank(renditions: Renditions) -> Self {
        Self {
            content: String::new(),
            width: 1,
            renditions,
        }
    }

    /// The right half of a wide character
    pub fn continuation(renditions: Renditions) -> Self {
        Self {
            content: String::new(),
            width: 0,
            renditions,
        }
    }

    /// Check if this cell is blank (no content, single width)
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.width == 1
    }

    /// Check if this cell is a wide character placeholder
    /// (the second cell of a double-width character)
    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Check if this cell starts a double-width character
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Attach a combining mark to this cell's glyph
    pub fn combine(&mut self, mark: char) {
        if self.content.is_empty() {
            self.content.push(' ');
        }
        self.content.push(mark);
    }

    /// Text to draw for this cell on a real terminal
    pub fn display_str(&self) -> &str {
        if self.content.is_empty() {
            " "
        } else {
            &self.content
        }
    }

    /// Reset the cell to a blank carrying `renditions`
    pub fn reset(&mut self, renditions: &Renditions) {
        self.content.clear();
        self.width = 1;
        self.renditions = renditions.clone();
    }
}

/// Display width of a codepoint as the grid sees it (0, 1 or 2)
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(1).min(2)
}

/// Color representation supporting indexed and RGB colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    #[default]
    Default,
    /// 256-color palette index
    Indexed(u8),
    /// 24-bit RGB color
    Rgb(u8, u8, u8),
}

impl Color {
    /// Standard ANSI colors (0-7)
    pub const BLACK: Color = Color::Indexed(0);
    pub const RED: Color = Color::Indexed(1);
    pub const GREEN: Color = Color::Indexed(2);
    pub const YELLOW: Color = Color::Indexed(3);
    pub const BLUE: Color = Color::Indexed(4);
    pub const MAGENTA: Color = Color::Indexed(5);
    pub const CYAN: Color = Color::Indexed(6);
    pub const WHITE: Color = Color::Indexed(7);

    /// Append the SGR parameters selecting this color.
    /// `base` is 30 for foreground, 40 for background.
    fn write_sgr(&self, base: u16, out: &mut String) {
        use std::fmt::Write;
        // Writing into a String cannot fail
        let _ = match *self {
            Color::Default => write!(out, ";{}", base + 9),
            Color::Indexed(n) if n < 8 => write!(out, ";{}", base + n as u16),
            Color::Indexed(n) if n < 16 => write!(out, ";{}", base + 60 + (n - 8) as u16),
            Color::Indexed(n) => write!(out, ";{};5;{}", base + 8, n),
            Color::Rgb(r, g, b) => write!(out, ";{};2;{};{};{}", base + 8, r, g, b),
        };
    }
}

/// Text style attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub inverse: bool,
    pub hidden: bool,
    pub strikethrough: bool,
}

/// The SGR register: everything a Print stamps onto a cell besides its text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renditions {
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Text style attributes
    pub style: Style,
}

impl Renditions {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The rendition a background-color-erase terminal gives erased cells
    pub fn background_only(&self) -> Renditions {
        Renditions {
            bg: self.bg,
            ..Renditions::default()
        }
    }

    /// Apply an SGR parameter list. An empty list means reset.
    /// Unrecognized codes are skipped.
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let code = params[i];
            match code {
                0 => self.reset(),
                1 => self.style.bold = true,
                2 => self.style.faint = true,
                3 => self.style.italic = true,
                4 | 21 => self.style.underline = true,
                5 | 6 => self.style.blink = true,
                7 => self.style.inverse = true,
                8 => self.style.hidden = true,
                9 => self.style.strikethrough = true,
                22 => {
                    self.style.bold = false;
                    self.style.faint = false;
                }
                23 => self.style.italic = false,
                24 => self.style.underline = false,
                25 => self.style.blink = false,
                27 => self.style.inverse = false,
                28 => self.style.hidden = false,
                29 => self.style.strikethrough = false,
                30..=37 => self.fg = Color::Indexed((code - 30) as u8),
                39 => self.fg = Color::Default,
                40..=47 => self.bg = Color::Indexed((code - 40) as u8),
                49 => self.bg = Color::Default,
                90..=97 => self.fg = Color::Indexed((code - 90 + 8) as u8),
                100..=107 => self.bg = Color::Indexed((code - 100 + 8) as u8),
                38 | 48 => {
                    let (color, used) = extended_color(&params[i + 1..]);
                    if let Some(color) = color {
                        if code == 38 {
                            self.fg = color;
                        } else {
                            self.bg = color;
                        }
                    }
                    i += used;
                }
                _ => tracing::trace!(code, "unhandled SGR code"),
            }
            i += 1;
        }
    }

    /// The complete SGR sequence that establishes this rendition from any
    /// prior state (always starts with a reset).
    pub fn sgr(&self) -> String {
        let mut out = String::from("\x1b[0");
        let flags = [
            (self.style.bold, ";1"),
            (self.style.faint, ";2"),
            (self.style.italic, ";3"),
            (self.style.underline, ";4"),
            (self.style.blink, ";5"),
            (self.style.inverse, ";7"),
            (self.style.hidden, ";8"),
            (self.style.strikethrough, ";9"),
        ];
        for (on, code) in flags {
            if on {
                out.push_str(code);
            }
        }
        if self.fg != Color::Default {
            self.fg.write_sgr(30, &mut out);
        }
        if self.bg != Color::Default {
            self.bg.write_sgr(40, &mut out);
        }
        out.push('m');
        out
    }
}

/// Decode the tail of `38;...` / `48;...`: `5;n` or `2;r;g;b`.
/// Returns the color and how many parameters were consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => match rest.get(1) {
            Some(&n) => (Some(Color::Indexed(n.min(255) as u8)), 2),
            None => (None, 1),
        },
        Some(2) if rest.len() >= 4 => {
            let c = |v: u16| v.min(255) as u8;
            (Some(Color::Rgb(c(rest[1]), c(rest[2]), c(rest[3]))), 4)
        }
        Some(2) => (None, rest.len()),
        Some(_) => (None, 1),
        None => (None, 0),
    }
}
