//! Deterministic snapshot generation
//!
//! Snapshots capture the visible framebuffer state in a serializable format
//! for golden tests and the headless runner. Given the same byte stream, the
//! terminal must produce identical snapshots.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Color, Style};
use super::framebuffer::Framebuffer;
use super::modes::{Modes, MouseMode};

/// A complete snapshot of the framebuffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Screen dimensions
    pub cols: usize,
    pub rows: usize,
    /// Visible grid content (row-major)
    pub grid: Vec<Vec<CellSnapshot>>,
    /// Cursor state
    pub cursor: CursorSnapshot,
    /// Scroll region
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    /// Terminal modes
    pub modes: ModesSnapshot,
    /// Window title
    pub title: String,
    pub bell_count: u64,
}

/// Snapshot of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Character content
    pub content: String,
    pub fg: ColorSnapshot,
    pub bg: ColorSnapshot,
    pub style: StyleSnapshot,
    /// Cell width (0 for continuation, 1 normal, 2 wide)
    pub width: u8,
}

/// Snapshot of a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColorSnapshot {
    Default,
    Indexed { index: u8 },
    Rgb { r: u8, g: u8, b: u8 },
}

/// Snapshot of style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSnapshot {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub faint: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverse: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Snapshot of cursor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub col: usize,
    pub row: usize,
    pub visible: bool,
}

/// Snapshot of terminal modes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModesSnapshot {
    #[serde(default, skip_serializing_if = "is_false")]
    pub application_cursor: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bracketed_paste: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub origin: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub insert: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_autowrap: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reverse_video: bool,
    pub mouse_tracking: String,
}

impl From<&Color> for ColorSnapshot {
    fn from(color: &Color) -> Self {
        match *color {
            Color::Default => ColorSnapshot::Default,
            Color::Indexed(index) => ColorSnapshot::Indexed { index },
            Color::Rgb(r, g, b) => ColorSnapshot::Rgb { r, g, b },
        }
    }
}

impl From<&Style> for StyleSnapshot {
    fn from(style: &Style) -> Self {
        StyleSnapshot {
            bold: style.bold,
            faint: style.faint,
            italic: style.italic,
            underline: style.underline,
            blink: style.blink,
            inverse: style.inverse,
            hidden: style.hidden,
            strikethrough: style.strikethrough,
        }
    }
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        CellSnapshot {
            content: cell.content.clone(),
            fg: ColorSnapshot::from(&cell.renditions.fg),
            bg: ColorSnapshot::from(&cell.renditions.bg),
            style: StyleSnapshot::from(&cell.renditions.style),
            width: cell.width,
        }
    }
}

impl From<&Modes> for ModesSnapshot {
    fn from(modes: &Modes) -> Self {
        ModesSnapshot {
            application_cursor: modes.application_cursor_keys,
            bracketed_paste: modes.bracketed_paste,
            origin: modes.origin,
            insert: modes.insert,
            no_autowrap: !modes.autowrap,
            reverse_video: modes.reverse_video,
            mouse_tracking: match modes.mouse_mode {
                MouseMode::None => "none",
                MouseMode::Normal => "normal",
                MouseMode::ButtonMotion => "button_motion",
                MouseMode::AnyMotion => "any_motion",
            }
            .to_string(),
        }
    }
}

impl Snapshot {
    /// Capture the current framebuffer state
    pub fn from_framebuffer(fb: &Framebuffer) -> Self {
        let grid = fb
            .grid()
            .iter()
            .map(|row| row.cells().iter().map(CellSnapshot::from).collect())
            .collect();
        let (scroll_top, scroll_bottom) = fb.scroll_region();

        Snapshot {
            cols: fb.cols(),
            rows: fb.rows(),
            grid,
            cursor: CursorSnapshot {
                col: fb.cursor().col,
                row: fb.cursor().row,
                visible: fb.modes().cursor_visible,
            },
            scroll_top,
            scroll_bottom,
            modes: ModesSnapshot::from(fb.modes()),
            title: fb.title().to_string(),
            bell_count: fb.bell_count(),
        }
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Plain text of the screen, trailing blanks and empty lines removed
    pub fn to_text(&self) -> String {
        let mut result = String::new();

        for row in &self.grid {
            for cell in row {
                if cell.width == 0 {
                    continue;
                }
                if cell.content.is_empty() {
                    result.push(' ');
                } else {
                    result.push_str(&cell.content);
                }
            }
            while result.ends_with(' ') {
                result.pop();
            }
            result.push('\n');
        }

        while result.ends_with("\n\n") {
            result.pop();
        }

        result
    }

    /// Compare grid contents only
    pub fn content_equals(&self, other: &Snapshot) -> bool {
        self.cols == other.cols && self.rows == other.rows && self.grid == other.grid
    }
}
