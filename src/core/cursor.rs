//! Cursor state
//!
//! Position plus the state captured by save/restore (DECSC/DECRC and CSI s/u).

use serde::{Deserialize, Serialize};

use super::cell::Renditions;

/// Cursor position (0-indexed, always inside the grid)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column position
    pub col: usize,
    /// Row position
    pub row: usize,
}

impl Cursor {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// Saved cursor state for DECSC/DECRC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub cursor: Cursor,
    pub renditions: Renditions,
    pub origin: bool,
    pub autowrap: bool,
}

impl Default for SavedCursor {
    fn default() -> Self {
        Self {
            cursor: Cursor::default(),
            renditions: Renditions::default(),
            origin: false,
            autowrap: true,
        }
    }
}
