//! Terminal Core Module
//!
//! Platform-independent terminal state. This module contains:
//! - Cell representation with renditions
//! - Rows with wide-character aware editing
//! - The framebuffer: grid, cursor, scroll region, modes
//! - Deterministic snapshot generation
//!
//! The core is completely deterministic: given the same sequence of
//! terminal actions, it will always produce the same state.

mod cell;
mod cursor;
mod framebuffer;
mod grid;
mod modes;
mod snapshot;

pub use cell::{char_width, Cell, Color, Renditions, Style};
pub use cursor::{Cursor, SavedCursor};
pub use framebuffer::Framebuffer;
pub use grid::Row;
pub use modes::{Modes, MouseMode};
pub use snapshot::{CellSnapshot, ColorSnapshot, CursorSnapshot, ModesSnapshot, Snapshot, StyleSnapshot};
