//! vtframe
//!
//! A terminal emulation engine. Host output is parsed into actions that
//! mutate an in-memory framebuffer, and the differences between successive
//! framebuffer states are rendered back into the escape sequences that bring
//! a real terminal up to date.
//!
//! - `parser`: VT/xterm escape sequence parser producing `Action`s
//! - `core`: cells, rows, the framebuffer and snapshots
//! - `terminal`: applies actions and collects replies to the host
//! - `input`: user keystroke translation
//! - `display`: the differential renderer
//! - `session`: a terminal, its display and the frame clock
//! - `config`: engine configuration

pub mod config;
pub mod core;
pub mod display;
pub mod input;
pub mod parser;
pub mod session;
pub mod terminal;

pub use config::{Config, ConfigError};
pub use core::{Framebuffer, Snapshot};
pub use display::Display;
pub use parser::{Action, Parser};
pub use session::{FrameClock, Session};
pub use terminal::Terminal;
