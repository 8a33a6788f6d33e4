//! Display output
//!
//! Turns framebuffer states into bytes for a real ANSI terminal:
//! - `ansi`: the fixed escape-sequence vocabulary written to the terminal
//! - `renderer`: the differential frame renderer

pub mod ansi;
mod renderer;

pub use renderer::Display;
