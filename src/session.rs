//! Session
//!
//! Owns one terminal and the real display it is mirrored to. Host output and
//! user keystrokes are applied as they arrive; frames are rendered on ticks,
//! no more often than the configured frame interval. All timing state lives
//! in the session's `FrameClock` and every time-dependent call takes `now`
//! explicitly, so the caller's event loop decides what time it is.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::config::Config;
use crate::core::Framebuffer;
use crate::display::Display;
use crate::terminal::Terminal;

/// Rate limiter for frame output
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last_frame: Option<Instant>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left before a frame may be drawn (zero when one may be drawn now)
    pub fn time_until_ready(&self, now: Instant) -> Duration {
        match self.last_frame {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.time_until_ready(now).is_zero()
    }

    /// Record that a frame was drawn at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }
}

/// A terminal mirrored onto a real display
#[derive(Debug, Clone)]
pub struct Session {
    terminal: Terminal,
    display: Display,
    /// What the real terminal currently shows; `None` before the first frame
    shown: Option<Framebuffer>,
    clock: FrameClock,
    /// The terminal changed since the last frame
    dirty: bool,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self::with_display(config, Display::new())
    }

    pub fn with_display(config: &Config, display: Display) -> Self {
        Self {
            terminal: Terminal::with_config(config),
            display,
            shown: None,
            clock: FrameClock::new(config.frame_interval()),
            dirty: true,
        }
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// True when a frame is owed to the display
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Bytes to write before the first frame
    pub fn open(&self) -> Vec<u8> {
        self.display.open()
    }

    /// Bytes to write when the session ends
    pub fn close(&self) -> Vec<u8> {
        self.display.close()
    }

    /// Apply output from the host. Returns bytes owed to the host.
    pub fn host_output(&mut self, data: &[u8]) -> Vec<u8> {
        trace!(len = data.len(), "host output");
        self.dirty = true;
        self.terminal.act(data)
    }

    /// Apply user keystrokes. Returns bytes to forward to the host.
    pub fn user_input(&mut self, data: &[u8]) -> Vec<u8> {
        self.terminal.user_input(data)
    }

    /// The display changed size
    pub fn resize(&mut self, cols: usize, rows: usize) {
        debug!(cols, rows, "display resized");
        self.terminal.resize(cols, rows);
        self.dirty = true;
    }

    /// Forget what the display shows; the next frame repaints everything
    pub fn force_redraw(&mut self) {
        self.shown = None;
        self.dirty = true;
    }

    /// How long the caller may sleep before calling `tick`, or `None` when
    /// there is nothing to draw
    pub fn next_timeout(&self, now: Instant) -> Option<Duration> {
        self.dirty.then(|| self.clock.time_until_ready(now))
    }

    /// Render a frame if one is owed and the frame interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<Vec<u8>> {
        if !self.dirty || !self.clock.is_ready(now) {
            return None;
        }
        let current = self.terminal.framebuffer();
        let frame = match &self.shown {
            Some(shown) => self.display.new_frame(true, shown, current),
            None => self.display.new_frame(false, current, current),
        };
        trace!(bytes = frame.len(), "frame rendered");
        self.shown = Some(current.clone());
        self.clock.mark(now);
        self.dirty = false;
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(&Config {
            cols: 10,
            rows: 3,
            ..Default::default()
        })
    }

    #[test]
    fn test_frame_clock() {
        let start = Instant::now();
        let mut clock = FrameClock::new(Duration::from_millis(20));
        assert!(clock.is_ready(start));
        clock.mark(start);
        assert!(!clock.is_ready(start + Duration::from_millis(5)));
        assert_eq!(
            clock.time_until_ready(start + Duration::from_millis(5)),
            Duration::from_millis(15)
        );
        assert!(clock.is_ready(start + Duration::from_millis(20)));
    }

    #[test]
    fn test_first_tick_repaints() {
        let mut s = session();
        let frame = s.tick(Instant::now()).unwrap();
        assert!(frame.starts_with(b"\x1b[?25l\x1b[r"));
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_ticks_rate_limited() {
        let start = Instant::now();
        let mut s = session();
        assert!(s.tick(start).is_some());

        s.host_output(b"hi");
        assert!(s.tick(start + Duration::from_millis(5)).is_none());
        assert_eq!(
            s.next_timeout(start + Duration::from_millis(5)),
            Some(Duration::from_millis(15))
        );
        let frame = s.tick(start + Duration::from_millis(20)).unwrap();
        assert_eq!(frame, b"\x1b[Hhi");
    }

    #[test]
    fn test_idle_session_draws_nothing() {
        let start = Instant::now();
        let mut s = session();
        s.tick(start);
        assert_eq!(s.next_timeout(start), None);
        assert!(s.tick(start + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_replies_returned_to_caller() {
        let mut s = session();
        assert_eq!(s.host_output(b"\x1b[5n"), b"\x1b[0n");
        assert_eq!(s.user_input(b"\x1bOA"), b"\x1b[A");
    }

    #[test]
    fn test_resize_repaints() {
        let start = Instant::now();
        let mut s = session();
        s.tick(start);
        s.resize(20, 5);
        let frame = s.tick(start + Duration::from_millis(20)).unwrap();
        assert!(frame.starts_with(b"\x1b[r\x1b[0m\x1b[H\x1b[2J"));
    }

    #[test]
    fn test_force_redraw() {
        let start = Instant::now();
        let mut s = session();
        s.host_output(b"abc");
        s.tick(start);
        s.force_redraw();
        let frame = s.tick(start + Duration::from_millis(20)).unwrap();
        let text = String::from_utf8(frame).unwrap();
        assert!(text.contains("abc"));
    }
}
