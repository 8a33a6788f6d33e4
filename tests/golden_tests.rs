//! Golden tests for the parser and framebuffer
//!
//! Each test feeds a byte sequence to a fresh terminal and compares the
//! resulting screen against the state a real VT-class terminal would show.

use vtframe::core::{Color, Cursor, Snapshot};
use vtframe::parser::{Action, CsiDispatch, Parser};
use vtframe::Terminal;

/// Feed `input` to a fresh terminal in one piece
fn run(input: &[u8], cols: usize, rows: usize) -> Terminal {
    let mut term = Terminal::new(cols, rows);
    term.act(input);
    term
}

/// Feed `input` in chunks of `chunk_size` bytes (tests streaming)
fn run_chunked(input: &[u8], cols: usize, rows: usize, chunk_size: usize) -> Terminal {
    let mut term = Terminal::new(cols, rows);
    for chunk in input.chunks(chunk_size) {
        term.act(chunk);
    }
    term
}

// ============================================================================
// Parser output
// ============================================================================

#[test]
fn test_sgr_sequence_actions() {
    let mut parser = Parser::new();
    let actions = parser.parse(b"\x1b[1;31mX");
    let mut csi = CsiDispatch::new(b'm');
    csi.params = vec![1, 31];
    assert_eq!(actions, vec![Action::CsiDispatch(csi), Action::Print('X')]);
}

#[test]
fn test_utf8_split_across_chunks() {
    let mut parser = Parser::new();
    assert!(parser.parse(&[0xE4, 0xB8]).is_empty());
    assert_eq!(parser.parse(&[0x96]), vec![Action::Print('世')]);
}

#[test]
fn test_huge_parameter_saturates() {
    let mut parser = Parser::new();
    let actions = parser.parse(b"\x1b[99999999999999999999A");
    match &actions[..] {
        [Action::CsiDispatch(csi)] => assert_eq!(csi.params, vec![u16::MAX]),
        other => panic!("unexpected actions: {:?}", other),
    }
}

#[test]
fn test_bell_terminated_osc() {
    let mut parser = Parser::new();
    let actions = parser.parse(b"\x1b]0;title\x07");
    match &actions[..] {
        [Action::OscDispatch(osc)] => assert_eq!(osc.payload, "0;title"),
        other => panic!("unexpected actions: {:?}", other),
    }
}

#[test]
fn test_parser_does_not_leak_state_after_garbage() {
    let mut parser = Parser::new();
    parser.parse(b"\x1b[1;2;\x1bP\x9c\x1b]unterminated");
    parser.reset();
    assert_eq!(parser.parse(b"A"), vec![Action::Print('A')]);
}

// ============================================================================
// Basic printing
// ============================================================================

#[test]
fn test_red_hi_then_reset() {
    let term = run(b"\x1b[31mHi\x1b[0m", 10, 2);
    let fb = term.framebuffer();

    assert_eq!(fb.cell(0, 0).unwrap().content, "H");
    assert_eq!(fb.cell(1, 0).unwrap().content, "i");
    assert_eq!(fb.cell(0, 0).unwrap().renditions.fg, Color::RED);
    assert_eq!(fb.cell(1, 0).unwrap().renditions.fg, Color::RED);
    assert_eq!(fb.cell(2, 0).unwrap().renditions.fg, Color::Default);
    assert_eq!(fb.renditions().fg, Color::Default);
    assert_eq!(fb.cursor(), Cursor::new(2, 0));
}

#[test]
fn test_newline_and_carriage_return() {
    let term = run(b"Line1\r\nLine2\r\nLine3", 80, 24);
    let text = term.snapshot().to_text();
    assert_eq!(text, "Line1\nLine2\nLine3\n");
}

#[test]
fn test_line_wrapping() {
    let term = run(b"ABCDEFGHIJ", 5, 3);
    assert_eq!(term.framebuffer().text(), "ABCDE\nFGHIJ\n");
    assert_eq!(term.framebuffer().cursor(), Cursor::new(0, 2));
}

#[test]
fn test_wrap_scrolls_at_bottom() {
    let term = run(b"ABCDEFGHIJKL", 4, 2);
    assert_eq!(term.framebuffer().text(), "IJKL\n");
}

#[test]
fn test_no_autowrap_overwrites_last_column() {
    let term = run(b"\x1b[?7lABCDEFG", 5, 2);
    assert_eq!(term.framebuffer().text(), "ABCDG\n");
    assert_eq!(term.framebuffer().cursor(), Cursor::new(4, 0));
}

#[test]
fn test_wide_characters() {
    let term = run("中文ab".as_bytes(), 10, 1);
    let fb = term.framebuffer();
    assert_eq!(fb.cell(0, 0).unwrap().content, "中");
    assert!(fb.cell(1, 0).unwrap().is_continuation());
    assert_eq!(fb.cell(2, 0).unwrap().content, "文");
    assert_eq!(fb.cell(4, 0).unwrap().content, "a");
    assert_eq!(fb.text(), "中文ab");
}

// ============================================================================
// Cursor movement and erase
// ============================================================================

#[test]
fn test_cursor_movement() {
    let term = run(b"\x1b[10;20H\x1b[3A\x1b[5D", 80, 24);
    assert_eq!(term.framebuffer().cursor(), Cursor::new(14, 6));
}

#[test]
fn test_out_of_bounds_addressing_clamped() {
    let term = run(b"\x1b[500;500H\x1b[999C\x1b[999B\x1b[65535X", 10, 5);
    assert_eq!(term.framebuffer().cursor(), Cursor::new(9, 4));
}

#[test]
fn test_erase_keeps_cursor_and_uses_current_background() {
    let term = run(b"Hello World\x1b[1;6H\x1b[44m\x1b[K", 20, 2);
    let fb = term.framebuffer();
    assert_eq!(fb.text(), "Hello\n");
    assert_eq!(fb.cursor(), Cursor::new(5, 0));
    assert_eq!(fb.cell(5, 0).unwrap().renditions.bg, Color::BLUE);
    assert_eq!(fb.cell(19, 0).unwrap().renditions.bg, Color::BLUE);
    assert_eq!(fb.cell(4, 0).unwrap().renditions.bg, Color::Default);
}

#[test]
fn test_insert_and_delete_chars() {
    let term = run(b"abcdef\x1b[1;3H\x1b[2@XY\x1b[1;1H\x1b[P", 10, 1);
    assert_eq!(term.framebuffer().text(), "bXYcdef");
}

#[test]
fn test_scroll_region() {
    let term = run(
        b"1\r\n2\r\n3\r\n4\r\n5\x1b[2;4r\x1b[4;1H\n\n",
        5,
        5,
    );
    assert_eq!(term.framebuffer().text(), "1\n4\n\n\n5");
}

#[test]
fn test_reverse_index_in_region() {
    let term = run(b"a\r\nb\r\nc\x1b[1;2r\x1b[H\x1bM", 3, 3);
    assert_eq!(term.framebuffer().text(), "\na\nc");
}

#[test]
fn test_tab_stops() {
    let term = run(b"\tX\x1b[3g\r\tY\x1b[1;4H\x1bH\r\tZ", 20, 2);
    let fb = term.framebuffer();
    assert_eq!(fb.cell(8, 0).unwrap().content, "X");
    assert_eq!(fb.cell(19, 0).unwrap().content, "Y");
    assert_eq!(fb.cell(3, 0).unwrap().content, "Z");
}

#[test]
fn test_save_restore_cursor_keeps_rendition() {
    let term = run(b"\x1b[32m\x1b7\x1b[0m\x1b[3;3H\x1b8G", 10, 5);
    let fb = term.framebuffer();
    assert_eq!(fb.cell(0, 0).unwrap().renditions.fg, Color::GREEN);
    assert_eq!(fb.cursor(), Cursor::new(1, 0));
}

// ============================================================================
// Streaming and determinism
// ============================================================================

#[test]
fn test_chunk_boundary_parsing() {
    let input = "\x1b[1;31mBold 世界\x1b[0m\r\n\x1b]2;title\x07\x1b[5;5Hdone".as_bytes();
    let whole = run(input, 20, 6);
    for chunk_size in [1, 2, 3, 7] {
        let chunked = run_chunked(input, 20, 6, chunk_size);
        assert_eq!(whole.snapshot(), chunked.snapshot(), "chunk size {}", chunk_size);
    }
}

#[test]
fn test_snapshot_deterministic_json() {
    let input = b"\x1b[38;5;200mcolor\x1b[48;2;1;2;3m rgb\x1b[0m";
    let a = run(input, 12, 2).snapshot().to_json().unwrap();
    let b = run(input, 12, 2).snapshot().to_json().unwrap();
    assert_eq!(a, b);
    let restored = Snapshot::from_json(&a).unwrap();
    assert!(restored.content_equals(&run(input, 12, 2).snapshot()));
}

#[test]
fn test_unknown_sequences_leave_screen_untouched() {
    let term = run(b"ok\x1b[?1337h\x1b[12;34;56y\x1b]777;notify\x07\x1b_apc\x1b\\", 10, 2);
    assert_eq!(term.framebuffer().text(), "ok\n");
    assert_eq!(term.framebuffer().cursor(), Cursor::new(2, 0));
}
