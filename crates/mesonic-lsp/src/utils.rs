//! Byte-offset / LSP-position conversions.

use tower_lsp::lsp_types::*;

/// Convert a byte offset into an LSP `Position` (line/character). Offsets
/// past the end clamp to the end.
pub(crate) fn offset_to_position(text: &str, offset: usize) -> Position {
    let mut line = 0u32;
    let mut col = 0u32;
    for (i, ch) in text.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    Position::new(line, col)
}

/// Convert an LSP `Position` into a byte offset, clamped to a valid
/// boundary.
pub(crate) fn position_to_offset(text: &str, pos: Position) -> usize {
    let mut current_line = 0u32;
    let mut current_col = 0u32;
    for (i, ch) in text.char_indices() {
        if current_line == pos.line && current_col == pos.character {
            return i;
        }
        if ch == '\n' {
            if current_line == pos.line {
                // Position is past end of this line — clamp to newline
                return i;
            }
            current_line += 1;
            current_col = 0;
        } else {
            current_col += 1;
        }
    }
    text.len()
}

/// Convert byte offsets into an LSP `Range`.
pub(crate) fn offset_to_range(text: &str, start: usize, end: usize) -> Range {
    Range::new(
        offset_to_position(text, start),
        offset_to_position(text, end),
    )
}

/// Apply an incremental text change to a source string.
pub(crate) fn apply_incremental_change(text: &mut String, range: &Range, new_text: &str) {
    let start = position_to_offset(text, range.start);
    let end = position_to_offset(text, range.end);
    let start = start.min(text.len());
    let end = end.min(text.len());
    text.replace_range(start..end, new_text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_to_position_basic() {
        let text = "x = 1\ny = 2\nfoo()";
        assert_eq!(offset_to_position(text, 0), Position::new(0, 0));
        assert_eq!(offset_to_position(text, 5), Position::new(0, 5));
        assert_eq!(offset_to_position(text, 6), Position::new(1, 0));
        assert_eq!(offset_to_position(text, 11), Position::new(1, 5));
        assert_eq!(offset_to_position(text, 12), Position::new(2, 0));
    }

    #[test]
    fn offset_to_position_clamps_past_end() {
        let text = "ab";
        assert_eq!(offset_to_position(text, 100), Position::new(0, 2));
    }

    #[test]
    fn position_to_offset_round_trips() {
        let text = "x = static_library('a', 'a.c')\ny = 2\n";
        for offset in [0, 4, 12, 30, 31, 36] {
            let pos = offset_to_position(text, offset);
            assert_eq!(position_to_offset(text, pos), offset);
        }
    }

    #[test]
    fn position_to_offset_clamps_past_line_end() {
        let text = "ab\ncd";
        assert_eq!(position_to_offset(text, Position::new(0, 10)), 2);
        assert_eq!(position_to_offset(text, Position::new(9, 0)), text.len());
    }

    #[test]
    fn offset_to_range_spans_lines() {
        let text = "ab\ncd";
        let range = offset_to_range(text, 1, 4);
        assert_eq!(range.start, Position::new(0, 1));
        assert_eq!(range.end, Position::new(1, 1));
    }

    #[test]
    fn apply_incremental_change_replaces_span() {
        let mut text = "x = 1\ny = 2\n".to_owned();
        let range = Range::new(Position::new(1, 4), Position::new(1, 5));
        apply_incremental_change(&mut text, &range, "42");
        assert_eq!(text, "x = 1\ny = 42\n");
    }

    #[test]
    fn apply_incremental_change_inserts_at_point() {
        let mut text = "foo()".to_owned();
        let range = Range::new(Position::new(0, 4), Position::new(0, 4));
        apply_incremental_change(&mut text, &range, "'a'");
        assert_eq!(text, "foo('a')");
    }
}
