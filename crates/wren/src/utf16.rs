//
// utf16.rs
//
// Byte offset <-> LSP position conversion. LSP positions count UTF-16 code
// units; the syntax layer works in byte offsets.
//

use tower_lsp::lsp_types::{Position, Range};

/// Convert a UTF-16 column offset (from LSP Position.character) to a byte
/// offset within the given line.
pub fn utf16_column_to_byte_offset(line: &str, utf16_col: u32) -> usize {
    let mut utf16_count = 0;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_count >= utf16_col as usize {
            return byte_idx;
        }
        utf16_count += ch.len_utf16();
    }
    line.len()
}

/// Convert a byte offset within a line to a UTF-16 column.
pub fn byte_offset_to_utf16_column(line: &str, byte_offset: usize) -> u32 {
    let mut end = byte_offset.min(line.len());
    while end > 0 && !line.is_char_boundary(end) {
        end -= 1;
    }
    line[..end].encode_utf16().count() as u32
}

/// Line start table for one document.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }

    fn line_text<'a>(&self, text: &'a str, line: usize) -> &'a str {
        let start = self.line_starts.get(line).copied().unwrap_or(self.len);
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.len)
            .min(text.len());
        let start = start.min(end);
        text[start..end].trim_end_matches(&['\n', '\r'][..])
    }

    pub fn position_at(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];
        let character = byte_offset_to_utf16_column(self.line_text(text, line), offset - line_start);
        Position::new(line as u32, character)
    }

    pub fn offset_at(&self, text: &str, position: Position) -> usize {
        let line = position.line as usize;
        let Some(&line_start) = self.line_starts.get(line) else {
            return self.len;
        };
        line_start + utf16_column_to_byte_offset(self.line_text(text, line), position.character)
    }

    pub fn range_of(&self, text: &str, start: usize, end: usize) -> Range {
        Range::new(self.position_at(text, start), self.position_at(text, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_round_trip() {
        let text = "$a: 1;\n.b { c: $a; }\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 3);
        let pos = index.position_at(text, 14);
        assert_eq!(pos, Position::new(1, 7));
        assert_eq!(index.offset_at(text, pos), 14);
    }

    #[test]
    fn test_utf16_columns() {
        let text = "/* é😀 */ $x: 1;";
        let index = LineIndex::new(text);
        let offset = text.find('$').unwrap();
        let pos = index.position_at(text, offset);
        // "/* " = 3, "é" = 1, "😀" = 2, " */ " = 4
        assert_eq!(pos.character, 10);
        assert_eq!(index.offset_at(text, pos), offset);
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let text = "a\nb";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_at(text, Position::new(9, 0)), text.len());
        assert_eq!(index.position_at(text, 100), Position::new(1, 1));
    }

    #[test]
    fn test_utf16_column_to_byte_offset() {
        assert_eq!(utf16_column_to_byte_offset("héllo", 2), 3);
        assert_eq!(utf16_column_to_byte_offset("abc", 10), 3);
    }
}
