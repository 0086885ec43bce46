//! Incremental text document with offset/position conversion.
//!
//! The line index is a lazily computed array of line-start offsets. Every
//! edit invalidates it; the first conversion after an edit rebuilds it once.
//! `\n`, `\r` and `\r\n` each count as a single line break.

use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

/// An open EXML text document managed by the server.
#[derive(Debug)]
pub struct Document {
    uri: Url,
    content: String,
    version: i32,
    line_offsets: Option<Vec<usize>>,
}

impl Document {
    pub fn new(uri: Url, content: String, version: i32) -> Self {
        Self {
            uri,
            content,
            version,
            line_offsets: None,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Splice `new_text` over the byte range `[start, end)` and invalidate
    /// the line index.
    pub fn update(&mut self, start: usize, end: usize, new_text: &str) {
        let start = start.min(self.content.len());
        let end = end.clamp(start, self.content.len());
        self.content.replace_range(start..end, new_text);
        self.line_offsets = None;
    }

    /// Apply LSP content changes in order. Ranged changes splice; a change
    /// without a range replaces the whole document.
    pub fn apply_content_changes(
        &mut self,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) {
        for change in changes {
            match change.range {
                Some(range) => {
                    let start = self.offset_at(range.start);
                    let end = self.offset_at(range.end);
                    self.update(start, end, &change.text);
                }
                None => {
                    self.content = change.text.clone();
                    self.line_offsets = None;
                }
            }
        }
        if version > self.version {
            self.version = version;
        }
    }

    fn line_offsets(&mut self) -> &[usize] {
        if self.line_offsets.is_none() {
            self.line_offsets = Some(compute_line_offsets(&self.content));
        }
        self.line_offsets.as_deref().unwrap_or(&[])
    }

    /// Convert a byte offset to a line/column position, clamping the offset
    /// to the document bounds.
    pub fn position_at(&mut self, offset: usize) -> Position {
        let offset = offset.min(self.content.len());
        let offsets = self.line_offsets();
        if offsets.is_empty() {
            return Position::new(0, offset as u32);
        }
        // Binary search for the last line start <= offset.
        let (mut low, mut high) = (0usize, offsets.len());
        while low < high {
            let mid = (low + high) / 2;
            if offsets[mid] > offset {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
        let line = low - 1;
        Position::new(line as u32, (offset - offsets[line]) as u32)
    }

    /// Convert a position to a byte offset, clamping out-of-range lines and
    /// columns to the document bounds.
    pub fn offset_at(&mut self, position: Position) -> usize {
        let len = self.content.len();
        let offsets = self.line_offsets();
        let line = position.line as usize;
        if line >= offsets.len() {
            return len;
        }
        let line_offset = offsets[line];
        let next_line_offset = if line + 1 < offsets.len() {
            offsets[line + 1]
        } else {
            len
        };
        (line_offset + position.character as usize).clamp(line_offset, next_line_offset)
    }

    pub fn line_count(&mut self) -> usize {
        self.line_offsets().len()
    }
}

fn compute_line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let bytes = text.as_bytes();
    let mut is_line_start = true;
    let mut i = 0;
    while i < bytes.len() {
        if is_line_start {
            offsets.push(i);
            is_line_start = false;
        }
        let ch = bytes[i];
        is_line_start = ch == b'\r' || ch == b'\n';
        if ch == b'\r' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            i += 1;
        }
        i += 1;
    }
    if is_line_start && !text.is_empty() {
        offsets.push(text.len());
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn create_test_document(text: &str) -> Document {
        Document::new(
            Url::parse("file:///test.exml").unwrap(),
            text.to_string(),
            0,
        )
    }

    #[test]
    fn test_line_offsets_mixed_breaks() {
        let mut doc = create_test_document("a\nb\r\nc\rd");
        assert_eq!(doc.line_count(), 4);
        assert_eq!(doc.position_at(0), Position::new(0, 0));
        assert_eq!(doc.position_at(2), Position::new(1, 0));
        assert_eq!(doc.position_at(5), Position::new(2, 0));
        assert_eq!(doc.position_at(7), Position::new(3, 0));
    }

    #[test]
    fn test_position_at_clamps_past_end() {
        let mut doc = create_test_document("ab\ncd");
        assert_eq!(doc.position_at(100), Position::new(1, 2));
    }

    #[test]
    fn test_offset_at_clamps_column_to_line() {
        let mut doc = create_test_document("ab\ncd");
        // Column past the end of line 0 clamps to the line break offset.
        assert_eq!(doc.offset_at(Position::new(0, 50)), 3);
        // Line past the end clamps to the document length.
        assert_eq!(doc.offset_at(Position::new(9, 0)), 5);
    }

    #[test]
    fn test_update_splices_and_invalidates() {
        let mut doc = create_test_document("hello world");
        assert_eq!(doc.line_count(), 1);
        doc.update(5, 5, "\nbig");
        assert_eq!(doc.text(), "hello\nbig world");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.position_at(6), Position::new(1, 0));
    }

    #[test]
    fn test_apply_full_change() {
        let mut doc = create_test_document("initial text");
        doc.apply_content_changes(
            &[TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "new text".to_string(),
            }],
            1,
        );
        assert_eq!(doc.text(), "new text");
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_apply_incremental_change() {
        let mut doc = create_test_document("hello world");
        doc.apply_content_changes(
            &[TextDocumentContentChangeEvent {
                range: Some(tower_lsp::lsp_types::Range {
                    start: Position::new(0, 6),
                    end: Position::new(0, 11),
                }),
                range_length: None,
                text: "there".to_string(),
            }],
            1,
        );
        assert_eq!(doc.text(), "hello there");
    }

    #[test]
    fn test_empty_document() {
        let mut doc = create_test_document("");
        assert_eq!(doc.line_count(), 0);
        assert_eq!(doc.position_at(0), Position::new(0, 0));
        assert_eq!(doc.offset_at(Position::new(0, 0)), 0);
    }

    quickcheck! {
        // For all offsets o, offset_at(position_at(o)) == clamp(o, 0, len).
        fn prop_offset_position_round_trip(text: String, offset: usize) -> bool {
            let mut doc = create_test_document(&text);
            // Steer the offset onto a char boundary so the clamp target is
            // well defined for multi-byte input.
            let clamped = offset.min(text.len());
            let aligned = (0..=clamped)
                .rev()
                .find(|o| text.is_char_boundary(*o))
                .unwrap_or(0);
            let pos = doc.position_at(aligned);
            doc.offset_at(pos) == aligned
        }
    }
}
