//! Streaming tokenizer for EXML markup.
//!
//! A single forward scan over the input emits ranged events for every
//! construct it recognizes. Malformed constructs produce [`Event::Error`]
//! alongside the best-effort token, never a panic or an early stop; offsets
//! are byte offsets into the original text.

use super::node::{Attribute, ParseError};

/// One tokenizer event. All ranges are byte ranges of the source that
/// produced the event.
#[derive(Debug, Clone)]
pub enum Event {
    ProcessingInstruction {
        start: usize,
        end: usize,
        name: String,
        body: String,
    },
    Comment {
        start: usize,
        end: usize,
        text: String,
    },
    /// CDATA content; `start`/`end` delimit the content between the markers.
    CData {
        start: usize,
        end: usize,
        text: String,
    },
    Text {
        start: usize,
        end: usize,
        text: String,
    },
    /// `<name` was scanned; attribute events follow until [`Event::OpenTagEnd`].
    OpenTagStart {
        start: usize,
        name_start: usize,
        name_end: usize,
        name: String,
    },
    Attribute(Attribute),
    /// Terminates the current open tag. `closed` is false when the input or
    /// a stray `<` ended the tag before `>` was seen.
    OpenTagEnd {
        end: usize,
        self_closing: bool,
        closed: bool,
    },
    CloseTag {
        start: usize,
        name_start: usize,
        name_end: usize,
        end: usize,
        name: String,
    },
    Error(ParseError),
}

/// Run the tokenizer over `text`, feeding every event to `sink` in document
/// order.
pub fn scan(text: &str, sink: &mut impl FnMut(Event)) {
    Tokenizer {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    }
    .run(sink);
}

/// Convenience wrapper collecting all events.
pub fn tokenize(text: &str) -> Vec<Event> {
    let mut events = Vec::new();
    scan(text, &mut |e| events.push(e));
    events
}

struct Tokenizer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

fn is_name_byte(b: u8) -> bool {
    !matches!(b, b'<' | b'>' | b'/' | b'=' | b'"' | b'\'') && !b.is_ascii_whitespace()
}

impl<'a> Tokenizer<'a> {
    fn run(mut self, sink: &mut impl FnMut(Event)) {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            if self.bytes[self.pos] == b'<' {
                self.markup(start, sink);
            } else {
                let end = self.find(b'<').unwrap_or(self.bytes.len());
                sink(Event::Text {
                    start,
                    end,
                    text: self.text[start..end].to_string(),
                });
                self.pos = end;
            }
        }
    }

    fn find(&self, byte: u8) -> Option<usize> {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| b == byte)
            .map(|i| self.pos + i)
    }

    fn find_str(&self, needle: &str) -> Option<usize> {
        self.text[self.pos..].find(needle).map(|i| self.pos + i)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn scan_name(&mut self) -> (usize, usize) {
        let start = self.pos;
        while self.pos < self.bytes.len() && is_name_byte(self.bytes[self.pos]) {
            self.pos += 1;
        }
        (start, self.pos)
    }

    fn error(&self, start: usize, end: usize, message: &str) -> Event {
        Event::Error(ParseError {
            start,
            end,
            message: message.to_string(),
        })
    }

    /// Dispatch on the construct introduced by `<` at `start`.
    fn markup(&mut self, start: usize, sink: &mut impl FnMut(Event)) {
        let rest = &self.text[start..];
        if rest.starts_with("<!--") {
            self.comment(start, sink);
        } else if rest.starts_with("<![CDATA[") {
            self.cdata(start, sink);
        } else if rest.starts_with("<!") {
            // DOCTYPE and friends are outside the dialect; skip to `>`.
            self.pos = start + 2;
            let end = self.find(b'>').map(|i| i + 1).unwrap_or(self.bytes.len());
            sink(self.error(start, end, "unsupported markup declaration"));
            self.pos = end;
        } else if rest.starts_with("<?") {
            self.processing_instruction(start, sink);
        } else if rest.starts_with("</") {
            self.close_tag(start, sink);
        } else {
            self.open_tag(start, sink);
        }
    }

    fn comment(&mut self, start: usize, sink: &mut impl FnMut(Event)) {
        self.pos = start + 4;
        let (content_end, end) = match self.find_str("-->") {
            Some(i) => (i, i + 3),
            None => {
                sink(self.error(start, self.bytes.len(), "unterminated comment"));
                (self.bytes.len(), self.bytes.len())
            }
        };
        sink(Event::Comment {
            start,
            end,
            text: self.text[start + 4..content_end].to_string(),
        });
        self.pos = end;
    }

    fn cdata(&mut self, start: usize, sink: &mut impl FnMut(Event)) {
        let content_start = start + 9;
        self.pos = content_start;
        let (content_end, end) = match self.find_str("]]>") {
            Some(i) => (i, i + 3),
            None => {
                sink(self.error(start, self.bytes.len(), "unterminated CDATA section"));
                (self.bytes.len(), self.bytes.len())
            }
        };
        sink(Event::CData {
            start: content_start,
            end: content_end,
            text: self.text[content_start..content_end].to_string(),
        });
        self.pos = end;
    }

    fn processing_instruction(&mut self, start: usize, sink: &mut impl FnMut(Event)) {
        self.pos = start + 2;
        let (body_end, end) = match self.find_str("?>") {
            Some(i) => (i, i + 2),
            None => {
                sink(self.error(start, self.bytes.len(), "unterminated processing instruction"));
                (self.bytes.len(), self.bytes.len())
            }
        };
        let inner = &self.text[start + 2..body_end];
        let name_len = inner
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(inner.len());
        sink(Event::ProcessingInstruction {
            start,
            end,
            name: inner[..name_len].to_string(),
            body: inner[name_len..].trim_start().to_string(),
        });
        self.pos = end;
    }

    fn close_tag(&mut self, start: usize, sink: &mut impl FnMut(Event)) {
        self.pos = start + 2;
        let (name_start, name_end) = self.scan_name();
        self.skip_whitespace();
        let end = if self.pos < self.bytes.len() && self.bytes[self.pos] == b'>' {
            self.pos += 1;
            self.pos
        } else if self.pos >= self.bytes.len() {
            sink(self.error(start, self.pos, "unterminated closing tag"));
            self.pos
        } else {
            // Garbage between the name and `>`; recover at the next `>` or `<`.
            sink(self.error(start, self.pos, "malformed closing tag"));
            while self.pos < self.bytes.len()
                && self.bytes[self.pos] != b'>'
                && self.bytes[self.pos] != b'<'
            {
                self.pos += 1;
            }
            if self.pos < self.bytes.len() && self.bytes[self.pos] == b'>' {
                self.pos += 1;
            }
            self.pos
        };
        sink(Event::CloseTag {
            start,
            name_start,
            name_end,
            end,
            name: self.text[name_start..name_end].to_string(),
        });
    }

    fn open_tag(&mut self, start: usize, sink: &mut impl FnMut(Event)) {
        self.pos = start + 1;
        let (name_start, name_end) = self.scan_name();
        sink(Event::OpenTagStart {
            start,
            name_start,
            name_end,
            name: self.text[name_start..name_end].to_string(),
        });
        loop {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                sink(self.error(start, self.pos, "unterminated open tag"));
                sink(Event::OpenTagEnd {
                    end: self.pos,
                    self_closing: false,
                    closed: false,
                });
                return;
            }
            match self.bytes[self.pos] {
                b'>' => {
                    self.pos += 1;
                    sink(Event::OpenTagEnd {
                        end: self.pos,
                        self_closing: false,
                        closed: true,
                    });
                    return;
                }
                b'/' => {
                    if self.pos + 1 < self.bytes.len() && self.bytes[self.pos + 1] == b'>' {
                        self.pos += 2;
                        sink(Event::OpenTagEnd {
                            end: self.pos,
                            self_closing: true,
                            closed: true,
                        });
                    } else {
                        sink(self.error(self.pos, self.pos + 1, "expected '>' after '/'"));
                        self.pos += 1;
                        continue;
                    }
                    return;
                }
                b'<' => {
                    // A new tag begins before this one closed; end the
                    // current tag here so the new one still parses.
                    sink(self.error(start, self.pos, "unterminated open tag"));
                    sink(Event::OpenTagEnd {
                        end: self.pos,
                        self_closing: false,
                        closed: false,
                    });
                    return;
                }
                _ => self.attribute(sink),
            }
        }
    }

    fn attribute(&mut self, sink: &mut impl FnMut(Event)) {
        let (attr_start, name_end) = self.scan_name();
        if attr_start == name_end {
            sink(self.error(attr_start, attr_start + 1, "unexpected character in tag"));
            self.pos += 1;
            return;
        }
        let name = self.text[attr_start..name_end].to_string();
        let after_name = self.pos;
        self.skip_whitespace();
        if self.pos >= self.bytes.len() || self.bytes[self.pos] != b'=' {
            // Attribute without a value.
            self.pos = after_name;
            sink(self.error(attr_start, name_end, "attribute without value"));
            sink(Event::Attribute(Attribute {
                name,
                value: String::new(),
                start: attr_start,
                name_end,
                value_start: None,
                value_end: None,
                end: name_end,
                closed: true,
            }));
            return;
        }
        self.pos += 1; // consume '='
        self.skip_whitespace();
        if self.pos < self.bytes.len()
            && (self.bytes[self.pos] == b'"' || self.bytes[self.pos] == b'\'')
        {
            let quote = self.bytes[self.pos];
            let value_start = self.pos + 1;
            self.pos = value_start;
            let (value_end, end, closed) = match self.find(quote) {
                Some(i) => (i, i + 1, true),
                None => {
                    sink(self.error(attr_start, self.bytes.len(), "unterminated attribute value"));
                    (self.bytes.len(), self.bytes.len(), false)
                }
            };
            self.pos = end;
            sink(Event::Attribute(Attribute {
                name,
                value: self.text[value_start..value_end].to_string(),
                start: attr_start,
                name_end,
                value_start: Some(value_start),
                value_end: Some(value_end),
                end,
                closed,
            }));
        } else {
            // Unquoted value: take everything up to the next delimiter.
            let value_start = self.pos;
            while self.pos < self.bytes.len()
                && !self.bytes[self.pos].is_ascii_whitespace()
                && !matches!(self.bytes[self.pos], b'>' | b'/' | b'<')
            {
                self.pos += 1;
            }
            sink(self.error(attr_start, self.pos, "unquoted attribute value"));
            sink(Event::Attribute(Attribute {
                name,
                value: self.text[value_start..self.pos].to_string(),
                start: attr_start,
                name_end,
                value_start: None,
                value_end: None,
                end: self.pos,
                closed: false,
            }));
        }
    }
}
