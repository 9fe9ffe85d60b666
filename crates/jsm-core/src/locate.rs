//! Maps JSON pointers to line ranges of formatted JSON text.
//!
//! Renderers highlight conflicts by line. The scanner below walks the text
//! once along the pointer, never building a tree, and reports the lines the
//! addressed value occupies. Object members start at the line of their key.

use serde::{Deserialize, Serialize};

use crate::{Pointer, Segment};

/// Zero-based, half-open line span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    /// First line of the value.
    pub start_line: usize,
    /// One past the last line of the value.
    pub end_line_exclusive: usize,
}

impl LineRange {
    /// Number of lines covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_line_exclusive.saturating_sub(self.start_line)
    }

    /// Whether the range covers no line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Finds the lines occupied by the value at `pointer` in JSON `text`.
///
/// Returns `None` when the pointer does not resolve or the text is not JSON.
///
/// ```
/// # use jsm_core::locate::{line_range, LineRange};
/// let text = "{\n  \"a\": 1,\n  \"b\": [\n    true\n  ]\n}";
/// assert_eq!(line_range(text, &"/b".parse()?), Some(LineRange { start_line: 2, end_line_exclusive: 5 }));
/// assert_eq!(line_range(text, &"/b/0".parse()?), Some(LineRange { start_line: 3, end_line_exclusive: 4 }));
/// assert_eq!(line_range(text, &"/c".parse()?), None);
/// # Ok::<(), jsm_core::PointerError>(())
/// ```
#[must_use]
pub fn line_range(text: &str, pointer: &Pointer) -> Option<LineRange> {
    let mut scanner = Scanner::new(text);
    scanner.skip_whitespace();
    let start = scanner.line;
    let (start_line, end_line) = scanner.find(pointer.segments(), start)?;
    Some(LineRange { start_line, end_line_exclusive: end_line + 1 })
}

/// The range spanning every line of `text`.
#[must_use]
pub fn whole_document(text: &str) -> LineRange {
    let lines = text.lines().count().max(1);
    LineRange { start_line: 0, end_line_exclusive: lines }
}

struct Scanner<'t> {
    bytes: &'t [u8],
    text: &'t str,
    pos: usize,
    line: usize,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str) -> Self {
        Self { bytes: text.as_bytes(), text, pos: 0, line: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
        }
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.bump()? == byte).then_some(())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.bump();
        }
    }

    /// Resolves `rest` against the value starting at the cursor. `start` is
    /// the line the enclosing member or item started on.
    fn find(&mut self, rest: &[Segment], start: usize) -> Option<(usize, usize)> {
        let Some((segment, deeper)) = rest.split_first() else {
            self.skip_value()?;
            return Some((start, self.last_line()));
        };
        match self.peek()? {
            b'{' => {
                self.bump();
                let wanted = segment.token();
                loop {
                    self.skip_whitespace();
                    if self.peek()? == b'}' {
                        return None;
                    }
                    let member_line = self.line;
                    let key = self.string()?;
                    self.skip_whitespace();
                    self.expect(b':')?;
                    self.skip_whitespace();
                    if key == wanted {
                        return self.find(deeper, member_line);
                    }
                    self.skip_value()?;
                    self.next_entry(b'}')?;
                }
            }
            b'[' => {
                self.bump();
                let wanted = segment.as_index()?;
                let mut index = 0;
                loop {
                    self.skip_whitespace();
                    if self.peek()? == b']' {
                        return None;
                    }
                    if index == wanted {
                        let item_line = self.line;
                        return self.find(deeper, item_line);
                    }
                    self.skip_value()?;
                    self.next_entry(b']')?;
                    index += 1;
                }
            }
            _ => None,
        }
    }

    /// Line of the last byte consumed.
    fn last_line(&self) -> usize {
        if self.pos > 0 && self.bytes[self.pos - 1] == b'\n' {
            self.line - 1
        } else {
            self.line
        }
    }

    fn next_entry(&mut self, close: u8) -> Option<()> {
        self.skip_whitespace();
        match self.peek()? {
            b',' => {
                self.bump();
                Some(())
            }
            byte if byte == close => Some(()),
            _ => None,
        }
    }

    fn string(&mut self) -> Option<String> {
        let begin = self.pos;
        self.skip_string()?;
        serde_json::from_str(&self.text[begin..self.pos]).ok()
    }

    fn skip_string(&mut self) -> Option<()> {
        self.expect(b'"')?;
        loop {
            match self.bump()? {
                b'"' => return Some(()),
                b'\\' => {
                    self.bump()?;
                }
                _ => {}
            }
        }
    }

    fn skip_value(&mut self) -> Option<()> {
        self.skip_whitespace();
        match self.peek()? {
            b'"' => self.skip_string(),
            open @ (b'{' | b'[') => {
                let close = if open == b'{' { b'}' } else { b']' };
                self.bump();
                loop {
                    self.skip_whitespace();
                    if self.peek()? == close {
                        self.bump();
                        return Some(());
                    }
                    if open == b'{' {
                        self.skip_string()?;
                        self.skip_whitespace();
                        self.expect(b':')?;
                    }
                    self.skip_value()?;
                    self.next_entry(close)?;
                }
            }
            _ => {
                let begin = self.pos;
                while self.peek().is_some_and(|b| !ends_bare_token(b)) {
                    self.bump();
                }
                (self.pos > begin).then_some(())
            }
        }
    }
}

/// Bytes that terminate a bare literal (number, `true`, `false`, `null`).
fn ends_bare_token(byte: u8) -> bool {
    matches!(byte, b',' | b'}' | b']' | b' ' | b'\t' | b'\r' | b'\n')
}
