//! Line-addressable source text.
//!
//! The lexer scans one line at a time, and the diagnostic renderer re-displays
//! an offending line with a caret under the error column. Both read through
//! [`SourceBuffer`], which loads a file once and keeps its lines together with
//! the originating file name.

use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

/// A source file split into lines, with its name retained for diagnostics.
#[derive(Debug)]
pub struct SourceBuffer {
    file_name: Rc<str>,
    lines: Vec<String>,
}

impl SourceBuffer {
    /// Read a file into a line-addressable buffer.
    pub fn read(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&path.to_string_lossy(), &text))
    }

    /// Build a buffer from in-memory text.
    pub fn from_text(file_name: &str, text: &str) -> Self {
        SourceBuffer {
            file_name: Rc::from(file_name),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn file_name(&self) -> &Rc<str> {
        &self.file_name
    }

    /// Number of lines in the buffer.
    pub fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    /// The text of a 1-based line, if it exists.
    pub fn line(&self, line_num: u32) -> Option<&str> {
        let index = line_num.checked_sub(1)? as usize;
        self.lines.get(index).map(String::as_str)
    }

    /// Iterate over lines with their 1-based line numbers.
    pub fn lines(&self) -> impl Iterator<Item = (u32, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i as u32 + 1, line.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_addressing() {
        let buffer = SourceBuffer::from_text("test.em", "first\nsecond\nthird");

        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line(1), Some("first"));
        assert_eq!(buffer.line(3), Some("third"));
        assert_eq!(buffer.line(0), None);
        assert_eq!(buffer.line(4), None);
    }

    #[test]
    fn test_empty_source() {
        let buffer = SourceBuffer::from_text("empty.em", "");
        assert_eq!(buffer.line_count(), 0);
        assert_eq!(buffer.line(1), None);
    }
}
