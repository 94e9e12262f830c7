use std::io::BufRead;

use crate::DecodeError;

const BOM: char = '\u{feff}';

/// Line reader with one line of lookahead.
///
/// Trailing whitespace (and `\r`) is stripped from every line and a leading
/// byte-order mark is removed from the first one.
pub(crate) struct LineReader<R> {
    inner: R,
    peeked: Option<Option<String>>,
    line_number: usize,
    started: bool,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            line_number: 0,
            started: false,
            buf: Vec::new(),
        }
    }

    /// Number of the last line returned by [`Self::next_line`].
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    pub(crate) fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        let line = match self.peeked.take() {
            Some(line) => line,
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.line_number += 1;
        }
        Ok(line)
    }

    pub(crate) fn peek_line(&mut self) -> Result<Option<&str>, DecodeError> {
        if self.peeked.is_none() {
            let line = self.read_raw()?;
            self.peeked = Some(line);
        }
        Ok(self.peeked.as_ref().and_then(|l| l.as_deref()))
    }

    fn read_raw(&mut self) -> Result<Option<String>, DecodeError> {
        self.buf.clear();
        let read = self.inner.read_until(b'\n', &mut self.buf).map_err(|e| {
            DecodeError::new(
                "E3001",
                format!("failed to read input: {e}"),
                self.line_number + 1,
            )
        })?;
        if read == 0 {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&self.buf);
        let mut line = text.trim_end();
        if !self.started {
            self.started = true;
            line = line.strip_prefix(BOM).unwrap_or(line);
        }
        Ok(Some(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom_once_and_trailing_whitespace() {
        let src = "\u{feff}first  \r\n\u{feff}second\t\nthird";
        let mut reader = LineReader::new(src.as_bytes());
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("first"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("\u{feff}second"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("third"));
        assert_eq!(reader.next_line().unwrap(), None);
        assert_eq!(reader.line_number(), 3);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut reader = LineReader::new("a\nb\n".as_bytes());
        assert_eq!(reader.peek_line().unwrap(), Some("a"));
        assert_eq!(reader.peek_line().unwrap(), Some("a"));
        assert_eq!(reader.line_number(), 0);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(reader.line_number(), 1);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(reader.peek_line().unwrap(), None);
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[test]
    fn leading_whitespace_is_kept() {
        let mut reader = LineReader::new(" _F,0,0,100\n".as_bytes());
        assert_eq!(reader.next_line().unwrap().as_deref(), Some(" _F,0,0,100"));
    }
}
