use std::io::{BufRead, ErrorKind};

use crate::predictor_errors::PredictorError;

/// Line source for the decoders: skips blank lines, strips line endings,
/// supports one line of look-ahead and remembers physical line numbers for
/// error reporting.
pub(crate) struct LineReader<R> {
    inner: R,
    consumed: usize,
    current: usize,
    peeked: Option<(usize, String)>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        LineReader {
            inner,
            consumed: 0,
            current: 0,
            peeked: None,
        }
    }

    fn fetch(&mut self) -> Result<Option<(usize, String)>, PredictorError> {
        let mut buffer = String::new();
        loop {
            buffer.clear();
            match self.inner.read_line(&mut buffer) {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::InvalidData => {
                    return Err(PredictorError::parse(
                        self.consumed + 1,
                        "line is not valid UTF-8",
                    ));
                }
                Err(err) => return Err(err.into()),
            }
            self.consumed += 1;
            let line = buffer.trim_end();
            if !line.trim_start().is_empty() {
                return Ok(Some((self.consumed, line.to_string())));
            }
        }
    }

    /// Next non-blank line without consuming it.
    pub(crate) fn peek(&mut self) -> Result<Option<&str>, PredictorError> {
        if self.peeked.is_none() {
            self.peeked = self.fetch()?;
        }
        Ok(self.peeked.as_ref().map(|(_, line)| line.as_str()))
    }

    pub(crate) fn next_line(&mut self) -> Result<Option<String>, PredictorError> {
        let next = match self.peeked.take() {
            Some(peeked) => Some(peeked),
            None => self.fetch()?,
        };
        Ok(next.map(|(number, line)| {
            self.current = number;
            line
        }))
    }

    /// Next non-blank line, or a parse error naming what was expected.
    pub(crate) fn expect_line(&mut self, expected: &str) -> Result<String, PredictorError> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => Err(PredictorError::parse(
                self.consumed + 1,
                format!("unexpected end of input, expected {expected}"),
            )),
        }
    }

    /// Physical line number of the last line returned.
    pub(crate) fn line_number(&self) -> usize {
        self.current
    }
}
