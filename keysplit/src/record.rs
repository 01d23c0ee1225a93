//! Byte-level access to the fields of a delimited line.
//!
//! Lines are handled as raw bytes so that records with invalid UTF-8 are still routed verbatim.

/// Field separator encoded as UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    ch: char,
    encoded: [u8; 4],
    len: usize,
}

impl Delimiter {
    /// Creates a delimiter from a single character.
    pub fn new(ch: char) -> Self {
        let mut encoded = [0; 4];
        let len = ch.encode_utf8(&mut encoded).len();
        Self { ch, encoded, len }
    }

    /// Returns the delimiter character.
    pub fn as_char(&self) -> char {
        self.ch
    }

    /// Returns the UTF-8 encoding of the delimiter.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded[..self.len]
    }

    /// Returns an iterator over the fields of `line`.
    ///
    /// A line always has at least one field; an empty line yields a single empty field.
    pub fn fields<'a>(&'a self, line: &'a [u8]) -> Fields<'a> {
        Fields {
            rest: Some(line),
            delimiter: self.as_bytes(),
        }
    }

    /// Returns the field at `index`, or [`None`] when `line` has fewer fields.
    pub fn field<'a>(&'a self, line: &'a [u8], index: usize) -> Option<&'a [u8]> {
        self.fields(line).nth(index)
    }
}

/// Iterator over the fields of a line, created by [`Delimiter::fields`].
#[derive(Debug)]
pub struct Fields<'a> {
    rest: Option<&'a [u8]>,
    delimiter: &'a [u8],
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;

        match find(rest, self.delimiter) {
            Some(position) => {
                self.rest = Some(&rest[position + self.delimiter.len()..]);
                Some(&rest[..position])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if let [byte] = needle {
        return haystack.iter().position(|b| b == byte);
    }

    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Strips a trailing `\n` or `\r\n` from `line`.
pub fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
