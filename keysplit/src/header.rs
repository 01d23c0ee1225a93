use std::io::BufRead;

use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SplitResult};
use crate::record::{Delimiter, strip_line_terminator};
use crate::split_error;

/// Layout of an input file as described by its header line.
#[derive(Debug, Clone)]
pub struct HeaderLayout {
    raw: Vec<u8>,
    field_names: Vec<String>,
    key_index: usize,
}

impl HeaderLayout {
    /// Consumes the first line of `reader` and locates the key column in it.
    ///
    /// The reader is left positioned at the first record.
    pub fn read_from<R: BufRead>(
        reader: &mut R,
        delimiter: Delimiter,
        key_field: &str,
    ) -> SplitResult<Self> {
        let mut raw = Vec::new();
        let read = reader.read_until(b'\n', &mut raw).map_err(|err| {
            split_error!(
                ErrorKind::IoFailure,
                "Failed to read header line from input",
                source: err
            )
        })?;

        if read == 0 {
            bail!(
                ErrorKind::KeyColumnNotFound,
                "Input has no header line",
                format!("expected a header containing `{key_field}`, but the input is empty")
            );
        }

        let field_names: Vec<String> = delimiter
            .fields(strip_line_terminator(&raw))
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();

        let key_index = find_column(&field_names, key_field)?;

        debug!(
            fields = field_names.len(),
            key_index,
            key_field,
            "located key column"
        );

        Ok(Self {
            raw,
            field_names,
            key_index,
        })
    }

    /// Returns the header line exactly as read, including its line terminator if it had one.
    pub fn raw_line(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the header field names in order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Returns the number of header fields.
    pub fn field_count(&self) -> usize {
        self.field_names.len()
    }

    /// Returns the zero-based index of the key column.
    pub fn key_index(&self) -> usize {
        self.key_index
    }
}

/// Finds the single column whose lowercased name equals the lowercased `column`.
pub(crate) fn find_column(field_names: &[String], column: &str) -> SplitResult<usize> {
    let wanted = column.to_lowercase();
    let matches: Vec<usize> = field_names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.to_lowercase() == wanted)
        .map(|(index, _)| index)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => bail!(
            ErrorKind::KeyColumnNotFound,
            "Header does not contain the key column",
            format!("`{column}` not found among {field_names:?}")
        ),
        indices => bail!(
            ErrorKind::AmbiguousKeyColumn,
            "Header contains the key column more than once",
            format!("`{column}` found at columns {indices:?}")
        ),
    }
}
