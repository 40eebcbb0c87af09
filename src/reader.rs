//! Row source over a decoded stream: header capture, schema resolution,
//! and row iteration.

use crate::error::{KgtabError, Result};
use crate::io::decode::{DecodingOptions, DecodingReader};
use crate::schema::{self, HeaderErrorAction, Mode, Schema};
use crate::writer::COLUMN_SEPARATOR;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Construction options for a [`TabReader`].
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Column separator used to split the header and each data row.
    pub column_separator: String,
    /// Required-column convention to check against the header.
    pub mode: Mode,
    /// What to do when required columns are missing.
    pub header_error_action: HeaderErrorAction,
    /// Run decompression on a background worker.
    pub background: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            column_separator: COLUMN_SEPARATOR.to_string(),
            mode: Mode::Auto,
            header_error_action: HeaderErrorAction::Exit,
            background: false,
        }
    }
}

/// Streams data rows as ordered string sequences.
///
/// The header line is captured and resolved into a [`Schema`] at open; the
/// iterator then yields one `Vec<String>` per data row, splitting on the
/// configured separator. Row numbers are 1-based and count data rows only.
pub struct TabReader {
    schema: Schema,
    separator: String,
    lines: Lines<BufReader<DecodingReader>>,
    row: u64,
}

impl TabReader {
    /// Open a file, dispatching compression by extension or sniffing.
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let decoder = DecodingReader::open_path_with_options(
            path,
            DecodingOptions {
                background: options.background,
                ..DecodingOptions::default()
            },
        )?;
        Self::from_decoder(decoder, options)
    }

    /// Build a row source over an already-open [`DecodingReader`].
    pub fn from_decoder(mut decoder: DecodingReader, options: ReaderOptions) -> Result<Self> {
        let header = decoder.capture_header(false)?;
        let columns: Vec<String> = if header.is_empty() {
            Vec::new()
        } else {
            header
                .split(options.column_separator.as_str())
                .map(str::to_string)
                .collect()
        };
        let schema = Schema::new(columns)?;
        schema::check_required_columns(&schema, options.mode, options.header_error_action)?;
        Ok(TabReader {
            schema,
            separator: options.column_separator,
            lines: BufReader::new(decoder).lines(),
            row: 1,
        })
    }

    /// The schema resolved from the header line.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The 1-based number of the next data row.
    pub fn row_number(&self) -> u64 {
        self.row
    }
}

impl Iterator for TabReader {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lines.next()? {
            Ok(line) => {
                self.row += 1;
                Some(Ok(line
                    .split(self.separator.as_str())
                    .map(str::to_string)
                    .collect()))
            }
            Err(e) => {
                self.row += 1;
                Some(Err(KgtabError::from_read(e)))
            }
        }
    }
}
