//! Syntax-validation boundary for streamed tabular data.
//!
//! The full syntax validator (datatype grammars, IRI/literal syntax) is an
//! external collaborator; this module specifies only its boundary: a
//! validator consumes a stream-like input and yields successive chunks of
//! *validated* text, reporting errors to an optional log sink, capturing
//! invalid lines to an optional sink, and aborting after an error limit.
//!
//! [`ColumnCountValidator`] is a minimal built-in implementation that
//! checks structural shape only (per-line column counts against the
//! header).

use crate::error::{KgtabError, Result};
use crate::io::decode::DecodingReader;
use crate::writer::COLUMN_SEPARATOR;
use std::io::{BufRead, BufReader, Write};

/// Default maximum number of errors to report before failing.
pub const DEFAULT_ERROR_LIMIT: usize = 1000;

/// Default number of rows validated per chunk.
pub const DEFAULT_VALIDATION_CHUNK_SIZE: usize = 100_000;

/// What to do with a line that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidLineAction {
    /// Keep the line in the validated output.
    #[default]
    Pass,
    /// Drop the line from the validated output.
    Exclude,
}

/// Construction options for a validator.
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Maximum errors before aborting; 0 means unbounded.
    pub error_limit: usize,
    /// Number of rows validated per [`ValidationIterator::next_chunk`] call.
    pub chunk_size: usize,
    /// What to do with invalid lines.
    pub invalid_action: InvalidLineAction,
    /// Column separator used to count fields.
    pub column_separator: String,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        ValidatorOptions {
            error_limit: DEFAULT_ERROR_LIMIT,
            chunk_size: DEFAULT_VALIDATION_CHUNK_SIZE,
            invalid_action: InvalidLineAction::Pass,
            column_separator: COLUMN_SEPARATOR.to_string(),
        }
    }
}

/// Pull-based iteration over validated text.
///
/// Implementations consume a stream-like input and yield chunks of text
/// whose rows passed validation, or fail once the error limit is reached.
pub trait ValidationIterator {
    /// The next chunk of validated text, or `None` at end of stream.
    fn next_chunk(&mut self) -> Result<Option<String>>;

    /// 1-based number of the last data row examined.
    fn line_number(&self) -> u64;

    /// Number of validation errors seen so far.
    fn error_count(&self) -> usize;
}

/// Structural validator: checks that every data row has the same number of
/// columns as the header. Value syntax is out of scope here.
pub struct ColumnCountValidator {
    lines: std::io::Lines<BufReader<DecodingReader>>,
    header: String,
    column_count: usize,
    options: ValidatorOptions,
    log: Option<Box<dyn Write + Send>>,
    invalid: Option<Box<dyn Write + Send>>,
    line_number: u64,
    errors: usize,
    emitted_header: bool,
}

impl ColumnCountValidator {
    /// Capture the header from `decoder` and set up validation against its
    /// column count.
    pub fn new(
        mut decoder: DecodingReader,
        options: ValidatorOptions,
        log: Option<Box<dyn Write + Send>>,
        invalid: Option<Box<dyn Write + Send>>,
    ) -> Result<Self> {
        let header = decoder.capture_header(false)?;
        let column_count = if header.is_empty() {
            0
        } else {
            header.split(options.column_separator.as_str()).count()
        };
        Ok(ColumnCountValidator {
            lines: BufReader::new(decoder).lines(),
            header,
            column_count,
            options,
            log,
            invalid,
            line_number: 0,
            errors: 0,
            emitted_header: false,
        })
    }

    /// The captured header line.
    pub fn header(&self) -> &str {
        &self.header
    }

    fn report(&mut self, line: &str, actual: usize) -> Result<()> {
        self.errors += 1;
        let message = format!(
            "line {}: expected {} columns, saw {}",
            self.line_number, self.column_count, actual
        );
        match self.log.as_mut() {
            Some(log) => writeln!(log, "{message}")?,
            None => eprintln!("{message}"),
        }
        if let Some(invalid) = self.invalid.as_mut() {
            writeln!(invalid, "{line}")?;
        }
        if self.options.error_limit > 0 && self.errors >= self.options.error_limit {
            return Err(KgtabError::Format(format!(
                "error limit of {} exceeded at line {}",
                self.options.error_limit, self.line_number
            )));
        }
        Ok(())
    }
}

impl ValidationIterator for ColumnCountValidator {
    fn next_chunk(&mut self) -> Result<Option<String>> {
        let mut chunk = String::new();
        if !self.emitted_header {
            self.emitted_header = true;
            chunk.push_str(&self.header);
            chunk.push('\n');
        }
        let mut rows = 0;
        while rows < self.options.chunk_size.max(1) {
            let Some(line) = self.lines.next() else {
                break;
            };
            let line = line.map_err(KgtabError::from_read)?;
            self.line_number += 1;
            rows += 1;
            let actual = line.split(self.options.column_separator.as_str()).count();
            let valid = actual == self.column_count;
            if !valid {
                self.report(&line, actual)?;
            }
            if valid || self.options.invalid_action == InvalidLineAction::Pass {
                chunk.push_str(&line);
                chunk.push('\n');
            }
        }
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn error_count(&self) -> usize {
        self.errors
    }
}
