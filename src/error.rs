//! Error types for tabular I/O operations.

use std::io;
use thiserror::Error;

/// Result type for tabular I/O operations.
pub type Result<T> = std::result::Result<T, KgtabError>;

/// Error type covering stream decoding, schema resolution and row writing.
#[derive(Error, Debug)]
pub enum KgtabError {
    /// A stream sniffed as compressed but could not actually be decoded,
    /// or a serialized form was structurally invalid.
    #[error("format error: {0}")]
    Format(String),

    /// Header-level schema problem: mismatched rename lists, unknown old
    /// column names, or missing required columns under an `Exit` action.
    #[error("schema error: {0}")]
    Schema(String),

    /// A column name appears more than once in a schema.
    #[error("duplicate column '{column}'")]
    DuplicateColumn {
        /// The repeated column name.
        column: String,
    },

    /// A row had the wrong number of values for the output schema.
    #[error("required {expected} columns in data row {row}, saw {actual}")]
    RowShape {
        /// 1-based data row number.
        row: u64,
        /// Number of columns the output schema requires.
        expected: usize,
        /// Number of values actually supplied.
        actual: usize,
    },

    /// A shuffle list did not match the length of the row it was applied to.
    #[error("shuffle list is {list_len} long but data row {row} is {row_len} long")]
    ShuffleLength {
        /// 1-based data row number.
        row: u64,
        /// Length of the shuffle list.
        list_len: usize,
        /// Length of the supplied row.
        row_len: usize,
    },

    /// A named-row write omitted a required column.
    #[error("missing column '{column}' at data row {row}")]
    MissingColumn {
        /// The absent column name.
        column: String,
        /// 1-based data row number.
        row: u64,
    },

    /// A named-row write supplied a key outside the schema.
    #[error("unexpected column '{column}' at data row {row}")]
    UnexpectedColumn {
        /// The disallowed column name.
        column: String,
        /// 1-based data row number.
        row: u64,
    },

    /// A shuffle list was built against a name the schema does not contain.
    #[error("unknown column '{column}' when building a shuffle list")]
    UnknownColumn {
        /// The unresolvable column name.
        column: String,
    },

    /// An operation was attempted on a writer after `close`.
    #[error("writer is closed")]
    ClosedWriter,

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// IO error during stream operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl KgtabError {
    /// Fold an `io::Error` into the taxonomy: decoder-level corruption
    /// (sniffing succeeded optimistically but the payload is malformed)
    /// becomes a [`KgtabError::Format`], everything else stays IO.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::InvalidData {
            KgtabError::Format(err.to_string())
        } else {
            KgtabError::Io(err)
        }
    }
}
