//! Schema-aware row writing with multi-format serialization and optional
//! background compression.
//!
//! A [`ShuffleWriter`] resolves each outgoing row against a target schema
//! (directly, through a precomputed shuffle list, or through a named-value
//! map), serializes it in the selected output format, and hands the line to
//! either the sink or a background compression worker.
//!
//! Output format and compression compose: compression is chosen by filename
//! suffix (`.gz`, `.bz2`, `.xz`, `.lz4`) independently of format.

use crate::error::{KgtabError, Result};
use crate::io::sniff::{self, CompressionKind};
use crate::schema::{self, HeaderErrorAction, Mode, Schema};
use crossbeam_channel::{Sender, bounded};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::mem;
use std::path::Path;
use std::thread::{self, JoinHandle};

/// Default bounded-channel capacity for background compression, in lines.
pub const DEFAULT_COMPRESSION_QUEUE_SIZE: usize = 1000;

/// Default column separator.
pub const COLUMN_SEPARATOR: &str = "\t";

/// Per-column index remapping from a source row layout to a target row
/// layout; `None` drops the value. Built once per (source, target) schema
/// pair and reused for every row.
pub type ShuffleList = Vec<Option<usize>>;

/// Row-oriented serialization formats.
///
/// A closed variant set with one serialization function per tag; no new
/// formats are added at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Values joined by the column separator (the default).
    #[default]
    Kgtk,
    /// CSV quoting, comma separator.
    Csv,
    /// Markdown table rows.
    Md,
    /// JSON array of arrays; rows carry trailing commas, `close` emits `]`.
    Json,
    /// JSON array of name-to-value objects.
    JsonMap,
    /// Like `JsonMap`, omitting empty-string values.
    JsonMapCompact,
    /// Newline-delimited JSON arrays.
    Jsonl,
    /// Newline-delimited name-to-value objects.
    JsonlMap,
    /// Like `JsonlMap`, omitting empty-string values.
    JsonlMapCompact,
}

impl OutputFormat {
    /// Parse a format name as used on command lines.
    pub fn from_name(name: &str) -> Option<OutputFormat> {
        match name {
            "kgtk" => Some(OutputFormat::Kgtk),
            "csv" => Some(OutputFormat::Csv),
            "md" => Some(OutputFormat::Md),
            "json" => Some(OutputFormat::Json),
            "json-map" => Some(OutputFormat::JsonMap),
            "json-map-compact" => Some(OutputFormat::JsonMapCompact),
            "jsonl" => Some(OutputFormat::Jsonl),
            "jsonl-map" => Some(OutputFormat::JsonlMap),
            "jsonl-map-compact" => Some(OutputFormat::JsonlMapCompact),
            _ => None,
        }
    }

    /// The command-line name of this format.
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Kgtk => "kgtk",
            OutputFormat::Csv => "csv",
            OutputFormat::Md => "md",
            OutputFormat::Json => "json",
            OutputFormat::JsonMap => "json-map",
            OutputFormat::JsonMapCompact => "json-map-compact",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::JsonlMap => "jsonl-map",
            OutputFormat::JsonlMapCompact => "jsonl-map-compact",
        }
    }

    /// Default format for a file path, by suffix.
    pub fn from_path(path: impl AsRef<Path>) -> Option<OutputFormat> {
        let lower = path.as_ref().to_string_lossy().to_lowercase();
        if lower.ends_with(".md") {
            Some(OutputFormat::Md)
        } else if lower.ends_with(".csv") {
            Some(OutputFormat::Csv)
        } else if lower.ends_with(".jsonl") {
            Some(OutputFormat::Jsonl)
        } else if lower.ends_with(".json") {
            Some(OutputFormat::Json)
        } else {
            None
        }
    }

    /// Whether rows are elements of an enclosing JSON array (so `close`
    /// must emit the closing bracket).
    fn is_json_array(&self) -> bool {
        matches!(
            self,
            OutputFormat::Json | OutputFormat::JsonMap | OutputFormat::JsonMapCompact
        )
    }
}

/// Construction options for a [`ShuffleWriter`].
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Output format; `None` derives from the file suffix, defaulting to
    /// [`OutputFormat::Kgtk`].
    pub format: Option<OutputFormat>,
    /// Column separator; forcing csv output forces `,` regardless.
    pub column_separator: String,
    /// Fail rows that are shorter than the output schema.
    pub require_all_columns: bool,
    /// Fail rows that are longer than the output schema.
    pub prohibit_extra_columns: bool,
    /// Right-pad short rows with empty strings before the checks above.
    pub fill_missing_columns: bool,
    /// Required-column convention to check at open.
    pub mode: Mode,
    /// What to do when required columns are missing.
    pub header_error_action: HeaderErrorAction,
    /// Positional replacement list for all output column names.
    pub output_columns: Option<Vec<String>>,
    /// Old names for selective renaming, paired with `new_columns`.
    pub old_columns: Option<Vec<String>>,
    /// New names for selective renaming, paired with `old_columns`.
    pub new_columns: Option<Vec<String>>,
    /// Explicit compression override; `None` dispatches by file suffix.
    pub compression: Option<CompressionKind>,
    /// Compress on a background worker, overlapping codec CPU with I/O.
    pub compress_in_background: bool,
    /// Bounded channel capacity for background compression, in lines.
    pub compression_queue_size: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            format: None,
            column_separator: COLUMN_SEPARATOR.to_string(),
            require_all_columns: true,
            prohibit_extra_columns: true,
            fill_missing_columns: false,
            mode: Mode::Auto,
            header_error_action: HeaderErrorAction::Exit,
            output_columns: None,
            old_columns: None,
            new_columns: None,
            compression: None,
            compress_in_background: false,
            compression_queue_size: DEFAULT_COMPRESSION_QUEUE_SIZE,
        }
    }
}

enum Sink {
    Direct(Box<dyn Write + Send>),
    Background(BackgroundEncoder),
    Closed,
}

/// Schema-aware row writer. See the [module docs](self) for an overview.
///
/// The row counter starts at 1 (the first data row) and advances even when
/// a row is rejected, so downstream line numbers stay meaningful when a
/// caller skips bad rows and continues.
pub struct ShuffleWriter {
    internal: Schema,
    output: Schema,
    format: OutputFormat,
    separator: String,
    require_all_columns: bool,
    prohibit_extra_columns: bool,
    fill_missing_columns: bool,
    sink: Sink,
    row: u64,
}

impl ShuffleWriter {
    /// Open a writer over a file, composing suffix-chosen compression with
    /// the selected output format, and write the header.
    pub fn open(
        columns: &[String],
        path: impl AsRef<Path>,
        mut options: WriterOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let kind = options
            .compression
            .unwrap_or_else(|| CompressionKind::from_path(path));
        if options.format.is_none() && kind == CompressionKind::None {
            options.format = OutputFormat::from_path(path);
        }
        let file = File::create(path)?;
        let sink = sniff::wrap_writer(kind, Box::new(file))
            .map_err(|e| KgtabError::Format(format!("cannot open {} sink: {e}", kind.name())))?;
        Self::from_sink(columns, sink, options)
    }

    /// Open a writer over an arbitrary sink and write the header.
    ///
    /// Schema-construction failures are fatal: no partial writer is
    /// returned.
    pub fn from_sink(
        columns: &[String],
        sink: Box<dyn Write + Send>,
        options: WriterOptions,
    ) -> Result<Self> {
        let format = options.format.unwrap_or_default();
        let separator = if format == OutputFormat::Csv {
            ",".to_string()
        } else {
            options.column_separator.clone()
        };

        let (internal, output) = schema::resolve(
            columns,
            options.output_columns.as_deref(),
            options.old_columns.as_deref(),
            options.new_columns.as_deref(),
        )?;
        schema::check_required_columns(&output, options.mode, options.header_error_action)?;

        let sink = if options.compress_in_background {
            Sink::Background(BackgroundEncoder::start(
                sink,
                options.compression_queue_size,
            ))
        } else {
            Sink::Direct(sink)
        };

        let mut writer = ShuffleWriter {
            internal,
            output,
            format,
            separator,
            require_all_columns: options.require_all_columns,
            prohibit_extra_columns: options.prohibit_extra_columns,
            fill_missing_columns: options.fill_missing_columns,
            sink,
            row: 1,
        };
        writer.write_header()?;
        Ok(writer)
    }

    /// The schema rows are resolved against.
    pub fn internal_schema(&self) -> &Schema {
        &self.internal
    }

    /// The schema whose names appear in the output header.
    pub fn output_schema(&self) -> &Schema {
        &self.output
    }

    /// The 1-based number of the next data row, as used in error messages.
    pub fn row_number(&self) -> u64 {
        self.row
    }

    /// Map another reader's column order onto this writer's internal
    /// schema. Unknown names map to the drop sentinel unless
    /// `fail_on_unknown` is set. The list is built once and reused for
    /// every row.
    pub fn build_shuffle_list(
        &self,
        other_columns: &[String],
        fail_on_unknown: bool,
    ) -> Result<ShuffleList> {
        let mut list = Vec::with_capacity(other_columns.len());
        for name in other_columns {
            match self.internal.index_of(name) {
                Some(idx) => list.push(Some(idx)),
                None if fail_on_unknown => {
                    return Err(KgtabError::UnknownColumn {
                        column: name.clone(),
                    });
                }
                None => list.push(None),
            }
        }
        Ok(list)
    }

    /// Write one row, optionally redistributing values through a shuffle
    /// list first.
    ///
    /// After shuffling and optional fill, short rows fail under
    /// `require_all_columns` and long rows under `prohibit_extra_columns`;
    /// either failure cites the current row number and both counts. Shape
    /// failures reject the row but leave the writer usable, and the row
    /// counter still advances.
    pub fn write(&mut self, values: &[String], shuffle_list: Option<&ShuffleList>) -> Result<()> {
        if matches!(self.sink, Sink::Closed) {
            return Err(KgtabError::ClosedWriter);
        }

        let mut row: Vec<String>;
        let mut out: &[String] = values;
        if let Some(list) = shuffle_list {
            if list.len() != values.len() {
                let err = KgtabError::ShuffleLength {
                    row: self.row,
                    list_len: list.len(),
                    row_len: values.len(),
                };
                self.row += 1;
                return Err(err);
            }
            row = vec![String::new(); self.output.len()];
            for (value, target) in values.iter().zip(list) {
                if let Some(idx) = *target {
                    row[idx] = value.clone();
                }
            }
            out = &row;
        } else if self.fill_missing_columns && values.len() < self.output.len() {
            row = values.to_vec();
            row.resize(self.output.len(), String::new());
            out = &row;
        }

        if self.require_all_columns && out.len() < self.output.len()
            || self.prohibit_extra_columns && out.len() > self.output.len()
        {
            let err = KgtabError::RowShape {
                row: self.row,
                expected: self.output.len(),
                actual: out.len(),
            };
            self.row += 1;
            return Err(err);
        }

        let line = self.format_row(out)?;
        self.write_line(&line)?;
        self.row += 1;
        Ok(())
    }

    /// Write one row from a name-to-value map resolved against the internal
    /// schema: absent columns become empty strings unless
    /// `require_all_columns`, and extra keys fail under
    /// `prohibit_extra_columns`.
    pub fn write_map(&mut self, value_map: &HashMap<String, String>) -> Result<()> {
        if matches!(self.sink, Sink::Closed) {
            return Err(KgtabError::ClosedWriter);
        }
        if self.prohibit_extra_columns {
            for name in value_map.keys() {
                if self.internal.index_of(name).is_none() {
                    return Err(KgtabError::UnexpectedColumn {
                        column: name.clone(),
                        row: self.row,
                    });
                }
            }
        }

        let mut values = Vec::with_capacity(self.internal.len());
        for name in self.internal.columns() {
            match value_map.get(name) {
                Some(value) => values.push(value.clone()),
                None if self.require_all_columns => {
                    return Err(KgtabError::MissingColumn {
                        column: name.clone(),
                        row: self.row,
                    });
                }
                None => values.push(String::new()),
            }
        }
        self.write(&values, None)
    }

    /// Flush the underlying sink. A no-op when a background compressor owns
    /// the sink; `close` drains it instead.
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.sink {
            Sink::Direct(sink) => Ok(sink.flush()?),
            Sink::Background(_) => Ok(()),
            Sink::Closed => Err(KgtabError::ClosedWriter),
        }
    }

    /// Emit any format-specific closing syntax, drain the background
    /// compressor if one is active, and close the sink. Writing after close
    /// fails fast.
    pub fn close(&mut self) -> Result<()> {
        if matches!(self.sink, Sink::Closed) {
            return Err(KgtabError::ClosedWriter);
        }
        if self.format.is_json_array() {
            self.write_line("]")?;
        }
        match mem::replace(&mut self.sink, Sink::Closed) {
            Sink::Direct(mut sink) => {
                sink.flush()?;
            }
            Sink::Background(mut encoder) => {
                encoder.finish()?;
            }
            Sink::Closed => {}
        }
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        match &mut self.sink {
            Sink::Direct(sink) => {
                sink.write_all(line.as_bytes())?;
                sink.write_all(b"\n")?;
                Ok(())
            }
            Sink::Background(encoder) => encoder.write_line(format!("{line}\n")),
            Sink::Closed => Err(KgtabError::ClosedWriter),
        }
    }

    fn write_header(&mut self) -> Result<()> {
        let columns = self.output.columns().to_vec();
        let columns = &columns[..];
        match self.format {
            OutputFormat::Kgtk | OutputFormat::Csv => {
                let line = if self.format == OutputFormat::Csv {
                    join_csv(columns)
                } else {
                    columns.join(&self.separator)
                };
                self.write_line(&line)
            }
            OutputFormat::Md => {
                let rule: String = {
                    let mut rule = String::from("|");
                    for _ in columns {
                        rule.push_str(" -- |");
                    }
                    rule
                };
                let header = join_md(columns);
                self.write_line(&header)?;
                self.write_line(&rule)
            }
            OutputFormat::Json => {
                self.write_line("[")?;
                let line = format!("{},", json_array(columns)?);
                self.write_line(&line)
            }
            OutputFormat::JsonMap | OutputFormat::JsonMapCompact => self.write_line("["),
            OutputFormat::Jsonl => {
                let line = json_array(columns)?;
                self.write_line(&line)
            }
            OutputFormat::JsonlMap | OutputFormat::JsonlMapCompact => Ok(()),
        }
    }

    /// Serialize a correctly-shaped row in the selected output format. Pure
    /// in the column schema; no other writer state is consulted.
    fn format_row(&self, values: &[String]) -> Result<String> {
        match self.format {
            OutputFormat::Kgtk => Ok(values.join(&self.separator)),
            OutputFormat::Csv => Ok(join_csv(values)),
            OutputFormat::Md => Ok(join_md(values)),
            OutputFormat::Json => Ok(format!("{},", json_array(values)?)),
            OutputFormat::JsonMap => Ok(format!("{},", self.json_map(values, false)?)),
            OutputFormat::JsonMapCompact => Ok(format!("{},", self.json_map(values, true)?)),
            OutputFormat::Jsonl => json_array(values),
            OutputFormat::JsonlMap => self.json_map(values, false),
            OutputFormat::JsonlMapCompact => self.json_map(values, true),
        }
    }

    fn json_map(&self, values: &[String], compact: bool) -> Result<String> {
        let mut map = serde_json::Map::new();
        for (name, value) in self.output.columns().iter().zip(values) {
            if compact && value.is_empty() {
                continue;
            }
            map.insert(name.clone(), serde_json::Value::String(value.clone()));
        }
        Ok(serde_json::to_string(&map)?)
    }
}

fn json_array(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

/// CSV-join: quote a value if it contains a quote or comma, doubling
/// internal quotes.
fn join_csv(values: &[String]) -> String {
    let mut line = String::new();
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            line.push(',');
        }
        if value.contains('"') || value.contains(',') {
            line.push('"');
            line.push_str(&value.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(value);
        }
    }
    line
}

/// Markdown-join: `| v | v |` with literal pipes escaped.
fn join_md(values: &[String]) -> String {
    let mut line = String::from("|");
    for value in values {
        line.push(' ');
        line.push_str(&value.replace('|', "\\|"));
        line.push_str(" |");
    }
    line
}

/// Background compression worker: owns the compressed sink exclusively and
/// pulls already-serialized lines off a bounded channel in FIFO order.
///
/// Closing the channel is the end marker; `finish` waits for the worker to
/// drain and flush before returning, so output is never truncated.
struct BackgroundEncoder {
    sender: Option<Sender<String>>,
    worker: Option<JoinHandle<io::Result<()>>>,
}

impl BackgroundEncoder {
    fn start(mut sink: Box<dyn Write + Send>, queue_size: usize) -> Self {
        let (sender, receiver) = bounded::<String>(queue_size.max(1));
        let worker = thread::spawn(move || -> io::Result<()> {
            for line in receiver {
                sink.write_all(line.as_bytes())?;
            }
            sink.flush()?;
            Ok(())
        });
        BackgroundEncoder {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Queue a line, blocking if the worker has fallen behind. A worker
    /// that died mid-stream surfaces its error here rather than silently
    /// dropping the line.
    fn write_line(&mut self, line: String) -> Result<()> {
        if let Some(sender) = &self.sender {
            if sender.send(line).is_ok() {
                return Ok(());
            }
        }
        match self.finish() {
            Ok(()) => Err(KgtabError::Io(io::Error::other(
                "background compression worker exited early",
            ))),
            Err(e) => Err(e),
        }
    }

    /// Send the end marker, wait for the worker to drain, and propagate any
    /// write failure it hit.
    fn finish(&mut self) -> Result<()> {
        self.sender.take();
        match self.worker.take() {
            Some(worker) => match worker.join() {
                Ok(result) => Ok(result?),
                Err(_) => Err(KgtabError::Io(io::Error::other(
                    "background compression worker panicked",
                ))),
            },
            None => Ok(()),
        }
    }
}

impl Drop for BackgroundEncoder {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
