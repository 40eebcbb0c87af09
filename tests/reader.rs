//! End-to-end tests for row reading and the structural validator.

use kgtab::{
    ColumnCountValidator, DecodingReader, KgtabError, Mode, ReaderOptions, ShuffleWriter,
    TabReader, ValidationIterator, ValidatorOptions, WriterOptions,
};
use kgtab::validation::InvalidLineAction;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

const EDGE_FILE: &str = "node1\tlabel\tnode2\nQ1\tP31\tQ5\nQ2\tP279\tQ1\n";

#[test]
fn reads_rows_under_the_header_schema() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("edges.tsv");
    std::fs::write(&path, EDGE_FILE)?;

    let mut reader = TabReader::open(&path, ReaderOptions::default())?;
    assert_eq!(
        reader.schema().columns(),
        vec!["node1".to_string(), "label".to_string(), "node2".to_string()]
    );
    assert_eq!(reader.row_number(), 1);

    let rows: Vec<Vec<String>> = reader.by_ref().collect::<kgtab::Result<_>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["Q1", "P31", "Q5"]);
    assert_eq!(rows[1], vec!["Q2", "P279", "Q1"]);
    assert_eq!(reader.row_number(), 3);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn reads_compressed_files_transparently() -> anyhow::Result<()> {
    use std::io::Write;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("edges.tsv.gz");
    let mut encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(&path)?,
        flate2::Compression::default(),
    );
    encoder.write_all(EDGE_FILE.as_bytes())?;
    encoder.finish()?;

    for background in [false, true] {
        let reader = TabReader::open(
            &path,
            ReaderOptions {
                background,
                ..ReaderOptions::default()
            },
        )?;
        let rows: Vec<Vec<String>> = reader.collect::<kgtab::Result<_>>()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Q1");
    }
    Ok(())
}

#[test]
fn auto_mode_rejects_a_node_file_without_id() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nodes.tsv");
    std::fs::write(&path, "name\tcolor\nEarth\tblue\n")?;

    let result = TabReader::open(&path, ReaderOptions::default());
    assert!(matches!(result, Err(KgtabError::Schema(_))));

    // The same file opens fine when no convention is enforced.
    let reader = TabReader::open(
        &path,
        ReaderOptions {
            mode: Mode::None,
            ..ReaderOptions::default()
        },
    )?;
    assert_eq!(reader.schema().len(), 2);
    Ok(())
}

#[test]
fn duplicate_header_columns_are_rejected() -> anyhow::Result<()> {
    let decoder = DecodingReader::open(Cursor::new(b"a\ta\n1\t2\n".to_vec()), false)?;
    let result = TabReader::from_decoder(
        decoder,
        ReaderOptions {
            mode: Mode::None,
            ..ReaderOptions::default()
        },
    );
    assert!(matches!(result, Err(KgtabError::DuplicateColumn { .. })));
    Ok(())
}

#[test]
fn empty_input_yields_an_empty_schema_and_no_rows() -> anyhow::Result<()> {
    let decoder = DecodingReader::open(Cursor::new(Vec::new()), false)?;
    let mut reader = TabReader::from_decoder(
        decoder,
        ReaderOptions {
            mode: Mode::None,
            ..ReaderOptions::default()
        },
    )?;
    assert!(reader.schema().is_empty());
    assert!(reader.next().is_none());
    Ok(())
}

#[test]
fn read_shuffle_write_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let in_path = dir.path().join("in.tsv");
    let out_path = dir.path().join("out.tsv");
    // Columns arrive in a different order than the writer's schema.
    std::fs::write(&in_path, "node2\tnode1\tlabel\nQ5\tQ1\tP31\n")?;

    let mut reader = TabReader::open(&in_path, ReaderOptions::default())?;
    let target: Vec<String> = ["node1", "label", "node2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut writer = ShuffleWriter::open(&target, &out_path, WriterOptions::default())?;
    let shuffle = writer.build_shuffle_list(reader.schema().columns(), true)?;
    for row in reader.by_ref() {
        writer.write(&row?, Some(&shuffle))?;
    }
    writer.close()?;

    assert_eq!(
        std::fs::read_to_string(&out_path)?,
        "node1\tlabel\tnode2\nQ1\tP31\tQ5\n"
    );
    Ok(())
}

/// A log/invalid sink whose contents stay inspectable.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

const RAGGED_FILE: &str = "node1\tlabel\tnode2\nQ1\tP31\tQ5\nQ2\tP279\nQ3\tP31\tQ1\n";

#[test]
fn validator_reports_and_passes_ragged_lines_by_default() -> anyhow::Result<()> {
    let decoder = DecodingReader::open(Cursor::new(RAGGED_FILE.as_bytes().to_vec()), false)?;
    let log = SharedSink::default();
    let invalid = SharedSink::default();
    let mut validator = ColumnCountValidator::new(
        decoder,
        ValidatorOptions::default(),
        Some(Box::new(log.clone())),
        Some(Box::new(invalid.clone())),
    )?;
    assert_eq!(validator.header(), "node1\tlabel\tnode2");

    let mut output = String::new();
    while let Some(chunk) = validator.next_chunk()? {
        output.push_str(&chunk);
    }
    // Pass keeps the ragged line in the output.
    assert_eq!(output, RAGGED_FILE);
    assert_eq!(validator.error_count(), 1);
    assert_eq!(validator.line_number(), 3);
    assert!(log.contents().contains("line 2"));
    assert_eq!(invalid.contents(), "Q2\tP279\n");
    Ok(())
}

#[test]
fn validator_can_exclude_ragged_lines() -> anyhow::Result<()> {
    let decoder = DecodingReader::open(Cursor::new(RAGGED_FILE.as_bytes().to_vec()), false)?;
    let log = SharedSink::default();
    let mut validator = ColumnCountValidator::new(
        decoder,
        ValidatorOptions {
            invalid_action: InvalidLineAction::Exclude,
            ..ValidatorOptions::default()
        },
        Some(Box::new(log.clone())),
        None,
    )?;

    let mut output = String::new();
    while let Some(chunk) = validator.next_chunk()? {
        output.push_str(&chunk);
    }
    assert_eq!(
        output,
        "node1\tlabel\tnode2\nQ1\tP31\tQ5\nQ3\tP31\tQ1\n"
    );
    assert_eq!(validator.error_count(), 1);
    Ok(())
}

#[test]
fn validator_aborts_at_the_error_limit() -> anyhow::Result<()> {
    let decoder = DecodingReader::open(Cursor::new(RAGGED_FILE.as_bytes().to_vec()), false)?;
    let log = SharedSink::default();
    let mut validator = ColumnCountValidator::new(
        decoder,
        ValidatorOptions {
            error_limit: 1,
            ..ValidatorOptions::default()
        },
        Some(Box::new(log.clone())),
        None,
    )?;
    let err = loop {
        match validator.next_chunk() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("validator must hit the error limit"),
            Err(e) => break e,
        }
    };
    assert!(matches!(err, KgtabError::Format(_)));
    Ok(())
}

#[test]
fn validator_chunks_respect_the_configured_size() -> anyhow::Result<()> {
    let mut text = String::from("id\n");
    for i in 0..10 {
        text.push_str(&format!("Q{i}\n"));
    }
    let decoder = DecodingReader::open(Cursor::new(text.into_bytes()), false)?;
    let mut validator = ColumnCountValidator::new(
        decoder,
        ValidatorOptions {
            chunk_size: 4,
            ..ValidatorOptions::default()
        },
        Some(Box::new(SharedSink::default())),
        None,
    )?;

    let mut chunks = Vec::new();
    while let Some(chunk) = validator.next_chunk()? {
        chunks.push(chunk);
    }
    // Header plus 4 rows, then 4 rows, then the trailing 2.
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].lines().count(), 5);
    assert_eq!(chunks[1].lines().count(), 4);
    assert_eq!(chunks[2].lines().count(), 2);
    assert_eq!(validator.line_number(), 10);
    assert_eq!(validator.error_count(), 0);
    Ok(())
}
