//! Append-only record sinks
//!
//! Stages stream their output as they go: a CSV file with a single header row,
//! and a JSON array framed by explicit `[`/`]` writes with comma-joined
//! entries. A crash before [`JsonArrayWriter::close`] leaves the array
//! unterminated but every completed entry intact.

use crate::output::records::CsvRecord;
use crate::output::store::ArtifactStore;
use crate::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::Write;

/// Streams values into a JSON array
pub struct JsonArrayWriter<W: Write> {
    inner: W,
    empty: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Writes the opening bracket
    pub fn open(mut inner: W) -> Result<Self> {
        inner.write_all(b"[")?;
        inner.flush()?;
        Ok(Self { inner, empty: true })
    }

    /// Appends entries and flushes, so the file is current after every batch
    pub fn write_entries<T: Serialize>(&mut self, entries: &[T]) -> Result<()> {
        for entry in entries {
            let separator: &[u8] = if self.empty { b"\n" } else { b",\n" };
            self.inner.write_all(separator)?;
            serde_json::to_writer(&mut self.inner, entry)?;
            self.empty = false;
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Writes the closing bracket and hands back the underlying writer
    pub fn close(mut self) -> Result<W> {
        self.inner.write_all(b"\n]")?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// CSV writer that emits the header once, at creation
pub struct CsvSink {
    writer: csv::Writer<Box<dyn Write + Send>>,
}

impl CsvSink {
    pub fn create<R: CsvRecord>(store: &dyn ArtifactStore, key: &str) -> Result<Self> {
        let inner = store.create(key)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(R::HEADERS)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn append<R: CsvRecord>(&mut self, records: &[R]) -> Result<()> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

type GzJsonWriter = JsonArrayWriter<GzEncoder<Box<dyn Write + Send>>>;

/// The two sinks of the athlete scrape stage, opened once for the whole stage
pub struct RecordSinks {
    csv: CsvSink,
    json: GzJsonWriter,
    written: usize,
}

impl RecordSinks {
    /// Creates the CSV (with header) and the gzip-compressed JSON array
    pub fn open<R: CsvRecord>(store: &dyn ArtifactStore, csv_key: &str, json_key: &str) -> Result<Self> {
        let csv = CsvSink::create::<R>(store, csv_key)?;
        let gz = GzEncoder::new(store.create(json_key)?, Compression::default());
        let json = JsonArrayWriter::open(gz)?;
        Ok(Self {
            csv,
            json,
            written: 0,
        })
    }

    pub fn write<R: CsvRecord>(&mut self, records: &[R]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.csv.append(records)?;
        self.json.write_entries(records)?;
        self.written += records.len();
        Ok(())
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Closes the JSON array and finishes the gzip stream
    pub fn finish(self) -> Result<usize> {
        self.csv.finish()?;
        let gz = self.json.close()?;
        let mut inner = gz.finish()?;
        inner.flush()?;
        Ok(self.written)
    }
}

/// Writes a complete CSV artifact in one go
pub fn write_csv<R: CsvRecord>(store: &dyn ArtifactStore, key: &str, records: &[R]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(R::HEADERS)?;
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    store.write(key, &bytes)?;
    Ok(())
}
