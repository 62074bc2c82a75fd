// Copyright 2026 Gleaner Contributors
// SPDX-License-Identifier: Apache-2.0

//! Record sinks: where harvested records go, incrementally.

use crate::extract::Record;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Receives records one at a time as pages complete. The harvesting core
/// never buffers the full result set.
pub trait RecordSink: Send {
    fn append(&mut self, record: &Record) -> Result<()>;
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// CSV sink with a fixed declared header. Fields a record lacks are left
/// as empty cells. UTF-8 with BOM so spreadsheet apps pick the encoding
/// up.
pub struct CsvSink {
    writer: BufWriter<File>,
    fields: Vec<String>,
}

impl CsvSink {
    pub fn create(path: &Path, fields: &[String]) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all("\u{feff}".as_bytes())?;
        let header: Vec<String> = fields.iter().map(|f| csv_cell(f)).collect();
        writeln!(writer, "{}", header.join(","))?;
        Ok(Self {
            writer,
            fields: fields.to_vec(),
        })
    }
}

/// Minimal quoting: only cells containing a comma, quote, or newline are
/// quoted, with embedded quotes doubled.
fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &Record) -> Result<()> {
        let row: Vec<String> = self
            .fields
            .iter()
            .map(|f| csv_cell(record.get(f).unwrap_or_default()))
            .collect();
        writeln!(self.writer, "{}", row.join(",")).context("failed to write csv row")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush csv")?;
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<Record>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for VecSink {
    fn append(&mut self, record: &Record) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: &[(&str, &str)]) -> Record {
        Record {
            page_index: 1,
            page_url: "https://catalog.example/list?page=1".to_string(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_csv_minimal_quoting() {
        assert_eq!(csv_cell("plain"), "plain");
        assert_eq!(csv_cell("a,b"), "\"a,b\"");
        assert_eq!(csv_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_cell("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_csv_sink_writes_bom_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let fields: Vec<String> = ["name", "url", "price_min"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut sink = CsvSink::create(&path, &fields).unwrap();
        sink.append(&record(&[
            ("name", "Alpha, Deluxe"),
            ("url", "https://catalog.example/product/a1"),
            ("price_min", "1000"),
        ]))
        .unwrap();
        // A record missing a declared field leaves the cell empty.
        sink.append(&record(&[("name", "Beta"), ("url", "https://catalog.example/product/b1")]))
            .unwrap();
        sink.flush().unwrap();
        drop(sink);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], [0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name,url,price_min");
        assert_eq!(
            lines[1],
            "\"Alpha, Deluxe\",https://catalog.example/product/a1,1000"
        );
        assert_eq!(lines[2], "Beta,https://catalog.example/product/b1,");
    }

    #[test]
    fn test_vec_sink_collects_in_order() {
        let mut sink = VecSink::new();
        sink.append(&record(&[("name", "Alpha")])).unwrap();
        sink.append(&record(&[("name", "Beta")])).unwrap();
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.records[1].get("name"), Some("Beta"));
    }
}
