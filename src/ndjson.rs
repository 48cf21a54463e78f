//! NDJSON catalog codec: one JSON object per line, keys are headers.

use crate::error::{Result, UpsellError};
use crate::record::{Cell, Row, Table};
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff, staging_path};
use anyhow::Context;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Minimal NDJSON reader with buffering and empty-line trimming.
pub struct NdjsonReader<R> {
    rdr: BufReader<R>,
}

impl NdjsonReader<File> {
    pub fn open(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = open_with_backoff(path, 16, 50)?;
        Ok(Self::new(f, buf_bytes))
    }
}

impl<R: Read> NdjsonReader<R> {
    pub fn new(inner: R, buf_bytes: usize) -> Self {
        Self { rdr: BufReader::with_capacity(buf_bytes.max(8 * 1024), inner) }
    }

    /// Read the next line into `buf`. Returns the number of bytes read (0 on EOF).
    /// Strips trailing `\r?\n`.
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 { return Ok(0); }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') { buf.pop(); }
        }
        Ok(n)
    }

    /// Decode every object line into a table. Headers are keys in first-seen order.
    pub fn read_table(mut self) -> Result<Table> {
        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        let mut buf = String::new();
        let mut line_no = 0usize;
        while self.read_line(&mut buf)? > 0 {
            line_no += 1;
            if buf.trim().is_empty() { continue; }
            let obj: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&buf)
                .map_err(|e| UpsellError::Validation(format!("line {line_no}: not a JSON object ({e})")))?;
            let mut row = Row::new();
            for (k, v) in obj {
                if !headers.contains(&k) {
                    headers.push(k.clone());
                }
                row.set(k, Cell::from_json(&v));
            }
            if !row.is_blank() {
                rows.push(row);
            }
        }
        Ok(Table::new(headers, rows))
    }
}

/// Minimal NDJSON writer over a staging file, promoted on `finish_atomic`.
pub struct NdjsonWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
}

impl NdjsonWriter {
    pub fn create(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = create_with_backoff(path, 16, 50)?;
        Ok(Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)) })
    }

    /// Write one row as an object whose keys follow `headers`.
    pub fn write_row(&mut self, headers: &[String], row: &Row) -> Result<()> {
        let mut obj = serde_json::Map::with_capacity(headers.len());
        for h in headers {
            obj.insert(h.clone(), row.get(h).map(Cell::to_json).unwrap_or_else(|| Cell::Empty.to_json()));
        }
        if let Some(w) = &mut self.w {
            serde_json::to_writer(&mut *w, &obj)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Flushes and atomically promotes the temp file to `final_path`.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        replace_file_atomic_backoff(&self.path, final_path)?;
        Ok(())
    }
}

/// Write `table` to `path` via a staging file.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let tmp = staging_path(path);
    let mut w = NdjsonWriter::create(&tmp, 256 * 1024)?;
    for row in &table.rows {
        w.write_row(&table.headers, row)?;
    }
    w.finish_atomic(path)
}
