//! Spreadsheet collaborator: CSV/XLSX/NDJSON in, ordered headers + rows out, and back.

use crate::error::{Result, UpsellError};
use crate::ndjson::{self, NdjsonReader};
use crate::record::{Cell, Row, Table};
use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff, staging_path};
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Exports often carry title/notes rows above the real header.
pub const HEADER_SCAN_ROWS: usize = 5;

/// Worksheet name used for written workbooks.
pub const XLSX_SHEET_NAME: &str = "Recommendations";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
    Ndjson,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SheetFormat::Csv),
            "xlsx" => Ok(SheetFormat::Xlsx),
            "jsonl" | "ndjson" => Ok(SheetFormat::Ndjson),
            _ => Err(UpsellError::Validation(format!(
                "unsupported spreadsheet format '{}' (expected .csv, .xlsx, .jsonl or .ndjson)",
                path.display()
            ))),
        }
    }
}

/// Read a sheet from disk. For CSV and XLSX, `required` locates the header row.
pub fn read_table(path: &Path, required: &[&str]) -> Result<Table> {
    let format = SheetFormat::from_path(path)?;
    let f = open_with_backoff(path, 16, 50)?;
    match format {
        SheetFormat::Csv => parse_csv(f, required),
        SheetFormat::Xlsx => parse_xlsx(BufReader::new(f), required),
        SheetFormat::Ndjson => NdjsonReader::new(f, 256 * 1024).read_table(),
    }
}

/// Parse CSV, locating the header as the first of the leading
/// `HEADER_SCAN_ROWS` rows that contains every `required` name (trimmed).
/// Data rows whose cells are all empty are dropped. An empty input is an empty table.
pub fn parse_csv<R: Read>(input: R, required: &[&str]) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let records = rdr
        .records()
        .map(|rec| rec.map(|rec| rec.iter().map(Cell::from).collect::<Vec<_>>()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    table_from_records(records, required)
}

/// Parse the first worksheet of an XLSX workbook with the same header rules as
/// `parse_csv`. Numeric cells stay numbers.
pub fn parse_xlsx<R: Read + Seek>(input: R, required: &[&str]) -> Result<Table> {
    let mut wb: Xlsx<R> = Xlsx::new(input)?;
    let range = match wb.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Table::default()),
    };
    let records: Vec<Vec<Cell>> = range.rows().map(|r| r.iter().map(xlsx_cell).collect()).collect();
    table_from_records(records, required)
}

fn xlsx_cell(d: &Data) -> Cell {
    match d {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number((*i).into()),
        Data::Float(f) => serde_json::Number::from_f64(*f).map(Cell::Number).unwrap_or(Cell::Empty),
        Data::String(s) => Cell::from(s.as_str()),
        other => Cell::from(other.to_string()),
    }
}

fn table_from_records(records: Vec<Vec<Cell>>, required: &[&str]) -> Result<Table> {
    if records.is_empty() {
        return Ok(Table::default());
    }

    let limit = records.len().min(HEADER_SCAN_ROWS);
    let (header_idx, headers) = records[..limit]
        .iter()
        .enumerate()
        .map(|(i, rec)| (i, rec.iter().map(|h| h.to_string().trim().to_string()).collect::<Vec<_>>()))
        .find(|(_, hs)| required.iter().all(|r| hs.iter().any(|h| h == r)))
        .ok_or_else(|| {
            UpsellError::Validation(format!(
                "could not find a header row containing all required columns ({}) within the first {} rows",
                required.join(", "),
                limit
            ))
        })?;

    let rows = records[header_idx + 1..]
        .iter()
        .map(|rec| {
            let mut row = Row::new();
            for (i, h) in headers.iter().enumerate() {
                if h.is_empty() { continue; }
                row.set(h.as_str(), rec.get(i).cloned().unwrap_or(Cell::Empty));
            }
            row
        })
        .filter(|row| !row.is_blank())
        .collect();

    let headers = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Ok(Table::new(headers, rows))
}

/// Write `table` as CSV: header line then one record per row, cells stringified.
pub fn write_csv<W: Write>(out: W, table: &Table) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    w.write_record(&table.headers)?;
    for row in &table.rows {
        w.write_record(table.headers.iter().map(|h| row.text(h)))?;
    }
    w.flush()?;
    Ok(())
}

/// Write `table` as a single `XLSX_SHEET_NAME` worksheet to `path`.
/// Numbers are written as numbers, empty cells are left unset.
pub fn write_xlsx(path: &Path, table: &Table) -> Result<()> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name(XLSX_SHEET_NAME)?;
    for (c, h) in table.headers.iter().enumerate() {
        ws.write_string(0, c as u16, h.as_str())?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (c, h) in table.headers.iter().enumerate() {
            let c = c as u16;
            match row.get(h) {
                None | Some(Cell::Empty) => {}
                Some(Cell::Number(n)) => match n.as_f64() {
                    Some(x) => { ws.write_number(r, c, x)?; }
                    None => { ws.write_string(r, c, n.to_string())?; }
                },
                Some(cell) => { ws.write_string(r, c, cell.to_string())?; }
            }
        }
    }
    wb.save(path)?;
    Ok(())
}

/// Write a sheet to disk through a staging file, format chosen by extension.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    match SheetFormat::from_path(path)? {
        SheetFormat::Ndjson => ndjson::write_table(path, table),
        SheetFormat::Xlsx => {
            let tmp = staging_path(path);
            write_xlsx(&tmp, table)?;
            replace_file_atomic_backoff(&tmp, path)?;
            Ok(())
        }
        SheetFormat::Csv => {
            let tmp = staging_path(path);
            let f = create_with_backoff(&tmp, 16, 50)?;
            write_csv(BufWriter::with_capacity(256 * 1024, f), table)?;
            replace_file_atomic_backoff(&tmp, path)?;
            Ok(())
        }
    }
}
