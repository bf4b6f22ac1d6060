//! Reading and writing spreadsheet-like tables (CSV, TXT and XLSX)
//!
//! Every value is carried as text. Numeric Excel cells that hold whole numbers
//! are rendered without a fractional part so barcodes survive the round trip.

use crate::error::{InventoryError, Result};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, DataType, Reader, Sheets};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Supported tabular file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
    Txt,
}

impl TableFormat {
    /// Determine the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some(ext) => Self::from_extension(ext),
            None => Err(InventoryError::UnsupportedFileType(
                path.display().to_string(),
            )),
        }
    }

    /// Parse a bare extension or format name such as `csv` or `xlsx`
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "xlsx" => Ok(TableFormat::Xlsx),
            "txt" => Ok(TableFormat::Txt),
            other => Err(InventoryError::UnsupportedFileType(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Xlsx => "xlsx",
            TableFormat::Txt => "txt",
        }
    }

    /// MIME type used for downloads
    pub fn content_type(&self) -> &'static str {
        match self {
            TableFormat::Csv => "text/csv",
            TableFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            TableFormat::Txt => "text/plain",
        }
    }
}

/// A header row plus string rows, each padded to the header width
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Index of a column by exact header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| InventoryError::MissingColumn(name.to_string()))?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Append a row, padding or truncating it to the header width
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a table from disk, choosing the parser from the extension
pub fn read_table(path: &Path) -> Result<Table> {
    let format = TableFormat::from_path(path)?;
    if !path.exists() {
        return Err(InventoryError::FileNotFound(path.to_path_buf()));
    }
    match format {
        TableFormat::Csv => read_delimited(path, b','),
        TableFormat::Txt => {
            let delimiter = sniff_delimiter(&std::fs::read_to_string(path)?);
            read_delimited(path, delimiter)
        }
        TableFormat::Xlsx => read_xlsx(path),
    }
}

/// Read a table from in-memory bytes (uploaded files)
pub fn read_table_bytes(format: TableFormat, bytes: &[u8]) -> Result<Table> {
    match format {
        TableFormat::Csv => table_from_reader(csv_reader(b',').from_reader(bytes)),
        TableFormat::Txt => {
            let delimiter = sniff_delimiter(&String::from_utf8_lossy(bytes));
            table_from_reader(csv_reader(delimiter).from_reader(bytes))
        }
        TableFormat::Xlsx => {
            let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
            table_from_workbook(workbook)
        }
    }
}

fn csv_reader(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::Headers);
    builder
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    table_from_reader(csv_reader(delimiter).from_path(path)?)
}

fn table_from_reader<R: Read>(mut rdr: csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(headers);
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

/// Pick the most frequent delimiter in the header line
fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");
    [b',', b'\t', b';', b'|']
        .into_iter()
        .map(|d| (d, first_line.bytes().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn read_xlsx(path: &Path) -> Result<Table> {
    table_from_workbook(open_workbook_auto(path)?)
}

fn table_from_workbook<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<Table> {
    let sheet_name = match workbook.sheet_names().first() {
        Some(name) => name.clone(),
        None => return Ok(Table::default()),
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(row) => row.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };
    let mut table = Table::new(headers);
    for row in rows {
        let values: Vec<String> = row.iter().map(cell_text).collect();
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        table.push_row(values);
    }
    log::debug!("Read {} rows from sheet '{}'", table.len(), sheet_name);
    Ok(table)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other
            .as_datetime()
            .map(|dt| {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            })
            .unwrap_or_default(),
    }
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.0}", f)
    } else {
        f.to_string()
    }
}

/// Serialize a table into the bytes of the given format
pub fn write_table(format: TableFormat, table: &Table) -> Result<Vec<u8>> {
    match format {
        TableFormat::Csv | TableFormat::Txt => write_csv(table),
        TableFormat::Xlsx => write_xlsx(table),
    }
}

/// Overwrite a file with the table, choosing the format from the extension
pub fn write_table_file(path: &Path, table: &Table) -> Result<()> {
    let format = TableFormat::from_path(path)?;
    let bytes = write_table(format, table)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    log::debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner()
        .map_err(|e| InventoryError::Io(e.into_error()))
}

fn write_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header.as_str())?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string((r + 1) as u32, col as u16, value.as_str())?;
            }
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension_is_case_insensitive() {
        assert_eq!(
            TableFormat::from_path(Path::new("stock.CSV")).unwrap(),
            TableFormat::Csv
        );
        assert_eq!(
            TableFormat::from_path(Path::new("stock.xlsx")).unwrap(),
            TableFormat::Xlsx
        );
        assert!(matches!(
            TableFormat::from_path(Path::new("stock.pdf")),
            Err(InventoryError::UnsupportedFileType(_))
        ));
        assert!(TableFormat::from_path(Path::new("stock")).is_err());
    }

    #[test]
    fn test_sniff_delimiter_picks_most_common() {
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(sniff_delimiter("a;b\n"), b';');
        assert_eq!(sniff_delimiter("barcode\n123\n"), b',');
    }

    #[test]
    fn test_float_text_drops_zero_fraction() {
        assert_eq!(float_text(123.0), "123");
        assert_eq!(float_text(12.5), "12.5");
    }

    #[test]
    fn test_csv_round_trip_keeps_text_and_pads_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "BARCODE,MODEL,NOTE\n00123,RB 3025,\"has, comma\"\n456,Aviator\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["BARCODE", "MODEL", "NOTE"]);
        assert_eq!(table.rows[0], vec!["00123", "RB 3025", "has, comma"]);
        assert_eq!(table.rows[1], vec!["456", "Aviator", ""]);

        let out = dir.path().join("out.csv");
        write_table_file(&out, &table).unwrap();
        assert_eq!(read_table(&out).unwrap(), table);
    }

    #[test]
    fn test_txt_files_use_sniffed_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.txt");
        std::fs::write(&path, "barcode\tcount\n111\t1\n222\t1\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.column("barcode").unwrap(), vec!["111", "222"]);
    }

    #[test]
    fn test_xlsx_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.xlsx");
        let mut table = Table::new(vec!["BARCODE".into(), "RRP".into()]);
        table.push_row(vec!["123".into(), "$10.00".into()]);
        table.push_row(vec!["456".into(), String::new()]);

        write_table_file(&path, &table).unwrap();
        let read = read_table(&path).unwrap();
        assert_eq!(read.headers, table.headers);
        assert_eq!(read.rows[0], vec!["123", "$10.00"]);
        assert_eq!(read.rows[1], vec!["456", ""]);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = read_table(Path::new("/this/does/not/exist.csv"));
        assert!(matches!(result, Err(InventoryError::FileNotFound(_))));
    }

    #[test]
    fn test_column_lookup_reports_missing_column() {
        let table = Table::new(vec!["a".into()]);
        assert!(matches!(
            table.column("barcode"),
            Err(InventoryError::MissingColumn(_))
        ));
    }
}
