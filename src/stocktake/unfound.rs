//! Barcodes that were scanned but matched nothing in the catalog

use crate::barcode::clean_barcode;
use crate::catalog::now_timestamp;
use crate::error::{InventoryError, Result};
use crate::tabular::{read_table, write_table_file, Table};
use serde::Serialize;
use std::path::Path;

const BARCODE_COLUMN: &str = "barcode";
const TIMESTAMP_COLUMN: &str = "timestamp";

/// One unfound scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnfoundEntry {
    pub barcode: String,
    /// `YYYY-MM-DD HH:MM:SS`, local time
    pub timestamp: String,
}

/// Append-only list of unfound scans, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnfoundLog {
    entries: Vec<UnfoundEntry>,
}

impl UnfoundLog {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let table = read_table(path)?;
        let barcodes = table.column(BARCODE_COLUMN)?;
        let timestamps = table
            .column(TIMESTAMP_COLUMN)
            .unwrap_or_else(|_| vec![""; barcodes.len()]);
        let entries = barcodes
            .into_iter()
            .zip(timestamps)
            .filter(|(b, _)| !b.trim().is_empty())
            .map(|(b, t)| UnfoundEntry {
                barcode: b.trim().to_string(),
                timestamp: t.to_string(),
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_table_file(path, &self.to_table())?;
        log::info!("Saved {} unfound barcodes to {}", self.len(), path.display());
        Ok(())
    }

    /// Record an unfound barcode stamped with the current time
    pub fn add(&mut self, barcode: &str) -> Result<&UnfoundEntry> {
        self.add_at(barcode, now_timestamp())
    }

    pub fn add_at(&mut self, barcode: &str, timestamp: String) -> Result<&UnfoundEntry> {
        let barcode = clean_barcode(barcode);
        if barcode.is_empty() {
            return Err(InventoryError::EmptyInput);
        }
        log::info!("Recording unfound barcode {}", barcode);
        self.entries.push(UnfoundEntry { barcode, timestamp });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest first
    pub fn entries(&self) -> &[UnfoundEntry] {
        &self.entries
    }

    /// Newest first, as shown to staff
    pub fn most_recent_first(&self) -> Vec<UnfoundEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Storage table, oldest first
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(vec![
            BARCODE_COLUMN.to_string(),
            TIMESTAMP_COLUMN.to_string(),
        ]);
        for entry in &self.entries {
            table.push_row(vec![entry.barcode.clone(), entry.timestamp.clone()]);
        }
        table
    }

    /// Table for downloads, newest first
    pub fn to_display_table(&self) -> Table {
        let mut table = self.to_table();
        table.rows.reverse();
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
