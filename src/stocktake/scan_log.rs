//! Persistent scan log shared by every stocktake session

use crate::barcode::clean_barcode;
use crate::error::Result;
use crate::tabular::{read_table, write_table_file, Table};
use std::path::Path;

/// Column name of the scan log file
pub const SCAN_COLUMN: &str = "barcode";

/// Ordered canonical barcodes, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanLog {
    barcodes: Vec<String>,
}

impl ScanLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the log; a missing file is an empty log
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No scan log at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let table = read_table(path)?;
        let barcodes = table
            .column(SCAN_COLUMN)?
            .into_iter()
            .map(clean_barcode)
            .filter(|b| !b.is_empty())
            .collect();
        Ok(Self { barcodes })
    }

    /// Rewrite the whole log file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut table = Table::new(vec![SCAN_COLUMN.to_string()]);
        for barcode in &self.barcodes {
            table.push_row(vec![barcode.clone()]);
        }
        write_table_file(path, &table)?;
        log::info!("Saved {} scanned barcodes to {}", self.len(), path.display());
        Ok(())
    }

    pub fn contains(&self, barcode: &str) -> bool {
        self.barcodes.iter().any(|b| b == barcode)
    }

    pub(crate) fn push(&mut self, barcode: String) {
        self.barcodes.push(barcode);
    }

    pub(crate) fn pop(&mut self) -> Option<String> {
        self.barcodes.pop()
    }

    /// Remove the first occurrence, returning its position
    pub(crate) fn remove(&mut self, barcode: &str) -> Option<usize> {
        let idx = self.barcodes.iter().position(|b| b == barcode)?;
        self.barcodes.remove(idx);
        Some(idx)
    }

    pub(crate) fn insert(&mut self, idx: usize, barcode: String) {
        self.barcodes.insert(idx, barcode);
    }

    pub(crate) fn take_all(&mut self) -> Vec<String> {
        std::mem::take(&mut self.barcodes)
    }

    pub(crate) fn restore(&mut self, barcodes: Vec<String>) {
        self.barcodes = barcodes;
    }

    /// Oldest scan first (storage order)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.barcodes.iter().map(String::as_str)
    }

    /// Newest scan first (display order)
    pub fn most_recent_first(&self) -> impl Iterator<Item = &str> {
        self.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }
}

impl FromIterator<String> for ScanLog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            barcodes: iter.into_iter().collect(),
        }
    }
}
