//! Downloadable exports of the catalog and stocktake tables

use crate::barcode::{clean_barcode, format_rrp};
use crate::catalog::{today, Catalog};
use crate::error::Result;
use crate::models::{Product, BARCODE, RRP, VISIBLE_FIELDS};
use crate::stocktake::{Stocktake, UnfoundLog};
use crate::tabular::{write_table, Table, TableFormat};
use serde::Deserialize;
use std::path::Path;

/// Which table to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Full catalog, every column
    Catalog,
    /// Archived catalog, every column
    Archive,
    /// Catalog products not scanned yet
    Missing,
    /// Scanned products, newest first
    Scanned,
    /// Catalog products that were scanned
    Matched,
    /// Scans that matched nothing
    Unfound,
}

/// Everything an export may draw from
pub struct ExportSources<'a> {
    pub inventory_path: &'a Path,
    pub stocktake: &'a Stocktake,
    pub archive: &'a Catalog,
    pub unfound: &'a UnfoundLog,
}

/// A rendered export ready to be written or served
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub format: TableFormat,
    pub bytes: Vec<u8>,
}

/// Build the table for an export kind
pub fn export_table(kind: ExportKind, sources: &ExportSources<'_>) -> Table {
    let catalog = sources.stocktake.catalog();
    match kind {
        ExportKind::Catalog => catalog.to_table(),
        ExportKind::Archive => sources.archive.to_table(),
        ExportKind::Missing => visible_table(catalog, sources.stocktake.missing_products()),
        ExportKind::Scanned => {
            let rows = sources.stocktake.rows();
            visible_table(catalog, rows.iter().map(|r| &r.product))
        }
        ExportKind::Matched => {
            let matched = sources.stocktake.reconcile().matched;
            visible_table(
                catalog,
                catalog
                    .products()
                    .iter()
                    .filter(|p| matched.contains(&clean_barcode(p.barcode()))),
            )
        }
        ExportKind::Unfound => sources.unfound.to_display_table(),
    }
}

/// Render an export in the requested format
pub fn render(kind: ExportKind, format: TableFormat, sources: &ExportSources<'_>) -> Result<Export> {
    let table = export_table(kind, sources);
    let bytes = write_table(format, &table)?;
    log::info!("Exported {:?} ({} rows) as {}", kind, table.len(), format.extension());
    Ok(Export {
        file_name: file_name(kind, format, sources.inventory_path),
        format,
        bytes,
    })
}

/// Suggested download file name
pub fn file_name(kind: ExportKind, format: TableFormat, inventory_path: &Path) -> String {
    let ext = format.extension();
    match kind {
        ExportKind::Catalog => {
            let stem = inventory_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "inventory".to_string());
            format!("fil-{}_{}-downloaded.{}", stem, today(), ext)
        }
        ExportKind::Archive => format!("fil-archive_{}-downloaded.{}", today(), ext),
        ExportKind::Missing => format!("stocktake_missing.{}", ext),
        ExportKind::Scanned => format!("stocktake_scanned.{}", ext),
        ExportKind::Matched => format!("stocktake_matched.{}", ext),
        ExportKind::Unfound => format!("unfound_barcodes.{}", ext),
    }
}

/// Visible columns only, canonical barcodes, formatted prices
pub fn visible_table<'a, I>(catalog: &Catalog, products: I) -> Table
where
    I: IntoIterator<Item = &'a Product>,
{
    let columns: Vec<String> = VISIBLE_FIELDS
        .iter()
        .filter(|f| catalog.has_column(f))
        .map(|f| f.to_string())
        .collect();
    let mut table = Table::new(columns);
    for product in products {
        let row = table
            .headers
            .iter()
            .map(|col| match col.as_str() {
                BARCODE => clean_barcode(product.get(col)),
                RRP => format_rrp(product.get(col)),
                _ => product.get(col).to_string(),
            })
            .collect();
        table.push_row(row);
    }
    table
}
