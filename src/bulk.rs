//! Stock counts from uploaded scanner files
//!
//! Reconciles a whole file of scanned barcodes against the catalog without
//! touching the shared scan log.

use crate::catalog::Catalog;
use crate::error::{InventoryError, Result};
use crate::stocktake::{reconcile, Reconciliation};
use crate::tabular::Table;

const BARCODE_HINTS: [&str; 4] = ["barcode", "ean", "upc", "code"];

/// Columns that look like they hold barcodes; all columns if none do.
/// The first entry is the default choice.
pub fn barcode_column_candidates(headers: &[String]) -> Vec<String> {
    let candidates: Vec<String> = headers
        .iter()
        .filter(|h| {
            let lower = h.to_lowercase();
            BARCODE_HINTS.iter().any(|hint| lower.contains(hint))
        })
        .cloned()
        .collect();
    if candidates.is_empty() {
        headers.to_vec()
    } else {
        candidates
    }
}

/// Reconcile an uploaded table against the catalog.
///
/// `column` selects the barcode column; `None` takes the first candidate.
pub fn reconcile_upload(catalog: &Catalog, table: &Table, column: Option<&str>) -> Result<Reconciliation> {
    let column = match column {
        Some(name) => name.to_string(),
        None => barcode_column_candidates(&table.headers)
            .into_iter()
            .next()
            .ok_or_else(|| InventoryError::MissingColumn("barcode".to_string()))?,
    };
    let scanned = table.column(&column)?;
    let catalog_barcodes = catalog.barcodes();

    let result = reconcile(catalog_barcodes.iter().map(String::as_str), scanned);
    log::info!(
        "Upload reconciled on column '{}': {} matched, {} missing, {} unexpected",
        column,
        result.matched.len(),
        result.missing.len(),
        result.unexpected.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, BARCODE, FRAMENUM};

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_candidates_match_barcode_like_names() {
        let h = headers(&["Item", "EAN13", "Scan Barcode", "qty"]);
        assert_eq!(barcode_column_candidates(&h), headers(&["EAN13", "Scan Barcode"]));
    }

    #[test]
    fn test_candidates_fall_back_to_all_columns() {
        let h = headers(&["a", "b"]);
        assert_eq!(barcode_column_candidates(&h), h);
    }

    #[test]
    fn test_upload_reconciles_without_scan_log() {
        let catalog = Catalog::from_products(
            [BARCODE, FRAMENUM],
            vec![
                Product::from_pairs([(BARCODE, "1"), (FRAMENUM, "A")]),
                Product::from_pairs([(BARCODE, "2"), (FRAMENUM, "B")]),
            ],
        );
        let mut table = Table::new(headers(&["when", "UPC"]));
        table.push_row(headers(&["mon", "1.0"]));
        table.push_row(headers(&["tue", "77"]));
        table.push_row(headers(&["tue", ""]));

        let result = reconcile_upload(&catalog, &table, None).unwrap();
        assert_eq!(result.matched.len(), 1);
        assert!(result.missing.contains("2"));
        assert!(result.unexpected.contains("77"));
        assert_eq!(result.unexpected.len(), 1);
    }

    #[test]
    fn test_explicit_missing_column_is_an_error() {
        let catalog = Catalog::default();
        let table = Table::new(headers(&["barcode"]));
        assert!(matches!(
            reconcile_upload(&catalog, &table, Some("EAN")),
            Err(InventoryError::MissingColumn(_))
        ));
    }
}
