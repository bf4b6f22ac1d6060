//! Spreadsheet-backed product catalog
//!
//! The catalog is loaded wholesale from a CSV or XLSX file, mutated in memory
//! and written back wholesale. Barcode and frame-code uniqueness is checked on
//! every add/edit, not on load.

use crate::barcode::{clean_barcode, format_rrp, strip_rrp};
use crate::error::{InventoryError, Result};
use crate::models::{
    Product, AVAILFROM, BARCODE, FRAMENUM, FRAME_NO_LEGACY, RRP, TIMESTAMP,
};
use crate::tabular::{read_table, write_table_file, Table, TableFormat};
use std::path::{Path, PathBuf};

/// File name of the archived catalog kept next to the inventory files
pub const ARCHIVE_FILE_NAME: &str = "archive_inventory.xlsx";

/// Ordered columns plus ordered products for one inventory file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    columns: Vec<String>,
    products: Vec<Product>,
}

impl Catalog {
    /// Empty catalog with the given column layout
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            products: Vec::new(),
        }
    }

    /// Build a catalog from products, normalizing them the same way a load does
    pub fn from_products<I, S>(columns: I, products: Vec<Product>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(columns.into_iter().map(Into::into).collect());
        for product in &products {
            let row = table
                .headers
                .iter()
                .map(|col| product.get(col).to_string())
                .collect();
            table.push_row(row);
        }
        Self::from_table(table)
    }

    /// Normalize a raw table into a catalog (no required-column check)
    pub fn from_table(mut table: Table) -> Self {
        for header in table.headers.iter_mut() {
            if header == FRAME_NO_LEGACY {
                *header = FRAMENUM.to_string();
            }
        }

        // BARCODE always leads
        if let Some(idx) = table.column_index(BARCODE) {
            if idx != 0 {
                let header = table.headers.remove(idx);
                table.headers.insert(0, header);
                for row in table.rows.iter_mut() {
                    let value = row.remove(idx);
                    row.insert(0, value);
                }
            }
        }

        let products = table
            .rows
            .iter()
            .map(|row| {
                let mut product = Product::new();
                for (col, value) in table.headers.iter().zip(row.iter()) {
                    let value = if value.trim() == "nan" { "" } else { value.as_str() };
                    let value = match col.as_str() {
                        BARCODE => clean_barcode(value),
                        RRP => strip_rrp(value),
                        _ => value.to_string(),
                    };
                    product.set(col.clone(), value);
                }
                product
            })
            .collect();

        Self {
            columns: table.headers,
            products,
        }
    }

    /// Load an inventory file, normalizing barcodes and prices
    pub fn load(path: &Path) -> Result<Self> {
        ensure_catalog_format(path)?;
        if !path.exists() {
            return Err(InventoryError::FileNotFound(path.to_path_buf()));
        }
        let catalog = Self::from_table(read_table(path)?);
        for required in [BARCODE, FRAMENUM] {
            if !catalog.has_column(required) {
                return Err(InventoryError::MissingColumn(required.to_string()));
            }
        }
        log::info!(
            "Loaded {} products from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Rewrite the whole inventory file
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_catalog_format(path)?;
        write_table_file(path, &self.to_table())?;
        log::info!("Saved {} products to {}", self.len(), path.display());
        Ok(())
    }

    /// Table form with canonical barcodes and `$X.XX` prices
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(self.columns.clone());
        for product in &self.products {
            let row = self
                .columns
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

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Canonical barcodes in catalog order
    pub fn barcodes(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| clean_barcode(p.barcode()))
            .collect()
    }

    /// Row index of the product with this barcode (after canonicalization)
    pub fn position_of(&self, barcode: &str) -> Option<usize> {
        let wanted = clean_barcode(barcode);
        if wanted.is_empty() {
            return None;
        }
        self.products
            .iter()
            .position(|p| clean_barcode(p.barcode()) == wanted)
    }

    pub fn find_by_barcode(&self, barcode: &str) -> Option<&Product> {
        self.position_of(barcode).and_then(|idx| self.products.get(idx))
    }

    /// Columns a user edits, i.e. everything except the modification stamp
    pub fn editable_columns(&self) -> impl Iterator<Item = &String> {
        self.columns
            .iter()
            .filter(|c| !c.eq_ignore_ascii_case(TIMESTAMP))
    }

    /// Add a new product after checking required fields and uniqueness.
    ///
    /// Returns the row index of the new product.
    pub fn add_product(&mut self, input: &Product) -> Result<usize> {
        let (barcode, frame_code) = required_codes(input)?;
        self.check_unique(&barcode, &frame_code, None)?;

        let mut product = Product::new();
        for col in self.editable_columns() {
            let value = match col.as_str() {
                BARCODE => barcode.clone(),
                FRAMENUM => input.get(col).trim().to_string(),
                RRP => format_rrp(input.get(col)),
                AVAILFROM if input.get(col).trim().is_empty() => today(),
                _ => input.get(col).to_string(),
            };
            product.set(col.clone(), value);
        }
        if self.has_column(TIMESTAMP) {
            product.set(TIMESTAMP, now_timestamp());
        }

        log::info!("Adding product {} ({})", barcode, frame_code);
        self.products.push(product);
        Ok(self.products.len() - 1)
    }

    /// Apply edits to an existing product. Columns absent from `input` keep
    /// their current value.
    pub fn update_product(&mut self, index: usize, input: &Product) -> Result<()> {
        let current = self
            .products
            .get(index)
            .ok_or_else(|| InventoryError::ProductNotFound(format!("row {}", index)))?
            .clone();

        let mut merged = current;
        for col in self.editable_columns() {
            if input.contains(col) {
                merged.set(col.clone(), input.get(col));
            }
        }
        let (barcode, frame_code) = required_codes(&merged)?;
        self.check_unique(&barcode, &frame_code, Some(index))?;

        merged.set(BARCODE, barcode.clone());
        merged.set(FRAMENUM, merged.get(FRAMENUM).trim().to_string());
        if self.has_column(RRP) {
            let rrp = format_rrp(merged.get(RRP));
            merged.set(RRP, rrp);
        }
        if self.has_column(TIMESTAMP) {
            merged.set(TIMESTAMP, now_timestamp());
        }

        log::info!("Updating product at row {} ({})", index, barcode);
        self.products[index] = merged;
        Ok(())
    }

    /// Remove a product by row index and return it
    pub fn delete_product(&mut self, index: usize) -> Result<Product> {
        if index >= self.products.len() {
            return Err(InventoryError::ProductNotFound(format!("row {}", index)));
        }
        let removed = self.products.remove(index);
        log::info!(
            "Deleted product {} ({})",
            removed.barcode(),
            removed.frame_code()
        );
        Ok(removed)
    }

    fn check_unique(&self, barcode: &str, frame_code: &str, skip: Option<usize>) -> Result<()> {
        let others = || {
            self.products
                .iter()
                .enumerate()
                .filter(move |(i, _)| Some(*i) != skip)
                .map(|(_, p)| p)
        };
        if others().any(|p| clean_barcode(p.barcode()) == barcode) {
            return Err(InventoryError::DuplicateBarcode(barcode.to_string()));
        }
        if others().any(|p| clean_barcode(p.frame_code()) == frame_code) {
            return Err(InventoryError::DuplicateFrameCode(frame_code.to_string()));
        }
        Ok(())
    }

    /// Smart default for a form field: the most recent value entered in that
    /// column, otherwise a shop-wide fallback
    pub fn suggest_value(&self, header: &str) -> String {
        if self.has_column(header) {
            if let Some(recent) = self
                .products
                .iter()
                .rev()
                .map(|p| p.get(header).trim())
                .find(|v| !v.is_empty())
            {
                return recent.to_string();
            }
        }
        match header {
            "MANUFACT" => "Ray-Ban".to_string(),
            "SUPPLIER" => "Default Supplier".to_string(),
            "F TYPE" | "FRAMETYPE" => "MEN".to_string(),
            "RRP" => "120.00".to_string(),
            "EXCOSTPR" => "60.00".to_string(),
            "COST PRICE" => "70.00".to_string(),
            "TAXPC" => "GST 10%".to_string(),
            "AVAILFROM" => today(),
            "FRSTATUS" => "PRACTICE OWNED".to_string(),
            _ => String::new(),
        }
    }
}

fn required_codes(input: &Product) -> Result<(String, String)> {
    let barcode = clean_barcode(input.get(BARCODE));
    if barcode.is_empty() {
        return Err(InventoryError::MissingField(BARCODE.to_string()));
    }
    let frame_code = clean_barcode(input.get(FRAMENUM));
    if frame_code.is_empty() {
        return Err(InventoryError::MissingField(FRAMENUM.to_string()));
    }
    Ok((barcode, frame_code))
}

fn ensure_catalog_format(path: &Path) -> Result<()> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv | TableFormat::Xlsx => Ok(()),
        TableFormat::Txt => Err(InventoryError::UnsupportedFileType(
            path.display().to_string(),
        )),
    }
}

/// Sorted inventory file names (`.csv`/`.xlsx`) in the inventory folder
pub fn discover_inventory_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(InventoryError::FileNotFound(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let lower = name.to_lowercase();
        if name == ARCHIVE_FILE_NAME || name.starts_with("~$") {
            continue;
        }
        if lower.ends_with(".csv") || lower.ends_with(".xlsx") {
            files.push(name);
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(InventoryError::FileNotFound(dir.to_path_buf()));
    }
    Ok(files)
}

/// Resolve the inventory file to use: the named one, or the first found
pub fn select_inventory_file(dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let files = discover_inventory_files(dir)?;
    match name {
        Some(name) if files.iter().any(|f| f == name) => Ok(dir.join(name)),
        Some(name) => Err(InventoryError::FileNotFound(dir.join(name))),
        None => Ok(dir.join(&files[0])),
    }
}

/// Load the archived catalog, or an empty one if there is no archive
pub fn load_archive(dir: &Path) -> Result<Catalog> {
    let path = dir.join(ARCHIVE_FILE_NAME);
    if !path.exists() {
        log::debug!("No archive inventory at {}", path.display());
        return Ok(Catalog::default());
    }
    Ok(Catalog::from_table(read_table(&path)?))
}

/// Today's date as `YYYY-MM-DD` using local system time
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MODEL, SUPPLIER};
    use tempfile::TempDir;

    fn sample() -> Catalog {
        Catalog::from_products(
            [BARCODE, FRAMENUM, MODEL, RRP],
            vec![
                Product::from_pairs([(BARCODE, "100"), (FRAMENUM, "RAY000001"), (MODEL, "A"), (RRP, "120")]),
                Product::from_pairs([(BARCODE, "200.0"), (FRAMENUM, "RAY000002"), (MODEL, "B"), (RRP, "$99.5")]),
            ],
        )
    }

    #[test]
    fn test_from_table_renames_legacy_frame_column_and_moves_barcode_first() {
        let mut table = Table::new(vec!["MODEL".into(), "FRAME NO.".into(), "BARCODE".into()]);
        table.push_row(vec!["RB".into(), "RAY000001".into(), " 00123 ".into()]);

        let catalog = Catalog::from_table(table);
        assert_eq!(catalog.columns(), &["BARCODE", "MODEL", "FRAMENUM"]);
        assert_eq!(catalog.products()[0].barcode(), "123");
        assert_eq!(catalog.products()[0].frame_code(), "RAY000001");
    }

    #[test]
    fn test_from_table_strips_prices_and_nan() {
        let mut table = Table::new(vec!["BARCODE".into(), "FRAMENUM".into(), "RRP".into(), "NOTE".into()]);
        table.push_row(vec!["1".into(), "X".into(), "$45.00".into(), "nan".into()]);

        let catalog = Catalog::from_table(table);
        assert_eq!(catalog.products()[0].get(RRP), "45.00");
        assert_eq!(catalog.products()[0].get("NOTE"), "");
    }

    #[test]
    fn test_add_product_rejects_duplicates() {
        let mut catalog = sample();

        let dup_barcode = Product::from_pairs([(BARCODE, "100.0"), (FRAMENUM, "RAY000009")]);
        assert!(matches!(
            catalog.add_product(&dup_barcode),
            Err(InventoryError::DuplicateBarcode(b)) if b == "100"
        ));

        let dup_frame = Product::from_pairs([(BARCODE, "300"), (FRAMENUM, "RAY000002")]);
        assert!(matches!(
            catalog.add_product(&dup_frame),
            Err(InventoryError::DuplicateFrameCode(_))
        ));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_add_product_requires_codes() {
        let mut catalog = sample();
        let no_frame = Product::from_pairs([(BARCODE, "300")]);
        assert!(matches!(
            catalog.add_product(&no_frame),
            Err(InventoryError::MissingField(f)) if f == FRAMENUM
        ));
        let no_barcode = Product::from_pairs([(FRAMENUM, "RAY000003")]);
        assert!(matches!(
            catalog.add_product(&no_barcode),
            Err(InventoryError::MissingField(f)) if f == BARCODE
        ));
    }

    #[test]
    fn test_add_product_fills_every_column() {
        let mut catalog = sample();
        let input = Product::from_pairs([
            (BARCODE, "00300"),
            (FRAMENUM, "RAY000003"),
            (RRP, "75"),
            (SUPPLIER, "ignored, not a catalog column"),
        ]);
        let idx = catalog.add_product(&input).unwrap();
        let added = catalog.get(idx).unwrap();
        assert_eq!(added.barcode(), "300");
        assert_eq!(added.get(RRP), "$75.00");
        assert_eq!(added.get(MODEL), "");
        assert!(!added.contains(SUPPLIER));
    }

    #[test]
    fn test_add_product_defaults_availability_and_stamps() {
        let mut catalog = Catalog::with_columns([BARCODE, FRAMENUM, AVAILFROM, TIMESTAMP]);
        let idx = catalog
            .add_product(&Product::from_pairs([(BARCODE, "1"), (FRAMENUM, "ABC000001")]))
            .unwrap();
        let added = catalog.get(idx).unwrap();
        assert_eq!(added.get(AVAILFROM), today());
        assert_eq!(added.get(TIMESTAMP).len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_update_product_allows_keeping_own_codes() {
        let mut catalog = sample();
        let edit = Product::from_pairs([(MODEL, "A2")]);
        catalog.update_product(0, &edit).unwrap();
        assert_eq!(catalog.get(0).unwrap().get(MODEL), "A2");
        assert_eq!(catalog.get(0).unwrap().barcode(), "100");
        assert_eq!(catalog.get(0).unwrap().get(RRP), "$120.00");
    }

    #[test]
    fn test_update_product_rejects_other_products_codes() {
        let mut catalog = sample();
        let edit = Product::from_pairs([(BARCODE, "200")]);
        assert!(matches!(
            catalog.update_product(0, &edit),
            Err(InventoryError::DuplicateBarcode(_))
        ));
        let edit = Product::from_pairs([(FRAMENUM, "RAY000002")]);
        assert!(matches!(
            catalog.update_product(0, &edit),
            Err(InventoryError::DuplicateFrameCode(_))
        ));
        assert!(matches!(
            catalog.update_product(9, &edit),
            Err(InventoryError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_delete_product_removes_row() {
        let mut catalog = sample();
        let removed = catalog.delete_product(0).unwrap();
        assert_eq!(removed.barcode(), "100");
        assert_eq!(catalog.barcodes(), vec!["200"]);
        assert!(catalog.delete_product(5).is_err());
    }

    #[test]
    fn test_find_by_barcode_canonicalizes() {
        let catalog = sample();
        assert_eq!(catalog.find_by_barcode(" 200.0 ").unwrap().get(MODEL), "B");
        assert_eq!(catalog.position_of("0100"), Some(0));
        assert!(catalog.find_by_barcode("").is_none());
    }

    #[test]
    fn test_save_and_load_round_trip_formats_prices() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stock.csv");
        sample().save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("$120.00"));
        assert!(raw.contains("$99.50"));

        let loaded = Catalog::load(&path).unwrap();
        assert_eq!(loaded.barcodes(), vec!["100", "200"]);
        assert_eq!(loaded.products()[1].get(RRP), "99.50");
    }

    #[test]
    fn test_load_requires_code_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stock.csv");
        std::fs::write(&path, "BARCODE,MODEL\n1,A\n").unwrap();
        assert!(matches!(
            Catalog::load(&path),
            Err(InventoryError::MissingColumn(c)) if c == FRAMENUM
        ));
    }

    #[test]
    fn test_load_rejects_unknown_extension_and_missing_file() {
        assert!(matches!(
            Catalog::load(Path::new("stock.ods")),
            Err(InventoryError::UnsupportedFileType(_))
        ));
        assert!(matches!(
            Catalog::load(Path::new("/nope/stock.csv")),
            Err(InventoryError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_discover_skips_archive_and_other_files() {
        let dir = TempDir::new().unwrap();
        for name in ["b.xlsx", "a.csv", "notes.txt", ARCHIVE_FILE_NAME] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let files = discover_inventory_files(dir.path()).unwrap();
        assert_eq!(files, vec!["a.csv", "b.xlsx"]);

        let selected = select_inventory_file(dir.path(), None).unwrap();
        assert_eq!(selected, dir.path().join("a.csv"));
        assert!(select_inventory_file(dir.path(), Some("c.csv")).is_err());
    }

    #[test]
    fn test_discover_reports_empty_folder() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_inventory_files(dir.path()),
            Err(InventoryError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_missing_archive_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_archive(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_suggest_value_prefers_recent_entries() {
        let catalog = sample();
        assert_eq!(catalog.suggest_value(MODEL), "B");
        assert_eq!(catalog.suggest_value("MANUFACT"), "Ray-Ban");
        assert_eq!(catalog.suggest_value("TAXPC"), "GST 10%");
        assert_eq!(catalog.suggest_value("NOTE"), "");
    }
}
