//! Error types for frame_inventory

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for catalog, stocktake and file operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Input was empty after barcode canonicalization
    #[error("Please scan or enter a barcode")]
    EmptyInput,
    /// Barcode is already present in the scan log
    #[error("Barcode already scanned: {0}")]
    AlreadyScanned(String),
    /// Barcode does not match any product in the catalog
    #[error("Barcode not found in inventory: {0}")]
    NotInCatalog(String),
    /// Barcode was asked to be removed but is not in the scan log
    #[error("Barcode has not been scanned: {0}")]
    NotScanned(String),
    /// Another product already uses this barcode
    #[error("A product with barcode {0} already exists")]
    DuplicateBarcode(String),
    /// Another product already uses this frame code
    #[error("A product with frame code {0} already exists")]
    DuplicateFrameCode(String),
    /// Catalog or log file is missing
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// File extension is not one of the supported tabular formats
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// A column the operation needs is not in the table
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    /// A required product field was left empty
    #[error("{0} is required")]
    MissingField(String),
    /// No product matches the given barcode or row
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    /// Every code in the generator's range is already taken
    #[error("No unused barcodes left in 1..={0}")]
    BarcodeSpaceExhausted(u32),
    /// A confirmation was submitted without a matching pending request
    #[error("Nothing pending to confirm: {0}")]
    NothingToConfirm(String),
    /// Barcode value has characters Code 128 cannot encode
    #[error("Cannot draw barcode {0}: {1}")]
    BarcodeSymbol(String, String),
    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV parsing or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Reading an Excel workbook failed
    #[error("Excel read error: {0}")]
    XlsxRead(#[from] calamine::Error),
    /// Writing an Excel workbook failed
    #[error("Excel write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InventoryError {
    /// True for errors caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            InventoryError::Io(_)
                | InventoryError::Csv(_)
                | InventoryError::XlsxRead(_)
                | InventoryError::XlsxWrite(_)
                | InventoryError::Json(_)
        )
    }
}

/// Result alias for frame_inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;
