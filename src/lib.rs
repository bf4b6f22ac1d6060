//! Frame Inventory - spreadsheet-backed frame catalog and stocktake
//!
//! Keeps a retail catalog of spectacle frames in a CSV or XLSX file,
//! generates barcodes and frame codes for new stock, and reconciles a
//! physical count (scanned barcodes) against the catalog.

pub mod barcode;
pub mod bulk;
pub mod catalog;
pub mod codegen;
pub mod config;
pub mod error;
pub mod export;
pub mod label;
pub mod models;
pub mod session;
pub mod stocktake;
pub mod tabular;
pub mod web;

pub use barcode::{clean_barcode, format_rrp};
pub use catalog::Catalog;
pub use config::Settings;
pub use error::{InventoryError, Result};
pub use models::{IdentitySignature, Product};
pub use stocktake::{
    DuplicateVariantPolicy, Reconciliation, ScanLog, ScanOutcome, Stocktake, UnfoundLog,
};
