//! Stocktake reconciler
//!
//! Staff scan barcodes against the selected catalog. Every accepted scan is
//! appended to the shared scan log and the log file is rewritten at once.
//! Scans of a second barcode that describes the same frame variant (same
//! identity signature) go through the configured [`DuplicateVariantPolicy`].

mod reconcile;
mod scan_log;
mod unfound;

pub use reconcile::{reconcile, Reconciliation, ReconciliationSummary};
pub use scan_log::{ScanLog, SCAN_COLUMN};
pub use unfound::{UnfoundEntry, UnfoundLog};

use crate::barcode::clean_barcode;
use crate::catalog::Catalog;
use crate::error::{InventoryError, Result};
use crate::models::{Product, QUANTITY};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// What to do when a scan matches the identity signature of an earlier scan
/// under a different barcode
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateVariantPolicy {
    /// Hold the scan back until it is explicitly confirmed
    #[default]
    Confirm,
    /// Append silently and report it
    Allow,
}

/// Result of a scan that did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Appended to the log
    Added { barcode: String },
    /// Appended although earlier scans share its identity signature
    AddedDuplicateVariant {
        barcode: String,
        existing: Vec<String>,
    },
    /// Not appended; earlier scans share its identity signature
    NeedsConfirmation {
        barcode: String,
        existing: Vec<String>,
    },
}

impl ScanOutcome {
    pub fn barcode(&self) -> &str {
        match self {
            ScanOutcome::Added { barcode }
            | ScanOutcome::AddedDuplicateVariant { barcode, .. }
            | ScanOutcome::NeedsConfirmation { barcode, .. } => barcode,
        }
    }

    pub fn was_added(&self) -> bool {
        !matches!(self, ScanOutcome::NeedsConfirmation { .. })
    }
}

/// One collapsed row of the scanned-products table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRow {
    /// Frame number, or barcode when the product has none
    pub key: String,
    /// Number of scans sharing `key`
    pub scans: usize,
    /// Quantity shown for the row
    pub quantity: String,
    /// Most recently scanned product for `key`, with `QUANTITY` replaced by
    /// the displayed quantity when the catalog has that column
    pub product: Product,
}

/// A stocktake session over one catalog and the shared scan log
#[derive(Debug)]
pub struct Stocktake {
    catalog: Catalog,
    log: ScanLog,
    log_path: PathBuf,
    policy: DuplicateVariantPolicy,
}

impl Stocktake {
    /// Open a session, loading the scan log from `log_path`
    pub fn open(catalog: Catalog, log_path: &Path, policy: DuplicateVariantPolicy) -> Result<Self> {
        let log = ScanLog::load(log_path)?;
        log::debug!(
            "Stocktake opened with {} scans against {} products",
            log.len(),
            catalog.len()
        );
        Ok(Self {
            catalog,
            log,
            log_path: log_path.to_path_buf(),
            policy,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scan_log(&self) -> &ScanLog {
        &self.log
    }

    /// Record a scanned barcode.
    ///
    /// Fails with `EmptyInput`, `AlreadyScanned` or `NotInCatalog`; the latter
    /// carries the canonical barcode so the caller can offer it for the
    /// unfound log. The scan log is untouched on every failure.
    pub fn record(&mut self, raw: &str) -> Result<ScanOutcome> {
        self.record_with(raw, false)
    }

    /// Record a scan that was held back for confirmation, skipping the
    /// identity-signature check
    pub fn record_confirmed(&mut self, raw: &str) -> Result<ScanOutcome> {
        self.record_with(raw, true)
    }

    fn record_with(&mut self, raw: &str, confirmed: bool) -> Result<ScanOutcome> {
        let barcode = clean_barcode(raw);
        if barcode.is_empty() {
            return Err(InventoryError::EmptyInput);
        }
        if self.log.contains(&barcode) {
            log::info!("Barcode {} already scanned", barcode);
            return Err(InventoryError::AlreadyScanned(barcode));
        }
        let product = match self.catalog.find_by_barcode(&barcode) {
            Some(product) => product,
            None => {
                log::warn!("Scanned barcode {} is not in the catalog", barcode);
                return Err(InventoryError::NotInCatalog(barcode));
            }
        };

        let existing = if confirmed {
            Vec::new()
        } else {
            self.same_variant_scans(product)
        };

        let outcome = if existing.is_empty() {
            ScanOutcome::Added {
                barcode: barcode.clone(),
            }
        } else {
            match self.policy {
                DuplicateVariantPolicy::Confirm => {
                    log::warn!(
                        "Barcode {} matches already scanned variant {:?}, confirmation required",
                        barcode,
                        existing
                    );
                    return Ok(ScanOutcome::NeedsConfirmation { barcode, existing });
                }
                DuplicateVariantPolicy::Allow => {
                    log::info!(
                        "Barcode {} is another unit of scanned variant {:?}",
                        barcode,
                        existing
                    );
                    ScanOutcome::AddedDuplicateVariant {
                        barcode: barcode.clone(),
                        existing,
                    }
                }
            }
        };

        self.log.push(barcode);
        if let Err(e) = self.log.save(&self.log_path) {
            self.log.pop();
            return Err(e);
        }
        Ok(outcome)
    }

    /// Barcodes already in the log whose products share `product`'s signature
    fn same_variant_scans(&self, product: &Product) -> Vec<String> {
        let signature = product.signature();
        if signature.is_blank() {
            return Vec::new();
        }
        self.log
            .iter()
            .filter(|scanned| *scanned != product.barcode())
            .filter(|scanned| {
                self.catalog
                    .find_by_barcode(scanned)
                    .map(|p| p.signature() == signature)
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect()
    }

    /// Remove a scanned barcode
    pub fn remove(&mut self, raw: &str) -> Result<()> {
        let barcode = clean_barcode(raw);
        let idx = self
            .log
            .remove(&barcode)
            .ok_or_else(|| InventoryError::NotScanned(barcode.clone()))?;
        if let Err(e) = self.log.save(&self.log_path) {
            self.log.insert(idx, barcode);
            return Err(e);
        }
        log::info!("Removed scanned barcode {}", barcode);
        Ok(())
    }

    /// Empty the scan log immediately. There is no undo.
    pub fn clear(&mut self) -> Result<()> {
        let previous = self.log.take_all();
        if let Err(e) = self.log.save(&self.log_path) {
            self.log.restore(previous);
            return Err(e);
        }
        log::info!("Cleared {} scanned barcodes", previous.len());
        Ok(())
    }

    /// Matched / missing / unexpected against the session catalog
    pub fn reconcile(&self) -> Reconciliation {
        let catalog_barcodes = self.catalog.barcodes();
        reconcile(catalog_barcodes.iter().map(String::as_str), self.log.iter())
    }

    /// Number of scans per product key
    fn scan_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for barcode in self.log.iter() {
            if let Some(product) = self.catalog.find_by_barcode(barcode) {
                *counts.entry(product.product_key().to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Quantity to display for a product in the scanned table.
    ///
    /// The number of scans sharing the product's key. Products not scanned
    /// show the stored `QUANTITY`; the catalog itself is never changed.
    pub fn display_quantity(&self, product: &Product) -> String {
        let scans = self
            .scan_counts()
            .get(product.product_key())
            .copied()
            .unwrap_or(0);
        quantity_for(product, scans)
    }

    /// Scanned products, newest first, one row per product key
    pub fn rows(&self) -> Vec<ScanRow> {
        let counts = self.scan_counts();
        let mut seen = HashSet::new();
        let mut rows = Vec::new();

        for barcode in self.log.most_recent_first() {
            let product = match self.catalog.find_by_barcode(barcode) {
                Some(p) => p,
                None => continue,
            };
            let key = product.product_key().to_string();
            if !seen.insert(key.clone()) {
                continue;
            }
            let scans = counts.get(&key).copied().unwrap_or(0);
            let quantity = quantity_for(product, scans);
            let mut shown = product.clone();
            if self.catalog.has_column(QUANTITY) {
                shown.set(QUANTITY, quantity.clone());
            }
            rows.push(ScanRow {
                key,
                scans,
                quantity,
                product: shown,
            });
        }
        rows
    }

    /// Catalog products not scanned yet, in catalog order
    pub fn missing_products(&self) -> Vec<&Product> {
        self.catalog
            .products()
            .iter()
            .filter(|p| !self.log.contains(&clean_barcode(p.barcode())))
            .collect()
    }
}

fn quantity_for(product: &Product, scans: usize) -> String {
    if scans > 0 {
        scans.to_string()
    } else {
        clean_quantity(product.get(QUANTITY))
    }
}

/// Spreadsheet floats like `2.0` are shown as `2`
fn clean_quantity(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => format!("{:.0}", v),
        _ => raw.trim().to_string(),
    }
}
