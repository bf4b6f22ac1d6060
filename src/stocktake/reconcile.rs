//! Matched / missing / unexpected sets between catalog and scans

use crate::barcode::clean_barcode;
use serde::Serialize;
use std::collections::BTreeSet;

/// Three disjoint sets of canonical barcodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// In the catalog and scanned
    pub matched: BTreeSet<String>,
    /// In the catalog but never scanned
    pub missing: BTreeSet<String>,
    /// Scanned but not in the catalog
    pub unexpected: BTreeSet<String>,
}

/// Counts shown in the stocktake summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub missing: usize,
    pub unexpected: usize,
}

impl Reconciliation {
    pub fn summary(&self) -> ReconciliationSummary {
        ReconciliationSummary {
            matched: self.matched.len(),
            missing: self.missing.len(),
            unexpected: self.unexpected.len(),
        }
    }

    /// True when every catalog item was found and nothing extra turned up
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Reconcile catalog barcodes against scanned barcodes.
///
/// Both sides are canonicalized and empty values are ignored, so externally
/// supplied batches (uploads) can be passed in raw.
pub fn reconcile<'a, C, S>(catalog_barcodes: C, scanned: S) -> Reconciliation
where
    C: IntoIterator<Item = &'a str>,
    S: IntoIterator<Item = &'a str>,
{
    let canonical = |values: Vec<&str>| -> BTreeSet<String> {
        values
            .into_iter()
            .map(clean_barcode)
            .filter(|b| !b.is_empty())
            .collect()
    };
    let inventory = canonical(catalog_barcodes.into_iter().collect());
    let scanned = canonical(scanned.into_iter().collect());

    Reconciliation {
        matched: inventory.intersection(&scanned).cloned().collect(),
        missing: inventory.difference(&scanned).cloned().collect(),
        unexpected: scanned.difference(&inventory).cloned().collect(),
    }
}
