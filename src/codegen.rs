//! Barcode and frame-code generation

use crate::barcode::clean_barcode;
use crate::catalog::Catalog;
use crate::error::{InventoryError, Result};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;

/// Upper bound (inclusive) of generated barcodes
pub const BARCODE_SPACE: u32 = 15_000;

lazy_static! {
    static ref SEQUENCE_RE: Regex = Regex::new(r"(\d{6})").expect("valid sequence regex");
}

/// Draw random 5-digit barcodes until one is not used by the catalog.
///
/// The returned value is canonical, so `00042` comes back as `42`.
pub fn generate_unique_barcode<R: Rng + ?Sized>(catalog: &Catalog, rng: &mut R) -> Result<String> {
    let taken: HashSet<String> = catalog.barcodes().into_iter().collect();
    let free = (1..=BARCODE_SPACE)
        .filter(|n| !taken.contains(&n.to_string()))
        .count();
    if free == 0 {
        return Err(InventoryError::BarcodeSpaceExhausted(BARCODE_SPACE));
    }

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let candidate = clean_barcode(&format!("{:05}", rng.gen_range(1..=BARCODE_SPACE)));
        if !taken.contains(&candidate) {
            log::debug!("Generated barcode {} after {} attempt(s)", candidate, attempts);
            return Ok(candidate);
        }
    }
}

/// Next frame code for a supplier: `<PREFIX><max sequence + 1, 6 digits>`
pub fn generate_frame_code(supplier: &str, catalog: &Catalog) -> Result<String> {
    let supplier = supplier.trim();
    if supplier.is_empty() {
        return Err(InventoryError::EmptyInput);
    }
    let prefix: String = supplier.chars().take(3).collect::<String>().to_uppercase();

    let max = catalog
        .products()
        .iter()
        .filter_map(|p| p.frame_code().strip_prefix(prefix.as_str()))
        .filter_map(|rest| SEQUENCE_RE.captures(rest))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max();

    let next = max.map(|n| n + 1).unwrap_or(1);
    Ok(format!("{}{:06}", prefix, next))
}
