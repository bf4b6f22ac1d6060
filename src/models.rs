use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column holding the canonical product barcode
pub const BARCODE: &str = "BARCODE";
/// Column holding the supplier-prefixed frame code
pub const FRAMENUM: &str = "FRAMENUM";
/// Legacy name of the frame code column, renamed on load
pub const FRAME_NO_LEGACY: &str = "FRAME NO.";
pub const MANUFACT: &str = "MANUFACT";
pub const MODEL: &str = "MODEL";
pub const SIZE: &str = "SIZE";
pub const FCOLOUR: &str = "FCOLOUR";
pub const FRAMETYPE: &str = "FRAMETYPE";
pub const QUANTITY: &str = "QUANTITY";
pub const RRP: &str = "RRP";
pub const SUPPLIER: &str = "SUPPLIER";
pub const AVAILFROM: &str = "AVAILFROM";
/// Optional modification stamp column
pub const TIMESTAMP: &str = "Timestamp";

/// Columns shown in stocktake tables and visible-column exports, in order
pub const VISIBLE_FIELDS: &[&str] = &[
    "BARCODE",
    "LOCATION",
    "FRAMENUM",
    "MANUFACT",
    "MODEL",
    "SIZE",
    "FCOLOUR",
    "FRAMETYPE",
    "F GROUP",
    "SUPPLIER",
    "QUANTITY",
    "F TYPE",
    "TEMPLE",
    "DEPTH",
    "DIAG",
    "BASECURVE",
    "RRP",
    "EXCOSTPR",
    "COST PRICE",
    "TAXPC",
    "FRSTATUS",
    "AVAILFROM",
    "NOTE",
];

/// One catalog row: column name to text value.
///
/// Known columns are normalized by the catalog; everything else passes
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product {
    fields: BTreeMap<String, String>,
}

impl Product {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a product from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a column, empty when the column is absent
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.fields.remove(column)
    }

    pub fn barcode(&self) -> &str {
        self.get(BARCODE)
    }

    pub fn frame_code(&self) -> &str {
        self.get(FRAMENUM)
    }

    /// Key that groups scans of the same product for display: the frame
    /// number when present, otherwise the barcode
    pub fn product_key(&self) -> &str {
        let frame = self.frame_code().trim();
        if frame.is_empty() {
            self.barcode()
        } else {
            frame
        }
    }

    pub fn signature(&self) -> IdentitySignature {
        IdentitySignature::of(self)
    }
}

/// Descriptive fields used to detect that two barcodes are the same variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IdentitySignature {
    pub frame_number: String,
    pub model: String,
    pub manufacturer: String,
    pub size: String,
    pub colour: String,
    pub frame_type: String,
}

impl IdentitySignature {
    pub fn of(product: &Product) -> Self {
        let field = |name: &str| product.get(name).trim().to_string();
        Self {
            frame_number: field(FRAMENUM),
            model: field(MODEL),
            manufacturer: field(MANUFACT),
            size: field(SIZE),
            colour: field(FCOLOUR),
            frame_type: field(FRAMETYPE),
        }
    }

    /// A signature with no descriptive content cannot identify anything
    pub fn is_blank(&self) -> bool {
        [
            &self.frame_number,
            &self.model,
            &self.manufacturer,
            &self.size,
            &self.colour,
            &self.frame_type,
        ]
        .iter()
        .all(|v| v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(barcode: &str, framenum: &str) -> Product {
        Product::from_pairs([
            (BARCODE, barcode),
            (FRAMENUM, framenum),
            (MODEL, "RB3025"),
            (MANUFACT, "Ray-Ban"),
            (SIZE, "58-14"),
            (FCOLOUR, "Gold"),
            (FRAMETYPE, "MEN"),
        ])
    }

    #[test]
    fn test_product_key_prefers_frame_number() {
        assert_eq!(frame("123", "RAY000001").product_key(), "RAY000001");
        assert_eq!(frame("123", " ").product_key(), "123");
    }

    #[test]
    fn test_missing_columns_read_as_empty() {
        let product = Product::from_pairs([(BARCODE, "1")]);
        assert_eq!(product.get("NOTE"), "");
        assert!(!product.contains("NOTE"));
    }

    #[test]
    fn test_signature_ignores_barcode_and_padding() {
        let a = frame("1", "RAY000001");
        let mut b = frame("2", "RAY000001 ");
        assert_eq!(a.signature(), b.signature());

        b.set(FCOLOUR, "Black");
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_blank_signature_detected() {
        let product = Product::from_pairs([(BARCODE, "1"), ("NOTE", "spare")]);
        assert!(product.signature().is_blank());
        assert!(!frame("1", "X").signature().is_blank());
    }

    #[test]
    fn test_product_serializes_as_flat_map() {
        let product = Product::from_pairs([(BARCODE, "1"), (MODEL, "Wayfarer")]);
        let json = serde_json::to_string(&product).unwrap();
        assert_eq!(json, r#"{"BARCODE":"1","MODEL":"Wayfarer"}"#);
    }
}
