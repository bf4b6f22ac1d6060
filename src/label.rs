//! Shelf labels for frames

use crate::barcode::{clean_barcode, format_rrp};
use crate::error::{InventoryError, Result};
use crate::models::{Product, AVAILFROM, FCOLOUR, FRAMENUM, FRAMETYPE, MANUFACT, MODEL, RRP, SIZE};
use barcoders::generators::svg::SVG;
use barcoders::sym::code128::Code128;
use serde::Serialize;

/// Code 128 character set B prefix (full printable ASCII)
const CODE128_SET_B: char = '\u{0181}';
/// Bar height in SVG units
const BAR_HEIGHT: u32 = 80;

/// Printable label content for one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub barcode: String,
    pub price: String,
    pub tax_note: &'static str,
    pub frame_code: String,
    pub model: String,
    pub manufacturer: String,
    pub colour: String,
    pub frame_type: String,
    pub available_from: String,
    pub size: String,
}

impl Label {
    pub fn for_product(product: &Product) -> Self {
        Self {
            barcode: clean_barcode(product.barcode()),
            price: format_rrp(product.get(RRP)),
            tax_note: "Inc GST",
            frame_code: product.get(FRAMENUM).to_string(),
            model: product.get(MODEL).to_string(),
            manufacturer: product.get(MANUFACT).to_string(),
            colour: product.get(FCOLOUR).to_string(),
            frame_type: product.get(FRAMETYPE).to_string(),
            available_from: product.get(AVAILFROM).to_string(),
            size: product.get(SIZE).to_string(),
        }
    }

    /// Plain-text layout sent to the label printer
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.barcode));
        out.push_str(&format!("{}\n", self.price));
        out.push_str(&format!("{}\n", self.tax_note));
        out.push_str(&format!("Framecode: {}\n", self.frame_code));
        out.push_str(&format!("Model: {}\n", self.model));
        out.push_str(&format!("Manufacturer: {}\n", self.manufacturer));
        out.push_str(&format!("Colour: {}\n", self.colour));
        out.push_str(&format!("Frame Type: {}\n", self.frame_type));
        out.push_str(&format!("Available From: {}\n", self.available_from));
        out.push_str(&format!("Size: {}\n", self.size));
        out
    }

    /// Code 128 bars for this label's barcode
    pub fn barcode_svg(&self) -> Result<String> {
        barcode_svg(&self.barcode)
    }
}

/// Draw a barcode value as a Code 128 SVG, bars only with no text line
pub fn barcode_svg(raw: &str) -> Result<String> {
    let barcode = clean_barcode(raw);
    if barcode.is_empty() {
        return Err(InventoryError::EmptyInput);
    }
    let symbol = Code128::new(format!("{}{}", CODE128_SET_B, barcode))
        .map_err(|e| InventoryError::BarcodeSymbol(barcode.clone(), e.to_string()))?;
    let encoded = symbol.encode();
    SVG::new(BAR_HEIGHT)
        .generate(&encoded[..])
        .map_err(|e| InventoryError::BarcodeSymbol(barcode, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BARCODE;

    #[test]
    fn test_label_formats_price_and_barcode() {
        let product = Product::from_pairs([
            (BARCODE, "00123"),
            (RRP, "189"),
            (FRAMENUM, "RAY000004"),
            (MODEL, "RB2140"),
            (SIZE, "50-22"),
        ]);
        let label = Label::for_product(&product);
        assert_eq!(label.barcode, "123");
        assert_eq!(label.price, "$189.00");

        let text = label.render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "123");
        assert_eq!(lines[1], "$189.00");
        assert_eq!(lines[2], "Inc GST");
        assert!(text.contains("Framecode: RAY000004\n"));
        assert!(text.contains("Colour: \n"));
    }

    #[test]
    fn test_barcode_svg_draws_code128_bars() {
        let product = Product::from_pairs([(BARCODE, "12345.0")]);
        let svg = Label::for_product(&product).barcode_svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<rect"));
        // same value, same drawing
        assert_eq!(svg, barcode_svg("12345").unwrap());
    }

    #[test]
    fn test_barcode_svg_rejects_empty_value() {
        assert!(matches!(barcode_svg(" \u{200B} "), Err(InventoryError::EmptyInput)));
        assert!(matches!(barcode_svg(""), Err(InventoryError::EmptyInput)));
    }
}
