use frame_inventory::catalog::{discover_inventory_files, select_inventory_file, Catalog};
use frame_inventory::codegen::generate_frame_code;
use frame_inventory::error::InventoryError;
use frame_inventory::models::{Product, BARCODE, FRAMENUM, MODEL, RRP};
use std::io::Write;
use tempfile::{Builder, TempDir};

// Test fixtures - sample inventory files

fn create_legacy_inventory_content() -> String {
    r#"FRAME NO.,MODEL,BARCODE,RRP,MANUFACT
ABC000001,RB2140,00123.0,$120.00,Ray-Ban
ABC000003,RB3025, 456 ,nan,Ray-Ban
XYZ000010,OX8046,789,99.5,Oakley"#
        .to_string()
}

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
    write!(temp_file, "{}", content).unwrap();
    temp_file
}

#[test]
fn test_load_normalizes_legacy_layout() {
    let temp_file = write_csv(&create_legacy_inventory_content());

    let catalog = Catalog::load(temp_file.path()).unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.columns()[0], BARCODE);
    assert!(catalog.has_column(FRAMENUM));
    assert!(!catalog.has_column("FRAME NO."));
    assert_eq!(catalog.barcodes(), vec!["123", "456", "789"]);
    assert_eq!(catalog.products()[0].get(RRP), "120.00");
    assert_eq!(catalog.products()[1].get(RRP), "");
}

#[test]
fn test_load_requires_frame_number_column() {
    let temp_file = write_csv("BARCODE,MODEL\n1,RB1\n");

    let result = Catalog::load(temp_file.path());

    assert!(matches!(result, Err(InventoryError::MissingColumn(c)) if c == FRAMENUM));
}

#[test]
fn test_load_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    let result = Catalog::load(&dir.path().join("missing.csv"));
    assert!(matches!(result, Err(InventoryError::FileNotFound(_))));
}

#[test]
fn test_load_rejects_text_inventory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frames.txt");
    std::fs::write(&path, "BARCODE\tFRAMENUM\n1\tA\n").unwrap();

    assert!(matches!(
        Catalog::load(&path),
        Err(InventoryError::UnsupportedFileType(_))
    ));
}

#[test]
fn test_save_formats_prices_and_barcodes() {
    let temp_file = write_csv(&create_legacy_inventory_content());
    let catalog = Catalog::load(temp_file.path()).unwrap();

    catalog.save(temp_file.path()).unwrap();
    let saved = std::fs::read_to_string(temp_file.path()).unwrap();

    let mut lines = saved.lines();
    assert_eq!(lines.next(), Some("BARCODE,FRAMENUM,MODEL,RRP,MANUFACT"));
    assert_eq!(lines.next(), Some("123,ABC000001,RB2140,$120.00,Ray-Ban"));
    assert_eq!(lines.next(), Some("456,ABC000003,RB3025,$0.00,Ray-Ban"));
    assert_eq!(lines.next(), Some("789,XYZ000010,OX8046,$99.50,Oakley"));
}

#[test]
fn test_xlsx_round_trip_keeps_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frames.xlsx");
    let catalog = Catalog::from_products(
        [BARCODE, FRAMENUM, MODEL, RRP],
        vec![Product::from_pairs([
            (BARCODE, "5012345678900"),
            (FRAMENUM, "ABC000001"),
            (MODEL, "RB2140"),
            (RRP, "120"),
        ])],
    );

    catalog.save(&path).unwrap();
    let reloaded = Catalog::load(&path).unwrap();

    assert_eq!(reloaded.barcodes(), vec!["5012345678900"]);
    assert_eq!(reloaded.products()[0].get(MODEL), "RB2140");
    assert_eq!(reloaded.products()[0].get(RRP), "120.00");
}

#[test]
fn test_add_product_persists_and_rejects_duplicates() {
    let temp_file = write_csv(&create_legacy_inventory_content());
    let mut catalog = Catalog::load(temp_file.path()).unwrap();

    let idx = catalog
        .add_product(&Product::from_pairs([
            (BARCODE, "1000"),
            (FRAMENUM, "ABC000004"),
            (RRP, "150"),
        ]))
        .unwrap();
    catalog.save(temp_file.path()).unwrap();

    let reloaded = Catalog::load(temp_file.path()).unwrap();
    assert_eq!(reloaded.len(), 4);
    assert_eq!(reloaded.products()[idx].get(FRAMENUM), "ABC000004");

    let mut reloaded = reloaded;
    let duplicate_barcode = reloaded.add_product(&Product::from_pairs([
        (BARCODE, "123"),
        (FRAMENUM, "NEW000001"),
    ]));
    assert!(matches!(duplicate_barcode, Err(InventoryError::DuplicateBarcode(_))));

    let duplicate_code = reloaded.add_product(&Product::from_pairs([
        (BARCODE, "2000"),
        (FRAMENUM, "XYZ000010"),
    ]));
    assert!(matches!(duplicate_code, Err(InventoryError::DuplicateFrameCode(_))));
    assert_eq!(reloaded.len(), 4);
}

#[test]
fn test_edit_keeps_own_codes() {
    let temp_file = write_csv(&create_legacy_inventory_content());
    let mut catalog = Catalog::load(temp_file.path()).unwrap();

    let idx = catalog.position_of("456").unwrap();
    catalog
        .update_product(idx, &Product::from_pairs([(MODEL, "RB3025L")]))
        .unwrap();

    let product = catalog.find_by_barcode("456").unwrap();
    assert_eq!(product.get(MODEL), "RB3025L");
    assert_eq!(product.get(FRAMENUM), "ABC000003");
}

#[test]
fn test_frame_code_follows_highest_sequence() {
    let temp_file = write_csv(&create_legacy_inventory_content());
    let catalog = Catalog::load(temp_file.path()).unwrap();

    assert_eq!(generate_frame_code("abc", &catalog).unwrap(), "ABC000004");
    assert_eq!(generate_frame_code("Oakley", &catalog).unwrap(), "OAK000001");
}

#[test]
fn test_discover_skips_archive_and_lock_files() {
    let dir = TempDir::new().unwrap();
    for name in ["b.xlsx", "a.csv", "archive_inventory.xlsx", "~$b.xlsx", "notes.txt"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }

    let files = discover_inventory_files(dir.path()).unwrap();
    assert_eq!(files, vec!["a.csv", "b.xlsx"]);

    let selected = select_inventory_file(dir.path(), Some("b.xlsx")).unwrap();
    assert!(selected.ends_with("b.xlsx"));
    assert!(matches!(
        select_inventory_file(dir.path(), Some("c.csv")),
        Err(InventoryError::FileNotFound(_))
    ));
}
