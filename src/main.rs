//! Frame Inventory - catalog maintenance and stocktake from the command line
//!
//! Every subcommand loads the catalog and logs fresh from disk, applies one
//! change and writes the affected file back. `serve` starts the JSON web
//! service used by the handheld scanners.

use clap::{Parser, Subcommand};
use frame_inventory::catalog::discover_inventory_files;
use frame_inventory::codegen::{generate_frame_code, generate_unique_barcode};
use frame_inventory::config::{default_data_dir, Settings};
use frame_inventory::export::{render, ExportKind, ExportSources};
use frame_inventory::label::Label;
use frame_inventory::models::{Product, BARCODE, FRAMENUM, MANUFACT, MODEL, SUPPLIER};
use frame_inventory::stocktake::ScanOutcome;
use frame_inventory::tabular::{read_table, TableFormat};
use frame_inventory::{DuplicateVariantPolicy, InventoryError, Result};
use std::path::PathBuf;

/// Frame inventory - spreadsheet catalog, code generation and stocktake
#[derive(Parser, Debug)]
#[command(name = "frame_inventory")]
#[command(version, about, long_about = None)]
struct Args {
    /// Data folder holding `Inventory/` and the scan logs
    #[arg(long, global = true, default_value_os_t = default_data_dir())]
    data_dir: PathBuf,

    /// Inventory folder (default: <data-dir>/Inventory)
    #[arg(long, global = true)]
    inventory_dir: Option<PathBuf>,

    /// Inventory file name inside the inventory folder (default: first found)
    #[arg(long, global = true)]
    inventory_file: Option<String>,

    /// Scan log file (default: <data-dir>/scanned_barcodes.csv)
    #[arg(long, global = true)]
    scan_log: Option<PathBuf>,

    /// Unfound barcode log (default: <data-dir>/unfound_barcodes.csv)
    #[arg(long, global = true)]
    unfound_log: Option<PathBuf>,

    /// How to treat a scan of another barcode for an already scanned frame
    #[arg(long, global = true, value_enum, default_value_t = DuplicateVariantPolicy::Confirm)]
    duplicate_variants: DuplicateVariantPolicy,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn settings(&self) -> Settings {
        let mut settings = Settings::rooted_at(&self.data_dir);
        if let Some(dir) = &self.inventory_dir {
            settings.inventory_dir = dir.clone();
        }
        if let Some(path) = &self.scan_log {
            settings.scan_log = path.clone();
        }
        if let Some(path) = &self.unfound_log {
            settings.unfound_log = path.clone();
        }
        settings.inventory_file = self.inventory_file.clone();
        settings.duplicate_variants = self.duplicate_variants;
        settings
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List inventory files in the inventory folder
    Files,
    /// Show the catalog
    List,
    /// Show every field of one product
    Lookup { barcode: String },
    /// Add a product
    Add {
        /// Field value, repeatable: --field MODEL=RB2140
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Generate a fresh barcode when none is given
        #[arg(long)]
        gen_barcode: bool,
        /// Generate the frame code from SUPPLIER (or MANUFACT) when none is given
        #[arg(long)]
        gen_framecode: bool,
        /// Fill empty fields with the most recently used values
        #[arg(long)]
        suggest: bool,
    },
    /// Change fields of an existing product
    Edit {
        barcode: String,
        #[arg(long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Delete a product
    Delete {
        barcode: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Print a barcode not used by any product
    GenBarcode,
    /// Print the next frame code for a supplier
    GenFramecode { supplier: String },
    /// Print the shelf label for a product
    Label {
        barcode: String,
        /// Also write the Code 128 bars as SVG to this file
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Record scanned barcodes
    Scan {
        #[arg(required = true)]
        barcodes: Vec<String>,
        /// Accept scans that repeat an already scanned frame variant
        #[arg(long)]
        confirm: bool,
        /// Add barcodes missing from the catalog to the unfound log
        #[arg(long)]
        log_unfound: bool,
    },
    /// Remove a scanned barcode
    Unscan { barcode: String },
    /// Empty the scan log
    ClearScans {
        /// Confirm clearing
        #[arg(long)]
        yes: bool,
    },
    /// Show scanned products, newest first
    Scanned,
    /// Compare the scan log with the catalog
    Reconcile {
        /// Also list matched barcodes
        #[arg(long)]
        verbose: bool,
    },
    /// Reconcile a file of scanned barcodes without touching the scan log
    Bulk {
        file: PathBuf,
        /// Column holding the barcodes (default: first barcode-like column)
        #[arg(long)]
        column: Option<String>,
    },
    /// Manage the unfound barcode log
    Unfound {
        #[command(subcommand)]
        action: UnfoundAction,
    },
    /// Export a table to CSV or XLSX
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        /// csv or xlsx
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output file (default: suggested name in the current folder)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the web service
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Subcommand, Debug)]
enum UnfoundAction {
    /// Record a barcode
    Add { barcode: String },
    /// Show entries, newest first
    List,
    /// Empty the log
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = args.settings();
    log::debug!("Inventory folder: {}", settings.inventory_dir.display());

    if let Err(e) = run(args.command, &settings).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Files => {
            for name in discover_inventory_files(&settings.inventory_dir)? {
                println!("{}", name);
            }
        }
        Command::List => {
            let (path, catalog) = settings.load_catalog()?;
            println!("{} ({} products)", path.display(), catalog.len());
            for product in catalog.products() {
                println!(
                    "{:<14} {:<12} {:<16} {}",
                    product.barcode(),
                    product.frame_code(),
                    product.get(MANUFACT),
                    product.get(MODEL)
                );
            }
        }
        Command::Lookup { barcode } => {
            let (_, catalog) = settings.load_catalog()?;
            let product = catalog
                .find_by_barcode(&barcode)
                .ok_or(InventoryError::ProductNotFound(barcode))?;
            print_product(catalog.columns(), product);
        }
        Command::Add {
            fields,
            gen_barcode,
            gen_framecode,
            suggest,
        } => {
            let (path, mut catalog) = settings.load_catalog()?;
            let mut input = Product::from_pairs(fields);
            if suggest {
                let columns: Vec<String> = catalog.editable_columns().cloned().collect();
                for column in columns {
                    if input.get(&column).trim().is_empty() {
                        input.set(column.clone(), catalog.suggest_value(&column));
                    }
                }
            }
            if gen_barcode && input.get(BARCODE).trim().is_empty() {
                input.set(BARCODE, generate_unique_barcode(&catalog, &mut rand::thread_rng())?);
            }
            if gen_framecode && input.get(FRAMENUM).trim().is_empty() {
                let supplier = if input.get(SUPPLIER).trim().is_empty() {
                    input.get(MANUFACT).to_string()
                } else {
                    input.get(SUPPLIER).to_string()
                };
                input.set(FRAMENUM, generate_frame_code(&supplier, &catalog)?);
            }
            let idx = catalog.add_product(&input)?;
            catalog.save(&path)?;
            if let Some(product) = catalog.get(idx) {
                println!("Added {} ({})", product.barcode(), product.frame_code());
            }
        }
        Command::Edit { barcode, fields } => {
            let (path, mut catalog) = settings.load_catalog()?;
            let idx = catalog
                .position_of(&barcode)
                .ok_or(InventoryError::ProductNotFound(barcode))?;
            catalog.update_product(idx, &Product::from_pairs(fields))?;
            catalog.save(&path)?;
            if let Some(product) = catalog.get(idx) {
                println!("Updated {}", product.barcode());
            }
        }
        Command::Delete { barcode, yes } => {
            let (path, mut catalog) = settings.load_catalog()?;
            let idx = catalog
                .position_of(&barcode)
                .ok_or_else(|| InventoryError::ProductNotFound(barcode.clone()))?;
            if !yes {
                return Err(InventoryError::NothingToConfirm(format!(
                    "delete {} (rerun with --yes)",
                    barcode
                )));
            }
            let removed = catalog.delete_product(idx)?;
            catalog.save(&path)?;
            println!("Deleted {}", removed.barcode());
        }
        Command::GenBarcode => {
            let (_, catalog) = settings.load_catalog()?;
            println!("{}", generate_unique_barcode(&catalog, &mut rand::thread_rng())?);
        }
        Command::GenFramecode { supplier } => {
            let (_, catalog) = settings.load_catalog()?;
            println!("{}", generate_frame_code(&supplier, &catalog)?);
        }
        Command::Label { barcode, image } => {
            let (_, catalog) = settings.load_catalog()?;
            let product = catalog
                .find_by_barcode(&barcode)
                .ok_or(InventoryError::ProductNotFound(barcode))?;
            let label = Label::for_product(product);
            print!("{}", label.render_text());
            if let Some(path) = image {
                std::fs::write(&path, label.barcode_svg()?)?;
                println!("Wrote {}", path.display());
            }
        }
        Command::Scan {
            barcodes,
            confirm,
            log_unfound,
        } => {
            let (_, mut stocktake) = settings.open_stocktake()?;
            for raw in barcodes {
                let result = if confirm {
                    stocktake.record_confirmed(&raw)
                } else {
                    stocktake.record(&raw)
                };
                match result {
                    Ok(ScanOutcome::Added { barcode }) => println!("{}: added", barcode),
                    Ok(ScanOutcome::AddedDuplicateVariant { barcode, existing }) => {
                        println!("{}: added, same frame as {}", barcode, existing.join(", "))
                    }
                    Ok(ScanOutcome::NeedsConfirmation { barcode, existing }) => println!(
                        "{}: same frame as {}, rerun with --confirm to count it",
                        barcode,
                        existing.join(", ")
                    ),
                    Err(InventoryError::NotInCatalog(barcode)) if log_unfound => {
                        let mut unfound = settings.load_unfound()?;
                        unfound.add(&barcode)?;
                        unfound.save(&settings.unfound_log)?;
                        println!("{}: not in catalog, logged as unfound", barcode);
                    }
                    Err(e @ InventoryError::AlreadyScanned(_))
                    | Err(e @ InventoryError::NotInCatalog(_))
                    | Err(e @ InventoryError::EmptyInput) => println!("{}", e),
                    Err(e) => return Err(e),
                }
            }
            let summary = stocktake.reconcile().summary();
            println!(
                "{} scanned, {} still missing",
                stocktake.scan_log().len(),
                summary.missing
            );
        }
        Command::Unscan { barcode } => {
            let (_, mut stocktake) = settings.open_stocktake()?;
            stocktake.remove(&barcode)?;
            println!("Removed {}", barcode);
        }
        Command::ClearScans { yes } => {
            if !yes {
                return Err(InventoryError::NothingToConfirm(
                    "clear scanned table (rerun with --yes)".to_string(),
                ));
            }
            let (_, mut stocktake) = settings.open_stocktake()?;
            let cleared = stocktake.scan_log().len();
            stocktake.clear()?;
            println!("Cleared {} scans", cleared);
        }
        Command::Scanned => {
            let (_, stocktake) = settings.open_stocktake()?;
            for row in stocktake.rows() {
                println!(
                    "{:<14} {:<12} qty {:<4} {} {}",
                    row.product.barcode(),
                    row.key,
                    row.quantity,
                    row.product.get(MANUFACT),
                    row.product.get(MODEL)
                );
            }
        }
        Command::Reconcile { verbose } => {
            let (_, stocktake) = settings.open_stocktake()?;
            let result = stocktake.reconcile();
            let summary = result.summary();
            println!(
                "matched {}, missing {}, unexpected {}",
                summary.matched, summary.missing, summary.unexpected
            );
            if verbose {
                print_set("Matched", result.matched.iter());
            }
            print_set("Missing", result.missing.iter());
            print_set("Unexpected", result.unexpected.iter());
        }
        Command::Bulk { file, column } => {
            let (_, catalog) = settings.load_catalog()?;
            let table = read_table(&file)?;
            let result = frame_inventory::bulk::reconcile_upload(&catalog, &table, column.as_deref())?;
            let summary = result.summary();
            println!(
                "matched {}, missing {}, unexpected {}",
                summary.matched, summary.missing, summary.unexpected
            );
            print_set("Missing", result.missing.iter());
            print_set("Unexpected", result.unexpected.iter());
        }
        Command::Unfound { action } => {
            let mut unfound = settings.load_unfound()?;
            match action {
                UnfoundAction::Add { barcode } => {
                    let entry = unfound.add(&barcode)?.clone();
                    unfound.save(&settings.unfound_log)?;
                    println!("{} logged at {}", entry.barcode, entry.timestamp);
                }
                UnfoundAction::List => {
                    for entry in unfound.most_recent_first() {
                        println!("{}  {}", entry.timestamp, entry.barcode);
                    }
                }
                UnfoundAction::Clear { yes } => {
                    if !yes {
                        return Err(InventoryError::NothingToConfirm(
                            "clear unfound log (rerun with --yes)".to_string(),
                        ));
                    }
                    let cleared = unfound.len();
                    unfound.clear();
                    unfound.save(&settings.unfound_log)?;
                    println!("Cleared {} unfound barcodes", cleared);
                }
            }
        }
        Command::Export {
            kind,
            format,
            output,
        } => {
            let format = TableFormat::from_extension(&format)?;
            let (path, stocktake) = settings.open_stocktake()?;
            let archive = settings.load_archive()?;
            let unfound = settings.load_unfound()?;
            let export = render(
                kind,
                format,
                &ExportSources {
                    inventory_path: &path,
                    stocktake: &stocktake,
                    archive: &archive,
                    unfound: &unfound,
                },
            )?;
            let target = output.unwrap_or_else(|| PathBuf::from(&export.file_name));
            std::fs::write(&target, &export.bytes)?;
            println!("Wrote {}", target.display());
        }
        Command::Serve { port } => {
            frame_inventory::web::serve(settings.clone(), port).await?;
        }
    }
    Ok(())
}

fn print_product(columns: &[String], product: &Product) {
    for column in columns {
        println!("{:<12} {}", column, product.get(column));
    }
}

fn print_set<'a>(title: &str, items: impl Iterator<Item = &'a String>) {
    let items: Vec<&String> = items.collect();
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  {}", item);
    }
}
