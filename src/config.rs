//! Resolved file locations and stocktake policy shared by the CLI and web UI

use crate::catalog::{load_archive, select_inventory_file, Catalog};
use crate::error::Result;
use crate::stocktake::{DuplicateVariantPolicy, Stocktake, UnfoundLog};
use std::path::{Path, PathBuf};

pub const SCAN_LOG_FILE_NAME: &str = "scanned_barcodes.csv";
pub const UNFOUND_LOG_FILE_NAME: &str = "unfound_barcodes.csv";

/// Returns the default data folder: ~/.local/share/frame_inventory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("frame_inventory")
}

/// Where everything lives and how duplicate variants are handled
#[derive(Debug, Clone)]
pub struct Settings {
    pub inventory_dir: PathBuf,
    /// File name inside `inventory_dir`; the first file found when unset
    pub inventory_file: Option<String>,
    pub scan_log: PathBuf,
    pub unfound_log: PathBuf,
    pub duplicate_variants: DuplicateVariantPolicy,
}

impl Settings {
    /// Settings rooted at one data folder: `<root>/Inventory` plus the two
    /// logs next to it
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            inventory_dir: root.join("Inventory"),
            inventory_file: None,
            scan_log: root.join(SCAN_LOG_FILE_NAME),
            unfound_log: root.join(UNFOUND_LOG_FILE_NAME),
            duplicate_variants: DuplicateVariantPolicy::default(),
        }
    }

    /// Path of the selected inventory file
    pub fn inventory_path(&self) -> Result<PathBuf> {
        select_inventory_file(&self.inventory_dir, self.inventory_file.as_deref())
    }

    /// Fresh load of the selected catalog
    pub fn load_catalog(&self) -> Result<(PathBuf, Catalog)> {
        let path = self.inventory_path()?;
        let catalog = Catalog::load(&path)?;
        Ok((path, catalog))
    }

    pub fn load_archive(&self) -> Result<Catalog> {
        load_archive(&self.inventory_dir)
    }

    /// Fresh stocktake over the selected catalog and the shared scan log
    pub fn open_stocktake(&self) -> Result<(PathBuf, Stocktake)> {
        let (path, catalog) = self.load_catalog()?;
        let stocktake = Stocktake::open(catalog, &self.scan_log, self.duplicate_variants)?;
        Ok((path, stocktake))
    }

    pub fn load_unfound(&self) -> Result<UnfoundLog> {
        UnfoundLog::load(&self.unfound_log)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::rooted_at(&default_data_dir())
    }
}
