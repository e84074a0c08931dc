//! Candidate providers: the source of installed packages.
//!
//! Package enumeration itself belongs to the platform; the core only sees
//! [`CandidateProvider`]. [`InventoryProvider`] reads a JSON inventory file,
//! which is what the `splitroute` binary uses.

use crate::{Error, Result};
use serde::Deserialize;
use splitroute_types::{AppMetadata, IconHandle, PackageRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Source of raw package records and their display metadata.
///
/// Both calls may be slow and run on the blocking pool.
pub trait CandidateProvider: Send + Sync {
    /// Enumerate every installed package
    ///
    /// # Errors
    ///
    /// Returns an error if the package list cannot be obtained at all.
    fn enumerate(&self) -> Result<Vec<PackageRecord>>;

    /// Resolve label and icon for one package
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata for `id` cannot be loaded.
    fn resolve_metadata(&self, id: &str) -> Result<AppMetadata>;
}

/// One package in the inventory file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryEntry {
    #[serde(flatten)]
    record: PackageRecord,

    #[serde(default)]
    label: Option<String>,

    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    packages: Vec<InventoryEntry>,
}

/// Provider backed by a JSON inventory:
///
/// ```json
/// {"packages": [{"id": "org.example", "label": "Example", "flags": {"requestsNetwork": true}}]}
/// ```
///
/// Entries without a label fail metadata resolution.
pub struct InventoryProvider {
    path: PathBuf,
    /// Entries from the most recent `enumerate`, used to answer `resolve_metadata`
    entries: Mutex<HashMap<String, InventoryEntry>>,
}

impl InventoryProvider {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl CandidateProvider for InventoryProvider {
    fn enumerate(&self) -> Result<Vec<PackageRecord>> {
        let content = std::fs::read_to_string(&self.path)?;
        let inventory: InventoryFile = serde_json::from_str(&content)?;
        debug!(
            "Read {} packages from {}",
            inventory.packages.len(),
            self.path.display()
        );

        let records = inventory
            .packages
            .iter()
            .map(|entry| entry.record.clone())
            .collect();

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Provider("Inventory cache poisoned".to_string()))?;
        *entries = inventory
            .packages
            .into_iter()
            .map(|entry| (entry.record.id.clone(), entry))
            .collect();

        Ok(records)
    }

    fn resolve_metadata(&self, id: &str) -> Result<AppMetadata> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Provider("Inventory cache poisoned".to_string()))?;
        let entry = entries
            .get(id)
            .ok_or_else(|| Error::Provider(format!("Unknown package: {id}")))?;
        let label = entry
            .label
            .clone()
            .ok_or_else(|| Error::Provider(format!("No label for {id}")))?;

        Ok(AppMetadata {
            label,
            icon: entry
                .icon
                .clone()
                .map_or(IconHandle::Placeholder, IconHandle::Resolved),
        })
    }
}
