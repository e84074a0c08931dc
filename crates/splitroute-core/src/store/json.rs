use super::PersistentStore;
use crate::Result;
use crate::config::{KnownKeys, warn_unknown_keys};
use serde::{Deserialize, Serialize};
use splitroute_types::{FilterMode, SortOptions};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Selection and mode as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessControlState {
    #[serde(default)]
    packages: BTreeSet<String>,

    #[serde(default)]
    mode: FilterMode,
}

/// Store backed by two JSON files: `access-control.json` for the selection
/// and mode, `ui.json` for the sort options.
///
/// Missing files read as defaults. Writes go through a temp file and a rename
/// so a crash mid-write never leaves a truncated file behind.
pub struct JsonStore {
    state_file: PathBuf,
    ui_state_file: PathBuf,
}

impl JsonStore {
    #[must_use]
    pub fn new(state_file: PathBuf, ui_state_file: PathBuf) -> Self {
        Self {
            state_file,
            ui_state_file,
        }
    }

    fn read_state(&self) -> Result<AccessControlState> {
        if !self.state_file.exists() {
            debug!("No saved state at {}", self.state_file.display());
            return Ok(AccessControlState::default());
        }
        let content = std::fs::read_to_string(&self.state_file)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read-modify-write of the state file. An unreadable file is replaced.
    fn update_state(&self, update: impl FnOnce(&mut AccessControlState)) -> Result<()> {
        let mut state = self.read_state().unwrap_or_else(|e| {
            warn!(
                "Replacing unreadable state file {}: {e}",
                self.state_file.display()
            );
            AccessControlState::default()
        });
        update(&mut state);
        write_atomic(&self.state_file, &serde_json::to_string_pretty(&state)?)
    }
}

impl PersistentStore for JsonStore {
    fn load_selection(&self) -> Result<BTreeSet<String>> {
        Ok(self.read_state()?.packages)
    }

    fn load_mode(&self) -> Result<FilterMode> {
        Ok(self.read_state()?.mode)
    }

    fn load_sort_options(&self) -> Result<SortOptions> {
        if !self.ui_state_file.exists() {
            return Ok(SortOptions::default());
        }
        let content = std::fs::read_to_string(&self.ui_state_file)?;
        warn_unknown_keys(&content, "ui.json", KnownKeys::UiState);
        Ok(serde_json::from_str(&content)?)
    }

    fn save_selection(&self, selected: &BTreeSet<String>) -> Result<()> {
        self.update_state(|state| state.packages.clone_from(selected))?;
        debug!("Saved {} selected packages", selected.len());
        Ok(())
    }

    fn save_mode(&self, mode: FilterMode) -> Result<()> {
        self.update_state(|state| state.mode = mode)
    }

    fn save_sort_options(&self, options: SortOptions) -> Result<()> {
        write_atomic(&self.ui_state_file, &serde_json::to_string_pretty(&options)?)
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
