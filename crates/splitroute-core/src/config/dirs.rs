use crate::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Application directories under the XDG base directories
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/splitroute)
    pub config: PathBuf,

    /// Data directory (~/.local/share/splitroute)
    pub data: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Persisted access-control state (selection and mode)
    pub state_file: PathBuf,

    /// Persisted sort/visibility options
    pub ui_state_file: PathBuf,

    /// Package inventory consumed by the file-backed provider
    pub inventory_file: PathBuf,

    /// Plain-text clipboard used when no system clipboard is wired
    pub clipboard_file: PathBuf,
}

impl Directories {
    /// Create a new `Directories` instance with standard XDG paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the system's project directories cannot be determined
    /// (no home directory).
    pub fn new() -> Result<Self> {
        let project = ProjectDirs::from("", "", "splitroute")
            .ok_or_else(|| Error::Config("Failed to determine project directories".to_string()))?;

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();

        Ok(Self {
            config_file: config.join("config.json"),
            state_file: data.join("access-control.json"),
            ui_state_file: config.join("ui.json"),
            inventory_file: data.join("inventory.json"),
            clipboard_file: data.join("clipboard.txt"),
            config,
            data,
        })
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            state_file: base.join("access-control.json"),
            ui_state_file: base.join("ui.json"),
            inventory_file: base.join("inventory.json"),
            clipboard_file: base.join("clipboard.txt"),
            config: base.clone(),
            data: base,
        }
    }

    /// Ensure all directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config)?;
        std::fs::create_dir_all(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_sets_all_paths() {
        let base = PathBuf::from("/tmp/test-splitroute");
        let dirs = Directories::with_base(base.clone());

        assert_eq!(dirs.config, base);
        assert_eq!(dirs.data, base);
        assert_eq!(dirs.config_file, base.join("config.json"));
        assert_eq!(dirs.state_file, base.join("access-control.json"));
        assert_eq!(dirs.ui_state_file, base.join("ui.json"));
        assert_eq!(dirs.inventory_file, base.join("inventory.json"));
        assert_eq!(dirs.clipboard_file, base.join("clipboard.txt"));
    }

    #[test]
    fn test_ensure_exists_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = temp_dir.path().join("splitroute-test-subdir");
        let dirs = Directories::with_base(base.clone());

        assert!(!base.exists());

        dirs.ensure_exists().unwrap();

        assert!(dirs.config.exists());
        assert!(dirs.data.exists());
    }

    #[test]
    fn test_ensure_exists_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dirs = Directories::with_base(temp_dir.path().to_path_buf());

        dirs.ensure_exists().unwrap();
        dirs.ensure_exists().unwrap();

        assert!(dirs.config.exists());
    }

    #[test]
    fn test_new_returns_valid_xdg_paths() {
        let Ok(dirs) = Directories::new() else {
            // No home directory in this environment
            return;
        };

        assert!(dirs.config.to_string_lossy().contains("splitroute"));
        assert!(dirs.data.to_string_lossy().contains("splitroute"));
        assert!(dirs.config_file.to_string_lossy().ends_with("config.json"));
        assert!(
            dirs.state_file
                .to_string_lossy()
                .ends_with("access-control.json")
        );
    }
}
