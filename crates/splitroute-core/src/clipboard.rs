//! Clipboard import and export of the selection as newline-delimited ids.

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Text channel shared with the outside world
pub trait Clipboard: Send + Sync {
    /// Current clipboard text, `None` when the clipboard is empty
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be read.
    fn read(&self) -> Result<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be written.
    fn write(&self, text: &str) -> Result<()>;
}

/// Serialize a selection, one id per line in sorted order
#[must_use]
pub fn export_text(selected: &BTreeSet<String>) -> String {
    selected
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse clipboard text into the ids it names that are in `universe`.
///
/// Lines are trimmed and blank lines dropped. Anything that is not a loaded
/// candidate simply fails the intersection.
pub fn parse_import<'a, I>(text: &str, universe: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let requested: BTreeSet<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    universe
        .into_iter()
        .filter(|id| requested.contains(id))
        .map(ToString::to_string)
        .collect()
}

/// In-process clipboard
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
}

impl MemoryClipboard {
    #[must_use]
    pub fn new(text: Option<String>) -> Self {
        Self {
            text: Mutex::new(text),
        }
    }
}

impl Clipboard for MemoryClipboard {
    fn read(&self) -> Result<Option<String>> {
        let text = self
            .text
            .lock()
            .map_err(|_| Error::Clipboard("Clipboard lock poisoned".to_string()))?;
        Ok(text.clone())
    }

    fn write(&self, text: &str) -> Result<()> {
        let mut slot = self
            .text
            .lock()
            .map_err(|_| Error::Clipboard("Clipboard lock poisoned".to_string()))?;
        *slot = Some(text.to_string());
        Ok(())
    }
}

/// Clipboard backed by a plain text file; a missing file is an empty clipboard
#[derive(Debug, Clone)]
pub struct FileClipboard {
    path: PathBuf,
}

impl FileClipboard {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Clipboard for FileClipboard {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Clipboard file {} does not exist", self.path.display());
                Ok(None)
            }
            Err(e) => Err(Error::Clipboard(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text).map_err(|e| {
            Error::Clipboard(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}
