//! Shared types for splitroute components.
//!
//! This crate provides the data model used by splitroute-core and the
//! `splitroute` binary: candidate applications, filter modes, sort options,
//! the request vocabulary consumed by a session, and the updates it emits.
//! All types are serializable so a UI can live in another process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color used for the placeholder icon when an application icon cannot be loaded
pub const PLACEHOLDER_ICON_COLOR: &str = "#757575";

/// Capability flags reported by the candidate provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppFlags {
    /// Package declares the network permission
    #[serde(default)]
    pub requests_network: bool,

    /// Package is part of the system image
    #[serde(default)]
    pub system_component: bool,

    /// Package runs under a uid below the first application uid
    #[serde(default)]
    pub privileged_uid: bool,
}

/// Opaque icon handle owned by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IconHandle {
    /// Provider-specific reference (icon name, path, resource id)
    Resolved(String),

    /// Flat placeholder drawn in [`PLACEHOLDER_ICON_COLOR`]
    #[default]
    Placeholder,
}

impl IconHandle {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, IconHandle::Placeholder)
    }
}

/// Raw package record as enumerated by the provider, before metadata resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub id: String,

    #[serde(default)]
    pub install_time: u64,

    #[serde(default)]
    pub update_time: u64,

    #[serde(default)]
    pub flags: AppFlags,

    /// Whether basic application metadata exists for this package.
    /// Records without it (shared libraries, overlays) are never listed.
    #[serde(default = "default_true")]
    pub has_app_info: bool,
}

fn default_true() -> bool {
    true
}

/// Per-item metadata resolved lazily by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub label: String,
    #[serde(default)]
    pub icon: IconHandle,
}

/// An installed application eligible for access-control listing.
///
/// Immutable once produced for a given load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateApp {
    /// Package identifier, unique and stable across load cycles
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: IconHandle,
    pub install_time: u64,
    pub update_time: u64,
    #[serde(default)]
    pub flags: AppFlags,
}

impl CandidateApp {
    /// Combine an enumerated record with its resolved metadata
    #[must_use]
    pub fn from_record(record: PackageRecord, metadata: AppMetadata) -> Self {
        Self {
            id: record.id,
            label: metadata.label,
            icon: metadata.icon,
            install_time: record.install_time,
            update_time: record.update_time,
            flags: record.flags,
        }
    }
}

/// Access-control policy applied by the tunnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Every application uses the tunnel; the selection is inert
    #[default]
    AcceptAll,
    /// Only selected applications use the tunnel
    AcceptSelected,
    /// Selected applications bypass the tunnel
    DenySelected,
}

impl FilterMode {
    /// Whether the selection can be edited under this mode
    #[must_use]
    pub fn can_select(self) -> bool {
        self != FilterMode::AcceptAll
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::AcceptAll => "accept_all",
            FilterMode::AcceptSelected => "accept_selected",
            FilterMode::DenySelected => "deny_selected",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accept_all" | "all" => Ok(FilterMode::AcceptAll),
            "accept_selected" | "allow" => Ok(FilterMode::AcceptSelected),
            "deny_selected" | "deny" => Ok(FilterMode::DenySelected),
            other => Err(format!("Unknown filter mode: {other}")),
        }
    }
}

/// Secondary sort key for the candidate list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Label,
    PackageId,
    InstallTime,
    UpdateTime,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Label => "label",
            SortKey::PackageId => "package_id",
            SortKey::InstallTime => "install_time",
            SortKey::UpdateTime => "update_time",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "label" | "name" => Ok(SortKey::Label),
            "package_id" | "package" | "id" => Ok(SortKey::PackageId),
            "install_time" | "installed" => Ok(SortKey::InstallTime),
            "update_time" | "updated" => Ok(SortKey::UpdateTime),
            other => Err(format!("Unknown sort key: {other}")),
        }
    }
}

/// Sort and visibility options, persisted across sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOptions {
    #[serde(default)]
    pub key: SortKey,

    /// Reverse the secondary key only; selected entries always come first
    #[serde(default)]
    pub reverse: bool,

    /// List packages flagged as system components
    #[serde(default, alias = "systemApp")]
    pub include_system: bool,
}

/// Discrete user requests consumed by a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Rebuild the candidate list and patch the display
    Reload,
    SelectAll,
    SelectNone,
    SelectInvert,
    /// Replace the selection with identifiers read from the clipboard
    Import,
    /// Write the selection to the clipboard
    Export,
    ChangeMode { mode: FilterMode },
    ToggleItem { id: String },
    /// Keyword typed into the search view (opens it if needed)
    SearchKeyword { keyword: String },
    /// Search view dismissed
    DismissSearch,
    SetSortKey { key: SortKey },
    SetReverse { reverse: bool },
    SetIncludeSystem { include: bool },
}

impl Request {
    /// Whether this request edits the selection and is therefore
    /// suppressed while the mode is [`FilterMode::AcceptAll`]
    #[must_use]
    pub fn edits_selection(&self) -> bool {
        matches!(
            self,
            Request::SelectAll
                | Request::SelectNone
                | Request::SelectInvert
                | Request::Import
                | Request::ToggleItem { .. }
                | Request::SearchKeyword { .. }
        )
    }
}

/// One step of a keyed patch between two ordered lists.
///
/// Ops are applied in order; every index refers to the list as it is
/// after the previous op. `Move` removes at `from` and then inserts at `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    Remove { index: usize, id: String },
    Insert { index: usize, id: String },
    Move { from: usize, to: usize, id: String },
    /// Same key, different contents; rebind the row in place
    Change { index: usize, id: String },
}

/// Selection-dependent visual state of a displayed row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowState {
    pub id: String,
    pub selected: bool,
}

/// Updates emitted by a session for the UI to apply on its own thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Main list reconciled against a freshly built list
    ListPatched {
        ops: Vec<PatchOp>,
        apps: Vec<CandidateApp>,
    },

    /// Every displayed row re-evaluated; order and membership unchanged
    RowsRebound { rows: Vec<RowState> },

    /// Single row flipped by a toggle; `index` is its position in the main list
    RowToggled {
        index: usize,
        id: String,
        selected: bool,
    },

    /// Visible counter and whether selection editing is enabled
    SelectedCount { count: usize, can_select: bool },

    /// Search result list reconciled
    SearchPatched {
        keyword: String,
        ops: Vec<PatchOp>,
        rows: Vec<RowState>,
    },

    /// Search view closed
    SearchClosed,

    /// Selection written to the clipboard
    Exported { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> PackageRecord {
        PackageRecord {
            id: id.to_string(),
            install_time: 10,
            update_time: 20,
            flags: AppFlags {
                requests_network: true,
                ..Default::default()
            },
            has_app_info: true,
        }
    }

    #[test]
    fn filter_mode_can_select() {
        assert!(!FilterMode::AcceptAll.can_select());
        assert!(FilterMode::AcceptSelected.can_select());
        assert!(FilterMode::DenySelected.can_select());
    }

    #[test]
    fn filter_mode_default_is_accept_all() {
        assert_eq!(FilterMode::default(), FilterMode::AcceptAll);
    }

    #[test]
    fn filter_mode_parse() {
        assert_eq!("accept-selected".parse(), Ok(FilterMode::AcceptSelected));
        assert_eq!("DENY".parse(), Ok(FilterMode::DenySelected));
        assert_eq!("all".parse(), Ok(FilterMode::AcceptAll));
        assert!("bogus".parse::<FilterMode>().is_err());
    }

    #[test]
    fn filter_mode_serializes_snake_case() {
        let value = serde_json::to_value(FilterMode::DenySelected).unwrap();
        assert_eq!(value, json!("deny_selected"));
    }

    #[test]
    fn sort_key_parse_and_display() {
        assert_eq!("install-time".parse(), Ok(SortKey::InstallTime));
        assert_eq!("package".parse(), Ok(SortKey::PackageId));
        assert_eq!(SortKey::UpdateTime.to_string(), "update_time");
        assert!("size".parse::<SortKey>().is_err());
    }

    #[test]
    fn sort_options_default() {
        let options = SortOptions::default();
        assert_eq!(options.key, SortKey::Label);
        assert!(!options.reverse);
        assert!(!options.include_system);
    }

    #[test]
    fn sort_options_accepts_legacy_system_app_key() {
        let options: SortOptions =
            serde_json::from_value(json!({"key": "update_time", "systemApp": true})).unwrap();
        assert_eq!(options.key, SortKey::UpdateTime);
        assert!(options.include_system);
        assert!(!options.reverse);
    }

    #[test]
    fn package_record_defaults_app_info_to_present() {
        let record: PackageRecord = serde_json::from_value(json!({"id": "org.example"})).unwrap();
        assert!(record.has_app_info);
        assert_eq!(record.flags, AppFlags::default());
    }

    #[test]
    fn candidate_from_record_keeps_timestamps() {
        let app = CandidateApp::from_record(
            record("org.example"),
            AppMetadata {
                label: "Example".to_string(),
                icon: IconHandle::Resolved("example".to_string()),
            },
        );
        assert_eq!(app.id, "org.example");
        assert_eq!(app.label, "Example");
        assert_eq!(app.install_time, 10);
        assert_eq!(app.update_time, 20);
        assert!(app.flags.requests_network);
    }

    #[test]
    fn icon_handle_wire_format() {
        let resolved = serde_json::to_value(IconHandle::Resolved("a".to_string())).unwrap();
        assert_eq!(resolved, json!({"type": "resolved", "value": "a"}));
        let placeholder = serde_json::to_value(IconHandle::Placeholder).unwrap();
        assert_eq!(placeholder, json!({"type": "placeholder"}));
        assert!(IconHandle::default().is_placeholder());
    }

    #[test]
    fn request_edits_selection() {
        assert!(Request::SelectAll.edits_selection());
        assert!(Request::Import.edits_selection());
        assert!(
            Request::ToggleItem {
                id: "a".to_string()
            }
            .edits_selection()
        );
        assert!(!Request::Reload.edits_selection());
        assert!(!Request::Export.edits_selection());
        assert!(
            !Request::ChangeMode {
                mode: FilterMode::AcceptAll
            }
            .edits_selection()
        );
        assert!(!Request::DismissSearch.edits_selection());
    }

    #[test]
    fn request_wire_format() {
        let request: Request =
            serde_json::from_value(json!({"type": "change_mode", "mode": "deny_selected"}))
                .unwrap();
        assert_eq!(
            request,
            Request::ChangeMode {
                mode: FilterMode::DenySelected
            }
        );
    }

    #[test]
    fn patch_op_wire_format() {
        let op = PatchOp::Move {
            from: 3,
            to: 0,
            id: "a".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "move", "from": 3, "to": 0, "id": "a"})
        );
    }

    #[test]
    fn row_toggled_carries_main_list_index() {
        let update = SessionUpdate::RowToggled {
            index: 2,
            id: "a".to_string(),
            selected: true,
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"type": "row_toggled", "index": 2, "id": "a", "selected": true})
        );
    }
}
