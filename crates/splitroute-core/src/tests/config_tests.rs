//! Tests for configuration and the file-backed collaborators it points at
//!
//! - Config parsing with partial and full documents
//! - Directories layout
//! - `JsonStore`, `InventoryProvider` and `FileClipboard` wired from one base

use crate::clipboard::{Clipboard, FileClipboard};
use crate::config::{Config, Directories};
use crate::provider::{CandidateProvider, InventoryProvider};
use crate::store::{JsonStore, PersistentStore, StoredState};
use splitroute_types::{FilterMode, SortKey};
use std::collections::BTreeSet;
use tempfile::TempDir;

#[test]
fn test_config_parse_minimal() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.search.debounce_ms, 200);
    assert_eq!(config.restart.max_polls, 50);
    assert!(config.service.status_command.is_none());
}

#[test]
fn test_config_parse_full() {
    let json = r#"{
        "search": {"debounceMs": 120},
        "restart": {"pollIntervalMs": 100, "maxPolls": 20, "commandTimeoutMs": 1000},
        "service": {
            "statusCommand": ["systemctl", "is-active", "--quiet", "tunnel"],
            "startCommand": ["systemctl", "start", "tunnel"],
            "stopCommand": ["systemctl", "stop", "tunnel"]
        },
        "hostPackage": "org.example.tunnel"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.search.debounce_ms, 120);
    assert!(config.service.is_configured());
    assert_eq!(
        config.service.status_command.as_deref().unwrap()[1],
        "is-active"
    );

    let policy = config.restart_policy();
    assert_eq!(policy.poll_interval.as_millis(), 100);
    assert_eq!(policy.max_polls, 20);
    assert_eq!(policy.call_timeout.as_millis(), 1000);
    assert_eq!(config.host_package.as_deref(), Some("org.example.tunnel"));
}

#[test]
fn test_directories_with_base() {
    let dir = TempDir::new().unwrap();
    let dirs = Directories::with_base(dir.path().join("nested"));

    dirs.ensure_exists().unwrap();

    assert!(dirs.config.exists());
    assert!(dirs.config_file.ends_with("config.json"));
    assert!(dirs.state_file.ends_with("access-control.json"));
    assert!(dirs.ui_state_file.ends_with("ui.json"));
    assert!(dirs.inventory_file.ends_with("inventory.json"));
    assert!(dirs.clipboard_file.ends_with("clipboard.txt"));
}

#[test]
fn test_collaborators_share_one_base() {
    let dir = TempDir::new().unwrap();
    let dirs = Directories::with_base(dir.path().to_path_buf());
    std::fs::write(
        &dirs.inventory_file,
        r#"{"packages": [{"id": "org.a", "label": "A", "flags": {"requestsNetwork": true}}]}"#,
    )
    .unwrap();

    let provider = InventoryProvider::new(&dirs.inventory_file);
    assert_eq!(provider.enumerate().unwrap().len(), 1);

    let store = JsonStore::new(dirs.state_file.clone(), dirs.ui_state_file.clone());
    let selected: BTreeSet<String> = ["org.a".to_string()].into();
    store.save_selection(&selected).unwrap();
    store.save_mode(FilterMode::AcceptSelected).unwrap();

    let state = StoredState::load(&store);
    assert_eq!(state.selected, selected);
    assert_eq!(state.mode, FilterMode::AcceptSelected);
    assert_eq!(state.sort.key, SortKey::Label);

    let clipboard = FileClipboard::new(dirs.clipboard_file.clone());
    clipboard.write("org.a").unwrap();
    assert!(dirs.clipboard_file.exists());
}

#[test]
fn test_ui_state_accepts_legacy_system_key() {
    let dir = TempDir::new().unwrap();
    let dirs = Directories::with_base(dir.path().to_path_buf());
    std::fs::write(
        &dirs.ui_state_file,
        r#"{"key": "update_time", "reverse": true, "systemApp": true}"#,
    )
    .unwrap();

    let store = JsonStore::new(dirs.state_file.clone(), dirs.ui_state_file.clone());
    let options = store.load_sort_options().unwrap();

    assert_eq!(options.key, SortKey::UpdateTime);
    assert!(options.reverse);
    assert!(options.include_system);
}
