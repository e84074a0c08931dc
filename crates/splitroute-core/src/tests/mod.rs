//! Test module for splitroute-core
//!
//! This module contains tests for:
//! - List building (visibility rules, selection-aware ordering, fallbacks)
//! - Session request handling (bulk edits, toggles, import/export, mode gating)
//! - Debounced search (coalescing, single flight, dismissal)
//! - Teardown (persistence, bounded service restart)
//! - Configuration and directories

// Test collaborators count calls with small integers
#![allow(clippy::cast_possible_truncation)]

mod config_tests;
