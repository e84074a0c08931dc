//! List builder: turns raw package records into the ordered candidate list.

use crate::provider::CandidateProvider;
use splitroute_types::{AppMetadata, CandidateApp, IconHandle, PackageRecord, SortKey, SortOptions};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, error, warn};

/// Build the candidate list for display.
///
/// Never fails: an enumeration failure yields an empty list and a metadata
/// failure for one package falls back to its identifier and a placeholder icon.
pub fn build_list(
    provider: &dyn CandidateProvider,
    host_id: Option<&str>,
    selected: &BTreeSet<String>,
    options: SortOptions,
) -> Vec<CandidateApp> {
    let records = match provider.enumerate() {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to enumerate installed packages: {e}");
            return Vec::new();
        }
    };

    let total = records.len();
    let mut apps: Vec<CandidateApp> = records
        .into_iter()
        .filter(|record| is_listed(record, host_id, options.include_system))
        .map(|record| resolve(provider, record))
        .collect();

    sort_apps(&mut apps, selected, options);

    debug!(
        "Built candidate list: {} of {} packages (sort={}, reverse={}, system={})",
        apps.len(),
        total,
        options.key,
        options.reverse,
        options.include_system
    );
    apps
}

/// Visibility rules for a raw record
#[must_use]
pub fn is_listed(record: &PackageRecord, host_id: Option<&str>, include_system: bool) -> bool {
    if host_id == Some(record.id.as_str()) || !record.has_app_info {
        return false;
    }

    // Only network-capable or system-critical packages matter for routing
    if !record.flags.requests_network && !record.flags.privileged_uid {
        return false;
    }

    include_system || !record.flags.system_component
}

fn resolve(provider: &dyn CandidateProvider, record: PackageRecord) -> CandidateApp {
    let metadata = provider.resolve_metadata(&record.id).unwrap_or_else(|e| {
        warn!(
            "Failed to load app info for {}, using package name: {e}",
            record.id
        );
        AppMetadata {
            label: record.id.clone(),
            icon: IconHandle::Placeholder,
        }
    });
    CandidateApp::from_record(record, metadata)
}

/// Sort in place with [`compare`]
pub fn sort_apps(apps: &mut [CandidateApp], selected: &BTreeSet<String>, options: SortOptions) {
    apps.sort_by(|a, b| compare(a, b, selected, options));
}

/// Selected entries first (never reversed), then the sort key (reversed on
/// request), then the identifier ascending so the order is total.
#[must_use]
pub fn compare(
    a: &CandidateApp,
    b: &CandidateApp,
    selected: &BTreeSet<String>,
    options: SortOptions,
) -> Ordering {
    let a_selected = selected.contains(&a.id);
    let b_selected = selected.contains(&b.id);

    b_selected
        .cmp(&a_selected)
        .then_with(|| {
            let ordering = compare_key(a, b, options.key);
            if options.reverse {
                ordering.reverse()
            } else {
                ordering
            }
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_key(a: &CandidateApp, b: &CandidateApp, key: SortKey) -> Ordering {
    match key {
        SortKey::Label => cmp_ignore_case(&a.label, &b.label),
        SortKey::PackageId => cmp_ignore_case(&a.id, &b.id),
        SortKey::InstallTime => a.install_time.cmp(&b.install_time),
        SortKey::UpdateTime => a.update_time.cmp(&b.update_time),
    }
}

/// Case-insensitive comparison by Unicode lowercase folding.
/// Independent of the process locale.
#[must_use]
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitroute_types::AppFlags;

    fn record(id: &str, flags: AppFlags) -> PackageRecord {
        PackageRecord {
            id: id.to_string(),
            install_time: 0,
            update_time: 0,
            flags,
            has_app_info: true,
        }
    }

    fn network() -> AppFlags {
        AppFlags {
            requests_network: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_host_is_excluded() {
        assert!(!is_listed(&record("org.host", network()), Some("org.host"), true));
        assert!(is_listed(&record("org.other", network()), Some("org.host"), true));
    }

    #[test]
    fn test_missing_app_info_is_excluded() {
        let mut r = record("org.lib", network());
        r.has_app_info = false;
        assert!(!is_listed(&r, None, true));
    }

    #[test]
    fn test_requires_network_or_privileged_uid() {
        assert!(!is_listed(&record("org.offline", AppFlags::default()), None, true));

        let privileged = AppFlags {
            privileged_uid: true,
            ..Default::default()
        };
        assert!(is_listed(&record("android.system", privileged), None, true));
    }

    #[test]
    fn test_system_components_hidden_unless_requested() {
        let flags = AppFlags {
            requests_network: true,
            system_component: true,
            privileged_uid: false,
        };
        assert!(!is_listed(&record("org.sys", flags), None, false));
        assert!(is_listed(&record("org.sys", flags), None, true));
    }

    #[test]
    fn test_cmp_ignore_case() {
        assert_eq!(cmp_ignore_case("apple", "Banana"), Ordering::Less);
        assert_eq!(cmp_ignore_case("APPLE", "apple"), Ordering::Equal);
        assert_eq!(cmp_ignore_case("Zeta", "alpha"), Ordering::Greater);
        assert_eq!(cmp_ignore_case("Ärger", "ärger"), Ordering::Equal);
    }
}
