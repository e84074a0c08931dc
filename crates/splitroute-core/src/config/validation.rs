//! Unknown-key warnings for the JSON files we read

use serde_json::{Map, Value};
use tracing::warn;

/// Files whose keys are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownKeys {
    /// config.json
    Config,
    /// ui.json, the stored sort options
    UiState,
}

impl KnownKeys {
    fn section(self) -> &'static Section {
        match self {
            Self::Config => &CONFIG,
            Self::UiState => &UI_STATE,
        }
    }
}

/// Log a warning for every key in `content` that `schema` does not know.
/// Content that is not JSON is left to the real parser to report.
pub fn warn_unknown_keys(content: &str, file_name: &str, schema: KnownKeys) {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return;
    };

    for path in unknown_keys(&value, schema.section()) {
        warn!("Unknown field in {file_name}: {path}");
    }
}

/// Leaf keys plus named subsections of one JSON object
struct Section {
    fields: &'static [&'static str],
    nested: &'static [(&'static str, Section)],
}

impl Section {
    const fn leaf(fields: &'static [&'static str]) -> Self {
        Self { fields, nested: &[] }
    }

    fn child(&self, key: &str) -> Option<&Section> {
        self.nested
            .iter()
            .find_map(|(name, section)| (*name == key).then_some(section))
    }
}

static CONFIG: Section = Section {
    fields: &["hostPackage"],
    nested: &[
        ("search", Section::leaf(&["debounceMs"])),
        (
            "restart",
            Section::leaf(&["pollIntervalMs", "maxPolls", "commandTimeoutMs"]),
        ),
        (
            "service",
            Section::leaf(&["statusCommand", "startCommand", "stopCommand"]),
        ),
    ],
};

static UI_STATE: Section = Section::leaf(&["key", "reverse", "includeSystem", "systemApp"]);

/// Dotted paths of unknown keys, e.g. "restart.maxPoll"
fn unknown_keys(value: &Value, section: &Section) -> Vec<String> {
    let mut found = Vec::new();
    if let Value::Object(object) = value {
        collect(object, section, None, &mut found);
    }
    found
}

fn collect(
    object: &Map<String, Value>,
    section: &Section,
    prefix: Option<&str>,
    found: &mut Vec<String>,
) {
    for (key, child) in object {
        let path = prefix.map_or_else(|| key.clone(), |prefix| format!("{prefix}.{key}"));

        match section.child(key) {
            Some(nested) => {
                if let Value::Object(inner) = child {
                    collect(inner, nested, Some(&path), found);
                }
            }
            None if !section.fields.contains(&key.as_str()) => found.push(path),
            None => {}
        }
    }
}
