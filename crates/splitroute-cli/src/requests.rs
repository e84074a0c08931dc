//! Text form of session requests.
//!
//! One request per line: a verb and an optional argument separated by
//! whitespace (`toggle org.example.app`, `mode deny`), or a JSON object in
//! the wire format (`{"type": "select_all"}`).

use anyhow::{Context, Result, bail};
use splitroute_types::{FilterMode, Request, SortKey};

pub fn parse_request(line: &str) -> Result<Request> {
    let line = line.trim();
    if line.starts_with('{') {
        return serde_json::from_str(line).with_context(|| format!("Invalid request: {line}"));
    }

    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };

    let request = match verb.to_ascii_lowercase().as_str() {
        "reload" => Request::Reload,
        "all" | "select-all" => Request::SelectAll,
        "none" | "select-none" => Request::SelectNone,
        "invert" | "select-invert" => Request::SelectInvert,
        "import" => Request::Import,
        "export" => Request::Export,
        "dismiss" => Request::DismissSearch,
        "mode" => Request::ChangeMode {
            mode: required(verb, arg)?
                .parse::<FilterMode>()
                .map_err(anyhow::Error::msg)?,
        },
        "toggle" => Request::ToggleItem {
            id: required(verb, arg)?.to_string(),
        },
        "search" => Request::SearchKeyword {
            keyword: arg.to_string(),
        },
        "sort" => Request::SetSortKey {
            key: required(verb, arg)?
                .parse::<SortKey>()
                .map_err(anyhow::Error::msg)?,
        },
        "reverse" => Request::SetReverse {
            reverse: parse_flag(verb, arg)?,
        },
        "system" => Request::SetIncludeSystem {
            include: parse_flag(verb, arg)?,
        },
        "" => bail!("Empty request"),
        other => bail!("Unknown request: {other}"),
    };
    Ok(request)
}

fn required<'a>(verb: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        bail!("'{verb}' needs an argument");
    }
    Ok(arg)
}

/// A missing argument means "on"
fn parse_flag(verb: &str, arg: &str) -> Result<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "" | "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => bail!("'{verb}' expects on/off, got '{other}'"),
    }
}
