use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Path fragments of platform-internal endpoints that are never offered as report sources.
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "coregroups",
    "coreuser",
    "datamesh",
    "logicmodule",
    "oauth",
    "organization",
    "partner",
];

/// A GET endpoint offered as a report data source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub display_name: String,
}

/// List the reportable endpoints of an OpenAPI document, in document order.
///
/// Only paths with a `get` operation are kept, and platform-internal paths (see
/// [`EXCLUDED_KEYWORDS`]) are dropped.
pub fn list_endpoints(openapi: &JsonValue) -> Vec<Endpoint> {
    let Some(paths) = openapi.get("paths").and_then(JsonValue::as_object) else {
        log::warn!("OpenAPI document has no paths object");
        return Vec::new();
    };

    paths
        .iter()
        .filter(|(_, item)| item.get("get").is_some())
        .filter(|(path, _)| !EXCLUDED_KEYWORDS.iter().any(|k| path.contains(k)))
        .map(|(path, _)| Endpoint {
            path: path.clone(),
            display_name: display_name(path),
        })
        .collect()
}

/// [`list_endpoints`] over the text of an OpenAPI document.
pub fn list_endpoints_from_str(openapi: &str) -> crate::Result<Vec<Endpoint>> {
    let document: JsonValue = serde_json::from_str(openapi)?;
    Ok(list_endpoints(&document))
}

/// Human-readable label for an endpoint path: the last path segment with underscores turned
/// into spaces, title-cased. Paths ending in `/` fall back to the path itself.
pub fn display_name(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or_default();
    if last.is_empty() {
        return path.to_string();
    }
    title_case(&last.replace('_', " "))
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
