//! Leading YAML front matter.
//!
//! ```text
//! ---
//! title: Ownership
//! aggregate: true
//! ---
//! # Body starts here
//! ```

use std::collections::BTreeMap;

use serde_yaml::Value as Yaml;

use crate::node::MetaValue;

/// Split `text` into (front matter YAML, body).
///
/// Returns `None` for the YAML part when the text has no front matter, and
/// `Err` with a message when an opening `---` is never closed.
pub(crate) fn split(text: &str) -> Result<(Option<&str>, &str), String> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((None, text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            return Ok((Some(&rest[..offset]), &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err("front matter opened with `---` is never closed".to_owned())
}

/// Body of a document with any front matter removed.
pub(crate) fn strip(text: &str) -> &str {
    match split(text) {
        Ok((_, body)) => body,
        Err(_) => text,
    }
}

/// Parse front matter YAML into scalar metadata.
///
/// Non-scalar values are skipped with a warning.
pub(crate) fn parse(yaml: &str) -> Result<BTreeMap<String, MetaValue>, String> {
    let mut metadata = BTreeMap::new();
    if yaml.trim().is_empty() {
        return Ok(metadata);
    }

    let mapping = match serde_yaml::from_str::<Yaml>(yaml) {
        Ok(Yaml::Mapping(mapping)) => mapping,
        Ok(Yaml::Null) => return Ok(metadata),
        Ok(_) => return Err("front matter must be a mapping".to_owned()),
        Err(e) => return Err(format!("invalid front matter: {e}")),
    };

    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_owned) else {
            tracing::warn!(?key, "Skipping non-string front matter key");
            continue;
        };
        let value = match value {
            Yaml::String(s) => MetaValue::String(s),
            Yaml::Bool(b) => MetaValue::Bool(b),
            Yaml::Number(n) => match n.as_f64() {
                Some(n) => MetaValue::Number(n),
                None => continue,
            },
            other => {
                tracing::warn!(
                    key = %key,
                    kind = yaml_kind(&other),
                    "Skipping non-scalar front matter value"
                );
                continue;
            }
        };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn yaml_kind(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged",
        Yaml::Bool(_) | Yaml::Number(_) | Yaml::String(_) => "scalar",
    }
}
