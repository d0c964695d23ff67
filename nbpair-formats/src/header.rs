//! YAML front matter holding notebook metadata.
//!
//! ```text
//! # ---                         ---
//! # jupyter:                    jupyter:
//! #   jupytext:                   jupytext:
//! #     formats: ipynb,py           formats: ipynb,md
//! # ---                         ---
//!     (scripts)                    (markdown)
//! ```

use serde_json::Value;

use nbpair_core::{Metadata, Notebook};

use crate::cells::{comment, is_blank, uncomment};
use crate::error::FormatError;

/// Notebook metadata keys copied into the header.
pub const HEADER_METADATA_KEYS: &[&str] = &["jupytext", "kernelspec"];

const ROOT_KEY: &str = "jupyter";

/// The part of the notebook metadata that text files carry.
pub fn header_metadata(nb: &Notebook) -> Metadata {
    nb.metadata
        .iter()
        .filter(|(key, _)| HEADER_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn fence(comment_token: Option<&str>) -> String {
    match comment_token {
        Some(token) => format!("{token} ---"),
        None => "---".to_string(),
    }
}

/// Header lines for `metadata`, or nothing when it is empty.
pub fn render_header(
    metadata: &Metadata,
    comment_token: Option<&str>,
) -> Result<Vec<String>, FormatError> {
    if metadata.is_empty() {
        return Ok(Vec::new());
    }
    let mut root = Metadata::new();
    root.insert(ROOT_KEY.to_string(), Value::Object(metadata.clone()));
    let yaml = serde_yaml::to_string(&Value::Object(root))?;

    let mut lines = vec![fence(comment_token)];
    lines.extend(yaml.lines().map(|line| match comment_token {
        Some(token) => comment(token, line),
        None => line.to_string(),
    }));
    lines.push(fence(comment_token));
    Ok(lines)
}

/// Parse a header at the top of `lines`.
///
/// Returns the metadata and the number of lines it spans, including one blank
/// separator line. A block whose only top-level key is not `jupyter` is not a
/// header and is left to the cell reader.
pub fn parse_header(
    lines: &[&str],
    comment_token: Option<&str>,
) -> Result<(Metadata, usize), FormatError> {
    let not_a_header = Ok((Metadata::new(), 0));
    let fence = fence(comment_token);
    if lines.first().map(|l| l.trim_end()) != Some(fence.as_str()) {
        return not_a_header;
    }
    let Some(close) = lines
        .iter()
        .skip(1)
        .position(|l| l.trim_end() == fence)
        .map(|i| i + 1)
    else {
        return not_a_header;
    };

    let mut body = Vec::with_capacity(close - 1);
    for &line in &lines[1..close] {
        match comment_token {
            Some(token) => match uncomment(token, line) {
                Some(text) => body.push(text),
                None => return not_a_header,
            },
            None => body.push(line),
        }
    }
    if !body.first().is_some_and(|l| l.starts_with(ROOT_KEY)) {
        return not_a_header;
    }

    let value: Value = serde_yaml::from_str(&body.join("\n"))?;
    let Value::Object(mut root) = value else {
        return not_a_header;
    };
    if root.len() != 1 {
        return not_a_header;
    }
    let metadata = match root.remove(ROOT_KEY) {
        Some(Value::Object(map)) => map,
        Some(Value::Null) => Metadata::new(),
        _ => return not_a_header,
    };

    let mut consumed = close + 1;
    if lines.get(consumed).is_some_and(|l| is_blank(l)) {
        consumed += 1;
    }
    Ok((metadata, consumed))
}
