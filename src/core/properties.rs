// src/core/properties.rs

//! Reader/writer for the flat `key=value` files backing every leaf definition.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A flat, key-sorted property map.
pub type Properties = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum PropertiesError {
    /// The file could not be read or written.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid UTF-8.
    #[error("File is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    /// A non-comment line has no `=` separator.
    #[error("Malformed line {line}: '{content}'")]
    MalformedLine {
        /// One-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// A key is empty or contains characters that cannot be stored.
    #[error("Invalid key '{0}'")]
    InvalidKey(String),
    /// The content does not fit the typed definition.
    #[error("Cannot map definition content: {0}")]
    Mapping(#[from] serde_json::Error),
}

/// Reads a property file.
pub fn load(path: &Path) -> Result<Properties, PropertiesError> {
    let bytes = fs::read(path)?;
    parse(&String::from_utf8(bytes)?)
}

/// Parses property text. Blank lines and lines starting with `#` or `!` are skipped.
pub fn parse(text: &str) -> Result<Properties, PropertiesError> {
    let mut props = Properties::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| PropertiesError::MalformedLine {
                line: i + 1,
                content: raw.to_string(),
            })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PropertiesError::MalformedLine {
                line: i + 1,
                content: raw.to_string(),
            });
        }
        props.insert(key.to_string(), unescape(value.trim_start()));
    }
    Ok(props)
}

/// Writes `props` to `path` under a single-line `header` comment.
pub fn store(props: &Properties, header: &str, path: &Path) -> Result<(), PropertiesError> {
    fs::write(path, render(props, header)?)?;
    Ok(())
}

fn render(props: &Properties, header: &str) -> Result<String, PropertiesError> {
    let mut out = String::with_capacity(64 + props.len() * 32);
    out.push_str("# ");
    out.push_str(header);
    out.push('\n');
    for (key, value) in props {
        if key.is_empty() || key.contains(['=', '\n', '\r']) || key.starts_with(['#', '!']) {
            return Err(PropertiesError::InvalidKey(key.clone()));
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&escape(value));
        out.push('\n');
    }
    Ok(out)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            // Leading blanks would otherwise be eaten by `parse`.
            ' ' if i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
