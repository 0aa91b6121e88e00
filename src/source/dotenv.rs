//! # Dotenv Codec
//!
//! Reads and writes `KEY=VALUE` env files.
//!
//! - Blank lines and `#` comments are ignored on read and preserved on upsert.
//! - Surrounding single or double quotes are stripped on read. Inside double
//!   quotes the escapes `\\`, `\"` and `\n` are decoded.
//! - Values are quoted on write only when they are empty or contain whitespace,
//!   quotes, a backslash or `$`. Writing then reading a value returns it unchanged.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Characters that force a value to be written in double quotes
const QUOTE_TRIGGERS: &[char] = &[' ', '\t', '\n', '\r', '"', '\'', '\\', '$'];

/// Parse env file content into name -> value. Later duplicates win.
#[must_use]
pub fn parse_env(content: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            values.insert(key.to_string(), unquote(value.trim()));
        }
    }

    values
}

/// Key of a `KEY=VALUE` line, or `None` for comments, blanks and malformed lines
#[must_use]
pub fn line_key(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    trimmed
        .split_once('=')
        .map(|(key, _)| key.trim())
        .filter(|key| !key.is_empty())
}

/// Strip one layer of matching quotes, decoding escapes inside double quotes
#[must_use]
pub fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if value.starts_with('"') && value.ends_with('"') {
            return unescape(&value[1..value.len() - 1]);
        }
        if value.starts_with('\'') && value.ends_with('\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Double-quote and escape `value` when it would not survive a bare write
#[must_use]
pub fn quote_if_needed(value: &str) -> String {
    if !value.is_empty() && !value.contains(QUOTE_TRIGGERS) {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

#[must_use]
pub fn format_line(key: &str, value: &str) -> String {
    format!("{key}={}", quote_if_needed(value))
}

/// Replace the lines for keys in `updates` and append the rest in name order.
/// Unrelated lines and comments are kept as they are.
#[must_use]
pub fn upsert_lines(content: &str, updates: &BTreeMap<String, String>) -> String {
    let mut written: Vec<&str> = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    for line in content.lines() {
        match line_key(line).and_then(|key| updates.get_key_value(key)) {
            Some((key, value)) if !written.contains(&key.as_str()) => {
                lines.push(format_line(key, value));
                written.push(key.as_str());
            }
            // Duplicate line for a key that was already rewritten
            Some(_) => {}
            None => lines.push(line.to_string()),
        }
    }

    for (key, value) in updates {
        if !written.contains(&key.as_str()) {
            lines.push(format_line(key, value));
        }
    }

    join_lines(&lines)
}

/// Drop every line for `name`. Returns the new content and whether anything was removed.
#[must_use]
pub fn remove_lines(content: &str, name: &str) -> (String, bool) {
    let mut removed = false;
    let lines: Vec<String> = content
        .lines()
        .filter(|line| {
            let matches = line_key(line) == Some(name);
            removed |= matches;
            !matches
        })
        .map(str::to_string)
        .collect();
    (join_lines(&lines), removed)
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

/// Read and parse an env file
pub async fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    Ok(parse_env(&content))
}

/// Raw content of an env file, empty when the file does not exist
pub async fn read_or_empty(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read: {}", path.display())),
    }
}

/// Write `values` as a fresh env file, one line per key in name order
pub async fn write_env_file(path: &Path, values: &BTreeMap<String, String>) -> Result<()> {
    let lines: Vec<String> = values.iter().map(|(k, v)| format_line(k, v)).collect();
    write_content(path, &join_lines(&lines)).await?;
    debug!(path = %path.display(), count = values.len(), "Wrote env file");
    Ok(())
}

/// Merge `updates` into an env file, creating it when missing
pub async fn upsert_env_file(path: &Path, updates: &BTreeMap<String, String>) -> Result<()> {
    let existing = read_or_empty(path).await?;
    write_content(path, &upsert_lines(&existing, updates)).await?;
    debug!(path = %path.display(), count = updates.len(), "Updated env file");
    Ok(())
}

/// Remove `name` from an env file. A missing file or key is not an error.
pub async fn remove_from_env_file(path: &Path, name: &str) -> Result<bool> {
    let existing = read_or_empty(path).await?;
    let (content, removed) = remove_lines(&existing, name);
    if removed {
        write_content(path, &content).await?;
    }
    Ok(removed)
}

async fn write_content(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write: {}", path.display()))
}
