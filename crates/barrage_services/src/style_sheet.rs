//! Style sheet loading
//!
//! Sheets are JSON documents of the form `{ "styles": [...] }`. Families are
//! expanded and validated at load time, so a sheet that loads cleanly
//! registers cleanly.

use crate::ServiceError;
use barrage_core::style::{StyleDescriptor, StyleError, StyleSheet};
use std::collections::HashSet;
use std::path::Path;

pub fn parse(text: &str, origin: &Path) -> Result<StyleSheet, ServiceError> {
    let sheet: StyleSheet = serde_json::from_str(text).map_err(|source| ServiceError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    check(&sheet)?;
    Ok(sheet)
}

pub fn load(path: impl AsRef<Path>) -> Result<StyleSheet, ServiceError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ServiceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sheet = parse(&text, path)?;
    tracing::debug!(path = %path.display(), entries = sheet.styles.len(), "loaded style sheet");
    Ok(sheet)
}

/// Expand and validate every entry, rejecting duplicate names.
fn check(sheet: &StyleSheet) -> Result<Vec<StyleDescriptor>, StyleError> {
    let styles = sheet.expand()?;
    let mut seen = HashSet::new();
    for style in &styles {
        style.validate()?;
        if !seen.insert(style.name.as_str()) {
            return Err(StyleError::DuplicateStyle {
                name: style.name.clone(),
            });
        }
    }
    Ok(styles)
}
