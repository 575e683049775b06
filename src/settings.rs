// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Key extraction from the watched settings file
//!
//! The file is never parsed as a whole. Each line is trimmed and matched
//! against the quoted key names, and values are cut out of the line text.
//! This keeps working on JSON-with-comments files that a strict parser rejects.

use tracing::debug;

use crate::config::KeyConfig;
use crate::{BlurwatchError, Result};

/// Values found in the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub blur_enabled: bool,
    pub blur_radius: u32,
    pub background_image: Option<ImageRef>,
}

/// The background image value and the line it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: String,
    /// Zero-based index into the `\n`-split lines
    pub line: usize,
}

/// Scan settings text line by line
///
/// Later radius and image lines override earlier ones. The enable flag is
/// only ever switched on.
pub fn scan(text: &str, keys: &KeyConfig) -> Result<Settings> {
    let enable_key = quoted(&keys.enable);
    let radius_key = quoted(&keys.radius);
    let image_key = quoted(&keys.image);

    let mut settings = Settings::default();

    for (index, line) in text.split('\n').enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with(&enable_key) && line.contains("true") {
            settings.blur_enabled = true;
        } else if let Some(rest) = trimmed.strip_prefix(&radius_key) {
            let raw = value_of(rest).ok_or_else(|| BlurwatchError::Settings {
                line: index + 1,
                message: format!("missing value for {}", radius_key),
            })?;
            debug!("Radius value: {}", raw);
            settings.blur_radius = raw.parse().map_err(|e| BlurwatchError::Settings {
                line: index + 1,
                message: format!("invalid radius {:?}: {}", raw, e),
            })?;
        } else if let Some(rest) = trimmed.strip_prefix(&image_key) {
            let raw = value_of(rest).unwrap_or_default();
            let path = unquote(raw);
            debug!("Image value: {}", path);
            settings.background_image = if path.is_empty() {
                None
            } else {
                Some(ImageRef { path: path.to_string(), line: index })
            };
        }
    }

    Ok(settings)
}

fn quoted(key: &str) -> String {
    format!("\"{}\"", key)
}

/// Value text after the key: skips the colon, stops at the closing quote of a
/// string value, or at `,` / `}` / end of line for anything else.
fn value_of(rest: &str) -> Option<&str> {
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();

    if let Some(inner) = rest.strip_prefix('"') {
        let end = inner.find('"').map(|i| i + 2).unwrap_or(rest.len());
        return Some(&rest[..end]);
    }

    let end = rest.find([',', '}']).unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    raw.strip_suffix('"').unwrap_or(raw)
}
