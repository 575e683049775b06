// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Output naming and settings text rewriting

use std::path::Path;

use crate::settings::ImageRef;
use crate::{BlurwatchError, Result};

/// Last path component, accepting either separator
///
/// `/` takes precedence when a value mixes both.
pub fn file_name_of(image_path: &str) -> &str {
    if image_path.contains('/') {
        image_path.rsplit('/').next().unwrap_or(image_path)
    } else if image_path.contains('\\') {
        image_path.rsplit('\\').next().unwrap_or(image_path)
    } else {
        image_path
    }
}

/// Name of the blurred file, e.g. `blurred-r12-forest.png`
pub fn blurred_file_name(prefix: &str, radius: u32, file_name: &str) -> String {
    format!("{}r{}-{}", prefix, radius, file_name)
}

/// Path as written into the settings file: forward slashes only
pub fn settings_path_text(dir: &Path, file_name: &str) -> String {
    let dir = dir.to_string_lossy().replace('\\', "/");
    format!("{}/{}", dir.trim_end_matches('/'), file_name)
}

/// Result of rewriting the settings text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// The image line exactly as it was before the rewrite
    pub original_line: String,
    /// Lines that replaced it
    pub replacement: Vec<String>,
}

/// Point the image key at `new_path`
///
/// Only the line the image value was read from is touched. It stays in place
/// (trimmed, re-indented, optionally commented out) and the new key line is
/// inserted right after it at the same indentation.
pub fn rewrite(
    text: &str,
    image: &ImageRef,
    key: &str,
    new_path: &str,
    comment_original: bool,
) -> Result<Rewritten> {
    let lines: Vec<&str> = text.split('\n').collect();
    let original = *lines.get(image.line).ok_or_else(|| BlurwatchError::Settings {
        line: image.line + 1,
        message: "image line no longer present".to_string(),
    })?;

    let (body, eol) = match original.strip_suffix('\r') {
        Some(body) => (body, "\r"),
        None => (original, ""),
    };
    let indent = " ".repeat(body.find('"').unwrap_or(0));
    let trimmed = body.trim();
    let (entry, comment) = split_line_comment(trimmed);
    let has_comma = entry.ends_with(',');

    let kept = if comment_original {
        format!("{}// {}{}", indent, trimmed, eol)
    } else if has_comma {
        format!("{}{}{}", indent, trimmed, eol)
    } else {
        // The inserted line follows, so a trailing entry needs a separator now
        format!("{}{},{}{}", indent, entry, comment, eol)
    };
    let inserted = format!(
        "{}\"{}\": \"{}\"{}{}",
        indent,
        key,
        new_path,
        if has_comma { "," } else { "" },
        eol
    );

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend_from_slice(&lines[..image.line]);
    out.push(&kept);
    out.push(&inserted);
    out.extend_from_slice(&lines[image.line + 1..]);
    let text = out.join("\n");

    Ok(Rewritten {
        text,
        original_line: original.to_string(),
        replacement: vec![kept, inserted],
    })
}

/// Split a trimmed line into the entry and a trailing `//` comment
///
/// `//` inside a string value (URLs, UNC paths) is not a comment. The comment
/// part keeps the whitespace that separated it from the entry.
fn split_line_comment(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => {
                let entry = line[..i].trim_end();
                return (entry, &line[entry.len()..]);
            }
            _ => {}
        }
        i += 1;
    }
    (line, "")
}

/// Undo a rewrite: swap the replacement lines back for the original line
///
/// Returns `None` when the replacement block is not found in `text`.
pub fn restore(text: &str, original_line: &str, replacement: &[String]) -> Option<String> {
    if replacement.is_empty() {
        return None;
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines
        .windows(replacement.len())
        .rposition(|window| window.iter().zip(replacement).all(|(a, b)| *a == b.as_str()))?;

    let mut out = lines[..start].to_vec();
    out.push(original_line);
    out.extend_from_slice(&lines[start + replacement.len()..]);
    Some(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn image_at(path: &str, line: usize) -> ImageRef {
        ImageRef { path: path.to_string(), line }
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("/home/me/bg.png"), "bg.png");
        assert_eq!(file_name_of("C:\\\\Users\\\\me\\\\bg.jpg"), "bg.jpg");
        assert_eq!(file_name_of("bg.gif"), "bg.gif");
        assert_eq!(file_name_of("C:\\odd/mixed\\bg.png"), "mixed\\bg.png");
    }

    #[test]
    fn test_blurred_file_name() {
        assert_eq!(blurred_file_name("blurred-", 12, "forest.png"), "blurred-r12-forest.png");
    }

    #[test]
    fn test_settings_path_text() {
        assert_eq!(settings_path_text(&PathBuf::from("/tmp"), "x.png"), "/tmp/x.png");
        assert_eq!(settings_path_text(&PathBuf::from("/tmp/"), "x.png"), "/tmp/x.png");
        assert_eq!(
            settings_path_text(&PathBuf::from("C:\\Users\\me\\AppData\\Local\\Temp"), "x.png"),
            "C:/Users/me/AppData/Local/Temp/x.png"
        );
    }

    #[test]
    fn test_rewrite_inserts_after_image_line() {
        let text = "{\n    \"blurRadius\": 4,\n    \"backgroundImage\": \"/p/a.png\",\n    \"x\": 1\n}\n";
        let out = rewrite(text, &image_at("/p/a.png", 2), "backgroundImage", "/tmp/blurred-r4-a.png", false).unwrap();

        assert_eq!(
            out.text,
            "{\n    \"blurRadius\": 4,\n    \"backgroundImage\": \"/p/a.png\",\n    \"backgroundImage\": \"/tmp/blurred-r4-a.png\",\n    \"x\": 1\n}\n"
        );
        assert_eq!(out.original_line, "    \"backgroundImage\": \"/p/a.png\",");
    }

    #[test]
    fn test_rewrite_touches_only_the_source_line() {
        let text = "\"backgroundImage\": \"a.png\",\n\"note\": \"a.png is nice\",\n\"backgroundImage\": \"a.png\",";
        let out = rewrite(text, &image_at("a.png", 2), "backgroundImage", "/tmp/b.png", false).unwrap();
        let lines: Vec<&str> = out.text.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "\"backgroundImage\": \"a.png\",");
        assert_eq!(lines[1], "\"note\": \"a.png is nice\",");
        assert_eq!(lines[3], "\"backgroundImage\": \"/tmp/b.png\",");
    }

    #[test]
    fn test_rewrite_tab_indent_becomes_spaces() {
        let text = "\t\t\"backgroundImage\": \"a.png\",";
        let out = rewrite(text, &image_at("a.png", 0), "backgroundImage", "/t/b.png", false).unwrap();
        assert_eq!(out.text, "  \"backgroundImage\": \"a.png\",\n  \"backgroundImage\": \"/t/b.png\",");
    }

    #[test]
    fn test_rewrite_comment_original() {
        let text = "  \"backgroundImage\": \"a.png\",";
        let out = rewrite(text, &image_at("a.png", 0), "backgroundImage", "/t/b.png", true).unwrap();
        assert_eq!(out.text, "  // \"backgroundImage\": \"a.png\",\n  \"backgroundImage\": \"/t/b.png\",");
    }

    #[test]
    fn test_rewrite_last_entry_without_comma() {
        let text = "{\n  \"backgroundImage\": \"a.png\"\n}";
        let out = rewrite(text, &image_at("a.png", 1), "backgroundImage", "/t/b.png", false).unwrap();
        assert_eq!(out.text, "{\n  \"backgroundImage\": \"a.png\",\n  \"backgroundImage\": \"/t/b.png\"\n}");
    }

    #[test]
    fn test_rewrite_keeps_crlf() {
        let text = "{\r\n  \"backgroundImage\": \"a.png\",\r\n}";
        let out = rewrite(text, &image_at("a.png", 1), "backgroundImage", "/t/b.png", false).unwrap();
        assert_eq!(out.text, "{\r\n  \"backgroundImage\": \"a.png\",\r\n  \"backgroundImage\": \"/t/b.png\",\r\n}");
    }

    #[test]
    fn test_rewrite_trailing_comment_after_comma() {
        let text = "{\n  \"backgroundImage\": \"a.png\", // wallpaper\n  \"x\": 1\n}";
        let out = rewrite(text, &image_at("a.png", 1), "backgroundImage", "/tmp/blurred-r3-a.png", false).unwrap();
        assert_eq!(
            out.text,
            "{\n  \"backgroundImage\": \"a.png\", // wallpaper\n  \"backgroundImage\": \"/tmp/blurred-r3-a.png\",\n  \"x\": 1\n}"
        );
    }

    #[test]
    fn test_rewrite_trailing_comment_on_last_entry() {
        let text = "{\n  \"backgroundImage\": \"a.png\"   // last one\n}";
        let out = rewrite(text, &image_at("a.png", 1), "backgroundImage", "/t/b.png", false).unwrap();
        assert_eq!(
            out.text,
            "{\n  \"backgroundImage\": \"a.png\",   // last one\n  \"backgroundImage\": \"/t/b.png\"\n}"
        );
        let restored = restore(&out.text, &out.original_line, &out.replacement).unwrap();
        assert_eq!(restored, text);
    }

    #[test]
    fn test_split_line_comment() {
        assert_eq!(split_line_comment("\"k\": \"v\", // note"), ("\"k\": \"v\",", " // note"));
        assert_eq!(split_line_comment("\"k\": \"//server/share/a.png\","), ("\"k\": \"//server/share/a.png\",", ""));
        assert_eq!(split_line_comment("\"k\": \"a\\\"//b\" // c"), ("\"k\": \"a\\\"//b\"", " // c"));
        assert_eq!(split_line_comment("\"k\": 1"), ("\"k\": 1", ""));
    }

    #[test]
    fn test_rewrite_missing_line() {
        assert!(rewrite("one line", &image_at("a.png", 5), "backgroundImage", "/t/b.png", false).is_err());
    }

    #[test]
    fn test_restore_reverses_rewrite() {
        let text = "{\n  \"blurEnable\": true,\n  \"backgroundImage\": \"a.png\"\n}\n";
        let out = rewrite(text, &image_at("a.png", 2), "backgroundImage", "/t/b.png", true).unwrap();
        let restored = restore(&out.text, &out.original_line, &out.replacement).unwrap();
        assert_eq!(restored, text);
    }

    #[test]
    fn test_restore_not_found() {
        let replacement = vec!["x".to_string(), "y".to_string()];
        assert!(restore("a\nb\nc", "orig", &replacement).is_none());
        assert!(restore("a", "orig", &[]).is_none());
    }
}
