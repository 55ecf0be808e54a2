use crate::diagnostics::Diagnostics;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static MANIFEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+) \(lines (\d+) - (\d+)\)$").expect("manifest line pattern must compile")
});

/// One merged file and the 1-based, inclusive line span of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// `/<rootFolderName>/<relativePath>`
    pub display_path: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl ManifestEntry {
    pub fn line_count(&self) -> usize {
        self.end_line + 1 - self.start_line
    }

    /// Path relative to the project root, without the leading root folder segment.
    pub fn relative_path(&self) -> &str {
        let trimmed = self.display_path.trim_start_matches('/');
        match trimmed.find('/') {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (lines {} - {})",
            self.display_path, self.start_line, self.end_line
        )
    }
}

pub fn render(entries: &[ManifestEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

/// Lines that do not look like manifest entries are skipped with a warning.
pub fn parse(text: &str, diagnostics: &mut Diagnostics) -> Vec<ManifestEntry> {
    let mut entries = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let parsed = MANIFEST_LINE.captures(line).and_then(|caps| {
            let start = caps[2].parse::<usize>().ok()?;
            let end = caps[3].parse::<usize>().ok()?;
            (start >= 1 && end >= start).then(|| ManifestEntry {
                display_path: caps[1].to_string(),
                start_line: start,
                end_line: end,
            })
        });
        match parsed {
            Some(entry) => entries.push(entry),
            None => diagnostics.warn(format!(
                "Skipping malformed manifest line {}: {}",
                number + 1,
                line
            )),
        }
    }
    entries
}
