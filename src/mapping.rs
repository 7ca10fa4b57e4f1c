use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Label returned when no hand is found in the frame.
pub const NO_HAND_LABEL: &str = "No hand";
/// Label returned when the classifier index has no entry in the table.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Gesture names, index-aligned with the classifier's output classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureLabels {
    labels: Vec<String>,
}

impl GestureLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Parses a label CSV. The first column of every non-blank row is one label.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut labels = Vec::new();
        for (row, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read label row {}", row + 1))?;
            // Files exported from spreadsheet tools often start with a UTF-8 BOM
            let line = if row == 0 { line.trim_start_matches('\u{feff}') } else { line.as_str() };
            if line.trim().is_empty() {
                continue;
            }
            labels.push(first_column(line));
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Looks up the label for a classifier index, falling back to [`UNKNOWN_LABEL`].
    pub fn label(&self, index: usize) -> &str {
        self.labels.get(index).map(String::as_str).unwrap_or(UNKNOWN_LABEL)
    }
}

fn first_column(line: &str) -> String {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('"') {
        // quoted field, `""` escapes a quote
        let mut out = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    out.push('"');
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        return out;
    }
    line.split(',').next().unwrap_or_default().trim().to_string()
}

pub fn load_labels(file_path: impl AsRef<Path>) -> Result<GestureLabels> {
    let file_path = file_path.as_ref();
    let file = File::open(file_path)
        .with_context(|| format!("failed to open label file {}", file_path.display()))?;
    GestureLabels::from_reader(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn reads_first_column_and_strips_bom() {
        let csv = "\u{feff}Open\nClose\nPointer,extra\n";
        let labels = GestureLabels::from_reader(Cursor::new(csv)).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.label(0), "Open");
        assert_eq!(labels.label(1), "Close");
        assert_eq!(labels.label(2), "Pointer");
    }

    #[test]
    fn skips_blank_rows_and_unquotes() {
        let csv = "\"Thumbs, up\"\n\n\"Say \"\"hi\"\"\"\n\n";
        let labels = GestureLabels::from_reader(Cursor::new(csv)).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.label(0), "Thumbs, up");
        assert_eq!(labels.label(1), "Say \"hi\"");
    }

    #[test]
    fn index_past_end_is_unknown() {
        let labels = GestureLabels::new(vec!["Open".into(), "Close".into()]);
        assert_eq!(labels.label(labels.len()), UNKNOWN_LABEL);
        assert_eq!(labels.label(usize::MAX), UNKNOWN_LABEL);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Open").unwrap();
        writeln!(file, "OK").unwrap();
        let labels = load_labels(file.path()).unwrap();
        assert_eq!(labels, GestureLabels::new(vec!["Open".into(), "OK".into()]));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_labels("does/not/exist.csv").is_err());
    }
}
