//! Table extraction: parse a pipe-delimited Markdown table into rows.
//!
//! The backend returns a single GFM-style table:
//!
//! ```text
//! | カード番号 | 利用月 | 利用年月日 |
//! |---|---|---|
//! | 1234 | 9 | 20240902 |
//! ```
//!
//! Extraction never fails. Ragged rows are padded or clipped to the header
//! width, blank lines are ignored, and anything that is not a table simply
//! yields fewer rows. Only this one table shape is understood; there is no
//! general Markdown parsing here.

use crate::config::{DuplicateHeaders, ExtractOptions, SeparatorMode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

/// One leading or one trailing pipe; never an interior one.
static RE_EDGE_PIPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\||\|$").unwrap());

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ── Data model ───────────────────────────────────────────────────────────────

/// A data row keyed by column header.
///
/// Keys keep the order in which they were first inserted. Inserting an
/// existing key replaces its value in place, so a duplicated header ends up
/// holding the value of its right-most column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Value stored under `column`, if that column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Set `column` to `value`, overwriting an existing entry in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Iterate `(column, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Header plus rows, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDocument {
    /// Header cells exactly as parsed (duplicates included).
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl TableDocument {
    /// Distinct header names in first-occurrence order.
    ///
    /// This is the column set a row actually carries, and therefore the
    /// column layout of the exported worksheet.
    pub fn columns(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.header.len());
        for name in &self.header {
            if !seen.contains(&name.as_str()) {
                seen.push(name);
            }
        }
        seen
    }

    /// Display width of each column in [`Self::columns`] order: the longer of
    /// the header name and the longest value, in characters.
    pub fn column_widths(&self) -> Vec<usize> {
        self.columns()
            .iter()
            .map(|name| {
                let content = self
                    .rows
                    .iter()
                    .filter_map(|r| r.get(name))
                    .map(|v| v.chars().count())
                    .max()
                    .unwrap_or(0);
                name.chars().count().max(content)
            })
            .collect()
    }

    /// Render back into a pipe table with a `---` separator line.
    ///
    /// Returns an empty string when there is no header.
    pub fn to_pipe_table(&self) -> String {
        let columns = self.columns();
        if columns.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format!("| {} |", columns.join(" | ")));
        lines.push(format!("|{}", "---|".repeat(columns.len())));
        for row in &self.rows {
            let cells: Vec<&str> = columns
                .iter()
                .map(|c| row.get(c).unwrap_or(""))
                .collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        lines.join("\n")
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

/// Extract a table with default options.
pub fn extract(table_text: &str) -> TableDocument {
    extract_with(table_text, &ExtractOptions::default())
}

/// Extract a table from pipe-delimited text.
///
/// The first non-blank line is the header. The second non-blank line is the
/// separator and is discarded (see [`SeparatorMode`]). Every later line is a
/// data row.
pub fn extract_with(table_text: &str, options: &ExtractOptions) -> TableDocument {
    let lines: Vec<&str> = table_text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();

    let Some(header_line) = lines.first() else {
        return TableDocument::default();
    };

    let mut header = split_header(header_line);
    if options.duplicate_headers == DuplicateHeaders::Suffix {
        header = suffix_duplicates(header);
    }

    let data_start = data_start_index(&lines, options.separator);

    let rows: Vec<Row> = lines
        .iter()
        .skip(data_start)
        .map(|line| build_row(&header, split_data(line)))
        .collect();

    debug!(
        "Extracted table: {} columns, {} rows",
        header.len(),
        rows.len()
    );

    TableDocument { header, rows }
}

/// Index of the first data line.
///
/// Invariant: index 0 is the header. Index 1 is taken to be the `|---|`
/// separator without inspection unless [`SeparatorMode::Validated`] is set,
/// so a table that omits the separator loses its first data row by default.
fn data_start_index(lines: &[&str], mode: SeparatorMode) -> usize {
    match mode {
        SeparatorMode::SkipSecondLine => 2,
        SeparatorMode::Validated => match lines.get(1) {
            Some(line) if is_separator_row(line) => 2,
            _ => 1,
        },
    }
}

/// Split the header line, dropping cells that are exactly empty.
///
/// Dropping `""` removes the framing cells around `| a | b |`, and also any
/// truly empty interior cell (`||`). Whitespace-only cells survive and trim
/// to `""`.
fn split_header(line: &str) -> Vec<String> {
    line.split('|')
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Split a data line, keeping empty cells so positions line up with the header.
fn split_data(line: &str) -> Vec<String> {
    let unframed = RE_EDGE_PIPE.replace_all(line.trim(), "");
    unframed.split('|').map(normalise_cell).collect()
}

fn normalise_cell(cell: &str) -> String {
    RE_WHITESPACE_RUN.replace_all(cell.trim(), " ").into_owned()
}

/// Zip header names with cells: short rows are padded with `""`, surplus
/// cells are dropped.
fn build_row(header: &[String], mut cells: Vec<String>) -> Row {
    cells.resize(header.len(), String::new());
    let mut row = Row::default();
    for (name, value) in header.iter().zip(cells) {
        row.insert(name.as_str(), value);
    }
    row
}

fn suffix_duplicates(header: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(header.len());
    for name in header {
        if !out.contains(&name) {
            out.push(name);
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{name}_{n}");
            if !out.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        out.push(unique);
    }
    out
}

/// `true` for a GFM separator line such as `|---|:---:|`.
pub(crate) fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') || !trimmed.contains('-') {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "| A | B |\n|---|---|\n| 1 | 2 |";

    fn row(pairs: &[(&str, &str)]) -> Row {
        let mut r = Row::default();
        for (k, v) in pairs {
            r.insert(*k, *v);
        }
        r
    }

    #[test]
    fn test_basic_table() {
        let doc = extract(SAMPLE);
        assert_eq!(doc.header, vec!["A", "B"]);
        assert_eq!(doc.rows, vec![row(&[("A", "1"), ("B", "2")])]);
    }

    #[test]
    fn test_empty_input() {
        let doc = extract("");
        assert!(doc.header.is_empty());
        assert!(doc.rows.is_empty());
        assert_eq!(extract("  \n\n \t\n"), TableDocument::default());
    }

    #[test]
    fn test_header_only() {
        let doc = extract("| A | B |");
        assert_eq!(doc.header, vec!["A", "B"]);
        assert!(doc.rows.is_empty());

        let doc = extract("| A | B |\n|---|---|");
        assert_eq!(doc.header, vec!["A", "B"]);
        assert!(doc.rows.is_empty());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let doc = extract("\n\n| A | B |\n\n|---|---|\n\n| 1 | 2 |\n\n");
        assert_eq!(doc.rows.len(), 1);
        assert_eq!(doc.rows[0].get("B"), Some("2"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let doc = extract("| A | B |\r\n|---|---|\r\n| 1 | 2 |\r\n");
        assert_eq!(doc.rows, vec![row(&[("A", "1"), ("B", "2")])]);
    }

    #[test]
    fn test_short_row_padded() {
        let doc = extract("| A | B | C |\n|---|---|---|\n| 1 |");
        assert_eq!(doc.rows[0], row(&[("A", "1"), ("B", ""), ("C", "")]));
    }

    #[test]
    fn test_long_row_clipped() {
        let doc = extract("| A | B |\n|---|---|\n| 1 | 2 | 3 | 4 |");
        assert_eq!(doc.rows[0], row(&[("A", "1"), ("B", "2")]));
        assert_eq!(doc.rows[0].len(), 2);
    }

    #[test]
    fn test_whitespace_only_cell_is_empty() {
        let doc = extract("| A | B |\n|---|---|\n|   | x |");
        assert_eq!(doc.rows[0].get("A"), Some(""));
        assert_eq!(doc.rows[0].get("B"), Some("x"));
    }

    #[test]
    fn test_internal_whitespace_collapsed() {
        let doc = extract("| A |\n|---|\n|  東京   IC \t 出口 |");
        assert_eq!(doc.rows[0].get("A"), Some("東京 IC 出口"));
    }

    #[test]
    fn test_pipes_only_row_kept() {
        let doc = extract("| A | B |\n|---|---|\n|||");
        assert_eq!(doc.rows.len(), 1);
        assert_eq!(doc.rows[0], row(&[("A", ""), ("B", "")]));

        let doc = extract("| A | B |\n|---|---|\n|");
        assert_eq!(doc.rows[0], row(&[("A", ""), ("B", "")]));
    }

    #[test]
    fn test_interior_empty_data_cell_keeps_position() {
        let doc = extract("| A | B | C |\n|---|---|---|\n| 1 || 3 |");
        assert_eq!(doc.rows[0], row(&[("A", "1"), ("B", ""), ("C", "3")]));
    }

    #[test]
    fn test_unframed_data_row() {
        let doc = extract("| A | B |\n|---|---|\n1 | 2");
        assert_eq!(doc.rows[0], row(&[("A", "1"), ("B", "2")]));
    }

    #[test]
    fn test_header_drops_exactly_empty_cells() {
        // `||` is an exactly-empty interior cell and disappears; `| |` is
        // whitespace and survives as "".
        assert_eq!(split_header("| A || B |"), vec!["A", "B"]);
        assert_eq!(split_header("| A | | B |"), vec!["A", "", "B"]);
    }

    #[test]
    fn test_second_line_skipped_unconditionally() {
        let doc = extract("| A | B |\n| 1 | 2 |\n| 3 | 4 |");
        assert_eq!(doc.rows, vec![row(&[("A", "3"), ("B", "4")])]);
    }

    #[test]
    fn test_validated_separator_keeps_data_line() {
        let opts = ExtractOptions {
            separator: SeparatorMode::Validated,
            ..Default::default()
        };
        let doc = extract_with("| A | B |\n| 1 | 2 |\n| 3 | 4 |", &opts);
        assert_eq!(doc.rows.len(), 2);
        assert_eq!(doc.rows[0].get("A"), Some("1"));

        let doc = extract_with("| A | B |\n| :--- | ---: |\n| 3 | 4 |", &opts);
        assert_eq!(doc.rows.len(), 1);
        assert_eq!(doc.rows[0].get("A"), Some("3"));
    }

    #[test]
    fn test_duplicate_headers_overwrite() {
        let doc = extract("| A | B | A |\n|---|---|---|\n| 1 | 2 | 3 |");
        assert_eq!(doc.header, vec!["A", "B", "A"]);
        assert_eq!(doc.columns(), vec!["A", "B"]);
        assert_eq!(doc.rows[0], row(&[("A", "3"), ("B", "2")]));
    }

    #[test]
    fn test_duplicate_headers_suffix() {
        let opts = ExtractOptions {
            duplicate_headers: DuplicateHeaders::Suffix,
            ..Default::default()
        };
        let doc = extract_with("| A | A_2 | A |\n|---|---|---|\n| 1 | 2 | 3 |", &opts);
        assert_eq!(doc.header, vec!["A", "A_2", "A_3"]);
        assert_eq!(doc.rows[0].get("A_3"), Some("3"));
    }

    #[test]
    fn test_column_widths() {
        let doc = extract("| Name | N |\n|---|---|\n| ab | 12345 |\n| abcdefg | 1 |");
        assert_eq!(doc.column_widths(), vec![7, 5]);
    }

    #[test]
    fn test_column_widths_count_chars_not_bytes() {
        let doc = extract("| 入口IC |\n|---|\n| 東京 |");
        assert_eq!(doc.column_widths(), vec![4]);
    }

    #[test]
    fn test_round_trip() {
        let text = "| H1 | H2 | H3 |\n|---|---|---|\n| a  b | | c |\n| d | e |";
        let first = extract(text);
        let second = extract(&first.to_pipe_table());
        assert_eq!(first, second);
        assert_eq!(second.rows[0].get("H1"), Some("a b"));
        assert_eq!(second.rows[1].get("H3"), Some(""));
    }

    #[test]
    fn test_pipe_table_of_empty_doc() {
        assert_eq!(TableDocument::default().to_pipe_table(), "");
    }

    #[test]
    fn test_row_serializes_as_ordered_map() {
        let r = row(&[("B", "2"), ("A", "1")]);
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"B":"2","A":"1"}"#);
    }

    #[test]
    fn test_is_separator_row() {
        assert!(is_separator_row("|---|---|"));
        assert!(is_separator_row("| :--- | ---: |"));
        assert!(!is_separator_row("| 1 | 2 |"));
        assert!(!is_separator_row("|||"));
        assert!(!is_separator_row("---"));
    }
}
