//! Response shape classification: pipe-delimited table or plain text.

use std::collections::HashSet;

use crate::models::{CellValue, Column, ColumnKind, ModelResponse, ParsedTable};

pub const DEFAULT_DELIMITER: char = '|';

/// Turns raw model text into a `ModelResponse`. Never fails: anything that
/// is not a structurally valid table comes back as plain text.
pub trait ResponseShapeClassifier: Send + Sync {
    fn classify(&self, raw_text: &str) -> ModelResponse;
}

/// Finds the first delimited table block in the text.
///
/// A block is a maximal run of consecutive lines containing the delimiter.
/// Markdown tables work as-is: outer pipes and `---` alignment rows are
/// ignored.
pub struct DelimitedTableClassifier {
    delimiter: char,
}

impl DelimitedTableClassifier {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    fn candidate_blocks<'a>(&self, raw_text: &'a str) -> Vec<Vec<&'a str>> {
        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in raw_text.lines() {
            if line.contains(self.delimiter) {
                current.push(line);
            } else if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }
        blocks
    }

    fn split_row(&self, line: &str) -> Vec<String> {
        let mut trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(self.delimiter) {
            trimmed = rest;
        }
        if let Some(rest) = trimmed.strip_suffix(self.delimiter) {
            trimmed = rest;
        }
        trimmed
            .split(self.delimiter)
            .map(|cell| cell.trim().to_string())
            .collect()
    }

    fn parse_block(&self, block: &[&str]) -> Option<ParsedTable> {
        let mut rows = block
            .iter()
            .map(|line| self.split_row(line))
            .filter(|cells| !is_alignment_row(cells));

        let header = rows.next()?;
        if header.len() < 2 || header.iter().any(|name| name.is_empty()) {
            return None;
        }
        let mut seen = HashSet::new();
        if !header.iter().all(|name| seen.insert(name.as_str())) {
            tracing::debug!(columns = ?header, "Table header has duplicate columns");
            return None;
        }

        let width = header.len();
        let mut dropped = 0usize;
        let data: Vec<Vec<String>> = rows
            .filter(|cells| {
                let keep = cells.len() == width;
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .collect();
        if dropped > 0 {
            tracing::debug!(dropped, width, "Dropped table rows with mismatched cell count");
        }
        if data.is_empty() {
            return None;
        }

        let kinds: Vec<ColumnKind> = (0..width)
            .map(|col| column_kind(data.iter().map(|row| row[col].as_str())))
            .collect();

        let columns = header
            .into_iter()
            .zip(&kinds)
            .map(|(name, kind)| Column { name, kind: *kind })
            .collect();

        let cells = data
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| to_cell(cell, *kind))
                    .collect()
            })
            .collect();

        ParsedTable::new(columns, cells)
    }
}

impl Default for DelimitedTableClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl ResponseShapeClassifier for DelimitedTableClassifier {
    fn classify(&self, raw_text: &str) -> ModelResponse {
        for block in self.candidate_blocks(raw_text) {
            if let Some(table) = self.parse_block(&block) {
                tracing::debug!(
                    columns = table.column_count(),
                    rows = table.row_count(),
                    chartable = table.is_chartable(),
                    "Model response classified as table"
                );
                return ModelResponse::tabular(raw_text, table);
            }
        }
        ModelResponse::plain(raw_text)
    }
}

/// Markdown separator row such as `---|:---:|--:`.
fn is_alignment_row(cells: &[String]) -> bool {
    cells.iter().all(|cell| {
        !cell.is_empty() && cell.contains('-') && cell.chars().all(|c| matches!(c, '-' | ':'))
    })
}

fn column_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut any_value = false;
    for cell in cells.filter(|c| !c.is_empty()) {
        any_value = true;
        if parse_number(cell).is_none() {
            return ColumnKind::Text;
        }
    }
    if any_value {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}

fn to_cell(cell: String, kind: ColumnKind) -> CellValue {
    if cell.is_empty() {
        return CellValue::Empty;
    }
    match kind {
        ColumnKind::Numeric => parse_number(&cell)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Text(cell)),
        ColumnKind::Text => CellValue::Text(cell),
    }
}

const CURRENCY_SIGNS: &[char] = &['$', '€', '£', '¥', '₹'];

/// Parse a figure as written in financial tables: `1,234.5`, `$1,200`,
/// `12.5%`, `(300)` for negatives. Percentages keep their face value.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    let mut negative = false;

    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    if let Some(rest) = s.strip_prefix('-') {
        if negative {
            return None;
        }
        negative = true;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }
    s = s.trim_start_matches(CURRENCY_SIGNS);
    if let Some(rest) = s.strip_prefix('-') {
        if negative {
            return None;
        }
        negative = true;
        s = rest;
    }
    s = s.strip_suffix('%').unwrap_or(s).trim_end();

    let digits: String = s.chars().filter(|c| *c != ',').collect();
    // One sign at most, already consumed above
    if digits.starts_with(['+', '-'])
        || !digits.chars().any(|c| c.is_ascii_digit())
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}
