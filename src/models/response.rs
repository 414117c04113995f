use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Shaped model answer handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResponse {
    pub raw_text: String,
    pub parsed_table: Option<ParsedTable>,
}

impl ModelResponse {
    /// Plain-text answer, no table detected.
    pub fn plain(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            parsed_table: None,
        }
    }

    pub fn tabular(raw_text: impl Into<String>, table: ParsedTable) -> Self {
        Self {
            raw_text: raw_text.into(),
            parsed_table: Some(table),
        }
    }

    pub fn is_tabular(&self) -> bool {
        self.parsed_table.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }
}

/// A single table cell. Serializes as a JSON number, string or null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Axis candidates for the presentation layer. Nothing is rendered here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartHint {
    /// First non-numeric (label) column.
    pub x_axis: Option<String>,
    /// First numeric column.
    pub y_axis: Option<String>,
    pub chartable: bool,
}

impl ChartHint {
    fn from_columns(columns: &[Column]) -> Self {
        let x_axis = columns
            .iter()
            .find(|c| !c.is_numeric())
            .map(|c| c.name.clone());
        let y_axis = columns
            .iter()
            .find(|c| c.is_numeric())
            .map(|c| c.name.clone());
        let chartable = x_axis.is_some() && y_axis.is_some();
        Self {
            x_axis,
            y_axis,
            chartable,
        }
    }
}

/// Table recovered from a model answer.
///
/// Every row holds exactly one cell per column, in column order. The only
/// constructor enforces this, so all rows share the header's column set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
    chart: ChartHint,
}

impl ParsedTable {
    /// Returns `None` for duplicate column names or rows of the wrong width.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> Option<Self> {
        let mut seen = std::collections::HashSet::new();
        if !columns.iter().all(|c| seen.insert(c.name.as_str())) {
            return None;
        }
        if rows.iter().any(|r| r.len() != columns.len()) {
            return None;
        }
        let chart = ChartHint::from_columns(&columns);
        Some(Self {
            columns,
            rows,
            chart,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn chart(&self) -> &ChartHint {
        &self.chart
    }

    pub fn is_chartable(&self) -> bool {
        self.chart.chartable
    }

    /// Cell at `row` under column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Rows as column-name → value maps.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| {
                        let value = serde_json::to_value(cell).unwrap_or(serde_json::Value::Null);
                        (col.name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

impl Serialize for ParsedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ParsedTable", 3)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &self.records())?;
        state.serialize_field("chart", &self.chart)?;
        state.end()
    }
}
