use crate::error::{AnalysisError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Cell contents treated as missing values when a CSV is parsed
pub const MISSING_TOKENS: [&str; 19] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>",
    "#N/A", "#NA", "#N/A N/A", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN",
];

pub fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// A column is numeric when every non-missing cell parses as a float
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// dtype-like label used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "float64",
            Column::Text(_) => "object",
        }
    }

    /// Infers the column type from raw CSV cells
    pub fn infer(cells: Vec<String>) -> Column {
        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| {
                if is_missing(cell) {
                    Some(None)
                } else {
                    cell.trim().parse::<f64>().ok().map(Some)
                }
            })
            .collect();

        match parsed {
            Some(values) => Column::Numeric(values),
            None => Column::Text(
                cells
                    .into_iter()
                    .map(|cell| if is_missing(&cell) { None } else { Some(cell) })
                    .collect(),
            ),
        }
    }

    /// Cell rendered as a label, None when missing
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            Column::Numeric(values) => values.get(row).copied().flatten().map(|v| v.to_string()),
            Column::Text(values) => values.get(row).cloned().flatten(),
        }
    }
}

/// Immutable cell line x column table. Rows are samples, columns mix metadata and scores.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreTable {
    pub names: Vec<String>,
    pub columns: Vec<Column>,
    pub row_len: usize,
    fingerprint: String,
}

impl ScoreTable {
    /// Builds a table from already typed columns (all columns must have the same length)
    pub fn from_columns(names: Vec<String>, columns: Vec<Column>) -> Result<ScoreTable> {
        if names.is_empty() {
            return Err(AnalysisError::EmptyTable("no column".to_string()));
        }
        if names.len() != columns.len() {
            return Err(AnalysisError::EmptyTable(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let row_len = columns[0].len();
        if let Some(pos) = columns.iter().position(|c| c.len() != row_len) {
            return Err(AnalysisError::EmptyTable(format!(
                "column '{}' has {} rows, expected {}",
                names[pos],
                columns[pos].len(),
                row_len
            )));
        }

        let fingerprint = compute_fingerprint(&names, &columns);
        Ok(ScoreTable { names, columns, row_len, fingerprint })
    }

    /// Parses a headered CSV. Short rows are padded with missing cells.
    pub fn from_reader<R: Read>(reader: R) -> Result<ScoreTable> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let names = dedup_names(csv_reader.headers()?.iter().map(String::from).collect());
        if names.is_empty() || (names.len() == 1 && names[0].is_empty()) {
            return Err(AnalysisError::EmptyTable("missing header line".to_string()));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in csv_reader.records() {
            let record = record?;
            for (j, column) in cells.iter_mut().enumerate() {
                column.push(record.get(j).unwrap_or("").to_string());
            }
        }

        let columns = cells.into_iter().map(Column::infer).collect();
        ScoreTable::from_columns(names, columns)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ScoreTable> {
        ScoreTable::from_reader(bytes)
    }

    /// Loads a CSV file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ScoreTable> {
        let path = path.as_ref();
        info!("Loading score table {}...", path.display());
        let file = File::open(path)?;
        let table = ScoreTable::from_reader(BufReader::new(file))?;
        debug!("{} rows x {} columns, fingerprint {}", table.row_len, table.col_len(), table.fingerprint);
        Ok(table)
    }

    pub fn col_len(&self) -> usize {
        self.names.len()
    }

    /// Content hash of header and cells, the identity used for caching derived results
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|j| &self.columns[j])
    }

    /// Numeric values of a column, None when the column is missing or textual
    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name) {
            Some(Column::Numeric(values)) => Some(values),
            _ => None,
        }
    }
}

/// Duplicated header names get a `.1`, `.2`... suffix so every column stays addressable
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut i = 1;
            while seen.contains(&candidate) {
                candidate = format!("{}.{}", name, i);
                i += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

fn compute_fingerprint(names: &[String], columns: &[Column]) -> String {
    let mut hasher = Sha256::new();
    for (name, column) in names.iter().zip(columns) {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        match column {
            Column::Numeric(values) => {
                hasher.update(b"N");
                for value in values {
                    match value {
                        Some(v) => hasher.update(v.to_bits().to_le_bytes()),
                        None => hasher.update([0xffu8]),
                    }
                }
            }
            Column::Text(values) => {
                hasher.update(b"T");
                for value in values {
                    match value {
                        Some(v) => {
                            hasher.update(v.as_bytes());
                            hasher.update([0u8]);
                        }
                        None => hasher.update([0xffu8]),
                    }
                }
            }
        }
        hasher.update([0x1eu8]);
    }
    format!("{:x}", hasher.finalize())
}

impl fmt::Display for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples: {}   Columns: {}", self.row_len, self.col_len())?;

        let header = self.names.iter().take(8).cloned().collect::<Vec<_>>().join("\t");
        let truncated_header = if header.chars().count() > 100 {
            format!("{}...", header.chars().take(97).collect::<String>())
        } else {
            header
        };
        writeln!(f, "{}", truncated_header)?;

        // Limit to the first 10 rows
        for i in (0..self.row_len).take(10) {
            let row = self
                .columns
                .iter()
                .take(8)
                .map(|c| match c {
                    Column::Numeric(values) => values[i].map(|v| format!("{:.2}", v)).unwrap_or_default(),
                    Column::Text(values) => values[i].clone().unwrap_or_default(),
                })
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the Display formatter
        write!(f, "{}", self)
    }
}

// unit tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_fixture() {
        let table = ScoreTable::load("samples/tests/scores.csv").unwrap();
        assert_eq!(table.row_len, 12, "the fixture has 12 cell lines");
        assert_eq!(table.col_len(), 12, "the fixture has 12 columns");
        assert_eq!(table.names[0], "ModelID");
        assert_eq!(table.names[6], "MYC (4609)");
        assert_eq!(table.column("Lineage").unwrap().kind(), "object");
        assert_eq!(table.column("Age").unwrap().kind(), "float64");

        let e2f8 = table.numeric("E2F8 (79733)").unwrap();
        assert_eq!(e2f8[11], None, "NA must be read as a missing value");
        assert_eq!(e2f8.iter().flatten().count(), 11);
    }

    #[test]
    fn test_infer_mixed_column_is_text() {
        let column = Column::infer(vec!["1.5".into(), "abc".into(), "".into()]);
        assert_eq!(column, Column::Text(vec![Some("1.5".into()), Some("abc".into()), None]));
    }

    #[test]
    fn test_infer_numeric_with_missing_tokens() {
        let column = Column::infer(vec!["-0.5".into(), "NaN".into(), " 2 ".into(), "#N/A".into()]);
        assert_eq!(column, Column::Numeric(vec![Some(-0.5), None, Some(2.0), None]));
    }

    #[test]
    fn test_duplicate_headers_are_renamed() {
        let table = ScoreTable::from_bytes(b"A,B,A,A\n1,2,3,4\n").unwrap();
        assert_eq!(table.names, vec!["A", "B", "A.1", "A.2"]);
        assert_eq!(table.numeric("A.1").unwrap(), &[Some(3.0)]);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = ScoreTable::from_bytes(b"g1,g2\n1,2\n3,4\n").unwrap();
        let b = ScoreTable::from_bytes(b"g1,g2\n1,2\n3,4\n").unwrap();
        let c = ScoreTable::from_bytes(b"g1,g2\n1,2\n3,5\n").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint(), "same content must give the same identity");
        assert_ne!(a.fingerprint(), c.fingerprint(), "a changed cell must change the identity");
    }

    #[test]
    fn test_from_columns_rejects_ragged_columns() {
        let result = ScoreTable::from_columns(
            vec!["a".into(), "b".into()],
            vec![Column::Numeric(vec![Some(1.0)]), Column::Numeric(vec![Some(1.0), Some(2.0)])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(ScoreTable::from_bytes(b"").is_err());
    }

    #[test]
    fn test_short_rows_are_padded_with_missing() {
        let table = ScoreTable::from_bytes(b"id,G1,G2\na,1,2\nb,3\nc,5,6\n").unwrap();
        assert_eq!(table.row_len, 3, "a short row must not abort the load");
        assert_eq!(table.numeric("G1").unwrap(), &[Some(1.0), Some(3.0), Some(5.0)]);
        assert_eq!(table.numeric("G2").unwrap(), &[Some(2.0), None, Some(6.0)], "the absent cell reads as missing");
    }

    #[test]
    fn test_label_renders_numeric_cells() {
        let column = Column::Numeric(vec![Some(3.0), None]);
        assert_eq!(column.label(0), Some("3".to_string()));
        assert_eq!(column.label(1), None);
    }
}
