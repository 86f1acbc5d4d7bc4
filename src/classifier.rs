use crate::error::{AnalysisError, Result};
use crate::param::Param;
use crate::table::{Column, ScoreTable};
use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Acceptance window describing what a dependency score distribution looks like
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds {
    /// strict lower bound on the number of non-missing values
    pub min_non_missing: usize,
    pub mean_min: f64,
    pub mean_max: f64,
    pub min_std: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds { min_non_missing: 10, mean_min: -5.0, mean_max: 2.0, min_std: 0.01 }
    }
}

impl Thresholds {
    pub fn from_param(param: &Param) -> Thresholds {
        Thresholds {
            min_non_missing: param.classifier.min_non_missing,
            mean_min: param.classifier.mean_min,
            mean_max: param.classifier.mean_max,
            min_std: param.classifier.min_std,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub score_columns: Vec<String>,
    pub metadata_columns: Vec<String>,
}

/// Decides whether a single column looks like a score column
pub fn is_score_column(column: &Column, thresholds: &Thresholds) -> bool {
    let values: Vec<f64> = match column {
        Column::Numeric(values) => values.iter().flatten().copied().collect(),
        Column::Text(_) => return false,
    };

    if values.len() <= thresholds.min_non_missing {
        return false;
    }

    let mean = values.iter().mean();
    let std = values.iter().std_dev();

    // NaN (single value, infinite cells) fails every comparison and lands in metadata
    thresholds.mean_min < mean && mean < thresholds.mean_max && std > thresholds.min_std
}

/// Splits the table columns into score columns and metadata columns, keeping table order
pub fn classify(table: &ScoreTable, thresholds: &Thresholds, thread_number: usize) -> Result<Classification> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_number.max(1))
        .build()?;

    let flags: Vec<bool> = pool.install(|| {
        table
            .columns
            .par_iter()
            .map(|column| is_score_column(column, thresholds))
            .collect()
    });

    let mut score_columns = Vec::new();
    let mut metadata_columns = Vec::new();
    for (name, is_score) in table.names.iter().zip(flags) {
        if is_score {
            score_columns.push(name.clone());
        } else {
            metadata_columns.push(name.clone());
        }
    }

    if score_columns.is_empty() {
        return Err(AnalysisError::NoScoreColumnsFound { diagnostic: diagnose(table) });
    }

    info!("{} score columns, {} metadata columns", score_columns.len(), metadata_columns.len());
    debug!("Metadata columns: {:?}", metadata_columns);

    Ok(Classification { score_columns, metadata_columns })
}

/// Human readable description of a table, shown when no score column is found
pub fn diagnose(table: &ScoreTable) -> String {
    let mut text = String::new();
    text.push_str(&format!("Shape: {} rows x {} columns\n", table.row_len, table.col_len()));
    text.push_str(&format!(
        "First columns: {:?}\n",
        table.names.iter().take(10).collect::<Vec<_>>()
    ));
    text.push_str("Column types:\n");
    for (name, column) in table.names.iter().zip(table.columns.iter()).take(15) {
        text.push_str(&format!("  {:<30} {}\n", name, column.kind()));
    }
    text
}
