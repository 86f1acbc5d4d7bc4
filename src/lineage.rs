use crate::error::{AnalysisError, Result};
use crate::param::Param;
use crate::ranking::extract_symbol;
use crate::table::{Column, ScoreTable};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::{BTreeMap, BTreeSet};

/// Label given to samples whose lineage cell is empty
pub const MISSING_LINEAGE: &str = "NA";

/// One sample's score for one gene column.
/// Samples with a missing score produce no record, so summaries and lineage.csv only hold observed values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineageRecord {
    pub lineage: String,
    pub gene: String,
    /// Score column the value was read from; tells apart columns sharing a symbol
    pub column: String,
    pub score: f64,
}

/// Long-format scores of the requested genes, grouped column by column
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineageData {
    pub lineage_column: String,
    /// Gene label of each aggregated column, in request order (repeats allowed)
    pub genes: Vec<String>,
    /// Score columns, parallel to `genes`
    pub columns: Vec<String>,
    pub records: Vec<LineageRecord>,
}

impl LineageData {
    /// Distinct lineage labels, sorted
    pub fn lineages(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.lineage.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn records_for(&self, column: &str) -> impl Iterator<Item = &LineageRecord> {
        let column = column.to_string();
        self.records.iter().filter(move |r| r.column == column)
    }
}

/// Distribution of one gene within one lineage
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LineageSummary {
    pub gene: String,
    pub column: String,
    pub lineage: String,
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineageOptions {
    pub keyword: String,
    pub exclude: String,
    pub max_genes: usize,
}

impl Default for LineageOptions {
    fn default() -> Self {
        LineageOptions { keyword: "lineage".to_string(), exclude: "sub".to_string(), max_genes: 8 }
    }
}

impl LineageOptions {
    pub fn from_param(param: &Param) -> LineageOptions {
        LineageOptions {
            keyword: param.lineage.keyword.clone(),
            exclude: param.lineage.exclude.clone(),
            max_genes: param.lineage.max_genes,
        }
    }
}

/// First column whose name contains the keyword and not the exclusion word (both ignoring case)
pub fn find_lineage_column<'a>(names: &'a [String], keyword: &str, exclude: &str) -> Option<&'a String> {
    let keyword = keyword.to_lowercase();
    let exclude = exclude.to_lowercase();
    names.iter().find(|name| {
        let lower = name.to_lowercase();
        lower.contains(&keyword) && (exclude.is_empty() || !lower.contains(&exclude))
    })
}

/// Maps a gene symbol back to its score columns: a column named like the symbol (ignoring case),
/// otherwise every numeric column whose extracted symbol equals it, in table order.
pub fn resolve_score_columns(table: &ScoreTable, symbol: &str) -> Vec<String> {
    let upper = symbol.trim().to_uppercase();
    if let Some(name) = table.names.iter().find(|n| n.to_uppercase() == upper) {
        return vec![name.clone()];
    }
    table
        .names
        .iter()
        .zip(table.columns.iter())
        .filter(|(name, column)| {
            matches!(column, Column::Numeric(_)) && extract_symbol(name).to_uppercase() == upper
        })
        .map(|(name, _)| name.clone())
        .collect()
}

/// Reshapes the requested genes' score columns into long-format (lineage, gene, score) records.
/// A symbol shared by several columns contributes each of them once.
pub fn aggregate_lineages<S: AsRef<str>>(
    table: &ScoreTable,
    genes: &[S],
    options: &LineageOptions,
) -> Result<LineageData> {
    let mut targets: Vec<(String, String)> = Vec::new();
    for gene in genes {
        let gene = gene.as_ref();
        let columns = resolve_score_columns(table, gene);
        if columns.is_empty() {
            debug!("{} has no score column, skipped", gene);
        }
        for column in columns {
            if !targets.iter().any(|(_, c)| *c == column) {
                targets.push((gene.to_string(), column));
            }
        }
    }
    aggregate_columns(table, &targets, options)
}

/// Same as `aggregate_lineages` for already resolved (gene label, score column) pairs.
/// Missing scores are skipped; missing lineage labels become `NA`.
pub fn aggregate_columns(
    table: &ScoreTable,
    targets: &[(String, String)],
    options: &LineageOptions,
) -> Result<LineageData> {
    let lineage_column = find_lineage_column(&table.names, &options.keyword, &options.exclude)
        .ok_or_else(|| AnalysisError::NoLineageColumnFound {
            n_columns: table.col_len(),
            keyword: options.keyword.clone(),
            exclude: options.exclude.clone(),
        })?
        .clone();
    debug!("Lineage column: {}", lineage_column);

    let targets = if targets.len() > options.max_genes {
        warn!("{} genes requested for lineage display, only the first {} are kept", targets.len(), options.max_genes);
        &targets[..options.max_genes]
    } else {
        targets
    };

    let labels = match table.column(&lineage_column) {
        Some(column) => column,
        None => return Err(AnalysisError::UnknownScoreColumn(lineage_column)),
    };

    let mut genes = Vec::new();
    let mut columns = Vec::new();
    let mut records = Vec::new();
    for (gene, column_name) in targets {
        let Some(values) = table.numeric(column_name) else {
            debug!("{} maps to missing or non numeric column {}, skipped", gene, column_name);
            continue;
        };
        genes.push(gene.clone());
        columns.push(column_name.clone());
        for (row, value) in values.iter().enumerate() {
            if let Some(score) = value {
                records.push(LineageRecord {
                    lineage: labels.label(row).unwrap_or_else(|| MISSING_LINEAGE.to_string()),
                    gene: gene.clone(),
                    column: column_name.clone(),
                    score: *score,
                });
            }
        }
    }

    if genes.is_empty() {
        return Err(AnalysisError::NoGenesResolved);
    }

    info!("{} lineage records for {} genes (column '{}')", records.len(), genes.len(), lineage_column);
    Ok(LineageData { lineage_column, genes, columns, records })
}

/// Per (score column, lineage) statistics, columns in data order and lineages sorted
pub fn summarize_lineages(data: &LineageData) -> Vec<LineageSummary> {
    let mut summaries = Vec::new();
    for (gene, column) in data.genes.iter().zip(&data.columns) {
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in data.records_for(column) {
            groups.entry(record.lineage.as_str()).or_default().push(record.score);
        }
        for (lineage, values) in groups {
            let mean = values.iter().mean();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let n = values.len();
            let mut ordered = Data::new(values);
            summaries.push(LineageSummary {
                gene: gene.clone(),
                column: column.clone(),
                lineage: lineage.to_string(),
                n,
                mean,
                median: ordered.median(),
                lower_quartile: ordered.lower_quartile(),
                upper_quartile: ordered.upper_quartile(),
                min,
                max,
            });
        }
    }
    summaries
}
