use crate::error::{AnalysisError, Result};
use crate::table::ScoreTable;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::sync::OnceLock;

fn symbol_regex() -> &'static Regex {
    static SYMBOL: OnceLock<Regex> = OnceLock::new();
    SYMBOL.get_or_init(|| Regex::new(r"^([A-Za-z0-9_.-]+)\s*\(").unwrap())
}

/// Extracts the gene symbol of a `SYMBOL (ID)` column name, the name itself otherwise
pub fn extract_symbol(column_name: &str) -> String {
    match symbol_regex().captures(column_name) {
        Some(captures) => captures[1].to_string(),
        None => column_name.to_string(),
    }
}

/// Mean of the non-missing values, NaN when there is none
pub fn column_mean(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().mean()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneRankEntry {
    pub raw_column: String,
    pub gene: String,
    pub mean_score: f64,
    pub rank: usize,
    pub percentile: f64,
    pub gene_upper: String,
}

impl GeneRankEntry {
    pub fn is_essential(&self, threshold: f64) -> bool {
        self.mean_score < threshold
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RankingSummary {
    pub n_cell_lines: usize,
    pub n_genes: usize,
    pub n_essential: usize,
    pub min_score: f64,
    pub max_score: f64,
}

/// Genes sorted from most to least essential. Built once per table, never modified.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneRanking {
    pub entries: Vec<GeneRankEntry>,
    pub n_cell_lines: usize,
    pub table_fingerprint: String,
}

impl GeneRanking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose symbol equals `symbol`, ignoring case
    pub fn find(&self, symbol: &str) -> Vec<&GeneRankEntry> {
        let upper = symbol.trim().to_uppercase();
        self.entries.iter().filter(|e| e.gene_upper == upper).collect()
    }

    pub fn summary(&self, essential_threshold: f64) -> RankingSummary {
        let scores: Vec<f64> = self.entries.iter().map(|e| e.mean_score).filter(|s| !s.is_nan()).collect();
        RankingSummary {
            n_cell_lines: self.n_cell_lines,
            n_genes: self.entries.len(),
            n_essential: self.entries.iter().filter(|e| e.is_essential(essential_threshold)).count(),
            min_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

// NaN means (columns without values) go last so that ranks stay contiguous
fn compare_means(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Ranks score columns by ascending mean (rank 1 = most negative = most essential).
/// Equal means keep the column order. Symbols are not de-duplicated.
pub fn build_ranking(table: &ScoreTable, score_columns: &[String]) -> Result<GeneRanking> {
    let mut means: Vec<(&String, f64)> = Vec::with_capacity(score_columns.len());
    for name in score_columns {
        let values = table
            .numeric(name)
            .ok_or_else(|| AnalysisError::UnknownScoreColumn(name.clone()))?;
        means.push((name, column_mean(values)));
    }

    means.sort_by(|a, b| compare_means(a.1, b.1));

    let total = means.len();
    let entries: Vec<GeneRankEntry> = means
        .into_iter()
        .enumerate()
        .map(|(i, (name, mean_score))| {
            let gene = extract_symbol(name);
            let gene_upper = gene.to_uppercase();
            GeneRankEntry {
                raw_column: name.clone(),
                gene,
                mean_score,
                rank: i + 1,
                percentile: (i + 1) as f64 / total as f64 * 100.0,
                gene_upper,
            }
        })
        .collect();

    info!("Ranked {} genes over {} cell lines", entries.len(), table.row_len);

    Ok(GeneRanking {
        entries,
        n_cell_lines: table.row_len,
        table_fingerprint: table.fingerprint().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, Thresholds};
    use crate::table::Column;

    fn column(values: &[f64]) -> Column {
        Column::Numeric(values.iter().map(|v| Some(*v)).collect())
    }

    fn fixture_ranking() -> GeneRanking {
        let table = ScoreTable::load("samples/tests/scores.csv").unwrap();
        let classification = classify(&table, &Thresholds::default(), 1).unwrap();
        build_ranking(&table, &classification.score_columns).unwrap()
    }

    #[test]
    fn test_extract_symbol() {
        assert_eq!(extract_symbol("MYC (4609)"), "MYC");
        assert_eq!(extract_symbol("PTEN"), "PTEN", "names without parenthesis are kept unchanged");
        assert_eq!(extract_symbol("ABC-1 (100)"), "ABC-1");
        assert_eq!(extract_symbol("HLA.A(3105)"), "HLA.A", "the space before the parenthesis is optional");
        assert_eq!(extract_symbol("two words (1)"), "two words (1)", "the symbol must start the name and contain no space");
    }

    #[test]
    fn test_two_column_ranks_and_percentiles() {
        let table = ScoreTable::from_columns(
            vec!["A (1)".into(), "B (2)".into()],
            vec![column(&[-1.0, -2.0, -3.0]), column(&[0.0, 0.5, 1.0])],
        )
        .unwrap();
        let ranking = build_ranking(&table, &["A (1)".to_string(), "B (2)".to_string()]).unwrap();

        assert_eq!(ranking.entries.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ranking.entries.iter().map(|e| e.gene.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(ranking.entries[0].mean_score, -2.0);
        assert_eq!(ranking.entries[1].mean_score, 0.5);
        assert_eq!(ranking.entries.iter().map(|e| e.percentile).collect::<Vec<_>>(), vec![50.0, 100.0]);
        assert_eq!(ranking.n_cell_lines, 3);
    }

    #[test]
    fn test_sort_is_ascending_whatever_the_column_order() {
        let table = ScoreTable::from_columns(
            vec!["late".into(), "early".into()],
            vec![column(&[0.4, 0.6]), column(&[-1.5, -2.5])],
        )
        .unwrap();
        let ranking = build_ranking(&table, &table.names.clone()).unwrap();
        assert_eq!(ranking.entries[0].raw_column, "early");
        assert_eq!(ranking.entries[1].raw_column, "late");
    }

    #[test]
    fn test_ties_keep_column_order() {
        let table = ScoreTable::from_columns(
            vec!["b".into(), "a".into(), "c".into()],
            vec![column(&[-1.0, 1.0]), column(&[1.0, -1.0]), column(&[-3.0, -1.0])],
        )
        .unwrap();
        let ranking = build_ranking(&table, &table.names.clone()).unwrap();
        let order: Vec<&str> = ranking.entries.iter().map(|e| e.raw_column.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"], "equal means must keep the original column order");
    }

    #[test]
    fn test_duplicate_symbols_are_kept() {
        let table = ScoreTable::from_columns(
            vec!["TP53 (7157)".into(), "TP53 (999)".into()],
            vec![column(&[-1.0, -1.2]), column(&[0.1, 0.2])],
        )
        .unwrap();
        let ranking = build_ranking(&table, &table.names.clone()).unwrap();
        assert_eq!(ranking.len(), 2, "one entry per score column, no de-duplication");
        assert_eq!(ranking.find("tp53").len(), 2);
    }

    #[test]
    fn test_missing_values_are_ignored_and_empty_columns_go_last() {
        let table = ScoreTable::from_columns(
            vec!["empty".into(), "sparse".into()],
            vec![Column::Numeric(vec![None, None]), Column::Numeric(vec![Some(-1.0), None])],
        )
        .unwrap();
        let ranking = build_ranking(&table, &table.names.clone()).unwrap();
        assert_eq!(ranking.entries[0].raw_column, "sparse");
        assert_eq!(ranking.entries[0].mean_score, -1.0);
        assert!(ranking.entries[1].mean_score.is_nan());
        assert_eq!(ranking.entries[1].rank, 2);
    }

    #[test]
    fn test_unknown_score_column() {
        let table = ScoreTable::from_bytes(b"label,score\na,1\n").unwrap();
        assert!(matches!(
            build_ranking(&table, &["label".to_string()]),
            Err(AnalysisError::UnknownScoreColumn(name)) if name == "label"
        ));
        assert!(build_ranking(&table, &["nope".to_string()]).is_err());
    }

    #[test]
    fn test_fixture_ranking_properties() {
        let ranking = fixture_ranking();
        let genes: Vec<&str> = ranking.entries.iter().map(|e| e.gene.as_str()).collect();
        assert_eq!(genes, vec!["CDK1", "MYC", "KIF18A", "E2F8", "E2F1", "PTEN"]);

        for (i, entry) in ranking.entries.iter().enumerate() {
            assert_eq!(entry.rank, i + 1, "ranks must be contiguous from 1");
            assert_eq!(entry.gene_upper, entry.gene.to_uppercase());
        }
        for pair in ranking.entries.windows(2) {
            assert!(pair[0].mean_score <= pair[1].mean_score, "mean must not decrease with rank");
        }

        let n = ranking.len() as f64;
        assert!((ranking.entries[0].percentile - 100.0 / n).abs() < 1e-12);
        assert_eq!(ranking.entries.last().unwrap().percentile, 100.0);
        assert!((ranking.entries[1].mean_score + 2.0).abs() < 1e-9, "MYC mean is -2");
    }

    #[test]
    fn test_summary() {
        let summary = fixture_ranking().summary(-0.5);
        assert_eq!(summary.n_cell_lines, 12);
        assert_eq!(summary.n_genes, 6);
        assert_eq!(summary.n_essential, 3, "CDK1, MYC and KIF18A are below -0.5");
        assert!((summary.min_score + 3.0).abs() < 1e-9);
        assert!((summary.max_score - 0.3).abs() < 1e-9);
    }
}
