use crate::annotation::{annotate_layers, LayeredAnnotation};
use crate::classifier::{classify, Classification, Thresholds};
use crate::error::{AnalysisError, Result};
use crate::lineage::{aggregate_columns, LineageData, LineageOptions};
use crate::matcher::{match_genes, GeneMatchResult};
use crate::param::Param;
use crate::ranking::{build_ranking, GeneRanking};
use crate::table::ScoreTable;
use log::{debug, info};
use std::sync::Arc;

/// Everything derived from one table, memoized against the table fingerprint
struct Derived {
    fingerprint: String,
    classification: Arc<Classification>,
    ranking: Arc<GeneRanking>,
}

/// Session-scoped context: the loaded table and its cached ranking.
/// Events (table loaded, gene list submitted) trigger explicit recomputation.
pub struct Session {
    thresholds: Thresholds,
    lineage_options: LineageOptions,
    thread_number: usize,
    table: Option<Arc<ScoreTable>>,
    derived: Option<Derived>,
    rankings_computed: usize,
}

impl Session {
    pub fn new(param: &Param) -> Session {
        Session {
            thresholds: Thresholds::from_param(param),
            lineage_options: LineageOptions::from_param(param),
            thread_number: param.general.thread_number,
            table: None,
            derived: None,
            rankings_computed: 0,
        }
    }

    /// Replaces the current table wholesale
    pub fn load_table(&mut self, table: ScoreTable) {
        info!("Session table: {} samples x {} columns", table.row_len, table.col_len());
        self.table = Some(Arc::new(table));
    }

    pub fn table(&self) -> Result<Arc<ScoreTable>> {
        self.table.clone().ok_or(AnalysisError::NoTableLoaded)
    }

    fn ensure_derived(&mut self) -> Result<&Derived> {
        let table = self.table()?;
        let fresh = matches!(&self.derived, Some(d) if d.fingerprint == table.fingerprint());
        if !fresh {
            debug!("Computing ranking for table {}", table.fingerprint());
            let classification = classify(&table, &self.thresholds, self.thread_number)?;
            let ranking = build_ranking(&table, &classification.score_columns)?;
            self.rankings_computed += 1;
            self.derived = Some(Derived {
                fingerprint: table.fingerprint().to_string(),
                classification: Arc::new(classification),
                ranking: Arc::new(ranking),
            });
        }
        self.derived.as_ref().ok_or(AnalysisError::NoTableLoaded)
    }

    pub fn classification(&mut self) -> Result<Arc<Classification>> {
        Ok(self.ensure_derived()?.classification.clone())
    }

    /// Ranking of the current table, computed at most once per distinct table
    pub fn ranking(&mut self) -> Result<Arc<GeneRanking>> {
        Ok(self.ensure_derived()?.ranking.clone())
    }

    /// Number of times a ranking had to be computed in this session
    pub fn rankings_computed(&self) -> usize {
        self.rankings_computed
    }

    pub fn submit_genes<S: AsRef<str>>(&mut self, genes: &[S]) -> Result<GeneMatchResult> {
        let ranking = self.ranking()?;
        Ok(match_genes(&ranking, genes))
    }

    /// Lineage records of the requested genes that exist in the ranking, read from
    /// the exact columns the ranking entries came from
    pub fn lineage<S: AsRef<str>>(&mut self, genes: &[S]) -> Result<LineageData> {
        let targets: Vec<(String, String)> = self
            .submit_genes(genes)?
            .matched
            .into_iter()
            .map(|entry| (entry.gene, entry.raw_column))
            .collect();
        let table = self.table()?;
        aggregate_columns(&table, &targets, &self.lineage_options)
    }

    pub fn annotate_layers<S: AsRef<str>>(&mut self, background: &[S], highlight: &[S]) -> Result<LayeredAnnotation> {
        let ranking = self.ranking()?;
        Ok(annotate_layers(&ranking, background, highlight))
    }
}
