use thiserror::Error;

/// Failures surfaced by the analysis pipeline.
///
/// Only `NoScoreColumnsFound` stops the processing of a table. Lineage and gene
/// resolution failures disable the lineage output and the rest of the analysis goes on.
/// Genes absent from the ranking are not errors: they come back in `GeneMatchResult::not_found`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no column looks like a dependency score column\n{diagnostic}")]
    NoScoreColumnsFound { diagnostic: String },

    #[error("no lineage column found among {n_columns} columns (looked for names containing '{keyword}' but not '{exclude}')")]
    NoLineageColumnFound { n_columns: usize, keyword: String, exclude: String },

    #[error("none of the requested genes could be mapped back to a score column")]
    NoGenesResolved,

    #[error("column '{0}' is missing or not numeric")]
    UnknownScoreColumn(String),

    #[error("remote fetch failed: {0}")]
    RemoteFetchFailed(String),

    #[error("no score table loaded in this session")]
    NoTableLoaded,

    #[error("table is empty: {0}")]
    EmptyTable(String),

    #[error("cannot start the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// True when the failure only disables one output (lineage data) instead of the whole table
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::NoLineageColumnFound { .. } | AnalysisError::NoGenesResolved
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
