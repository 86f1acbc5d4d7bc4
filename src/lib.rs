pub mod annotation;
pub mod classifier;
pub mod error;
pub mod fetch;
pub mod lineage;
pub mod matcher;
pub mod param;
pub mod ranking;
pub mod report;
pub mod session;
pub mod table;
pub mod utils;

use crate::annotation::reference_markers_from_param;
use crate::error::AnalysisError;
use crate::fetch::{load_remote, HttpFetcher};
use crate::lineage::summarize_lineages;
use crate::matcher::{parse_gene_text, read_gene_list};
use crate::report::Report;
use crate::session::Session;
use crate::table::ScoreTable;
use chrono::Local;
use param::Param;

use log::{debug, warn};

use std::error::Error;

/// Loads the configured score table (local CSV or remote file) and analyses it
pub fn run(param: &Param) -> Result<Report, Box<dyn Error>> {
    param::validate_source(param)?;

    let (table, source) = if !param.data.scores.is_empty() {
        (ScoreTable::load(&param.data.scores)?, param.data.scores.clone())
    } else {
        let fetcher = HttpFetcher::new(&param.data.remote_base_url)?;
        let table = load_remote(&fetcher, &param.data.remote_file_id)?;
        (table, format!("remote:{}", param.data.remote_file_id))
    };
    crate::cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", table);

    Ok(run_on_table(table, &source, param)?)
}

/// Genes of interest from the inline list followed by the gene list file
pub fn collect_genes(param: &Param) -> Result<Vec<String>, AnalysisError> {
    let mut genes = parse_gene_text(&param.data.genes);
    if !param.data.gene_list.is_empty() {
        genes.extend(read_gene_list(&param.data.gene_list)?);
    }
    Ok(genes)
}

/// Full pass over an already loaded table: ranking, matching, annotation and lineage data
pub fn run_on_table(table: ScoreTable, source: &str, param: &Param) -> Result<Report, AnalysisError> {
    let start = std::time::Instant::now();
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    let mut session = Session::new(param);
    session.load_table(table);

    let ranking = session.ranking()?;
    let summary = ranking.summary(param.ranking.essential_threshold);
    crate::cinfo!(
        param.general.display_colorful,
        "\x1b[1;97m{} genes ranked over {} cell lines\x1b[0m ({} essential)",
        summary.n_genes,
        summary.n_cell_lines,
        summary.n_essential
    );

    let references = reference_markers_from_param(&ranking, param);

    let genes = collect_genes(param)?;
    let matches = if genes.is_empty() {
        debug!("No genes of interest given");
        None
    } else {
        Some(session.submit_genes(&genes)?)
    };

    let background = parse_gene_text(&param.layers.background);
    let highlight = parse_gene_text(&param.layers.highlight);
    let layers = if background.is_empty() && highlight.is_empty() {
        None
    } else {
        Some(session.annotate_layers(&background, &highlight)?)
    };

    let mut lineage = None;
    let mut lineage_unavailable = None;
    if matches.as_ref().map(|m| !m.matched.is_empty()).unwrap_or(false) {
        match session.lineage(&genes) {
            Ok(data) => lineage = Some(data),
            Err(e) if e.is_recoverable() => {
                warn!("Lineage data unavailable: {}", e);
                lineage_unavailable = Some(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }
    let lineage_summary = lineage.as_ref().map(summarize_lineages).unwrap_or_default();

    let stem = std::path::Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("analysis")
        .to_string();

    Ok(Report {
        id: format!("{}_{}", stem, timestamp),
        crisprank_version: report::version(),
        timestamp,
        source: source.to_string(),
        essential_threshold: param.ranking.essential_threshold,
        summary,
        ranking: (*ranking).clone(),
        matches,
        references,
        layers,
        lineage,
        lineage_summary,
        lineage_unavailable,
        execution_time: start.elapsed().as_secs_f64(),
    })
}
