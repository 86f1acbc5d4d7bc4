use crate::annotation::{LayeredAnnotation, ReferenceMarkers};
use crate::lineage::{LineageData, LineageSummary};
use crate::matcher::GeneMatchResult;
use crate::ranking::{GeneRanking, RankingSummary};
use crate::utils::{strip_ansi_if_needed, truncate};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Everything produced by one analysis pass, ready for a presentation layer
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Report {
    pub id: String,
    pub crisprank_version: String,
    pub timestamp: String,
    pub source: String,
    pub essential_threshold: f64,

    pub summary: RankingSummary,
    pub ranking: GeneRanking,
    pub matches: Option<GeneMatchResult>,
    pub references: ReferenceMarkers,
    pub layers: Option<LayeredAnnotation>,

    pub lineage: Option<LineageData>,
    pub lineage_summary: Vec<LineageSummary>,
    /// Why lineage data is absent, when it was requested but could not be built
    pub lineage_unavailable: Option<String>,

    pub execution_time: f64,
}

#[derive(Serialize)]
struct MatchRow<'a> {
    gene: &'a str,
    raw_column: &'a str,
    rank: usize,
    percentile: f64,
    mean_score: f64,
    essential: bool,
}

pub fn version() -> String {
    format!("{}#{}", env!("CARGO_PKG_VERSION"), option_env!("CRISPRANK_GIT_SHA").unwrap_or("unknown"))
}

impl Report {
    /// Terminal summary: dataset metrics, matched genes and their detail rows
    pub fn display(&self, colorful: bool) -> String {
        let mut text = String::new();
        text.push_str(&format!("\n=============== Analysis {} ===============\n\n", self.id));
        text.push_str(&format!("crisprank version: v{}\n", self.crisprank_version));
        text.push_str(&format!("Timestamp: {}\n", self.timestamp));
        text.push_str(&format!("Source: {}\n", self.source));
        text.push_str(&format!("Execution time: {:.2}s\n\n", self.execution_time));

        let s = &self.summary;
        text.push_str(&format!(
            "Cell lines: {}   Genes: {}   Essential genes (mean < {}): {}   Score range: {:.2} ~ {:.2}\n",
            s.n_cell_lines, s.n_genes, self.essential_threshold, s.n_essential, s.min_score, s.max_score
        ));

        for (label, gene, entries) in [
            ("Essential reference", &self.references.essential_gene, &self.references.essential),
            ("Non-essential reference", &self.references.nonessential_gene, &self.references.nonessential),
        ] {
            match entries.first() {
                Some(e) => text.push_str(&format!(
                    "{} {}: rank {} / {} (mean {:.4})\n",
                    label, gene, e.rank, s.n_genes, e.mean_score
                )),
                None => text.push_str(&format!("{} {}: absent\n", label, gene)),
            }
        }

        if let Some(matches) = &self.matches {
            text.push_str("\n\x1b[1;93mGenes of interest\x1b[0m\n");
            if matches.matched.is_empty() {
                text.push_str("No requested gene found in the ranking\n");
            } else {
                text.push_str(&format!("Matched: {}\n", matches.matched_symbols().join(" ")));
                text.push_str(&format!("{:<16} {:>8} {:>11} {:>11}  {}\n", "Gene", "Rank", "Percentile", "Mean score", "Essential"));
                let mut detail = matches.matched.clone();
                detail.sort_by(|a, b| a.mean_score.partial_cmp(&b.mean_score).unwrap_or(std::cmp::Ordering::Equal));
                for e in &detail {
                    let flag = if e.is_essential(self.essential_threshold) {
                        "\x1b[1;91mYes\x1b[0m"
                    } else {
                        "No"
                    };
                    text.push_str(&format!(
                        "{:<16} {:>8} {:>10.4}% {:>11.4}  {}\n",
                        truncate(&e.gene, 16), e.rank, e.percentile, e.mean_score, flag
                    ));
                }
            }
            if !matches.not_found.is_empty() {
                text.push_str(&format!("\x1b[2;97mNot found ({}): {}\x1b[0m\n", matches.not_found.len(), matches.not_found.join(", ")));
            }
        }

        if let Some(layers) = &self.layers {
            text.push_str(&format!(
                "\nLayers: background {} | highlight {}\n",
                layers.background.len(),
                layers.highlight.len()
            ));
        }

        if !self.lineage_summary.is_empty() {
            text.push_str("\n\x1b[1;93mScore by lineage\x1b[0m\n");
            text.push_str(&format!("{:<16} {:<20} {:>5} {:>9} {:>9} {:>9} {:>9}\n", "Column", "Lineage", "n", "Median", "Q1", "Q3", "Mean"));
            for l in &self.lineage_summary {
                text.push_str(&format!(
                    "{:<16} {:<20} {:>5} {:>9.3} {:>9.3} {:>9.3} {:>9.3}\n",
                    truncate(&l.column, 16), truncate(&l.lineage, 20), l.n, l.median, l.lower_quartile, l.upper_quartile, l.mean
                ));
            }
        } else if let Some(reason) = &self.lineage_unavailable {
            text.push_str(&format!("\nLineage data unavailable: {}\n", reason));
        }

        strip_ansi_if_needed(&text, colorful)
    }

    /// Writes ranking.csv, matches.csv and lineage.csv into `dir`
    pub fn export_csv<P: AsRef<Path>>(&self, dir: P) -> Result<(), Box<dyn Error>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut writer = csv::Writer::from_path(dir.join("ranking.csv"))?;
        for entry in &self.ranking.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;

        if let Some(matches) = &self.matches {
            let mut writer = csv::Writer::from_path(dir.join("matches.csv"))?;
            for e in &matches.matched {
                writer.serialize(MatchRow {
                    gene: &e.gene,
                    raw_column: &e.raw_column,
                    rank: e.rank,
                    percentile: e.percentile,
                    mean_score: e.mean_score,
                    essential: e.is_essential(self.essential_threshold),
                })?;
            }
            writer.flush()?;
        }

        if let Some(lineage) = &self.lineage {
            let mut writer = csv::Writer::from_path(dir.join("lineage.csv"))?;
            for record in &lineage.records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }

        info!("Tables exported to {}", dir.display());
        Ok(())
    }

    /// Saves the report in a suitable format based on file extension.
    pub fn save_auto<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "json" => self.save_json(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving report in json.");
                self.save_json(path.with_extension("json"))
            }
        }
    }

    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Saves as Bincode (compact binary, Rust-only)
    fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads a report, the format being detected from the file extension.
    pub fn load_auto<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "json" => Self::load_json(path),
            "bin" | "bincode" => Self::load_bincode(path),
            _ => Self::load_with_fallback(path),
        }
    }

    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let content = std::fs::read_to_string(path)?;
        let report: Report = serde_json::from_str(&content)?;
        Ok(report)
    }

    fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let bytes = std::fs::read(path)?;
        let report: Report = bincode::deserialize(&bytes)?;
        Ok(report)
    }

    /// Tries Bincode, then JSON.
    fn load_with_fallback<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();

        if let Ok(report) = Self::load_bincode(path) {
            return Ok(report);
        }

        if let Ok(report) = Self::load_json(path) {
            return Ok(report);
        }

        Err("Unable to load the report".into())
    }
}
