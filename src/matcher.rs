use crate::error::Result;
use crate::ranking::{GeneRankEntry, GeneRanking};
use crate::table::is_missing;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneMatchResult {
    /// Ranking entries whose symbol was requested, in ranking order
    pub matched: Vec<GeneRankEntry>,
    /// Requests absent from the ranking, as typed and in input order
    pub not_found: Vec<String>,
}

impl GeneMatchResult {
    /// Matched symbols in their canonical (table) casing
    pub fn matched_symbols(&self) -> Vec<String> {
        self.matched.iter().map(|e| e.gene.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Resolves requested symbols against the ranking, ignoring case. Exact equality only.
pub fn match_genes<S: AsRef<str>>(ranking: &GeneRanking, requested: &[S]) -> GeneMatchResult {
    let requests: Vec<&str> = requested
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();
    let requested_upper: HashSet<String> = requests.iter().map(|s| s.to_uppercase()).collect();

    let matched: Vec<GeneRankEntry> = ranking
        .entries
        .iter()
        .filter(|e| requested_upper.contains(&e.gene_upper))
        .cloned()
        .collect();

    let matched_upper: HashSet<&str> = matched.iter().map(|e| e.gene_upper.as_str()).collect();
    let not_found: Vec<String> = requests
        .iter()
        .filter(|s| !matched_upper.contains(s.to_uppercase().as_str()))
        .map(|s| s.to_string())
        .collect();

    info!("{} ranking entries matched, {} requested genes not found", matched.len(), not_found.len());
    if !not_found.is_empty() {
        debug!("Not found: {}", not_found.join(", "));
    }

    GeneMatchResult { matched, not_found }
}

/// Splits free text on newlines, commas and whitespace
pub fn parse_gene_text(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// One gene per line
pub fn parse_gene_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// First column of a headered CSV, missing cells skipped
pub fn parse_gene_csv<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut genes = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if let Some(cell) = record.get(0) {
            if !is_missing(cell) {
                genes.push(cell.trim().to_string());
            }
        }
    }
    Ok(genes)
}

/// Reads a gene list file: `.csv` files use their first column, anything else one gene per line
pub fn read_gene_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let genes = if is_csv {
        parse_gene_csv(BufReader::new(File::open(path)?))?
    } else {
        parse_gene_lines(&std::fs::read_to_string(path)?)
    };

    if genes.is_empty() {
        warn!("Gene list {} is empty", path.display());
    } else {
        info!("Read {} genes from {}", genes.len(), path.display());
    }
    Ok(genes)
}
