use crate::matcher::match_genes;
use crate::param::Param;
use crate::ranking::{GeneRankEntry, GeneRanking};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Essential / non-essential reference genes located in the ranking
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReferenceMarkers {
    pub essential_gene: String,
    pub essential: Vec<GeneRankEntry>,
    pub nonessential_gene: String,
    pub nonessential: Vec<GeneRankEntry>,
}

pub fn reference_markers(ranking: &GeneRanking, essential_gene: &str, nonessential_gene: &str) -> ReferenceMarkers {
    let essential: Vec<GeneRankEntry> = ranking.find(essential_gene).into_iter().cloned().collect();
    let nonessential: Vec<GeneRankEntry> = ranking.find(nonessential_gene).into_iter().cloned().collect();

    if essential.is_empty() {
        warn!("Essential reference gene {} is absent from the ranking", essential_gene);
    }
    if nonessential.is_empty() {
        warn!("Non-essential reference gene {} is absent from the ranking", nonessential_gene);
    }

    ReferenceMarkers {
        essential_gene: essential_gene.to_string(),
        essential,
        nonessential_gene: nonessential_gene.to_string(),
        nonessential,
    }
}

pub fn reference_markers_from_param(ranking: &GeneRanking, param: &Param) -> ReferenceMarkers {
    reference_markers(ranking, &param.ranking.essential_gene, &param.ranking.nonessential_gene)
}

/// Two gene sets drawn over the ranking: a background set and a highlighted set on top of it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LayeredAnnotation {
    /// Background matches that are not highlighted, ranking order
    pub background: Vec<GeneRankEntry>,
    /// Highlight matches, ranking order
    pub highlight: Vec<GeneRankEntry>,
    pub not_found: Vec<String>,
}

pub fn annotate_layers<S: AsRef<str>>(ranking: &GeneRanking, background: &[S], highlight: &[S]) -> LayeredAnnotation {
    let bg = match_genes(ranking, background);
    let hl = match_genes(ranking, highlight);

    let highlighted: HashSet<&str> = hl.matched.iter().map(|e| e.gene.as_str()).collect();
    let background: Vec<GeneRankEntry> = bg
        .matched
        .iter()
        .filter(|e| !highlighted.contains(e.gene.as_str()))
        .cloned()
        .collect();

    let mut not_found = bg.not_found;
    not_found.extend(hl.not_found);

    info!("Layers: {} background genes, {} highlighted genes", background.len(), hl.matched.len());

    LayeredAnnotation { background, highlight: hl.matched, not_found }
}
