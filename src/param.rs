use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub classifier: Classifier,
    #[serde(default)]
    pub ranking: Ranking,
    #[serde(default)]
    pub lineage: Lineage,
    #[serde(default)]
    pub layers: Layers,
    #[serde(default)]
    pub output: Output,
    #[serde(skip)]
    pub tag: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "one_default")]
    pub thread_number: usize,
    #[serde(default = "empty_string")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    /// Path of the cell line x gene score CSV
    #[serde(default = "empty_string")]
    pub scores: String,
    /// Opaque identifier of a remotely shared score file
    #[serde(default = "empty_string")]
    pub remote_file_id: String,
    #[serde(default = "remote_base_url_default")]
    pub remote_base_url: String,
    /// Genes of interest, newline / comma / space separated
    #[serde(default = "empty_string")]
    pub genes: String,
    /// Genes of interest from a file (.csv: first column, otherwise one per line)
    #[serde(default = "empty_string")]
    pub gene_list: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Classifier {
    #[serde(default = "min_non_missing_default")]
    pub min_non_missing: usize,
    #[serde(default = "mean_min_default")]
    pub mean_min: f64,
    #[serde(default = "mean_max_default")]
    pub mean_max: f64,
    #[serde(default = "min_std_default")]
    pub min_std: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ranking {
    #[serde(default = "essential_threshold_default")]
    pub essential_threshold: f64,
    #[serde(default = "essential_gene_default")]
    pub essential_gene: String,
    #[serde(default = "nonessential_gene_default")]
    pub nonessential_gene: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Lineage {
    #[serde(default = "lineage_keyword_default")]
    pub keyword: String,
    #[serde(default = "lineage_exclude_default")]
    pub exclude: String,
    #[serde(default = "max_genes_default")]
    pub max_genes: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Layers {
    #[serde(default = "empty_string")]
    pub background: String,
    #[serde(default = "empty_string")]
    pub highlight: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Output {
    /// Directory receiving ranking.csv, matches.csv and lineage.csv (empty: no export)
    #[serde(default = "empty_string")]
    pub directory: String,
    /// Report path, format chosen by extension (empty: no report)
    #[serde(default = "empty_string")]
    pub save_report: String,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Ranking {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Lineage {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Layers {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Output {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let param_file_reader = File::open(&param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;
    config.tag = param_file;
    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    if !param.general.log_base.is_empty() {
        param.general.display_colorful = false;
    }

    if param.general.thread_number == 0 {
        return Err("Invalid thread_number=0. Must be >= 1.".to_string());
    }

    validate_classifier(param)?;

    if param.lineage.max_genes == 0 {
        return Err("Invalid lineage.max_genes=0. Must be >= 1.".to_string());
    }

    if param.lineage.keyword.trim().is_empty() {
        return Err("lineage.keyword cannot be empty.".to_string());
    }

    if !param.data.genes.is_empty() && !param.data.gene_list.is_empty() {
        warn!("Both data.genes and data.gene_list are set: the gene list file will be appended to the inline genes.");
    }

    Ok(())
}

/// Checks that exactly one score source is configured (used by the binary before any loading)
pub fn validate_source(param: &Param) -> Result<(), String> {
    match (param.data.scores.is_empty(), param.data.remote_file_id.is_empty()) {
        (true, true) => Err("No score table configured: set either data.scores or data.remote_file_id.".to_string()),
        (false, false) => Err("Both data.scores and data.remote_file_id are set: choose one score source.".to_string()),
        _ => Ok(()),
    }
}

fn validate_classifier(param: &Param) -> Result<(), String> {
    let c = &param.classifier;
    if !(c.mean_min < c.mean_max) {
        return Err(format!(
            "Invalid classifier mean window ({:.3}, {:.3}). mean_min must be lower than mean_max.",
            c.mean_min, c.mean_max
        ));
    }
    if c.min_std < 0.0 {
        return Err(format!("Invalid classifier.min_std={:.3}. Must be >= 0.", c.min_std));
    }
    if c.min_non_missing < 2 {
        warn!(
            "classifier.min_non_missing={} lets single-value columns through: their standard deviation is undefined and they will be rejected anyway.",
            c.min_non_missing
        );
    }
    Ok(())
}

// Default value definitions

fn empty_string() -> String {
    "".to_string()
}

fn one_default() -> usize {
    1
}

fn true_default() -> bool {
    true
}

fn log_suffix_default() -> String {
    "log".to_string()
}

fn log_level_default() -> String {
    "info".to_string()
}

fn remote_base_url_default() -> String {
    "https://drive.google.com/uc".to_string()
}

fn min_non_missing_default() -> usize {
    10
}

fn mean_min_default() -> f64 {
    -5.0
}

fn mean_max_default() -> f64 {
    2.0
}

fn min_std_default() -> f64 {
    0.01
}

fn essential_threshold_default() -> f64 {
    -0.5
}

fn essential_gene_default() -> String {
    "MYC".to_string()
}

fn nonessential_gene_default() -> String {
    "PTEN".to_string()
}

fn lineage_keyword_default() -> String {
    "lineage".to_string()
}

fn lineage_exclude_default() -> String {
    "sub".to_string()
}

fn max_genes_default() -> usize {
    8
}
