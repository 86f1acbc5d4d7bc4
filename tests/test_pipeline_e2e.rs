/// End-to-End Integration Test for the dependency ranking pipeline
///
/// This test validates the complete workflow on the fixture table:
/// 1. Loading and classifying the score table
/// 2. Ranking genes by mean dependency score
/// 3. Matching a user gene list
/// 4. Building lineage records and summaries
/// 5. Saving and reloading the report
///
/// Run with: cargo test --test test_pipeline_e2e -- --nocapture
use crisprank::classifier::{classify, Thresholds};
use crisprank::error::AnalysisError;
use crisprank::fetch::{load_remote, RemoteFetcher};
use crisprank::lineage::{aggregate_lineages, LineageOptions};
use crisprank::matcher::match_genes;
use crisprank::param::Param;
use crisprank::ranking::build_ranking;
use crisprank::report::Report;
use crisprank::table::{Column, ScoreTable};
use crisprank::{run, run_on_table, string_vec};

const FIXTURE: &str = "samples/tests/scores.csv";

fn fixture_params() -> Param {
    let mut param = Param::default();
    param.general.display_colorful = false;
    param.data.scores = FIXTURE.to_string();
    param.data.genes = "myc, Foo\nPTEN".to_string();
    param
}

#[test]
fn test_ranking_invariants_on_fixture() {
    let table = ScoreTable::load(FIXTURE).unwrap();
    let classification = classify(&table, &Thresholds::default(), 4).unwrap();
    let ranking = build_ranking(&table, &classification.score_columns).unwrap();

    assert_eq!(ranking.len(), classification.score_columns.len(), "one ranking row per score column");
    let ranks: Vec<usize> = ranking.entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, (1..=ranking.len()).collect::<Vec<_>>(), "ranks must be 1..N");
    assert!(ranking.entries.windows(2).all(|w| w[0].mean_score <= w[1].mean_score));

    let n = ranking.len() as f64;
    assert!((ranking.entries[0].percentile - 100.0 / n).abs() < 1e-12, "percentile of rank 1 is 100/N");
    assert_eq!(ranking.entries[ranking.len() - 1].percentile, 100.0, "percentile of rank N is 100");
}

#[test]
fn test_three_row_two_column_table() {
    // below the classifier minimum on purpose: the rank builder only needs the column list
    let table = ScoreTable::from_columns(
        vec!["Lineage".into(), "G1 (1)".into(), "G2 (2)".into()],
        vec![
            Column::Text(vec![Some("Lung".into()), Some("Skin".into()), Some("Lung".into())]),
            Column::Numeric(vec![Some(-2.5), Some(-1.5), Some(-2.0)]),
            Column::Numeric(vec![Some(0.5), Some(0.4), Some(0.6)]),
        ],
    )
    .unwrap();
    let score_columns: Vec<String> = string_vec!["G1 (1)", "G2 (2)"];
    let ranking = build_ranking(&table, &score_columns).unwrap();

    assert_eq!(ranking.entries.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(ranking.entries.iter().map(|e| e.gene.as_str()).collect::<Vec<_>>(), vec!["G1", "G2"]);
    assert!((ranking.entries[0].mean_score + 2.0).abs() < 1e-12);
    assert!((ranking.entries[1].mean_score - 0.5).abs() < 1e-12);
    assert_eq!(ranking.entries.iter().map(|e| e.percentile).collect::<Vec<_>>(), vec![50.0, 100.0]);
}

#[test]
fn test_match_then_lineage() {
    let table = ScoreTable::load(FIXTURE).unwrap();
    let classification = classify(&table, &Thresholds::default(), 1).unwrap();
    let ranking = build_ranking(&table, &classification.score_columns).unwrap();

    let result = match_genes(&ranking, &["myc", "Foo", "PTEN"]);
    assert_eq!(result.matched_symbols(), vec!["MYC", "PTEN"]);
    assert_eq!(result.not_found, vec!["Foo"]);

    let lineage = aggregate_lineages(&table, &result.matched_symbols(), &LineageOptions::default()).unwrap();
    assert_eq!(lineage.lineage_column, "Lineage", "Lineage_Sub_type must not be chosen");
    assert_eq!(lineage.records.len(), 24);
    assert!(lineage.records.iter().take(12).all(|r| r.gene == "MYC"));
    assert!(lineage.records.iter().skip(12).all(|r| r.gene == "PTEN"));
}

#[test]
fn test_run_end_to_end() {
    let report = run(&fixture_params()).unwrap();

    assert_eq!(report.summary.n_cell_lines, 12);
    assert_eq!(report.summary.n_genes, 6);
    assert_eq!(report.summary.n_essential, 3);

    let matches = report.matches.as_ref().unwrap();
    assert_eq!(matches.matched_symbols(), vec!["MYC", "PTEN"]);
    assert_eq!(matches.not_found, vec!["Foo"]);

    assert_eq!(report.references.essential[0].gene, "MYC");
    assert_eq!(report.references.nonessential[0].gene, "PTEN");
    assert!(report.layers.is_none(), "no layers configured");

    let lineage = report.lineage.as_ref().unwrap();
    assert_eq!(lineage.genes, vec!["MYC", "PTEN"]);
    assert_eq!(report.lineage_summary.len(), 6, "2 genes x 3 lineages");
    assert!(report.lineage_unavailable.is_none());
    assert!(report.id.starts_with("scores_"));
}

#[test]
fn test_run_without_lineage_column_degrades() {
    let mut csv = String::from("ModelID,MYC (4609),PTEN (5728)\n");
    for i in 0..12 {
        csv.push_str(&format!("ACH-{},{},{}\n", i, -1.5 - (i % 2) as f64, 0.2 + 0.2 * (i % 2) as f64));
    }
    let table = ScoreTable::from_bytes(csv.as_bytes()).unwrap();
    let report = run_on_table(table, "memory.csv", &fixture_params()).unwrap();

    assert!(report.lineage.is_none());
    assert!(report.lineage_summary.is_empty());
    let reason = report.lineage_unavailable.as_ref().unwrap();
    assert!(reason.contains("no lineage column"), "{}", reason);
    assert_eq!(report.matches.unwrap().matched.len(), 2, "matching still works without lineage data");
}

#[test]
fn test_run_rejects_table_without_scores() {
    let table = ScoreTable::from_bytes(b"ModelID,Age\nA,40\nB,50\n").unwrap();
    match run_on_table(table, "memory.csv", &fixture_params()) {
        Err(AnalysisError::NoScoreColumnsFound { diagnostic }) => assert!(diagnostic.contains("Age")),
        other => panic!("expected NoScoreColumnsFound, got {:?}", other.map(|r| r.id)),
    }
}

#[test]
fn test_run_requires_a_source() {
    let mut param = fixture_params();
    param.data.scores = String::new();
    assert!(run(&param).is_err());
}

struct FixtureFetcher;

impl RemoteFetcher for FixtureFetcher {
    fn fetch(&self, _file_id: &str) -> Result<Vec<u8>, AnalysisError> {
        Ok(std::fs::read(FIXTURE)?)
    }
}

#[test]
fn test_remote_table_gives_same_report() {
    let local = ScoreTable::load(FIXTURE).unwrap();
    let remote = load_remote(&FixtureFetcher, "1NMi9mbF51yJ").unwrap();
    assert_eq!(local.fingerprint(), remote.fingerprint(), "the download path must yield the same table");

    let param = fixture_params();
    let a = run_on_table(local, FIXTURE, &param).unwrap();
    let b = run_on_table(remote, "remote:1NMi9mbF51yJ", &param).unwrap();
    assert_eq!(a.ranking, b.ranking);
    assert_eq!(a.matches, b.matches);
}

#[test]
fn test_report_roundtrip_from_run() {
    let mut param = fixture_params();
    param.layers.background = "CDK1, CDK2, CCNB1".to_string();
    param.layers.highlight = "KIF18A, E2F8".to_string();
    let report = run(&param).unwrap();

    let layers = report.layers.as_ref().unwrap();
    assert_eq!(layers.background.len(), 1);
    assert_eq!(layers.highlight.len(), 2);

    let path = std::env::temp_dir().join(format!("crisprank_e2e_{}.bin", std::process::id()));
    report.save_auto(&path).unwrap();
    let loaded = Report::load_auto(&path).unwrap();
    assert_eq!(report, loaded);
    std::fs::remove_file(&path).unwrap();
}
