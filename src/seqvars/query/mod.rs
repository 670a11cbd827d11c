//! Code implementing the "seqvars query" sub command.

pub mod builder;
pub mod combiner;
pub mod extender;
pub mod genotype;
pub mod output;
pub mod parts;
pub mod prefetch;
pub mod ranking;
pub mod schema;
pub mod sorting;
pub mod statement;
pub mod store;
pub mod value;

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use clap::{command, Parser};
use thousands::Separable;

use crate::common::trace_rss_now;

use self::{
    builder::QueryPurpose,
    prefetch::{CasePrefetchQuery, ProjectPrefetchQuery},
    ranking::{Ranker, ScoreKind, ScoreMaps},
    schema::case::{Case, Project},
    schema::settings::{FlatSettings, QuerySettings},
    statement::{ExecContext, ResultRow},
    store::{AnnotationCatalog, InMemoryStore},
};

/// Command line arguments for `seqvars query` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run query for seqvars", long_about = None)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["path_case", "path_project"])
))]
pub struct Args {
    /// Path to case JSON file.
    #[arg(long)]
    pub path_case: Option<String>,
    /// Path to project JSON file; runs a project-wide query.
    #[arg(long)]
    pub path_project: Option<String>,
    /// Path to JSON file with the flat query settings.
    #[arg(long)]
    pub path_settings: Option<String>,
    /// Path to JSON Lines file with the variant records.
    #[arg(long, required = true)]
    pub path_variants: String,
    /// Path to JSON file with the reference and annotation tables.
    #[arg(long)]
    pub path_catalog: Option<String>,
    /// Path to JSON file with the scores to rank by.
    #[arg(long)]
    pub path_scores: Option<String>,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: String,

    /// Purpose of the query, selects the extenders.
    #[arg(long, value_enum, default_value_t = QueryPurpose::Filter)]
    pub purpose: QueryPurpose,
    /// Query whose stored results to reload with `--purpose prefetched`.
    #[arg(long)]
    pub query_id: Option<uuid::Uuid>,
    /// Scores to rank by, applied in the given order.
    #[arg(long, value_enum)]
    pub rank_by: Vec<ScoreKind>,
    /// Optional maximal number of total records to write out.
    #[arg(long)]
    pub max_results: Option<usize>,
}

/// Utility struct to store statistics about counts.
#[derive(Debug, Default)]
struct QueryStats {
    pub count_passed: usize,
    pub count_total: usize,
    pub count_genes: usize,
}

impl QueryStats {
    fn new(count_total: usize, rows: &[ResultRow]) -> Self {
        Self {
            count_passed: rows.len(),
            count_total,
            count_genes: rows
                .iter()
                .filter_map(ResultRow::gene_id)
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

/// Load a JSON file into `T`.
fn load_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, anyhow::Error> {
    let reader = std::io::BufReader::new(
        std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {}: {}", path, e))?,
    );
    serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("invalid JSON in {}: {}", path, e))
}

/// Warn about pedigree problems; they are not fatal to the query.
fn check_pedigree(case: &Case) {
    if let Err(e) = case.check_pedigree() {
        tracing::warn!("problem in pedigree of case {:?}: {}", &case.id, e);
    }
}

/// Run the query for the case or the project given in `args`.
fn run_query(
    args: &Args,
    settings: &FlatSettings,
    exec: ExecContext,
) -> Result<Vec<ResultRow>, anyhow::Error> {
    if let Some(path_project) = &args.path_project {
        let project: Project = load_json(path_project)?;
        tracing::info!(
            "project {:?} with {} cases",
            &project.name,
            project.cases.len()
        );
        project.cases.iter().for_each(check_pedigree);
        ProjectPrefetchQuery::new(&project, settings)
            .max_results(args.max_results)
            .run(exec)
    } else if let Some(path_case) = &args.path_case {
        let case: Case = load_json(path_case)?;
        tracing::info!("case {:?} with {} members", &case.id, case.pedigree.len());
        check_pedigree(&case);
        let settings = QuerySettings::from_flat(settings, &case)?;
        CasePrefetchQuery::new(&case, &settings)
            .purpose(args.purpose)
            .query_id(args.query_id)
            .max_results(args.max_results)
            .run(exec)
    } else {
        anyhow::bail!("neither case nor project given")
    }
}

/// Main entry point for `seqvars query` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    tracing::info!("Loading inputs...");
    let before_loading = Instant::now();
    let settings: FlatSettings = match &args.path_settings {
        Some(path) => load_json(path)?,
        None => FlatSettings::new(),
    };
    let store = InMemoryStore::from_jsonl(Path::new(&args.path_variants))?;
    let catalog = match &args.path_catalog {
        Some(path) => AnnotationCatalog::from_path(Path::new(path))?,
        None => AnnotationCatalog::default(),
    };
    let scores = match &args.path_scores {
        Some(path) => ScoreMaps::from_path(Path::new(path))?,
        None => ScoreMaps::default(),
    };
    tracing::info!(
        "... done loading {} records and {} annotation tables in {:?}",
        store.records.len().separate_with_commas(),
        catalog.tables.len(),
        before_loading.elapsed()
    );

    trace_rss_now();

    tracing::info!("Running query...");
    let before_query = Instant::now();
    let mut rows = run_query(args, &settings, ExecContext::new(&store, &catalog))?;
    tracing::info!("... done running query in {:?}", before_query.elapsed());

    for kind in &args.rank_by {
        if !scores.has(*kind) {
            tracing::warn!("no {} scores given, all rows get the default score", kind);
        }
        let before_ranking = Instant::now();
        rows = Ranker::new(*kind, &scores).rank(rows);
        tracing::info!("... ranked by {} in {:?}", kind, before_ranking.elapsed());
    }

    let query_stats = QueryStats::new(store.records.len(), &rows);
    tracing::info!(
        "summary: {} records passed out of {} in {} genes",
        query_stats.count_passed.separate_with_commas(),
        query_stats.count_total.separate_with_commas(),
        query_stats.count_genes.separate_with_commas()
    );

    output::write_tsv(Path::new(&args.path_output), &rows)?;

    trace_rss_now();

    tracing::info!(
        "All of `seqvars query` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::seqvars::query::schema::case::test::trio;
    use crate::seqvars::query::schema::data::test::record;

    /// Write the inputs of a trio with a compound heterozygous hit in gene 1
    /// and a single paternal hit in gene 2.
    fn write_inputs(tmpdir: &Path) -> Result<(), anyhow::Error> {
        std::fs::write(
            tmpdir.join("case.json"),
            serde_json::to_string(&trio("case"))?,
        )?;
        std::fs::write(
            tmpdir.join("settings.json"),
            r#"{"compound_recessive_index": "index"}"#,
        )?;
        std::fs::write(
            tmpdir.join("scores.json"),
            r#"{"phenotype": {"1": {"score": 0.75}}}"#,
        )?;

        let mut variants = std::fs::File::create(tmpdir.join("variants.jsonl"))?;
        for record in [
            record(
                "case",
                300,
                "1",
                &[("index", "0/1"), ("father", "0/0"), ("mother", "0/1")],
            ),
            record(
                "case",
                100,
                "1",
                &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
            ),
            record(
                "case",
                200,
                "2",
                &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
            ),
        ] {
            writeln!(variants, "{}", serde_json::to_string(&record)?)?;
        }
        Ok(())
    }

    fn path(tmpdir: &Path, name: &str) -> String {
        tmpdir.join(name).to_string_lossy().to_string()
    }

    fn args(tmpdir: &Path) -> Args {
        Args {
            path_case: Some(path(tmpdir, "case.json")),
            path_project: None,
            path_settings: Some(path(tmpdir, "settings.json")),
            path_variants: path(tmpdir, "variants.jsonl"),
            path_catalog: None,
            path_scores: Some(path(tmpdir, "scores.json")),
            path_output: path(tmpdir, "out.tsv"),
            purpose: QueryPurpose::Filter,
            query_id: None,
            rank_by: vec![ScoreKind::Phenotype],
            max_results: None,
        }
    }

    /// Read the given columns of the output file.
    fn read_output(path: &str, columns: &[&str]) -> Result<Vec<Vec<String>>, anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_path(path)?;
        let header = reader.headers()?.clone();
        let indices = columns
            .iter()
            .map(|column| {
                header
                    .iter()
                    .position(|name| name == *column)
                    .ok_or_else(|| anyhow::anyhow!("missing column {}", column))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut result = Vec::new();
        for record in reader.records() {
            let record = record?;
            result.push(
                indices
                    .iter()
                    .map(|i| record.get(*i).unwrap_or_default().to_string())
                    .collect(),
            );
        }
        Ok(result)
    }

    #[test]
    fn run_comphet_ranked() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        write_inputs(&tmpdir.to_path_buf())?;
        let args = args(&tmpdir.to_path_buf());

        super::run(&crate::common::Args::default(), &args)?;

        assert_eq!(
            read_output(
                &args.path_output,
                &["start", "gene_id", "phenotype_score", "phenotype_rank"]
            )?,
            vec![
                vec!["100", "1", "0.75", "1"],
                vec!["300", "1", "0.75", "1"],
            ]
        );
        Ok(())
    }

    #[test]
    fn run_max_results() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        write_inputs(&tmpdir.to_path_buf())?;
        let args = Args {
            path_settings: None,
            path_scores: None,
            rank_by: Vec::new(),
            max_results: Some(1),
            ..args(&tmpdir.to_path_buf())
        };

        super::run(&crate::common::Args::default(), &args)?;

        assert_eq!(
            read_output(&args.path_output, &["case_id", "start"])?,
            vec![vec!["case", "100"]]
        );
        Ok(())
    }

    #[test]
    fn run_project() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        write_inputs(&tmpdir.to_path_buf())?;
        std::fs::write(
            tmpdir.to_path_buf().join("project.json"),
            serde_json::to_string(&Project {
                name: String::from("project"),
                cases: vec![trio("case"), trio("other")],
            })?,
        )?;
        let args = Args {
            path_case: None,
            path_project: Some(path(&tmpdir.to_path_buf(), "project.json")),
            path_settings: None,
            rank_by: Vec::new(),
            ..args(&tmpdir.to_path_buf())
        };

        super::run(&crate::common::Args::default(), &args)?;

        assert_eq!(
            read_output(&args.path_output, &["start"])?,
            vec![vec!["100"], vec!["200"], vec!["300"]]
        );
        Ok(())
    }

    #[test]
    fn run_missing_variants() {
        let tmpdir = temp_testdir::TempDir::default();
        let args = Args {
            path_variants: path(&tmpdir.to_path_buf(), "missing.jsonl"),
            ..args(&tmpdir.to_path_buf())
        };

        assert!(super::run(&crate::common::Args::default(), &args).is_err());
    }
}
