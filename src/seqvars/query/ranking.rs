//! Scoring of result rows and tie-aware ranking by gene.
//!
//! Scores are supplied from outside as plain maps, by variant for
//! pathogenicity and by gene for phenotype and prioritization.  The joint
//! score is the product of phenotype and pathogenicity score of a row.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::common::canonicalize;
use crate::seqvars::query::schema::data::VariantKey;
use crate::seqvars::query::statement::ResultRow;
use crate::seqvars::query::value::Value;

/// The kind of score to rank by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ScoreKind {
    /// Per-variant pathogenicity score.
    Pathogenicity,
    /// Per-gene phenotype similarity score.
    Phenotype,
    /// Per-gene prioritization score.
    Prioritization,
    /// Product of phenotype and pathogenicity score.
    Joint,
}

impl ScoreKind {
    /// Score assigned to rows without a score.
    pub fn sentinel(&self) -> f64 {
        match self {
            ScoreKind::Pathogenicity | ScoreKind::Joint => 0.0,
            ScoreKind::Phenotype | ScoreKind::Prioritization => -1.0,
        }
    }

    pub fn score_column(&self) -> String {
        format!("{self}_score")
    }

    pub fn info_column(&self) -> String {
        format!("{self}_score_info")
    }

    pub fn rank_column(&self) -> String {
        format!("{self}_rank")
    }
}

/// A score with structured information on how it was obtained.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct Score {
    pub score: f64,
    #[serde(default)]
    pub info: Option<serde_json::Value>,
}

/// Score of one variant in the score file.
#[derive(Debug, Clone, serde::Deserialize)]
struct VariantScore {
    #[serde(flatten)]
    key: VariantKey,
    #[serde(flatten)]
    score: Score,
}

/// Layout of the score file.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
struct ScoreFile {
    pathogenicity: Vec<VariantScore>,
    phenotype: IndexMap<String, Score>,
    prioritization: IndexMap<String, Score>,
}

/// The externally supplied scores.
#[derive(Debug, Clone, Default)]
pub struct ScoreMaps {
    /// Pathogenicity by variant, chromosome names canonicalized.
    pub pathogenicity: HashMap<VariantKey, Score>,
    /// Phenotype score by gene ID.
    pub phenotype: IndexMap<String, Score>,
    /// Prioritization score by gene ID.
    pub prioritization: IndexMap<String, Score>,
}

impl ScoreMaps {
    /// Add a pathogenicity score.
    pub fn insert_pathogenicity(&mut self, key: VariantKey, score: Score) {
        self.pathogenicity.insert(canonical_key(key), score);
    }

    /// Load from JSON file.
    pub fn from_path(path: &Path) -> Result<Self, anyhow::Error> {
        let file: ScoreFile = serde_json::from_reader(std::io::BufReader::new(
            std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?,
        ))
        .map_err(|e| anyhow::anyhow!("invalid scores in {}: {}", path.display(), e))?;

        let mut result = Self {
            phenotype: file.phenotype,
            prioritization: file.prioritization,
            ..Default::default()
        };
        for VariantScore { key, score } in file.pathogenicity {
            result.insert_pathogenicity(key, score);
        }
        Ok(result)
    }

    /// Whether there are scores of the given kind.
    pub fn has(&self, kind: ScoreKind) -> bool {
        match kind {
            ScoreKind::Pathogenicity => !self.pathogenicity.is_empty(),
            ScoreKind::Phenotype => !self.phenotype.is_empty(),
            ScoreKind::Prioritization => !self.prioritization.is_empty(),
            ScoreKind::Joint => !self.phenotype.is_empty() && !self.pathogenicity.is_empty(),
        }
    }
}

fn canonical_key(key: VariantKey) -> VariantKey {
    VariantKey {
        chromosome: canonicalize(&key.chromosome),
        ..key
    }
}

fn row_key(row: &ResultRow) -> Option<VariantKey> {
    VariantKey::from_values(
        &row.get("release"),
        &row.get("chromosome"),
        &row.get("start"),
        &row.get("end"),
        &row.get("reference"),
        &row.get("alternative"),
    )
    .map(canonical_key)
}

/// Attaches scores of one kind to rows and ranks them.
#[derive(Debug, Clone, Copy)]
pub struct Ranker<'a> {
    kind: ScoreKind,
    scores: &'a ScoreMaps,
}

impl<'a> Ranker<'a> {
    pub fn new(kind: ScoreKind, scores: &'a ScoreMaps) -> Self {
        Self { kind, scores }
    }

    fn gene_score(map: &'a IndexMap<String, Score>, gene_id: Option<&str>) -> Option<&'a Score> {
        gene_id.and_then(|gene_id| map.get(gene_id))
    }

    /// The score of the row, `None` if there is none.
    pub fn row_score(&self, row: &ResultRow) -> Option<Score> {
        let gene_id = row.gene_id();
        let pathogenicity = || row_key(row).and_then(|key| self.scores.pathogenicity.get(&key));
        match self.kind {
            ScoreKind::Pathogenicity => pathogenicity().cloned(),
            ScoreKind::Phenotype => {
                Self::gene_score(&self.scores.phenotype, gene_id.as_deref()).cloned()
            }
            ScoreKind::Prioritization => {
                Self::gene_score(&self.scores.prioritization, gene_id.as_deref()).cloned()
            }
            ScoreKind::Joint => {
                let phenotype = Self::gene_score(&self.scores.phenotype, gene_id.as_deref());
                let pathogenicity = pathogenicity();
                if phenotype.is_none() && pathogenicity.is_none() {
                    return None;
                }
                let score_of = |score: Option<&Score>| score.map(|s| s.score).unwrap_or(0.0);
                Some(Score::new(
                    score_of(phenotype) * score_of(pathogenicity),
                    Some(serde_json::json!({
                        "phenotype": phenotype,
                        "pathogenicity": pathogenicity,
                    })),
                ))
            }
        }
    }

    /// Attach score, score info and rank to each row; return rows sorted by
    /// rank.
    ///
    /// Rows are ranked by the highest score of their gene, ties broken by
    /// gene ID.  Genes with equal scores share a rank and the next rank skips
    /// the tied genes.  Rows without gene come last with one common rank.
    pub fn rank(&self, rows: Vec<ResultRow>) -> Vec<ResultRow> {
        let sentinel = self.kind.sentinel();
        let mut scored = rows
            .into_iter()
            .map(|mut row| {
                let score = self.row_score(&row);
                let value = score.as_ref().map(|s| s.score).unwrap_or(sentinel);
                row.set(&self.kind.score_column(), value);
                row.set(
                    &self.kind.info_column(),
                    score
                        .and_then(|s| s.info)
                        .map(Value::Json)
                        .unwrap_or_default(),
                );
                (row.gene_id(), value, row)
            })
            .collect::<Vec<_>>();

        let mut representative: HashMap<String, f64> = HashMap::new();
        for (gene_id, value, _) in &scored {
            if let Some(gene_id) = gene_id {
                let entry = representative.entry(gene_id.clone()).or_insert(*value);
                *entry = entry.max(*value);
            }
        }
        let representative_of = |gene_id: &Option<String>| {
            gene_id
                .as_ref()
                .and_then(|gene_id| representative.get(gene_id).copied())
                .unwrap_or(sentinel)
        };

        scored.sort_by(|(lhs_gene, _, _), (rhs_gene, _, _)| {
            rhs_gene
                .is_some()
                .cmp(&lhs_gene.is_some())
                .then_with(|| representative_of(rhs_gene).total_cmp(&representative_of(lhs_gene)))
                .then_with(|| rhs_gene.cmp(lhs_gene))
        });

        let rank_column = self.kind.rank_column();
        let mut rank = 1usize;
        let mut tied = 0usize;
        let mut previous: Option<(Option<String>, f64)> = None;
        let mut result = Vec::with_capacity(scored.len());
        for (gene_id, _, mut row) in scored {
            let score = representative_of(&gene_id);
            if let Some((previous_gene, previous_score)) = &previous {
                if *previous_gene != gene_id {
                    if gene_id.is_some() && *previous_score == score {
                        tied += 1;
                    } else {
                        rank += 1 + tied;
                        tied = 0;
                    }
                }
            }
            row.set(&rank_column, rank as i64);
            previous = Some((gene_id, score));
            result.push(row);
        }
        tracing::debug!("ranked {} rows by {}", result.len(), self.kind);
        result
    }
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::GenomeRelease;

    fn row(gene_id: &str, start: i64) -> ResultRow {
        ResultRow::from_iter([
            ("release", Value::from("GRCh37")),
            ("chromosome", Value::from("1")),
            ("start", Value::Int(start)),
            ("end", Value::Int(start)),
            ("reference", Value::from("G")),
            ("alternative", Value::from("A")),
            ("gene_id", Value::from(gene_id)),
        ])
    }

    fn key(start: i32) -> VariantKey {
        VariantKey {
            release: GenomeRelease::Grch37,
            chromosome: String::from("chr1"),
            start,
            end: start,
            reference: String::from("G"),
            alternative: String::from("A"),
        }
    }

    fn column(rows: &[ResultRow], name: &str) -> Vec<Value> {
        rows.iter().map(|row| row.get(name)).collect()
    }

    fn phenotype(scores: &[(&str, f64)]) -> ScoreMaps {
        ScoreMaps {
            phenotype: scores
                .iter()
                .map(|(gene_id, score)| (gene_id.to_string(), Score::new(*score, None)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn ties_within_gene() {
        let scores = phenotype(&[("A", 10.0), ("B", 8.0), ("C", 5.0)]);
        let rows = vec![
            row("C", 1),
            row("A", 2),
            row("B", 3),
            row("C", 4),
            row("A", 5),
            row("C", 6),
        ];

        let ranked = Ranker::new(ScoreKind::Phenotype, &scores).rank(rows);

        assert_eq!(
            column(&ranked, "phenotype_score"),
            [10.0, 10.0, 8.0, 5.0, 5.0, 5.0].map(Value::Float).to_vec()
        );
        assert_eq!(
            column(&ranked, "phenotype_rank"),
            [1, 1, 2, 3, 3, 3].map(Value::Int).to_vec()
        );
    }

    #[test]
    fn ties_across_genes_skip_ranks() {
        let scores = phenotype(&[("A", 10.0), ("B", 10.0), ("C", 8.0)]);
        let rows = vec![row("C", 1), row("A", 2), row("B", 3)];

        let ranked = Ranker::new(ScoreKind::Phenotype, &scores).rank(rows);

        assert_eq!(
            column(&ranked, "gene_id"),
            ["B", "A", "C"].map(Value::from).to_vec()
        );
        assert_eq!(
            column(&ranked, "phenotype_rank"),
            [1, 1, 3].map(Value::Int).to_vec()
        );
    }

    #[test]
    fn missing_scores_and_genes_rank_last() {
        let scores = phenotype(&[("A", 0.5)]);
        let rows = vec![row("", 1), row("B", 2), row("A", 3)];

        let ranked = Ranker::new(ScoreKind::Phenotype, &scores).rank(rows);

        assert_eq!(
            column(&ranked, "start"),
            [3, 2, 1].map(Value::Int).to_vec()
        );
        assert_eq!(
            column(&ranked, "phenotype_score"),
            [0.5, -1.0, -1.0].map(Value::Float).to_vec()
        );
        assert_eq!(
            column(&ranked, "phenotype_rank"),
            [1, 2, 3].map(Value::Int).to_vec()
        );
    }

    #[test]
    fn pathogenicity_uses_gene_maximum() {
        let mut scores = ScoreMaps::default();
        scores.insert_pathogenicity(key(1), Score::new(0.2, None));
        scores.insert_pathogenicity(key(2), Score::new(0.9, None));
        scores.insert_pathogenicity(key(3), Score::new(0.5, None));
        let rows = vec![row("A", 1), row("B", 3), row("A", 2)];

        let ranked = Ranker::new(ScoreKind::Pathogenicity, &scores).rank(rows);

        assert_eq!(
            column(&ranked, "start"),
            [1, 2, 3].map(Value::Int).to_vec()
        );
        assert_eq!(
            column(&ranked, "pathogenicity_score"),
            [0.2, 0.9, 0.5].map(Value::Float).to_vec()
        );
        assert_eq!(
            column(&ranked, "pathogenicity_rank"),
            [1, 1, 2].map(Value::Int).to_vec()
        );
    }

    #[test]
    fn joint_score_is_product() {
        let mut scores = phenotype(&[("A", 0.5)]);
        scores.insert_pathogenicity(key(1), Score::new(0.8, None));
        let ranker = Ranker::new(ScoreKind::Joint, &scores);

        let joint = ranker.row_score(&row("A", 1)).map(|s| s.score);
        assert!(joint.is_some_and(|joint| approx_eq!(f64, joint, 0.4, ulps = 2)));
        let phenotype_only = ranker.row_score(&row("A", 2)).map(|s| s.score);
        assert_eq!(phenotype_only, Some(0.0));
        assert_eq!(ranker.row_score(&row("B", 3)), None);
    }

    #[test]
    fn score_file() -> Result<(), anyhow::Error> {
        let temp = temp_testdir::TempDir::default();
        let path = temp.to_path_buf().join("scores.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "pathogenicity": [{
                    "release": "GRCh37", "chromosome": "1", "start": 1, "end": 1,
                    "reference": "G", "alternative": "A",
                    "score": 0.7, "info": {"source": "cadd"}
                }],
                "phenotype": {"A": {"score": 0.3}},
            })
            .to_string(),
        )?;

        let scores = ScoreMaps::from_path(&path)?;

        assert!(scores.has(ScoreKind::Joint));
        assert!(!scores.has(ScoreKind::Prioritization));
        assert_eq!(
            scores.pathogenicity.get(&canonical_key(key(1))),
            Some(&Score::new(0.7, Some(serde_json::json!({"source": "cadd"}))))
        );
        Ok(())
    }
}
