//! Entry points running a query for one case or for all cases of a project.

use crate::err::ConfigError;
use crate::seqvars::query::builder::{QueryPartsBuilder, QueryPurpose};
use crate::seqvars::query::combiner::combiner_for;
use crate::seqvars::query::extender::ExtenderContext;
use crate::seqvars::query::schema::case::{Case, Project};
use crate::seqvars::query::schema::settings::{FlatSettings, QuerySettings};
use crate::seqvars::query::statement::{ExecContext, ResultRow, Statement};

/// Cap the rows of `statement` if `max_results` is given.
fn limited(statement: Statement, max_results: Option<usize>) -> Statement {
    match max_results {
        Some(limit) => Statement::Limit {
            statement: Box::new(statement),
            limit,
        },
        None => statement,
    }
}

/// Execute `statement`, stopping at the first upstream error.
fn collect(statement: &Statement, exec: ExecContext) -> Result<Vec<ResultRow>, anyhow::Error> {
    statement.execute(exec).collect()
}

/// Query of the active variant set of one case.
#[derive(Debug, Clone)]
pub struct CasePrefetchQuery<'a> {
    case: &'a Case,
    settings: &'a QuerySettings,
    purpose: QueryPurpose,
    query_id: Option<uuid::Uuid>,
    max_results: Option<usize>,
}

impl<'a> CasePrefetchQuery<'a> {
    pub fn new(case: &'a Case, settings: &'a QuerySettings) -> Self {
        Self {
            case,
            settings,
            purpose: QueryPurpose::default(),
            query_id: None,
            max_results: None,
        }
    }

    pub fn purpose(mut self, purpose: QueryPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Query whose stored results are reloaded with `QueryPurpose::Prefetched`.
    pub fn query_id(mut self, query_id: Option<uuid::Uuid>) -> Self {
        self.query_id = query_id;
        self
    }

    /// Emit at most this many rows, counted after ordering.
    pub fn max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Compose the statement for the case.
    ///
    /// # Errors
    ///
    /// The configuration errors of the extenders and of the combiner, e.g.
    /// `ConfigError::NoActiveVariantSet`.
    pub fn statement(&self) -> Result<Statement, ConfigError> {
        let builder = QueryPartsBuilder::for_purpose(self.purpose);
        let ctx = ExtenderContext {
            query_id: self.query_id,
            ..ExtenderContext::new(self.case, self.settings)
        };
        let statement = combiner_for(self.case, self.settings)?.statement(&builder, &ctx)?;
        let statement = limited(statement, self.max_results);
        tracing::debug!("statement = {:?}", &statement);
        Ok(statement)
    }

    /// Compose and execute the statement.
    pub fn run(&self, exec: ExecContext) -> Result<Vec<ResultRow>, anyhow::Error> {
        collect(&self.statement()?, exec)
    }
}

/// Query across all cases of a project.
///
/// Settings are given in flat form and converted per case, so that the
/// member keys and the `*_indices` keys resolve against each pedigree.
/// Cases without active variant set are skipped.
#[derive(Debug, Clone)]
pub struct ProjectPrefetchQuery<'a> {
    project: &'a Project,
    settings: &'a FlatSettings,
    max_results: Option<usize>,
}

impl<'a> ProjectPrefetchQuery<'a> {
    pub fn new(project: &'a Project, settings: &'a FlatSettings) -> Self {
        Self {
            project,
            settings,
            max_results: None,
        }
    }

    /// Emit at most this many rows, counted after ordering.
    pub fn max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Compose the statement for all cases.
    ///
    /// # Errors
    ///
    /// The configuration errors of the first case that cannot be configured.
    pub fn statement(&self) -> Result<Statement, ConfigError> {
        let builder = QueryPartsBuilder::for_purpose(QueryPurpose::Project);
        let mut statements = Vec::new();
        for case in &self.project.cases {
            if case.active_variant_set.is_none() {
                tracing::warn!("skipping case {:?} without active variant set", &case.id);
                continue;
            }
            let settings = QuerySettings::from_flat(self.settings, case)?;
            let ctx = ExtenderContext::new(case, &settings);
            statements.push(combiner_for(case, &settings)?.combine(&builder, &ctx)?);
        }
        tracing::debug!(
            "project {:?}: combined statements of {} cases",
            &self.project.name,
            statements.len()
        );

        let statement = Statement::OrderBy(Box::new(Statement::Union(statements)));
        let statement = limited(statement, self.max_results);
        tracing::debug!("statement = {:?}", &statement);
        Ok(statement)
    }

    /// Compose and execute the statement.
    pub fn run(&self, exec: ExecContext) -> Result<Vec<ResultRow>, anyhow::Error> {
        collect(&self.statement()?, exec)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::seqvars::query::schema::case::test::trio;
    use crate::seqvars::query::schema::data::test::record;
    use crate::seqvars::query::schema::data::VariantRecord;
    use crate::seqvars::query::schema::settings::test::flat;
    use crate::seqvars::query::schema::settings::{FrequencyDb, MitochondrialDb};
    use crate::seqvars::query::store::{AnnotationCatalog, InMemoryStore};
    use crate::seqvars::query::value::Value;

    /// Two het variants in gene 1, one from each parent, and an unrelated
    /// het variant in gene 2.
    fn comphet_records(case_id: &str) -> Vec<VariantRecord> {
        vec![
            record(
                case_id,
                300,
                "1",
                &[("index", "0/1"), ("father", "0/0"), ("mother", "0/1")],
            ),
            record(
                case_id,
                100,
                "1",
                &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
            ),
            record(
                case_id,
                200,
                "2",
                &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
            ),
        ]
    }

    fn starts(rows: &[ResultRow]) -> Vec<(String, i64)> {
        rows.iter()
            .map(|row| {
                (
                    row.get("case_id").to_output_string(),
                    row.get("start").as_i64().unwrap_or_default(),
                )
            })
            .collect()
    }

    #[test]
    fn case_default_mode_ordered() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        let store = InMemoryStore::new(comphet_records("case"));
        let catalog = AnnotationCatalog::default();

        let rows = CasePrefetchQuery::new(&case, &settings).run(ExecContext::new(&store, &catalog))?;

        assert_eq!(
            starts(&rows),
            vec![
                (String::from("case"), 100),
                (String::from("case"), 200),
                (String::from("case"), 300)
            ]
        );
        Ok(())
    }

    #[test]
    fn single_variant_passes_unfiltered() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let mut json = serde_json::json!({
            "index_gt": "any",
            "father_gt": "any",
            "mother_gt": "any",
            "inhouse_enabled": false,
        });
        for db in FrequencyDb::iter()
            .map(|db| db.to_string())
            .chain(MitochondrialDb::iter().map(|db| db.to_string()))
        {
            json[format!("{db}_enabled")] = serde_json::Value::Bool(false);
        }
        let settings = QuerySettings::from_flat(&flat(json), &case)?;
        let input = record(
            "case",
            12_345,
            "1",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "1/1")],
        );
        let store = InMemoryStore::new(vec![input.clone()]);
        let catalog = AnnotationCatalog::default();

        let rows = CasePrefetchQuery::new(&case, &settings)
            .purpose(QueryPurpose::Filter)
            .run(ExecContext::new(&store, &catalog))?;

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("chromosome"), Value::from(input.chromosome.as_str()));
        assert_eq!(row.get("start"), Value::from(input.start));
        assert_eq!(row.get("end"), Value::from(input.end));
        assert_eq!(row.get("reference"), Value::from(input.reference.as_str()));
        assert_eq!(
            row.get("alternative"),
            Value::from(input.alternative.as_str())
        );
        Ok(())
    }

    #[test]
    fn case_comphet_with_limit() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(
            &flat(serde_json::json!({"compound_recessive_index": "index"})),
            &case,
        )?;
        let store = InMemoryStore::new(comphet_records("case"));
        let catalog = AnnotationCatalog::default();
        let exec = ExecContext::new(&store, &catalog);

        let rows = CasePrefetchQuery::new(&case, &settings).run(exec)?;
        assert_eq!(
            starts(&rows),
            vec![(String::from("case"), 100), (String::from("case"), 300)]
        );

        let rows = CasePrefetchQuery::new(&case, &settings)
            .max_results(Some(1))
            .run(exec)?;
        assert_eq!(starts(&rows), vec![(String::from("case"), 100)]);
        Ok(())
    }

    #[test]
    fn case_without_active_set() -> Result<(), anyhow::Error> {
        let mut case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        case.active_variant_set = None;

        assert_eq!(
            CasePrefetchQuery::new(&case, &settings).statement(),
            Err(ConfigError::NoActiveVariantSet(String::from("case")))
        );
        Ok(())
    }

    #[test]
    fn prefetched_requires_query_id() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;

        let query = CasePrefetchQuery::new(&case, &settings).purpose(QueryPurpose::Prefetched);
        assert_eq!(
            query.statement(),
            Err(ConfigError::MissingQueryId(String::from("case")))
        );
        assert!(query.query_id(Some(uuid::Uuid::nil())).statement().is_ok());
        Ok(())
    }

    #[tracing_test::traced_test]
    #[test]
    fn project_query() -> Result<(), anyhow::Error> {
        let mut inactive = trio("c");
        inactive.active_variant_set = None;
        let project = Project {
            name: String::from("project"),
            cases: vec![trio("b"), trio("a"), inactive],
        };
        let settings = flat(serde_json::json!({
            "compound_recessive_indices": {"a": "index", "b": "index"}
        }));
        let store = InMemoryStore::new(
            comphet_records("a")
                .into_iter()
                .chain(comphet_records("b"))
                .chain(comphet_records("c"))
                .collect(),
        );
        let catalog = AnnotationCatalog::default();

        let rows = ProjectPrefetchQuery::new(&project, &settings)
            .run(ExecContext::new(&store, &catalog))?;

        assert_eq!(
            starts(&rows),
            vec![
                (String::from("a"), 100),
                (String::from("b"), 100),
                (String::from("a"), 300),
                (String::from("b"), 300)
            ]
        );
        assert!(logs_contain("skipping case \"c\" without active variant set"));
        Ok(())
    }

    #[test]
    fn project_query_limit() -> Result<(), anyhow::Error> {
        let project = Project {
            name: String::from("project"),
            cases: vec![trio("a"), trio("b")],
        };
        let settings = FlatSettings::new();
        let store = InMemoryStore::new(
            comphet_records("a")
                .into_iter()
                .chain(comphet_records("b"))
                .collect(),
        );
        let catalog = AnnotationCatalog::default();

        let rows = ProjectPrefetchQuery::new(&project, &settings)
            .max_results(Some(3))
            .run(ExecContext::new(&store, &catalog))?;

        assert_eq!(
            starts(&rows),
            vec![
                (String::from("a"), 100),
                (String::from("b"), 100),
                (String::from("a"), 200)
            ]
        );
        Ok(())
    }
}
