//! Executable query statements.
//!
//! A `Select` streams the records of the variant table that pass its
//! conditions.  Gene count filters and ordering need all rows of their input
//! and materialize it.

use std::collections::HashMap;

use indexmap::IndexMap;
use thousands::Separable;

use crate::seqvars::query::parts::{QueryParts, RowContext};
use crate::seqvars::query::sorting::ByCoordinate;
use crate::seqvars::query::store::{AnnotationCatalog, VariantRecordStore};
use crate::seqvars::query::value::Value;

/// Name of the column marking rows of the paternal compound heterozygous branch.
pub const FATHER_MARKER: &str = "father_marker";
/// Name of the column marking rows of the maternal compound heterozygous branch.
pub const MOTHER_MARKER: &str = "mother_marker";
/// Name of the column marking rows of the single-sample compound heterozygous
/// branch.
pub const MARKER: &str = "marker";

/// One result row: the values of the output fields, in field order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct ResultRow {
    pub values: IndexMap<String, Value>,
}

impl ResultRow {
    /// Value of the column, `Null` if absent.
    pub fn get(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Set the value of the column, appending new columns at the end.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// The gene ID of the row, `None` if absent or empty.
    pub fn gene_id(&self) -> Option<String> {
        match self.get("gene_id") {
            Value::Str(gene_id) if !gene_id.is_empty() => Some(gene_id),
            Value::Int(gene_id) => Some(gene_id.to_string()),
            _ => None,
        }
    }
}

impl<'a> FromIterator<(&'a str, Value)> for ResultRow {
    fn from_iter<T: IntoIterator<Item = (&'a str, Value)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

/// Stream of result rows.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<ResultRow, anyhow::Error>> + 'a>;

/// Sources a statement is executed against.
#[derive(Clone, Copy, derive_new::new)]
pub struct ExecContext<'a> {
    pub store: &'a dyn VariantRecordStore,
    pub catalog: &'a AnnotationCatalog,
}

/// Condition on the rows of one gene for `GeneCountFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum GeneCountMode {
    /// The gene has rows of both the paternal and the maternal branch.
    BothParents,
    /// The gene has more than one marked row.
    Singleton,
}

/// An executable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Output fields of the records passing the conditions.
    Select(QueryParts),
    /// Concatenation of the rows of all statements, without de-duplication.
    Union(Vec<Statement>),
    /// Keep the rows of genes fulfilling `mode`; rows without gene are
    /// dropped and the marker columns removed.
    GeneCountFilter {
        statement: Box<Statement>,
        mode: GeneCountMode,
    },
    /// Sort by coordinate and case.
    OrderBy(Box<Statement>),
    /// At most `limit` rows.
    Limit {
        statement: Box<Statement>,
        limit: usize,
    },
}

impl Statement {
    /// Execute the statement.
    ///
    /// Errors of the record store are passed through in the row stream.
    pub fn execute<'a>(&'a self, ctx: ExecContext<'a>) -> RowIter<'a> {
        match self {
            Statement::Select(parts) => select(parts, ctx),
            Statement::Union(statements) => Box::new(
                statements
                    .iter()
                    .flat_map(move |statement| statement.execute(ctx)),
            ),
            Statement::GeneCountFilter { statement, mode } => {
                match statement.execute(ctx).collect::<Result<Vec<_>, _>>() {
                    Ok(rows) => Box::new(gene_count_filter(rows, *mode).into_iter().map(Ok)),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            }
            Statement::OrderBy(statement) => {
                match statement.execute(ctx).collect::<Result<Vec<_>, _>>() {
                    Ok(rows) => {
                        let mut rows: Vec<ByCoordinate> =
                            rows.into_iter().map(ByCoordinate::from).collect();
                        rows.sort();
                        Box::new(rows.into_iter().map(|by_coordinate| Ok(by_coordinate.row)))
                    }
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            }
            Statement::Limit { statement, limit } => Box::new(statement.execute(ctx).take(*limit)),
        }
    }
}

/// Stream the records of the scope through the joins and conditions of `parts`.
fn select<'a>(parts: &'a QueryParts, ctx: ExecContext<'a>) -> RowIter<'a> {
    let joins = parts
        .selectable
        .joins
        .iter()
        .map(|join| join.prepare(ctx.catalog))
        .collect::<Vec<_>>();
    let condition = parts.condition();
    let field_names = parts.field_names();
    let scope = parts
        .selectable
        .scope
        .as_ref()
        .map(|scope| (scope.case_id.as_str(), scope.set_id));

    Box::new(ctx.store.scan(scope).filter_map(move |record| {
        let record = match record {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        let mut row = RowContext::new(&record);
        for join in &joins {
            join.apply(&mut row);
        }
        if condition.eval(&row) != Some(true) {
            tracing::trace!(
                "removing {}:{}-{} {}>{}",
                &record.chromosome,
                record.start,
                record.end,
                &record.reference,
                &record.alternative
            );
            return None;
        }
        // Later definitions of a field name take precedence.
        let mut values: IndexMap<String, Value> = field_names
            .iter()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        for field in &parts.fields {
            values.insert(field.name.clone(), field.expr.eval(&row));
        }
        Some(Ok(ResultRow { values }))
    }))
}

/// Keep rows of genes fulfilling `mode`, in input order.
fn gene_count_filter(rows: Vec<ResultRow>, mode: GeneCountMode) -> Vec<ResultRow> {
    let count_rows = rows.len();
    let rows = rows
        .into_iter()
        .filter_map(|row| row.gene_id().map(|gene_id| (gene_id, row)))
        .collect::<Vec<_>>();

    // Per gene: (paternal, maternal, marked) row counts.
    let mut counts: HashMap<&str, (i64, i64, i64)> = HashMap::new();
    for (gene_id, row) in &rows {
        let marker = |name: &str| row.get(name).as_i64().unwrap_or_default();
        let entry = counts.entry(gene_id.as_str()).or_default();
        entry.0 += marker(FATHER_MARKER);
        entry.1 += marker(MOTHER_MARKER);
        entry.2 += marker(MARKER);
    }
    let keep = counts
        .into_iter()
        .filter(|(_, (father, mother, marked))| match mode {
            GeneCountMode::BothParents => *father > 0 && *mother > 0,
            GeneCountMode::Singleton => *marked > 1,
        })
        .map(|(gene_id, _)| gene_id.to_string())
        .collect::<std::collections::HashSet<_>>();

    let result = rows
        .into_iter()
        .filter(|(gene_id, _)| keep.contains(gene_id))
        .map(|(_, mut row)| {
            for name in [FATHER_MARKER, MOTHER_MARKER, MARKER] {
                row.values.shift_remove(name);
            }
            row
        })
        .collect::<Vec<_>>();
    tracing::debug!(
        "gene count filter ({}) kept {} of {} rows in {} genes",
        mode,
        result.len().separate_with_commas(),
        count_rows.separate_with_commas(),
        keep.len().separate_with_commas()
    );
    result
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::seqvars::query::parts::{Expr, Field, Selectable};
    use crate::seqvars::query::schema::data::test::record;
    use crate::seqvars::query::schema::data::VariantRecord;
    use crate::seqvars::query::store::InMemoryStore;

    /// Rows with the given gene and marker values.
    fn marked(gene_id: &str, markers: &[(&str, i64)]) -> ResultRow {
        ResultRow::from_iter(
            std::iter::once(("gene_id", Value::from(gene_id)))
                .chain(markers.iter().map(|(name, value)| (*name, Value::Int(*value)))),
        )
    }

    #[test]
    fn gene_count_both_parents() {
        let rows = vec![
            marked("A", &[(FATHER_MARKER, 1), (MOTHER_MARKER, 0)]),
            marked("B", &[(FATHER_MARKER, 1), (MOTHER_MARKER, 0)]),
            marked("A", &[(FATHER_MARKER, 0), (MOTHER_MARKER, 1)]),
            marked("B", &[(FATHER_MARKER, 1), (MOTHER_MARKER, 0)]),
            marked("", &[(FATHER_MARKER, 1), (MOTHER_MARKER, 1)]),
        ];
        let result = gene_count_filter(rows, GeneCountMode::BothParents);
        assert_eq!(
            result,
            vec![
                ResultRow::from_iter([("gene_id", Value::from("A"))]),
                ResultRow::from_iter([("gene_id", Value::from("A"))]),
            ]
        );
    }

    #[test]
    fn gene_count_singleton() {
        let rows = vec![
            marked("A", &[(MARKER, 1)]),
            marked("B", &[(MARKER, 1)]),
            marked("A", &[(MARKER, 1)]),
        ];
        let result = gene_count_filter(rows, GeneCountMode::Singleton);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|row| row.gene_id().as_deref() == Some("A")));
    }

    #[test]
    fn select_scope_fields_and_limit() -> Result<(), anyhow::Error> {
        let other_case = record("other", 100, "1", &[]);
        let store = InMemoryStore::new(vec![
            record("case", 300, "1", &[]),
            record("case", 100, "1", &[]),
            other_case,
            record("case", 200, "1", &[]),
        ]);
        let catalog = AnnotationCatalog::default();
        let parts = QueryParts {
            fields: vec![
                Field::column("case_id"),
                Field::column("chromosome_no"),
                Field::column("start"),
                Field::new("start", Expr::column("end")),
                Field::new("flag", Expr::literal(1)),
            ],
            selectable: Selectable::default().restrict("case", 1),
            conditions: vec![Expr::column("start").at_least(150)],
        };
        let ctx = ExecContext::new(&store, &catalog);

        let select = Statement::Select(parts);
        let rows = select.execute(ctx).collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            rows.iter().map(|row| row.get("start")).collect::<Vec<_>>(),
            vec![Value::Int(300), Value::Int(200)]
        );
        assert_eq!(
            rows[0].values.keys().collect::<Vec<_>>(),
            vec!["case_id", "chromosome_no", "start", "flag"]
        );

        let ordered = Statement::Limit {
            statement: Box::new(Statement::OrderBy(Box::new(select))),
            limit: 1,
        };
        let rows = ordered.execute(ctx).collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            rows.iter().map(|row| row.get("start")).collect::<Vec<_>>(),
            vec![Value::Int(200)]
        );
        Ok(())
    }

    #[derive(Debug)]
    struct FailingStore;

    impl VariantRecordStore for FailingStore {
        fn scan<'a>(
            &'a self,
            _scope: Option<(&'a str, i64)>,
        ) -> Box<dyn Iterator<Item = Result<VariantRecord, anyhow::Error>> + 'a> {
            Box::new(std::iter::once(Err(anyhow::anyhow!("store unavailable"))))
        }
    }

    #[test]
    fn store_errors_are_propagated() {
        let catalog = AnnotationCatalog::default();
        let ctx = ExecContext::new(&FailingStore, &catalog);
        let statement = Statement::OrderBy(Box::new(Statement::Select(QueryParts::default())));
        let result = statement.execute(ctx).collect::<Result<Vec<_>, _>>();
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err(String::from("store unavailable"))
        );
    }
}
