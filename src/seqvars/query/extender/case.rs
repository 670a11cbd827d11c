//! Extenders restricting the variant table to one case.

use crate::err::ConfigError;
use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::{
    Aggregate, Expr, Field, JoinKey, JoinPlan, Predicate, Selectable,
};
use crate::seqvars::query::schema::settings::DatabaseSelect;
use crate::seqvars::query::store::ReferenceTable;

/// Record columns output for every variant.
const VARIANT_COLUMNS: &[&str] = &[
    "case_id",
    "set_id",
    "release",
    "chromosome",
    "chromosome_no",
    "start",
    "end",
    "reference",
    "alternative",
    "var_type",
];

/// Transcript columns output from the selected transcript database.
const TRANSCRIPT_COLUMNS: &[&str] = &[
    "gene_id",
    "transcript_id",
    "transcript_coding",
    "hgvs_c",
    "hgvs_p",
    "effect",
    "exon_dist",
];

/// Restricts to the active variant set of the case.
#[derive(Debug, Clone)]
pub struct CaseScope {
    case_id: String,
    set_id: i64,
    database_select: DatabaseSelect,
}

impl CaseScope {
    /// # Errors
    ///
    /// `ConfigError::NoActiveVariantSet` if the case has no active variant set.
    pub fn new(ctx: &ExtenderContext) -> Result<Self, ConfigError> {
        let variant_set = ctx.case.require_active_variant_set()?;
        Ok(Self {
            case_id: ctx.case.id.clone(),
            set_id: variant_set.id,
            database_select: ctx.settings.database_select,
        })
    }
}

impl Extender for CaseScope {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::CaseScope
    }

    fn fields(&self) -> Vec<Field> {
        VARIANT_COLUMNS
            .iter()
            .map(|name| Field::column(name))
            .chain(TRANSCRIPT_COLUMNS.iter().map(|name| {
                Field::new(*name, Expr::column(self.database_select.column(name)))
            }))
            .chain(std::iter::once(Field::column("genotype")))
            .collect()
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.restrict(&self.case_id, self.set_id)
    }
}

/// Restricts to the rows stored as results of a previous query.
#[derive(Debug, Clone)]
pub struct QueryResultScope {
    query_id: uuid::Uuid,
}

impl QueryResultScope {
    /// # Errors
    ///
    /// `ConfigError::MissingQueryId` if no query id is given.
    pub fn new(ctx: &ExtenderContext) -> Result<Self, ConfigError> {
        let query_id = ctx
            .query_id
            .ok_or_else(|| ConfigError::MissingQueryId(ctx.case.id.clone()))?;
        Ok(Self { query_id })
    }
}

impl Extender for QueryResultScope {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::QueryResultScope
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(
            JoinPlan::new(
                "query_results",
                ReferenceTable::QueryResults,
                JoinKey::CaseVariant,
            )
            .filter_table("query_id", self.query_id.to_string())
            .output("in_query_result", "query_id", Aggregate::Exists),
        )
    }

    fn conditions(&self) -> Vec<Predicate> {
        vec![Expr::column("in_query_result").equals(true)]
    }
}
