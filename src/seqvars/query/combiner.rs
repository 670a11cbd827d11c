//! Combination of query parts into one statement per inheritance mode.
//!
//! The default mode runs the extenders once.  Compound heterozygous mode runs
//! them once per parent of origin with substituted genotype patterns, tags
//! the rows of each branch and keeps genes hit from both parents.  Recessive
//! mode adds a homozygous branch to that.

use indexmap::IndexMap;

use crate::err::ConfigError;
use crate::seqvars::query::builder::QueryPartsBuilder;
use crate::seqvars::query::extender::ExtenderContext;
use crate::seqvars::query::parts::{Expr, Field};
use crate::seqvars::query::schema::case::Case;
use crate::seqvars::query::schema::settings::{GenotypeChoice, QuerySettings};
use crate::seqvars::query::statement::{
    GeneCountMode, Statement, FATHER_MARKER, MARKER, MOTHER_MARKER,
};

/// Turns the query parts of a builder into one statement.
pub trait Combiner: std::fmt::Debug {
    /// The combined statement, without final ordering.
    fn combine(
        &self,
        builder: &QueryPartsBuilder,
        ctx: &ExtenderContext,
    ) -> Result<Statement, ConfigError>;

    /// The combined statement, ordered by coordinate and case.
    fn statement(
        &self,
        builder: &QueryPartsBuilder,
        ctx: &ExtenderContext,
    ) -> Result<Statement, ConfigError> {
        Ok(Statement::OrderBy(Box::new(self.combine(builder, ctx)?)))
    }
}

/// Runs the builder once with the configured genotype patterns.
#[derive(Debug, Clone, Default)]
pub struct DefaultCombiner;

impl Combiner for DefaultCombiner {
    fn combine(
        &self,
        builder: &QueryPartsBuilder,
        ctx: &ExtenderContext,
    ) -> Result<Statement, ConfigError> {
        Ok(Statement::Select(builder.build(ctx)?))
    }
}

/// Run the builder with genotype overrides and add literal marker fields.
fn marked_select(
    builder: &QueryPartsBuilder,
    ctx: &ExtenderContext,
    genotype: &IndexMap<String, GenotypeChoice>,
    markers: &[(&str, i64)],
) -> Result<Statement, ConfigError> {
    let mut parts = builder.build(&ctx.with_genotype(genotype))?;
    parts.fields.extend(
        markers
            .iter()
            .map(|(name, value)| Field::new(*name, Expr::literal(*value))),
    );
    Ok(Statement::Select(parts))
}

/// Compound heterozygous mode for one index.
///
/// Parents count only if they have genotype data; without any, the index is
/// treated as a singleton.  Members other than index and parents keep their
/// configured genotype patterns.
#[derive(Debug, Clone)]
pub struct CompHetCombiner {
    index: String,
    father: Option<String>,
    mother: Option<String>,
}

impl CompHetCombiner {
    /// # Errors
    ///
    /// `ConfigError::IndexNotInPedigree` if `index` is not a member of the case.
    pub fn new(case: &Case, index: &str) -> Result<Self, ConfigError> {
        let member = case
            .member(index)
            .ok_or_else(|| ConfigError::IndexNotInPedigree(index.to_string(), case.id.clone()))?;
        let with_gt = |name: Option<&str>| {
            name.and_then(|name| case.member_with_gt(name))
                .map(|member| member.name.clone())
        };
        Ok(Self {
            index: index.to_string(),
            father: with_gt(member.father()),
            mother: with_gt(member.mother()),
        })
    }

    /// Whether no parent has genotype data.
    pub fn is_singleton(&self) -> bool {
        self.father.is_none() && self.mother.is_none()
    }

    /// Genotype overrides for index and parents; absent parents are left out.
    fn genotype(
        &self,
        index: GenotypeChoice,
        father: GenotypeChoice,
        mother: GenotypeChoice,
    ) -> IndexMap<String, GenotypeChoice> {
        let mut result = IndexMap::new();
        result.insert(self.index.clone(), index);
        if let Some(name) = &self.father {
            result.insert(name.clone(), father);
        }
        if let Some(name) = &self.mother {
            result.insert(name.clone(), mother);
        }
        result
    }
}

impl Combiner for CompHetCombiner {
    fn combine(
        &self,
        builder: &QueryPartsBuilder,
        ctx: &ExtenderContext,
    ) -> Result<Statement, ConfigError> {
        use GenotypeChoice::*;

        if self.is_singleton() {
            tracing::debug!("index {} has no parents with genotypes", &self.index);
            let statement =
                marked_select(builder, ctx, &self.genotype(Het, Any, Any), &[(MARKER, 1)])?;
            return Ok(Statement::GeneCountFilter {
                statement: Box::new(statement),
                mode: GeneCountMode::Singleton,
            });
        }

        let paternal = marked_select(
            builder,
            ctx,
            &self.genotype(Het, Het, Ref),
            &[(FATHER_MARKER, 1), (MOTHER_MARKER, 0)],
        )?;
        let maternal = marked_select(
            builder,
            ctx,
            &self.genotype(Het, Ref, Het),
            &[(FATHER_MARKER, 0), (MOTHER_MARKER, 1)],
        )?;
        Ok(Statement::GeneCountFilter {
            statement: Box::new(Statement::Union(vec![paternal, maternal])),
            mode: GeneCountMode::BothParents,
        })
    }
}

/// Recessive mode: compound heterozygous or homozygous in the index.
///
/// Variants satisfying both branches are emitted twice.
#[derive(Debug, Clone)]
pub struct RecessiveCombiner {
    comphet: CompHetCombiner,
}

impl RecessiveCombiner {
    /// # Errors
    ///
    /// `ConfigError::IndexNotInPedigree` if `index` is not a member of the case.
    pub fn new(case: &Case, index: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            comphet: CompHetCombiner::new(case, index)?,
        })
    }
}

impl Combiner for RecessiveCombiner {
    fn combine(
        &self,
        builder: &QueryPartsBuilder,
        ctx: &ExtenderContext,
    ) -> Result<Statement, ConfigError> {
        use GenotypeChoice::*;

        let comphet = self.comphet.combine(builder, ctx)?;
        let homozygous = builder.build(&ctx.with_genotype(&self.comphet.genotype(Hom, Het, Het)))?;
        Ok(Statement::Union(vec![comphet, Statement::Select(homozygous)]))
    }
}

/// The combiner for the inheritance mode selected in `settings`.
///
/// Recessive mode takes precedence over compound heterozygous mode.
pub fn combiner_for(
    case: &Case,
    settings: &QuerySettings,
) -> Result<Box<dyn Combiner>, ConfigError> {
    if let Some(index) = &settings.recessive_index {
        Ok(Box::new(RecessiveCombiner::new(case, index)?))
    } else if let Some(index) = &settings.compound_recessive_index {
        Ok(Box::new(CompHetCombiner::new(case, index)?))
    } else {
        Ok(Box::new(DefaultCombiner))
    }
}
