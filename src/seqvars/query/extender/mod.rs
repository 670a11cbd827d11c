//! Extenders contribute fields, joins and conditions to `QueryParts`.
//!
//! Each extender is configured once from an `ExtenderContext` (case,
//! settings, optional query id and genotype overrides).  Applying it to a
//! `QueryParts` value yields a new value; the input is never modified.

pub mod case;
pub mod effects;
pub mod frequency;
pub mod genes;
pub mod genotype;
pub mod user_annos;
pub mod variant_dbs;

use indexmap::IndexMap;

use crate::err::ConfigError;
use crate::seqvars::query::parts::{Field, Predicate, QueryParts, Selectable};
use crate::seqvars::query::schema::case::Case;
use crate::seqvars::query::schema::settings::{GenotypeChoice, QuerySettings};

/// Everything an extender may be configured from.
#[derive(Debug, Clone, Copy)]
pub struct ExtenderContext<'a> {
    pub case: &'a Case,
    pub settings: &'a QuerySettings,
    /// Query whose stored results are reloaded, if any.
    pub query_id: Option<uuid::Uuid>,
    /// Genotype choices replacing the configured ones, used by the
    /// inheritance mode combiners.
    pub genotype: Option<&'a IndexMap<String, GenotypeChoice>>,
}

impl<'a> ExtenderContext<'a> {
    pub fn new(case: &'a Case, settings: &'a QuerySettings) -> Self {
        Self {
            case,
            settings,
            query_id: None,
            genotype: None,
        }
    }

    /// Copy of the context with the given genotype overrides.
    pub fn with_genotype(self, genotype: &'a IndexMap<String, GenotypeChoice>) -> Self {
        Self {
            genotype: Some(genotype),
            ..self
        }
    }
}

/// Contributes to query parts.
pub trait Extender: std::fmt::Debug {
    /// The kind of the extender.
    fn kind(&self) -> ExtenderKind;

    /// Additional output fields.
    fn fields(&self) -> Vec<Field> {
        Vec::new()
    }

    /// Extend the join source.
    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable
    }

    /// Additional conditions.
    fn conditions(&self) -> Vec<Predicate> {
        Vec::new()
    }

    /// Compose this extender over `parts`.
    fn extend(&self, parts: &QueryParts) -> QueryParts {
        QueryParts {
            fields: parts
                .fields
                .iter()
                .cloned()
                .chain(self.fields())
                .collect(),
            selectable: self.selectable(parts.selectable.clone()),
            conditions: parts
                .conditions
                .iter()
                .cloned()
                .chain(self.conditions())
                .collect(),
        }
    }
}

/// The available extenders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ExtenderKind {
    CaseScope,
    QueryResultScope,
    DbsnpJoin,
    DbsnpJoinAndFilter,
    ClinvarJoin,
    ClinvarJoinAndFilter,
    HgmdJoin,
    HgmdJoinAndFilter,
    MitochondrialFrequenciesJoin,
    FrequencyFilter,
    InhouseFilter,
    VarTypeFilter,
    EffectFilter,
    ExonDistanceFilter,
    TranscriptCodingFilter,
    GeneListsFilter,
    GenomicRegionFilter,
    GeneSymbolJoin,
    GnomadConstraintsJoin,
    ExacConstraintsJoin,
    ModesOfInheritanceJoin,
    DiseaseGeneJoin,
    AcmgSecondaryFindingsJoin,
    GenotypeFilter,
    FlagsJoin,
    FlagsJoinAndFilter,
    CommentsJoin,
    AcmgRatingJoin,
}

impl ExtenderKind {
    /// Configure an extender of this kind.
    ///
    /// # Errors
    ///
    /// Fails when a value the extender requires is missing, e.g., the case
    /// has no active variant set.
    pub fn build(&self, ctx: &ExtenderContext) -> Result<Box<dyn Extender>, ConfigError> {
        Ok(match self {
            ExtenderKind::CaseScope => Box::new(case::CaseScope::new(ctx)?),
            ExtenderKind::QueryResultScope => Box::new(case::QueryResultScope::new(ctx)?),
            ExtenderKind::DbsnpJoin => Box::new(variant_dbs::DbsnpJoin::new(ctx, false)),
            ExtenderKind::DbsnpJoinAndFilter => Box::new(variant_dbs::DbsnpJoin::new(ctx, true)),
            ExtenderKind::ClinvarJoin => Box::new(variant_dbs::ClinvarJoin::new(ctx, false)),
            ExtenderKind::ClinvarJoinAndFilter => {
                Box::new(variant_dbs::ClinvarJoin::new(ctx, true))
            }
            ExtenderKind::HgmdJoin => Box::new(variant_dbs::HgmdJoin::new(ctx, false)),
            ExtenderKind::HgmdJoinAndFilter => Box::new(variant_dbs::HgmdJoin::new(ctx, true)),
            ExtenderKind::MitochondrialFrequenciesJoin => {
                Box::new(variant_dbs::MitochondrialFrequenciesJoin)
            }
            ExtenderKind::FrequencyFilter => Box::new(frequency::FrequencyFilter::new(ctx)),
            ExtenderKind::InhouseFilter => Box::new(frequency::InhouseFilter::new(ctx)),
            ExtenderKind::VarTypeFilter => Box::new(effects::VarTypeFilter::new(ctx)),
            ExtenderKind::EffectFilter => Box::new(effects::EffectFilter::new(ctx)),
            ExtenderKind::ExonDistanceFilter => Box::new(effects::ExonDistanceFilter::new(ctx)),
            ExtenderKind::TranscriptCodingFilter => {
                Box::new(effects::TranscriptCodingFilter::new(ctx))
            }
            ExtenderKind::GeneListsFilter => Box::new(genes::GeneListsFilter::new(ctx)),
            ExtenderKind::GenomicRegionFilter => {
                Box::new(effects::GenomicRegionFilter::new(ctx)?)
            }
            ExtenderKind::GeneSymbolJoin => Box::new(genes::GeneSymbolJoin::new(ctx)),
            ExtenderKind::GnomadConstraintsJoin => {
                Box::new(genes::GnomadConstraintsJoin::new(ctx))
            }
            ExtenderKind::ExacConstraintsJoin => Box::new(genes::ExacConstraintsJoin::new(ctx)),
            ExtenderKind::ModesOfInheritanceJoin => {
                Box::new(genes::ModesOfInheritanceJoin::new(ctx))
            }
            ExtenderKind::DiseaseGeneJoin => Box::new(genes::DiseaseGeneJoin::new(ctx)),
            ExtenderKind::AcmgSecondaryFindingsJoin => {
                Box::new(genes::AcmgSecondaryFindingsJoin::new(ctx))
            }
            ExtenderKind::GenotypeFilter => Box::new(genotype::GenotypeFilter::new(ctx)),
            ExtenderKind::FlagsJoin => Box::new(user_annos::FlagsJoin::new(ctx, false)),
            ExtenderKind::FlagsJoinAndFilter => Box::new(user_annos::FlagsJoin::new(ctx, true)),
            ExtenderKind::CommentsJoin => Box::new(user_annos::CommentsJoin),
            ExtenderKind::AcmgRatingJoin => Box::new(user_annos::AcmgRatingJoin),
        })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::seqvars::query::parts::{QueryParts, RowContext};
    use crate::seqvars::query::schema::case::test::trio;
    use crate::seqvars::query::schema::data::VariantRecord;
    use crate::seqvars::query::store::AnnotationCatalog;
    use crate::seqvars::query::value::Value;

    /// Evaluate the joins and conditions of `parts` for `record`.
    pub fn passes(parts: &QueryParts, catalog: &AnnotationCatalog, record: &VariantRecord) -> bool {
        joined(parts, catalog, record, |row| {
            parts.condition().eval(row) == Some(true)
        })
    }

    /// Evaluate the field `name` of `parts` for `record`.
    pub fn field_value(
        parts: &QueryParts,
        catalog: &AnnotationCatalog,
        record: &VariantRecord,
        name: &str,
    ) -> Value {
        joined(parts, catalog, record, |row| {
            parts
                .fields
                .iter()
                .rev()
                .find(|field| field.name == name)
                .map(|field| field.expr.eval(row))
                .unwrap_or_default()
        })
    }

    fn joined<T>(
        parts: &QueryParts,
        catalog: &AnnotationCatalog,
        record: &VariantRecord,
        f: impl FnOnce(&RowContext) -> T,
    ) -> T {
        let mut row = RowContext::new(record);
        for join in &parts.selectable.joins {
            join.prepare(catalog).apply(&mut row);
        }
        f(&row)
    }

    /// Apply the extenders of the given kinds in order.
    pub fn apply(
        kinds: &[ExtenderKind],
        ctx: &ExtenderContext,
    ) -> Result<QueryParts, ConfigError> {
        kinds.iter().try_fold(QueryParts::default(), |parts, kind| {
            Ok(kind.build(ctx)?.extend(&parts))
        })
    }

    #[test]
    fn every_kind_builds_for_trio() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        let ctx = ExtenderContext {
            query_id: Some(uuid::Uuid::nil()),
            ..ExtenderContext::new(&case, &settings)
        };
        for kind in ExtenderKind::iter() {
            assert_eq!(kind.build(&ctx)?.kind(), kind);
        }
        Ok(())
    }

    #[test]
    fn extend_leaves_input_unchanged() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        let ctx = ExtenderContext::new(&case, &settings);
        let base = apply(&[ExtenderKind::CaseScope], &ctx)?;
        let before = base.clone();

        let extended = ExtenderKind::DbsnpJoin.build(&ctx)?.extend(&base);

        assert_eq!(base, before);
        assert_eq!(extended.fields.len(), base.fields.len() + 1);
        assert_eq!(extended.selectable.joins.len(), 1);
        Ok(())
    }

    #[test]
    fn kind_display() {
        assert_eq!(ExtenderKind::CaseScope.to_string(), "case-scope");
        assert_eq!(
            "flags-join-and-filter".parse::<ExtenderKind>().ok(),
            Some(ExtenderKind::FlagsJoinAndFilter)
        );
    }
}
