//! Named, ordered extender lists bound to one query purpose.

use crate::err::ConfigError;
use crate::seqvars::query::extender::{ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::QueryParts;

/// Purpose of a query; selects the extenders to use.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    clap::ValueEnum,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum QueryPurpose {
    /// Interactive filtering, results are stored.
    #[default]
    Filter,
    /// Reload of stored results for display.
    Prefetched,
    /// Export to a table.
    ExportTable,
    /// Export in VCF-like format.
    ExportVcf,
    /// Query across all cases of a project.
    Project,
}

/// Extenders shared by all purposes that run a fresh query.
const FRESH_QUERY_PREFIX: &[ExtenderKind] = &[
    ExtenderKind::CaseScope,
    ExtenderKind::FrequencyFilter,
    ExtenderKind::InhouseFilter,
    ExtenderKind::MitochondrialFrequenciesJoin,
    ExtenderKind::DbsnpJoinAndFilter,
    ExtenderKind::HgmdJoinAndFilter,
    ExtenderKind::ClinvarJoinAndFilter,
    ExtenderKind::VarTypeFilter,
    ExtenderKind::EffectFilter,
    ExtenderKind::ExonDistanceFilter,
    ExtenderKind::TranscriptCodingFilter,
    ExtenderKind::GeneListsFilter,
    ExtenderKind::GenomicRegionFilter,
    ExtenderKind::GenotypeFilter,
    ExtenderKind::FlagsJoinAndFilter,
    ExtenderKind::CommentsJoin,
    ExtenderKind::AcmgRatingJoin,
];

impl QueryPurpose {
    /// The extenders of the purpose, in application order.
    pub fn extender_kinds(&self) -> Vec<ExtenderKind> {
        let suffix: &[ExtenderKind] = match self {
            QueryPurpose::Filter => &[
                ExtenderKind::GeneSymbolJoin,
                ExtenderKind::GnomadConstraintsJoin,
                ExtenderKind::ExacConstraintsJoin,
                ExtenderKind::ModesOfInheritanceJoin,
                ExtenderKind::DiseaseGeneJoin,
                ExtenderKind::AcmgSecondaryFindingsJoin,
            ],
            QueryPurpose::Prefetched => {
                return vec![
                    ExtenderKind::CaseScope,
                    ExtenderKind::QueryResultScope,
                    ExtenderKind::MitochondrialFrequenciesJoin,
                    ExtenderKind::DbsnpJoin,
                    ExtenderKind::HgmdJoin,
                    ExtenderKind::ClinvarJoin,
                    ExtenderKind::FlagsJoin,
                    ExtenderKind::CommentsJoin,
                    ExtenderKind::AcmgRatingJoin,
                    ExtenderKind::GeneSymbolJoin,
                    ExtenderKind::GnomadConstraintsJoin,
                    ExtenderKind::ExacConstraintsJoin,
                    ExtenderKind::ModesOfInheritanceJoin,
                    ExtenderKind::DiseaseGeneJoin,
                    ExtenderKind::AcmgSecondaryFindingsJoin,
                ];
            }
            QueryPurpose::ExportTable => &[
                ExtenderKind::GeneSymbolJoin,
                ExtenderKind::GnomadConstraintsJoin,
                ExtenderKind::ExacConstraintsJoin,
                ExtenderKind::ModesOfInheritanceJoin,
                ExtenderKind::DiseaseGeneJoin,
            ],
            QueryPurpose::ExportVcf => &[ExtenderKind::GeneSymbolJoin],
            QueryPurpose::Project => &[ExtenderKind::GeneSymbolJoin, ExtenderKind::DiseaseGeneJoin],
        };
        FRESH_QUERY_PREFIX.iter().chain(suffix).copied().collect()
    }
}

/// Applies a named, ordered list of extenders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPartsBuilder {
    /// Name, used in error messages.
    pub name: String,
    /// The extenders, in application order.
    pub kinds: Vec<ExtenderKind>,
}

impl QueryPartsBuilder {
    pub fn new(name: &str, kinds: Vec<ExtenderKind>) -> Self {
        Self {
            name: name.to_string(),
            kinds,
        }
    }

    /// The builder for the given purpose.
    pub fn for_purpose(purpose: QueryPurpose) -> Self {
        Self::new(&purpose.to_string(), purpose.extender_kinds())
    }

    /// Configure all extenders from `ctx` and apply them in order.
    ///
    /// # Errors
    ///
    /// `ConfigError::DuplicateExtender` if a kind occurs twice, or the error
    /// of the first extender that cannot be configured.
    pub fn build(&self, ctx: &ExtenderContext) -> Result<QueryParts, ConfigError> {
        for (i, kind) in self.kinds.iter().enumerate() {
            if self.kinds[..i].contains(kind) {
                return Err(ConfigError::DuplicateExtender(
                    kind.to_string(),
                    self.name.clone(),
                ));
            }
        }

        let mut parts = QueryParts::default();
        for kind in &self.kinds {
            parts = kind.build(ctx)?.extend(&parts);
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::seqvars::query::schema::case::test::trio;
    use crate::seqvars::query::schema::settings::QuerySettings;

    #[test]
    fn fresh_purposes_share_prefix() {
        for purpose in QueryPurpose::iter().filter(|p| *p != QueryPurpose::Prefetched) {
            let kinds = purpose.extender_kinds();
            assert_eq!(&kinds[..FRESH_QUERY_PREFIX.len()], FRESH_QUERY_PREFIX);
        }
    }

    #[test]
    fn purposes_have_no_duplicates() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        let ctx = ExtenderContext {
            query_id: Some(uuid::Uuid::nil()),
            ..ExtenderContext::new(&case, &settings)
        };
        for purpose in QueryPurpose::iter() {
            QueryPartsBuilder::for_purpose(purpose).build(&ctx)?;
        }
        Ok(())
    }

    #[test]
    fn duplicate_extender_is_rejected() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        let ctx = ExtenderContext::new(&case, &settings);
        let builder = QueryPartsBuilder::new(
            "custom",
            vec![
                ExtenderKind::CaseScope,
                ExtenderKind::DbsnpJoin,
                ExtenderKind::DbsnpJoin,
            ],
        );
        assert_eq!(
            builder.build(&ctx),
            Err(ConfigError::DuplicateExtender(
                String::from("dbsnp-join"),
                String::from("custom")
            ))
        );
        Ok(())
    }

    #[test]
    fn prefetched_requires_query_id() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&Default::default(), &case)?;
        let ctx = ExtenderContext::new(&case, &settings);
        assert_eq!(
            QueryPartsBuilder::for_purpose(QueryPurpose::Prefetched).build(&ctx),
            Err(ConfigError::MissingQueryId(String::from("case")))
        );
        Ok(())
    }

    #[test]
    fn purpose_names() {
        insta::assert_snapshot!(
            QueryPurpose::iter().map(|p| p.to_string()).collect::<Vec<_>>().join(","),
            @"filter,prefetched,export-table,export-vcf,project"
        );
    }
}
