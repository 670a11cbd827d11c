//! Genotype and call quality filter.

use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::genotype::GenotypePredicateBuilder;
use crate::seqvars::query::parts::Predicate;

/// Gates every pedigree member with genotype data on its genotype pattern
/// and call quality.
///
/// Genotype overrides of the context (set by the inheritance mode
/// combiners) take precedence over the configured patterns.
#[derive(Debug, Clone)]
pub struct GenotypeFilter {
    condition: Predicate,
}

impl GenotypeFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            condition: GenotypePredicateBuilder::new(ctx.case, ctx.settings).build(ctx.genotype),
        }
    }
}

impl Extender for GenotypeFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::GenotypeFilter
    }

    fn conditions(&self) -> Vec<Predicate> {
        vec![self.condition.clone()]
    }
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;

    use super::*;
    use crate::seqvars::query::extender::test::passes;
    use crate::seqvars::query::parts::QueryParts;
    use crate::seqvars::query::schema::case::test::trio;
    use crate::seqvars::query::schema::data::test::record;
    use crate::seqvars::query::schema::settings::test::flat;
    use crate::seqvars::query::schema::settings::{GenotypeChoice, QuerySettings};
    use crate::seqvars::query::store::AnnotationCatalog;

    #[test]
    fn de_novo_pattern() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(
            &flat(serde_json::json!({
                "index_gt": "het",
                "father_gt": "ref",
                "mother_gt": "ref",
            })),
            &case,
        )?;
        let parts = GenotypeFilter::new(&ExtenderContext::new(&case, &settings))
            .extend(&QueryParts::default());
        let catalog = AnnotationCatalog::default();

        let de_novo = record(
            "case",
            100,
            "1",
            &[("index", "0/1"), ("father", "0/0"), ("mother", "0/0")],
        );
        let inherited = record(
            "case",
            100,
            "1",
            &[("index", "0/1"), ("father", "0/1"), ("mother", "0/0")],
        );
        assert!(passes(&parts, &catalog, &de_novo));
        assert!(!passes(&parts, &catalog, &inherited));
        Ok(())
    }

    #[test]
    fn overrides_replace_configured_pattern() -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(
            &flat(serde_json::json!({ "index_gt": "hom" })),
            &case,
        )?;
        let overrides: IndexMap<String, GenotypeChoice> =
            [(String::from("index"), GenotypeChoice::Het)]
                .into_iter()
                .collect();
        let ctx = ExtenderContext::new(&case, &settings).with_genotype(&overrides);
        let parts = GenotypeFilter::new(&ctx).extend(&QueryParts::default());

        let variant = record("case", 100, "1", &[("index", "0/1")]);
        assert!(passes(&parts, &AnnotationCatalog::default(), &variant));
        Ok(())
    }
}
