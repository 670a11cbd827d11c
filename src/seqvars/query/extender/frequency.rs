//! Population and in-house frequency filters.

use strum::IntoEnumIterator;

use crate::common::CHROM_NO_MT;
use crate::seqvars::query::extender::variant_dbs::mitochondrial_join;
use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::{Expr, Field, Predicate, Selectable};
use crate::seqvars::query::schema::settings::{
    FrequencyDb, FrequencySettings, InhouseThresholds, MitochondrialDb,
};
use crate::seqvars::query::value::Value;

const NUCLEAR_FIELDS: &[&str] = &["frequency", "homozygous", "heterozygous", "hemizygous"];

/// Upper bound on a column, missing values count as zero.
fn at_most(column: String, threshold: impl Into<Value>) -> Predicate {
    Expr::column(column).or_default(0).at_most(threshold)
}

/// Upper bounds on population frequencies and carrier counts.
///
/// Nuclear databases apply to variants outside of the mitochondrial genome,
/// the mitochondrial databases to variants on it.  Only enabled databases
/// are considered.
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    settings: FrequencySettings,
}

impl FrequencyFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            settings: ctx.settings.frequency.clone(),
        }
    }

    fn enabled_mitochondrial(&self) -> impl Iterator<Item = MitochondrialDb> + '_ {
        MitochondrialDb::iter().filter(|db| self.settings.mitochondrial[*db].enabled)
    }

    fn nuclear_conditions(&self) -> Vec<Predicate> {
        let mut result = Vec::new();
        for db in FrequencyDb::iter() {
            let thresholds = &self.settings.nuclear[db];
            if !thresholds.enabled {
                continue;
            }
            if let Some(frequency) = thresholds.frequency {
                result.push(at_most(format!("{db}_frequency"), frequency));
            }
            if let Some(homozygous) = thresholds.homozygous {
                result.push(at_most(format!("{db}_homozygous"), homozygous));
            }
            if let Some(heterozygous) = thresholds.heterozygous {
                result.push(at_most(format!("{db}_heterozygous"), heterozygous));
            }
            if let Some(hemizygous) = thresholds.hemizygous {
                result.push(at_most(format!("{db}_hemizygous"), hemizygous));
            }
        }
        result
    }

    fn mitochondrial_conditions(&self) -> Vec<Predicate> {
        let mut result = Vec::new();
        for db in self.enabled_mitochondrial() {
            let thresholds = &self.settings.mitochondrial[db];
            if let Some(frequency) = thresholds.frequency {
                result.push(at_most(format!("{db}_frequency"), frequency));
            }
            if let Some(count) = thresholds.count {
                result.push(at_most(format!("{db}_count"), count));
            }
            if let Some(het_count) = thresholds.het_count {
                result.push(at_most(format!("{db}_het_count"), het_count));
            }
            if let Some(hom_count) = thresholds.hom_count {
                result.push(at_most(format!("{db}_hom_count"), hom_count));
            }
        }
        result
    }
}

impl Extender for FrequencyFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::FrequencyFilter
    }

    fn fields(&self) -> Vec<Field> {
        FrequencyDb::iter()
            .flat_map(|db| {
                NUCLEAR_FIELDS
                    .iter()
                    .map(move |field| Field::column(&format!("{db}_{field}")))
            })
            .collect()
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        self.enabled_mitochondrial()
            .fold(selectable, |selectable, db| {
                selectable.join(mitochondrial_join(db))
            })
    }

    fn conditions(&self) -> Vec<Predicate> {
        let nuclear = self.nuclear_conditions();
        let mitochondrial = self.mitochondrial_conditions();
        if nuclear.is_empty() && mitochondrial.is_empty() {
            return Vec::new();
        }
        let chromosome_no = Expr::column("chromosome_no");
        vec![Predicate::or(vec![
            Predicate::and(
                std::iter::once(chromosome_no.clone().not_equals(CHROM_NO_MT))
                    .chain(nuclear)
                    .collect(),
            ),
            Predicate::and(
                std::iter::once(chromosome_no.equals(CHROM_NO_MT))
                    .chain(mitochondrial)
                    .collect(),
            ),
        ])]
    }
}

/// Upper bounds on in-house carrier counts.
#[derive(Debug, Clone)]
pub struct InhouseFilter {
    thresholds: InhouseThresholds,
}

impl InhouseFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            thresholds: ctx.settings.frequency.inhouse.clone(),
        }
    }
}

impl Extender for InhouseFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::InhouseFilter
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::column("inhouse_carriers"),
            Field::column("inhouse_hom_alt"),
        ]
    }

    fn conditions(&self) -> Vec<Predicate> {
        if !self.thresholds.enabled {
            return Vec::new();
        }
        let mut result = Vec::new();
        if let Some(carriers) = self.thresholds.carriers {
            result.push(at_most(String::from("inhouse_carriers"), carriers));
        }
        if let Some(homozygous) = self.thresholds.homozygous {
            result.push(at_most(String::from("inhouse_hom_alt"), homozygous));
        }
        result
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;
    use crate::seqvars::query::extender::test::passes;
    use crate::seqvars::query::parts::QueryParts;
    use crate::seqvars::query::schema::case::test::trio;
    use crate::seqvars::query::schema::data::test::record;
    use crate::seqvars::query::schema::data::VariantRecord;
    use crate::seqvars::query::schema::settings::test::flat;
    use crate::seqvars::query::schema::settings::QuerySettings;
    use crate::seqvars::query::store::test::variant_row;
    use crate::seqvars::query::store::{AnnotationCatalog, ReferenceTable};

    fn filter_parts(json: serde_json::Value) -> Result<QueryParts, anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(&flat(json), &case)?;
        let ctx = ExtenderContext::new(&case, &settings);
        Ok(FrequencyFilter::new(&ctx).extend(&QueryParts::default()))
    }

    fn nuclear(frequency: f64, homozygous: i32) -> VariantRecord {
        let mut result = record("case", 100, "1", &[]);
        result.gnomad_exomes.frequency = frequency;
        result.gnomad_exomes.homozygous = homozygous;
        result
    }

    #[rstest]
    #[case::below(0.005, 0, true)]
    #[case::exactly_at_threshold(0.01, 0, true)]
    #[case::above(0.010001, 0, false)]
    #[case::too_many_homozygous(0.001, 1, false)]
    fn nuclear_thresholds(
        #[case] frequency: f64,
        #[case] homozygous: i32,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        let parts = filter_parts(serde_json::json!({
            "gnomad_exomes_enabled": true,
            "gnomad_exomes_frequency": 0.01,
            "gnomad_exomes_homozygous": 0,
        }))?;
        assert_eq!(
            passes(
                &parts,
                &AnnotationCatalog::default(),
                &nuclear(frequency, homozygous)
            ),
            expected
        );
        Ok(())
    }

    #[test]
    fn disabled_database_is_ignored() -> Result<(), anyhow::Error> {
        let parts = filter_parts(serde_json::json!({
            "gnomad_exomes_enabled": false,
            "gnomad_exomes_frequency": 0.01,
        }))?;
        assert!(parts.conditions.is_empty());
        assert!(passes(
            &parts,
            &AnnotationCatalog::default(),
            &nuclear(0.5, 100)
        ));
        Ok(())
    }

    #[rstest]
    #[case::few_homoplasmic(2, true)]
    #[case::many_homoplasmic(5, false)]
    fn mitochondrial_branch(
        #[case] hom_count: i32,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        let parts = filter_parts(serde_json::json!({
            "gnomad_exomes_enabled": true,
            "gnomad_exomes_frequency": 0.0,
            "helixmtdb_enabled": true,
            "helixmtdb_hom_count": 3,
        }))?;
        let mut variant = record("case", 73, "1", &[]);
        variant.chromosome = String::from("MT");
        // Nuclear thresholds must not apply on the mitochondrial genome.
        variant.gnomad_exomes.frequency = 0.5;
        let mut catalog = AnnotationCatalog::default();
        catalog.insert(
            ReferenceTable::Helixmtdb,
            vec![variant_row(
                &variant,
                &[("hom_count", Value::from(hom_count))],
            )],
        );

        assert_eq!(passes(&parts, &catalog, &variant), expected);
        Ok(())
    }

    #[rstest]
    #[case(false, 50, true)]
    #[case(true, 5, true)]
    #[case(true, 11, false)]
    fn inhouse(
        #[case] enabled: bool,
        #[case] carriers: i32,
        #[case] expected: bool,
    ) -> Result<(), anyhow::Error> {
        let case = trio("case");
        let settings = QuerySettings::from_flat(
            &flat(serde_json::json!({
                "inhouse_enabled": enabled,
                "inhouse_carriers": 10,
            })),
            &case,
        )?;
        let ctx = ExtenderContext::new(&case, &settings);
        let parts = InhouseFilter::new(&ctx).extend(&QueryParts::default());
        let mut variant = record("case", 100, "1", &[]);
        variant.inhouse_carriers = carriers;

        assert_eq!(
            passes(&parts, &AnnotationCatalog::default(), &variant),
            expected
        );
        Ok(())
    }
}
