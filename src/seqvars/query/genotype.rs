//! Per-member genotype and call quality predicates.

use indexmap::IndexMap;

use crate::seqvars::query::parts::{CallField, Expr, Predicate};
use crate::seqvars::query::schema::case::Case;
use crate::seqvars::query::schema::settings::{
    FailChoice, GenotypeChoice, QuerySettings, SampleQualitySettings,
};

const REF_GTS: &[&str] = &["0/0", "0|0", "0"];
const HET_GTS: &[&str] = &["0/1", "0|1", "1/0", "1|0"];
const HOM_GTS: &[&str] = &["1/1", "1|1", "1"];
const NO_CALL_GTS: &[&str] = &["./.", ".|.", "."];

/// Genotype strings accepted for the given choice, empty for "any".
///
/// Covers unphased (`/`), phased (`|`) and haploid calls.
pub fn genotype_literals(choice: GenotypeChoice) -> Vec<&'static str> {
    match choice {
        GenotypeChoice::Any => Vec::new(),
        GenotypeChoice::Ref => REF_GTS.to_vec(),
        GenotypeChoice::Het => HET_GTS.to_vec(),
        GenotypeChoice::Hom => HOM_GTS.to_vec(),
        GenotypeChoice::Variant => [HET_GTS, HOM_GTS].concat(),
        GenotypeChoice::NonVariant => [REF_GTS, NO_CALL_GTS].concat(),
    }
}

/// Genotype string of `member`, empty string if unset.
fn gt_or_empty(member: &str) -> Expr {
    Expr::call(member, CallField::Gt).or_default("")
}

/// Threshold check that passes when the call has no value for the field.
fn at_least_if_set(member: &str, field: CallField, threshold: i32) -> Predicate {
    let value = Expr::call(member, field);
    Predicate::or(vec![value.clone().is_null(), value.at_least(threshold)])
}

/// Builds the predicates gating genotype calls and call quality.
#[derive(Debug, Clone, Copy)]
pub struct GenotypePredicateBuilder<'a> {
    case: &'a Case,
    settings: &'a QuerySettings,
}

impl<'a> GenotypePredicateBuilder<'a> {
    pub fn new(case: &'a Case, settings: &'a QuerySettings) -> Self {
        Self { case, settings }
    }

    /// The member's genotype is one of the literals implied by `choice`.
    pub fn genotype_gate(member: &str, choice: GenotypeChoice) -> Predicate {
        let literals = genotype_literals(choice);
        if literals.is_empty() {
            Predicate::Const(true)
        } else {
            Expr::call(member, CallField::Gt).is_in(literals)
        }
    }

    /// The member's call passes the quality thresholds.
    ///
    /// Vacuously true if the member has no entry in the genotype data; each
    /// threshold is skipped when the call lacks the corresponding value.
    pub fn quality_gate(member: &str, quality: &SampleQualitySettings) -> Predicate {
        let is_het = gt_or_empty(member).is_in(HET_GTS.iter().copied());
        let is_ref = gt_or_empty(member).is_in(REF_GTS.iter().copied());

        let mut checks = Vec::new();
        if let Some(gq) = quality.gq {
            checks.push(at_least_if_set(member, CallField::Gq, gq));
        }
        if let Some(dp_het) = quality.dp_het {
            checks.push(Predicate::implies(
                is_het.clone(),
                at_least_if_set(member, CallField::Dp, dp_het),
            ));
        }
        if let Some(dp_hom) = quality.dp_hom {
            checks.push(Predicate::or(vec![
                is_het.clone(),
                at_least_if_set(member, CallField::Dp, dp_hom),
            ]));
        }
        if let Some(ad) = quality.ad {
            checks.push(Predicate::or(vec![
                is_ref,
                at_least_if_set(member, CallField::Ad, ad),
            ]));
        }
        if let Some(ad_max) = quality.ad_max {
            let value = Expr::call(member, CallField::Ad);
            checks.push(Predicate::or(vec![
                value.clone().is_null(),
                value.at_most(ad_max),
            ]));
        }
        if let Some(ab) = quality.ab {
            checks.push(Predicate::implies(
                is_het,
                Predicate::AlleleBalance {
                    sample: member.to_string(),
                    min_ab: ab,
                },
            ));
        }

        Predicate::or(vec![
            Predicate::not(Predicate::HasSample(member.to_string())),
            Predicate::and(checks),
        ])
    }

    /// Combine genotype and quality gate according to the fail policy.
    pub fn member_predicate(
        member: &str,
        choice: GenotypeChoice,
        quality: &SampleQualitySettings,
    ) -> Predicate {
        let genotype = Self::genotype_gate(member, choice);
        match quality.fail {
            FailChoice::Ignore => genotype,
            FailChoice::Drop => {
                Predicate::and(vec![genotype, Self::quality_gate(member, quality)])
            }
            FailChoice::NoCall => Predicate::or(vec![
                genotype,
                Predicate::not(Self::quality_gate(member, quality)),
            ]),
        }
    }

    /// Conjunction of the member predicates of all members with genotype data.
    ///
    /// `overrides` replaces the configured genotype choice of the given
    /// members; quality settings always come from the settings.
    pub fn build(&self, overrides: Option<&IndexMap<String, GenotypeChoice>>) -> Predicate {
        Predicate::and(
            self.case
                .members_with_gt()
                .map(|member| {
                    let settings = self.settings.member(&member.name);
                    let choice = overrides
                        .and_then(|overrides| overrides.get(&member.name).copied())
                        .unwrap_or(settings.gt);
                    Self::member_predicate(&member.name, choice, &settings.quality)
                })
                .collect(),
        )
    }
}
