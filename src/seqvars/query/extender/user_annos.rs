//! Joins of user annotations: flags, comments and ACMG ratings.
//!
//! User annotations belong to one case and are matched on the case and the
//! exact variant.

use strum::IntoEnumIterator;

use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::{
    Aggregate, Expr, Field, JoinKey, JoinPlan, Predicate, Selectable,
};
use crate::seqvars::query::schema::settings::{FlagGrade, FlagSettings, GradedFlag, SimpleFlag};
use crate::seqvars::query::store::ReferenceTable;

fn simple_column(flag: SimpleFlag) -> String {
    format!("flag_{flag}")
}

fn graded_column(flag: GradedFlag) -> String {
    format!("flag_{flag}")
}

/// User flags; with filtering, keeps variants matching any of the enabled
/// flag values.
///
/// Absent flags count as unset, and absent graded flags as "empty", so
/// variants without flags match "simple empty" and every "empty" grade.
#[derive(Debug, Clone)]
pub struct FlagsJoin {
    filter: bool,
    settings: FlagSettings,
}

impl FlagsJoin {
    pub fn new(ctx: &ExtenderContext, filter: bool) -> Self {
        Self {
            filter,
            settings: ctx.settings.flags.clone(),
        }
    }

    /// The terms of the any-of filter.
    fn terms(&self) -> Vec<Predicate> {
        let mut result = Vec::new();
        if self.settings.simple_empty {
            result.push(Predicate::and(
                SimpleFlag::iter()
                    .map(|flag| Expr::column(simple_column(flag)).or_default(false).equals(false))
                    .collect(),
            ));
        }
        for flag in SimpleFlag::iter().filter(|flag| self.settings.simple[*flag]) {
            result.push(Expr::column(simple_column(flag)).or_default(false).equals(true));
        }
        for flag in GradedFlag::iter() {
            let column =
                Expr::column(graded_column(flag)).or_default(FlagGrade::Empty.to_string());
            for grade in FlagGrade::iter().filter(|grade| self.settings.graded[flag][*grade]) {
                result.push(column.clone().equals(grade.to_string()));
            }
        }
        result
    }
}

impl Extender for FlagsJoin {
    fn kind(&self) -> ExtenderKind {
        if self.filter {
            ExtenderKind::FlagsJoinAndFilter
        } else {
            ExtenderKind::FlagsJoin
        }
    }

    fn fields(&self) -> Vec<Field> {
        SimpleFlag::iter()
            .map(simple_column)
            .chain(GradedFlag::iter().map(graded_column))
            .map(|name| Field::column(&name))
            .collect()
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        let plan = JoinPlan::new(
            "small_variant_flags",
            ReferenceTable::SmallVariantFlags,
            JoinKey::CaseVariant,
        );
        let plan = SimpleFlag::iter().fold(plan, |plan, flag| {
            let column = simple_column(flag);
            plan.output(&column, &column, Aggregate::BoolOr)
        });
        let plan = GradedFlag::iter().fold(plan, |plan, flag| {
            let column = graded_column(flag);
            plan.output(&column, &column, Aggregate::First)
        });
        selectable.join(plan)
    }

    fn conditions(&self) -> Vec<Predicate> {
        if self.filter {
            vec![Predicate::or(self.terms())]
        } else {
            Vec::new()
        }
    }
}

/// Number of user comments.
#[derive(Debug, Clone)]
pub struct CommentsJoin;

impl Extender for CommentsJoin {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::CommentsJoin
    }

    fn fields(&self) -> Vec<Field> {
        vec![Field::column("comment_count")]
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(
            JoinPlan::new(
                "small_variant_comments",
                ReferenceTable::SmallVariantComments,
                JoinKey::CaseVariant,
            )
            .output("comment_count", "text", Aggregate::Count),
        )
    }
}

/// Highest ACMG class assigned by users.
#[derive(Debug, Clone)]
pub struct AcmgRatingJoin;

impl Extender for AcmgRatingJoin {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::AcmgRatingJoin
    }

    fn fields(&self) -> Vec<Field> {
        vec![Field::column("acmg_class")]
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(
            JoinPlan::new(
                "acmg_ratings",
                ReferenceTable::AcmgRatings,
                JoinKey::CaseVariant,
            )
            .output("acmg_class", "class", Aggregate::Max),
        )
    }
}
