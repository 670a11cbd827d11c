//! Joins against variant databases, matched on variant identity.

use strum::IntoEnumIterator;

use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::{
    Aggregate, Expr, Field, JoinKey, JoinPlan, Predicate, Selectable,
};
use crate::seqvars::query::schema::settings::{ClinvarCategory, MitochondrialDb};
use crate::seqvars::query::store::ReferenceTable;

/// dbSNP identifiers; with filtering, optionally removes variants in dbSNP.
#[derive(Debug, Clone)]
pub struct DbsnpJoin {
    filter: bool,
    remove_if_in_dbsnp: bool,
}

impl DbsnpJoin {
    pub fn new(ctx: &ExtenderContext, filter: bool) -> Self {
        Self {
            filter,
            remove_if_in_dbsnp: ctx.settings.remove_if_in_dbsnp,
        }
    }
}

impl Extender for DbsnpJoin {
    fn kind(&self) -> ExtenderKind {
        if self.filter {
            ExtenderKind::DbsnpJoinAndFilter
        } else {
            ExtenderKind::DbsnpJoin
        }
    }

    fn fields(&self) -> Vec<Field> {
        vec![Field::column("rsid")]
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(
            JoinPlan::new("dbsnp", ReferenceTable::Dbsnp, JoinKey::Variant)
                .output("rsid", "rsid", Aggregate::First)
                .output("in_dbsnp", "rsid", Aggregate::Exists),
        )
    }

    fn conditions(&self) -> Vec<Predicate> {
        if self.filter && self.remove_if_in_dbsnp {
            vec![Expr::column("in_dbsnp").equals(false)]
        } else {
            Vec::new()
        }
    }
}

/// ClinVar interpretations; with filtering, optionally requires membership
/// with one of the selected interpretations.
#[derive(Debug, Clone)]
pub struct ClinvarJoin {
    filter: bool,
    require_in_clinvar: bool,
    include: Vec<ClinvarCategory>,
}

impl ClinvarJoin {
    pub fn new(ctx: &ExtenderContext, filter: bool) -> Self {
        Self {
            filter,
            require_in_clinvar: ctx.settings.clinvar.require_in_clinvar,
            include: ctx.settings.clinvar.include.clone(),
        }
    }
}

impl Extender for ClinvarJoin {
    fn kind(&self) -> ExtenderKind {
        if self.filter {
            ExtenderKind::ClinvarJoinAndFilter
        } else {
            ExtenderKind::ClinvarJoin
        }
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::column("clinvar_pathogenicity"),
            Field::column("clinvar_vcv"),
        ]
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(
            JoinPlan::new("clinvar", ReferenceTable::Clinvar, JoinKey::Variant)
                .output("clinvar_pathogenicity", "pathogenicity", Aggregate::Collect)
                .output("clinvar_vcv", "vcv", Aggregate::First),
        )
    }

    fn conditions(&self) -> Vec<Predicate> {
        if self.filter && self.require_in_clinvar {
            vec![Expr::column("clinvar_pathogenicity")
                .overlaps(self.include.iter().map(|category| category.to_string()))]
        } else {
            Vec::new()
        }
    }
}

/// Public HGMD membership; with filtering, optionally requires membership.
#[derive(Debug, Clone)]
pub struct HgmdJoin {
    filter: bool,
    require_in_hgmd_public: bool,
}

impl HgmdJoin {
    pub fn new(ctx: &ExtenderContext, filter: bool) -> Self {
        Self {
            filter,
            require_in_hgmd_public: ctx.settings.require_in_hgmd_public,
        }
    }
}

impl Extender for HgmdJoin {
    fn kind(&self) -> ExtenderKind {
        if self.filter {
            ExtenderKind::HgmdJoinAndFilter
        } else {
            ExtenderKind::HgmdJoin
        }
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::column("hgmd_accession"),
            Field::column("hgmd_public_overlap"),
        ]
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(
            JoinPlan::new("hgmd_public", ReferenceTable::HgmdPublic, JoinKey::Variant)
                .output("hgmd_accession", "accession", Aggregate::First)
                .output("hgmd_public_overlap", "accession", Aggregate::Exists),
        )
    }

    fn conditions(&self) -> Vec<Predicate> {
        if self.filter && self.require_in_hgmd_public {
            vec![Expr::column("hgmd_public_overlap").equals(true)]
        } else {
            Vec::new()
        }
    }
}

/// Columns joined from the mitochondrial frequency database.
pub(crate) fn mitochondrial_columns(db: MitochondrialDb) -> &'static [&'static str] {
    match db {
        MitochondrialDb::HelixMtDb => &["frequency", "het_count", "hom_count"],
        MitochondrialDb::Mitomap | MitochondrialDb::MtDb => &["frequency", "count"],
    }
}

/// Join plan for the mitochondrial frequency database; columns are prefixed
/// with the database name.
pub(crate) fn mitochondrial_join(db: MitochondrialDb) -> JoinPlan {
    let table = match db {
        MitochondrialDb::HelixMtDb => ReferenceTable::Helixmtdb,
        MitochondrialDb::Mitomap => ReferenceTable::Mitomap,
        MitochondrialDb::MtDb => ReferenceTable::Mtdb,
    };
    mitochondrial_columns(db).iter().fold(
        JoinPlan::new(&db.to_string(), table, JoinKey::Variant),
        |plan, column| plan.output(&format!("{db}_{column}"), column, Aggregate::First),
    )
}

/// Frequencies and counts from HelixMtDb, MITOMAP and mtDB.
#[derive(Debug, Clone)]
pub struct MitochondrialFrequenciesJoin;

impl Extender for MitochondrialFrequenciesJoin {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::MitochondrialFrequenciesJoin
    }

    fn fields(&self) -> Vec<Field> {
        MitochondrialDb::iter()
            .flat_map(|db| {
                mitochondrial_columns(db)
                    .iter()
                    .map(move |column| Field::column(&format!("{db}_{column}")))
            })
            .collect()
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        MitochondrialDb::iter().fold(selectable, |selectable, db| {
            selectable.join(mitochondrial_join(db))
        })
    }
}
