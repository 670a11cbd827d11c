//! Gene-level joins and the gene allow/block list filter.
//!
//! All gene joins go through the gene identifier cross-reference so that
//! they work for both transcript databases.  When a gene has several
//! annotation rows, an aggregate picks one value per variant row.

use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::{
    Aggregate, Expr, Field, JoinKey, JoinPlan, Predicate, Selectable,
};
use crate::seqvars::query::schema::settings::DatabaseSelect;
use crate::seqvars::query::store::ReferenceTable;

/// Columns provided by the gene identifier cross-reference.
const XREF_COLUMNS: &[&str] = &["symbol", "hgnc_id", "entrez_id", "ensembl_gene_id"];

/// Join of the gene identifier cross-reference on the selected gene ID.
///
/// The column holding the selected gene ID itself is not output again.
fn xref_join(database_select: DatabaseSelect) -> JoinPlan {
    let gene_id = database_select.column("gene_id");
    XREF_COLUMNS.iter().filter(|column| **column != gene_id).fold(
        JoinPlan::new(
            "hgnc",
            ReferenceTable::Hgnc,
            JoinKey::Column {
                base: database_select.column("gene_id"),
                table: database_select.xref_column().to_string(),
            },
        ),
        |plan, column| plan.output(column, column, Aggregate::First),
    )
}

/// Join of a gene-keyed table on one cross-reference column.
fn gene_join(name: &str, table: ReferenceTable, xref_column: &str) -> JoinPlan {
    JoinPlan::new(
        name,
        table,
        JoinKey::Column {
            base: xref_column.to_string(),
            table: xref_column.to_string(),
        },
    )
}

/// Defines a gene-keyed join extender: joins the cross-reference, then the
/// table, and outputs `(name, column, aggregate)` triples.
macro_rules! gene_join_extender {
    ($name:ident, $kind:ident, $join:literal, $table:ident, $xref:literal, [$(($out:literal, $col:literal, $agg:ident)),+ $(,)?]) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            database_select: DatabaseSelect,
        }

        impl $name {
            pub fn new(ctx: &ExtenderContext) -> Self {
                Self {
                    database_select: ctx.settings.database_select,
                }
            }
        }

        impl Extender for $name {
            fn kind(&self) -> ExtenderKind {
                ExtenderKind::$kind
            }

            fn fields(&self) -> Vec<Field> {
                vec![$(Field::column($out)),+]
            }

            fn selectable(&self, selectable: Selectable) -> Selectable {
                selectable.join(xref_join(self.database_select)).join(
                    gene_join($join, ReferenceTable::$table, $xref)
                        $(.output($out, $col, Aggregate::$agg))+,
                )
            }
        }
    };
}

gene_join_extender!(
    GnomadConstraintsJoin,
    GnomadConstraintsJoin,
    "gnomad_constraints",
    GnomadConstraints,
    "ensembl_gene_id",
    [
        ("gnomad_pli", "pli", Max),
        ("gnomad_mis_z", "mis_z", Max),
        ("gnomad_syn_z", "syn_z", Max),
        ("gnomad_oe_lof_upper", "oe_lof_upper", Min),
    ]
);

gene_join_extender!(
    ExacConstraintsJoin,
    ExacConstraintsJoin,
    "exac_constraints",
    ExacConstraints,
    "ensembl_gene_id",
    [
        ("exac_pli", "pli", Max),
        ("exac_mis_z", "mis_z", Max),
        ("exac_syn_z", "syn_z", Max),
    ]
);

gene_join_extender!(
    ModesOfInheritanceJoin,
    ModesOfInheritanceJoin,
    "modes_of_inheritance",
    ModesOfInheritance,
    "entrez_id",
    [("modes_of_inheritance", "mode_of_inheritance", Collect)]
);

gene_join_extender!(
    DiseaseGeneJoin,
    DiseaseGeneJoin,
    "disease_genes",
    DiseaseGenes,
    "entrez_id",
    [("disease_gene", "entrez_id", Exists)]
);

gene_join_extender!(
    AcmgSecondaryFindingsJoin,
    AcmgSecondaryFindingsJoin,
    "acmg_secondary_findings",
    AcmgSecondaryFindings,
    "entrez_id",
    [("acmg_secondary_finding", "entrez_id", Exists)]
);

/// Gene symbol and identifiers from the cross-reference.
#[derive(Debug, Clone)]
pub struct GeneSymbolJoin {
    database_select: DatabaseSelect,
}

impl GeneSymbolJoin {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            database_select: ctx.settings.database_select,
        }
    }
}

impl Extender for GeneSymbolJoin {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::GeneSymbolJoin
    }

    fn fields(&self) -> Vec<Field> {
        XREF_COLUMNS.iter().map(|name| Field::column(name)).collect()
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        selectable.join(xref_join(self.database_select))
    }
}

/// Restricts to genes on the allow list and removes genes on the block list.
///
/// List entries may be gene symbols, Entrez IDs, ENSEMBL gene IDs or HGNC
/// IDs.
#[derive(Debug, Clone)]
pub struct GeneListsFilter {
    database_select: DatabaseSelect,
    allowlist: Vec<String>,
    blocklist: Vec<String>,
}

impl GeneListsFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            database_select: ctx.settings.database_select,
            allowlist: ctx.settings.gene_allowlist.clone(),
            blocklist: ctx.settings.gene_blocklist.clone(),
        }
    }

    /// Any of the variant's gene identifiers is on `list`; never unknown.
    fn on_list(&self, list: &[String]) -> Predicate {
        Predicate::or(
            XREF_COLUMNS
                .iter()
                .map(|column| column.to_string())
                .chain(std::iter::once(self.database_select.column("gene_id")))
                .map(|column| {
                    Expr::column(column)
                        .or_default("")
                        .is_in(list.iter().map(String::as_str))
                })
                .collect(),
        )
    }
}

impl Extender for GeneListsFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::GeneListsFilter
    }

    fn selectable(&self, selectable: Selectable) -> Selectable {
        if self.allowlist.is_empty() && self.blocklist.is_empty() {
            selectable
        } else {
            selectable.join(xref_join(self.database_select))
        }
    }

    fn conditions(&self) -> Vec<Predicate> {
        let mut result = Vec::new();
        if !self.allowlist.is_empty() {
            result.push(self.on_list(&self.allowlist));
        }
        if !self.blocklist.is_empty() {
            result.push(Predicate::not(self.on_list(&self.blocklist)));
        }
        result
    }
}
