//! Filters on variant type, predicted effect, transcripts and position.

use crate::common::GenomeRelease;
use crate::err::ConfigError;
use crate::seqvars::query::extender::{Extender, ExtenderContext, ExtenderKind};
use crate::seqvars::query::parts::{Expr, Predicate};
use crate::seqvars::query::schema::data::VarType;
use crate::seqvars::query::schema::settings::{DatabaseSelect, GenomicRegion};

/// Restricts to the selected variant types.
#[derive(Debug, Clone)]
pub struct VarTypeFilter {
    var_types: Vec<VarType>,
}

impl VarTypeFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        let settings = ctx.settings;
        let var_types = [
            (settings.var_type_snv, VarType::Snv),
            (settings.var_type_mnv, VarType::Mnv),
            (settings.var_type_indel, VarType::Indel),
        ]
        .into_iter()
        .filter_map(|(enabled, var_type)| enabled.then_some(var_type))
        .collect();
        Self { var_types }
    }
}

impl Extender for VarTypeFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::VarTypeFilter
    }

    fn conditions(&self) -> Vec<Predicate> {
        vec![Expr::column("var_type").is_in(self.var_types.iter().map(|t| t.to_string()))]
    }
}

/// Restricts to variants with one of the selected predicted effects.
#[derive(Debug, Clone)]
pub struct EffectFilter {
    database_select: DatabaseSelect,
    effects: Vec<String>,
}

impl EffectFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            database_select: ctx.settings.database_select,
            effects: ctx.settings.effects.clone(),
        }
    }
}

impl Extender for EffectFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::EffectFilter
    }

    fn conditions(&self) -> Vec<Predicate> {
        if self.effects.is_empty() {
            Vec::new()
        } else {
            vec![Expr::column(self.database_select.column("effect"))
                .overlaps(self.effects.iter().map(String::as_str))]
        }
    }
}

/// Restricts to variants close to an exon.
#[derive(Debug, Clone)]
pub struct ExonDistanceFilter {
    database_select: DatabaseSelect,
    max_exon_dist: Option<i32>,
}

impl ExonDistanceFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            database_select: ctx.settings.database_select,
            max_exon_dist: ctx.settings.max_exon_dist,
        }
    }
}

impl Extender for ExonDistanceFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::ExonDistanceFilter
    }

    /// Variants without distance information (e.g., exonic ones) are kept.
    fn conditions(&self) -> Vec<Predicate> {
        match self.max_exon_dist {
            None => Vec::new(),
            Some(max_exon_dist) => {
                let exon_dist = Expr::column(self.database_select.column("exon_dist"));
                vec![Predicate::or(vec![
                    exon_dist.clone().is_null(),
                    exon_dist.at_most(max_exon_dist),
                ])]
            }
        }
    }
}

/// Restricts to variants on coding and/or non-coding transcripts.
#[derive(Debug, Clone)]
pub struct TranscriptCodingFilter {
    database_select: DatabaseSelect,
    coding: bool,
    noncoding: bool,
}

impl TranscriptCodingFilter {
    pub fn new(ctx: &ExtenderContext) -> Self {
        Self {
            database_select: ctx.settings.database_select,
            coding: ctx.settings.transcripts_coding,
            noncoding: ctx.settings.transcripts_noncoding,
        }
    }
}

impl Extender for TranscriptCodingFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::TranscriptCodingFilter
    }

    fn conditions(&self) -> Vec<Predicate> {
        let column = Expr::column(self.database_select.column("transcript_coding"));
        match (self.coding, self.noncoding) {
            (true, true) => Vec::new(),
            (true, false) => vec![column.equals(true)],
            (false, true) => vec![column.equals(false)],
            (false, false) => vec![Predicate::Const(false)],
        }
    }
}

/// Restricts to the given genomic regions.
#[derive(Debug, Clone)]
pub struct GenomicRegionFilter {
    release: GenomeRelease,
    regions: Vec<GenomicRegion>,
}

impl GenomicRegionFilter {
    /// # Errors
    ///
    /// `ConfigError::NoActiveVariantSet` if the case has no active variant set
    /// to take the genome release from.
    pub fn new(ctx: &ExtenderContext) -> Result<Self, ConfigError> {
        Ok(Self {
            release: ctx.case.require_active_variant_set()?.release,
            regions: ctx.settings.genomic_region.clone(),
        })
    }

    fn region_predicate(&self, region: &GenomicRegion) -> Predicate {
        let mut result = vec![Expr::column("chromosome").equals(self.release.chrom_name(&region.chrom))];
        if let Some(end) = region.end {
            result.push(Expr::column("start").at_most(end));
        }
        if let Some(start) = region.start {
            result.push(Expr::column("end").at_least(start));
        }
        Predicate::and(result)
    }
}

impl Extender for GenomicRegionFilter {
    fn kind(&self) -> ExtenderKind {
        ExtenderKind::GenomicRegionFilter
    }

    fn conditions(&self) -> Vec<Predicate> {
        if self.regions.is_empty() {
            Vec::new()
        } else {
            vec![Predicate::or(
                self.regions
                    .iter()
                    .map(|region| self.region_predicate(region))
                    .collect(),
            )]
        }
    }
}
