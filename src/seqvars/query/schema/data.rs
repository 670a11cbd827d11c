//! Variant records as stored in the variant table.
//!
//! The per-sample genotype data is a typed mapping from sample name to
//! `CallInfo`.  A sample that is missing from the mapping means "no
//! information" and is treated as such by the quality gate.

use indexmap::IndexMap;

use crate::common::GenomeRelease;
use crate::seqvars::query::value::Value;

/// Information on the call of one sample.
///
/// Corresponds to `FORMAT/*` in VCF.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CallInfo {
    /// The genotype, if applicable, e.g., "0/1"
    pub gt: Option<String>,
    /// Genotype quality score, if applicable
    pub gq: Option<i32>,
    /// Total read coverage at site in the sample.
    pub dp: Option<i32>,
    /// Alternate allele depth for the single allele in the sample.
    pub ad: Option<i32>,
}

impl Eq for CallInfo {}

/// Variant type.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VarType {
    /// Single nucleotide variant.
    #[default]
    Snv,
    /// Multi-nucleotide variant.
    Mnv,
    /// Insertion/deletion.
    Indel,
}

/// Population frequency information from one database.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PopulationFrequency {
    /// Allele frequency.
    pub frequency: f64,
    /// Number of homozygous carriers.
    pub homozygous: i32,
    /// Number of heterozygous carriers.
    pub heterozygous: i32,
    /// Number of hemizygous carriers.
    pub hemizygous: i32,
}

/// Transcript-level annotation with respect to one transcript database.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TranscriptAnnotation {
    /// Gene identifier (Entrez ID for RefSeq, ENSG ID for ENSEMBL).
    pub gene_id: Option<String>,
    /// Transcript identifier.
    pub transcript_id: Option<String>,
    /// Whether the transcript is protein coding.
    pub transcript_coding: bool,
    /// HGVS.c description.
    pub hgvs_c: Option<String>,
    /// HGVS.p description.
    pub hgvs_p: Option<String>,
    /// Predicted effects (Sequence Ontology terms).
    pub effects: Vec<String>,
    /// Distance to the next exon, `None` if not applicable.
    pub exon_dist: Option<i32>,
}

/// Identity of one variant: release, position and alleles.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct VariantKey {
    /// Genome release.
    pub release: GenomeRelease,
    /// Chromosome name.
    pub chromosome: String,
    /// 1-based start position.
    pub start: i32,
    /// 1-based end position.
    pub end: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
}

impl VariantKey {
    /// Construct from the coordinate columns of a row, if all are present.
    pub fn from_values(
        release: &Value,
        chromosome: &Value,
        start: &Value,
        end: &Value,
        reference: &Value,
        alternative: &Value,
    ) -> Option<Self> {
        Some(Self {
            release: release.as_str()?.parse().ok()?,
            chromosome: chromosome.as_str()?.to_string(),
            start: i32::try_from(start.as_i64()?).ok()?,
            end: i32::try_from(end.as_i64()?).ok()?,
            reference: reference.as_str()?.to_string(),
            alternative: alternative.as_str()?.to_string(),
        })
    }
}

/// One record of the variant table.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantRecord {
    /// Identifier of the case.
    pub case_id: String,
    /// Identifier of the variant set.
    pub set_id: i64,
    /// Genome release.
    #[serde(default)]
    pub release: GenomeRelease,
    /// Chromosome name as stored for the release.
    pub chromosome: String,
    /// 1-based start position.
    pub start: i32,
    /// 1-based end position.
    pub end: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
    /// Variant type.
    #[serde(default)]
    pub var_type: VarType,
    /// Per-sample call information.
    #[serde(default)]
    pub genotype: IndexMap<String, CallInfo>,
    /// Whether the variant is in ClinVar (precomputed flag).
    #[serde(default)]
    pub in_clinvar: bool,
    /// ExAC frequencies.
    #[serde(default)]
    pub exac: PopulationFrequency,
    /// 1000 Genomes frequencies.
    #[serde(default)]
    pub thousand_genomes: PopulationFrequency,
    /// gnomAD exomes frequencies.
    #[serde(default)]
    pub gnomad_exomes: PopulationFrequency,
    /// gnomAD genomes frequencies.
    #[serde(default)]
    pub gnomad_genomes: PopulationFrequency,
    /// Number of in-house carriers.
    #[serde(default)]
    pub inhouse_carriers: i32,
    /// Number of in-house homozygous carriers.
    #[serde(default)]
    pub inhouse_hom_alt: i32,
    /// RefSeq transcript annotation.
    #[serde(default)]
    pub refseq: TranscriptAnnotation,
    /// ENSEMBL transcript annotation.
    #[serde(default)]
    pub ensembl: TranscriptAnnotation,
}

impl VariantRecord {
    /// Return the variant key of this record.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            release: self.release,
            chromosome: self.chromosome.clone(),
            start: self.start,
            end: self.end,
            reference: self.reference.clone(),
            alternative: self.alternative.clone(),
        }
    }

    /// Chromosome number (1-22, `X` = 23, `Y` = 24, `MT` = 25), 0 if unknown.
    pub fn chromosome_no(&self) -> i32 {
        crate::common::chromosome_no(&self.chromosome).unwrap_or(0)
    }

    /// Return value of the column with the given name, `None` if there is no
    /// such column.
    ///
    /// Population frequency columns are named `<db>_<field>`, transcript
    /// columns `<refseq|ensembl>_<field>`.
    pub fn column(&self, name: &str) -> Option<Value> {
        let value = match name {
            "case_id" => Value::from(self.case_id.as_str()),
            "set_id" => Value::Int(self.set_id),
            "release" => Value::from(self.release.to_string()),
            "chromosome" => Value::from(self.chromosome.as_str()),
            "chromosome_no" => Value::from(self.chromosome_no()),
            "start" => Value::from(self.start),
            "end" => Value::from(self.end),
            "reference" => Value::from(self.reference.as_str()),
            "alternative" => Value::from(self.alternative.as_str()),
            "var_type" => Value::from(self.var_type.to_string()),
            "in_clinvar" => Value::Bool(self.in_clinvar),
            "inhouse_carriers" => Value::from(self.inhouse_carriers),
            "inhouse_hom_alt" => Value::from(self.inhouse_hom_alt),
            "genotype" => Value::Json(serde_json::to_value(&self.genotype).ok()?),
            _ => {
                if let Some((db, field)) = split_prefix(
                    name,
                    &["exac", "thousand_genomes", "gnomad_exomes", "gnomad_genomes"],
                ) {
                    let freq = match db {
                        "exac" => &self.exac,
                        "thousand_genomes" => &self.thousand_genomes,
                        "gnomad_exomes" => &self.gnomad_exomes,
                        _ => &self.gnomad_genomes,
                    };
                    match field {
                        "frequency" => Value::Float(freq.frequency),
                        "homozygous" => Value::from(freq.homozygous),
                        "heterozygous" => Value::from(freq.heterozygous),
                        "hemizygous" => Value::from(freq.hemizygous),
                        _ => return None,
                    }
                } else if let Some((db, field)) = split_prefix(name, &["refseq", "ensembl"]) {
                    let tx = if db == "refseq" {
                        &self.refseq
                    } else {
                        &self.ensembl
                    };
                    match field {
                        "gene_id" => Value::from(tx.gene_id.clone()),
                        "transcript_id" => Value::from(tx.transcript_id.clone()),
                        "transcript_coding" => Value::Bool(tx.transcript_coding),
                        "hgvs_c" => Value::from(tx.hgvs_c.clone()),
                        "hgvs_p" => Value::from(tx.hgvs_p.clone()),
                        "effect" => Value::from(tx.effects.clone()),
                        "exon_dist" => Value::from(tx.exon_dist),
                        _ => return None,
                    }
                } else {
                    return None;
                }
            }
        };
        Some(value)
    }
}

/// Split `name` into one of `prefixes` and the remainder after `_`.
fn split_prefix<'a>(name: &'a str, prefixes: &[&'a str]) -> Option<(&'a str, &'a str)> {
    prefixes.iter().find_map(|prefix| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|field| (*prefix, field))
    })
}
