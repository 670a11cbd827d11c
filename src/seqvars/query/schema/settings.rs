//! Typed query settings.
//!
//! Callers provide settings as a flat key/value mapping (as sent by the
//! filter form).  The mapping is validated and converted into `QuerySettings`
//! once, at the boundary, so that extenders only ever see closed enums and
//! typed thresholds.

use enum_map::EnumMap;
use indexmap::IndexMap;
use strum::IntoEnumIterator;

use crate::err::ConfigError;
use crate::seqvars::query::schema::case::Case;

/// Flat settings as provided by the caller.
pub type FlatSettings = IndexMap<String, serde_json::Value>;

/// Transcript database to use for gene and effect columns.
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
pub enum DatabaseSelect {
    /// RefSeq transcripts, Entrez gene IDs.
    #[default]
    #[serde(rename = "refseq")]
    #[strum(serialize = "refseq")]
    RefSeq,
    /// ENSEMBL transcripts, ENSG gene IDs.
    #[serde(rename = "ensembl")]
    #[strum(serialize = "ensembl")]
    Ensembl,
}

impl DatabaseSelect {
    /// Name of the record column for the given transcript field.
    pub fn column(&self, field: &str) -> String {
        format!("{}_{}", self, field)
    }

    /// Name of the gene cross-reference column holding this database's gene IDs.
    pub fn xref_column(&self) -> &'static str {
        match self {
            DatabaseSelect::RefSeq => "entrez_id",
            DatabaseSelect::Ensembl => "ensembl_gene_id",
        }
    }
}

/// Symbolic genotype pattern for one pedigree member.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum GenotypeChoice {
    /// Any genotype.
    #[default]
    #[serde(rename = "any")]
    #[strum(serialize = "any")]
    Any,
    /// Ref. genotype.
    #[serde(rename = "ref")]
    #[strum(serialize = "ref")]
    Ref,
    /// Het. genotype.
    #[serde(rename = "het")]
    #[strum(serialize = "het")]
    Het,
    /// Hom. genotype.
    #[serde(rename = "hom")]
    #[strum(serialize = "hom")]
    Hom,
    /// Variant genotype (het. or hom.).
    #[serde(rename = "variant")]
    #[strum(serialize = "variant")]
    Variant,
    /// Non-variant genotype (ref. or no-call).
    #[serde(rename = "non-variant")]
    #[strum(serialize = "non-variant")]
    NonVariant,
}

/// Choices for failing quality thresholds on genotypes.
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
pub enum FailChoice {
    /// Drop whole variant.
    #[default]
    #[serde(rename = "drop-variant")]
    #[strum(serialize = "drop-variant")]
    Drop,
    /// Interpret as "no-call".
    #[serde(rename = "no-call")]
    #[strum(serialize = "no-call")]
    NoCall,
    /// Ignore failure.
    #[serde(rename = "ignore")]
    #[strum(serialize = "ignore")]
    Ignore,
}

/// Quality settings for one sample.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SampleQualitySettings {
    /// Minimal coverage for het. sites.
    pub dp_het: Option<i32>,
    /// Minimal coverage for hom. sites.
    pub dp_hom: Option<i32>,
    /// Minimal genotype quality.
    pub gq: Option<i32>,
    /// Minimal allele balance for het. variants.
    pub ab: Option<f64>,
    /// Minimal number of alternate reads.
    pub ad: Option<i32>,
    /// Maximal number of alternate reads.
    pub ad_max: Option<i32>,
    /// Behaviour on failing quality thresholds.
    pub fail: FailChoice,
}

/// Genotype and quality settings for one pedigree member.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MemberSettings {
    /// Genotype pattern.
    pub gt: GenotypeChoice,
    /// Quality settings.
    pub quality: SampleQualitySettings,
}

/// Population frequency databases for nuclear DNA.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FrequencyDb {
    /// ExAC.
    Exac,
    /// 1000 Genomes.
    ThousandGenomes,
    /// gnomAD exomes.
    GnomadExomes,
    /// gnomAD genomes.
    GnomadGenomes,
}

/// Upper bounds for one nuclear population database.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrequencyThresholds {
    /// Whether the database is used for filtration.
    pub enabled: bool,
    /// Maximal allele frequency.
    pub frequency: Option<f64>,
    /// Maximal number of homozygous carriers.
    pub homozygous: Option<i32>,
    /// Maximal number of heterozygous carriers.
    pub heterozygous: Option<i32>,
    /// Maximal number of hemizygous carriers.
    pub hemizygous: Option<i32>,
}

/// Frequency databases for mitochondrial DNA.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MitochondrialDb {
    /// HelixMtDb.
    HelixMtDb,
    /// MITOMAP.
    Mitomap,
    /// mtDB.
    MtDb,
}

/// Upper bounds for one mitochondrial frequency database.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MitochondrialThresholds {
    /// Whether the database is used for filtration.
    pub enabled: bool,
    /// Maximal allele frequency.
    pub frequency: Option<f64>,
    /// Maximal number of carriers.
    pub count: Option<i32>,
    /// Maximal number of heteroplasmic carriers.
    pub het_count: Option<i32>,
    /// Maximal number of homoplasmic carriers.
    pub hom_count: Option<i32>,
}

/// Upper bounds on in-house counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InhouseThresholds {
    /// Whether in-house counts are used for filtration.
    pub enabled: bool,
    /// Maximal number of carriers.
    pub carriers: Option<i32>,
    /// Maximal number of homozygous carriers.
    pub homozygous: Option<i32>,
}

/// Frequency-related settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrequencySettings {
    /// Thresholds for nuclear DNA databases.
    pub nuclear: EnumMap<FrequencyDb, FrequencyThresholds>,
    /// Thresholds for mitochondrial DNA databases.
    pub mitochondrial: EnumMap<MitochondrialDb, MitochondrialThresholds>,
    /// Thresholds on in-house counts.
    pub inhouse: InhouseThresholds,
}

/// Aggregate ClinVar interpretation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClinvarCategory {
    /// Pathogenic.
    Pathogenic,
    /// Likely pathogenic.
    LikelyPathogenic,
    /// Uncertain significance.
    UncertainSignificance,
    /// Likely benign.
    LikelyBenign,
    /// Benign.
    Benign,
}

impl ClinvarCategory {
    /// Whether the category is included when the caller does not say.
    fn included_by_default(&self) -> bool {
        !matches!(self, ClinvarCategory::LikelyBenign | ClinvarCategory::Benign)
    }
}

/// ClinVar-related settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClinvarSettings {
    /// Whether to require ClinVar membership.
    pub require_in_clinvar: bool,
    /// The categories to include when membership is required.
    pub include: Vec<ClinvarCategory>,
}

/// Simple boolean user flags.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SimpleFlag {
    Bookmarked,
    Candidate,
    FinalCausative,
    ForValidation,
    NoDiseaseAssociation,
    Segregates,
    DoesntSegregate,
}

/// Graded user flags.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GradedFlag {
    Visual,
    Validation,
    Molecular,
    PhenotypeMatch,
    Summary,
}

/// Grade of a graded user flag; `Empty` means "no annotation present".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FlagGrade {
    Positive,
    Uncertain,
    Negative,
    Empty,
}

/// Settings for filtering on user flags.
///
/// A variant passes if any of the enabled flag values applies to it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlagSettings {
    /// Include variants without any flags.
    pub simple_empty: bool,
    /// Include variants with the given simple flag set.
    pub simple: EnumMap<SimpleFlag, bool>,
    /// Include variants with the given graded flag value.
    pub graded: EnumMap<GradedFlag, EnumMap<FlagGrade, bool>>,
}

impl Default for FlagSettings {
    fn default() -> Self {
        Self {
            simple_empty: true,
            simple: EnumMap::from_fn(|_| true),
            graded: EnumMap::from_fn(|_| EnumMap::from_fn(|_| true)),
        }
    }
}

/// Genomic region to restrict the query to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenomicRegion {
    /// Chromosome name, in any naming scheme.
    pub chrom: String,
    /// 1-based start position, whole chromosome if `None`.
    pub start: Option<i32>,
    /// 1-based end position, whole chromosome if `None`.
    pub end: Option<i32>,
}

/// Supporting code for `GenomicRegion`.
pub(crate) mod genomic_region {
    /// Error type for `GenomicRegion::from_str()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("invalid genomic region: {0:?}")]
        InvalidFormat(String),
        #[error("invalid integer coordinates in genomic region: {0:?}")]
        InvalidInts(String),
    }
}

impl std::str::FromStr for GenomicRegion {
    type Err = genomic_region::Error;

    /// Parse `chrom` or `chrom:start-end`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.replace(',', "");
        match s.split_once(':') {
            None if !s.is_empty() => Ok(Self {
                chrom: s,
                start: None,
                end: None,
            }),
            None => Err(genomic_region::Error::InvalidFormat(s)),
            Some((chrom, range)) => {
                let (start, end) = range
                    .split_once('-')
                    .ok_or_else(|| genomic_region::Error::InvalidFormat(s.clone()))?;
                let start = start
                    .parse()
                    .map_err(|_| genomic_region::Error::InvalidInts(s.clone()))?;
                let end = end
                    .parse()
                    .map_err(|_| genomic_region::Error::InvalidInts(s.clone()))?;
                Ok(Self {
                    chrom: chrom.to_string(),
                    start: Some(start),
                    end: Some(end),
                })
            }
        }
    }
}

/// Settings for one query, validated and typed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuerySettings {
    /// Transcript database to use.
    pub database_select: DatabaseSelect,
    /// Include SNVs.
    pub var_type_snv: bool,
    /// Include MNVs.
    pub var_type_mnv: bool,
    /// Include indels.
    pub var_type_indel: bool,
    /// Frequency settings.
    pub frequency: FrequencySettings,
    /// ClinVar settings.
    pub clinvar: ClinvarSettings,
    /// Require membership in public HGMD.
    pub require_in_hgmd_public: bool,
    /// Remove variants present in dbSNP.
    pub remove_if_in_dbsnp: bool,
    /// Gene allow list (symbols, Entrez, ENSEMBL or HGNC IDs).
    pub gene_allowlist: Vec<String>,
    /// Gene block list (symbols, Entrez, ENSEMBL or HGNC IDs).
    pub gene_blocklist: Vec<String>,
    /// Genomic regions to restrict to.
    pub genomic_region: Vec<GenomicRegion>,
    /// Maximal distance to next exon.
    pub max_exon_dist: Option<i32>,
    /// Include variants on coding transcripts.
    pub transcripts_coding: bool,
    /// Include variants on non-coding transcripts.
    pub transcripts_noncoding: bool,
    /// Predicted effects to include, all if empty.
    pub effects: Vec<String>,
    /// Per-member genotype and quality settings.
    pub members: IndexMap<String, MemberSettings>,
    /// Index for compound heterozygous recessive mode.
    pub compound_recessive_index: Option<String>,
    /// Index for recessive mode (homozygous or compound heterozygous).
    pub recessive_index: Option<String>,
    /// User flag settings.
    pub flags: FlagSettings,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            database_select: DatabaseSelect::default(),
            var_type_snv: true,
            var_type_mnv: true,
            var_type_indel: true,
            frequency: FrequencySettings::default(),
            clinvar: ClinvarSettings::default(),
            require_in_hgmd_public: false,
            remove_if_in_dbsnp: false,
            gene_allowlist: Vec::new(),
            gene_blocklist: Vec::new(),
            genomic_region: Vec::new(),
            max_exon_dist: None,
            transcripts_coding: true,
            transcripts_noncoding: true,
            effects: Vec::new(),
            members: IndexMap::new(),
            compound_recessive_index: None,
            recessive_index: None,
            flags: FlagSettings::default(),
        }
    }
}

impl QuerySettings {
    /// Settings of the given member, default settings if not configured.
    pub fn member(&self, name: &str) -> MemberSettings {
        self.members.get(name).cloned().unwrap_or_default()
    }

    /// Convert flat settings into typed settings for `case`.
    ///
    /// Member-specific keys (`<member>_gt`, `<member>_gq`, ...) are looked up
    /// for each pedigree member of the case.  The index keys accept either a
    /// member name or a mapping from case ID to member name (the plural
    /// `*_indices` keys), as used for project-wide queries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSetting` for values of the wrong type and
    /// `ConfigError::UnknownGenotypePattern` for unknown genotype patterns.
    pub fn from_flat(flat: &FlatSettings, case: &Case) -> Result<Self, ConfigError> {
        let mut result = Self {
            database_select: flat::get_enum(flat, "database_select")?.unwrap_or_default(),
            var_type_snv: flat::get_bool(flat, "var_type_snv", true)?,
            var_type_mnv: flat::get_bool(flat, "var_type_mnv", true)?,
            var_type_indel: flat::get_bool(flat, "var_type_indel", true)?,
            require_in_hgmd_public: flat::get_bool(flat, "require_in_hgmd_public", false)?,
            remove_if_in_dbsnp: flat::get_bool(flat, "remove_if_in_dbsnp", false)?,
            gene_allowlist: flat::get_string_list(flat, "gene_allowlist")?,
            gene_blocklist: flat::get_string_list(flat, "gene_blocklist")?,
            genomic_region: flat::get_regions(flat, "genomic_region")?,
            max_exon_dist: flat::get_i32(flat, "max_exon_dist")?,
            transcripts_coding: flat::get_bool(flat, "transcripts_coding", true)?,
            transcripts_noncoding: flat::get_bool(flat, "transcripts_noncoding", true)?,
            effects: flat::get_string_list(flat, "effects")?,
            compound_recessive_index: flat::get_index(
                flat,
                "compound_recessive_index",
                "compound_recessive_indices",
                &case.id,
            )?,
            recessive_index: flat::get_index(
                flat,
                "recessive_index",
                "recessive_indices",
                &case.id,
            )?,
            ..Default::default()
        };

        for db in FrequencyDb::iter() {
            result.frequency.nuclear[db] = FrequencyThresholds {
                enabled: flat::get_bool(flat, &format!("{db}_enabled"), false)?,
                frequency: flat::get_f64(flat, &format!("{db}_frequency"))?,
                homozygous: flat::get_i32(flat, &format!("{db}_homozygous"))?,
                heterozygous: flat::get_i32(flat, &format!("{db}_heterozygous"))?,
                hemizygous: flat::get_i32(flat, &format!("{db}_hemizygous"))?,
            };
        }
        for db in MitochondrialDb::iter() {
            result.frequency.mitochondrial[db] = MitochondrialThresholds {
                enabled: flat::get_bool(flat, &format!("{db}_enabled"), false)?,
                frequency: flat::get_f64(flat, &format!("{db}_frequency"))?,
                count: flat::get_i32(flat, &format!("{db}_count"))?,
                het_count: flat::get_i32(flat, &format!("{db}_het_count"))?,
                hom_count: flat::get_i32(flat, &format!("{db}_hom_count"))?,
            };
        }
        result.frequency.inhouse = InhouseThresholds {
            enabled: flat::get_bool(flat, "inhouse_enabled", false)?,
            carriers: flat::get_i32(flat, "inhouse_carriers")?,
            homozygous: flat::get_i32(flat, "inhouse_homozygous")?,
        };

        result.clinvar = ClinvarSettings {
            require_in_clinvar: flat::get_bool(flat, "require_in_clinvar", false)?,
            include: ClinvarCategory::iter()
                .map(|category| {
                    flat::get_bool(
                        flat,
                        &format!("clinvar_include_{category}"),
                        category.included_by_default(),
                    )
                    .map(|include| include.then_some(category))
                })
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect(),
        };

        result.flags.simple_empty = flat::get_bool(flat, "flag_simple_empty", true)?;
        for flag in SimpleFlag::iter() {
            result.flags.simple[flag] = flat::get_bool(flat, &format!("flag_{flag}"), true)?;
        }
        for flag in GradedFlag::iter() {
            for grade in FlagGrade::iter() {
                result.flags.graded[flag][grade] =
                    flat::get_bool(flat, &format!("flag_{flag}_{grade}"), true)?;
            }
        }

        for member in &case.pedigree {
            let name = &member.name;
            let gt = match flat::get_string(flat, &format!("{name}_gt"))? {
                Some(value) => value
                    .parse::<GenotypeChoice>()
                    .map_err(|_| ConfigError::UnknownGenotypePattern(value.clone()))?,
                None => GenotypeChoice::Any,
            };
            let quality = SampleQualitySettings {
                dp_het: flat::get_i32(flat, &format!("{name}_dp_het"))?,
                dp_hom: flat::get_i32(flat, &format!("{name}_dp_hom"))?,
                gq: flat::get_i32(flat, &format!("{name}_gq"))?,
                ab: flat::get_f64(flat, &format!("{name}_ab"))?,
                ad: flat::get_i32(flat, &format!("{name}_ad"))?,
                ad_max: flat::get_i32(flat, &format!("{name}_ad_max"))?,
                fail: flat::get_enum(flat, &format!("{name}_fail"))?.unwrap_or_default(),
            };
            result
                .members
                .insert(name.clone(), MemberSettings { gt, quality });
        }

        Ok(result)
    }
}

/// Accessors for flat settings; `null` counts as absent.
mod flat {
    use std::str::FromStr;

    use super::{FlatSettings, GenomicRegion};
    use crate::err::ConfigError;

    fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidSetting {
            key: key.to_string(),
            message: message.into(),
        }
    }

    fn get<'a>(flat: &'a FlatSettings, key: &str) -> Option<&'a serde_json::Value> {
        flat.get(key).filter(|value| !value.is_null())
    }

    pub fn get_bool(flat: &FlatSettings, key: &str, default: bool) -> Result<bool, ConfigError> {
        match get(flat, key) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| invalid(key, format!("expected boolean, got {value}"))),
        }
    }

    pub fn get_f64(flat: &FlatSettings, key: &str) -> Result<Option<f64>, ConfigError> {
        get(flat, key)
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| invalid(key, format!("expected number, got {value}")))
            })
            .transpose()
    }

    pub fn get_i32(flat: &FlatSettings, key: &str) -> Result<Option<i32>, ConfigError> {
        get(flat, key)
            .map(|value| {
                value
                    .as_i64()
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(|| invalid(key, format!("expected integer, got {value}")))
            })
            .transpose()
    }

    pub fn get_string(flat: &FlatSettings, key: &str) -> Result<Option<String>, ConfigError> {
        get(flat, key)
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(key, format!("expected string, got {value}")))
            })
            .transpose()
    }

    pub fn get_enum<T: FromStr>(flat: &FlatSettings, key: &str) -> Result<Option<T>, ConfigError> {
        get_string(flat, key)?
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|_| invalid(key, format!("unknown value {value:?}")))
            })
            .transpose()
    }

    pub fn get_string_list(flat: &FlatSettings, key: &str) -> Result<Vec<String>, ConfigError> {
        match get(flat, key) {
            None => Ok(Vec::new()),
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .map(|s| s.trim().to_string())
                        .ok_or_else(|| invalid(key, format!("expected string, got {value}")))
                })
                .collect(),
            Some(value) => Err(invalid(key, format!("expected list, got {value}"))),
        }
    }

    /// Regions are given as `[chrom, start, end]` triples or `chrom:start-end` strings.
    pub fn get_regions(flat: &FlatSettings, key: &str) -> Result<Vec<GenomicRegion>, ConfigError> {
        let values = match get(flat, key) {
            None => return Ok(Vec::new()),
            Some(serde_json::Value::Array(values)) => values,
            Some(value) => return Err(invalid(key, format!("expected list, got {value}"))),
        };
        values
            .iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s
                    .parse::<GenomicRegion>()
                    .map_err(|e| invalid(key, e.to_string())),
                serde_json::Value::Array(triple) if triple.len() == 3 => {
                    let chrom = triple[0]
                        .as_str()
                        .ok_or_else(|| invalid(key, format!("invalid chromosome in {value}")))?;
                    let coord = |v: &serde_json::Value| {
                        v.as_i64()
                            .and_then(|i| i32::try_from(i).ok())
                            .ok_or_else(|| invalid(key, format!("invalid coordinate in {value}")))
                    };
                    Ok(GenomicRegion {
                        chrom: chrom.to_string(),
                        start: Some(coord(&triple[1])?),
                        end: Some(coord(&triple[2])?),
                    })
                }
                _ => Err(invalid(key, format!("invalid region {value}"))),
            })
            .collect()
    }

    /// Index member either as plain name under `key` or from the case-keyed
    /// mapping under `key_plural`.
    pub fn get_index(
        flat: &FlatSettings,
        key: &str,
        key_plural: &str,
        case_id: &str,
    ) -> Result<Option<String>, ConfigError> {
        if let Some(name) = get_string(flat, key)? {
            return Ok(Some(name).filter(|name| !name.is_empty()));
        }
        match get(flat, key_plural) {
            None => Ok(None),
            Some(serde_json::Value::Object(map)) => match map.get(case_id) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(serde_json::Value::String(name)) => Ok(Some(name.clone())),
                Some(value) => Err(invalid(key_plural, format!("expected string, got {value}"))),
            },
            Some(value) => Err(invalid(key_plural, format!("expected mapping, got {value}"))),
        }
    }
}
