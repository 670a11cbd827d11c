//! Common functionality.

use byte_unit::{Byte, UnitType};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!(
            "RSS now: {}",
            Byte::from_u64(rss).get_appropriate_unit(UnitType::Binary)
        ),
        Err(e) => tracing::debug!("could not determine RSS: {}", e),
    }
}

/// Definition of canonical chromosome names.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Chromosome number of the mitochondrial genome.
pub const CHROM_NO_MT: i32 = 25;

/// Canonicalize chromosome name: strip `chr` prefix and map `M` to `MT`.
pub fn canonicalize(chrom: &str) -> String {
    let stripped = chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom);
    let upper = stripped.to_uppercase();
    if upper == "M" {
        String::from("MT")
    } else {
        upper
    }
}

/// Return 1-based chromosome number of `chrom` (`X` = 23, `Y` = 24, `MT` = 25).
pub fn chromosome_no(chrom: &str) -> Option<i32> {
    let canonical = canonicalize(chrom);
    CHROMS
        .iter()
        .position(|&c| c == canonical)
        .map(|i| i as i32 + 1)
}

/// Select the genome release to use.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum GenomeRelease {
    // GRCh37 / hg19
    #[default]
    #[strum(serialize = "GRCh37")]
    #[serde(rename = "GRCh37", alias = "grch37")]
    Grch37,
    /// GRCh38 / hg38
    #[strum(serialize = "GRCh38")]
    #[serde(rename = "GRCh38", alias = "grch38")]
    Grch38,
}

impl GenomeRelease {
    /// Name of the chromosome as stored for this release.
    ///
    /// GRCh37 uses bare names and `MT`, GRCh38 uses the `chr` prefix and `chrM`.
    pub fn chrom_name(&self, chrom: &str) -> String {
        let canonical = canonicalize(chrom);
        match self {
            GenomeRelease::Grch37 => canonical,
            GenomeRelease::Grch38 => {
                if canonical == "MT" {
                    String::from("chrM")
                } else {
                    format!("chr{canonical}")
                }
            }
        }
    }
}

impl std::str::FromStr for GenomeRelease {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        if s.starts_with("grch37") {
            Ok(GenomeRelease::Grch37)
        } else if s.starts_with("grch38") {
            Ok(GenomeRelease::Grch38)
        } else {
            Err(anyhow::anyhow!("Unknown genome release: {}", s))
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::GenomeRelease;

    #[rstest]
    #[case("1", Some(1))]
    #[case("chr1", Some(1))]
    #[case("X", Some(23))]
    #[case("chrY", Some(24))]
    #[case("MT", Some(25))]
    #[case("chrM", Some(25))]
    #[case("M", Some(25))]
    #[case("GL000192.1", None)]
    fn chromosome_no(#[case] chrom: &str, #[case] expected: Option<i32>) {
        assert_eq!(super::chromosome_no(chrom), expected);
    }

    #[rstest]
    #[case(GenomeRelease::Grch37, "chr1", "1")]
    #[case(GenomeRelease::Grch37, "chrM", "MT")]
    #[case(GenomeRelease::Grch37, "M", "MT")]
    #[case(GenomeRelease::Grch38, "1", "chr1")]
    #[case(GenomeRelease::Grch38, "MT", "chrM")]
    #[case(GenomeRelease::Grch38, "chrX", "chrX")]
    fn chrom_name(#[case] release: GenomeRelease, #[case] chrom: &str, #[case] expected: &str) {
        assert_eq!(release.chrom_name(chrom), expected);
    }

    #[test]
    fn genome_release_from_str() -> Result<(), anyhow::Error> {
        assert_eq!("GRCh37".parse::<GenomeRelease>()?, GenomeRelease::Grch37);
        assert_eq!("grch38".parse::<GenomeRelease>()?, GenomeRelease::Grch38);
        assert!("hg19".parse::<GenomeRelease>().is_err());
        Ok(())
    }
}
