//! Access to the variant table and the reference/annotation tables.
//!
//! Both are owned by collaborators outside of the engine.  The engine only
//! reads from them: the variant table through `VariantRecordStore` and the
//! reference tables through `AnnotationCatalog`.

use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;

use crate::seqvars::query::schema::data::VariantRecord;
use crate::seqvars::query::value::Value;

/// Source of variant records.
///
/// Implementations stream records; errors are propagated unchanged to the
/// consumer of the query results.
pub trait VariantRecordStore {
    /// Iterate the records of the given case and variant set, all records if
    /// `scope` is `None`.
    fn scan<'a>(
        &'a self,
        scope: Option<(&'a str, i64)>,
    ) -> Box<dyn Iterator<Item = Result<VariantRecord, anyhow::Error>> + 'a>;
}

/// In-memory variant record store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    /// Records, in insertion order.
    pub records: Vec<VariantRecord>,
}

impl InMemoryStore {
    /// Construct from the given records.
    pub fn new(records: Vec<VariantRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON Lines file.
    pub fn from_jsonl(path: &Path) -> Result<Self, anyhow::Error> {
        let reader = std::io::BufReader::new(
            std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?,
        );
        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: VariantRecord = serde_json::from_str(&line).map_err(|e| {
                anyhow::anyhow!("invalid record in line {} of {}: {}", lineno + 1, path.display(), e)
            })?;
            records.push(record);
        }
        Ok(Self { records })
    }
}

impl VariantRecordStore for InMemoryStore {
    fn scan<'a>(
        &'a self,
        scope: Option<(&'a str, i64)>,
    ) -> Box<dyn Iterator<Item = Result<VariantRecord, anyhow::Error>> + 'a> {
        Box::new(
            self.records
                .iter()
                .filter(move |record| match scope {
                    Some((case_id, set_id)) => record.case_id == case_id && record.set_id == set_id,
                    None => true,
                })
                .cloned()
                .map(Ok),
        )
    }
}

/// The reference and annotation tables that can be joined to variant records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceTable {
    /// dbSNP; variant key and `rsid`.
    Dbsnp,
    /// ClinVar; variant key, `pathogenicity`, `vcv`.
    Clinvar,
    /// Public HGMD; variant key and `accession`.
    HgmdPublic,
    /// HelixMtDb; variant key, `frequency`, `het_count`, `hom_count`.
    Helixmtdb,
    /// MITOMAP; variant key, `frequency`, `count`.
    Mitomap,
    /// mtDB; variant key, `frequency`, `count`.
    Mtdb,
    /// Gene identifier cross-reference; `hgnc_id`, `symbol`, `entrez_id`,
    /// `ensembl_gene_id`.
    Hgnc,
    /// gnomAD constraints by `ensembl_gene_id`.
    GnomadConstraints,
    /// ExAC constraints by `ensembl_gene_id`.
    ExacConstraints,
    /// Modes of inheritance by `entrez_id`.
    ModesOfInheritance,
    /// Disease genes by `entrez_id`.
    DiseaseGenes,
    /// ACMG secondary findings genes by `entrez_id`.
    AcmgSecondaryFindings,
    /// User flags; case ID, variant key and flag values.
    SmallVariantFlags,
    /// User comments; case ID, variant key and `text`.
    SmallVariantComments,
    /// User ACMG ratings; case ID, variant key and `acmg_class`.
    AcmgRatings,
    /// Stored query results; `query_id`, case ID and variant key.
    QueryResults,
}

/// One row of a reference table.
pub type TableRow = IndexMap<String, Value>;

/// The reference tables available for joining.
///
/// A table that is missing from the catalog behaves like an empty table, so
/// joins against it yield `Null` values.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AnnotationCatalog {
    /// Rows by table.
    pub tables: IndexMap<ReferenceTable, Vec<TableRow>>,
}

impl AnnotationCatalog {
    /// Rows of the given table, empty if the table is not loaded.
    pub fn rows(&self, table: ReferenceTable) -> &[TableRow] {
        self.tables
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Add rows to the given table.
    pub fn insert(&mut self, table: ReferenceTable, rows: Vec<TableRow>) {
        self.tables.entry(table).or_default().extend(rows);
    }

    /// Load the catalog from a JSON file mapping table names to row lists.
    pub fn from_path(path: &Path) -> Result<Self, anyhow::Error> {
        let reader = std::io::BufReader::new(
            std::fs::File::open(path)
                .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?,
        );
        serde_json::from_reader(reader)
            .map_err(|e| anyhow::anyhow!("invalid annotation catalog {}: {}", path.display(), e))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::seqvars::query::schema::data::test::record;

    /// Build a table row from column/value pairs.
    pub fn row(values: &[(&str, Value)]) -> TableRow {
        values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    /// Build a table row keyed by the variant of the given record.
    pub fn variant_row(record: &VariantRecord, values: &[(&str, Value)]) -> TableRow {
        let mut result = row(&[
            ("release", Value::from(record.release.to_string())),
            ("chromosome", Value::from(record.chromosome.as_str())),
            ("start", Value::from(record.start)),
            ("end", Value::from(record.end)),
            ("reference", Value::from(record.reference.as_str())),
            ("alternative", Value::from(record.alternative.as_str())),
        ]);
        result.extend(row(values));
        result
    }

    #[test]
    fn scan_scope() -> Result<(), anyhow::Error> {
        let mut other_set = record("c1", 200, "1", &[]);
        other_set.set_id = 2;
        let store = InMemoryStore::new(vec![
            record("c1", 100, "1", &[]),
            other_set,
            record("c2", 300, "1", &[]),
        ]);

        let starts = store
            .scan(Some(("c1", 1)))
            .map(|r| r.map(|r| r.start))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(starts, vec![100]);
        assert_eq!(store.scan(None).count(), 3);
        Ok(())
    }

    #[test]
    fn catalog_missing_table_is_empty() -> Result<(), anyhow::Error> {
        let catalog: AnnotationCatalog = serde_json::from_str(
            r#"{"dbsnp": [{"chromosome": "1", "start": 100, "rsid": "rs1"}]}"#,
        )?;
        assert_eq!(catalog.rows(ReferenceTable::Dbsnp).len(), 1);
        assert!(catalog.rows(ReferenceTable::Clinvar).is_empty());
        Ok(())
    }

    #[test]
    fn jsonl_roundtrip() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("records.jsonl");
        let records = vec![
            record("c1", 100, "1", &[("index", "0/1")]),
            record("c1", 200, "2", &[("index", "1/1")]),
        ];
        let lines = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        std::fs::write(&path, lines.join("\n\n"))?;

        let store = InMemoryStore::from_jsonl(&path)?;
        assert_eq!(store.records, records);
        Ok(())
    }
}
