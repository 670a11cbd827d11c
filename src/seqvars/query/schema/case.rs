//! Cases, pedigrees and variant sets as consumed by the query engine.

use indexmap::IndexMap;

use crate::common::GenomeRelease;

/// Sex of a pedigree member, PED encoding.
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
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Sex {
    /// Unknown sex (`0`).
    #[default]
    Unknown,
    /// Male (`1`).
    Male,
    /// Female (`2`).
    Female,
}

/// Affection state of a pedigree member, PED encoding.
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
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Affected {
    /// Unknown affection state (`0`).
    #[default]
    Unknown,
    /// Unaffected (`1`).
    Unaffected,
    /// Affected (`2`).
    Affected,
}

/// Supporting code for the PED integer codes.
pub(crate) mod ped_code {
    /// Error type for `Sex::try_from()` and `Affected::try_from()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("invalid PED code: {0}")]
        InvalidCode(u8),
    }
}

impl TryFrom<u8> for Sex {
    type Error = ped_code::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Sex::Unknown),
            1 => Ok(Sex::Male),
            2 => Ok(Sex::Female),
            _ => Err(ped_code::Error::InvalidCode(value)),
        }
    }
}

impl From<Sex> for u8 {
    fn from(value: Sex) -> Self {
        match value {
            Sex::Unknown => 0,
            Sex::Male => 1,
            Sex::Female => 2,
        }
    }
}

impl TryFrom<u8> for Affected {
    type Error = ped_code::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Affected::Unknown),
            1 => Ok(Affected::Unaffected),
            2 => Ok(Affected::Affected),
            _ => Err(ped_code::Error::InvalidCode(value)),
        }
    }
}

impl From<Affected> for u8 {
    fn from(value: Affected) -> Self {
        match value {
            Affected::Unknown => 0,
            Affected::Unaffected => 1,
            Affected::Affected => 2,
        }
    }
}

/// Marker for an unknown parent in the pedigree.
pub const UNKNOWN_PARENT: &str = "0";

/// One member of the pedigree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PedigreeMember {
    /// Name of the member, also the sample name in the genotype data.
    pub name: String,
    /// Name of the father or `"0"`.
    #[serde(default = "unknown_parent")]
    pub father: String,
    /// Name of the mother or `"0"`.
    #[serde(default = "unknown_parent")]
    pub mother: String,
    /// Sex of the member.
    #[serde(default)]
    pub sex: Sex,
    /// Affection state of the member.
    #[serde(default)]
    pub affected: Affected,
    /// Whether the member has genotype data in the variant records.
    #[serde(default = "has_gt_entries_default")]
    pub has_gt_entries: bool,
}

fn unknown_parent() -> String {
    UNKNOWN_PARENT.to_string()
}

fn has_gt_entries_default() -> bool {
    true
}

impl PedigreeMember {
    /// Name of the father, if known.
    pub fn father(&self) -> Option<&str> {
        Some(self.father.as_str()).filter(|f| *f != UNKNOWN_PARENT && !f.is_empty())
    }

    /// Name of the mother, if known.
    pub fn mother(&self) -> Option<&str> {
        Some(self.mother.as_str()).filter(|m| *m != UNKNOWN_PARENT && !m.is_empty())
    }
}

/// The currently active variant set of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VariantSet {
    /// Identifier of the variant set.
    pub id: i64,
    /// Genome release of the variant set.
    #[serde(default)]
    pub release: GenomeRelease,
}

/// A case: one pedigree with its imported variant calls.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Case {
    /// Identifier of the case.
    pub id: String,
    /// Display name of the case.
    #[serde(default)]
    pub name: String,
    /// Name of the designated index member, if any.
    #[serde(default)]
    pub index: Option<String>,
    /// Pedigree members in file order.
    pub pedigree: Vec<PedigreeMember>,
    /// The active variant set, absent while nothing has been imported.
    #[serde(default)]
    pub active_variant_set: Option<VariantSet>,
}

/// Problems found by `Case::check_pedigree()`.
pub(crate) mod check_pedigree {
    /// Error type for `Case::check_pedigree()`.
    #[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("member {0:?} occurs twice in pedigree")]
        DuplicateMember(String),
        #[error("parent {1:?} of member {0:?} is not in pedigree")]
        UnknownParent(String, String),
        #[error("index {0:?} is not in pedigree")]
        UnknownIndex(String),
        #[error("pedigree has a cycle through member {0:?}")]
        Cycle(String),
    }
}

impl Case {
    /// Return pedigree member with the given name.
    pub fn member(&self, name: &str) -> Option<&PedigreeMember> {
        self.pedigree.iter().find(|m| m.name == name)
    }

    /// Return the members that have genotype data.
    pub fn members_with_gt(&self) -> impl Iterator<Item = &PedigreeMember> {
        self.pedigree.iter().filter(|m| m.has_gt_entries)
    }

    /// Return the member with genotype data of the given name, if any.
    pub fn member_with_gt(&self, name: &str) -> Option<&PedigreeMember> {
        self.member(name).filter(|m| m.has_gt_entries)
    }

    /// Return the active variant set or fail with a configuration error.
    pub fn require_active_variant_set(&self) -> Result<VariantSet, crate::err::ConfigError> {
        self.active_variant_set
            .ok_or_else(|| crate::err::ConfigError::NoActiveVariantSet(self.id.clone()))
    }

    /// Check the pedigree for consistency.
    ///
    /// Detects duplicate names, parents missing from the pedigree, an index
    /// that is not a member, and cycles in the parent relation.  The check is
    /// not performed on construction; callers decide whether to enforce it.
    pub fn check_pedigree(&self) -> Result<(), check_pedigree::Error> {
        let mut by_name: IndexMap<&str, &PedigreeMember> = IndexMap::new();
        for member in &self.pedigree {
            if by_name.insert(member.name.as_str(), member).is_some() {
                return Err(check_pedigree::Error::DuplicateMember(member.name.clone()));
            }
        }
        for member in &self.pedigree {
            for parent in [member.father(), member.mother()].into_iter().flatten() {
                if !by_name.contains_key(parent) {
                    return Err(check_pedigree::Error::UnknownParent(
                        member.name.clone(),
                        parent.to_string(),
                    ));
                }
            }
        }
        if let Some(index) = self.index.as_ref() {
            if !by_name.contains_key(index.as_str()) {
                return Err(check_pedigree::Error::UnknownIndex(index.clone()));
            }
        }

        // Walk up the ancestry of each member; a pedigree with n members has no
        // ancestor chain longer than n unless there is a cycle.
        for member in &self.pedigree {
            let mut frontier = vec![(member.name.as_str(), 0usize)];
            while let Some((name, depth)) = frontier.pop() {
                if depth > self.pedigree.len() {
                    return Err(check_pedigree::Error::Cycle(member.name.clone()));
                }
                if let Some(current) = by_name.get(name) {
                    for parent in [current.father(), current.mother()].into_iter().flatten() {
                        if parent == member.name {
                            return Err(check_pedigree::Error::Cycle(member.name.clone()));
                        }
                        frontier.push((parent, depth + 1));
                    }
                }
            }
        }

        Ok(())
    }
}

/// A project: the cohort of cases queried together.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Project {
    /// Name of the project.
    pub name: String,
    /// Cases of the project.
    pub cases: Vec<Case>,
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Build a pedigree member with the given parents.
    pub fn member(name: &str, father: &str, mother: &str, sex: Sex) -> PedigreeMember {
        PedigreeMember {
            name: name.to_string(),
            father: father.to_string(),
            mother: mother.to_string(),
            sex,
            affected: Affected::Unknown,
            has_gt_entries: true,
        }
    }

    /// Build a trio case with members `index`, `father`, `mother`.
    pub fn trio(case_id: &str) -> Case {
        Case {
            id: case_id.to_string(),
            name: case_id.to_string(),
            index: Some(String::from("index")),
            pedigree: vec![
                PedigreeMember {
                    affected: Affected::Affected,
                    ..member("index", "father", "mother", Sex::Male)
                },
                member("father", "0", "0", Sex::Male),
                member("mother", "0", "0", Sex::Female),
            ],
            active_variant_set: Some(VariantSet {
                id: 1,
                release: GenomeRelease::Grch37,
            }),
        }
    }

    /// Build a singleton case with member `index`.
    pub fn singleton(case_id: &str) -> Case {
        Case {
            id: case_id.to_string(),
            name: case_id.to_string(),
            index: Some(String::from("index")),
            pedigree: vec![member("index", "0", "0", Sex::Female)],
            active_variant_set: Some(VariantSet {
                id: 1,
                release: GenomeRelease::Grch37,
            }),
        }
    }

    #[test]
    fn parents() {
        let case = trio("case");
        let index = case.member("index").expect("index in trio");
        assert_eq!(index.father(), Some("father"));
        assert_eq!(index.mother(), Some("mother"));
        let father = case.member("father").expect("father in trio");
        assert_eq!(father.father(), None);
    }

    #[test]
    fn deserialize_ped_codes() -> Result<(), anyhow::Error> {
        let member: PedigreeMember = serde_json::from_str(
            r#"{"name": "index", "father": "f", "mother": "m", "sex": 1, "affected": 2}"#,
        )?;
        assert_eq!(member.sex, Sex::Male);
        assert_eq!(member.affected, Affected::Affected);
        assert!(member.has_gt_entries);
        Ok(())
    }

    #[test]
    fn require_active_variant_set() {
        let mut case = trio("case-1");
        assert!(case.require_active_variant_set().is_ok());
        case.active_variant_set = None;
        assert_eq!(
            case.require_active_variant_set(),
            Err(crate::err::ConfigError::NoActiveVariantSet(String::from(
                "case-1"
            )))
        );
    }

    #[test]
    fn check_pedigree_ok() {
        assert_eq!(trio("case").check_pedigree(), Ok(()));
        assert_eq!(singleton("case").check_pedigree(), Ok(()));
    }

    #[test]
    fn check_pedigree_unknown_parent() {
        let mut case = trio("case");
        case.pedigree.remove(2);
        assert_eq!(
            case.check_pedigree(),
            Err(check_pedigree::Error::UnknownParent(
                String::from("index"),
                String::from("mother")
            ))
        );
    }

    #[test]
    fn check_pedigree_cycle() {
        let case = Case {
            pedigree: vec![
                member("a", "b", "0", Sex::Male),
                member("b", "a", "0", Sex::Male),
            ],
            index: None,
            ..trio("case")
        };
        assert!(matches!(
            case.check_pedigree(),
            Err(check_pedigree::Error::Cycle(_))
        ));
    }
}
