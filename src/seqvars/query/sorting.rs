//! Code for sorting result rows by coordinate.

use std::cmp::Ordering;

use crate::seqvars::query::statement::ResultRow;
use crate::seqvars::query::value::Value;

/// Columns defining the presentation order of result rows.
pub const COORDINATE_COLUMNS: &[&str] = &[
    "chromosome_no",
    "start",
    "end",
    "reference",
    "alternative",
    "case_id",
];

/// Helper wrapper that allows to sort `ResultRow` by coordinate.
///
/// Orders by chromosome number, start, end, reference and alternative allele
/// and finally by case so that rows of the same variant in several cases have
/// a fixed order.
#[derive(Debug, Clone)]
pub struct ByCoordinate {
    pub coordinate: Vec<Value>,
    pub row: ResultRow,
}

impl From<ResultRow> for ByCoordinate {
    fn from(val: ResultRow) -> Self {
        Self {
            coordinate: COORDINATE_COLUMNS
                .iter()
                .map(|column| val.get(column))
                .collect(),
            row: val,
        }
    }
}

impl PartialEq for ByCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByCoordinate {}

impl PartialOrd for ByCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByCoordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coordinate
            .iter()
            .zip(other.coordinate.iter())
            .map(|(lhs, rhs)| lhs.total_cmp(rhs))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
