//! Query parts: fields, join source and conditions.
//!
//! `QueryParts` is the immutable value that extenders build on.  Expressions
//! and predicates are evaluated against one variant record together with the
//! columns joined to it so far.  Predicates follow SQL three-valued logic:
//! comparisons involving `Null` are unknown (`None`) and a row is only kept if
//! its condition is known to be true.

use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::common::canonicalize;
use crate::seqvars::query::schema::data::VariantRecord;
use crate::seqvars::query::store::{AnnotationCatalog, ReferenceTable, TableRow};
use crate::seqvars::query::value::Value;

/// Field of the per-sample call information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CallField {
    Gt,
    Gq,
    Dp,
    Ad,
}

/// Scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column of the record or of a join output.
    Column(String),
    /// Literal value.
    Literal(Value),
    /// First non-null value.
    Coalesce(Vec<Expr>),
    /// Call information of one sample, `Null` if the sample is absent.
    Call { sample: String, field: CallField },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn call(sample: &str, field: CallField) -> Self {
        Expr::Call {
            sample: sample.to_string(),
            field,
        }
    }

    /// Replace `Null` by `default`.
    pub fn or_default(self, default: impl Into<Value>) -> Self {
        Expr::Coalesce(vec![self, Expr::literal(default)])
    }

    fn compare(self, op: CmpOp, value: impl Into<Value>) -> Predicate {
        Predicate::Cmp(self, op, Expr::literal(value))
    }

    pub fn equals(self, value: impl Into<Value>) -> Predicate {
        self.compare(CmpOp::Eq, value)
    }

    pub fn not_equals(self, value: impl Into<Value>) -> Predicate {
        self.compare(CmpOp::Ne, value)
    }

    pub fn at_most(self, value: impl Into<Value>) -> Predicate {
        self.compare(CmpOp::Le, value)
    }

    pub fn at_least(self, value: impl Into<Value>) -> Predicate {
        self.compare(CmpOp::Ge, value)
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::In(self, values.into_iter().map(Into::into).collect())
    }

    pub fn overlaps<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::Overlaps(self, values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self)
    }

    /// Evaluate the expression for the given row.
    pub fn eval(&self, row: &RowContext) -> Value {
        match self {
            Expr::Column(name) => row.get(name),
            Expr::Literal(value) => value.clone(),
            Expr::Coalesce(exprs) => exprs
                .iter()
                .map(|expr| expr.eval(row))
                .find(|value| !value.is_null())
                .unwrap_or_default(),
            Expr::Call { sample, field } => match row.record.genotype.get(sample) {
                None => Value::Null,
                Some(call) => match field {
                    CallField::Gt => Value::from(call.gt.clone()),
                    CallField::Gq => Value::from(call.gq),
                    CallField::Dp => Value::from(call.dp),
                    CallField::Ad => Value::from(call.ad),
                },
            },
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Le,
    Ge,
}

impl CmpOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Boolean predicate over one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Const(bool),
    /// Conjunction, true if empty.
    And(Vec<Predicate>),
    /// Disjunction, false if empty.
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Cmp(Expr, CmpOp, Expr),
    /// Value is one of the literals.
    In(Expr, Vec<Value>),
    /// List value shares an element with the literals; scalars behave as `In`.
    Overlaps(Expr, Vec<Value>),
    IsNull(Expr),
    /// The sample has an entry in the genotype data.
    HasSample(String),
    /// Allele balance `ad / dp` of the sample lies within `[min_ab, 1 - min_ab]`;
    /// true if there is no depth information.
    AlleleBalance { sample: String, min_ab: f64 },
}

impl Predicate {
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or(predicates)
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    /// Material implication `lhs -> rhs`.
    pub fn implies(lhs: Predicate, rhs: Predicate) -> Self {
        Predicate::or(vec![Predicate::not(lhs), rhs])
    }

    /// Evaluate with three-valued logic, `None` meaning unknown.
    pub fn eval(&self, row: &RowContext) -> Option<bool> {
        match self {
            Predicate::Const(value) => Some(*value),
            Predicate::And(predicates) => {
                let mut result = Some(true);
                for predicate in predicates {
                    match predicate.eval(row) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => (),
                    }
                }
                result
            }
            Predicate::Or(predicates) => {
                let mut result = Some(false);
                for predicate in predicates {
                    match predicate.eval(row) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => (),
                    }
                }
                result
            }
            Predicate::Not(predicate) => predicate.eval(row).map(|value| !value),
            Predicate::Cmp(lhs, op, rhs) => lhs
                .eval(row)
                .sql_cmp(&rhs.eval(row))
                .map(|ordering| op.holds(ordering)),
            Predicate::In(expr, values) => {
                let value = expr.eval(row);
                if value.is_null() {
                    None
                } else {
                    Some(values.iter().any(|v| value.sql_cmp(v) == Some(Ordering::Equal)))
                }
            }
            Predicate::Overlaps(expr, values) => match expr.eval(row) {
                Value::Null => None,
                Value::List(items) => Some(items.iter().any(|item| {
                    values
                        .iter()
                        .any(|v| item.sql_cmp(v) == Some(Ordering::Equal))
                })),
                value => Some(values.iter().any(|v| value.sql_cmp(v) == Some(Ordering::Equal))),
            },
            Predicate::IsNull(expr) => Some(expr.eval(row).is_null()),
            Predicate::HasSample(sample) => Some(row.record.genotype.contains_key(sample)),
            Predicate::AlleleBalance { sample, min_ab } => {
                let call = row.record.genotype.get(sample);
                match (call.and_then(|c| c.ad), call.and_then(|c| c.dp)) {
                    (Some(ad), Some(dp)) if dp > 0 => {
                        let balance = ad as f64 / dp as f64;
                        let balance = balance.min(1.0 - balance);
                        Some(balance + 1e-6 >= *min_ab)
                    }
                    _ => Some(true),
                }
            }
        }
    }
}

/// Named output expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub expr: Expr,
}

impl Field {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    /// Field passing through the column of the same name.
    pub fn column(name: &str) -> Self {
        Self::new(name, Expr::column(name))
    }
}

/// Aggregate selecting one value from all matching table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Aggregate {
    /// First non-null value in table order.
    First,
    Max,
    Min,
    /// Whether any value is `true`, `Null` without matches.
    BoolOr,
    /// Number of matching rows.
    Count,
    /// Whether there is any matching row.
    Exists,
    /// All non-null values, `Null` without matches.
    Collect,
}

impl Aggregate {
    fn apply(&self, column: &str, matches: &[&TableRow]) -> Value {
        let mut values = matches
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null())
            .cloned();
        match self {
            Aggregate::First => values.next().unwrap_or_default(),
            Aggregate::Max => values.max_by(|a, b| a.total_cmp(b)).unwrap_or_default(),
            Aggregate::Min => values.min_by(|a, b| a.total_cmp(b)).unwrap_or_default(),
            Aggregate::BoolOr if matches.is_empty() => Value::Null,
            Aggregate::BoolOr => Value::Bool(values.any(|value| value.as_bool() == Some(true))),
            Aggregate::Count => Value::Int(matches.len() as i64),
            Aggregate::Exists => Value::Bool(!matches.is_empty()),
            Aggregate::Collect if matches.is_empty() => Value::Null,
            Aggregate::Collect => Value::List(values.collect()),
        }
    }
}

/// How rows of a reference table are matched to the current row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKey {
    /// Release, chromosome, start, end, reference and alternative allele.
    Variant,
    /// Case identity plus `Variant`.
    CaseVariant,
    /// Equality of one column of the current row with one table column.
    Column { base: String, table: String },
}

const VARIANT_KEY_COLUMNS: &[&str] = &[
    "release",
    "chromosome",
    "start",
    "end",
    "reference",
    "alternative",
];

impl JoinKey {
    /// Key of the given values, `None` if any key value is `Null`.
    fn render(values: impl Iterator<Item = (&'static str, Value)>) -> Option<String> {
        let mut parts = Vec::new();
        for (column, value) in values {
            if value.is_null() {
                return None;
            }
            let rendered = value.to_output_string();
            if column == "chromosome" {
                parts.push(canonicalize(&rendered));
            } else {
                parts.push(rendered);
            }
        }
        Some(parts.join("\t"))
    }

    fn columns(&self) -> Vec<&'static str> {
        match self {
            JoinKey::Variant => VARIANT_KEY_COLUMNS.to_vec(),
            JoinKey::CaseVariant => std::iter::once("case_id")
                .chain(VARIANT_KEY_COLUMNS.iter().copied())
                .collect(),
            JoinKey::Column { .. } => vec!["value"],
        }
    }

    fn of_row(&self, row: &RowContext) -> Option<String> {
        match self {
            JoinKey::Column { base, .. } => Self::render(std::iter::once(("value", row.get(base)))),
            _ => Self::render(
                self.columns()
                    .into_iter()
                    .map(|column| (column, row.get(column))),
            ),
        }
    }

    fn of_table_row(&self, row: &TableRow) -> Option<String> {
        let get = |column: &str| row.get(column).cloned().unwrap_or_default();
        match self {
            JoinKey::Column { table, .. } => Self::render(std::iter::once(("value", get(table)))),
            _ => Self::render(
                self.columns()
                    .into_iter()
                    .map(|column| (column, get(column))),
            ),
        }
    }
}

/// One output column of a join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutput {
    /// Name of the column in the joined row.
    pub name: String,
    /// Column of the reference table.
    pub column: String,
    pub aggregate: Aggregate,
}

/// Correlated left join against one reference table.
///
/// Yields exactly one value per output for every base row; `Null` (or the
/// neutral value of the aggregate) if no table row matches.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    /// Name of the join; a join source contains each name at most once.
    pub name: String,
    pub table: ReferenceTable,
    pub key: JoinKey,
    /// Only consider table rows where all of these columns have these values.
    pub table_filter: Vec<(String, Value)>,
    pub outputs: Vec<JoinOutput>,
}

impl JoinPlan {
    pub fn new(name: &str, table: ReferenceTable, key: JoinKey) -> Self {
        Self {
            name: name.to_string(),
            table,
            key,
            table_filter: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an output column.
    pub fn output(mut self, name: &str, column: &str, aggregate: Aggregate) -> Self {
        self.outputs.push(JoinOutput {
            name: name.to_string(),
            column: column.to_string(),
            aggregate,
        });
        self
    }

    /// Restrict the table rows considered.
    pub fn filter_table(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.table_filter.push((column.to_string(), value.into()));
        self
    }

    /// Index the table rows by join key.
    pub fn prepare<'a>(&'a self, catalog: &'a AnnotationCatalog) -> PreparedJoin<'a> {
        let mut index: HashMap<String, Vec<&'a TableRow>> = HashMap::new();
        for row in catalog.rows(self.table) {
            let selected = self.table_filter.iter().all(|(column, value)| {
                row.get(column)
                    .map(|v| v.sql_cmp(value) == Some(Ordering::Equal))
                    .unwrap_or(false)
            });
            if !selected {
                continue;
            }
            if let Some(key) = self.key.of_table_row(row) {
                index.entry(key).or_default().push(row);
            }
        }
        PreparedJoin { plan: self, index }
    }
}

/// A join plan with its table indexed by key.
#[derive(Debug)]
pub struct PreparedJoin<'a> {
    plan: &'a JoinPlan,
    index: HashMap<String, Vec<&'a TableRow>>,
}

impl<'a> PreparedJoin<'a> {
    /// Compute the join outputs for `row` and add them to it.
    pub fn apply(&self, row: &mut RowContext) {
        let matches = self
            .plan
            .key
            .of_row(row)
            .and_then(|key| self.index.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();
        for output in &self.plan.outputs {
            let value = output.aggregate.apply(&output.column, matches);
            row.joined.insert(output.name.clone(), value);
        }
    }
}

/// Restriction of the variant table to one case's variant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub case_id: String,
    pub set_id: i64,
}

/// The join source: the variant table, optionally scoped, with joins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selectable {
    pub scope: Option<Scope>,
    pub joins: Vec<JoinPlan>,
}

impl Selectable {
    /// Restrict to the given case and variant set.
    pub fn restrict(self, case_id: &str, set_id: i64) -> Self {
        Self {
            scope: Some(Scope {
                case_id: case_id.to_string(),
                set_id,
            }),
            ..self
        }
    }

    /// Add a join unless a join of the same name is present already.
    pub fn join(mut self, plan: JoinPlan) -> Self {
        if !self.joins.iter().any(|join| join.name == plan.name) {
            self.joins.push(plan);
        }
        self
    }
}

/// One variant record together with the columns joined to it.
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub record: &'a VariantRecord,
    pub joined: IndexMap<String, Value>,
}

impl<'a> RowContext<'a> {
    pub fn new(record: &'a VariantRecord) -> Self {
        Self {
            record,
            joined: IndexMap::new(),
        }
    }

    /// Value of the column; join outputs shadow record columns.
    pub fn get(&self, name: &str) -> Value {
        self.joined
            .get(name)
            .cloned()
            .or_else(|| self.record.column(name))
            .unwrap_or_default()
    }
}

/// The composition unit of queries: output fields, join source, conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParts {
    pub fields: Vec<Field>,
    pub selectable: Selectable,
    pub conditions: Vec<Predicate>,
}

impl QueryParts {
    /// Names of the output fields, without duplicates.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for field in &self.fields {
            if !names.contains(&field.name.as_str()) {
                names.push(field.name.as_str());
            }
        }
        names
    }

    /// Conjunction of all conditions.
    pub fn condition(&self) -> Predicate {
        Predicate::and(self.conditions.clone())
    }
}
