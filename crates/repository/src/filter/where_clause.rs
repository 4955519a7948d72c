//! Where clauses - condition trees passed to data sources

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::model::Record;

/// Comparison applied to a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Inq(Vec<Value>),
    Nin(Vec<Value>),
    /// Field is present and non-null (`true`) or absent/null (`false`)
    Exists(bool),
}

/// Condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Where {
    Field { field: String, condition: Condition },
    And(Vec<Where>),
    Or(Vec<Where>),
}

impl Where {
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Where::Field {
            field: field.into(),
            condition,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Eq(value.into()))
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Neq(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Gt(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Gte(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Lt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Condition::Lte(value.into()))
    }

    pub fn inq<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::field(field, Condition::Inq(values.into_iter().map(Into::into).collect()))
    }

    pub fn nin<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::field(field, Condition::Nin(values.into_iter().map(Into::into).collect()))
    }

    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::field(field, Condition::Exists(present))
    }

    /// Conjunction of `self` and `other`, flattening nested `And`s
    pub fn and(self, other: Where) -> Self {
        match self {
            Where::And(mut clauses) => {
                clauses.push(other);
                Where::And(clauses)
            }
            clause => Where::And(vec![clause, other]),
        }
    }

    /// Disjunction of `self` and `other`
    pub fn or(self, other: Where) -> Self {
        match self {
            Where::Or(mut clauses) => {
                clauses.push(other);
                Where::Or(clauses)
            }
            clause => Where::Or(vec![clause, other]),
        }
    }

    /// Combine an optional caller clause with a mandatory constraint
    ///
    /// The constraint is always kept; a caller clause can only narrow it.
    pub fn constrain(clause: Option<Where>, constraint: Where) -> Where {
        match clause {
            Some(clause) => constraint.and(clause),
            None => constraint,
        }
    }

    /// Evaluate the tree against a record
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Where::Field { field, condition } => condition.matches(record.value_of(field)),
            Where::And(clauses) => clauses.iter().all(|clause| clause.matches(record)),
            Where::Or(clauses) => clauses.iter().any(|clause| clause.matches(record)),
        }
    }
}

impl Condition {
    /// Evaluate against a field value; `None` means absent or null
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Exists(present) => value.is_some() == *present,
            Condition::Eq(expected) => match value {
                Some(actual) => values_equal(actual, expected),
                None => expected.is_null(),
            },
            Condition::Neq(expected) => match value {
                Some(actual) => !values_equal(actual, expected),
                None => !expected.is_null(),
            },
            Condition::Inq(candidates) => {
                value.map_or(false, |actual| candidates.iter().any(|c| values_equal(actual, c)))
            }
            Condition::Nin(candidates) => {
                value.map_or(true, |actual| !candidates.iter().any(|c| values_equal(actual, c)))
            }
            Condition::Gt(bound) => compare_to(value, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare_to(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(bound) => compare_to(value, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => matches!(
                compare_to(value, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

fn compare_to(value: Option<&Value>, bound: &Value) -> Option<Ordering> {
    value.and_then(|actual| compare_values(actual, bound))
}

/// Equality that treats numerically equal numbers as equal (`1` == `1.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Ordering between two values of the same JSON type; `None` across types
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Integers compare exactly; `f64` only once either side is a float
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (as_integer(x), as_integer(y)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> Record {
        Record::new()
            .with("id", 7)
            .with("customerId", 1)
            .with("total", 42.5)
            .with("status", "open")
    }

    #[test]
    fn test_field_conditions() {
        let record = order();
        assert!(Where::eq("customerId", 1).matches(&record));
        assert!(Where::eq("customerId", json!(1.0)).matches(&record));
        assert!(!Where::eq("customerId", 2).matches(&record));
        assert!(Where::neq("status", "closed").matches(&record));
        assert!(Where::gt("total", 40).matches(&record));
        assert!(Where::lte("total", 42.5).matches(&record));
        assert!(!Where::lt("status", 3).matches(&record));
        assert!(Where::inq("id", [1, 7, 9]).matches(&record));
        assert!(Where::nin("id", [1, 9]).matches(&record));
    }

    #[test]
    fn test_missing_fields() {
        let record = order().with("sellerId", Value::Null);
        assert!(Where::exists("sellerId", false).matches(&record));
        assert!(Where::eq("sellerId", Value::Null).matches(&record));
        assert!(!Where::inq("sellerId", [1]).matches(&record));
        assert!(Where::nin("sellerId", [1]).matches(&record));
        assert!(!Where::gt("missing", 0).matches(&record));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let low = json!(9_007_199_254_740_992_i64);
        let high = json!(9_007_199_254_740_993_i64);
        assert!(!values_equal(&low, &high));
        assert_eq!(compare_values(&low, &high), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(u64::MAX), &json!(-1)), Some(Ordering::Greater));
        assert!(values_equal(&json!(2), &json!(2.0)));

        let record = Record::new().with("id", high.clone());
        assert!(Where::eq("id", high).matches(&record));
        assert!(!Where::eq("id", low.clone()).matches(&record));
        assert!(!Where::inq("id", [low]).matches(&record));
    }

    #[test]
    fn test_boolean_trees() {
        let record = order();
        let clause = Where::eq("customerId", 1).and(Where::eq("status", "open"));
        assert!(clause.matches(&record));

        let clause = Where::eq("customerId", 2).or(Where::eq("status", "open"));
        assert!(clause.matches(&record));

        let nested = Where::eq("customerId", 1).and(Where::eq("status", "open")).and(Where::gt("total", 100));
        assert!(matches!(&nested, Where::And(clauses) if clauses.len() == 3));
        assert!(!nested.matches(&record));
    }

    #[test]
    fn test_constrain_keeps_constraint() {
        let record = order();
        let caller = Some(Where::eq("customerId", 2).or(Where::eq("status", "open")));
        let merged = Where::constrain(caller, Where::eq("customerId", 2));
        // the caller's `or` cannot widen past the constraint
        assert!(!merged.matches(&record));

        let merged = Where::constrain(None, Where::eq("customerId", 1));
        assert_eq!(merged, Where::eq("customerId", 1));
    }
}
