//! Result rows and the ordered result list.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::model::Value;
use crate::semantic::{AggregateError, AggregateResult};

/// One result group: its group-by values and its aggregate values, addressed
/// by the names the query declared them under.
///
/// The typed accessors are strict: a null value raises
/// [`AggregateError::NullPrimitiveAccess`] rather than inventing a default,
/// and a kind mismatch raises [`AggregateError::TypeMismatch`]. Use
/// [`AggregateRow::is_null`] or [`AggregateRow::value_of`] when null is an
/// expected outcome.
#[derive(Debug, Clone)]
pub struct AggregateRow {
    values: Vec<(String, Value)>,
}

impl AggregateRow {
    pub(crate) fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    fn lookup(&self, name: &str) -> AggregateResult<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| AggregateError::UnknownRequestName(name.to_string()))
    }

    fn primitive(&self, name: &str) -> AggregateResult<&Value> {
        let value = self.lookup(name)?;
        if value.is_null() {
            return Err(AggregateError::NullPrimitiveAccess(name.to_string()));
        }
        Ok(value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    /// The value under `name`, null included.
    pub fn value_of(&self, name: &str) -> AggregateResult<Value> {
        self.lookup(name).cloned()
    }

    pub fn is_null(&self, name: &str) -> AggregateResult<bool> {
        Ok(self.lookup(name)?.is_null())
    }

    pub fn get_int(&self, name: &str) -> AggregateResult<i64> {
        match self.primitive(name)? {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch(name, "int", other)),
        }
    }

    /// Integer values widen; everything else must already be a float.
    pub fn get_float(&self, name: &str) -> AggregateResult<f64> {
        match self.primitive(name)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(mismatch(name, "float", other)),
        }
    }

    pub fn get_decimal(&self, name: &str) -> AggregateResult<Decimal> {
        match self.primitive(name)? {
            Value::Decimal(v) => Ok(*v),
            other => Err(mismatch(name, "decimal", other)),
        }
    }

    pub fn get_boolean(&self, name: &str) -> AggregateResult<bool> {
        match self.primitive(name)? {
            Value::Boolean(v) => Ok(*v),
            other => Err(mismatch(name, "boolean", other)),
        }
    }

    pub fn get_char(&self, name: &str) -> AggregateResult<char> {
        match self.primitive(name)? {
            Value::Char(v) => Ok(*v),
            other => Err(mismatch(name, "char", other)),
        }
    }

    pub fn get_string(&self, name: &str) -> AggregateResult<String> {
        match self.primitive(name)? {
            Value::String(v) => Ok(v.clone()),
            other => Err(mismatch(name, "string", other)),
        }
    }

    pub fn get_date(&self, name: &str) -> AggregateResult<NaiveDate> {
        match self.primitive(name)? {
            Value::Date(v) => Ok(*v),
            other => Err(mismatch(name, "date", other)),
        }
    }

    pub fn get_timestamp(&self, name: &str) -> AggregateResult<NaiveDateTime> {
        match self.primitive(name)? {
            Value::Timestamp(v) => Ok(*v),
            other => Err(mismatch(name, "timestamp", other)),
        }
    }

    pub fn get_time(&self, name: &str) -> AggregateResult<NaiveTime> {
        match self.primitive(name)? {
            Value::Time(v) => Ok(*v),
            other => Err(mismatch(name, "time", other)),
        }
    }
}

fn mismatch(name: &str, expected: &'static str, found: &Value) -> AggregateError {
    AggregateError::TypeMismatch {
        name: name.to_string(),
        expected,
        found: found.kind_name(),
    }
}

/// The materialized result of an aggregation query.
///
/// Rows start in first-seen group order and can be re-sorted any number of
/// times after execution. Sorting is stable, so equal keys keep their prior
/// relative order, and ties under all order-by names keep the original group
/// order. Null sorts before every non-null value ascending, after descending.
#[derive(Debug, Clone, Default)]
pub struct AggregateList {
    rows: Vec<AggregateRow>,
    orderings: Vec<(String, bool)>,
}

impl AggregateList {
    pub(crate) fn from_rows(rows: Vec<AggregateRow>) -> Self {
        Self {
            rows,
            orderings: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AggregateRow> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AggregateRow> {
        self.rows.iter()
    }

    /// Append one more ordering key (least significant so far) and re-sort.
    pub fn add_order_by(&mut self, name: &str, ascending: bool) -> AggregateResult<()> {
        self.check_name(name)?;
        self.orderings.push((name.to_string(), ascending));
        self.sort();
        Ok(())
    }

    /// Replace the ordering with the given names, all ascending.
    pub fn set_ascending_order_by(&mut self, names: &[&str]) -> AggregateResult<()> {
        self.set_order_by(names, true)
    }

    /// Replace the ordering with the given names, all descending.
    pub fn set_descending_order_by(&mut self, names: &[&str]) -> AggregateResult<()> {
        self.set_order_by(names, false)
    }

    fn set_order_by(&mut self, names: &[&str], ascending: bool) -> AggregateResult<()> {
        for name in names {
            self.check_name(name)?;
        }
        self.orderings = names
            .iter()
            .map(|name| (name.to_string(), ascending))
            .collect();
        self.sort();
        Ok(())
    }

    fn check_name(&self, name: &str) -> AggregateResult<()> {
        match self.rows.first() {
            Some(row) => row.lookup(name).map(|_| ()),
            None => Ok(()),
        }
    }

    fn sort(&mut self) {
        let orderings = self.orderings.clone();
        self.rows.sort_by(|a, b| {
            for (name, ascending) in &orderings {
                let left = a.lookup(name).ok();
                let right = b.lookup(name).ok();
                let ordering = sort_compare(left, right);
                let ordering = if *ascending { ordering } else { ordering.reverse() };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });
    }
}

impl<'a> IntoIterator for &'a AggregateList {
    type Item = &'a AggregateRow;
    type IntoIter = std::slice::Iter<'a, AggregateRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for AggregateList {
    type Item = AggregateRow;
    type IntoIter = std::vec::IntoIter<AggregateRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Total sort order over values: null least, cross-kind incomparables tie.
fn sort_compare(left: Option<&Value>, right: Option<&Value>) -> std::cmp::Ordering {
    let left = left.unwrap_or(&Value::Null);
    let right = right.unwrap_or(&Value::Null);
    match (left.is_null(), right.is_null()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (false, false) => left.compare(right).unwrap_or(std::cmp::Ordering::Equal),
    }
}
