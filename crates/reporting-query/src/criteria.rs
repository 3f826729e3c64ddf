use chrono::NaiveDate;
use reporting_model::{parse_date_time, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

use crate::{QueryError, Result};

/// Reserved key naming the column the date range applies to.
pub const DATE_COLUMN_KEY: &str = "date_column";
/// Reserved key holding the inclusive `[start, end]` calendar date pair.
pub const DATE_RANGE_KEY: &str = "date_range";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_TAG: &str = "datetime";

/// Constraint attached to a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnConstraint {
    /// `row[column] == value`.
    Exact(Value),
    /// Case-insensitive substring match; non-string cells never match.
    Contains(String),
    /// Inclusive `start <= row[column] <= end` under the column's natural ordering.
    Range { start: Value, end: Value },
}

impl ColumnConstraint {
    pub fn range(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        ColumnConstraint::Range {
            start: start.into(),
            end: end.into(),
        }
    }

    fn validate(&self, column: &str) -> Result<()> {
        match self {
            ColumnConstraint::Exact(value) => check_finite(column, value),
            ColumnConstraint::Contains(_) => Ok(()),
            ColumnConstraint::Range { start, end } => {
                check_finite(column, start)?;
                check_finite(column, end)?;
                match (start, end) {
                    (Value::Number(_), Value::Number(_))
                    | (Value::DateTime(_), Value::DateTime(_))
                    | (Value::String(_), Value::String(_)) => Ok(()),
                    _ => Err(QueryError::InvalidCriteria(format!(
                        "range bounds for {column} are not comparable: {start:?} and {end:?}"
                    ))),
                }
            }
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            ColumnConstraint::Exact(value) => json!({ "exact": scalar_to_json(value) }),
            ColumnConstraint::Contains(needle) => json!({ "contains": needle }),
            ColumnConstraint::Range { start, end } => {
                json!({ "range": [scalar_to_json(start), scalar_to_json(end)] })
            }
        }
    }

    fn from_json(column: &str, value: &JsonValue) -> Result<Self> {
        if let JsonValue::Object(map) = value {
            if map.len() == 1 {
                if let Some(inner) = map.get("exact") {
                    return Ok(ColumnConstraint::Exact(scalar_from_json(column, inner)?));
                }
                if let Some(inner) = map.get("contains") {
                    let needle = inner.as_str().ok_or_else(|| {
                        QueryError::InvalidCriteria(format!("contains needle for {column} must be a string"))
                    })?;
                    return Ok(ColumnConstraint::Contains(needle.to_string()));
                }
                if let Some(inner) = map.get("range") {
                    return range_from_json(column, inner);
                }
            }
        }

        // Untagged layout written by earlier versions: a pair is a range, anything else is an
        // exact value.
        match value {
            JsonValue::Array(_) => range_from_json(column, value),
            _ => Ok(ColumnConstraint::Exact(scalar_from_json(column, value)?)),
        }
    }
}

/// Inclusive calendar-date range applied to one column, ignoring time-of-day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A column-keyed filter request.
///
/// All constraints must hold for a row to match (logical AND). The date range, when present,
/// is applied after the per-column constraints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterCriteria {
    columns: BTreeMap<String, ColumnConstraint>,
    date_range: Option<DateRange>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, ColumnConstraint::Exact(value.into()));
        self
    }

    pub fn contains(mut self, column: impl Into<String>, needle: impl Into<String>) -> Self {
        self.insert(column, ColumnConstraint::Contains(needle.into()));
        self
    }

    pub fn range(
        mut self,
        column: impl Into<String>,
        start: impl Into<Value>,
        end: impl Into<Value>,
    ) -> Self {
        self.insert(column, ColumnConstraint::range(start, end));
        self
    }

    pub fn date_range(mut self, column: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange {
            column: column.into(),
            start,
            end,
        });
        self
    }

    /// A single-day date range (`start == end`).
    pub fn on_date(self, column: impl Into<String>, date: NaiveDate) -> Self {
        self.date_range(column, date, date)
    }

    /// Set the constraint for `column`, returning the one it replaces.
    pub fn insert(
        &mut self,
        column: impl Into<String>,
        constraint: ColumnConstraint,
    ) -> Option<ColumnConstraint> {
        self.columns.insert(column.into(), constraint)
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.date_range = range;
    }

    pub fn constraint(&self, column: &str) -> Option<&ColumnConstraint> {
        self.columns.get(column)
    }

    /// Per-column constraints, ordered by column name.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &ColumnConstraint)> + '_ {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn date(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.date_range.is_none()
    }

    /// Every column the criteria reads, including the date column.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .keys()
            .map(String::as_str)
            .chain(self.date_range.iter().map(|d| d.column.as_str()))
    }

    /// Combine two criteria. Constraints from `other` win on overlapping columns, and its
    /// date range (if any) replaces ours.
    pub fn merged(&self, other: &FilterCriteria) -> FilterCriteria {
        let mut out = self.clone();
        for (column, constraint) in &other.columns {
            out.columns.insert(column.clone(), constraint.clone());
        }
        if other.date_range.is_some() {
            out.date_range = other.date_range.clone();
        }
        out
    }

    /// Structural validation, independent of any table schema.
    pub fn validate(&self) -> Result<()> {
        for (column, constraint) in &self.columns {
            if column.is_empty() {
                return Err(QueryError::InvalidCriteria(
                    "column names must not be empty".to_string(),
                ));
            }
            if column == DATE_COLUMN_KEY || column == DATE_RANGE_KEY {
                return Err(QueryError::InvalidCriteria(format!(
                    "{column} is reserved for the date filter"
                )));
            }
            constraint.validate(column)?;
        }
        if let Some(range) = &self.date_range {
            if range.column.is_empty() {
                return Err(QueryError::InvalidCriteria(
                    "date filter column must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (column, constraint) in &self.columns {
            map.insert(column.clone(), constraint.to_json());
        }
        if let Some(range) = &self.date_range {
            map.insert(DATE_COLUMN_KEY.to_string(), json!(range.column));
            map.insert(
                DATE_RANGE_KEY.to_string(),
                json!([
                    range.start.format(DATE_FORMAT).to_string(),
                    range.end.format(DATE_FORMAT).to_string()
                ]),
            );
        }
        JsonValue::Object(map)
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = value else {
            return Err(QueryError::InvalidCriteria(
                "criteria must be a JSON object".to_string(),
            ));
        };

        let mut criteria = FilterCriteria::new();
        for (key, value) in map {
            if key == DATE_COLUMN_KEY || key == DATE_RANGE_KEY {
                continue;
            }
            criteria
                .columns
                .insert(key.clone(), ColumnConstraint::from_json(key, value)?);
        }

        match (map.get(DATE_COLUMN_KEY), map.get(DATE_RANGE_KEY)) {
            (None, None) => {}
            (Some(column), Some(range)) => {
                let column = column.as_str().ok_or_else(|| {
                    QueryError::InvalidCriteria(format!("{DATE_COLUMN_KEY} must be a string"))
                })?;
                let (start, end) = date_pair_from_json(range)?;
                criteria.date_range = Some(DateRange {
                    column: column.to_string(),
                    start,
                    end,
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(QueryError::InvalidCriteria(format!(
                    "{DATE_COLUMN_KEY} and {DATE_RANGE_KEY} must be given together"
                )));
            }
        }

        Ok(criteria)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)?;
        Self::from_json(&value)
    }
}

impl Serialize for FilterCriteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterCriteria {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        FilterCriteria::from_json(&value).map_err(serde::de::Error::custom)
    }
}

fn check_finite(column: &str, value: &Value) -> Result<()> {
    match value {
        Value::Number(n) if !n.is_finite() => Err(QueryError::InvalidCriteria(format!(
            "non-finite number in criteria for {column}"
        ))),
        _ => Ok(()),
    }
}

fn scalar_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::DateTime(dt) => {
            let mut tagged = Map::new();
            tagged.insert(
                DATE_TIME_TAG.to_string(),
                JsonValue::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            );
            JsonValue::Object(tagged)
        }
    }
}

fn scalar_from_json(column: &str, value: &JsonValue) -> Result<Value> {
    if let Some(scalar) = Value::from_json_scalar(value) {
        return Ok(scalar);
    }
    if let Some(text) = value
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.get(DATE_TIME_TAG))
        .and_then(JsonValue::as_str)
    {
        return parse_date_time(text).map(Value::DateTime).ok_or_else(|| {
            QueryError::InvalidCriteria(format!("invalid datetime for {column}: {text}"))
        });
    }
    Err(QueryError::InvalidCriteria(format!(
        "expected a scalar value for {column}, got {value}"
    )))
}

fn range_from_json(column: &str, value: &JsonValue) -> Result<ColumnConstraint> {
    match value.as_array().map(Vec::as_slice) {
        Some([start, end]) => Ok(ColumnConstraint::Range {
            start: scalar_from_json(column, start)?,
            end: scalar_from_json(column, end)?,
        }),
        _ => Err(QueryError::InvalidCriteria(format!(
            "range for {column} must be a [start, end] pair"
        ))),
    }
}

/// Read a `[start, end]` date pair. A single date (bare or in a one-element array) is a
/// one-day range.
fn date_pair_from_json(value: &JsonValue) -> Result<(NaiveDate, NaiveDate)> {
    let parse = |v: &JsonValue| -> Result<NaiveDate> {
        v.as_str()
            .and_then(parse_date_time)
            .map(|dt| dt.date())
            .ok_or_else(|| QueryError::InvalidCriteria(format!("invalid date in {DATE_RANGE_KEY}: {v}")))
    };

    match value {
        JsonValue::Array(items) => match items.as_slice() {
            [start, end] => Ok((parse(start)?, parse(end)?)),
            [single] => {
                let date = parse(single)?;
                Ok((date, date))
            }
            _ => Err(QueryError::InvalidCriteria(format!(
                "{DATE_RANGE_KEY} must hold one or two dates"
            ))),
        },
        single => {
            let date = parse(single)?;
            Ok((date, date))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn tagged_json_round_trips() {
        let criteria = FilterCriteria::new()
            .exact("category", "A")
            .exact("when", ymd(2023, 1, 1).and_hms_opt(8, 0, 0).unwrap())
            .contains("customer", "cust")
            .range("value", 100.0, 250.0)
            .date_range("date", ymd(2023, 1, 2), ymd(2023, 1, 4));

        let text = criteria.to_json_string().unwrap();
        assert_eq!(FilterCriteria::from_json_str(&text).unwrap(), criteria);
    }

    #[test]
    fn untagged_values_decode_as_exact_and_range() {
        let criteria = FilterCriteria::from_json(&json!({
            "category": "A",
            "value": [100, 200],
            "active": true,
        }))
        .unwrap();

        assert_eq!(
            criteria.constraint("category"),
            Some(&ColumnConstraint::Exact(Value::from("A")))
        );
        assert_eq!(
            criteria.constraint("value"),
            Some(&ColumnConstraint::range(100.0, 200.0))
        );
        assert_eq!(
            criteria.constraint("active"),
            Some(&ColumnConstraint::Exact(Value::Boolean(true)))
        );
    }

    #[test]
    fn single_timestamp_is_a_one_day_range() {
        let criteria = FilterCriteria::from_json(&json!({
            "date_column": "date",
            "date_range": "2023-01-03 00:00:00",
        }))
        .unwrap();
        let range = criteria.date().unwrap();
        assert_eq!((range.start, range.end), (ymd(2023, 1, 3), ymd(2023, 1, 3)));
    }

    #[test]
    fn date_keys_must_come_together() {
        let err = FilterCriteria::from_json(&json!({ "date_column": "date" })).unwrap_err();
        assert!(matches!(err, QueryError::InvalidCriteria(_)));
    }

    #[test]
    fn validate_rejects_reserved_names_and_mixed_range_bounds() {
        let reserved = FilterCriteria::new().exact(DATE_RANGE_KEY, "x");
        assert!(matches!(
            reserved.validate(),
            Err(QueryError::InvalidCriteria(_))
        ));

        let mixed = FilterCriteria::new().range("value", 1.0, "ten");
        assert!(matches!(mixed.validate(), Err(QueryError::InvalidCriteria(_))));

        let bools = FilterCriteria::new().range("flag", false, true);
        assert!(matches!(bools.validate(), Err(QueryError::InvalidCriteria(_))));

        assert!(FilterCriteria::new().range("value", 1.0, 10.0).validate().is_ok());
    }
}
