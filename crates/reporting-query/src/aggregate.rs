use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use reporting_model::{ColumnSchema, ColumnType, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{QueryError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    #[default]
    Sum,
    Mean,
    Count,
}

impl AggregateFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Mean => "mean",
            AggregateFunction::Count => "count",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[serde(alias = "Ascending")]
    Ascending,
    #[default]
    #[serde(alias = "Descending")]
    Descending,
}

/// Group-by-and-reduce request used to build chart data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub group_by: String,
    pub metric: String,
    #[serde(default, alias = "agg_func")]
    pub function: AggregateFunction,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl AggregationSpec {
    pub fn new(
        group_by: impl Into<String>,
        metric: impl Into<String>,
        function: AggregateFunction,
    ) -> Self {
        Self {
            group_by: group_by.into(),
            metric: metric.into(),
            function,
            sort_order: SortOrder::default(),
        }
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Name of the reduced column in the output table.
    ///
    /// This is the metric name, unless the metric is also the group-by column.
    pub fn output_metric_name(&self) -> String {
        if self.metric == self.group_by {
            format!("{}_{}", self.metric, self.function.as_str())
        } else {
            self.metric.clone()
        }
    }
}

/// Hashable mirror of [`Value`] used as the grouping key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Boolean(bool),
    Number(OrderedFloat<f64>),
    DateTime(NaiveDateTime),
    String(String),
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => GroupKey::Null,
            Value::Boolean(b) => GroupKey::Boolean(*b),
            Value::Number(n) => GroupKey::Number(OrderedFloat(*n)),
            Value::DateTime(dt) => GroupKey::DateTime(*dt),
            Value::String(s) => GroupKey::String(s.clone()),
        }
    }
}

#[derive(Debug)]
struct Group {
    key: Value,
    rows: usize,
    numeric: usize,
    sum: f64,
}

impl Group {
    fn reduce(&self, function: AggregateFunction) -> Option<f64> {
        match function {
            AggregateFunction::Sum => Some(self.sum),
            AggregateFunction::Mean if self.numeric == 0 => None,
            AggregateFunction::Mean => Some(self.sum / self.numeric as f64),
            AggregateFunction::Count => Some(self.rows as f64),
        }
    }
}

/// Group `table` by `spec.group_by` and reduce `spec.metric` per group.
///
/// The result has two columns (group value, reduced metric) and one row per distinct group
/// value, null included. Rows are ordered by the reduced metric per `spec.sort_order`, with
/// absent results last and ties broken by ascending group value. Metric cells that are not
/// numeric (after best-effort parsing of numeric strings) are left out of `sum`/`mean`.
pub fn aggregate(table: &Table, spec: &AggregationSpec) -> Result<Table> {
    let group_idx = table
        .column_idx(&spec.group_by)
        .ok_or_else(|| QueryError::UnknownColumn {
            column: spec.group_by.clone(),
        })?;
    let metric_idx = table
        .column_idx(&spec.metric)
        .ok_or_else(|| QueryError::UnknownColumn {
            column: spec.metric.clone(),
        })?;

    let mut output = Table::new(vec![
        table.schema()[group_idx].clone(),
        ColumnSchema::new(spec.output_metric_name(), ColumnType::Number),
    ])?;

    if table.is_empty() {
        return Ok(output);
    }

    if spec.function != AggregateFunction::Count {
        let mut has_values = false;
        let mut has_numeric = false;
        for value in table.column_values(metric_idx) {
            has_values |= !value.is_null();
            has_numeric |= value.as_number().is_some();
        }
        if has_values && !has_numeric {
            return Err(QueryError::NonNumericMetric {
                column: spec.metric.clone(),
            });
        }
    }

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for row in table.rows() {
        let key = &row[group_idx];
        let slot = *index.entry(GroupKey::from(key)).or_insert_with(|| {
            groups.push(Group {
                key: key.clone(),
                rows: 0,
                numeric: 0,
                sum: 0.0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.rows += 1;
        if let Some(n) = row[metric_idx].as_number() {
            group.numeric += 1;
            group.sum += n;
        }
    }

    let mut reduced: Vec<(Value, Option<f64>)> = groups
        .into_iter()
        .map(|g| {
            let value = g.reduce(spec.function);
            (g.key, value)
        })
        .collect();

    reduced.sort_by(|(key_a, a), (key_b, b)| {
        let by_metric = match (a, b) {
            (Some(a), Some(b)) => match spec.sort_order {
                SortOrder::Ascending => a.total_cmp(b),
                SortOrder::Descending => b.total_cmp(a),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_metric.then_with(|| key_a.total_cmp(key_b))
    });

    log::debug!(
        "aggregate {}({}) by {}: {} rows -> {} groups",
        spec.function.as_str(),
        spec.metric,
        spec.group_by,
        table.row_count(),
        reduced.len()
    );

    for (key, value) in reduced {
        output.push_row(vec![key, value.map(Value::Number).unwrap_or(Value::Null)])?;
    }
    Ok(output)
}
