use reporting_model::{coerce_date, parse_date_time, ColumnType, Table, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

use crate::criteria::{ColumnConstraint, DateRange, FilterCriteria};
use crate::{QueryError, Result};

/// A [`FilterCriteria`] resolved against one table schema.
///
/// Column lookups and needle/bound coercions happen once here, so per-row matching is a
/// plain comparison.
#[derive(Clone, Debug)]
pub struct Filter {
    constraints: Vec<CompiledConstraint>,
    date: Option<CompiledDateRange>,
}

#[derive(Clone, Debug)]
struct CompiledConstraint {
    column: String,
    idx: usize,
    matcher: Matcher,
}

#[derive(Clone, Debug)]
enum Matcher {
    Exact { needle: Value, cells: CellView },
    /// Lower-cased needle.
    Contains(String),
    Range { start: Value, end: Value, cells: CellView },
}

/// How a cell is read before it is compared with a needle or range bounds.
///
/// Columns loaded from records keep dates and numeric text as strings; a typed needle on
/// such a column compares against each cell's parsed form. Cells that do not parse never
/// match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellView {
    AsIs,
    DateTime,
    Number,
}

#[derive(Clone, Debug)]
struct CompiledDateRange {
    idx: usize,
    range: DateRange,
}

impl Filter {
    pub fn compile(table: &Table, criteria: &FilterCriteria) -> Result<Self> {
        criteria.validate()?;

        let mut constraints = Vec::new();
        for (column, constraint) in criteria.constraints() {
            let idx = column_idx(table, column)?;
            let column_type = table.schema()[idx].column_type;
            let matcher = match constraint {
                ColumnConstraint::Exact(value) => {
                    let cells = CellView::for_operand(column_type, value);
                    let needle = value
                        .coerce_to(cells.target(column_type))
                        .unwrap_or_else(|| value.clone());
                    Matcher::Exact { needle, cells }
                }
                ColumnConstraint::Contains(needle) => Matcher::Contains(needle.to_lowercase()),
                ColumnConstraint::Range { start, end } => {
                    let cells = CellView::for_operand(column_type, start);
                    let target = cells.target(column_type);
                    let (start, end) = coerce_bounds(column, target, start, end)?;
                    Matcher::Range { start, end, cells }
                }
            };
            constraints.push(CompiledConstraint {
                column: column.to_string(),
                idx,
                matcher,
            });
        }

        let date = match criteria.date() {
            Some(range) => Some(CompiledDateRange {
                idx: column_idx(table, &range.column)?,
                range: range.clone(),
            }),
            None => None,
        };

        Ok(Self { constraints, date })
    }

    /// Whether a row of the compiled table satisfies every constraint.
    pub fn matches(&self, row: &[Value]) -> bool {
        self.constraints
            .iter()
            .all(|c| row.get(c.idx).is_some_and(|v| c.matcher.matches(v)))
            && self
                .date
                .as_ref()
                .map_or(true, |d| row.get(d.idx).is_some_and(|v| d.matches(v)))
    }
}

impl Matcher {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Exact { needle, cells } => cells.read(value).is_some_and(|v| *v == *needle),
            Matcher::Contains(needle) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(needle.as_str())),
            Matcher::Range { start, end, cells } => cells.read(value).is_some_and(|value| {
                matches!(
                    start.partial_cmp_same_kind(&value),
                    Some(Ordering::Less | Ordering::Equal)
                ) && matches!(
                    value.partial_cmp_same_kind(end),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }),
        }
    }
}

impl CellView {
    /// Typed operands on untyped (`String` or `Any`) columns read cells as that type.
    fn for_operand(column_type: ColumnType, operand: &Value) -> Self {
        if !matches!(column_type, ColumnType::String | ColumnType::Any) {
            return CellView::AsIs;
        }
        match operand {
            Value::DateTime(_) => CellView::DateTime,
            Value::Number(_) => CellView::Number,
            _ => CellView::AsIs,
        }
    }

    /// The kind needles and bounds are coerced to.
    fn target(self, column_type: ColumnType) -> ColumnType {
        match self {
            CellView::AsIs => column_type,
            CellView::DateTime => ColumnType::DateTime,
            CellView::Number => ColumnType::Number,
        }
    }

    fn read(self, value: &Value) -> Option<Cow<'_, Value>> {
        match (self, value) {
            (CellView::AsIs, _) | (CellView::DateTime, Value::DateTime(_)) => {
                Some(Cow::Borrowed(value))
            }
            (CellView::DateTime, Value::String(text)) => {
                parse_date_time(text).map(|dt| Cow::Owned(Value::DateTime(dt)))
            }
            (CellView::DateTime, _) => None,
            (CellView::Number, _) => value.as_number().map(|n| Cow::Owned(Value::Number(n))),
        }
    }
}

impl CompiledDateRange {
    fn matches(&self, value: &Value) -> bool {
        coerce_date(value).is_some_and(|date| self.range.contains(date))
    }
}

/// Apply `criteria` to `table`, returning the matching rows in their original order.
///
/// Per-column constraints narrow the working set one column at a time; the date range is
/// applied last. Cells that cannot be read as dates never match the date range.
pub fn apply(table: &Table, criteria: &FilterCriteria) -> Result<Table> {
    let filter = Filter::compile(table, criteria)?;

    let mut rows: Vec<usize> = (0..table.row_count()).collect();
    for constraint in &filter.constraints {
        rows.retain(|&row| {
            table
                .value_by_idx(row, constraint.idx)
                .is_some_and(|v| constraint.matcher.matches(v))
        });
        log::debug!(
            "filter on {}: {} of {} rows remain",
            constraint.column,
            rows.len(),
            table.row_count()
        );
    }

    if let Some(date) = &filter.date {
        rows.retain(|&row| table.value_by_idx(row, date.idx).is_some_and(|v| date.matches(v)));
        log::debug!(
            "date range on {} [{}, {}]: {} rows remain",
            date.range.column,
            date.range.start,
            date.range.end,
            rows.len()
        );
    }

    Ok(table.select_rows(&rows))
}

fn column_idx(table: &Table, column: &str) -> Result<usize> {
    table
        .column_idx(column)
        .ok_or_else(|| QueryError::UnknownColumn {
            column: column.to_string(),
        })
}

/// Bring range bounds to the kind the column's cells are compared as.
fn coerce_bounds(
    column: &str,
    target: ColumnType,
    start: &Value,
    end: &Value,
) -> Result<(Value, Value)> {
    match (start.coerce_to(target), end.coerce_to(target)) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(QueryError::InvalidCriteria(format!(
            "range bounds for {column} are not comparable as {target:?}"
        ))),
    }
}
