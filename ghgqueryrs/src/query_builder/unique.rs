use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::{GhgQueryError, Result};
use crate::models::{BuiltQuery, DatasetSpec, UniqueValuesQuery};
use crate::sql_ast::{SelectQuery, SqlExpr, SqlRenderer, TableRef};

pub const NULL_PLACEHOLDER: &str = "N/A";

/// Return the trusted column name if `requested` is in the dataset's distinct-values allow-list.
///
/// Matching is byte-for-byte: case and accents matter.
pub fn validate_column<'a>(spec: &'a DatasetSpec, requested: &str) -> Result<&'a str> {
    spec.distinct_columns
        .iter()
        .find(|c| c.as_str() == requested)
        .map(String::as_str)
        .ok_or_else(|| {
            GhgQueryError::Validation(format!(
                "Column '{requested}' not allowed or does not exist."
            ))
        })
}

pub fn unique_values_query(
    spec: &DatasetSpec,
    requested: &str,
    dialect: &dyn Dialect,
) -> Result<UniqueValuesQuery> {
    let column = validate_column(spec, requested)?;
    let query = SelectQuery {
        distinct: true,
        select: vec![SqlExpr::column(column)],
        from: TableRef {
            name: spec.table.clone(),
        },
        filters: Vec::new(),
        order_by: vec![SqlExpr::column(column)],
        limit: None,
    };
    let sql = SqlRenderer::new(dialect).render_select(&query);
    Ok(UniqueValuesQuery {
        column: column.to_string(),
        query: BuiltQuery::unparameterized(sql),
    })
}

/// Replace nulls with `"N/A"` and drop repeats, keeping first-seen order.
pub fn fold_unique_values(column: &str, rows: Vec<Map<String, Value>>) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(rows.len());
    for mut row in rows {
        let value = match row.remove(column) {
            None | Some(Value::Null) => Value::String(NULL_PLACEHOLDER.to_string()),
            Some(other) => other,
        };
        if seen.insert(value.to_string()) {
            values.push(value);
        }
    }
    values
}
