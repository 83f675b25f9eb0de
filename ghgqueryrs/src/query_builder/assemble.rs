use crate::dialect::Dialect;
use crate::error::{GhgQueryError, Result};
use crate::models::{BuiltQuery, DatasetSpec};
use crate::sql_ast::{SelectQuery, SqlExpr, SqlRenderer, TableRef};

use super::filters::FilterClause;

/// Assemble the projection over base columns plus `years`.
///
/// `limit` is the only request-derived value rendered into the SQL text; it is a
/// `u64` and clamped by the caller.
pub fn assemble(
    spec: &DatasetSpec,
    years: &[String],
    clause: FilterClause,
    limit: u64,
    dialect: &dyn Dialect,
) -> Result<BuiltQuery> {
    if years.is_empty() {
        return Err(GhgQueryError::EmptyRange);
    }

    let select = spec
        .base_columns
        .iter()
        .chain(years.iter())
        .map(|name| SqlExpr::column(name.as_str()))
        .collect();

    let query = SelectQuery {
        distinct: false,
        select,
        from: TableRef {
            name: spec.table.clone(),
        },
        filters: clause.predicates,
        order_by: Vec::new(),
        limit: Some(limit),
    };
    let sql = SqlRenderer::new(dialect).render_select(&query);
    Ok(BuiltQuery::new(sql, clause.params))
}
