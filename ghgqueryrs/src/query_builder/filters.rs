use std::collections::BTreeMap;

use crate::models::DatasetSpec;
use crate::sql_ast::SqlExpr;

/// Equality predicates and the values bound to their placeholders, in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterClause {
    pub predicates: Vec<SqlExpr>,
    pub params: Vec<String>,
}

impl FilterClause {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }
}

/// Build one `"<column>" = ?` predicate per active filter.
///
/// Filters are visited in the dataset's declared order. A parameter missing from
/// `values` falls back to the filter default; a present but empty value disables
/// the filter. Column identifiers come from `spec` only.
pub fn build_filters(spec: &DatasetSpec, values: &BTreeMap<String, Option<String>>) -> FilterClause {
    let mut clause = FilterClause::default();
    for filter in &spec.filters {
        let value = match values.get(&filter.param) {
            Some(value) => value.as_deref(),
            None => filter.default.as_deref(),
        };
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        let idx = clause.params.len();
        clause.predicates.push(SqlExpr::eq(
            SqlExpr::column(filter.column.as_str()),
            SqlExpr::Placeholder(idx),
        ));
        clause.params.push(value.to_string());
    }
    clause
}
