use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Static description of one wide, year-columned dataset.
///
/// Every identifier that ends up in generated SQL is drawn from one of these
/// fields; request input only ever selects among them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub key: String,
    pub title: String,
    pub table: String,
    pub min_year: i32,
    pub max_year: i32,
    pub base_columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub distinct_columns: Vec<String>,
    pub description: Option<String>,
}

/// Maps a request parameter onto an equality filter over one base column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub param: String,
    pub column: String,
    /// Applied when the parameter is absent from the request (not when it is empty).
    #[serde(default)]
    pub default: Option<String>,
}

impl FilterSpec {
    pub fn new(param: &str, column: &str) -> Self {
        Self {
            param: param.to_string(),
            column: column.to_string(),
            default: None,
        }
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }
}

impl DatasetSpec {
    pub fn filter(&self, param: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|f| f.param == param)
    }

    pub fn allows_distinct(&self, column: &str) -> bool {
        self.distinct_columns.iter().any(|c| c == column)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            key: self.key.clone(),
            title: self.title.clone(),
            table: self.table.clone(),
            min_year: self.min_year,
            max_year: self.max_year,
            filters: self.filters.iter().map(|f| f.param.clone()).collect(),
            distinct_columns: self.distinct_columns.clone(),
            description: self.description.clone(),
        }
    }
}

/// Serializable overview of a dataset for introspection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub key: String,
    pub title: String,
    pub table: String,
    pub min_year: i32,
    pub max_year: i32,
    pub filters: Vec<String>,
    pub distinct_columns: Vec<String>,
    pub description: Option<String>,
}

/// One filter_data request after parameter parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    pub values: BTreeMap<String, Option<String>>,
    pub start_year: i32,
    pub end_year: i32,
    pub limit: u64,
}

impl FilterRequest {
    pub const DEFAULT_LIMIT: u64 = 10;

    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            values: BTreeMap::new(),
            start_year,
            end_year,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    pub fn with_value(mut self, param: &str, value: impl Into<String>) -> Self {
        self.values.insert(param.to_string(), Some(value.into()));
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

/// Parameterized SQL ready for execution.
///
/// `params[i]` binds the i-th `?` placeholder of `sql`, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl BuiltQuery {
    pub fn new(sql: String, params: Vec<String>) -> Self {
        debug_assert_eq!(count_placeholders(&sql), params.len());
        Self { sql, params }
    }

    pub fn unparameterized(sql: String) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Count `?` placeholders outside double-quoted identifiers and string literals.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut in_ident = false;
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '"' if !in_literal => in_ident = !in_ident,
            '\'' if !in_ident => in_literal = !in_literal,
            '?' if !in_ident && !in_literal => count += 1,
            _ => {}
        }
    }
    count
}

/// Validated distinct-values query. The column is an identifier, so nothing is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueValuesQuery {
    pub column: String,
    pub query: BuiltQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValues {
    pub column: String,
    pub unique_values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Rows(Vec<Map<String, Value>>),
    /// Year resolution produced no columns; nothing was executed.
    EmptyRange,
}
