use crate::dialect::Dialect;
use crate::error::Result;
use crate::models::{BuiltQuery, DatasetSpec, FilterRequest, UniqueValuesQuery};

mod assemble;
mod filters;
mod unique;
mod years;

pub use assemble::assemble;
pub use filters::{build_filters, FilterClause};
pub use unique::{fold_unique_values, unique_values_query, validate_column, NULL_PLACEHOLDER};
pub use years::resolve_years;

/// Builds projection and distinct-values queries for any registered dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBuilder {
    max_row_limit: u64,
}

impl SqlBuilder {
    /// Cap applied to request limits; 0 leaves them unbounded.
    pub fn with_max_row_limit(mut self, max_row_limit: u64) -> Self {
        self.max_row_limit = max_row_limit;
        self
    }

    pub fn effective_limit(&self, requested: u64) -> u64 {
        if self.max_row_limit > 0 && requested > self.max_row_limit {
            tracing::debug!(
                requested,
                max_row_limit = self.max_row_limit,
                "clamping row limit"
            );
            self.max_row_limit
        } else {
            requested
        }
    }

    /// Build the filter_data projection; `EmptyRange` when no year column qualifies.
    pub fn build_filter_query(
        &self,
        spec: &DatasetSpec,
        request: &FilterRequest,
        dialect: &dyn Dialect,
    ) -> Result<BuiltQuery> {
        let years = resolve_years(
            spec.min_year,
            spec.max_year,
            request.start_year,
            request.end_year,
        );
        let clause = build_filters(spec, &request.values);
        let query = assemble(
            spec,
            &years,
            clause,
            self.effective_limit(request.limit),
            dialect,
        )?;
        tracing::debug!(
            dataset = %spec.key,
            years = years.len(),
            params = query.params.len(),
            sql = %query.sql,
            "built filter query"
        );
        Ok(query)
    }

    pub fn build_unique_values_query(
        &self,
        spec: &DatasetSpec,
        column: &str,
        dialect: &dyn Dialect,
    ) -> Result<UniqueValuesQuery> {
        unique_values_query(spec, column, dialect)
    }
}
