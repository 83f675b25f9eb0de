//! SQL dialect abstractions for the backing analytical engines.
//!
//! Each dialect is implemented in its own file; DuckDB is the only engine served.

/// Dialects render identifiers and primitive pieces of a query.
/// Query structure lives in `sql_ast`; the dialect only maps names and
/// bind markers to SQL text.
pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;
    fn qualify_table(&self, table: &str) -> String {
        self.quote_ident(table)
    }
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
}

mod duckdb;
pub use duckdb::DuckDbDialect;
