use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExpr {
    Column {
        name: String,
    },
    /// Positional bind marker; the index is its zero-based position in the parameter list.
    Placeholder(usize),
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
}

impl SqlExpr {
    pub fn column(name: impl Into<String>) -> Self {
        SqlExpr::Column { name: name.into() }
    }

    pub fn eq(left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op: SqlBinaryOperator::Eq,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Eq,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub distinct: bool,
    pub select: Vec<SqlExpr>,
    pub from: TableRef,
    pub filters: Vec<SqlExpr>,
    /// Ascending sort keys.
    pub order_by: Vec<SqlExpr>,
    pub limit: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query.select.iter().map(|e| self.render_expr(e)).collect();

        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if query.distinct { "DISTINCT " } else { "" },
            select_items.join(", "),
            self.dialect.qualify_table(&query.from.name)
        );

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query.order_by.iter().map(|o| self.render_expr(o)).collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        sql
    }

    fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { name } => self.dialect.quote_ident(name),
            SqlExpr::Placeholder(idx) => self.dialect.placeholder(*idx),
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Eq => "=",
                };
                format!(
                    "{} {} {}",
                    self.render_expr(left),
                    op_sql,
                    self.render_expr(right)
                )
            }
        }
    }
}
