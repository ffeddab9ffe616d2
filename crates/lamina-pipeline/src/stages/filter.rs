use crate::error::Result;
use crate::expr::Expr;
use crate::stage::RowStage;
use lamina_types::Row;

/// Drops rows that do not satisfy an [`Expr`].
#[derive(Debug, Clone)]
pub struct Filter {
    expr: Expr,
}

impl Filter {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    pub fn parse(expression: &str) -> Result<Self> {
        Expr::parse(expression).map(Self::new)
    }
}

impl RowStage for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn push(&mut self, row: Row, out: &mut Vec<Row>) {
        if self.expr.matches(&row) {
            out.push(row);
        } else {
            tracing::trace!("row filtered out");
        }
    }
}
