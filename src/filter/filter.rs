use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SqlResult};

/// A search statement: fixed projection and source, optional predicates,
/// mandatory ordering.
///
/// `source` and `columns` are trusted SQL written in the model layer; only
/// the predicate values travel as parameters.
pub struct Filter {
    source: &'static str,
    columns: &'static str,
    where_data: FilterWhere,
    order_data: Vec<FilterOrderInfo>,
}

impl Filter {
    pub fn new(source: &'static str, columns: &'static str) -> Self {
        Self {
            source,
            columns,
            where_data: FilterWhere::new(),
            order_data: vec![],
        }
    }

    pub fn where_clause(mut self, conditions: FilterWhere) -> Self {
        self.where_data = conditions;
        self
    }

    pub fn order(mut self, order: Vec<FilterOrderInfo>) -> Self {
        self.order_data = order;
        self
    }

    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = self.where_data.generate();
        let order_clause = FilterOrder::generate(&self.order_data);

        let query = [
            format!("SELECT {}", self.columns),
            format!("FROM {}", self.source),
            if self.where_data.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            order_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }
}
