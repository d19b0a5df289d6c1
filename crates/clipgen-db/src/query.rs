//! Row filters and query shapes shared by every datastore.

use serde_json::Value;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    IsNull,
}

impl FilterOp {
    /// PostgREST operator token.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Lt => "lt",
            FilterOp::IsNull => "is",
        }
    }
}

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Lt,
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::IsNull,
            value: Value::Null,
        }
    }

    /// Equality on an optional value; `None` matches only NULL.
    pub fn eq_or_null(column: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => Self::eq(column, v),
            None => Self::is_null(column),
        }
    }

    /// Render as a PostgREST `(column, "op.value")` query pair.
    pub fn to_query_pair(&self) -> (String, String) {
        let rendered = match self.op {
            FilterOp::IsNull => "null".to_string(),
            _ => render_value(&self.value),
        };
        (self.column.clone(), format!("{}.{}", self.op.as_str(), rendered))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// A filtered, ordered, limited select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::lt(column, value))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(Filter::is_null(column))
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some((column.into(), Order::Asc));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some((column.into(), Order::Desc));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query string pairs, including `select=*`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(self.filters.iter().map(Filter::to_query_pair));
        if let Some((column, order)) = &self.order {
            let dir = match order {
                Order::Asc => "asc",
                Order::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{}.{}", column, dir)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_rendering() {
        assert_eq!(
            Filter::eq("status", "pending").to_query_pair(),
            ("status".to_string(), "eq.pending".to_string())
        );
        assert_eq!(
            Filter::eq("attempts", 2).to_query_pair(),
            ("attempts".to_string(), "eq.2".to_string())
        );
        assert_eq!(
            Filter::is_null("lease_id").to_query_pair(),
            ("lease_id".to_string(), "is.null".to_string())
        );
        assert_eq!(
            Filter::lt("timeout_at", "2024-01-01T00:00:00+00:00").to_query_pair(),
            ("timeout_at".to_string(), "lt.2024-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_eq_or_null() {
        assert_eq!(Filter::eq_or_null("lease_id", None::<String>).op, FilterOp::IsNull);
        let f = Filter::eq_or_null("lease_id", Some("abc"));
        assert_eq!(f.op, FilterOp::Eq);
        assert_eq!(f.value, json!("abc"));
    }

    #[test]
    fn test_query_pairs() {
        let pairs = Query::new()
            .eq("status", "pending")
            .order_asc("created_at")
            .limit(1)
            .to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("status".to_string(), "eq.pending".to_string()),
                ("order".to_string(), "created_at.asc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }
}
