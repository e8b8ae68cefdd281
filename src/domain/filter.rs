use chrono::NaiveDate;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{Query, QueryAs, QueryScalar};
use sqlx::MySql;

/// Typed bind value for dynamically assembled WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    U64(u64),
    I64(i64),
    F64(f64),
    Str(String),
    Date(NaiveDate),
}

/// Explicit filter builder: list endpoints collect their optional filters
/// into conditions + bind values, and the same filter drives both the COUNT
/// and the data query. Assembly is testable without a database.
#[derive(Debug, Default)]
pub struct SqlFilter {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: &str, value: BindValue) {
        self.conditions.push(condition.to_string());
        self.binds.push(value);
    }

    /// Condition with several placeholders bound to the same value,
    /// e.g. a LIKE search across columns.
    pub fn push_many(&mut self, condition: &str, values: Vec<BindValue>) {
        self.conditions.push(condition.to_string());
        self.binds.extend(values);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// `""` when no filters are set, otherwise `" WHERE a AND b"`.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn bind_query<'q>(
        &self,
        mut q: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        for b in &self.binds {
            q = match b {
                BindValue::U64(v) => q.bind(*v),
                BindValue::I64(v) => q.bind(*v),
                BindValue::F64(v) => q.bind(*v),
                BindValue::Str(s) => q.bind(s.clone()),
                BindValue::Date(d) => q.bind(*d),
            };
        }
        q
    }

    pub fn bind_query_as<'q, T>(
        &self,
        mut q: QueryAs<'q, MySql, T, MySqlArguments>,
    ) -> QueryAs<'q, MySql, T, MySqlArguments> {
        for b in &self.binds {
            q = match b {
                BindValue::U64(v) => q.bind(*v),
                BindValue::I64(v) => q.bind(*v),
                BindValue::F64(v) => q.bind(*v),
                BindValue::Str(s) => q.bind(s.clone()),
                BindValue::Date(d) => q.bind(*d),
            };
        }
        q
    }

    pub fn bind_query_scalar<'q, T>(
        &self,
        mut q: QueryScalar<'q, MySql, T, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, T, MySqlArguments> {
        for b in &self.binds {
            q = match b {
                BindValue::U64(v) => q.bind(*v),
                BindValue::I64(v) => q.bind(*v),
                BindValue::F64(v) => q.bind(*v),
                BindValue::Str(s) => q.bind(s.clone()),
                BindValue::Date(d) => q.bind(*d),
            };
        }
        q
    }
}

/// Clamped pagination, shared by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn from_params(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(10).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where() {
        let f = SqlFilter::new();
        assert!(f.is_empty());
        assert_eq!(f.where_clause(), "");
    }

    #[test]
    fn conditions_join_with_and() {
        let mut f = SqlFilter::new();
        f.push("employee_id = ?", BindValue::U64(7));
        f.push("status = ?", BindValue::Str("pending".into()));
        assert_eq!(f.where_clause(), " WHERE employee_id = ? AND status = ?");
    }

    #[test]
    fn search_binds_one_value_per_placeholder() {
        let mut f = SqlFilter::new();
        let like = BindValue::Str("%acme%".into());
        f.push_many(
            "(customer_name LIKE ? OR invoice_no LIKE ?)",
            vec![like.clone(), like],
        );
        assert_eq!(
            f.where_clause(),
            " WHERE (customer_name LIKE ? OR invoice_no LIKE ?)"
        );
        assert_eq!(f.binds.len(), 2);
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination::from_params(None, None);
        assert_eq!(p, Pagination { page: 1, per_page: 10 });
        assert_eq!(p.offset(), 0);

        let p = Pagination::from_params(Some(0), Some(1000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 100);

        let p = Pagination::from_params(Some(3), Some(25));
        assert_eq!(p.offset(), 50);
    }
}
