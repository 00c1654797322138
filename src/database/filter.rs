//! Typed WHERE / ORDER BY / LIMIT composition on top of `sqlx::QueryBuilder`.
//!
//! Columns are `&'static str` chosen by the repositories, never taken from
//! request input. Every value is bound as a parameter, and the parameter
//! numbering is owned by the `QueryBuilder`, so nested `OR` groups cannot
//! collide with the surrounding conditions.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::DatabaseError;

/// A bindable value with its Postgres type preserved
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Uuid(Uuid),
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    fn push_bind(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            SqlValue::Text(v) => qb.push_bind(v.clone()),
            SqlValue::Uuid(v) => qb.push_bind(*v),
            SqlValue::Bool(v) => qb.push_bind(*v),
            SqlValue::Int(v) => qb.push_bind(*v),
            SqlValue::Float(v) => qb.push_bind(*v),
            SqlValue::Timestamp(v) => qb.push_bind(*v),
        };
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, SqlValue),
    Ne(&'static str, SqlValue),
    Gte(&'static str, SqlValue),
    Lt(&'static str, SqlValue),
    /// Case-insensitive LIKE against an already escaped pattern
    ILike(&'static str, String),
    /// Case-insensitive POSIX regex match
    Regex(&'static str, String),
    Or(Vec<Condition>),
}

impl Condition {
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Condition::Eq(col, v) => Self::push_binary(qb, col, " = ", v),
            Condition::Ne(col, v) => Self::push_binary(qb, col, " <> ", v),
            Condition::Gte(col, v) => Self::push_binary(qb, col, " >= ", v),
            Condition::Lt(col, v) => Self::push_binary(qb, col, " < ", v),
            Condition::ILike(col, pattern) => {
                qb.push(*col).push(" ILIKE ").push_bind(pattern.clone());
            }
            Condition::Regex(col, pattern) => {
                qb.push(*col).push(" ~* ").push_bind(pattern.clone());
            }
            Condition::Or(parts) if parts.is_empty() => {
                qb.push("FALSE");
            }
            Condition::Or(parts) => {
                qb.push("(");
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    part.push_sql(qb);
                }
                qb.push(")");
            }
        }
    }

    fn push_binary(qb: &mut QueryBuilder<'_, Postgres>, col: &str, op: &str, v: &SqlValue) {
        qb.push(col).push(op);
        v.push_bind(qb);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Conditions joined with AND, plus ordering and paging
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
    order: Vec<(&'static str, SortDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn eq(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.when(Condition::Eq(column, value.into()))
    }

    pub fn ne(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.when(Condition::Ne(column, value.into()))
    }

    pub fn gte(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.when(Condition::Gte(column, value.into()))
    }

    pub fn lt(self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.when(Condition::Lt(column, value.into()))
    }

    /// Case-insensitive substring match of `keyword` against any of `columns`
    pub fn contains(self, columns: &[&'static str], keyword: &str) -> Self {
        let pattern = format!("%{}%", like_pattern(keyword));
        let mut parts = columns
            .iter()
            .map(|col| Condition::ILike(*col, pattern.clone()))
            .collect::<Vec<_>>();
        if parts.len() == 1 {
            self.when(parts.remove(0))
        } else {
            self.when(Condition::Or(parts))
        }
    }

    pub fn order_by(mut self, column: &'static str, direction: SortDirection) -> Self {
        self.order.push((column, direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn page(self, page: &Page) -> Self {
        self.limit(page.page_size).offset(page.offset())
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE ...` when there is at least one condition
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            condition.push_sql(qb);
        }
    }

    /// Append ` ORDER BY ... LIMIT ... OFFSET ...`
    pub fn push_tail(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for (i, (column, direction)) in self.order.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(*column).push(" ").push(direction.as_sql());
        }
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = self.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }
    }

    /// Start a query from `select`, then append the WHERE and tail clauses
    pub fn build<'a>(&self, select: &str) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new(select);
        self.push_where(&mut qb);
        self.push_tail(&mut qb);
        qb
    }
}

/// Count rows of `from` that match the filter's conditions
pub async fn count(pool: &PgPool, from: &str, filter: &Filter) -> Result<i64, DatabaseError> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", from));
    filter.push_where(&mut qb);
    let total = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(total)
}

/// Escape LIKE metacharacters so user input matches literally
pub fn like_pattern(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Largest page size any endpoint will serve
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Keeps `page_size * (page - 1)` inside i64
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub page_size: i64,
}

impl Page {
    pub fn new(page: Option<i64>, page_size: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        self.page_size.saturating_mul(self.page.saturating_sub(1))
    }

    /// Number of pages needed for `total` rows
    pub fn pages(&self, total: i64) -> i64 {
        let total = total.max(0);
        total / self.page_size + i64::from(total % self.page_size != 0)
    }
}

/// Lenient numeric query parameter: absent, unparsable and zero all read as None
pub fn query_number(raw: Option<&str>) -> Option<i64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value == 0.0 {
        return None;
    }
    Some(value.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(filter: &Filter) -> String {
        filter.build("SELECT * FROM products").sql().to_string()
    }

    #[test]
    fn empty_filter_has_no_where() {
        assert_eq!(sql(&Filter::new()), "SELECT * FROM products");
    }

    #[test]
    fn conditions_are_joined_with_and() {
        let filter = Filter::new()
            .eq("main_category", "bánh")
            .eq("is_featured", true)
            .order_by("created_at", SortDirection::Desc)
            .limit(10)
            .offset(20);
        assert_eq!(
            sql(&filter),
            "SELECT * FROM products WHERE main_category = $1 AND is_featured = $2 ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn or_group_keeps_parameter_numbering() {
        let filter = Filter::new()
            .eq("category_id", Uuid::nil())
            .contains(&["name", "name_zh", "code"], "tra")
            .eq("status", "Còn hàng");
        assert_eq!(
            sql(&filter),
            "SELECT * FROM products WHERE category_id = $1 AND (name ILIKE $2 OR name_zh ILIKE $3 OR code ILIKE $4) AND status = $5"
        );
    }

    #[test]
    fn single_column_contains_is_not_grouped() {
        let filter = Filter::new().contains(&["name"], "bánh");
        assert_eq!(sql(&filter), "SELECT * FROM products WHERE name ILIKE $1");
    }

    #[test]
    fn empty_or_matches_nothing() {
        let filter = Filter::new().when(Condition::Or(vec![]));
        assert_eq!(sql(&filter), "SELECT * FROM products WHERE FALSE");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(like_pattern("bánh mì"), "bánh mì");
    }

    #[test]
    fn page_math() {
        let page = Page::new(Some(3), 10);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.pages(0), 0);
        assert_eq!(page.pages(10), 1);
        assert_eq!(page.pages(11), 2);
        assert_eq!(Page::new(Some(-4), 10).page, 1);
        assert_eq!(Page::new(None, 10).page, 1);
    }

    #[test]
    fn huge_page_numbers_stay_in_range() {
        let page = Page::new(query_number(Some("1e19")), 10);
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() > 0);

        let page = Page::new(Some(i64::MAX), i64::MAX);
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
        assert!(page.offset() > 0);
        assert_eq!(page.pages(5), 1);
        assert_eq!(page.pages(i64::MAX), i64::MAX / MAX_PAGE_SIZE + 1);
    }

    #[test]
    fn huge_page_size_counts_pages() {
        let page = Page::new(None, query_number(Some("9.3e18")).unwrap_or(10));
        assert_eq!(page.offset(), 0);
        assert_eq!(page.pages(0), 0);
        assert_eq!(page.pages(5), 1);
    }

    #[test]
    fn query_number_is_lenient() {
        assert_eq!(query_number(Some("25")), Some(25));
        assert_eq!(query_number(Some("2.9")), Some(2));
        assert_eq!(query_number(Some("0")), None);
        assert_eq!(query_number(Some("abc")), None);
        assert_eq!(query_number(None), None);
    }
}
