//! Select query builder for the REST data service.

use std::fmt::Display;

/// Rows per page when reading a whole collection.
pub const PAGE_SIZE: usize = 1000;

/// A `GET` query: filters, ordering and a row window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = value`
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// `column <> value`
    pub fn neq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("neq.{}", value)));
        self
    }

    /// Case-insensitive substring match on `column`. `%`, `_` and `\` in
    /// `needle` match literally. The service always reads `*` as a wildcard,
    /// so a literal `*` is sent as `_` and callers must re-check the rows.
    pub fn ilike_contains(mut self, column: &str, needle: &str) -> Self {
        self.filters.push((
            column.to_string(),
            format!("ilike.*{}*", escape_like(needle)),
        ));
        self
    }

    /// Append an ordering key; earlier keys take precedence.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Inclusive row range, like `range(from, to)`.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    /// Query-string pairs for the request.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            pairs.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(q: &Select) -> Vec<(String, String)> {
        q.to_query()
    }

    fn has(q: &Select, key: &str, value: &str) -> bool {
        pairs(q).iter().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn test_active_worklist_query() {
        let q = Select::new().eq("resolved", false).order("expiry_date", true);
        assert!(has(&q, "select", "*"));
        assert!(has(&q, "resolved", "eq.false"));
        assert!(has(&q, "order", "expiry_date.asc"));
    }

    #[test]
    fn test_multiple_order_keys_join() {
        let q = Select::new()
            .order("order_date", false)
            .order("created_at", false);
        assert!(has(&q, "order", "order_date.desc,created_at.desc"));
    }

    #[test]
    fn test_range_translates_to_offset_and_limit() {
        let q = Select::new().range(1000, 1999);
        assert!(has(&q, "offset", "1000"));
        assert!(has(&q, "limit", "1000"));
    }

    #[test]
    fn test_ilike_contains() {
        let q = Select::new().ilike_contains("name", "para").limit(20);
        assert!(has(&q, "name", "ilike.*para*"));
        assert!(has(&q, "limit", "20"));
    }

    #[test]
    fn test_ilike_contains_escapes_wildcards() {
        let q = Select::new().ilike_contains("name", "5%_a\\b*");
        assert!(has(&q, "name", "ilike.*5\\%\\_a\\\\b_*"));
    }
}
