use tracing::debug;

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

/// A whitelisted sort key and the column expression it maps to.
pub type SortColumn = (&'static str, &'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl OrderBy {
    /// Resolves a requested sort against `whitelist`. The first whitelist entry
    /// is the fallback column; unknown columns or directions fall back to it,
    /// descending, instead of failing.
    pub fn resolve(order_by: Option<&str>, order_dir: Option<&str>, whitelist: &[SortColumn]) -> Self {
        let fallback = OrderBy {
            column: whitelist[0].1,
            direction: SortDirection::Desc,
        };

        let column = match order_by {
            None => return fallback.with_direction(order_dir),
            Some(key) => {
                let wanted = normalize(key);
                match whitelist.iter().find(|(k, _)| normalize(k) == wanted) {
                    Some((_, expr)) => *expr,
                    None => {
                        debug!("Unknown sort column '{}', using default", key);
                        return fallback;
                    }
                }
            }
        };

        match parse_direction(order_dir) {
            Some(direction) => OrderBy { column, direction },
            None => {
                debug!("Unknown sort direction {:?}, using default", order_dir);
                fallback
            }
        }
    }

    fn with_direction(self, order_dir: Option<&str>) -> Self {
        match parse_direction(order_dir) {
            Some(direction) => OrderBy { direction, ..self },
            None => self,
        }
    }

    pub fn to_sql(&self) -> String {
        format!("ORDER BY {} {}", self.column, self.direction.as_sql())
    }
}

/// Absent means descending; unrecognized yields `None`.
fn parse_direction(raw: Option<&str>) -> Option<SortDirection> {
    match raw.map(|s| s.trim().to_ascii_lowercase()) {
        None => Some(SortDirection::Desc),
        Some(s) if s.is_empty() || s == "desc" => Some(SortDirection::Desc),
        Some(s) if s == "asc" => Some(SortDirection::Asc),
        Some(_) => None,
    }
}

/// `logged_at`, `loggedAt` and `LOGGEDAT` all name the same key.
fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Default and hard maximum page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn resolve(limit: Option<i64>, offset: Option<i64>, limits: &QueryLimits) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(limits.max_limit),
            _ => limits.default_limit,
        };
        Page {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[SortColumn] = &[
        ("id", "t.id"),
        ("createdAt", "t.created_at"),
        ("startDate", "t.start_date"),
    ];

    #[test]
    fn test_known_column_and_direction() {
        let o = OrderBy::resolve(Some("start_date"), Some("ASC"), COLUMNS);
        assert_eq!(o.to_sql(), "ORDER BY t.start_date ASC");
    }

    #[test]
    fn test_absent_sort_uses_default() {
        let o = OrderBy::resolve(None, None, COLUMNS);
        assert_eq!(o.to_sql(), "ORDER BY t.id DESC");

        let o = OrderBy::resolve(None, Some("asc"), COLUMNS);
        assert_eq!(o.to_sql(), "ORDER BY t.id ASC");
    }

    #[test]
    fn test_unknown_column_falls_back() {
        let o = OrderBy::resolve(Some("password; DROP TABLE trips"), Some("asc"), COLUMNS);
        assert_eq!(o.to_sql(), "ORDER BY t.id DESC");
    }

    #[test]
    fn test_unknown_direction_falls_back() {
        let o = OrderBy::resolve(Some("createdAt"), Some("sideways"), COLUMNS);
        assert_eq!(o.to_sql(), "ORDER BY t.id DESC");
    }

    #[test]
    fn test_page_clamping() {
        let limits = QueryLimits::default();
        assert_eq!(Page::resolve(None, None, &limits), Page { limit: 50, offset: 0 });
        assert_eq!(Page::resolve(Some(10_000), Some(20), &limits), Page { limit: 500, offset: 20 });
        assert_eq!(Page::resolve(Some(0), Some(-5), &limits), Page { limit: 50, offset: 0 });
    }
}
