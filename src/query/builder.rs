//! Predicate accumulation with internally tracked positional placeholders.
//!
//! Fragments are written with `$?` markers; the builder rewrites every marker
//! to the next free `$n` and records the bound value in the same order, so the
//! argument list always lines up with the SQL text.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

const MARKER: &str = "$?";

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    IntArray(Vec<i64>),
    TextArray(Vec<String>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<Vec<i64>> for SqlValue {
    fn from(v: Vec<i64>) -> Self {
        SqlValue::IntArray(v)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(v: Vec<String>) -> Self {
        SqlValue::TextArray(v)
    }
}

/// Emission stages. Fragments must be appended in non-decreasing stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Guard,
    OfferIds,
    Equality,
    Substring,
    Range,
    Membership,
    Radius,
    Search,
}

#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    fragments: Vec<String>,
    args: Vec<SqlValue>,
    next: usize,
    stage: Stage,
    guards: usize,
}

impl Default for PredicateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_placeholder: usize) -> Self {
        Self {
            fragments: Vec::new(),
            args: Vec::new(),
            next: first_placeholder,
            stage: Stage::Guard,
            guards: 0,
        }
    }

    /// Appends `fragment`, binding one value per `$?` marker in order.
    pub fn append_predicate<I>(&mut self, fragment: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        let mut values = values.into_iter();
        let mut out = String::with_capacity(fragment.len() + 8);
        let mut rest = fragment;

        while let Some(pos) = rest.find(MARKER) {
            let value = match values.next() {
                Some(v) => v,
                None => panic!("fewer values than placeholders in '{}'", fragment),
            };
            out.push_str(&rest[..pos]);
            out.push('$');
            out.push_str(&self.next.to_string());
            self.args.push(value);
            self.next += 1;
            rest = &rest[pos + MARKER.len()..];
        }
        out.push_str(rest);
        assert!(
            values.next().is_none(),
            "more values than placeholders in '{}'",
            fragment
        );

        self.fragments.push(out);
        self
    }

    /// Appends `fragment` with every `$?` marker bound to the same placeholder.
    pub fn append_shared(&mut self, fragment: &str, value: SqlValue) -> &mut Self {
        let placeholder = format!("${}", self.next);
        self.fragments.push(fragment.replace(MARKER, &placeholder));
        self.args.push(value);
        self.next += 1;
        self
    }

    /// Always-on predicate without bound values.
    pub fn guard(&mut self, fragment: &str) -> &mut Self {
        self.enter(Stage::Guard);
        self.guards += 1;
        self.fragments.push(fragment.to_string());
        self
    }

    pub fn offer_ids(&mut self, fragment: &str, ids: Option<&[i64]>) -> &mut Self {
        if let Some(ids) = ids {
            self.enter(Stage::OfferIds);
            self.append_predicate(fragment, [SqlValue::IntArray(ids.to_vec())]);
        }
        self
    }

    pub fn eq<V: Into<SqlValue>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.enter(Stage::Equality);
            self.append_predicate(&format!("{} = {}", column, MARKER), [value.into()]);
        }
        self
    }

    /// Equality against any of `columns`, sharing one placeholder.
    pub fn eq_any_column<V: Into<SqlValue>>(&mut self, columns: &[&str], value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.enter(Stage::Equality);
            let ors: Vec<String> = columns.iter().map(|c| format!("{} = {}", c, MARKER)).collect();
            self.append_shared(&format!("({})", ors.join(" OR ")), value.into());
        }
        self
    }

    /// Case-insensitive substring match. Blank terms are ignored.
    pub fn contains(&mut self, column: &str, term: Option<&str>) -> &mut Self {
        self.contains_any(&[column], term)
    }

    pub fn contains_any(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        if let Some(pattern) = like_pattern(term) {
            self.enter(Stage::Substring);
            let fragment = ilike_fragment(columns);
            self.append_shared(&fragment, SqlValue::Text(pattern));
        }
        self
    }

    /// Inclusive bounds; each present bound is its own fragment.
    pub fn range<V: Into<SqlValue>>(&mut self, column: &str, min: Option<V>, max: Option<V>) -> &mut Self {
        if min.is_some() || max.is_some() {
            self.enter(Stage::Range);
        }
        if let Some(min) = min {
            self.append_predicate(&format!("{} >= {}", column, MARKER), [min.into()]);
        }
        if let Some(max) = max {
            self.append_predicate(&format!("{} <= {}", column, MARKER), [max.into()]);
        }
        self
    }

    pub fn within<V>(&mut self, column: &str, values: Option<V>) -> &mut Self
    where
        V: Into<SqlValue>,
    {
        if let Some(values) = values {
            self.enter(Stage::Membership);
            self.append_predicate(&format!("{} = ANY({})", column, MARKER), [values.into()]);
        }
        self
    }

    /// Exclusion dual of `within`. NULL columns are kept.
    pub fn not_within<V>(&mut self, column: &str, values: Option<V>) -> &mut Self
    where
        V: Into<SqlValue>,
    {
        if let Some(values) = values {
            self.enter(Stage::Membership);
            self.append_predicate(
                &format!("({col} IS NULL OR {col} <> ALL({m}))", col = column, m = MARKER),
                [values.into()],
            );
        }
        self
    }

    /// Geodesic distance-within on a geography column. Needs all three inputs.
    pub fn within_radius(
        &mut self,
        column: &str,
        lat: Option<f64>,
        lng: Option<f64>,
        radius_km: Option<f64>,
    ) -> &mut Self {
        if let (Some(lat), Some(lng), Some(radius_km)) = (lat, lng, radius_km) {
            self.enter(Stage::Radius);
            self.append_predicate(
                &format!(
                    "ST_DWithin({}, ST_SetSRID(ST_MakePoint({m}, {m}), 4326)::geography, {m})",
                    column,
                    m = MARKER
                ),
                [
                    SqlValue::Float(lng),
                    SqlValue::Float(lat),
                    SqlValue::Float(radius_km * 1000.0),
                ],
            );
        }
        self
    }

    /// Free-text search over `columns`, OR-combined under one placeholder.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        if let Some(pattern) = like_pattern(term) {
            self.enter(Stage::Search);
            let fragment = ilike_fragment(columns);
            self.append_shared(&fragment, SqlValue::Text(pattern));
        }
        self
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Fragments other than the always-on guards.
    pub fn filter_count(&self) -> usize {
        self.fragments.len() - self.guards
    }

    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    pub fn next_placeholder(&self) -> usize {
        self.next
    }

    pub fn build(self) -> CompiledPredicates {
        let clause = if self.fragments.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.fragments.join(" AND "))
        };
        CompiledPredicates {
            clause,
            filter_count: self.fragments.len() - self.guards,
            args: self.args,
            next_placeholder: self.next,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(
            stage >= self.stage,
            "predicate stage {:?} appended after {:?}",
            stage,
            self.stage
        );
        self.stage = stage;
    }
}

/// Combined WHERE clause plus the arguments bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicates {
    pub clause: String,
    pub args: Vec<SqlValue>,
    pub next_placeholder: usize,
    pub filter_count: usize,
}

impl CompiledPredicates {
    /// Returns `LIMIT $n OFFSET $n+1` and binds both values.
    pub fn limit_clause(&mut self, limit: i64, offset: i64) -> String {
        let clause = format!(
            "LIMIT ${} OFFSET ${}",
            self.next_placeholder,
            self.next_placeholder + 1
        );
        self.args.push(SqlValue::Int(limit));
        self.args.push(SqlValue::Int(offset));
        self.next_placeholder += 2;
        clause
    }
}

fn ilike_fragment(columns: &[&str]) -> String {
    let ors: Vec<String> = columns
        .iter()
        .map(|c| format!("{} ILIKE {}", c, MARKER))
        .collect();
    if ors.len() == 1 {
        ors.join("")
    } else {
        format!("({})", ors.join(" OR "))
    }
}

/// `%term%` with LIKE metacharacters escaped; `None` for blank input.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

pub fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    args: &[SqlValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for arg in args {
        query = match arg.clone() {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Float(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
            SqlValue::IntArray(v) => query.bind(v),
            SqlValue::TextArray(v) => query.bind(v),
        };
    }
    query
}

pub fn bind_query_scalar<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    args: &[SqlValue],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for arg in args {
        query = match arg.clone() {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Float(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
            SqlValue::IntArray(v) => query.bind(v),
            SqlValue::TextArray(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_increase() {
        let mut b = PredicateBuilder::new();
        b.guard("t.deleted = false")
            .eq("t.driver_id", Some(42i64))
            .eq("t.vehicle_id", Some(7i64))
            .range("t.distance_km", Some(1.0), Some(5.0));

        assert_eq!(
            b.fragments(),
            &[
                "t.deleted = false",
                "t.driver_id = $1",
                "t.vehicle_id = $2",
                "t.distance_km >= $3",
                "t.distance_km <= $4",
            ]
        );
        assert_eq!(b.args().len(), 4);
        assert_eq!(b.next_placeholder(), 5);
        assert_eq!(b.filter_count(), 4);
    }

    #[test]
    fn test_absent_values_emit_nothing() {
        let mut b = PredicateBuilder::new();
        b.guard("t.deleted = false")
            .eq::<i64>("t.driver_id", None)
            .contains("t.from_address", None)
            .contains("t.from_address", Some("   "))
            .range::<f64>("t.distance_km", None, None)
            .within::<Vec<i64>>("t.id", None)
            .within_radius("t.from_location", Some(1.0), Some(2.0), None)
            .search(&["t.from_address"], Some(""));

        let compiled = b.build();
        assert_eq!(compiled.clause, "WHERE t.deleted = false");
        assert!(compiled.args.is_empty());
        assert_eq!(compiled.next_placeholder, 1);
        assert_eq!(compiled.filter_count, 0);
    }

    #[test]
    fn test_search_shares_one_placeholder() {
        let mut b = PredicateBuilder::new();
        b.eq("g.driver_id", Some(1i64))
            .search(&["d.name", "v.plate_number", "g.status"], Some("ab"));

        assert_eq!(
            b.fragments()[1],
            "(d.name ILIKE $2 OR v.plate_number ILIKE $2 OR g.status ILIKE $2)"
        );
        assert_eq!(b.args()[1], SqlValue::Text("%ab%".to_string()));
        assert_eq!(b.next_placeholder(), 3);
    }

    #[test]
    fn test_radius_binds_lng_lat_metres() {
        let mut b = PredicateBuilder::starting_at(3);
        b.within_radius("g.coordinates", Some(20.5), Some(-100.25), Some(2.0));

        assert_eq!(
            b.fragments()[0],
            "ST_DWithin(g.coordinates, ST_SetSRID(ST_MakePoint($3, $4), 4326)::geography, $5)"
        );
        assert_eq!(
            b.args(),
            &[
                SqlValue::Float(-100.25),
                SqlValue::Float(20.5),
                SqlValue::Float(2000.0)
            ]
        );
    }

    #[test]
    fn test_membership_and_exclusion() {
        let mut b = PredicateBuilder::new();
        b.within("t.id", Some(vec![1i64, 2]))
            .not_within("t.driver_id", Some(vec![9i64]));

        assert_eq!(b.fragments()[0], "t.id = ANY($1)");
        assert_eq!(
            b.fragments()[1],
            "(t.driver_id IS NULL OR t.driver_id <> ALL($2))"
        );
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern(Some("50%_off\\")), Some("%50\\%\\_off\\\\%".to_string()));
        assert_eq!(like_pattern(Some("  main st ")), Some("%main st%".to_string()));
        assert_eq!(like_pattern(None), None);
    }

    #[test]
    fn test_limit_clause_continues_numbering() {
        let mut b = PredicateBuilder::new();
        b.eq("t.id", Some(1i64));
        let mut compiled = b.build();
        let limit = compiled.limit_clause(50, 100);

        assert_eq!(limit, "LIMIT $2 OFFSET $3");
        assert_eq!(compiled.args.len(), 3);
        assert_eq!(compiled.next_placeholder, 4);
    }

    #[test]
    #[should_panic(expected = "more values than placeholders")]
    fn test_append_predicate_rejects_extra_values() {
        let mut b = PredicateBuilder::new();
        b.append_predicate("t.id = $?", [SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    #[should_panic(expected = "appended after")]
    #[cfg(debug_assertions)]
    fn test_stage_order_is_enforced() {
        let mut b = PredicateBuilder::new();
        b.search(&["t.from_address"], Some("x"))
            .eq("t.id", Some(1i64));
    }
}
