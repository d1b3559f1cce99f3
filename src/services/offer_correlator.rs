use sqlx::PgExecutor;
use tracing::debug;

use crate::db::queries;
use crate::error::Result;
use crate::models::filters::OfferFilter;
use crate::query::builder::bind_query_scalar;
use crate::query::compile::compile_offer_filter;
use crate::query::SqlValue;

/// Outcome of resolving offer-level criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferCorrelation {
    /// No offer criteria were given; the parent query is not restricted.
    Unfiltered,
    Matched(Vec<i64>),
    /// Criteria were given and nothing matched. The parent query must return
    /// empty without running.
    NoMatch,
}

impl OfferCorrelation {
    pub fn from_ids(ids: Vec<i64>) -> Self {
        if ids.is_empty() {
            OfferCorrelation::NoMatch
        } else {
            OfferCorrelation::Matched(ids)
        }
    }

    pub fn ids(&self) -> Option<&[i64]> {
        match self {
            OfferCorrelation::Matched(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, OfferCorrelation::NoMatch)
    }
}

/// Builds the offer-ID lookup, or `None` when no criterion survives
/// compilation. A guard-only lookup would match every live offer.
pub fn offer_id_select(filter: Option<&OfferFilter>) -> Option<(String, Vec<SqlValue>)> {
    let filter = filter.filter(|f| !f.is_empty())?;

    let compiled = compile_offer_filter(filter);
    if compiled.filter_count == 0 {
        return None;
    }
    let sql = format!(
        "SELECT DISTINCT o.id {} {} ORDER BY o.id",
        queries::OFFER_FROM,
        compiled.clause
    );
    Some((sql, compiled.args))
}

/// Resolves `filter` to the distinct IDs of matching, non-deleted offers.
/// The store is only queried when at least one criterion is present.
pub async fn correlate_offers<'e, E>(executor: E, filter: Option<&OfferFilter>) -> Result<OfferCorrelation>
where
    E: PgExecutor<'e>,
{
    let (sql, args) = match offer_id_select(filter) {
        Some(select) => select,
        None => return Ok(OfferCorrelation::Unfiltered),
    };

    let ids: Vec<i64> = bind_query_scalar(sqlx::query_scalar(&sql), &args)
        .fetch_all(executor)
        .await?;

    let correlation = OfferCorrelation::from_ids(ids);
    if correlation.is_no_match() {
        debug!("Offer criteria matched nothing, short-circuiting");
    }
    Ok(correlation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ids_is_no_match() {
        let c = OfferCorrelation::from_ids(vec![]);
        assert!(c.is_no_match());
        assert_eq!(c.ids(), None);
    }

    #[test]
    fn test_matched_ids_pass_through() {
        let c = OfferCorrelation::from_ids(vec![3, 5]);
        assert!(!c.is_no_match());
        assert_eq!(c.ids(), Some([3i64, 5].as_slice()));
    }

    #[test]
    fn test_unfiltered_has_no_ids() {
        assert_eq!(OfferCorrelation::Unfiltered.ids(), None);
        assert!(!OfferCorrelation::Unfiltered.is_no_match());
    }

    #[test]
    fn test_blank_criteria_skip_the_lookup() {
        assert!(offer_id_select(None).is_none());
        assert!(offer_id_select(Some(&OfferFilter::default())).is_none());

        let blank = OfferFilter {
            search: Some("   ".to_string()),
            address: Some("".to_string()),
            ..Default::default()
        };
        assert!(offer_id_select(Some(&blank)).is_none());
    }

    #[test]
    fn test_lookup_binds_each_criterion() {
        let filter = OfferFilter {
            company_id: Some(9),
            search: Some("steel".to_string()),
            ..Default::default()
        };
        let (sql, args) = offer_id_select(Some(&filter)).unwrap();
        assert!(sql.starts_with("SELECT DISTINCT o.id"));
        assert!(sql.contains("o.deleted = false"));
        assert!(sql.contains("$1") && sql.contains("$2"));
        assert_eq!(args.len(), 2);
    }
}
