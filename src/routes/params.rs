//! Query-string shapes for the listing endpoints.
//!
//! Every field arrives as a raw string so that malformed values can be
//! normalized or dropped instead of rejecting the whole request.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl Pagination {
    /// Returns `(page, per_page, offset)`.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = match self.page.as_deref().and_then(parse_int_saturating) {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };
        let per_page = match self.per_page.as_deref().and_then(parse_int_saturating) {
            Some(p) => p.clamp(1, MAX_PER_PAGE as i64) as u64,
            None => DEFAULT_PER_PAGE,
        };
        let offset = (page - 1)
            .saturating_mul(per_page)
            .min(i64::MAX as u64);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` (case-insensitive) sorts descending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
    Category,
}

impl ProductSortBy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(ProductSortBy::Name),
            "price" => Some(ProductSortBy::Price),
            "created_at" => Some(ProductSortBy::CreatedAt),
            "updated_at" => Some(ProductSortBy::UpdatedAt),
            "category" => Some(ProductSortBy::Category),
            _ => None,
        }
    }
}

/// Sort key `relevance` has no scoring behind it; it orders by recency.
pub const SORT_RELEVANCE: &str = "relevance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub by: ProductSortBy,
    pub order: SortOrder,
}

impl SortSpec {
    pub const NEWEST_FIRST: SortSpec = SortSpec {
        by: ProductSortBy::CreatedAt,
        order: SortOrder::Desc,
    };

    /// Unknown keys, including `relevance`, fall back to newest first and
    /// ignore the requested order.
    pub fn resolve(sort_by: Option<&str>, sort_order: Option<&str>, default_by: &str) -> Self {
        let by = sort_by.unwrap_or(default_by);
        match ProductSortBy::parse(by) {
            Some(by) => SortSpec {
                by,
                order: SortOrder::parse(sort_order.unwrap_or("desc")),
            },
            None => Self::NEWEST_FIRST,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct ProductQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub created_by: Option<String>,
    pub creator_username: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub include_inactive: Option<String>,
}

/// Typed filters after lenient parsing. `None` means the filter is not applied.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProductFilters {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Kept wide so an id beyond the column's range filters to nothing
    /// instead of being dropped.
    pub created_by: Option<i64>,
    pub creator_username: Option<String>,
}

impl ProductQuery {
    /// Builds the query from decoded `key=value` pairs. A repeated key keeps
    /// its first value; unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = ProductQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.pagination.page,
                "per_page" => &mut query.pagination.per_page,
                "q" => &mut query.q,
                "category" => &mut query.category,
                "min_price" => &mut query.min_price,
                "max_price" => &mut query.max_price,
                "date_from" => &mut query.date_from,
                "date_to" => &mut query.date_to,
                "created_by" => &mut query.created_by,
                "creator_username" => &mut query.creator_username,
                "sort_by" => &mut query.sort_by,
                "sort_order" => &mut query.sort_order,
                "include_inactive" => &mut query.include_inactive,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    pub fn filters(&self) -> ProductFilters {
        ProductFilters {
            q: non_empty(&self.q),
            category: non_empty(&self.category),
            min_price: non_empty(&self.min_price).and_then(|v| parse_price(&v)),
            max_price: non_empty(&self.max_price).and_then(|v| parse_price(&v)),
            date_from: non_empty(&self.date_from).and_then(|v| parse_timestamp(&v)),
            date_to: non_empty(&self.date_to).and_then(|v| parse_timestamp(&v)),
            created_by: non_empty(&self.created_by).and_then(|v| parse_int_saturating(&v)),
            creator_username: non_empty(&self.creator_username),
        }
    }

    /// Only a missing `sort_by` selects the endpoint default; an empty one is
    /// an unknown key like any other.
    pub fn sort(&self, default_by: &str) -> SortSpec {
        SortSpec::resolve(
            self.sort_by.as_deref(),
            self.sort_order.as_deref().filter(|s| !s.is_empty()),
            default_by,
        )
    }

    /// Absent or `true` means include. The admin listing shows inactive rows
    /// either way.
    pub fn include_inactive(&self) -> bool {
        match self.include_inactive.as_deref() {
            None => true,
            Some(v) => v.eq_ignore_ascii_case("true"),
        }
    }
}

/// Never rejects: a query string that cannot be decoded reads as empty.
impl<S> FromRequestParts<S> for ProductQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
            Ok(Query(pairs)) => pairs,
            Err(err) => {
                tracing::debug!(error = %err, "ignoring undecodable query string");
                Vec::new()
            }
        };
        Ok(Self::from_pairs(pairs))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer parse that saturates instead of failing on out-of-range digits.
fn parse_int_saturating(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

/// Accepts RFC 3339, naive ISO-8601 date-times and bare dates. Naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pagination(page: Option<&str>, per_page: Option<&str>) -> Pagination {
        Pagination {
            page: page.map(String::from),
            per_page: per_page.map(String::from),
        }
    }

    #[test]
    fn pagination_defaults() {
        assert_eq!(pagination(None, None).normalize(), (1, 10, 0));
    }

    #[test]
    fn per_page_is_always_clamped() {
        for (raw, expected) in [
            ("0", 1),
            ("-5", 1),
            ("1", 1),
            ("100", 100),
            ("101", 100),
            ("5000", 100),
            ("99999999999999999999999", 100),
            ("-99999999999999999999999", 1),
        ] {
            let (_, per_page, _) = pagination(None, Some(raw)).normalize();
            assert_eq!(per_page, expected, "per_page={raw}");
        }
    }

    #[test]
    fn non_numeric_pagination_falls_back_independently() {
        assert_eq!(pagination(Some("abc"), Some("20")).normalize(), (1, 20, 0));
        assert_eq!(pagination(Some("3"), Some("lots")).normalize(), (3, 10, 20));
        assert_eq!(pagination(Some("1.5"), Some("2.5")).normalize(), (1, 10, 0));
    }

    #[test]
    fn page_below_one_becomes_one() {
        assert_eq!(pagination(Some("0"), None).normalize().0, 1);
        assert_eq!(pagination(Some("-3"), None).normalize().0, 1);
        assert_eq!(pagination(Some(" 2 "), Some("5")).normalize(), (2, 5, 5));
    }

    #[test]
    fn huge_page_does_not_overflow_offset() {
        let (page, _, offset) = pagination(Some("99999999999999999999"), Some("100")).normalize();
        assert_eq!(page, i64::MAX as u64);
        assert_eq!(offset, i64::MAX as u64);
    }

    #[test]
    fn known_sort_keys_respect_order() {
        let spec = SortSpec::resolve(Some("price"), Some("ASC"), "created_at");
        assert_eq!(spec.by, ProductSortBy::Price);
        assert_eq!(spec.order, SortOrder::Asc);

        let spec = SortSpec::resolve(Some("name"), Some("sideways"), "created_at");
        assert_eq!(spec.order, SortOrder::Desc);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_newest_first() {
        assert_eq!(
            SortSpec::resolve(Some("popularity"), Some("asc"), "created_at"),
            SortSpec::NEWEST_FIRST
        );
        assert_eq!(
            SortSpec::resolve(Some("Price"), Some("asc"), "created_at"),
            SortSpec::NEWEST_FIRST
        );
    }

    #[test]
    fn relevance_is_recency() {
        assert_eq!(
            SortSpec::resolve(None, Some("asc"), SORT_RELEVANCE),
            SortSpec::NEWEST_FIRST
        );
        assert_eq!(
            SortSpec::resolve(Some(SORT_RELEVANCE), None, "created_at"),
            SortSpec::NEWEST_FIRST
        );
    }

    #[test]
    fn default_sort_key_honours_requested_order() {
        let spec = SortSpec::resolve(None, Some("asc"), "created_at");
        assert_eq!(spec.by, ProductSortBy::CreatedAt);
        assert_eq!(spec.order, SortOrder::Asc);
    }

    #[test]
    fn malformed_filters_are_dropped() {
        let query = ProductQuery {
            min_price: Some("cheap".into()),
            max_price: Some("NaN".into()),
            date_from: Some("yesterday".into()),
            date_to: Some("2024-13-45".into()),
            created_by: Some("bob".into()),
            q: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(query.filters(), ProductFilters::default());
    }

    #[test]
    fn well_formed_filters_are_parsed() {
        let query = ProductQuery {
            q: Some("Laptop".into()),
            category: Some("elec".into()),
            min_price: Some("100".into()),
            max_price: Some(" 200.5 ".into()),
            date_from: Some("2024-01-02".into()),
            date_to: Some("2024-03-04T05:06:07+02:00".into()),
            created_by: Some("7".into()),
            creator_username: Some("adm".into()),
            ..Default::default()
        };
        let filters = query.filters();
        assert_eq!(filters.q.as_deref(), Some("Laptop"));
        assert_eq!(filters.min_price, Some(100.0));
        assert_eq!(filters.max_price, Some(200.5));
        assert_eq!(
            filters.date_from,
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(
            filters.date_to,
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 3, 6, 7).unwrap())
        );
        assert_eq!(filters.created_by, Some(7));
        assert_eq!(filters.creator_username.as_deref(), Some("adm"));
    }

    #[test]
    fn naive_timestamps_are_utc() {
        assert_eq!(
            parse_timestamp("2024-05-06T07:08:09.250"),
            Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap() + chrono::Duration::milliseconds(250))
        );
        assert_eq!(
            parse_timestamp("2024-05-06 07:08"),
            Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 0).unwrap())
        );
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let query = ProductQuery::from_pairs(pairs(&[
            ("page", "1"),
            ("page", "2"),
            ("sort_by", "price"),
            ("sort_by", "name"),
            ("unknown", "x"),
            ("per_page", "5"),
        ]));
        assert_eq!(query.pagination.normalize(), (1, 5, 0));
        assert_eq!(query.sort_by.as_deref(), Some("price"));
    }

    #[tokio::test]
    async fn extractor_tolerates_duplicates() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/products?page=2&page=3&min_price=10&min_price=abc")
            .body(())
            .unwrap()
            .into_parts();
        let query = ProductQuery::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(query.pagination.page.as_deref(), Some("2"));
        assert_eq!(query.filters().min_price, Some(10.0));
    }

    #[test]
    fn out_of_range_creator_id_is_kept() {
        let query = ProductQuery {
            created_by: Some("99999999999999".into()),
            ..Default::default()
        };
        assert_eq!(query.filters().created_by, Some(99_999_999_999_999));

        let query = ProductQuery {
            created_by: Some("99999999999999999999999".into()),
            ..Default::default()
        };
        assert_eq!(query.filters().created_by, Some(i64::MAX));
    }

    #[test]
    fn empty_sort_key_is_not_the_default() {
        let query = ProductQuery {
            sort_by: Some(String::new()),
            sort_order: Some("asc".into()),
            ..Default::default()
        };
        assert_eq!(query.sort("created_at"), SortSpec::NEWEST_FIRST);

        let query = ProductQuery {
            sort_order: Some("asc".into()),
            ..Default::default()
        };
        assert_eq!(query.sort("created_at").order, SortOrder::Asc);
    }

    #[test]
    fn include_inactive_flag() {
        let mut query = ProductQuery::default();
        assert!(query.include_inactive());
        query.include_inactive = Some("TRUE".into());
        assert!(query.include_inactive());
        query.include_inactive = Some("false".into());
        assert!(!query.include_inactive());
    }
}
