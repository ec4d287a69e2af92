//! Lead listing query: raw query-string parameters, the resolved filter and
//! the cache key derived from both.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string of `GET /api/leads`, kept as raw strings so that malformed
/// values fall back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    pub q: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
    #[serde(rename = "dateRange")]
    pub date_range: Option<String>,
    #[serde(rename = "hasInbound")]
    pub has_inbound: Option<String>,
    #[serde(rename = "hasSales")]
    pub has_sales: Option<String>,
    #[serde(rename = "hasMessages")]
    pub has_messages: Option<String>,
    #[serde(rename = "hasMessage")]
    pub has_message: Option<String>,
    #[serde(rename = "hasAudit")]
    pub has_audit: Option<String>,
}

impl ListingParams {
    /// Builds the parameters from decoded query pairs. A repeated key keeps
    /// its first value; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "q" => &mut params.q,
                "page" => &mut params.page,
                "pageSize" => &mut params.page_size,
                "dateRange" => &mut params.date_range,
                "hasInbound" => &mut params.has_inbound,
                "hasSales" => &mut params.has_sales,
                "hasMessages" => &mut params.has_messages,
                "hasMessage" => &mut params.has_message,
                "hasAudit" => &mut params.has_audit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangePreset {
    OneDay,
    ThreeDays,
    SevenDays,
    FourteenDays,
    ThirtyDays,
    ThisMonth,
    LastMonth,
}

impl DateRangePreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1d" => Some(Self::OneDay),
            "3d" => Some(Self::ThreeDays),
            "7d" => Some(Self::SevenDays),
            "14d" => Some(Self::FourteenDays),
            "30d" => Some(Self::ThirtyDays),
            "thisMonth" => Some(Self::ThisMonth),
            "lastMonth" => Some(Self::LastMonth),
            _ => None,
        }
    }

    fn days(self) -> Option<i64> {
        match self {
            Self::OneDay => Some(1),
            Self::ThreeDays => Some(3),
            Self::SevenDays => Some(7),
            Self::FourteenDays => Some(14),
            Self::ThirtyDays => Some(30),
            Self::ThisMonth | Self::LastMonth => None,
        }
    }

    /// Concrete inclusive bounds for this preset relative to `now` (UTC).
    pub fn resolve(self, now: DateTime<Utc>) -> DateBounds {
        let today = now.date_naive();
        let today_end = end_of_day(today);

        if let Some(days) = self.days() {
            let from = today - Duration::days(days - 1);
            return DateBounds {
                gte: start_of_day(from),
                lte: today_end,
            };
        }

        let month_start = first_of_month(today.year(), today.month());
        match self {
            Self::ThisMonth => DateBounds {
                gte: start_of_day(month_start),
                lte: today_end,
            },
            _ => {
                let (year, month) = if today.month() == 1 {
                    (today.year() - 1, 12)
                } else {
                    (today.year(), today.month() - 1)
                };
                DateBounds {
                    gte: start_of_day(first_of_month(year, month)),
                    lte: start_of_day(month_start) - Duration::milliseconds(1),
                }
            }
        }
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Day 1 exists in every month.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

/// Inclusive `created_at` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub gte: DateTime<Utc>,
    pub lte: DateTime<Utc>,
}

/// Free-text search over the lead's contact columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTerm {
    pub text: String,
    /// Set when the text also looks like a lead id.
    pub match_id: bool,
}

/// Fully resolved predicate; every `Some` field is AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeadFilter {
    pub search: Option<SearchTerm>,
    pub created: Option<DateBounds>,
    #[serde(rename = "hasInbound")]
    pub has_inbound: Option<bool>,
    #[serde(rename = "hasSales")]
    pub has_sales: Option<bool>,
    #[serde(rename = "hasMessages")]
    pub has_messages: Option<bool>,
    #[serde(rename = "hasAudit")]
    pub has_audit: Option<bool>,
}

impl LeadFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub q: String,
    pub page: u32,
    pub page_size: u32,
    pub filter: LeadFilter,
}

#[derive(Serialize)]
struct CacheKeyParts<'a> {
    q: &'a str,
    page: u32,
    #[serde(rename = "pageSize")]
    page_size: u32,
    #[serde(rename = "where")]
    filter: &'a LeadFilter,
}

impl ListingQuery {
    pub fn from_params(params: &ListingParams, now: DateTime<Utc>) -> Self {
        let q = params.q.as_deref().unwrap_or("").trim().to_string();

        let page = match params.page.as_deref().and_then(parse_leading_int) {
            Some(n) if n != 0 => n.clamp(1, i64::from(u32::MAX)) as u32,
            _ => 1,
        };
        let page_size = match params.page_size.as_deref().and_then(parse_leading_int) {
            Some(n) if n != 0 => n.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32,
            _ => DEFAULT_PAGE_SIZE,
        };

        let search = (!q.is_empty()).then(|| SearchTerm {
            text: q.clone(),
            match_id: looks_like_uuid(&q),
        });

        let created = params
            .date_range
            .as_deref()
            .and_then(DateRangePreset::parse)
            .map(|preset| preset.resolve(now));

        let messages = params.has_messages.as_deref().or(params.has_message.as_deref());

        Self {
            q,
            page,
            page_size,
            filter: LeadFilter {
                search,
                created,
                has_inbound: parse_bool(params.has_inbound.as_deref()),
                has_sales: parse_bool(params.has_sales.as_deref()),
                has_messages: parse_bool(messages),
                has_audit: parse_bool(params.has_audit.as_deref()),
            },
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Deterministic digest of everything that affects the listing result.
    pub fn cache_key(&self) -> String {
        let parts = CacheKeyParts {
            q: &self.q,
            page: self.page,
            page_size: self.page_size,
            filter: &self.filter,
        };
        // Plain structs of strings, integers and timestamps always serialize.
        let serialized = serde_json::to_vec(&parts).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&serialized);
        hex::encode(hasher.finalize())
    }
}

/// Only the literals `"true"` and `"false"` count; anything else is ignored.
pub fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Leading-integer parse: optional sign then digits, trailing garbage ignored.
fn parse_leading_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

fn looks_like_uuid(value: &str) -> bool {
    (32..=36).contains(&value.len())
        && value.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> ListingParams {
        let object = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object)).unwrap()
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let p = ListingParams::from_pairs([
            ("page", "2"),
            ("page", "9"),
            ("hasSales", "true"),
            ("utm", "x"),
            ("hasSales", "false"),
        ]);
        assert_eq!(p.page.as_deref(), Some("2"));
        assert_eq!(p.has_sales.as_deref(), Some("true"));
        assert!(p.q.is_none());
    }

    #[rstest]
    #[case(None, 1)]
    #[case(Some("3"), 3)]
    #[case(Some("0"), 1)]
    #[case(Some("-4"), 1)]
    #[case(Some("abc"), 1)]
    #[case(Some("7xyz"), 7)]
    fn page_defaults_and_clamps(#[case] raw: Option<&str>, #[case] expected: u32) {
        let p = ListingParams {
            page: raw.map(str::to_string),
            ..Default::default()
        };
        assert_eq!(ListingQuery::from_params(&p, Utc::now()).page, expected);
    }

    #[rstest]
    #[case(None, 20)]
    #[case(Some("50"), 50)]
    #[case(Some("500"), 100)]
    #[case(Some("0"), 20)]
    #[case(Some("-5"), 1)]
    #[case(Some("nope"), 20)]
    fn page_size_defaults_and_clamps(#[case] raw: Option<&str>, #[case] expected: u32) {
        let p = ListingParams {
            page_size: raw.map(str::to_string),
            ..Default::default()
        };
        assert_eq!(
            ListingQuery::from_params(&p, Utc::now()).page_size,
            expected
        );
    }

    #[rstest]
    #[case(Some("true"), Some(true))]
    #[case(Some("false"), Some(false))]
    #[case(Some("TRUE"), None)]
    #[case(Some("1"), None)]
    #[case(None, None)]
    fn boolean_filters_accept_only_literals(
        #[case] raw: Option<&str>,
        #[case] expected: Option<bool>,
    ) {
        assert_eq!(parse_bool(raw), expected);
    }

    #[test]
    fn has_message_is_an_alias_for_has_messages() {
        let q = ListingQuery::from_params(&params(&[("hasMessage", "true")]), Utc::now());
        assert_eq!(q.filter.has_messages, Some(true));

        let q = ListingQuery::from_params(
            &params(&[("hasMessages", "false"), ("hasMessage", "true")]),
            Utc::now(),
        );
        assert_eq!(q.filter.has_messages, Some(false));
    }

    #[test]
    fn search_text_is_trimmed_and_flags_uuid_like_values() {
        let q = ListingQuery::from_params(&params(&[("q", "  maria ")]), Utc::now());
        assert_eq!(
            q.filter.search,
            Some(SearchTerm {
                text: "maria".into(),
                match_id: false
            })
        );

        let id = "3f1c2a9e-8b7d-4c6e-9f00-123456789abc";
        let q = ListingQuery::from_params(&params(&[("q", id)]), Utc::now());
        assert!(q.filter.search.unwrap().match_id);

        let q = ListingQuery::from_params(&params(&[("q", "   ")]), Utc::now());
        assert!(q.filter.is_empty());
    }

    #[test]
    fn unknown_date_range_is_ignored() {
        let q = ListingQuery::from_params(&params(&[("dateRange", "2d")]), Utc::now());
        assert!(q.filter.created.is_none());
    }

    #[test]
    fn day_presets_include_today() {
        let bounds = DateRangePreset::SevenDays.resolve(at(2025, 3, 10, 15));
        assert_eq!(bounds.gte, Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());
        assert_eq!(
            bounds.lte,
            Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );

        let one = DateRangePreset::OneDay.resolve(at(2025, 3, 10, 15));
        assert_eq!(one.gte, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn this_month_starts_on_the_first() {
        let bounds = DateRangePreset::ThisMonth.resolve(at(2025, 3, 10, 15));
        assert_eq!(bounds.gte, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn last_month_wraps_across_the_year() {
        let bounds = DateRangePreset::LastMonth.resolve(at(2025, 1, 15, 8));
        assert_eq!(bounds.gte, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(
            bounds.lte,
            Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn cache_key_is_stable_and_discriminating() {
        let now = at(2025, 3, 10, 15);
        let a = ListingQuery::from_params(&params(&[("q", "ana"), ("hasSales", "true")]), now);
        let b = ListingQuery::from_params(&params(&[("hasSales", "true"), ("q", " ana")]), now);
        assert_eq!(a.cache_key(), b.cache_key());

        let c = ListingQuery::from_params(&params(&[("q", "ana"), ("hasSales", "false")]), now);
        let d = ListingQuery::from_params(&params(&[("q", "ana"), ("page", "2")]), now);
        assert_ne!(a.cache_key(), c.cache_key());
        assert_ne!(a.cache_key(), d.cache_key());
    }

    #[test]
    fn offset_follows_page_and_size() {
        let q = ListingQuery::from_params(&params(&[("page", "3"), ("pageSize", "15")]), Utc::now());
        assert_eq!(q.offset(), 30);
    }
}
