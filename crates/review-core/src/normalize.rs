//! Raw entry to canonical review mapping.
//!
//! Every canonical field has an ordered chain of extractors; the first one
//! that yields a value wins. Normalization has no side effects, so the same
//! raw entry always produces the same review.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use review_models::{CanonicalReview, RawReviewEntry};
use review_sources::scrape::parse_star_label;

/// Run-level values stamped onto every review
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub app_id: &'a str,
    pub app_name: &'a str,
    pub country: &'a str,
}

type Extractor<T> = fn(&RawReviewEntry) -> Option<T>;

const REVIEW_ID: &[Extractor<String>] = &[review_id_field];
const USER_NAME: &[Extractor<String>] = &[author_field];
const RATING: &[Extractor<u8>] = &[numeric_rating, star_label_rating];
const TITLE: &[Extractor<String>] = &[title_field];
const TEXT: &[Extractor<String>] = &[body_field];
const VERSION: &[Extractor<String>] = &[version_field];
const DATE: &[Extractor<String>] = &[date_string, date_epoch];
const HELPFUL: &[Extractor<u32>] = &[vote_count, helpful_count];
const SOURCE_URL: &[Extractor<String>] = &[entry_link, page_url];

fn first_of<T>(chain: &[Extractor<T>], raw: &RawReviewEntry) -> Option<T> {
    chain.iter().find_map(|extract| extract(raw))
}

/// Map one raw entry to the canonical schema. `None` means the entry carries
/// nothing that identifies a review (no id, author, title or text).
pub fn normalize(raw: &RawReviewEntry, ctx: &NormalizeContext<'_>) -> Option<CanonicalReview> {
    let review_id = first_of(REVIEW_ID, raw);
    let user_name = first_of(USER_NAME, raw);
    let title = first_of(TITLE, raw);
    let text = first_of(TEXT, raw);

    if review_id.is_none() && user_name.is_none() && title.is_none() && text.is_none() {
        return None;
    }

    Some(CanonicalReview {
        review_id,
        app_id: ctx.app_id.to_string(),
        app_name: ctx.app_name.to_string(),
        country: ctx.country.to_string(),
        user_name: user_name.unwrap_or_default(),
        rating: first_of(RATING, raw),
        title: title.unwrap_or_default(),
        text: text.unwrap_or_default(),
        version: first_of(VERSION, raw).unwrap_or_default(),
        date: first_of(DATE, raw),
        helpful_count: first_of(HELPFUL, raw),
        raw_source_url: first_of(SOURCE_URL, raw),
    })
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn review_id_field(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.id),
        RawReviewEntry::Scraped(e) => clean(&e.review_id),
        RawReviewEntry::Internal(e) => clean(&e.review_id),
    }
}

fn author_field(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.author),
        RawReviewEntry::Scraped(e) => clean(&e.user_name),
        RawReviewEntry::Internal(e) => clean(&e.user_name),
    }
}

fn title_field(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.title),
        RawReviewEntry::Scraped(e) => clean(&e.title),
        RawReviewEntry::Internal(_) => None,
    }
}

fn body_field(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.content),
        RawReviewEntry::Scraped(e) => clean(&e.text),
        RawReviewEntry::Internal(e) => clean(&e.text),
    }
}

fn version_field(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.version),
        RawReviewEntry::Scraped(e) => clean(&e.version),
        RawReviewEntry::Internal(_) => None,
    }
}

fn stars(value: f64) -> Option<u8> {
    let value = value.round();
    if (1.0..=5.0).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

/// Rating given as a number by the source
fn numeric_rating(raw: &RawReviewEntry) -> Option<u8> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.rating).and_then(|r| r.parse::<f64>().ok()).and_then(stars),
        RawReviewEntry::Scraped(e) => e.rating.filter(|r| (1..=5).contains(r)),
        RawReviewEntry::Internal(e) => e.rating.filter(|r| (1..=5).contains(r)),
    }
}

/// Rating recovered from the star widget's accessible label
fn star_label_rating(raw: &RawReviewEntry) -> Option<u8> {
    match raw {
        RawReviewEntry::Scraped(e) => e.rating_label.as_deref().and_then(parse_star_label),
        _ => None,
    }
}

fn date_string(raw: &RawReviewEntry) -> Option<String> {
    let value = match raw {
        RawReviewEntry::Feed(e) => e.updated.as_deref(),
        RawReviewEntry::Scraped(e) => e.date.as_deref(),
        RawReviewEntry::Internal(e) => e.date.as_deref(),
    };
    value.and_then(parse_flexible_date)
}

fn date_epoch(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Internal(e) => e.date_epoch.and_then(format_epoch),
        _ => None,
    }
}

fn vote_count(raw: &RawReviewEntry) -> Option<u32> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.vote_count).and_then(|v| v.parse().ok()),
        _ => None,
    }
}

fn helpful_count(raw: &RawReviewEntry) -> Option<u32> {
    match raw {
        RawReviewEntry::Scraped(e) => e.helpful_count,
        _ => None,
    }
}

fn entry_link(raw: &RawReviewEntry) -> Option<String> {
    match raw {
        RawReviewEntry::Feed(e) => clean(&e.link),
        _ => None,
    }
}

fn page_url(raw: &RawReviewEntry) -> Option<String> {
    let url = match raw {
        RawReviewEntry::Feed(e) => &e.page_url,
        RawReviewEntry::Scraped(e) => &e.page_url,
        RawReviewEntry::Internal(e) => &e.endpoint_url,
    };
    let url = url.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"];

/// Parse a free-form date into ISO-8601.
///
/// Zoned inputs keep their offset (`2024-03-05T07:11:12-07:00`); naive inputs
/// come out as `YYYY-MM-DDTHH:MM:SS`. Anything unrecognized yields `None`.
pub fn parse_flexible_date(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.chars().all(|c| c.is_ascii_digit()) {
        // Shorter digit runs are years or day numbers, not timestamps
        if input.len() < 9 {
            return None;
        }
        return input.parse::<i64>().ok().and_then(format_epoch);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false));
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false));
        }
    }

    let normalized = translate_russian_month(input).unwrap_or_else(|| input.trim_end_matches('.').to_string());
    parse_naive(&normalized).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Epoch seconds, or milliseconds when the value is too large to be seconds
fn format_epoch(value: i64) -> Option<String> {
    let seconds = if value > 100_000_000_000 { value / 1000 } else { value };
    if seconds <= 0 {
        return None;
    }
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false))
}

// "мар" must be tried before "ма" (мая / май)
const RUSSIAN_MONTHS: &[(&str, u32)] = &[
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("ма", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
];

/// "15 января 2024 г., 10:30" becomes "15.01.2024 10:30"
fn translate_russian_month(input: &str) -> Option<String> {
    let lowered = input.to_lowercase().replace(',', " ");
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .filter(|t| *t != "г." && *t != "г" && *t != "в")
        .collect();
    if tokens.len() < 3 {
        return None;
    }

    let month = RUSSIAN_MONTHS
        .iter()
        .find(|(stem, _)| tokens[1].starts_with(stem))
        .map(|(_, month)| *month)?;
    let day: u32 = tokens[0].parse().ok()?;
    let year: i32 = tokens[2].trim_end_matches("г.").trim_end_matches('г').parse().ok()?;

    let mut out = format!("{:02}.{:02}.{}", day, month, year);
    if let Some(time) = tokens.get(3) {
        out.push(' ');
        out.push_str(time);
    }
    Some(out)
}
