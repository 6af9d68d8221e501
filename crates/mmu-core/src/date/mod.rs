pub mod catalog;
pub mod fallback;

use chrono::format::{self, ParseResult, Parsed, StrftimeItems};
use chrono::NaiveDateTime;

pub use catalog::{
    CatalogSource, PatternCatalog, PatternRule, PatternSpec, RuleMatch, PATTERN_FILENAME,
};
pub use fallback::{Fallback, FallbackMatch};

/// Which rule produced a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// Index into the active catalog
    Catalog(usize),
    Fallback(Fallback),
}

/// A resolved capture timestamp and the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractResult {
    pub timestamp: NaiveDateTime,
    pub raw: String,
    pub rule: RuleSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Resolved(ExtractResult),
    /// A fallback's six-digit shape matched but the date is impossible.
    InvalidDate { fallback: Fallback, raw: String },
    NoMatch,
}

/// Walk the catalog, then the built-in fallbacks, and return the first
/// timestamp found.
///
/// Only the first catalog rule whose shape matches is consulted: if none of
/// its formats parse, or its capture group took no part in the match, later
/// catalog rules are not tried and extraction moves on to the fallbacks.
pub fn extract(filename: &str, catalog: &PatternCatalog) -> Extraction {
    let matched = catalog
        .rules()
        .iter()
        .enumerate()
        .map(|(idx, rule)| (idx, rule, rule.capture(filename)))
        .find(|(_, _, m)| m.is_match());

    match matched {
        Some((idx, rule, RuleMatch::Group(raw))) => {
            if let Some(timestamp) = parse_with_formats(raw, rule.formats()) {
                return Extraction::Resolved(ExtractResult {
                    timestamp,
                    raw: raw.to_string(),
                    rule: RuleSource::Catalog(idx),
                });
            }
            tracing::debug!(
                "{}: pattern {} matched but no format parsed '{}'",
                filename,
                rule.pattern(),
                raw
            );
        }
        Some((_, rule, _)) => {
            tracing::debug!(
                "{}: pattern {} matched but group {} is empty",
                filename,
                rule.pattern(),
                rule.group()
            );
        }
        None => {}
    }

    for fallback in Fallback::ALL {
        match fallback.apply(filename) {
            Some(FallbackMatch::Date(timestamp, raw)) => {
                return Extraction::Resolved(ExtractResult {
                    timestamp,
                    raw,
                    rule: RuleSource::Fallback(fallback),
                });
            }
            Some(FallbackMatch::InvalidDate(raw)) => {
                return Extraction::InvalidDate { fallback, raw };
            }
            None => {}
        }
    }

    Extraction::NoMatch
}

/// Try each format in order; the first that parses wins.
pub fn parse_with_formats<S: AsRef<str>>(text: &str, formats: &[S]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| parse_timestamp(text, fmt.as_ref()))
}

/// Parse `text` with a strftime-style format. `.%f` accepts a run of
/// fractional-second digits. Fields the format leaves out default like
/// C `strptime`: year 1900, January, day 1, midnight.
pub fn parse_timestamp(text: &str, format: &str) -> Option<NaiveDateTime> {
    let format = format.replace(".%f", "%.f");
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, text, StrftimeItems::new(&format)).ok()?;
    fill_missing_fields(&mut parsed).ok()?;
    parsed.to_naive_datetime_with_offset(0).ok()
}

fn fill_missing_fields(parsed: &mut Parsed) -> ParseResult<()> {
    let has_year = parsed.year().is_some()
        || parsed.year_div_100().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some();
    if !has_year {
        parsed.set_year(1900)?;
    }

    // Ordinal and week dates carry their own month and day
    let has_day_of_year = parsed.ordinal().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some()
        || parsed.isoweek().is_some();
    if !has_day_of_year {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }

    match (parsed.hour_div_12(), parsed.hour_mod_12()) {
        (None, None) => parsed.set_hour(0)?,
        // `%I` without `%p` reads as AM
        (None, Some(_)) => parsed.set_ampm(false)?,
        _ => {}
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    Ok(())
}

/// Render a timestamp the way exiftool expects it: `YYYY:MM:DD HH:MM:SS`.
pub fn exif_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y:%m:%d %H:%M:%S").to_string()
}
