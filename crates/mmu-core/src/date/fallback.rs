use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static RE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{2})([0-9]{2})([0-9]{2})\s+").unwrap());
static RE_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]{2})([0-9]{2})([0-9]{2})-").unwrap());

/// The two `YYMMDD` prefix rules tried after the catalog. Not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// `YYMMDD` followed by whitespace, e.g. `230501 beach.jpg`
    Space,
    /// `YYMMDD` followed by a dash, e.g. `230501-beach.jpg`
    Dash,
}

/// Outcome of a fallback whose shape matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackMatch {
    /// Midnight of the encoded date, plus its `20YY-MM-DD` rendering.
    Date(NaiveDateTime, String),
    /// Six digits were there but do not form a calendar date.
    InvalidDate(String),
}

impl Fallback {
    pub const ALL: [Fallback; 2] = [Fallback::Space, Fallback::Dash];

    pub fn label(self) -> &'static str {
        match self {
            Fallback::Space => "YYMMDD<space>",
            Fallback::Dash => "YYMMDD-",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            Fallback::Space => &RE_SPACE,
            Fallback::Dash => &RE_DASH,
        }
    }

    /// `None` if the prefix shape does not match at all.
    pub fn apply(self, filename: &str) -> Option<FallbackMatch> {
        let caps = self.regex().captures(filename)?;
        let (yy, mm, dd) = (&caps[1], &caps[2], &caps[3]);
        let raw = format!("20{}-{}-{}", yy, mm, dd);

        // The regex guarantees two ASCII digits per field
        let year = 2000 + yy.parse::<i32>().unwrap_or(0);
        let month = mm.parse::<u32>().unwrap_or(0);
        let day = dd.parse::<u32>().unwrap_or(0);

        Some(
            match NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(0, 0, 0)) {
                Some(dt) => FallbackMatch::Date(dt, raw),
                None => FallbackMatch::InvalidDate(raw),
            },
        )
    }
}
