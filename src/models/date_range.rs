use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};

/// Inclusive `created_at` filter. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Parse query-string bounds. Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS`
    /// (UTC) and RFC 3339. A date-only upper bound covers the whole day.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = from
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_bound(s, Bound::Start))
            .transpose()?;
        let to = to
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_bound(s, Bound::End))
            .transpose()?;

        if let (Some(start), Some(end)) = (from, to) {
            if start > end {
                return Err(AppError::Validation(
                    "from date cannot be after to date".to_string(),
                ));
            }
        }

        Ok(Self { from, to })
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| *instant >= from) && self.to.map_or(true, |to| *instant <= to)
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", raw)))?;

    let naive = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_milli_opt(23, 59, 59, 999),
    }
    .ok_or_else(|| AppError::Validation(format!("Invalid date: {}", raw)))?;

    Ok(naive.and_utc())
}
