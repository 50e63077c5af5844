use chrono::{NaiveDate, NaiveDateTime};

use crate::error::DulogError;

/// Optional inclusive time bounds. A missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// Parse bounds written as `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM`
    /// or `YYYY-MM-DD`.
    ///
    /// A date-only end covers that whole day, so `end = "2019-05-03"` keeps
    /// records logged at 23:59:59 on the 3rd.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, DulogError> {
        let start = start.map(|s| parse_bound(s, Bound::Start)).transpose()?;
        let end = end.map(|s| parse_bound(s, Bound::End)).transpose()?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        self.start.map_or(true, |s| *t >= s) && self.end.map_or(true, |e| *t <= e)
    }

    /// True when both bounds are set and `start` is after `end`; such a
    /// window matches nothing.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(input: &str, bound: Bound) -> Result<NaiveDateTime, DulogError> {
    let s = input.trim();

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let t = match bound {
            Bound::Start => date.and_hms_opt(0, 0, 0),
            Bound::End => date.and_hms_opt(23, 59, 59),
        };
        if let Some(t) = t {
            return Ok(t);
        }
    }

    Err(DulogError::ConfigValidation(format!(
        "cannot parse window bound '{input}' (expected YYYY-MM-DD[ HH:MM[:SS]])"
    )))
}
