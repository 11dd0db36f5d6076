use std::fmt;

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw, caller-supplied scoping parameters for a statistics request.
///
/// Every field is independently optional; an absent (or empty) field places
/// no restriction on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageFilter {
    pub organization_id: Option<Uuid>,
    /// `YYYY-MM-DD` or RFC 3339 timestamp, inclusive.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339 timestamp, inclusive.
    pub end_date: Option<String>,
}

impl UsageFilter {
    pub fn for_organization(organization_id: Uuid) -> Self {
        Self {
            organization_id: Some(organization_id),
            ..Default::default()
        }
    }

    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }
}

/// Zone whose calendar days date-only bounds and time-series buckets follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportTimeZone {
    /// The zone of the host running the process (`TZ`, then the system zone).
    #[default]
    Local,
    /// An IANA zone such as `Europe/Berlin`.
    Named(Tz),
}

impl ReportTimeZone {
    pub const UTC: ReportTimeZone = ReportTimeZone::Named(Tz::UTC);

    /// Parse an IANA zone name.
    pub fn parse(name: &str) -> Result<Self, String> {
        name.parse::<Tz>()
            .map(ReportTimeZone::Named)
            .map_err(|e| e.to_string())
    }

    /// Calendar date of `ts` in this zone.
    pub fn date_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            ReportTimeZone::Local => ts.with_timezone(&Local).date_naive(),
            ReportTimeZone::Named(tz) => ts.with_timezone(tz).date_naive(),
        }
    }

    /// First instant of `date` in this zone.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        match self {
            ReportTimeZone::Local => first_instant(&Local, date),
            ReportTimeZone::Named(tz) => first_instant(tz, date),
        }
    }
}

impl fmt::Display for ReportTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportTimeZone::Local => f.write_str("local"),
            ReportTimeZone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Midnight can fall inside a DST gap, in which case the day starts where the
/// gap ends. Gaps are whole quarter hours.
fn first_instant<Z: TimeZone>(zone: &Z, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=12)
        .filter_map(|step| midnight.checked_add_signed(TimeDelta::minutes(15 * step)))
        .find_map(|local| zone.from_local_datetime(&local).earliest())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}

/// Upper bound on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedUntil {
    /// `created_at <= instant`
    Through(DateTime<Utc>),
    /// `created_at < instant` (used for whole-day bounds)
    Before(DateTime<Utc>),
}

impl CreatedUntil {
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            CreatedUntil::Through(ts) | CreatedUntil::Before(ts) => *ts,
        }
    }

    /// SQL comparison operator for this bound.
    pub fn operator(&self) -> &'static str {
        match self {
            CreatedUntil::Through(_) => "<=",
            CreatedUntil::Before(_) => "<",
        }
    }
}

/// Resolved scope shared by every statistics facet.
///
/// Built once per statistics request and rendered by a single predicate
/// builder in each store, so all facets see the same population of logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageScope {
    pub organization_id: Option<Uuid>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    pub created_until: Option<CreatedUntil>,
}

/// Reasons a filter cannot be resolved into a scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("Invalid {field}: '{value}' is not a YYYY-MM-DD date or RFC 3339 timestamp")]
    InvalidDate { field: &'static str, value: String },
}

impl UsageScope {
    /// An unrestricted scope covering every non-deleted log.
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve `filter`, reading date-only bounds as calendar days in `zone`.
    pub fn resolve(filter: &UsageFilter, zone: &ReportTimeZone) -> Result<Self, ScopeError> {
        let created_from = match non_empty(filter.start_date.as_deref()) {
            Some(raw) => Some(match parse_bound(raw, "start_date")? {
                Bound::Day(date) => zone.start_of_day(date),
                Bound::Instant(ts) => ts,
            }),
            None => None,
        };

        let created_until = match non_empty(filter.end_date.as_deref()) {
            Some(raw) => Some(match parse_bound(raw, "end_date")? {
                Bound::Day(date) => match date.checked_add_days(Days::new(1)) {
                    Some(next) => CreatedUntil::Before(zone.start_of_day(next)),
                    None => CreatedUntil::Through(DateTime::<Utc>::MAX_UTC),
                },
                Bound::Instant(ts) => CreatedUntil::Through(ts),
            }),
            None => None,
        };

        Ok(Self {
            organization_id: filter.organization_id,
            created_from,
            created_until,
        })
    }
}

enum Bound {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(raw: &str, field: &'static str) -> Result<Bound, ScopeError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Bound::Day(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Bound::Instant(ts.with_timezone(&Utc)))
        .map_err(|_| ScopeError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}
