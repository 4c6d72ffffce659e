//! RRULE expansion for the subset of RFC 5545 the calendar feeds use:
//! DAILY/WEEKLY/MONTHLY/YEARLY with INTERVAL, COUNT, UNTIL, BYDAY,
//! BYMONTHDAY and BYMONTH. Weeks start on Monday.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};

use crate::ics::{parse_time, EventTime, IcsError};

/// Upper bound on expanded periods per rule; keeps a runaway daily rule from
/// an old DTSTART bounded.
const MAX_PERIODS: u32 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// One BYDAY entry, e.g. `MO`, `2TU` or `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByDay {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RRule {
    pub freq: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<EventTime>,
    pub by_day: Vec<ByDay>,
    pub by_month_day: Vec<i32>,
    pub by_month: Vec<u32>,
}

impl RRule {
    /// Parses an RRULE value. A `Z` suffixed `UNTIL` is kept in UTC.
    pub fn parse(value: &str) -> Result<Self, IcsError> {
        let invalid = || IcsError::InvalidValue {
            property: "RRULE".to_string(),
            value: value.to_string(),
        };

        let mut freq = None;
        let mut rule = RRule {
            freq: Frequency::Daily,
            interval: 1,
            count: None,
            until: None,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
        };

        for part in value.split(';').filter(|p| !p.is_empty()) {
            let (key, val) = part.split_once('=').ok_or_else(invalid)?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match val.trim().to_ascii_uppercase().as_str() {
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        "YEARLY" => Frequency::Yearly,
                        _ => return Err(invalid()),
                    })
                }
                "INTERVAL" => {
                    rule.interval = val.trim().parse().map_err(|_| invalid())?;
                    if rule.interval == 0 {
                        return Err(invalid());
                    }
                }
                "COUNT" => rule.count = Some(val.trim().parse().map_err(|_| invalid())?),
                "UNTIL" => rule.until = Some(parse_time(val, false).ok_or_else(invalid)?),
                "BYDAY" => {
                    rule.by_day = val
                        .split(',')
                        .map(parse_by_day)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(invalid)?
                }
                "BYMONTHDAY" => {
                    rule.by_month_day = val
                        .split(',')
                        .map(|d| d.trim().parse::<i32>().ok().filter(|d| *d != 0 && d.abs() <= 31))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(invalid)?
                }
                "BYMONTH" => {
                    rule.by_month = val
                        .split(',')
                        .map(|m| m.trim().parse::<u32>().ok().filter(|m| (1..=12).contains(m)))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(invalid)?
                }
                // WKST and the remaining BY* parts are not used by the feeds we read.
                _ => {}
            }
        }

        rule.freq = freq.ok_or_else(invalid)?;
        Ok(rule)
    }

    /// Start times of every instance beginning before `horizon`, in order.
    /// DTSTART is always the first instance. `UNTIL` is compared as written.
    pub fn expand(&self, dtstart: NaiveDateTime, horizon: NaiveDateTime) -> Vec<NaiveDateTime> {
        self.expand_until(dtstart, horizon, self.until)
    }

    /// Like [`RRule::expand`], with `until` already expressed in the same
    /// frame as `dtstart`.
    pub fn expand_until(
        &self,
        dtstart: NaiveDateTime,
        horizon: NaiveDateTime,
        until: Option<EventTime>,
    ) -> Vec<NaiveDateTime> {
        let mut out = Vec::new();
        if dtstart >= horizon || is_past(until, dtstart) || self.count == Some(0) {
            return out;
        }
        out.push(dtstart);

        for period in 0..MAX_PERIODS {
            let Some(dates) = self.period_dates(dtstart.date(), period) else {
                break;
            };
            for date in dates {
                let at = date.and_time(dtstart.time());
                if at <= dtstart {
                    continue;
                }
                if at >= horizon || is_past(until, at) {
                    return out;
                }
                if self.count.is_some_and(|count| out.len() as u32 >= count) {
                    return out;
                }
                out.push(at);
            }
        }
        out
    }

    /// Candidate dates of the `period`-th interval, sorted. `None` once the
    /// calendar arithmetic overflows.
    fn period_dates(&self, start: NaiveDate, period: u32) -> Option<Vec<NaiveDate>> {
        let step = period.checked_mul(self.interval)?;
        let mut dates = match self.freq {
            Frequency::Daily => {
                let day = start.checked_add_days(Days::new(u64::from(step)))?;
                if self.by_day.is_empty() || self.matches_weekday(day) {
                    vec![day]
                } else {
                    Vec::new()
                }
            }
            Frequency::Weekly => {
                let anchor = start.checked_add_days(Days::new(u64::from(step) * 7))?;
                if self.by_day.is_empty() {
                    vec![anchor]
                } else {
                    let offset = u64::from(anchor.weekday().num_days_from_monday());
                    let monday = anchor.checked_sub_days(Days::new(offset))?;
                    (0..7)
                        .filter_map(|i| monday.checked_add_days(Days::new(i)))
                        .filter(|d| self.matches_weekday(*d))
                        .collect()
                }
            }
            Frequency::Monthly => {
                let (year, month) = add_months(start.year(), start.month(), step)?;
                self.dates_in_month(year, month, start.day())
            }
            Frequency::Yearly => {
                let year = start.year().checked_add(i32::try_from(step).ok()?)?;
                self.dates_in_year(year, start)
            }
        };

        // BYMONTHDAY and BYMONTH narrow the daily and weekly sets; monthly and
        // yearly sets are generated from them already.
        if matches!(self.freq, Frequency::Daily | Frequency::Weekly) && !self.by_month_day.is_empty() {
            dates.retain(|d| self.matches_month_day(*d));
        }
        if !self.by_month.is_empty() {
            dates.retain(|d| self.by_month.contains(&d.month()));
        }
        dates.sort();
        dates.dedup();
        Some(dates)
    }

    /// BYMONTH picks the months; without it BYMONTHDAY spans every month and
    /// BYDAY spans the whole year, with ordinals counted from the year's ends.
    fn dates_in_year(&self, year: i32, start: NaiveDate) -> Vec<NaiveDate> {
        if !self.by_month.is_empty() {
            return self
                .by_month
                .iter()
                .flat_map(|&month| self.dates_in_month(year, month, start.day()))
                .collect();
        }
        if !self.by_month_day.is_empty() {
            return (1..=12)
                .flat_map(|month| self.dates_in_month(year, month, start.day()))
                .collect();
        }
        if !self.by_day.is_empty() {
            let (Some(first), Some(next)) = (
                NaiveDate::from_ymd_opt(year, 1, 1),
                year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
            ) else {
                return Vec::new();
            };
            let days: Vec<NaiveDate> = first.iter_days().take_while(|d| *d < next).collect();
            return self.by_day.iter().flat_map(|entry| pick(&days, entry)).collect();
        }
        NaiveDate::from_ymd_opt(year, start.month(), start.day())
            .into_iter()
            .collect()
    }

    fn matches_weekday(&self, date: NaiveDate) -> bool {
        self.by_day.iter().any(|b| b.weekday == date.weekday())
    }

    fn matches_month_day(&self, date: NaiveDate) -> bool {
        let Some(len) = days_in_month(date.year(), date.month()) else {
            return false;
        };
        self.by_month_day
            .iter()
            .any(|&d| resolve_month_day(d, len) == Some(date.day()))
    }

    fn dates_in_month(&self, year: i32, month: u32, default_day: u32) -> Vec<NaiveDate> {
        let Some(len) = days_in_month(year, month) else {
            return Vec::new();
        };

        if !self.by_month_day.is_empty() {
            return self
                .by_month_day
                .iter()
                .filter_map(|&d| resolve_month_day(d, len))
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .filter(|d| self.by_day.is_empty() || self.matches_weekday(*d))
                .collect();
        }

        if !self.by_day.is_empty() {
            let days: Vec<NaiveDate> = (1..=len)
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .collect();
            return self.by_day.iter().flat_map(|entry| pick(&days, entry)).collect();
        }

        NaiveDate::from_ymd_opt(year, month, default_day)
            .into_iter()
            .collect()
    }
}

fn is_past(until: Option<EventTime>, at: NaiveDateTime) -> bool {
    match until {
        Some(EventTime::Date(day)) => at.date() > day,
        Some(EventTime::DateTime(limit) | EventTime::Utc(limit)) => at > limit,
        None => false,
    }
}

/// Day number for a BYMONTHDAY entry; negative entries count from the end.
fn resolve_month_day(entry: i32, len: u32) -> Option<u32> {
    let day = if entry > 0 { entry } else { len as i32 + entry + 1 };
    u32::try_from(day).ok().filter(|day| (1..=len).contains(day))
}

/// The days in `days` falling on `entry`'s weekday, narrowed to the n-th
/// (or n-th from last) when an ordinal is given.
fn pick(days: &[NaiveDate], entry: &ByDay) -> Vec<NaiveDate> {
    let matching: Vec<NaiveDate> = days
        .iter()
        .copied()
        .filter(|d| d.weekday() == entry.weekday)
        .collect();
    let index = match entry.ordinal {
        None => return matching,
        Some(n) if n > 0 => Some(n as usize - 1),
        Some(n) => usize::try_from(matching.len() as i32 + n).ok(),
    };
    index
        .and_then(|i| matching.get(i).copied())
        .into_iter()
        .collect()
}

fn parse_by_day(raw: &str) -> Option<ByDay> {
    let raw = raw.trim();
    if raw.len() < 2 || !raw.is_char_boundary(raw.len() - 2) {
        return None;
    }
    let (ordinal, code) = raw.split_at(raw.len() - 2);
    let weekday = match code.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    };
    let ordinal = if ordinal.is_empty() {
        None
    } else {
        let n: i32 = ordinal.trim_start_matches('+').parse().ok()?;
        if n == 0 || n.abs() > 53 {
            return None;
        }
        Some(n)
    };
    Some(ByDay { ordinal, weekday })
}

fn add_months(year: i32, month: u32, step: u32) -> Option<(i32, u32)> {
    let total = i64::from(year) * 12 + i64::from(month - 1) + i64::from(step);
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    Some((year, total.rem_euclid(12) as u32 + 1))
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = add_months(year, month, 1)?;
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some(next.signed_duration_since(first).num_days() as u32)
}
