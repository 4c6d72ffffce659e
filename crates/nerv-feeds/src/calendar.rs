//! ICS calendar subscriptions merged into one ordered agenda.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use nerv_logging::targets::T_CALENDAR;
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::http::Transport;
use crate::ics::Calendar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSource {
    pub url: String,
    #[serde(default = "CalendarSource::default_name")]
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default = "CalendarSource::default_color")]
    pub color: String,
}

impl CalendarSource {
    fn default_name() -> String {
        "Calendar".to_string()
    }

    fn default_color() -> String {
        "primary".to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    /// `HHMM`, or `ALLD` for all-day events.
    pub time_label: String,
    pub is_all_day: bool,
    pub symbol: Option<String>,
    pub calendar: String,
    pub color: String,
}

pub struct CalendarClient {
    sources: Vec<CalendarSource>,
    transport: Arc<dyn Transport>,
    cache: TtlCache<String, Arc<Calendar>>,
}

impl CalendarClient {
    pub const CACHE_TTL: Duration = Duration::from_secs(15 * 60);
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DISPLAY_DAYS_AHEAD: u32 = 14;

    pub fn new(sources: Vec<CalendarSource>, transport: Arc<dyn Transport>) -> Self {
        Self {
            sources,
            transport,
            cache: TtlCache::new(Self::CACHE_TTL),
        }
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    /// Drops every cached calendar so the next query refetches.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Events overlapping today 00:00 through the end of `today + days_ahead`,
    /// from every source that could be fetched and parsed.
    pub fn get_events(&mut self, now: NaiveDateTime, days_ahead: u32) -> Vec<CalendarEvent> {
        let today = now.date();
        let window_start = today.and_time(NaiveTime::MIN);
        let window_end = today
            .checked_add_days(Days::new(u64::from(days_ahead) + 1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN);

        let clock = Instant::now();
        let Self {
            sources,
            transport,
            cache,
        } = self;

        tracing::debug!(target: T_CALENDAR, sources = sources.len(), "collecting calendar events");
        let mut events = Vec::new();
        for source in sources.iter() {
            let Some(calendar) = load_calendar(&**transport, cache, &source.url, clock) else {
                continue;
            };
            events.extend(
                calendar
                    .between(&Local, window_start, window_end)
                    .into_iter()
                    .map(|occurrence| CalendarEvent {
                        time_label: if occurrence.all_day {
                            "ALLD".to_string()
                        } else {
                            occurrence.start.format("%H%M").to_string()
                        },
                        title: occurrence.summary,
                        start: occurrence.start,
                        is_all_day: occurrence.all_day,
                        symbol: source.symbol.clone(),
                        calendar: source.name.clone(),
                        color: source.color.clone(),
                    }),
            );
        }

        sort_events(&mut events, today);
        tracing::debug!(target: T_CALENDAR, count = events.len(), "calendar events ready");
        events
    }

    /// The first `max` events of the next two weeks.
    pub fn get_events_for_display(&mut self, now: NaiveDateTime, max: usize) -> Vec<CalendarEvent> {
        let mut events = self.get_events(now, Self::DISPLAY_DAYS_AHEAD);
        events.truncate(max);
        events
    }
}

fn load_calendar(
    transport: &dyn Transport,
    cache: &mut TtlCache<String, Arc<Calendar>>,
    url: &str,
    now: Instant,
) -> Option<Arc<Calendar>> {
    let url = normalize_url(url);
    if let Some(calendar) = cache.get(&url, now) {
        return Some(Arc::clone(calendar));
    }

    let bytes = match transport.get(&url, CalendarClient::FETCH_TIMEOUT) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(target: T_CALENDAR, url = %url, error = %err, "calendar fetch failed");
            return None;
        }
    };

    match Calendar::parse(&String::from_utf8_lossy(&bytes)) {
        Ok(calendar) => {
            tracing::info!(target: T_CALENDAR, url = %url, events = calendar.events.len(), "calendar refreshed");
            let calendar = Arc::new(calendar);
            cache.insert(url, Arc::clone(&calendar), now);
            Some(calendar)
        }
        Err(err) => {
            tracing::warn!(target: T_CALENDAR, url = %url, error = %err, "calendar parse failed");
            None
        }
    }
}

/// Subscription links use `webcal://`; the feed itself is served over HTTPS.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    match url.get(..9) {
        Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => format!("https://{}", &url[9..]),
        _ => url.to_string(),
    }
}

/// Today's events first, then by day; all-day before timed within a day.
pub fn sort_events(events: &mut [CalendarEvent], today: NaiveDate) {
    events.sort_by_key(|e| {
        let day = e.start.date();
        (day != today, day, !e.is_all_day, e.start)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, start: NaiveDateTime, all_day: bool) -> CalendarEvent {
        CalendarEvent {
            title: title.to_string(),
            start,
            time_label: String::new(),
            is_all_day: all_day,
            symbol: None,
            calendar: "Work".to_string(),
            color: "primary".to_string(),
        }
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn webcal_becomes_https() {
        assert_eq!(
            normalize_url("webcal://p01-caldav.icloud.com/published/2/abc"),
            "https://p01-caldav.icloud.com/published/2/abc"
        );
        assert_eq!(normalize_url("https://example.com/a.ics"), "https://example.com/a.ics");
        assert_eq!(normalize_url("WEBCAL://x"), "https://x");
    }

    #[test]
    fn ordering_puts_all_day_first_within_a_day() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut events = vec![
            event("tomorrow", at(6, 8), false),
            event("late", at(5, 17), false),
            event("holiday", at(5, 0), true),
            event("early", at(5, 9), false),
            event("trip", at(6, 0), true),
        ];
        sort_events(&mut events, today);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["holiday", "early", "late", "trip", "tomorrow"]);
    }

    #[test]
    fn source_defaults() {
        let source: CalendarSource = serde_json::from_str(r#"{"url":"webcal://x"}"#).unwrap();
        assert_eq!(source.name, "Calendar");
        assert_eq!(source.color, "primary");
        assert_eq!(source.symbol, None);
    }
}
