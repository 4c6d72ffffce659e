//! Minimal iCalendar reader: enough of RFC 5545 to list the VEVENTs of a
//! published calendar and expand them over a time window.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use nerv_logging::targets::T_CALENDAR;
use thiserror::Error;

use crate::recurrence::RRule;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IcsError {
    #[error("no VCALENDAR component found")]
    NotACalendar,

    #[error("unterminated {0} component")]
    Unterminated(String),

    #[error("{property}: invalid value '{value}'")]
    InvalidValue { property: String, value: String },
}

/// A DTSTART/DTEND style value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    /// Floating or TZID-qualified time, read as local wall-clock time.
    DateTime(NaiveDateTime),
    /// `Z` suffixed time.
    Utc(NaiveDateTime),
}

impl EventTime {
    /// The value in its own frame: UTC for `Utc`, wall-clock otherwise.
    pub fn naive(&self) -> NaiveDateTime {
        match *self {
            EventTime::Date(day) => day.and_time(NaiveTime::MIN),
            EventTime::DateTime(at) | EventTime::Utc(at) => at,
        }
    }

    /// Wall-clock time in `tz`.
    pub fn local<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDateTime {
        match *self {
            EventTime::Utc(at) => tz.from_utc_datetime(&at).naive_local(),
            _ => self.naive(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    pub fn is_utc(&self) -> bool {
        matches!(self, EventTime::Utc(_))
    }

    /// Re-expresses the value in the UTC frame or the wall-clock frame.
    fn in_frame<Tz: TimeZone>(self, utc_frame: bool, tz: &Tz) -> Self {
        match (self, utc_frame) {
            (EventTime::Utc(at), false) => EventTime::DateTime(tz.from_utc_datetime(&at).naive_local()),
            (EventTime::DateTime(at), true) => tz
                .from_local_datetime(&at)
                .earliest()
                .map_or(self, |local| EventTime::Utc(local.naive_utc())),
            _ => self,
        }
    }

    fn matches(&self, slot: &Slot) -> bool {
        match *self {
            EventTime::Date(day) => slot.local.date() == day,
            EventTime::DateTime(at) => slot.local == at,
            EventTime::Utc(at) => slot.utc == Some(at),
        }
    }
}

/// One generated start, as local wall-clock time and, when the local time
/// exists, as UTC.
struct Slot {
    local: NaiveDateTime,
    utc: Option<NaiveDateTime>,
}

impl Slot {
    fn new<Tz: TimeZone>(at: NaiveDateTime, utc_frame: bool, tz: &Tz) -> Self {
        if utc_frame {
            Self {
                local: tz.from_utc_datetime(&at).naive_local(),
                utc: Some(at),
            }
        } else {
            Self {
                local: at,
                utc: tz.from_local_datetime(&at).earliest().map(|local| local.naive_utc()),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub params: Vec<(String, String)>,
    pub value: String,
}

impl Property {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn is_date_valued(&self) -> bool {
        self.param("VALUE")
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub duration: Option<Duration>,
    pub rrule: Option<RRule>,
    pub exdates: Vec<EventTime>,
    pub recurrence_id: Option<EventTime>,
    pub cancelled: bool,
}

impl VEvent {
    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }

    /// Length of one instance. All-day events without an end last one day.
    pub fn length<Tz: TimeZone>(&self, tz: &Tz) -> Duration {
        if let Some(end) = self.end {
            let length = if end.is_utc() == self.start.is_utc() {
                end.naive() - self.start.naive()
            } else {
                end.local(tz) - self.start.local(tz)
            };
            if length >= Duration::zero() {
                return length;
            }
        }
        if let Some(duration) = self.duration {
            if duration >= Duration::zero() {
                return duration;
            }
        }
        if self.is_all_day() {
            Duration::days(1)
        } else {
            Duration::zero()
        }
    }

    fn is_excluded(&self, slot: &Slot) -> bool {
        self.exdates.iter().any(|ex| ex.matches(slot))
    }
}

/// One concrete instance of an event inside a query window.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub uid: Option<String>,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub all_day: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calendar {
    pub events: Vec<VEvent>,
}

impl Calendar {
    /// Parses calendar text. UTC (`Z`) times stay in UTC until a query
    /// converts them; TZID and floating times are local wall-clock time.
    pub fn parse(text: &str) -> Result<Self, IcsError> {
        let lines = unfold(text);
        if !lines
            .iter()
            .any(|l| l.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
        {
            return Err(IcsError::NotACalendar);
        }

        let mut events = Vec::new();
        let mut current: Option<Vec<Property>> = None;
        let mut nested = 0usize;

        for line in &lines {
            let Some(prop) = parse_property(line) else {
                continue;
            };
            let in_event = current.is_some();
            let is_vevent = prop.value.trim().eq_ignore_ascii_case("VEVENT");
            if prop.name == "BEGIN" {
                if in_event {
                    nested += 1;
                } else if is_vevent {
                    current = Some(Vec::new());
                    nested = 0;
                }
            } else if prop.name == "END" && in_event {
                if nested > 0 {
                    nested -= 1;
                } else if is_vevent {
                    let props = current.take().unwrap_or_default();
                    match build_event(&props) {
                        Ok(Some(event)) => events.push(event),
                        Ok(None) => {}
                        Err(err) => {
                            tracing::debug!(target: T_CALENDAR, error = %err, "skipping malformed event")
                        }
                    }
                }
            } else if nested == 0 {
                if let Some(props) = current.as_mut() {
                    props.push(prop);
                }
            }
        }

        if current.is_some() {
            return Err(IcsError::Unterminated("VEVENT".to_string()));
        }
        Ok(Self { events })
    }

    /// Every instance overlapping `[window_start, window_end)`, ordered by
    /// start, in wall-clock time of `tz`. Rules anchored in UTC are expanded
    /// in UTC so instances keep their absolute time across DST changes.
    pub fn between<Tz: TimeZone>(
        &self,
        tz: &Tz,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Vec<Occurrence> {
        let overrides: Vec<(&str, EventTime)> = self
            .events
            .iter()
            .filter_map(|e| Some((e.uid.as_deref()?, e.recurrence_id?)))
            .collect();

        let mut out = Vec::new();
        for event in self.events.iter().filter(|e| !e.cancelled) {
            let length = event.length(tz);
            let utc_frame = event.start.is_utc();
            let starts = match (&event.rrule, event.recurrence_id) {
                (Some(rule), None) => {
                    // UTC offsets stay under a day.
                    let horizon = if utc_frame {
                        window_end
                            .checked_add_signed(Duration::days(1))
                            .unwrap_or(window_end)
                    } else {
                        window_end
                    };
                    let until = rule.until.map(|u| u.in_frame(utc_frame, tz));
                    rule.expand_until(event.start.naive(), horizon, until)
                }
                _ => vec![event.start.naive()],
            };

            for at in starts {
                let slot = Slot::new(at, utc_frame, tz);
                if event.recurrence_id.is_none() {
                    if event.is_excluded(&slot) {
                        continue;
                    }
                    if let Some(uid) = event.uid.as_deref() {
                        let replaced = overrides
                            .iter()
                            .any(|(other, rid)| *other == uid && rid.matches(&slot));
                        if event.rrule.is_some() && replaced {
                            continue;
                        }
                    }
                }
                let start = slot.local;
                let end = start + length;
                if overlaps(start, end, window_start, window_end) {
                    out.push(Occurrence {
                        uid: event.uid.clone(),
                        summary: event.summary.clone(),
                        start,
                        end,
                        all_day: event.is_all_day(),
                    });
                }
            }
        }
        out.sort_by_key(|o| o.start);
        out
    }
}

fn overlaps(start: NaiveDateTime, end: NaiveDateTime, from: NaiveDateTime, to: NaiveDateTime) -> bool {
    if start >= to {
        return false;
    }
    if end == start {
        return start >= from;
    }
    end > from
}

fn build_event(props: &[Property]) -> Result<Option<VEvent>, IcsError> {
    let find = |name: &str| props.iter().find(|p| p.name == name);
    let time_of = |prop: &Property| {
        parse_time(&prop.value, prop.is_date_valued()).ok_or_else(|| IcsError::InvalidValue {
            property: prop.name.clone(),
            value: prop.value.clone(),
        })
    };

    let Some(dtstart) = find("DTSTART") else {
        return Ok(None);
    };
    let start = time_of(dtstart)?;
    let end = find("DTEND").map(time_of).transpose()?;
    let duration = find("DURATION").and_then(|p| parse_duration(&p.value));
    let recurrence_id = find("RECURRENCE-ID").map(time_of).transpose()?;

    let rrule = match find("RRULE") {
        Some(p) => match RRule::parse(&p.value) {
            Ok(rule) => Some(rule),
            Err(err) => {
                tracing::warn!(target: T_CALENDAR, error = %err, "ignoring unsupported recurrence rule");
                None
            }
        },
        None => None,
    };

    let mut exdates = Vec::new();
    for prop in props.iter().filter(|p| p.name == "EXDATE") {
        for value in prop.value.split(',').filter(|v| !v.trim().is_empty()) {
            if let Some(t) = parse_time(value, prop.is_date_valued()) {
                exdates.push(t);
            }
        }
    }

    let summary = find("SUMMARY")
        .map(|p| unescape(&p.value))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let cancelled = find("STATUS").is_some_and(|p| p.value.trim().eq_ignore_ascii_case("CANCELLED"));

    Ok(Some(VEvent {
        uid: find("UID").map(|p| p.value.trim().to_string()),
        summary,
        start,
        end,
        duration,
        rrule,
        exdates,
        recurrence_id,
        cancelled,
    }))
}

/// Joins folded content lines (continuations start with a space or tab).
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix(|c: char| c == ' ' || c == '\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            lines.push(raw.to_string());
        }
    }
    lines
}

/// Splits `NAME;PARAM=V:VALUE`. Colons and semicolons inside quoted
/// parameter values are literal.
pub fn parse_property(line: &str) -> Option<Property> {
    let mut in_quotes = false;
    let mut colon = None;
    let mut segments = Vec::new();
    let mut seg_start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&line[seg_start..i]);
                seg_start = i + 1;
            }
            ':' if !in_quotes => {
                colon = Some(i);
                break;
            }
            _ => {}
        }
    }
    let colon = colon?;
    segments.push(&line[seg_start..colon]);

    let mut segments = segments.into_iter();
    let name = segments.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }
    let params = segments
        .filter_map(|seg| {
            let (key, value) = seg.split_once('=')?;
            Some((key.trim().to_ascii_uppercase(), value.trim().trim_matches('"').to_string()))
        })
        .collect();

    Some(Property {
        name,
        params,
        value: line[colon + 1..].to_string(),
    })
}

pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parses a DATE or DATE-TIME value. A trailing `Z` marks UTC.
pub(crate) fn parse_time(value: &str, is_date: bool) -> Option<EventTime> {
    let value = value.trim();
    if is_date || value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(EventTime::Date);
    }
    if let Some(utc) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(EventTime::Utc);
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .ok()
        .map(EventTime::DateTime)
}

/// Parses an RFC 5545 DURATION such as `PT1H30M`, `P1D` or `-P1W`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'-' => (-1, &value[1..]),
        b'+' => (1, &value[1..]),
        _ => (1, value),
    };
    let rest = rest.strip_prefix('P')?;

    let mut total = 0i64;
    let mut digits = String::new();
    let mut in_time = false;
    let mut seen = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' => in_time = true,
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                seen = true;
                total += n * match (c, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
            }
            _ => return None,
        }
    }
    (seen && digits.is_empty()).then(|| Duration::seconds(sign * total))
}
