//! Task list backed by a Notion database query.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use nerv_logging::targets::T_NOTION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::TtlCache;
use crate::error::Result;
use crate::http::Transport;

pub const BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_id: String,
}

impl NotionConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.database_id.trim().is_empty()
    }
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_key", &"<redacted>")
            .field("database_id", &self.database_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Todo {
    pub title: String,
    pub done: bool,
    pub due: Option<NaiveDateTime>,
    pub tag: String,
    pub is_overdue: bool,
    pub status: String,
}

pub struct NotionClient {
    config: NotionConfig,
    transport: Arc<dyn Transport>,
    cache: TtlCache<String, Vec<Todo>>,
    last_updated: Option<NaiveDateTime>,
}

impl NotionClient {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
    pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_PAGES: usize = 10;

    pub fn new(config: NotionConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            cache: TtlCache::new(Self::DEFAULT_TTL),
            last_updated: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    /// Local time of the last successful query.
    pub fn last_updated(&self) -> Option<NaiveDateTime> {
        self.last_updated
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn query_url(&self) -> String {
        format!("{BASE_URL}/databases/{}/query", self.config.database_id.trim())
    }

    /// Runs the database query, following `next_cursor` for up to
    /// [`Self::MAX_PAGES`] pages.
    pub fn fetch_todos(&self, today: NaiveDate, include_done: bool) -> Result<Vec<Todo>> {
        let url = self.query_url();
        let headers = [
            ("Authorization", format!("Bearer {}", self.config.api_key.trim())),
            ("Notion-Version", NOTION_VERSION.to_string()),
        ];

        let mut todos = Vec::new();
        let mut cursor: Option<String> = None;
        for page in 0..Self::MAX_PAGES {
            let body = query_body(include_done, cursor.as_deref());
            let data = self
                .transport
                .post_json(&url, &headers, &body, Self::QUERY_TIMEOUT)?;
            todos.extend(parse_results(&data, today, &Local));

            let has_more = data.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = data
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
            if page + 1 == Self::MAX_PAGES {
                tracing::warn!(target: T_NOTION, pages = Self::MAX_PAGES, "task query truncated");
            }
        }
        Ok(todos)
    }

    /// Open tasks due today, overdue, or undated, in display order. Served
    /// from cache while fresh; a failed query is logged and yields nothing.
    pub fn get_todos_for_display(&mut self, now: NaiveDateTime) -> Vec<Todo> {
        let key = self.config.database_id.clone();
        let clock = Instant::now();
        if let Some(todos) = self.cache.get(&key, clock) {
            return todos.clone();
        }

        match self.fetch_todos(now.date(), false) {
            Ok(todos) => {
                let todos = select_for_display(todos, now.date());
                tracing::info!(target: T_NOTION, count = todos.len(), "tasks refreshed");
                self.cache.insert(key, todos.clone(), clock);
                self.last_updated = Some(now);
                todos
            }
            Err(err) => {
                tracing::warn!(target: T_NOTION, error = %err, "task query failed");
                Vec::new()
            }
        }
    }
}

pub fn query_body(include_done: bool, cursor: Option<&str>) -> Value {
    let mut body = json!({
        "sorts": [{ "property": "Due date", "direction": "ascending" }],
        "page_size": 100,
    });
    if !include_done {
        body["filter"] = json!({
            "property": "Status",
            "status": { "does_not_equal": "Done" },
        });
    }
    if let Some(cursor) = cursor {
        body["start_cursor"] = Value::String(cursor.to_string());
    }
    body
}

/// Converts the `results` of a query response into tasks.
pub fn parse_results<Tz: TimeZone>(data: &Value, today: NaiveDate, tz: &Tz) -> Vec<Todo> {
    let Some(results) = data.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .map(|result| {
            let props = &result["properties"];
            let typed = |name: &str, kind: &str| {
                let prop = &props[name];
                (prop["type"].as_str() == Some(kind)).then(|| &prop[kind])
            };

            let title = typed("Name", "title")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p["plain_text"].as_str())
                        .collect::<String>()
                })
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());

            let status = typed("Status", "status")
                .and_then(|s| s["name"].as_str())
                .unwrap_or_default()
                .to_string();
            let done = status == "Done";

            let due = typed("Due date", "date")
                .and_then(|d| d["start"].as_str())
                .and_then(|start| parse_due(start, tz));

            let tag = typed("Tag", "multi_select")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(|t| t["name"].as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();

            let is_overdue = !done && due.is_some_and(|d| d.date() < today);

            Todo {
                title,
                done,
                due,
                tag,
                is_overdue,
                status,
            }
        })
        .collect()
}

/// Notion dates are either a bare `YYYY-MM-DD` or an ISO 8601 timestamp.
/// Offsets are converted into `tz`; bare dates land at midnight.
pub fn parse_due<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(tz).naive_local());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Keeps undated tasks and those due today or earlier; overdue first (by
/// due date), then dated, then undated.
pub fn select_for_display(todos: Vec<Todo>, today: NaiveDate) -> Vec<Todo> {
    let mut keep: Vec<Todo> = todos
        .into_iter()
        .filter(|t| t.due.map_or(true, |d| d.date() <= today))
        .collect();
    keep.sort_by_key(|t| {
        let rank = if t.is_overdue {
            0
        } else if t.due.is_some() {
            1
        } else {
            2
        };
        (rank, t.due.unwrap_or(NaiveDateTime::MAX))
    });
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn todo(title: &str, due: Option<NaiveDate>, today: NaiveDate) -> Todo {
        let due = due.map(|d| d.and_time(NaiveTime::MIN));
        Todo {
            title: title.to_string(),
            done: false,
            due,
            tag: String::new(),
            is_overdue: due.is_some_and(|d| d.date() < today),
            status: "Not done".to_string(),
        }
    }

    #[test]
    fn due_date_formats() {
        assert_eq!(parse_due("2024-03-05", &Utc), Some(day(3, 5).and_hms_opt(0, 0, 0).unwrap()));
        let pst = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(
            parse_due("2024-03-05T17:00:00.000Z", &pst),
            Some(day(3, 5).and_hms_opt(9, 0, 0).unwrap())
        );
        assert_eq!(
            parse_due("2024-03-05T10:00:00.000+02:00", &Utc),
            Some(day(3, 5).and_hms_opt(8, 0, 0).unwrap())
        );
        assert_eq!(parse_due("next tuesday", &Utc), None);
    }

    #[test]
    fn parses_query_results() {
        let data = json!({
            "results": [
                {
                    "properties": {
                        "Name": { "type": "title", "title": [{ "plain_text": "Pay " }, { "plain_text": "rent" }] },
                        "Status": { "type": "status", "status": { "name": "Not done" } },
                        "Due date": { "type": "date", "date": { "start": "2024-03-01" } },
                        "Tag": { "type": "multi_select", "multi_select": [{ "name": "home" }, { "name": "money" }] }
                    }
                },
                {
                    "properties": {
                        "Name": { "type": "rich_text", "rich_text": [] },
                        "Status": { "type": "status", "status": { "name": "Done" } },
                        "Due date": { "type": "date", "date": { "start": "2024-02-01" } }
                    }
                },
                { "properties": {} }
            ]
        });
        let todos = parse_results(&data, day(3, 5), &Utc);
        assert_eq!(todos.len(), 3);
        assert_eq!(todos[0].title, "Pay rent");
        assert_eq!(todos[0].tag, "home, money");
        assert!(todos[0].is_overdue);
        assert_eq!(todos[1].title, "Untitled");
        assert!(todos[1].done);
        assert!(!todos[1].is_overdue);
        assert_eq!(todos[2].status, "");
        assert_eq!(todos[2].due, None);
    }

    #[test]
    fn display_filter_and_order() {
        let today = day(3, 5);
        let todos = vec![
            todo("anytime", None, today),
            todo("future", Some(day(3, 9)), today),
            todo("today", Some(today), today),
            todo("late-2", Some(day(3, 2)), today),
            todo("late-1", Some(day(2, 20)), today),
        ];
        let shown: Vec<String> = select_for_display(todos, today)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(shown, vec!["late-1", "late-2", "today", "anytime"]);
    }

    #[test]
    fn query_body_shape() {
        let body = query_body(false, Some("abc"));
        assert_eq!(body["filter"]["status"]["does_not_equal"], "Done");
        assert_eq!(body["start_cursor"], "abc");
        assert_eq!(body["sorts"][0]["property"], "Due date");
        assert!(query_body(true, None).get("filter").is_none());
    }

    #[test]
    fn debug_hides_api_key() {
        let config = NotionConfig {
            api_key: "secret_123".to_string(),
            database_id: "db".to_string(),
        };
        assert!(!format!("{config:?}").contains("secret_123"));
        assert!(config.is_configured());
        assert!(!NotionConfig::default().is_configured());
    }
}
