mod common;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use common::FakeTransport;
use nerv_feeds::{NotionClient, NotionConfig};
use serde_json::{json, Value};

const QUERY_URL: &str = "https://api.notion.com/v1/databases/db-123/query";

fn config() -> NotionConfig {
    NotionConfig {
        api_key: "secret_abc".to_string(),
        database_id: "db-123".to_string(),
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(7, 45, 0)
        .unwrap()
}

fn task(name: &str, due: Option<&str>) -> Value {
    let mut properties = json!({
        "Name": { "type": "title", "title": [{ "plain_text": name }] },
        "Status": { "type": "status", "status": { "name": "Not done" } },
    });
    if let Some(due) = due {
        properties["Due date"] = json!({ "type": "date", "date": { "start": due } });
    }
    json!({ "properties": properties })
}

#[test]
fn follows_pagination_cursor() {
    let transport = Arc::new(
        FakeTransport::default()
            .queue_json(json!({
                "results": [task("first", Some("2024-03-01"))],
                "has_more": true,
                "next_cursor": "cursor-2",
            }))
            .queue_json(json!({
                "results": [task("second", None)],
                "has_more": false,
                "next_cursor": null,
            })),
    );
    let client = NotionClient::new(config(), transport.clone());

    let todos = client.fetch_todos(now().date(), false).unwrap();
    assert_eq!(todos.len(), 2);

    let posts = transport.recorded_posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].url, QUERY_URL);
    assert!(posts[0].body.get("start_cursor").is_none());
    assert_eq!(posts[1].body["start_cursor"], "cursor-2");
    assert!(posts[0]
        .headers
        .contains(&("Authorization".to_string(), "Bearer secret_abc".to_string())));
    assert!(posts[0]
        .headers
        .contains(&("Notion-Version".to_string(), "2022-06-28".to_string())));
}

#[test]
fn display_list_is_filtered_ordered_and_cached() {
    let transport = Arc::new(FakeTransport::default().queue_json(json!({
        "results": [
            task("later", Some("2024-03-20")),
            task("anytime", None),
            task("today", Some("2024-03-05")),
            task("overdue", Some("2024-03-02")),
        ],
        "has_more": false,
    })));
    let mut client = NotionClient::new(config(), transport.clone());

    let titles: Vec<String> = client
        .get_todos_for_display(now())
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["overdue", "today", "anytime"]);
    assert_eq!(client.last_updated(), Some(now()));

    let again = client.get_todos_for_display(now());
    assert_eq!(again.len(), 3);
    assert_eq!(transport.recorded_posts().len(), 1);
}

#[test]
fn api_error_yields_empty_list() {
    let transport = Arc::new(FakeTransport::default().queue_status(401));
    let mut client = NotionClient::new(config(), transport.clone());
    assert!(client.get_todos_for_display(now()).is_empty());
    assert_eq!(client.last_updated(), None);
}

#[test]
fn invalidate_forces_new_query() {
    let page = json!({ "results": [task("one", None)], "has_more": false });
    let transport = Arc::new(
        FakeTransport::default()
            .queue_json(page.clone())
            .queue_json(page),
    );
    let mut client = NotionClient::new(config(), transport.clone());
    client.get_todos_for_display(now());
    client.invalidate();
    client.get_todos_for_display(now());
    assert_eq!(transport.recorded_posts().len(), 2);
}
