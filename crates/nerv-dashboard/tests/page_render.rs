use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use image::{ImageFormat, Rgb, RgbImage};
use nerv_dashboard::app::App;
use nerv_dashboard::config::{DashboardConfig, DisplayBackend};
use nerv_dashboard::frame::Frame;
use nerv_dashboard::pages::{build_pages, Feeds, Page, RenderContext, SatellitePage};
use nerv_dashboard::palette::{InkColor, Theme};
use nerv_dashboard::panel::open_panel;
use nerv_feeds::{EarthViewClient, FeedError, Result, Transport};
use serde_json::{json, Value};
use tempfile::TempDir;

const LIST_URL: &str = "https://example.test/earthview.json";
const IMAGE_URL: &str = "https://example.test/1003.jpg";

#[derive(Default)]
struct StaticTransport {
    pages: HashMap<String, Vec<u8>>,
}

impl Transport for StaticTransport {
    fn get(&self, url: &str, _: Duration) -> Result<Vec<u8>> {
        self.pages.get(url).cloned().ok_or(FeedError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    fn post_json(&self, url: &str, _: &[(&str, String)], _: &Value, _: Duration) -> Result<Value> {
        Err(FeedError::Status {
            url: url.to_string(),
            status: 500,
        })
    }
}

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 18).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn earthview_transport() -> Arc<dyn Transport> {
    let list = json!([{
        "image": IMAGE_URL,
        "map": "https://www.google.com/maps/@-23.650,-70.400,14z/data=!3m1!1e3",
        "country": "Chile",
        "region": "Antofagasta"
    }]);
    let mut png = Vec::new();
    RgbImage::from_pixel(400, 300, Rgb([0, 0, 255]))
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let mut transport = StaticTransport::default();
    transport.pages.insert(LIST_URL.to_string(), list.to_string().into_bytes());
    transport.pages.insert(IMAGE_URL.to_string(), png);
    Arc::new(transport)
}

#[test]
fn satellite_page_shows_image_under_overlay() {
    let client = EarthViewClient::with_list_url(earthview_transport(), LIST_URL);
    let mut page = SatellitePage::new(Some(client));
    let theme = Theme::default();
    let mut frame = Frame::new(600, 448, theme.background);
    let ctx = RenderContext {
        now: noon(),
        theme: &theme,
        index: 2,
        total: 4,
    };

    page.render(&mut frame, &ctx).unwrap();

    assert_eq!(frame.pixel(100, 100), Some(InkColor::Blue.rgb()));
    assert_eq!(frame.pixel(300, 224), Some(InkColor::Red.rgb()));
    // A single entry wraps straight back to the start.
    assert_eq!(page.index(), 0);
}

#[test]
fn unreachable_feeds_still_render_every_page() {
    let dir = TempDir::new().unwrap();
    let mut config = DashboardConfig::default();
    config.display.backend = DisplayBackend::Preview;

    let transport: Arc<dyn Transport> = Arc::new(StaticTransport::default());
    let feeds = Feeds {
        calendar: None,
        notion: None,
        earthview: Some(EarthViewClient::with_list_url(transport, LIST_URL)),
    };
    let pages = build_pages(&config.pages.order, &config.location, feeds);
    let panel = open_panel(&config.display, dir.path(), None);
    let preview = dir.path().join("preview").join("frame.png");
    let mut app = App::new(config, panel, None, pages);

    for _ in 0..app.page_count() {
        assert!(app.update_at(noon()), "page {:?} failed", app.current_page_name());
        let written = image::open(&preview).unwrap();
        assert_eq!((written.width(), written.height()), (600, 448));
        app.next_page();
    }
    assert_eq!(app.current_page_name(), Some("dashboard"));
}

#[test]
fn panel_buffer_packs_two_pixels_per_byte() {
    let config = DashboardConfig::default();
    let pages = build_pages(&config.pages.order, &config.location, Feeds::default());
    let dir = TempDir::new().unwrap();
    let panel = open_panel(&config.display, dir.path(), Some(dir.path().join("f.png")));
    let mut app = App::new(config, panel, None, pages);
    assert!(app.select("experimental"));

    let frame = app.render_at(noon()).unwrap();
    let buffer = frame.to_panel_buffer();
    assert_eq!(buffer.len(), 600 * 448 / 2);
    assert!(buffer.iter().all(|byte| byte >> 4 <= 6 && byte & 0x0f <= 6));
}
