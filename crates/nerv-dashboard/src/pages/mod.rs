//! The pages the dashboard cycles through. Each page owns whatever feed
//! client it reads from; the app owns the pages.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;
use nerv_feeds::{CalendarClient, EarthViewClient, NotionClient, Transport};

use crate::config::{LocationConfig, Secrets};
use crate::frame::Frame;
use crate::palette::Theme;
use crate::ui::draw::{self, Font};

pub mod dashboard;
pub mod experimental;
pub mod satellite;
pub mod todos;

pub use dashboard::DashboardPage;
pub use experimental::ExperimentalPage;
pub use satellite::SatellitePage;
pub use todos::TodosPage;

/// Everything a page needs to draw one frame.
pub struct RenderContext<'a> {
    /// Local wall-clock time of this render.
    pub now: NaiveDateTime,
    pub theme: &'a Theme,
    pub index: usize,
    pub total: usize,
}

pub trait Page {
    fn name(&self) -> &'static str;
    fn title(&self) -> &'static str;
    fn render(&mut self, frame: &mut Frame, ctx: &RenderContext<'_>) -> Result<()>;

    /// Page-specific action bound to the D button.
    fn advance(&mut self) {}

    /// Drops cached feed data so the next render fetches fresh.
    fn invalidate(&mut self) {}
}

/// Hazard stripes top and bottom, the NERV mark, the page title and the
/// page indicator.
pub fn draw_chrome(frame: &mut Frame, ctx: &RenderContext<'_>, title: &str) -> Result<()> {
    let theme = ctx.theme;
    let width = frame.width() as i32;
    let height = frame.height() as i32;

    draw::hazard_stripes(frame, theme, 0, 0, width, 12, 10)?;
    draw::text(frame, "NERV", 15, 16, Font::Medium, theme.accent.rgb())?;
    draw::text(frame, title, 85, 20, Font::Small, theme.primary.rgb())?;
    draw::page_dots(frame, theme, width, ctx.index, ctx.total)?;
    draw::hazard_stripes(frame, theme, 0, height - 12, width, 12, 10)?;
    Ok(())
}

/// Feed clients handed to the pages that read them.
#[derive(Default)]
pub struct Feeds {
    pub calendar: Option<CalendarClient>,
    pub notion: Option<NotionClient>,
    pub earthview: Option<EarthViewClient>,
}

impl Feeds {
    pub fn from_secrets(secrets: Option<Secrets>, transport: Arc<dyn Transport>) -> Self {
        let secrets = secrets.unwrap_or_default();
        let calendar = if secrets.calendars.is_empty() {
            tracing::info!("No calendars configured");
            None
        } else {
            Some(CalendarClient::new(secrets.calendars, Arc::clone(&transport)))
        };
        let notion = if secrets.notion.is_configured() {
            Some(NotionClient::new(secrets.notion, Arc::clone(&transport)))
        } else {
            tracing::info!("Notion not configured");
            None
        };
        Self {
            calendar,
            notion,
            earthview: Some(EarthViewClient::new(transport)),
        }
    }
}

/// Builds the pages named in `order`; unknown names are skipped.
pub fn build_pages(order: &[String], location: &LocationConfig, mut feeds: Feeds) -> Vec<Box<dyn Page>> {
    let mut pages: Vec<Box<dyn Page>> = Vec::with_capacity(order.len());
    for name in order {
        match name.as_str() {
            "dashboard" => pages.push(Box::new(DashboardPage::new(
                location.clone(),
                feeds.calendar.take(),
            ))),
            "todos" => pages.push(Box::new(TodosPage::new(feeds.notion.take()))),
            "satellite" => pages.push(Box::new(SatellitePage::new(feeds.earthview.take()))),
            "experimental" => pages.push(Box::new(ExperimentalPage)),
            other => tracing::warn!(page = other, "Skipping unknown page"),
        }
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_NAMES;
    use crate::palette::InkColor;

    #[test]
    fn builds_pages_in_configured_order() {
        let order: Vec<String> = ["todos", "dashboard", "nope"].iter().map(|s| s.to_string()).collect();
        let pages = build_pages(&order, &LocationConfig::default(), Feeds::default());
        let names: Vec<_> = pages.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["todos", "dashboard"]);
    }

    #[test]
    fn every_known_page_builds() {
        let order: Vec<String> = PAGE_NAMES.iter().map(|s| s.to_string()).collect();
        let pages = build_pages(&order, &LocationConfig::default(), Feeds::default());
        assert_eq!(pages.len(), PAGE_NAMES.len());
        for (page, name) in pages.iter().zip(PAGE_NAMES) {
            assert_eq!(page.name(), name);
        }
    }

    #[test]
    fn chrome_marks_both_edges() {
        let theme = Theme::default();
        let mut frame = Frame::new(600, 448, theme.background);
        let ctx = RenderContext {
            now: chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            theme: &theme,
            index: 0,
            total: 4,
        };
        draw_chrome(&mut frame, &ctx, "TEST").unwrap();
        let yellow = Some(InkColor::Yellow.rgb());
        let black = Some(InkColor::Black.rgb());
        let top: Vec<_> = (0..600).map(|x| frame.pixel(x, 6)).collect();
        let bottom: Vec<_> = (0..600).map(|x| frame.pixel(x, 442)).collect();
        for row in [top, bottom] {
            assert!(row.contains(&yellow));
            assert!(row.contains(&black));
        }
    }
}
