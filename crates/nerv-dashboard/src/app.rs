use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};

use crate::config::DashboardConfig;
use crate::frame::Frame;
use crate::input::{ButtonSource, DashboardAction};
use crate::pages::{Page, RenderContext};
use crate::palette::Theme;
use crate::panel::Panel;

pub struct App {
    config: DashboardConfig,
    theme: Theme,
    panel: Box<dyn Panel>,
    buttons: Option<Box<dyn ButtonSource>>,
    pages: Vec<Box<dyn Page>>,
    current: usize,
}

impl App {
    pub fn new(
        config: DashboardConfig,
        panel: Box<dyn Panel>,
        buttons: Option<Box<dyn ButtonSource>>,
        pages: Vec<Box<dyn Page>>,
    ) -> Self {
        let theme = config.build_theme();
        Self {
            config,
            theme,
            panel,
            buttons,
            pages,
            current: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_page_name(&self) -> Option<&'static str> {
        self.pages.get(self.current).map(|page| page.name())
    }

    /// Selects the page called `name`; returns false when there is none.
    pub fn select(&mut self, name: &str) -> bool {
        match self.pages.iter().position(|page| page.name() == name) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    pub fn next_page(&mut self) {
        if !self.pages.is_empty() {
            self.current = (self.current + 1) % self.pages.len();
        }
    }

    pub fn previous_page(&mut self) {
        if !self.pages.is_empty() {
            self.current = (self.current + self.pages.len() - 1) % self.pages.len();
        }
    }

    pub fn handle(&mut self, action: DashboardAction) {
        tracing::info!(?action, page = self.current_page_name(), "Button action");
        match action {
            DashboardAction::PreviousPage => self.previous_page(),
            DashboardAction::NextPage => self.next_page(),
            DashboardAction::Refresh => {
                for page in &mut self.pages {
                    page.invalidate();
                }
            }
            DashboardAction::PageAction => {
                if let Some(page) = self.pages.get_mut(self.current) {
                    page.advance();
                }
            }
        }
    }

    /// Renders the selected page as of `now` into a fresh frame.
    pub fn render_at(&mut self, now: NaiveDateTime) -> Result<Frame> {
        let total = self.pages.len();
        let index = self.current;
        let page = self
            .pages
            .get_mut(index)
            .ok_or_else(|| anyhow::anyhow!("no pages configured"))?;
        let mut frame = Frame::new(
            self.config.display.width,
            self.config.display.height,
            self.theme.background,
        );
        let ctx = RenderContext {
            now,
            theme: &self.theme,
            index,
            total,
        };
        page.render(&mut frame, &ctx)?;
        Ok(frame)
    }

    /// Renders and shows the selected page. Failures are logged; returns
    /// whether the panel was updated.
    pub fn update_at(&mut self, now: NaiveDateTime) -> bool {
        let started = Instant::now();
        let frame = match self.render_at(now) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!(page = self.current_page_name(), error = %format!("{err:#}"), "Render failed");
                return false;
            }
        };
        if let Err(err) = self.panel.show(&frame) {
            tracing::error!(panel = self.panel.name(), error = %format!("{err:#}"), "Panel update failed");
            return false;
        }
        tracing::info!(
            page = self.current_page_name(),
            panel = self.panel.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Display updated"
        );
        true
    }

    pub fn update(&mut self) -> bool {
        self.update_at(Local::now().naive_local())
    }

    /// Waits up to `timeout` for a button press. A failing button source is
    /// logged and dropped, after which the wait is a plain sleep.
    pub fn wait_for_action(&mut self, timeout: Duration) -> Option<DashboardAction> {
        let Some(buttons) = self.buttons.as_mut() else {
            std::thread::sleep(timeout);
            return None;
        };
        match buttons.try_read_timeout(timeout) {
            Ok(button) => button.map(|b| b.action()),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Button read failed; disabling buttons");
                self.buttons = None;
                None
            }
        }
    }

    /// One refresh cycle: wait for a press or the update interval, apply
    /// the action if any, then redraw.
    pub fn cycle(&mut self) -> bool {
        let interval = Duration::from_secs(self.config.display.update_interval_secs);
        if let Some(action) = self.wait_for_action(interval) {
            self.handle(action);
        }
        self.update()
    }

    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            pages = self.pages.len(),
            interval_s = self.config.display.update_interval_secs,
            buttons = self.buttons.is_some(),
            "Dashboard running"
        );
        self.update();
        loop {
            self.cycle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::{build_pages, Feeds};
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingPanel {
        shown: Rc<RefCell<Vec<(u32, u32)>>>,
    }

    impl Panel for RecordingPanel {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn show(&mut self, frame: &Frame) -> Result<()> {
            self.shown.borrow_mut().push((frame.width(), frame.height()));
            Ok(())
        }
    }

    fn app() -> (App, RecordingPanel) {
        let config = DashboardConfig::default();
        let pages = build_pages(&config.pages.order, &config.location, Feeds::default());
        let panel = RecordingPanel::default();
        (App::new(config, Box::new(panel.clone()), None, pages), panel)
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 18).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let (mut app, _) = app();
        assert_eq!(app.current_page_name(), Some("dashboard"));
        app.handle(DashboardAction::PreviousPage);
        assert_eq!(app.current_page_name(), Some("experimental"));
        app.handle(DashboardAction::NextPage);
        app.handle(DashboardAction::NextPage);
        assert_eq!(app.current_page_name(), Some("todos"));
    }

    #[test]
    fn select_by_name() {
        let (mut app, _) = app();
        assert!(app.select("satellite"));
        assert_eq!(app.current_index(), 2);
        assert!(!app.select("weather"));
        assert_eq!(app.current_index(), 2);
    }

    #[test]
    fn every_page_reaches_the_panel() {
        let (mut app, panel) = app();
        for _ in 0..app.page_count() {
            assert!(app.update_at(noon()));
            app.next_page();
        }
        assert_eq!(panel.shown.borrow().len(), 4);
        assert!(panel.shown.borrow().iter().all(|dims| *dims == (600, 448)));
    }

    #[test]
    fn empty_page_list_is_not_fatal() {
        let panel = RecordingPanel::default();
        let mut app = App::new(DashboardConfig::default(), Box::new(panel.clone()), None, Vec::new());
        app.next_page();
        app.handle(DashboardAction::Refresh);
        assert!(!app.update_at(noon()));
        assert!(panel.shown.borrow().is_empty());
    }

    struct ScriptedButtons(Vec<crate::input::Button>);

    impl ButtonSource for ScriptedButtons {
        fn try_read_timeout(&mut self, _: Duration) -> Result<Option<crate::input::Button>> {
            Ok(self.0.pop())
        }
    }

    #[test]
    fn button_press_maps_to_action() {
        let config = DashboardConfig::default();
        let pages = build_pages(&config.pages.order, &config.location, Feeds::default());
        let buttons = ScriptedButtons(vec![crate::input::Button::C]);
        let mut app = App::new(
            config,
            Box::new(RecordingPanel::default()),
            Some(Box::new(buttons)),
            pages,
        );
        let action = app.wait_for_action(Duration::from_millis(1));
        assert_eq!(action, Some(DashboardAction::NextPage));
        app.handle(action.unwrap());
        assert_eq!(app.current_page_name(), Some("todos"));
        assert_eq!(app.wait_for_action(Duration::from_millis(1)), None);
    }

    #[test]
    fn without_buttons_the_wait_is_a_sleep() {
        let (mut app, _) = app();
        let started = Instant::now();
        assert_eq!(app.wait_for_action(Duration::from_millis(20)), None);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
