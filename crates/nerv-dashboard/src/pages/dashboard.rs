use anyhow::Result;
use chrono::Local;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Polyline};
use nerv_feeds::{CalendarClient, CalendarEvent};

use super::{draw_chrome, Page, RenderContext};
use crate::config::LocationConfig;
use crate::frame::Frame;
use crate::palette::{InkColor, Role, Theme};
use crate::sun::{day_fraction, sun_times, DayArc};
use crate::ui::draw::{self, Font};
use crate::ui::layout::{chars_that_fit, ellipsize, PageLayout};

const MAX_EVENTS: usize = 6;
const MAX_TITLE_CHARS: usize = 30;
const DIGIT_SIZE: u32 = 90;
const DIGIT_THICKNESS: u32 = 12;
const EVENTS_X: i32 = 380;
const ARC_HEIGHT: i32 = 95;

/// Clock, date, daylight arc and the next few calendar events.
pub struct DashboardPage {
    location: LocationConfig,
    calendar: Option<CalendarClient>,
}

impl DashboardPage {
    pub fn new(location: LocationConfig, calendar: Option<CalendarClient>) -> Self {
        Self { location, calendar }
    }

    fn draw_time(&self, frame: &mut Frame, ctx: &RenderContext<'_>, x: i32, y: i32) -> Result<()> {
        let color = ctx.theme.primary.rgb();
        let mut offset_x = x;
        for ch in ctx.now.format("%H:%M").to_string().chars() {
            offset_x += draw::segmented_digit(frame, color, offset_x, y, ch, DIGIT_SIZE, DIGIT_THICKNESS)?;
        }
        // Caption sits beside the digits; above them is the page header.
        draw::text(frame, "TIME", offset_x + 8, y + 33, Font::Label, ctx.theme.secondary.rgb())?;
        let seconds = ctx.now.format(":%S").to_string();
        draw::text(frame, &seconds, offset_x + 8, y + 55, Font::Medium, color)?;
        Ok(())
    }

    fn draw_date(&self, frame: &mut Frame, ctx: &RenderContext<'_>, x: i32, y: i32) -> Result<()> {
        let theme = ctx.theme;
        draw::text(frame, "DATE", x, y, Font::Label, theme.secondary.rgb())?;
        let date = ctx.now.format("%Y.%m.%d").to_string();
        let weekday = ctx.now.format("%A").to_string().to_uppercase();
        draw::text(frame, &date, x, y + 18, Font::Medium, theme.primary.rgb())?;
        draw::text(frame, &weekday, x + 160, y + 18, Font::Medium, theme.accent.rgb())?;
        Ok(())
    }

    fn draw_daylight_arc(
        &self,
        frame: &mut Frame,
        ctx: &RenderContext<'_>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<()> {
        let theme = ctx.theme;
        let date = ctx.now.date();
        let times = match sun_times(date, self.location.latitude, self.location.longitude, &Local) {
            Ok(times) => times,
            Err(err) => {
                tracing::debug!(error = %err, "No sunrise/sunset for today");
                let message = format!("Sun calc error: {err}");
                draw::text(frame, &message, x, y, Font::Small, theme.accent.rgb())?;
                return Ok(());
            }
        };

        draw::text(frame, "DAYLIGHT", x, y, Font::Label, theme.secondary.rgb())?;

        let arc = DayArc::from_times(&times, date);
        let arc_y = y + 22;
        let arc_height = height - 45;
        let horizon = arc_y + arc_height / 2;
        let arc_h = arc_height as f64;
        let w = width.max(1);

        let path: Vec<Point> = (0..=w)
            .map(|i| {
                let frac = i as f64 / w as f64;
                Point::new(x + i, horizon - arc.height(frac, arc_h).round() as i32)
            })
            .collect();
        Polyline::new(&path)
            .into_styled(PrimitiveStyle::with_stroke(theme.secondary.rgb(), 2))
            .draw(frame)?;

        draw::line(
            frame,
            Point::new(x, horizon),
            Point::new(x + w, horizon),
            theme.primary.rgb(),
            1,
        )?;

        let marker_bottom = horizon + arc_height / 4;
        let sunrise_x = x + (arc.sunrise * w as f64) as i32;
        let sunset_x = x + (arc.sunset * w as f64) as i32;
        let warning = theme.warning.rgb();
        let accent = theme.accent.rgb();
        draw::line(frame, Point::new(sunrise_x, arc_y), Point::new(sunrise_x, marker_bottom), warning, 1)?;
        let sunrise = times.sunrise.format("%H:%M").to_string();
        draw::text(frame, &sunrise, sunrise_x - 42, marker_bottom + 2, Font::Small, warning)?;
        draw::line(frame, Point::new(sunset_x, arc_y), Point::new(sunset_x, marker_bottom), accent, 1)?;
        let sunset = times.sunset.format("%H:%M").to_string();
        draw::text(frame, &sunset, sunset_x + 5, marker_bottom + 2, Font::Small, accent)?;

        let now_frac = day_fraction(ctx.now.time());
        let sun_x = x + (now_frac * w as f64) as i32;
        let sun_y = (horizon as f64 - arc.height(now_frac, arc_h)) as i32;
        let sun_color = if arc.is_day(now_frac) { warning } else { accent };
        draw::fill_circle(frame, Point::new(sun_x, sun_y), 7, sun_color)?;
        Ok(())
    }

    fn draw_events(
        &self,
        frame: &mut Frame,
        theme: &Theme,
        events: &[CalendarEvent],
        x: i32,
        y: i32,
    ) -> Result<()> {
        draw::text(frame, "UPCOMING", x, y, Font::Small, theme.accent.rgb())?;

        let mut row_y = y + 22;
        let line_height = 20;
        if events.is_empty() {
            draw::text(frame, "No upcoming events", x, row_y, Font::Small, theme.secondary.rgb())?;
            return Ok(());
        }

        let title_x = x + 18 + 65;
        let room = (frame.width() as i32 - PageLayout::MARGIN - title_x).max(0) as u32;
        let max_chars = MAX_TITLE_CHARS.min(chars_that_fit(room, Font::Small.advance()));

        for event in events.iter().take(MAX_EVENTS) {
            let color = event_color(theme, &event.color);
            match event.symbol.as_deref().filter(|s| !s.is_empty() && s.is_ascii()) {
                Some(symbol) => {
                    draw::text(frame, symbol, x, row_y, Font::Small, color)?;
                }
                None => draw::fill_circle(frame, Point::new(x + 4, row_y + 6), 4, color)?,
            }
            draw::text(frame, &event.time_label, x + 18, row_y, Font::Small, theme.secondary.rgb())?;
            let title = ellipsize(&event.title, max_chars);
            draw::text(frame, &title, title_x, row_y, Font::Small, theme.primary.rgb())?;
            row_y += line_height;
        }
        Ok(())
    }
}

/// A calendar colour may name an ink directly or a theme role; anything
/// else falls back to primary.
fn event_color(theme: &Theme, name: &str) -> embedded_graphics::pixelcolor::Rgb888 {
    InkColor::from_name(name)
        .or_else(|| Role::from_name(name).map(|role| theme.role(role)))
        .unwrap_or(theme.primary)
        .rgb()
}

impl Page for DashboardPage {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn title(&self) -> &'static str {
        "MAIN TERMINAL"
    }

    fn render(&mut self, frame: &mut Frame, ctx: &RenderContext<'_>) -> Result<()> {
        draw_chrome(frame, ctx, self.title())?;
        let theme = ctx.theme;
        let margin = PageLayout::MARGIN;
        let top = PageLayout::CONTENT_TOP;
        let width = frame.width() as i32;

        self.draw_time(frame, ctx, margin, top)?;
        self.draw_date(frame, ctx, margin, top + 115)?;
        draw::border_frame(frame, theme, margin - 5, top - 25, 340, 160, 2)?;

        let arc_y = top + 165;
        let arc_width = width - margin * 2;
        self.draw_daylight_arc(frame, ctx, margin, arc_y, arc_width, ARC_HEIGHT)?;
        draw::border_frame(frame, theme, margin - 5, arc_y - 5, arc_width + 10, ARC_HEIGHT + 5, 2)?;

        let events = match self.calendar.as_mut() {
            Some(calendar) => calendar.get_events_for_display(ctx.now, MAX_EVENTS),
            None => Vec::new(),
        };
        let events_y = top - 25;
        self.draw_events(frame, theme, &events, EVENTS_X, events_y)?;
        draw::border_frame(
            frame,
            theme,
            EVENTS_X - 10,
            events_y - 5,
            width - EVENTS_X - margin + 15,
            155,
            2,
        )?;
        Ok(())
    }

    fn invalidate(&mut self) {
        if let Some(calendar) = self.calendar.as_mut() {
            calendar.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn render_at(hour: u32, location: LocationConfig) -> Frame {
        let theme = Theme::default();
        let mut frame = Frame::new(600, 448, theme.background);
        let ctx = RenderContext {
            now: NaiveDate::from_ymd_opt(2025, 6, 18)
                .unwrap()
                .and_hms_opt(hour, 15, 42)
                .unwrap(),
            theme: &theme,
            index: 0,
            total: 4,
        };
        let mut page = DashboardPage::new(location, None);
        page.render(&mut frame, &ctx).unwrap();
        frame
    }

    #[test]
    fn renders_clock_and_arc_without_calendar() {
        let frame = render_at(8, LocationConfig::default());
        let orange = Some(InkColor::Orange.rgb());
        // Top segment of the first digit.
        assert_eq!(frame.pixel(20 + 20, 45 + 4), orange);
        // Horizon line of the arc: arc_y = 210 + 22, height 50.
        assert_eq!(frame.pixel(25, 232 + 25), orange);
    }

    #[test]
    fn time_caption_sits_right_of_the_digits() {
        let frame = render_at(8, LocationConfig::default());
        // Four digits at 57px plus the colon at 30px put the caption at x=286.
        let green = Some(InkColor::Green.rgb());
        let lit = (286..312)
            .flat_map(|x| (78..91).map(move |y| (x, y)))
            .any(|(x, y)| frame.pixel(x, y) == green);
        assert!(lit);
    }

    #[test]
    fn polar_location_reports_sun_error() {
        let polar = LocationConfig {
            latitude: 80.0,
            ..LocationConfig::default()
        };
        let frame = render_at(12, polar);
        // The error line replaces the arc, so the horizon row stays dark.
        assert_eq!(frame.pixel(25, 232 + 25), Some(InkColor::Black.rgb()));
    }

    #[test]
    fn event_colors_accept_inks_and_roles() {
        let theme = Theme::default();
        assert_eq!(event_color(&theme, "blue"), InkColor::Blue.rgb());
        assert_eq!(event_color(&theme, "accent"), InkColor::Red.rgb());
        assert_eq!(event_color(&theme, "mauve"), InkColor::Orange.rgb());
    }
}
