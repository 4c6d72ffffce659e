use anyhow::Result;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::{draw_chrome, Page, RenderContext};
use crate::frame::Frame;
use crate::ui::draw::{self, Font};
use crate::ui::layout::{chars_that_fit, grid, wrap_text, PageLayout};

const CONTENT_TOP: i32 = 50;
const IDEAS: &str = "Ideas: Pi stats, security cam, weather, quotes, pomodoro...";
const PLACEHOLDERS: [&str; 4] = ["SYSTEM STATS", "WEATHER", "CAMERA FEED", "DATA VIZ"];

/// Placeholder boxes for modules that do not exist yet.
pub struct ExperimentalPage;

impl Page for ExperimentalPage {
    fn name(&self) -> &'static str {
        "experimental"
    }

    fn title(&self) -> &'static str {
        "EXPERIMENTAL"
    }

    fn render(&mut self, frame: &mut Frame, ctx: &RenderContext<'_>) -> Result<()> {
        draw_chrome(frame, ctx, self.title())?;
        let theme = ctx.theme;
        let layout = PageLayout::from_dimensions(frame.width(), frame.height());
        let margin = layout.margin;
        let secondary = theme.secondary.rgb();

        draw::text(frame, "EXPERIMENTAL LAB", margin, CONTENT_TOP, Font::Medium, theme.accent.rgb())?;
        draw::text(
            frame,
            "Future projects go here",
            margin,
            CONTENT_TOP + 28,
            Font::Small,
            secondary,
        )?;

        let area = Rectangle::new(
            Point::new(margin, CONTENT_TOP + 70),
            Size::new(layout.content_width() as u32, 260),
        );
        for (cell, label) in grid(area, 2, 2, margin as u32).iter().zip(PLACEHOLDERS) {
            draw::corner_brackets(
                frame,
                secondary,
                cell.top_left.x,
                cell.top_left.y,
                cell.size.width as i32,
                cell.size.height as i32,
                label,
            )?;
        }

        let per_line = chars_that_fit(layout.content_width() as u32, Font::Small.advance());
        let mut line_y = layout.height() - 60;
        for line in wrap_text(IDEAS, per_line) {
            draw::text(frame, &line, margin, line_y, Font::Small, secondary)?;
            line_y += Font::Small.line_height() as i32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{InkColor, Theme};
    use chrono::NaiveDate;

    fn render(width: u32) -> Frame {
        let theme = Theme::default();
        let mut frame = Frame::new(width, 448, theme.background);
        let ctx = RenderContext {
            now: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            theme: &theme,
            index: 3,
            total: 4,
        };
        ExperimentalPage.render(&mut frame, &ctx).unwrap();
        frame
    }

    fn row_has_green(frame: &Frame, ys: std::ops::Range<u32>) -> bool {
        let green = Some(InkColor::Green.rgb());
        (20..200).any(|x| ys.clone().any(|y| frame.pixel(x, y) == green))
    }

    #[test]
    fn ideas_wrap_on_narrow_frames() {
        // The ideas line starts 60px above the bottom; a second line follows
        // 13px lower only when the text does not fit.
        let wide = render(600);
        assert!(row_has_green(&wide, 388..401));
        assert!(!row_has_green(&wide, 402..414));

        let narrow = render(300);
        assert!(row_has_green(&narrow, 402..414));
    }

    #[test]
    fn draws_four_placeholder_boxes() {
        let frame = render(600);
        let green = Some(InkColor::Green.rgb());
        // Top-left bracket of each cell: 270x120 cells, gap 20.
        for (x, y) in [(20, 120), (310, 120), (20, 260), (310, 260)] {
            assert_eq!(frame.pixel(x + 5, y), green, "bracket at {x},{y}");
        }
    }
}
