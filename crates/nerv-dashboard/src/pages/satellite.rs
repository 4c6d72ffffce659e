use anyhow::Result;
use image::imageops::{self, FilterType};
use image::RgbImage;
use nerv_feeds::{EarthViewClient, EarthViewEntry};

use super::{Page, RenderContext};
use crate::frame::Frame;
use crate::palette::Theme;
use crate::ui::draw::{self, Font};

const BORDER_MARGIN: i32 = 25;
const LINE_HEIGHT: i32 = 16;

/// Full-bleed Earth View imagery under a targeting overlay. Every render
/// moves on to the next image.
pub struct SatellitePage {
    earthview: Option<EarthViewClient>,
    index: usize,
}

impl SatellitePage {
    pub fn new(earthview: Option<EarthViewClient>) -> Self {
        Self { earthview, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Scales `src` to cover `width` x `height` and centre-crops the overflow.
pub fn fill_crop(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 || width == 0 || height == 0 {
        return RgbImage::new(width, height);
    }
    let src_ratio = sw as f64 / sh as f64;
    let dst_ratio = width as f64 / height as f64;
    let (new_w, new_h) = if src_ratio > dst_ratio {
        (((height as f64) * src_ratio).round() as u32, height)
    } else {
        (width, ((width as f64) / src_ratio).round() as u32)
    };
    let new_w = new_w.max(width);
    let new_h = new_h.max(height);
    let scaled = imageops::resize(src, new_w, new_h, FilterType::Lanczos3);
    let left = (new_w - width) / 2;
    let top = (new_h - height) / 2;
    imageops::crop_imm(&scaled, left, top, width, height).to_image()
}

fn draw_data_overlay(frame: &mut Frame, theme: &Theme, entry: Option<&EarthViewEntry>, x: i32, y: i32) -> Result<()> {
    let green = theme.success.rgb();
    let Some(entry) = entry else {
        draw::text_right(frame, "NO DATA", x, y, Font::Small, green)?;
        return Ok(());
    };

    let coords = entry
        .coordinates()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "COORDS: N/A".to_string());
    let location = entry.location_label();
    let lines = [
        coords.as_str(),
        location.as_str(),
        "ALT: ~680 KM",
        "SRC: GOOGLE EARTH VIEW",
    ];
    for (i, line) in lines.iter().enumerate() {
        draw::text_right(frame, line, x, y + i as i32 * LINE_HEIGHT, Font::Small, green)?;
    }
    Ok(())
}

impl Page for SatellitePage {
    fn name(&self) -> &'static str {
        "satellite"
    }

    fn title(&self) -> &'static str {
        "SATELLITE VIEW"
    }

    fn render(&mut self, frame: &mut Frame, ctx: &RenderContext<'_>) -> Result<()> {
        let theme = ctx.theme;
        let width = frame.width() as i32;
        let height = frame.height() as i32;

        let entries = match self.earthview.as_mut() {
            Some(client) => client.entries(),
            None => Default::default(),
        };
        let current = if entries.is_empty() {
            None
        } else {
            self.index %= entries.len();
            entries.get(self.index)
        };

        if let (Some(entry), Some(client)) = (current, self.earthview.as_mut()) {
            if let Some(img) = client.image(entry) {
                let filled = fill_crop(&img, frame.width(), frame.height());
                frame.paste(&filled, 0, 0);
            }
        }

        let accent = theme.accent.rgb();
        draw::outline_rect(
            frame,
            BORDER_MARGIN,
            BORDER_MARGIN,
            width - BORDER_MARGIN,
            height - BORDER_MARGIN,
            accent,
            1,
        )?;

        let reticle_size = width.min(height) - 100;
        draw::reticle(frame, accent, width / 2, height / 2, reticle_size)?;

        draw_data_overlay(
            frame,
            theme,
            current,
            width - BORDER_MARGIN - 10,
            height - BORDER_MARGIN - 75,
        )?;

        draw::text(frame, "NERV", BORDER_MARGIN + 10, BORDER_MARGIN + 5, Font::Medium, accent)?;
        draw::text(
            frame,
            self.title(),
            BORDER_MARGIN + 80,
            BORDER_MARGIN + 9,
            Font::Small,
            theme.primary.rgb(),
        )?;

        if !entries.is_empty() {
            let counter = format!("{}/{}", self.index + 1, entries.len());
            draw::text_right(
                frame,
                &counter,
                width - BORDER_MARGIN - 10,
                BORDER_MARGIN + 9,
                Font::Small,
                theme.success.rgb(),
            )?;
            self.index = (self.index + 1) % entries.len();
        }
        Ok(())
    }

    fn advance(&mut self) {
        self.index = self.index.wrapping_add(1);
    }

    fn invalidate(&mut self) {
        if let Some(client) = self.earthview.as_mut() {
            client.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::InkColor;
    use chrono::NaiveDate;
    use image::Rgb;

    #[test]
    fn fill_crop_covers_target() {
        let wide = RgbImage::from_pixel(1800, 1200, Rgb([10, 20, 30]));
        let out = fill_crop(&wide, 600, 448);
        assert_eq!(out.dimensions(), (600, 448));

        let tall = RgbImage::from_pixel(300, 900, Rgb([10, 20, 30]));
        assert_eq!(fill_crop(&tall, 600, 448).dimensions(), (600, 448));
    }

    #[test]
    fn fill_crop_keeps_the_centre() {
        let mut src = RgbImage::from_pixel(1200, 448, Rgb([0, 0, 0]));
        for y in 0..448 {
            for x in 550..650 {
                src.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let out = fill_crop(&src, 600, 448);
        assert_eq!(out.get_pixel(300, 224), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(10, 224), &Rgb([0, 0, 0]));
    }

    #[test]
    fn renders_overlay_without_data() {
        let theme = Theme::default();
        let mut frame = Frame::new(600, 448, theme.background);
        let ctx = RenderContext {
            now: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            theme: &theme,
            index: 2,
            total: 4,
        };
        let mut page = SatellitePage::new(None);
        page.render(&mut frame, &ctx).unwrap();
        let red = Some(InkColor::Red.rgb());
        assert_eq!(frame.pixel(25, 200), red);
        assert_eq!(frame.pixel(300, 224), red);
        assert_eq!(page.index(), 0);
    }
}
