//! Fixed-size RGB raster that pages draw into and panels consume.

use std::convert::Infallible;
use std::path::Path;

use anyhow::{Context, Result};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use image::{ImageFormat, Rgb, RgbImage};

use crate::palette::InkColor;

pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(width: u32, height: u32, background: InkColor) -> Self {
        let [r, g, b] = background.components();
        Self {
            image: RgbImage::from_pixel(width, height, Rgb([r, g, b])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn fill(&mut self, color: Rgb888) {
        let px = Rgb([color.r(), color.g(), color.b()]);
        self.image.pixels_mut().for_each(|p| *p = px);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        (x < self.width() && y < self.height()).then(|| {
            let Rgb([r, g, b]) = *self.image.get_pixel(x, y);
            Rgb888::new(r, g, b)
        })
    }

    /// Copies `src` with its top-left corner at (`x`, `y`); anything outside
    /// the frame is clipped.
    pub fn paste(&mut self, src: &RgbImage, x: i32, y: i32) {
        for (sx, sy, px) in src.enumerate_pixels() {
            let (dx, dy) = (x + sx as i32, y + sy as i32);
            if dx >= 0 && dy >= 0 && (dx as u32) < self.width() && (dy as u32) < self.height() {
                self.image.put_pixel(dx as u32, dy as u32, *px);
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating preview directory {}", parent.display()))?;
        }
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("writing preview {}", path.display()))
    }

    /// Floyd-Steinberg dithers the frame onto the seven inks and packs two
    /// palette indices per byte, high nibble first.
    pub fn to_panel_buffer(&self) -> Vec<u8> {
        let (w, h) = (self.width() as usize, self.height() as usize);
        let mut work: Vec<[i32; 3]> = self
            .image
            .pixels()
            .map(|Rgb([r, g, b])| [*r as i32, *g as i32, *b as i32])
            .collect();
        let mut indices = Vec::with_capacity(w * h);

        for y in 0..h {
            for x in 0..w {
                let [r, g, b] = work[y * w + x].map(|c| c.clamp(0, 255));
                let ink = InkColor::nearest(r, g, b);
                indices.push(ink.index());

                let [ir, ig, ib] = ink.components();
                let err = [r - ir as i32, g - ig as i32, b - ib as i32];
                if err == [0, 0, 0] {
                    continue;
                }
                let mut spread = |dx: isize, dy: usize, weight: i32| {
                    let nx = x as isize + dx;
                    let ny = y + dy;
                    if nx < 0 || nx as usize >= w || ny >= h {
                        return;
                    }
                    let cell = &mut work[ny * w + nx as usize];
                    for c in 0..3 {
                        cell[c] += err[c] * weight / 16;
                    }
                };
                spread(1, 0, 7);
                spread(-1, 1, 3);
                spread(0, 1, 5);
                spread(1, 1, 1);
            }
        }

        indices
            .chunks(2)
            .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
            .collect()
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.width() as i32, self.height() as i32);
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && point.x < w && point.y < h {
                self.image.put_pixel(
                    point.x as u32,
                    point.y as u32,
                    Rgb([color.r(), color.g(), color.b()]),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
    use tempfile::TempDir;

    #[test]
    fn out_of_bounds_pixels_are_dropped() {
        let mut frame = Frame::new(4, 4, InkColor::Black);
        Rectangle::new(Point::new(-2, -2), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(InkColor::Red.rgb()))
            .draw(&mut frame)
            .unwrap();
        assert_eq!(frame.pixel(0, 0), Some(InkColor::Red.rgb()));
        assert_eq!(frame.pixel(1, 1), Some(InkColor::Red.rgb()));
        assert_eq!(frame.pixel(2, 2), Some(InkColor::Black.rgb()));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn paste_clips_to_frame() {
        let mut frame = Frame::new(4, 4, InkColor::Black);
        let src = RgbImage::from_pixel(3, 3, Rgb([0, 0, 255]));
        frame.paste(&src, 2, -1);
        assert_eq!(frame.pixel(3, 0), Some(InkColor::Blue.rgb()));
        assert_eq!(frame.pixel(2, 1), Some(InkColor::Blue.rgb()));
        assert_eq!(frame.pixel(1, 0), Some(InkColor::Black.rgb()));
        assert_eq!(frame.pixel(3, 2), Some(InkColor::Black.rgb()));
    }

    #[test]
    fn flat_palette_colors_pack_exactly() {
        let mut frame = Frame::new(4, 1, InkColor::White);
        frame.draw_iter([
            Pixel(Point::new(0, 0), InkColor::Orange.rgb()),
            Pixel(Point::new(3, 0), InkColor::Blue.rgb()),
        ])
        .unwrap();
        assert_eq!(frame.to_panel_buffer(), vec![0x61, 0x13]);
    }

    #[test]
    fn buffer_is_half_the_pixel_count() {
        let frame = Frame::new(600, 448, InkColor::Black);
        let buf = frame.to_panel_buffer();
        assert_eq!(buf.len(), 600 * 448 / 2);
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn mid_grey_dithers_to_black_and_white() {
        let mut frame = Frame::new(8, 8, InkColor::Black);
        frame.fill(Rgb888::new(128, 128, 128));
        let buf = frame.to_panel_buffer();
        let nibbles: Vec<u8> = buf.iter().flat_map(|b| [b >> 4, b & 0x0F]).collect();
        let white = nibbles.iter().filter(|n| **n == InkColor::White.index()).count();
        let black = nibbles.iter().filter(|n| **n == InkColor::Black.index()).count();
        assert!(white > 16 && black > 16, "white={white} black={black}");
    }

    #[test]
    fn save_png_round_trips_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/preview.png");
        Frame::new(6, 5, InkColor::Green).save_png(&path).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (6, 5));
    }
}
