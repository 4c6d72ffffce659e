//! Drawing primitives shared by the pages. Every function works on any
//! `DrawTarget<Color = Rgb888>`; rectangles take inclusive corners, so a box
//! at `x` with width `w` covers columns `x..=x + w`.

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10, FONT_7X13};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Circle, Ellipse, Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment,
    Triangle,
};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::palette::{InkColor, Theme};
use crate::ui::layout::text_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// 10x20, headings and the date line.
    Medium,
    /// 7x13, body text.
    Small,
    /// 6x10, captions.
    Label,
}

impl Font {
    pub fn mono(self) -> &'static MonoFont<'static> {
        match self {
            Font::Medium => &FONT_10X20,
            Font::Small => &FONT_7X13,
            Font::Label => &FONT_6X10,
        }
    }

    /// Horizontal distance between consecutive glyphs.
    pub fn advance(self) -> u32 {
        let font = self.mono();
        font.character_size.width + font.character_spacing
    }

    pub fn line_height(self) -> u32 {
        self.mono().character_size.height
    }
}

pub fn text<D>(target: &mut D, s: &str, x: i32, y: i32, font: Font, color: Rgb888) -> Result<Point, D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let style = MonoTextStyle::new(font.mono(), color);
    Text::with_baseline(s, Point::new(x, y), style, Baseline::Top).draw(target)
}

/// Text whose right edge sits at `right_x`.
pub fn text_right<D>(
    target: &mut D,
    s: &str,
    right_x: i32,
    y: i32,
    font: Font,
    color: Rgb888,
) -> Result<Point, D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let style = MonoTextStyle::new(font.mono(), color);
    let layout = TextStyleBuilder::new()
        .alignment(Alignment::Right)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(s, Point::new(right_x, y), style, layout).draw(target)
}

pub fn fill_rect<D>(target: &mut D, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Rectangle::with_corners(Point::new(x0, y0), Point::new(x1, y1))
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(target)
}

pub fn outline_rect<D>(
    target: &mut D,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: Rgb888,
    width: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let style = PrimitiveStyleBuilder::new()
        .stroke_color(color)
        .stroke_width(width)
        .stroke_alignment(StrokeAlignment::Inside)
        .build();
    Rectangle::with_corners(Point::new(x0, y0), Point::new(x1, y1))
        .into_styled(style)
        .draw(target)
}

pub fn line<D>(target: &mut D, from: Point, to: Point, color: Rgb888, width: u32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Line::new(from, to)
        .into_styled(PrimitiveStyle::with_stroke(color, width))
        .draw(target)
}

/// Filled convex quadrilateral, drawn as two triangles.
pub fn fill_quad<D>(target: &mut D, points: [Point; 4], color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let style = PrimitiveStyle::with_fill(color);
    Triangle::new(points[0], points[1], points[2])
        .into_styled(style)
        .draw(target)?;
    Triangle::new(points[0], points[2], points[3])
        .into_styled(style)
        .draw(target)
}

pub fn fill_circle<D>(target: &mut D, center: Point, radius: u32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Circle::with_center(center, radius * 2 + 1)
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(target)
}

pub fn outline_circle<D>(target: &mut D, center: Point, radius: u32, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Circle::with_center(center, radius * 2 + 1)
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(target)
}

/// Warning-coloured band crossed by black diagonal bars every `2 * stripe` px.
pub fn hazard_stripes<D>(
    target: &mut D,
    theme: &Theme,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    stripe: i32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let band = Rectangle::with_corners(Point::new(x, y), Point::new(x + w, y + h));
    band.into_styled(PrimitiveStyle::with_fill(theme.warning.rgb()))
        .draw(target)?;

    let black = InkColor::Black.rgb();
    let step = (stripe * 2).max(1) as usize;
    let mut clipped = target.clipped(&band);
    for i in (-h..w + h).step_by(step) {
        fill_quad(
            &mut clipped,
            [
                Point::new(x + i, y + h),
                Point::new(x + i + stripe, y + h),
                Point::new(x + i + h + stripe, y),
                Point::new(x + i + h, y),
            ],
            black,
        )?;
    }
    Ok(())
}

/// Primary-coloured outline with solid 7x7 corner squares.
pub fn border_frame<D>(
    target: &mut D,
    theme: &Theme,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    thickness: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    const CORNER: i32 = 6;
    let color = theme.primary.rgb();
    outline_rect(target, x, y, x + w, y + h, color, thickness)?;
    for (cx, cy) in [
        (x, y),
        (x + w - CORNER, y),
        (x, y + h - CORNER),
        (x + w - CORNER, y + h - CORNER),
    ] {
        fill_rect(target, cx, cy, cx + CORNER, cy + CORNER, color)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Top,
    TopRight,
    BottomRight,
    Bottom,
    BottomLeft,
    TopLeft,
    Middle,
}

fn segments_for(ch: char) -> Option<&'static [Segment]> {
    use Segment::*;
    let segments: &'static [Segment] = match ch {
        '0' => &[Top, TopRight, BottomRight, Bottom, BottomLeft, TopLeft],
        '1' => &[TopRight, BottomRight],
        '2' => &[Top, TopRight, Middle, BottomLeft, Bottom],
        '3' => &[Top, TopRight, Middle, BottomRight, Bottom],
        '4' => &[TopLeft, Middle, TopRight, BottomRight],
        '5' => &[Top, TopLeft, Middle, BottomRight, Bottom],
        '6' => &[Top, TopLeft, Middle, BottomLeft, BottomRight, Bottom],
        '7' => &[Top, TopRight, BottomRight],
        '8' => &[Top, TopRight, BottomRight, Bottom, BottomLeft, TopLeft, Middle],
        '9' => &[Top, TopRight, BottomRight, Bottom, TopLeft, Middle],
        _ => return None,
    };
    Some(segments)
}

/// Trapezoid outline of one segment relative to the glyph origin.
fn segment_shape(segment: Segment, w: i32, h: i32, t: i32) -> [Point; 4] {
    const GAP: i32 = 2;
    let p = Point::new;
    let half = h / 2;
    match segment {
        Segment::Top => [p(GAP, 0), p(w - GAP, 0), p(w - GAP - t / 2, t), p(GAP + t / 2, t)],
        Segment::TopRight => [
            p(w - t, GAP),
            p(w, GAP),
            p(w, half - GAP),
            p(w - t, half - GAP - t / 2),
        ],
        Segment::BottomRight => [
            p(w - t, half + GAP + t / 2),
            p(w, half + GAP),
            p(w, h - GAP),
            p(w - t, h - GAP),
        ],
        Segment::Bottom => [
            p(GAP + t / 2, h - t),
            p(w - GAP - t / 2, h - t),
            p(w - GAP, h),
            p(GAP, h),
        ],
        Segment::BottomLeft => [p(0, half + GAP), p(t, half + GAP + t / 2), p(t, h - GAP), p(0, h - GAP)],
        Segment::TopLeft => [p(0, GAP), p(t, GAP), p(t, half - GAP - t / 2), p(0, half - GAP)],
        Segment::Middle => [
            p(GAP + t / 2, half - t / 2),
            p(w - GAP - t / 2, half - t / 2),
            p(w - GAP - t / 2, half + t / 2),
            p(GAP + t / 2, half + t / 2),
        ],
    }
}

/// Seven-segment glyph `size` px tall. Returns the horizontal advance:
/// `w + 12` for digits (and unknown characters, which draw nothing) and
/// `w / 2 + 8` for `:`, where `w = size / 2`.
pub fn segmented_digit<D>(
    target: &mut D,
    color: Rgb888,
    x: i32,
    y: i32,
    ch: char,
    size: u32,
    thickness: u32,
) -> Result<i32, D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let h = size as i32;
    let w = h / 2;
    let t = thickness as i32;

    if ch == ':' {
        let dot = Size::new(thickness + 1, (thickness / 2) * 2 + 1);
        for cy in [h / 3, 2 * h / 3] {
            Ellipse::new(Point::new(x + w / 4, y + cy - t / 2), dot)
                .into_styled(PrimitiveStyle::with_fill(color))
                .draw(target)?;
        }
        return Ok(w / 2 + 8);
    }

    if let Some(segments) = segments_for(ch) {
        let origin = Point::new(x, y);
        for segment in segments {
            fill_quad(target, segment_shape(*segment, w, h, t).map(|p| p + origin), color)?;
        }
    }
    Ok(w + 12)
}

pub fn checkbox<D>(
    target: &mut D,
    theme: &Theme,
    x: i32,
    y: i32,
    checked: bool,
    overdue: bool,
    size: i32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let color = if overdue { theme.accent } else { theme.primary }.rgb();
    outline_rect(target, x, y, x + size, y + size, color, 1)?;
    if checked {
        let knee = Point::new(x + size / 2, y + size - 3);
        line(target, Point::new(x + 3, y + size / 2), knee, color, 2)?;
        line(target, knee, Point::new(x + size - 3, y + 3), color, 2)?;
    }
    Ok(())
}

/// Placeholder box: 15px brackets at each corner and a centred label.
pub fn corner_brackets<D>(
    target: &mut D,
    color: Rgb888,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    label: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    const LEN: i32 = 15;
    let p = Point::new;
    let (r, b) = (x + w, y + h);
    for (from, to) in [
        (p(x, y), p(x + LEN, y)),
        (p(x, y), p(x, y + LEN)),
        (p(r - LEN, y), p(r, y)),
        (p(r, y), p(r, y + LEN)),
        (p(x, b - LEN), p(x, b)),
        (p(x, b), p(x + LEN, b)),
        (p(r - LEN, b), p(r, b)),
        (p(r, b - LEN), p(r, b)),
    ] {
        line(target, from, to, color, 1)?;
    }

    let label_w = text_width(Font::Small, label) as i32;
    let label_h = Font::Small.line_height() as i32;
    text(target, label, x + (w - label_w) / 2, y + (h - label_h) / 2, Font::Small, color)?;
    Ok(())
}

/// Targeting reticle: split crosshair with a 15px centre gap, mil ticks every
/// 20px, corner brackets at `size / 4` and a range circle of radius `size / 5`.
pub fn reticle<D>(target: &mut D, color: Rgb888, cx: i32, cy: i32, size: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    const GAP: i32 = 15;
    const TICK_SPACING: i32 = 20;
    const TICK: i32 = 4;
    const BRACKET: i32 = 30;
    let p = Point::new;
    let arm = size / 3;

    line(target, p(cx - arm, cy), p(cx - GAP, cy), color, 1)?;
    line(target, p(cx + GAP, cy), p(cx + arm, cy), color, 1)?;
    line(target, p(cx, cy - arm), p(cx, cy - GAP), color, 1)?;
    line(target, p(cx, cy + GAP), p(cx, cy + arm), color, 1)?;
    fill_circle(target, p(cx, cy), 2, color)?;

    for i in 1..6 {
        let off = GAP + i * TICK_SPACING;
        if off >= arm {
            break;
        }
        line(target, p(cx - off, cy - TICK), p(cx - off, cy + TICK), color, 1)?;
        line(target, p(cx + off, cy - TICK), p(cx + off, cy + TICK), color, 1)?;
        line(target, p(cx - TICK, cy - off), p(cx + TICK, cy - off), color, 1)?;
        line(target, p(cx - TICK, cy + off), p(cx + TICK, cy + off), color, 1)?;
    }

    let b = size / 4;
    for (sx, sy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
        let corner = p(cx + sx * b, cy + sy * b);
        line(target, corner, corner + p(-sx * BRACKET, 0), color, 1)?;
        line(target, corner, corner + p(0, -sy * BRACKET), color, 1)?;
    }

    outline_circle(target, p(cx, cy), (size / 5).max(0) as u32, color)
}

/// Page indicator in the header: one dot per page, the current one filled.
pub fn page_dots<D>(
    target: &mut D,
    theme: &Theme,
    frame_width: i32,
    index: usize,
    total: usize,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    const RADIUS: i32 = 4;
    const SPACING: i32 = 14;
    const CY: i32 = 24;
    let total = total as i32;
    let dots_width = total * SPACING - (SPACING - RADIUS * 2);
    let start_x = frame_width - dots_width - 15;
    let color = theme.primary.rgb();

    for i in 0..total {
        let center = Point::new(start_x + i * SPACING, CY);
        if i as usize == index {
            fill_circle(target, center, RADIUS as u32, color)?;
        } else {
            outline_circle(target, center, RADIUS as u32, color)?;
        }
    }
    Ok(())
}
