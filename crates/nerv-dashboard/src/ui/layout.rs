use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::ui::draw::Font;

/// Side margin and content top of a page below the header chrome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub width_px: u32,
    pub height_px: u32,
    pub margin: i32,
    pub content_top: i32,
}

impl PageLayout {
    pub const MARGIN: i32 = 20;
    pub const CONTENT_TOP: i32 = 45;

    pub fn from_dimensions(width_px: u32, height_px: u32) -> Self {
        let height = height_px as i32;
        Self {
            width_px,
            height_px,
            margin: Self::MARGIN.min(width_px as i32 / 4),
            content_top: Self::CONTENT_TOP.min(height.saturating_sub(1).max(0)),
        }
    }

    pub fn width(&self) -> i32 {
        self.width_px as i32
    }

    pub fn height(&self) -> i32 {
        self.height_px as i32
    }

    pub fn content_width(&self) -> i32 {
        (self.width() - self.margin * 2).max(1)
    }
}

pub fn chars_that_fit(width_px: u32, char_width_px: u32) -> usize {
    if char_width_px == 0 {
        return 1;
    }
    (width_px / char_width_px).max(1) as usize
}

/// Rendered width of `text` in a monospace font.
pub fn text_width(font: Font, text: &str) -> u32 {
    text.chars().count() as u32 * font.advance()
}

/// Truncates to at most `max_chars`, marking the cut with `..`.
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 2 {
        return text.chars().take(max_chars).collect();
    }
    let head: String = text.chars().take(max_chars - 2).collect();
    format!("{head}..")
}

pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    for source_line in text.lines() {
        if source_line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for token in source_line.split_whitespace() {
            if token.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let mut chunk = String::new();
                for ch in token.chars() {
                    chunk.push(ch);
                    if chunk.chars().count() == max_chars {
                        lines.push(std::mem::take(&mut chunk));
                    }
                }
                current = chunk;
                continue;
            }

            let candidate_len = if current.is_empty() {
                token.chars().count()
            } else {
                current.chars().count() + 1 + token.chars().count()
            };

            if candidate_len <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(token);
            } else {
                lines.push(std::mem::replace(&mut current, token.to_string()));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        vec![text.to_string()]
    } else {
        lines
    }
}

/// Splits `area` into `cols` x `rows` equal cells separated by `gap`, row by row.
pub fn grid(area: Rectangle, cols: u32, rows: u32, gap: u32) -> Vec<Rectangle> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let cell_w = area.size.width.saturating_sub(gap * (cols - 1)) / cols;
    let cell_h = area.size.height.saturating_sub(gap * (rows - 1)) / rows;
    let mut cells = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let origin = area.top_left
                + Point::new(
                    (col * (cell_w + gap)) as i32,
                    (row * (cell_h + gap)) as i32,
                );
            cells.push(Rectangle::new(origin, Size::new(cell_w, cell_h)));
        }
    }
    cells
}
