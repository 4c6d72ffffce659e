use anyhow::Result;
use nerv_feeds::{NotionClient, Todo};

use super::{draw_chrome, Page, RenderContext};
use crate::frame::Frame;
use crate::palette::Theme;
use crate::ui::draw::{self, Font};
use crate::ui::layout::{ellipsize, PageLayout};

const MAX_ITEMS: usize = 14;
const MAX_TITLE_CHARS: usize = 38;
const LINE_HEIGHT: i32 = 24;
const CHECKBOX_SIZE: i32 = 14;

/// Today's and overdue tasks from the Notion database.
pub struct TodosPage {
    notion: Option<NotionClient>,
}

impl TodosPage {
    pub fn new(notion: Option<NotionClient>) -> Self {
        Self { notion }
    }
}

fn draw_item(frame: &mut Frame, theme: &Theme, x: i32, y: i32, todo: &Todo, max_width: i32) -> Result<()> {
    draw::checkbox(frame, theme, x, y + 1, todo.done, todo.is_overdue, CHECKBOX_SIZE)?;

    let color = if todo.done {
        theme.secondary
    } else if todo.is_overdue {
        theme.accent
    } else {
        theme.primary
    };
    let title = ellipsize(&todo.title, MAX_TITLE_CHARS);
    draw::text(frame, &title, x + 22, y, Font::Small, color.rgb())?;

    if todo.is_overdue {
        if let Some(due) = todo.due {
            let due = due.format("%m/%d").to_string();
            draw::text(frame, &due, x + max_width - 40, y, Font::Small, theme.accent.rgb())?;
        }
    }
    Ok(())
}

impl Page for TodosPage {
    fn name(&self) -> &'static str {
        "todos"
    }

    fn title(&self) -> &'static str {
        "TASK LIST"
    }

    fn render(&mut self, frame: &mut Frame, ctx: &RenderContext<'_>) -> Result<()> {
        draw_chrome(frame, ctx, self.title())?;
        let theme = ctx.theme;
        let layout = PageLayout::from_dimensions(frame.width(), frame.height());
        let margin = layout.margin;
        let top = layout.content_top;
        let width = layout.width();
        let height = layout.height();

        let todos = match self.notion.as_mut() {
            Some(notion) => notion.get_todos_for_display(ctx.now),
            None => Vec::new(),
        };

        let heading = ctx.now.format("%A, %B %d").to_string().to_uppercase();
        draw::text(frame, &heading, margin, top, Font::Medium, theme.primary.rgb())?;
        draw::text(frame, "TODAY'S TASKS", margin, top + 28, Font::Small, theme.accent.rgb())?;

        let overdue = todos.iter().filter(|t| t.is_overdue).count();
        if overdue > 0 {
            let label = format!("OVERDUE: {overdue}");
            draw::text(frame, &label, width - margin - 120, top + 28, Font::Small, theme.accent.rgb())?;
        }

        let mut item_y = top + 55;
        let secondary = theme.secondary.rgb();
        if todos.is_empty() {
            draw::text(frame, "No tasks due today", margin + 22, item_y, Font::Small, secondary)?;
            draw::text(
                frame,
                "Check config/secrets.json for Notion setup",
                margin + 22,
                item_y + LINE_HEIGHT,
                Font::Small,
                secondary,
            )?;
        } else {
            for todo in todos.iter().take(MAX_ITEMS) {
                draw_item(frame, theme, margin, item_y, todo, layout.content_width())?;
                item_y += LINE_HEIGHT;
            }
            if todos.len() > MAX_ITEMS {
                let more = format!("+ {} more tasks...", todos.len() - MAX_ITEMS);
                draw::text(frame, &more, margin, item_y, Font::Small, secondary)?;
            }
        }

        draw::border_frame(
            frame,
            theme,
            margin - 5,
            top - 5,
            width - margin * 2 + 10,
            height - top - 25,
            2,
        )?;

        if let Some(updated) = self.notion.as_ref().and_then(|n| n.last_updated()) {
            let stamp = format!("Updated: {}", updated.format("%H:%M"));
            draw::text(frame, &stamp, width - margin - 100, height - 35, Font::Small, secondary)?;
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        if let Some(notion) = self.notion.as_mut() {
            notion.invalidate();
        }
    }
}
