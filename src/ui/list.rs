// Record list rendering.
// Cards for the active page plus a pagination bar, with loading, error and empty states.

use ratatui::{prelude::*, widgets::*};

use crate::app::App;
use crate::state::PageView;
use crate::swapi::{Record, summary_fields};

/// Render a loading indicator.
pub fn render_loading(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(format!("⏳ {}…", message))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(text, area);
}

/// Render an error message.
pub fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let text = Paragraph::new(format!("❌ {}", error))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    frame.render_widget(text, area);
}

/// Render an empty state message.
pub fn render_empty(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(text, area);
}

/// Render the active page of the active category.
pub fn render_page(frame: &mut Frame, app: &mut App, area: Rect) {
    let category = app.nav.category();

    let (page, placeholder, refetching, error) = match app.browse.view().clone() {
        PageView::Loading => {
            render_loading(frame, area, &format!("Loading {}", category.title()));
            return;
        }
        PageView::Failed(e) => {
            render_error(frame, area, &e.to_string());
            return;
        }
        PageView::Ready {
            page,
            placeholder,
            refetching,
            error,
        } => (page, placeholder, refetching, error),
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    if page.results.is_empty() {
        render_empty(frame, chunks[0], &format!("No {} on this page", category.title()));
    } else {
        let items: Vec<ListItem> = page
            .results
            .iter()
            .map(|record| record_card(record, placeholder))
            .collect();

        let title = if refetching {
            format!(" {} ⏳ ", category.title())
        } else {
            format!(" {} ", category.title())
        };

        let list_widget = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        frame.render_stateful_widget(list_widget, chunks[0], &mut app.browse.list_state);
    }

    let total = page.total_pages().max(1);
    let has_prev = !placeholder && page.has_previous();
    let has_next = !placeholder && page.has_next();
    let enabled = |on: bool| {
        if on {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let mut spans = vec![
        Span::styled("◀ Prev", enabled(has_prev)),
        Span::raw(format!("   Page {} of {}   ", app.nav.page(), total)),
        Span::styled("Next ▶", enabled(has_next)),
    ];
    if let Some(error) = error {
        spans.push(Span::styled(
            format!("   ❌ {}", error),
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        chunks[1],
    );
}

/// A two-line card: display name, then the category's summary fields.
fn record_card(record: &Record, dimmed: bool) -> ListItem<'static> {
    let (name_style, detail_style) = if dimmed {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            Style::default().fg(Color::Cyan),
            Style::default().fg(Color::Gray),
        )
    };

    let summary = summary_fields(record)
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join("  ·  ");

    ListItem::new(vec![
        Line::from(Span::styled(record.display_name().to_string(), name_style)),
        Line::from(Span::styled(format!("  {}", summary), detail_style)),
    ])
}
