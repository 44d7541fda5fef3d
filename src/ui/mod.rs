// UI module for rendering the TUI.
// Contains widgets for tabs, breadcrumbs, record lists and record details.

mod breadcrumb;
mod detail;
mod list;
mod tabs;

use ratatui::{prelude::*, widgets::*};

use crate::app::App;

/// Main draw function that renders the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Length(2), // Breadcrumb
            Constraint::Min(1),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    tabs::draw_tabs(frame, app.nav.category(), chunks[0]);
    breadcrumb::draw_breadcrumb(frame, &app.breadcrumbs(), chunks[1]);

    if app.in_detail() {
        detail::render_detail(frame, app, chunks[2]);
    } else {
        list::render_page(frame, app, chunks[2]);
    }

    draw_status_bar(frame, app, chunks[3]);

    // Help overlay (rendered last, on top of everything)
    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the status bar with keybinding hints, cache stats and location.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut hints = if app.in_detail() {
        vec![
            Span::raw(" ↑↓ "),
            Span::styled("Reference", Style::default().fg(Color::DarkGray)),
            Span::raw("  ↵ "),
            Span::styled("Follow", Style::default().fg(Color::DarkGray)),
            Span::raw("  Esc "),
            Span::styled("Back", Style::default().fg(Color::DarkGray)),
        ]
    } else {
        vec![
            Span::raw(" ↑↓ "),
            Span::styled("Navigate", Style::default().fg(Color::DarkGray)),
            Span::raw("  ←→ "),
            Span::styled("Page", Style::default().fg(Color::DarkGray)),
            Span::raw("  ↵ "),
            Span::styled("Open", Style::default().fg(Color::DarkGray)),
            Span::raw("  Tab "),
            Span::styled("Switch", Style::default().fg(Color::DarkGray)),
        ]
    };
    hints.extend([
        Span::raw("  r "),
        Span::styled("Refresh", Style::default().fg(Color::DarkGray)),
        Span::raw("  ? "),
        Span::styled("Help", Style::default().fg(Color::DarkGray)),
        Span::raw("  q "),
        Span::styled("Quit", Style::default().fg(Color::DarkGray)),
    ]);

    let right = match app.status() {
        Some(msg) => Span::styled(format!("{} ", msg), Style::default().fg(Color::Yellow)),
        None => {
            let stats = app.cache.stats();
            let fetching = if stats.in_flight > 0 {
                format!(" ⏳{}", stats.in_flight)
            } else {
                String::new()
            };
            Span::styled(
                format!(
                    "{}  {}p/{}r{} ",
                    app.nav.location(),
                    stats.pages,
                    stats.records,
                    fetching
                ),
                Style::default().fg(Color::DarkGray),
            )
        }
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
    frame.render_widget(
        Paragraph::new(Line::from(right)).alignment(Alignment::Right),
        area,
    );
}

/// Draw the help overlay.
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    // Create a centered popup
    let popup_width = 50;
    let popup_height = 17;
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(
        popup_x,
        popup_y,
        popup_width.min(area.width),
        popup_height.min(area.height),
    );

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let bindings = [
        ("  Tab/S-Tab     ", "Next / previous category"),
        ("  ←/→ or h/l    ", "Previous / next page"),
        ("  ↑/↓ or j/k    ", "Select card or reference"),
        ("  Enter         ", "Open record / follow reference"),
        ("  Esc           ", "Back / close help"),
        ("  r             ", "Refresh current view"),
        ("  ?             ", "Show/hide this help"),
        ("  q             ", "Quit"),
    ];

    let mut help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
    ];
    help_text.extend(bindings.iter().map(|(keys, action)| {
        Line::from(vec![
            Span::styled(*keys, Style::default().fg(Color::Cyan)),
            Span::raw(*action),
        ])
    }));
    help_text.extend([
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "Location is printed on exit; resume with ",
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled("--location", Style::default().fg(Color::Yellow)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::styled(" or ", Style::default().fg(Color::DarkGray)),
            Span::styled("?", Style::default().fg(Color::Yellow)),
            Span::styled(" to close", Style::default().fg(Color::DarkGray)),
        ]),
    ]);

    let help_paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help ")
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: false })
        .alignment(Alignment::Left);

    frame.render_widget(help_paragraph, popup_area);
}
