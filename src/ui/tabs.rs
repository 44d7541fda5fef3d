// Tab bar rendering.
// One tab per catalog category, with the active one highlighted.

use ratatui::{prelude::*, widgets::*};

use crate::swapi::Category;

/// Draw the tab bar at the top of the screen.
pub fn draw_tabs(frame: &mut Frame, active: Category, area: Rect) {
    let tab_titles: Vec<Line> = Category::ALL
        .iter()
        .map(|category| {
            let style = if *category == active {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(category.title(), style))
        })
        .collect();

    let selected_index = Category::ALL
        .iter()
        .position(|c| *c == active)
        .unwrap_or(0);

    let tabs_widget = Tabs::new(tab_titles)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" holocron ")
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .select(selected_index)
        .highlight_style(Style::default().fg(Color::Yellow))
        .divider(Span::raw(" │ "));

    frame.render_widget(tabs_widget, area);
}
