// Record detail rendering.
// Shows every display field of the focused record, resolving references inline.

use ratatui::{prelude::*, widgets::*};

use crate::app::App;
use crate::cache::{Descriptor, ReferenceState};
use crate::swapi::{Address, FieldValue, display_fields};

use super::list::{render_error, render_loading};

pub fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(address) = app.nav.focused_address() else {
        return;
    };
    let state = app.cache.get(&Descriptor::Address(address.clone()));

    let Some(record) = state.record() else {
        match &state.error {
            Some(error) => render_error(frame, area, &error.to_string()),
            None => render_loading(frame, area, "Loading record"),
        }
        return;
    };

    let selected = app.detail.list_state.selected();
    let mut lines: Vec<Line> = Vec::new();
    let mut target_index = 0;
    let mut selected_line = 0;

    for field in display_fields(record) {
        let label = Span::styled(
            format!("{}: ", field.label),
            Style::default().fg(Color::DarkGray),
        );
        match &field.value {
            FieldValue::Text(text) => {
                lines.push(Line::from(vec![label, Span::raw(text.clone())]));
            }
            FieldValue::Unset => {
                lines.push(Line::from(vec![
                    label,
                    Span::styled("n/a", Style::default().fg(Color::DarkGray)),
                ]));
            }
            FieldValue::References(targets) if targets.is_empty() => {
                lines.push(Line::from(vec![
                    label,
                    Span::styled("none", Style::default().fg(Color::DarkGray)),
                ]));
            }
            FieldValue::Reference(_) | FieldValue::References(_) => {
                lines.push(Line::from(label));
                for target in field.targets() {
                    let is_selected = selected == Some(target_index);
                    if is_selected {
                        selected_line = lines.len();
                    }
                    lines.push(reference_line(app, target, is_selected));
                    target_index += 1;
                }
            }
        }
    }

    // Keep the selected reference in view.
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = selected_line.saturating_sub(visible.saturating_sub(1)) as u16;

    let title = format!(" {} · {} ", record.display_name(), record.category().title());
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

/// One cross-reference: resolved name, a placeholder, or its own error.
fn reference_line(app: &App, target: &Address, selected: bool) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let span = match app.cache.reference(target) {
        ReferenceState::Resolved { name, .. } => Span::styled(name, Style::default().fg(Color::Cyan)),
        ReferenceState::Pending => Span::styled("…", Style::default().fg(Color::DarkGray)),
        ReferenceState::Failed(error) => {
            Span::styled(format!("❌ {}", error), Style::default().fg(Color::Red))
        }
    };
    let line = Line::from(vec![Span::raw(format!("  {}", marker)), span]);
    if selected {
        line.style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        line
    }
}
