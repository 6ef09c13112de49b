//! Variables of the active directory and the editor log.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use time::macros::format_description;

use crate::app::log::LogStream;
use crate::domain::model::{Dir, LogLevel, LogMessage};

/// Flash badges shown in the log title.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Badges {
    pub saved: bool,
    pub checked: bool,
    pub saving: bool,
    pub checking: bool,
}

#[derive(Debug, Default)]
pub struct LogPanel;

impl LogPanel {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        dir: Option<&Dir>,
        log: &LogStream,
        badges: Badges,
    ) {
        let var_count = dir.map_or(0, |dir| dir.vars.len());
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(variables_height(var_count)),
                Constraint::Min(3),
            ])
            .split(area);

        self.render_variables(frame, layout[0], dir);
        self.render_log(frame, layout[1], log, badges);
    }

    fn render_variables(&self, frame: &mut Frame<'_>, area: Rect, dir: Option<&Dir>) {
        let title = match dir {
            Some(dir) => format!("Variables · {}", dir.path),
            None => "Variables".to_string(),
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let vars = dir.map(|dir| dir.vars.as_slice()).unwrap_or_default();
        if vars.is_empty() {
            let placeholder = Paragraph::new("No variables")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(placeholder, inner);
            return;
        }

        let items: Vec<ListItem> = vars
            .iter()
            .map(|var| {
                let name = if var.is_unnamed() {
                    Span::styled("(unnamed)", Style::default().fg(Color::DarkGray))
                } else {
                    Span::styled(var.name.as_str(), Style::default().fg(Color::Cyan))
                };
                ListItem::new(Line::from(vec![
                    name,
                    Span::raw(" = "),
                    Span::raw(var.value.as_str()),
                ]))
            })
            .collect();
        frame.render_widget(List::new(items), inner);
    }

    fn render_log(&self, frame: &mut Frame<'_>, area: Rect, log: &LogStream, badges: Badges) {
        let mut title = vec![Span::raw("Log")];
        for (on, label, color) in [
            (badges.saving, "saving…", Color::Yellow),
            (badges.checking, "checking…", Color::Yellow),
            (badges.saved, "saved", Color::Green),
            (badges.checked, "checked", Color::Green),
        ] {
            if on {
                title.push(Span::raw(" "));
                title.push(Span::styled(
                    format!("[{label}]"),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ));
            }
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = log
            .entries()
            .take(inner.height as usize)
            .map(entry_line)
            .collect();
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

/// Rows of the variables block: one per variable (at least one) plus borders.
fn variables_height(var_count: usize) -> u16 {
    u16::try_from(var_count.max(1))
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

/// Plain rendering of a log entry without its timestamp.
pub fn entry_text(entry: &LogMessage) -> String {
    format!("{:<7} {}", entry.level.as_str(), entry.text)
}

fn entry_line(entry: &LogMessage) -> Line<'static> {
    let time = entry
        .timestamp
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default();
    Line::from(vec![
        Span::styled(format!("{time} "), Style::default().fg(Color::DarkGray)),
        Span::styled(entry_text(entry), Style::default().fg(level_color(entry.level))),
    ])
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Error => Color::Red,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Info => Color::Gray,
        LogLevel::Success => Color::Green,
    }
}
