//! Source editor pane: numbered content, a text cursor, and the surfaced diagnostic.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::check::SurfacedDiagnostic;
use crate::app::mapper::offset_to_coordinate;
use crate::domain::model::{BuildError, ErrorCoordinate};

/// Byte offset of the text cursor inside the selected source's content.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EditCursor {
    offset: usize,
}

impl EditCursor {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn position(&self, text: &str) -> ErrorCoordinate {
        offset_to_coordinate(text, self.offset)
    }

    /// Pull the cursor back inside `text` after the content changed underneath it.
    pub fn clamp(&mut self, text: &str) {
        self.offset = floor_boundary(text, self.offset.min(text.len()));
    }

    pub fn insert(&mut self, text: &str, ch: char) -> String {
        self.clamp(text);
        let mut updated = String::with_capacity(text.len() + ch.len_utf8());
        updated.push_str(&text[..self.offset]);
        updated.push(ch);
        updated.push_str(&text[self.offset..]);
        self.offset += ch.len_utf8();
        updated
    }

    /// Delete the character before the cursor. `None` at the start of the text.
    pub fn backspace(&mut self, text: &str) -> Option<String> {
        self.clamp(text);
        let previous = text[..self.offset].chars().next_back()?;
        let start = self.offset - previous.len_utf8();
        let mut updated = String::with_capacity(text.len());
        updated.push_str(&text[..start]);
        updated.push_str(&text[self.offset..]);
        self.offset = start;
        Some(updated)
    }

    pub fn left(&mut self, text: &str) {
        self.clamp(text);
        if let Some(previous) = text[..self.offset].chars().next_back() {
            self.offset -= previous.len_utf8();
        }
    }

    pub fn right(&mut self, text: &str) {
        self.clamp(text);
        if let Some(next) = text[self.offset..].chars().next() {
            self.offset += next.len_utf8();
        }
    }

    pub fn up(&mut self, text: &str) {
        let here = self.position(text);
        if here.line > 0 {
            self.move_to(text, here.line - 1, here.column);
        }
    }

    pub fn down(&mut self, text: &str) {
        let here = self.position(text);
        if here.line + 1 < line_starts(text).len() {
            self.move_to(text, here.line + 1, here.column);
        }
    }

    fn move_to(&mut self, text: &str, line: usize, column: usize) {
        let starts = line_starts(text);
        let Some(&start) = starts.get(line) else {
            return;
        };
        let end = starts
            .get(line + 1)
            .map_or(text.len(), |next| next.saturating_sub(1));
        self.offset = floor_boundary(text, (start + column).min(end));
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

fn floor_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Content of the pane. `None` draws a placeholder.
#[derive(Debug, Clone, Copy)]
pub struct SourceDocument<'a> {
    pub qualified_name: &'a str,
    pub content: &'a str,
    pub diagnostic: Option<&'a SurfacedDiagnostic>,
}

#[derive(Debug, Default)]
pub struct SourceView;

impl SourceView {
    pub fn render(
        &self,
        document: Option<SourceDocument<'_>>,
        cursor: Option<EditCursor>,
        has_focus: bool,
        area: Rect,
        buf: &mut Buffer,
    ) {
        let border_color = if has_focus {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let Some(document) = document else {
            let block = Block::default()
                .title("Source")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color));
            let inner = block.inner(area);
            block.render(area, buf);
            Paragraph::new("Select a source to edit")
                .style(
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )
                .render(inner, buf);
            return;
        };

        let error = document.diagnostic.map(|shown| &shown.error);
        let mut title = vec![Span::raw(format!(" {} ", document.qualified_name))];
        if let Some(shown) = document.diagnostic {
            title.push(Span::styled(
                format!(" {} ", shown.error.summary()),
                Style::default().fg(Color::White).bg(Color::Red),
            ));
            if shown.reported > 1 {
                title.push(Span::styled(
                    format!(" +{} more ", shown.reported - 1),
                    Style::default().fg(Color::Red),
                ));
            }
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        block.render(area, buf);

        let cursor = cursor
            .filter(|_| has_focus)
            .map(|cursor| cursor.position(document.content));
        let lines: Vec<Line> = document
            .content
            .split('\n')
            .enumerate()
            .map(|(idx, text)| numbered_line(idx, text, error, cursor))
            .collect();

        // Keep the cursor line on screen.
        let scroll = cursor
            .map(|at| at.line.saturating_sub(inner.height.saturating_sub(1) as usize))
            .unwrap_or(0);
        Paragraph::new(lines)
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
            .render(inner, buf);
    }
}

fn numbered_line<'a>(
    idx: usize,
    text: &'a str,
    error: Option<&BuildError>,
    cursor: Option<ErrorCoordinate>,
) -> Line<'a> {
    let flagged = error.is_some_and(|error| error.covers_line(idx));
    let gutter_style = if flagged {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![Span::styled(format!("{:>4} │ ", idx + 1), gutter_style)];

    let text_style = if flagged {
        Style::default().bg(Color::Rgb(70, 24, 24))
    } else {
        Style::default()
    };
    match cursor.filter(|at| at.line == idx) {
        Some(at) => {
            let column = floor_boundary(text, at.column.min(text.len()));
            let (before, rest) = text.split_at(column);
            let mut chars = rest.chars();
            let under = chars.next().map_or(" ".to_string(), String::from);
            spans.push(Span::styled(before, text_style));
            spans.push(Span::styled(
                under,
                text_style.add_modifier(Modifier::REVERSED),
            ));
            spans.push(Span::styled(chars.as_str(), text_style));
        }
        None => spans.push(Span::styled(text, text_style)),
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::app::check::CheckTarget;

    #[test]
    fn cursor_edits_insert_and_delete() {
        let mut cursor = EditCursor::default();
        let text = cursor.insert("bc", 'a');
        assert_eq!(text, "abc");
        assert_eq!(cursor.offset(), 1);

        cursor.right(&text);
        let text = cursor.insert(&text, 'é');
        assert_eq!(text, "abéc");
        let text = cursor.backspace(&text).unwrap();
        assert_eq!(text, "abc");

        cursor.reset();
        assert!(cursor.backspace(&text).is_none());
    }

    #[test]
    fn vertical_moves_clamp_to_line_length() {
        let text = "long line\nab\nxyz";
        let mut cursor = EditCursor::default();
        for _ in 0..7 {
            cursor.right(text);
        }
        cursor.down(text);
        assert_eq!(cursor.position(text), ErrorCoordinate::new(1, 2));
        cursor.down(text);
        assert_eq!(cursor.position(text), ErrorCoordinate::new(2, 2));
        cursor.down(text);
        assert_eq!(cursor.position(text), ErrorCoordinate::new(2, 2));
        cursor.up(text);
        cursor.up(text);
        assert_eq!(cursor.position(text), ErrorCoordinate::new(0, 2));
    }

    #[test]
    fn clamp_respects_char_boundaries() {
        let mut cursor = EditCursor { offset: 2 };
        cursor.clamp("é");
        assert_eq!(cursor.offset(), 2);
        let mut cursor = EditCursor { offset: 1 };
        cursor.clamp("é");
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn renders_diagnostic_in_title() {
        let backend = TestBackend::new(50, 6);
        let mut terminal = Terminal::new(backend).unwrap();
        let diagnostic = SurfacedDiagnostic {
            target: CheckTarget::new("a", "x"),
            error: BuildError {
                start_offset: 0,
                end_offset: 3,
                start_coordinate: ErrorCoordinate::new(0, 0),
                end_coordinate: ErrorCoordinate::new(0, 3),
                message: "bad".into(),
            },
            reported: 1,
        };
        let document = SourceDocument {
            qualified_name: "a/x",
            content: "bad\nok",
            diagnostic: Some(&diagnostic),
        };

        terminal
            .draw(|frame| {
                let area = frame.size();
                SourceView.render(
                    Some(document),
                    Some(EditCursor::default()),
                    true,
                    area,
                    frame.buffer_mut(),
                );
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("a/x"));
        assert!(text.contains("(0,0): bad"));
        assert!(text.contains("2 │ ok"));
    }
}
