//! Command palette component for quick actions.

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub const HELP: &str = "Commands: check, save, reload, add-source, rm-source, rename <name>, \
add-var, var <name>=<value>, rename-var <old> <new>, rm-var <name>, update-builds on|off";

/// Parsed palette input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteCommand {
    Check,
    Save,
    Reload,
    AddSource,
    RemoveSource,
    RenameSource(String),
    AddVariable,
    SetVariable { name: String, value: String },
    RenameVariable { old: String, new: String },
    RemoveVariable(String),
    UpdateBuilds(bool),
    Help,
}

impl PaletteCommand {
    /// Parse a palette line. Empty input yields `None`.
    pub fn parse(input: &str) -> Result<Option<Self>> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (input, ""),
        };

        let command = match verb {
            "check" => PaletteCommand::Check,
            "save" => PaletteCommand::Save,
            "reload" => PaletteCommand::Reload,
            "add-source" => PaletteCommand::AddSource,
            "rm-source" => PaletteCommand::RemoveSource,
            "rename" => {
                if rest.is_empty() {
                    bail!("rename requires a new source name");
                }
                PaletteCommand::RenameSource(rest.to_string())
            }
            "add-var" => PaletteCommand::AddVariable,
            "var" => {
                let (name, value) = rest
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected var <name>=<value>"))?;
                let name = name.trim();
                if name.is_empty() {
                    bail!("variable name must not be empty");
                }
                PaletteCommand::SetVariable {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "rename-var" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(old), Some(new), None) => PaletteCommand::RenameVariable {
                        old: old.to_string(),
                        new: new.to_string(),
                    },
                    _ => bail!("expected rename-var <old> <new>"),
                }
            }
            "rm-var" => {
                if rest.is_empty() {
                    bail!("rm-var requires a variable name");
                }
                PaletteCommand::RemoveVariable(rest.to_string())
            }
            "update-builds" => match rest {
                "on" | "true" => PaletteCommand::UpdateBuilds(true),
                "off" | "false" => PaletteCommand::UpdateBuilds(false),
                _ => bail!("expected update-builds on|off"),
            },
            "help" => PaletteCommand::Help,
            other => bail!("unknown command '{other}'"),
        };
        Ok(Some(command))
    }
}

/// Interactive state backing the command palette overlay.
#[derive(Debug, Default, Clone)]
pub struct CommandPaletteState {
    visible: bool,
    input: String,
    message: Option<PaletteMessage>,
}

impl CommandPaletteState {
    /// Reveal the palette with an empty input buffer.
    pub fn open(&mut self) {
        self.visible = true;
        self.input.clear();
    }

    /// Reveal the palette with an initial command prefilled.
    pub fn open_with<S: Into<String>>(&mut self, content: S) {
        self.visible = true;
        self.input = content.into();
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Consume the current input, leaving the buffer empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Record a status message to display beneath the input field.
    pub fn set_message<S: Into<String>>(&mut self, level: PaletteMessageLevel, message: S) {
        self.message = Some(PaletteMessage::new(level, message.into()));
    }

    /// Retain only messages that have not expired.
    pub fn purge_expired_messages(&mut self) {
        if let Some(message) = &self.message
            && message.is_expired()
        {
            self.message = None;
        }
    }
}

/// Visual component that renders the command palette overlay.
#[derive(Debug, Default)]
pub struct CommandPalette;

impl CommandPalette {
    /// Draw the palette if it is visible.
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &CommandPaletteState) {
        if !state.is_open() {
            return;
        }

        let width = area.width.saturating_sub(10).min(80);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(6),
            width,
            height: 5.min(area.height),
        };

        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title("Command Palette")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(block.clone(), popup);

        let inner = block.inner(popup);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        let prompt = Paragraph::new(format!(":{}", state.input()))
            .style(Style::default().fg(Color::White));
        frame.render_widget(prompt, layout[0]);

        let (text, style) = match &state.message {
            Some(message) => (
                message.text.clone(),
                match message.level {
                    PaletteMessageLevel::Info => Style::default().fg(Color::Gray),
                    PaletteMessageLevel::Error => {
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                    }
                },
            ),
            None => (HELP.to_string(), Style::default().fg(Color::DarkGray)),
        };
        let paragraph = Paragraph::new(Line::from(text))
            .wrap(Wrap { trim: true })
            .style(style);
        frame.render_widget(paragraph, layout[1]);
    }
}

/// Command palette message severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteMessageLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
struct PaletteMessage {
    level: PaletteMessageLevel,
    text: String,
    expires_at: Instant,
}

impl PaletteMessage {
    fn new(level: PaletteMessageLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
