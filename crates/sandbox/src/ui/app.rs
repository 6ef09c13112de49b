//! Application loop for the TUI.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::app::check::{CheckOutcome, CheckRequest, run_check};
use crate::app::editor::{Editor, EditorOptions};
use crate::app::persist::{LoadOutcome, SaveOutcome, SaveRequest, run_load, run_save};
use crate::app::selection::Selection;
use crate::app::session::{SessionSnapshot, SessionStore};
use crate::infra::config::Config;
use crate::infra::http::HttpBackend;
use crate::ui::components::command_palette::{
    CommandPalette, CommandPaletteState, HELP, PaletteCommand, PaletteMessageLevel,
};
use crate::ui::components::dir_tree::{DirTree, DirTreeState, TreeNode};
use crate::ui::components::log_panel::{Badges, LogPanel};
use crate::ui::components::source_view::{EditCursor, SourceDocument, SourceView};
use crate::ui::keymap::Keymap;

const TICK_RATE: Duration = Duration::from_millis(120);

/// Result of a network task, delivered back to the UI thread.
#[derive(Debug)]
enum Outcome {
    Loaded { generation: u64, outcome: LoadOutcome },
    Saved(SaveOutcome),
    Checked(CheckOutcome),
}

/// Primary entry point for running the interactive TUI.
pub struct UiApp {
    editor: Editor,
    backend: Arc<HttpBackend>,
    runtime: Handle,
    outcome_tx: UnboundedSender<Outcome>,
    outcome_rx: UnboundedReceiver<Outcome>,
    keymap: Keymap,
    tree: DirTreeState,
    cursor: EditCursor,
    palette_state: CommandPaletteState,
    session_store: SessionStore,
    pending_restore: Option<Selection>,
    load_generation: u64,
    status: Option<StatusMessage>,
    focus: FocusTarget,
    should_quit: bool,
}

impl UiApp {
    pub fn new(config: &Config, backend: HttpBackend, runtime: Handle, root: PathBuf) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            editor: Editor::new(EditorOptions::from_config(config)),
            backend: Arc::new(backend),
            runtime,
            outcome_tx,
            outcome_rx,
            keymap: Keymap::from_config(&config.keybindings),
            tree: DirTreeState::default(),
            cursor: EditCursor::default(),
            palette_state: CommandPaletteState::default(),
            session_store: SessionStore::new(root),
            pending_restore: None,
            load_generation: 0,
            status: None,
            focus: FocusTarget::Tree,
            should_quit: false,
        }
    }

    /// Launch the terminal UI and enter the event loop.
    pub fn run(&mut self) -> Result<()> {
        self.bootstrap()?;

        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
        terminal.hide_cursor().ok();

        let event_loop_result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        if let Err(err) = self.save_session() {
            tracing::warn!(error = %err, "failed to persist session");
        }
        event_loop_result
    }

    fn bootstrap(&mut self) -> Result<()> {
        match self.session_store.load() {
            Ok(Some(snapshot)) => {
                self.pending_restore = snapshot.selection_for(self.backend.base_url()).cloned();
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable session"),
        }
        self.spawn_load();
        Ok(())
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;
            self.tick(Instant::now());

            if self.should_quit {
                break;
            }

            if event::poll(TICK_RATE)? {
                let ev = event::read()?;
                self.handle_event(ev)?;
            }
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(2)])
            .split(size);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(28),
                Constraint::Min(40),
                Constraint::Length(44),
            ])
            .split(layout[0]);

        let workspace = self.editor.workspace();
        DirTree.render(
            frame,
            main_chunks[0],
            &self.tree,
            workspace.selection(),
            workspace.registry().is_loaded(),
            self.focus == FocusTarget::Tree,
        );

        let qualified = workspace
            .selected_pair()
            .map(|(dir, source)| (dir.qualified_name(source), source.content.as_str()));
        let document = qualified.as_ref().map(|(name, content)| SourceDocument {
            qualified_name: name,
            content,
            diagnostic: self.editor.diagnostic(),
        });
        SourceView.render(
            document,
            Some(self.cursor),
            self.focus == FocusTarget::Editor,
            main_chunks[1],
            frame.buffer_mut(),
        );

        let now = Instant::now();
        LogPanel.render(
            frame,
            main_chunks[2],
            workspace.active_dir(),
            self.editor.log(),
            Badges {
                saved: self.editor.saved_flash(now),
                checked: self.editor.checked_flash(now),
                saving: self.editor.is_saving(),
                checking: self.editor.is_checking(),
            },
        );

        self.render_status(frame, layout[1]);
        CommandPalette.render(frame, size, &self.palette_state);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let line = match &self.status {
            Some(status) => {
                let style = match status.level {
                    StatusLevel::Info => Style::default().fg(Color::Gray),
                    StatusLevel::Error => Style::default().fg(Color::Red),
                };
                Line::styled(status.text.clone(), style)
            }
            None => Line::from(vec![
                Span::styled(
                    self.backend.base_url().to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    " · : commands · tab switch pane · ctrl+q quit",
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        };
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn tick(&mut self, now: Instant) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome, now);
        }
        self.editor.tick(now);
        if let Some(status) = &self.status
            && status.is_expired(now)
        {
            self.status = None;
        }
        self.palette_state.purge_expired_messages();
    }

    fn apply_outcome(&mut self, outcome: Outcome, now: Instant) {
        match outcome {
            Outcome::Loaded { generation, outcome } => {
                if generation != self.load_generation {
                    tracing::debug!(generation, latest = self.load_generation, "discarding reload");
                    return;
                }
                if self.editor.apply_load(outcome)
                    && let Some(selection) = self.pending_restore.take()
                {
                    self.editor.restore_selection(selection);
                }
                self.sync_tree();
            }
            Outcome::Saved(outcome) => self.editor.apply_save(outcome, now),
            Outcome::Checked(outcome) => {
                self.editor.apply_check(outcome, now);
            }
        }
    }

    /// Start a reload. Only the most recently started reload is applied.
    fn spawn_load(&mut self) {
        self.load_generation += 1;
        let generation = self.load_generation;
        let backend = Arc::clone(&self.backend);
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let outcome = run_load(backend.as_ref()).await;
            let _ = tx.send(Outcome::Loaded {
                generation,
                outcome,
            });
        });
    }

    fn spawn_save(&self, request: SaveRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let outcome = run_save(backend.as_ref(), request).await;
            let _ = tx.send(Outcome::Saved(outcome));
        });
    }

    fn spawn_check(&self, request: CheckRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let outcome = run_check(backend.as_ref(), request).await;
            let _ = tx.send(Outcome::Checked(outcome));
        });
    }

    fn check(&mut self) {
        if let Some(request) = self.editor.request_check() {
            self.spawn_check(request);
        }
    }

    fn save(&mut self) {
        if self.editor.is_saving() {
            self.set_status(StatusLevel::Info, "A save is already in progress");
            return;
        }
        let request = self.editor.request_save();
        self.spawn_save(request);
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.handle_key_event(key)?,
            Event::Paste(text) if self.focus == FocusTarget::Editor => {
                for ch in text.chars() {
                    self.insert_char(ch);
                }
            }
            Event::Resize(..) | Event::Mouse(_) => {}
            Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if self.palette_state.is_open() {
            return self.handle_palette_key(key);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return Ok(());
        }

        let typing = self.focus == FocusTarget::Editor;
        if self.keymap.check.matches(&key) && (self.keymap.check.is_chord() || !typing) {
            self.check();
            return Ok(());
        }
        if self.keymap.save.matches(&key) && (self.keymap.save.is_chord() || !typing) {
            self.save();
            return Ok(());
        }

        match self.focus {
            FocusTarget::Tree => self.handle_tree_key(key),
            FocusTarget::Editor => {
                self.handle_editor_key(key);
                Ok(())
            }
        }
    }

    fn handle_tree_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.keymap.down.matches(&key) || key.code == KeyCode::Down {
            self.tree.select_next();
            self.select_tree_node();
            return Ok(());
        }
        if self.keymap.up.matches(&key) || key.code == KeyCode::Up {
            self.tree.select_previous();
            self.select_tree_node();
            return Ok(());
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char(':') => {
                self.palette_state.open();
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.tree.collapse_or_parent();
                self.select_tree_node();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.tree.expand();
            }
            KeyCode::Enter | KeyCode::Tab => {
                self.select_tree_node();
                if self.editor.workspace().selected_pair().is_some() {
                    self.focus = FocusTarget::Editor;
                }
            }
            KeyCode::Char('r') => {
                self.spawn_load();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some((path, name, content)) = self.selected_content() else {
            self.focus = FocusTarget::Tree;
            return;
        };

        let updated = match key.code {
            KeyCode::Esc | KeyCode::Tab => {
                self.focus = FocusTarget::Tree;
                None
            }
            KeyCode::Left => {
                self.cursor.left(&content);
                None
            }
            KeyCode::Right => {
                self.cursor.right(&content);
                None
            }
            KeyCode::Up => {
                self.cursor.up(&content);
                None
            }
            KeyCode::Down => {
                self.cursor.down(&content);
                None
            }
            KeyCode::Enter => Some(self.cursor.insert(&content, '\n')),
            KeyCode::Backspace => self.cursor.backspace(&content),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(self.cursor.insert(&content, ch))
            }
            _ => None,
        };

        if let Some(updated) = updated {
            self.editor.set_content(&path, &name, updated);
        }
    }

    fn insert_char(&mut self, ch: char) {
        if let Some((path, name, content)) = self.selected_content() {
            let updated = self.cursor.insert(&content, ch);
            self.editor.set_content(&path, &name, updated);
        }
    }

    fn selected_content(&self) -> Option<(String, String, String)> {
        self.editor
            .workspace()
            .selected_pair()
            .map(|(dir, source)| {
                (
                    dir.path.clone(),
                    source.name.clone(),
                    source.content.clone(),
                )
            })
    }

    fn handle_palette_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.palette_state.close();
            }
            KeyCode::Enter => {
                let input = self.palette_state.take_input();
                match PaletteCommand::parse(&input) {
                    Ok(command) => {
                        self.palette_state.close();
                        if let Some(command) = command
                            && let Err(err) = self.execute_command(command)
                        {
                            self.set_status(StatusLevel::Error, err.to_string());
                        }
                    }
                    Err(err) => {
                        self.palette_state.open_with(input);
                        self.palette_state
                            .set_message(PaletteMessageLevel::Error, err.to_string());
                    }
                }
            }
            KeyCode::Backspace => {
                self.palette_state.pop_char();
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.palette_state.push_char(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn execute_command(&mut self, command: PaletteCommand) -> Result<()> {
        match command {
            PaletteCommand::Check => self.check(),
            PaletteCommand::Save => self.save(),
            PaletteCommand::Reload => self.spawn_load(),
            PaletteCommand::AddSource => {
                let path = self.require_active_path()?;
                if self.editor.add_source(&path) {
                    self.cursor.reset();
                    self.sync_tree();
                    self.focus = FocusTarget::Editor;
                }
            }
            PaletteCommand::RemoveSource => {
                let (path, name, _) = self.require_source()?;
                self.editor.remove_source(&path, &name);
                self.sync_tree();
            }
            PaletteCommand::RenameSource(new) => {
                let (path, name, _) = self.require_source()?;
                if !self.editor.rename_source(&path, &name, &new) {
                    return Err(anyhow!("a source named '{new}' already exists in {path}"));
                }
                self.sync_tree();
            }
            PaletteCommand::AddVariable => {
                let path = self.require_active_path()?;
                self.editor.add_variable(&path);
            }
            PaletteCommand::SetVariable { name, value } => {
                let path = self.require_active_path()?;
                self.editor.upsert_variable(&path, &name, value);
            }
            PaletteCommand::RenameVariable { old, new } => {
                let path = self.require_active_path()?;
                if !self.editor.rename_variable(&path, &old, &new) {
                    return Err(anyhow!("no variable named '{old}' in {path}"));
                }
            }
            PaletteCommand::RemoveVariable(name) => {
                let path = self.require_active_path()?;
                if !self.editor.remove_variable(&path, &name) {
                    return Err(anyhow!("no variable named '{name}' in {path}"));
                }
            }
            PaletteCommand::UpdateBuilds(enabled) => {
                self.editor.set_update_builds(enabled);
                let state = if enabled { "on" } else { "off" };
                self.set_status(StatusLevel::Info, format!("Update builds on save: {state}"));
            }
            PaletteCommand::Help => self.set_status(StatusLevel::Info, HELP),
        }
        Ok(())
    }

    fn require_active_path(&self) -> Result<String> {
        self.editor
            .workspace()
            .selection()
            .active_path()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("select a directory first"))
    }

    fn require_source(&self) -> Result<(String, String, String)> {
        self.selected_content()
            .ok_or_else(|| anyhow!("select a source first"))
    }

    /// Point the editor selection at the node under the tree cursor.
    fn select_tree_node(&mut self) {
        let changed = match self.tree.selected_node().cloned() {
            Some(TreeNode::Dir { path }) => self.editor.select_dir(&path),
            Some(TreeNode::Source { path, name }) => {
                let already = self
                    .editor
                    .workspace()
                    .selection()
                    .is_source_selected(&path, &name);
                self.editor.select_source(&path, &name) && !already
            }
            None => false,
        };
        if changed {
            self.cursor.reset();
        }
    }

    fn sync_tree(&mut self) {
        let workspace = self.editor.workspace();
        self.tree.rebuild(workspace.dirs());
        self.tree.focus_selection(workspace.selection().current());
        if let Some((_, source)) = workspace.selected_pair() {
            self.cursor.clamp(&source.content);
        }
    }

    fn save_session(&self) -> Result<()> {
        let snapshot = SessionSnapshot {
            selection: self.editor.workspace().selection().current().clone(),
            server: Some(self.backend.base_url().to_string()),
        };
        self.session_store.save(&snapshot)
    }

    fn set_status<S: Into<String>>(&mut self, level: StatusLevel, message: S) {
        self.status = Some(StatusMessage::new(level, message.into()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Tree,
    Editor,
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy)]
enum StatusLevel {
    Info,
    Error,
}
