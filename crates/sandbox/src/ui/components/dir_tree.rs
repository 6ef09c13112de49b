//! Directory tree component and state management.

use std::collections::HashSet;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::app::selection::{Selection, SelectionState};
use crate::domain::model::Dir;

/// Node of the flattened tree: a directory or one of its sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Dir { path: String },
    Source { path: String, name: String },
}

impl TreeNode {
    pub fn path(&self) -> &str {
        match self {
            TreeNode::Dir { path } | TreeNode::Source { path, .. } => path,
        }
    }

    fn matches(&self, selection: &Selection) -> bool {
        match (self, selection) {
            (TreeNode::Dir { path }, Selection::Dir { path: selected }) => path == selected,
            (
                TreeNode::Source { path, name },
                Selection::Source {
                    path: selected_path,
                    name: selected_name,
                },
            ) => path == selected_path && name == selected_name,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct TreeEntry {
    node: TreeNode,
    source_count: usize,
}

/// Navigable state of the directory tree.
#[derive(Debug, Default, Clone)]
pub struct DirTreeState {
    entries: Vec<TreeEntry>,
    visible: Vec<usize>,
    selected: usize,
    collapsed: HashSet<String>,
}

impl DirTreeState {
    pub fn from_dirs(dirs: &[Dir]) -> Self {
        let mut state = Self::default();
        state.rebuild(dirs);
        state
    }

    /// Replace the entries, keeping the cursor on the same node when it still exists.
    pub fn rebuild(&mut self, dirs: &[Dir]) {
        let previous = self.selected_node().cloned();

        self.entries.clear();
        for dir in dirs {
            self.entries.push(TreeEntry {
                node: TreeNode::Dir {
                    path: dir.path.clone(),
                },
                source_count: dir.sources.len(),
            });
            for source in &dir.sources {
                self.entries.push(TreeEntry {
                    node: TreeNode::Source {
                        path: dir.path.clone(),
                        name: source.name.clone(),
                    },
                    source_count: 0,
                });
            }
        }
        let known: HashSet<&str> = dirs.iter().map(|dir| dir.path.as_str()).collect();
        self.collapsed.retain(|path| known.contains(path.as_str()));

        self.refresh_visible();
        if let Some(node) = previous {
            self.focus_node(&node);
        }
    }

    /// Move the cursor onto the node referenced by `selection`, expanding its directory.
    pub fn focus_selection(&mut self, selection: &Selection) {
        if let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.node.matches(selection))
        {
            self.expand_to(index);
        }
    }

    fn focus_node(&mut self, node: &TreeNode) {
        if let Some(index) = self.entries.iter().position(|entry| &entry.node == node) {
            self.expand_to(index);
        }
    }

    fn expand_to(&mut self, index: usize) {
        let path = self.entries[index].node.path().to_owned();
        if self.collapsed.remove(&path) {
            self.refresh_visible();
        }
        if let Some(pos) = self.visible.iter().position(|idx| *idx == index) {
            self.selected = pos;
        }
    }

    pub fn selected_node(&self) -> Option<&TreeNode> {
        self.visible
            .get(self.selected)
            .and_then(|idx| self.entries.get(*idx))
            .map(|entry| &entry.node)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Collapse the directory under the cursor, or jump from a source to its directory.
    pub fn collapse_or_parent(&mut self) {
        match self.selected_node().cloned() {
            Some(TreeNode::Dir { path }) => {
                if self.collapsed.insert(path.clone()) {
                    self.refresh_visible();
                    self.focus_node(&TreeNode::Dir { path });
                }
            }
            Some(TreeNode::Source { path, .. }) => self.focus_node(&TreeNode::Dir { path }),
            None => {}
        }
    }

    pub fn expand(&mut self) {
        if let Some(TreeNode::Dir { path }) = self.selected_node().cloned()
            && self.collapsed.remove(&path)
        {
            self.refresh_visible();
            self.focus_node(&TreeNode::Dir { path });
        }
    }

    pub fn is_collapsed(&self, path: &str) -> bool {
        self.collapsed.contains(path)
    }

    fn refresh_visible(&mut self) {
        self.visible = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| match &entry.node {
                TreeNode::Dir { .. } => true,
                TreeNode::Source { path, .. } => !self.collapsed.contains(path),
            })
            .map(|(idx, _)| idx)
            .collect();
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        if self.visible.is_empty() {
            None
        } else {
            Some(self.selected)
        }
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    fn iter_visible(&self) -> impl Iterator<Item = &TreeEntry> {
        self.visible.iter().filter_map(|idx| self.entries.get(*idx))
    }
}

/// Renders directories and their sources with markers for the active selection.
#[derive(Debug, Default)]
pub struct DirTree;

impl DirTree {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        state: &DirTreeState,
        selection: &SelectionState,
        loaded: bool,
        has_focus: bool,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Sources")
            .border_style(Style::default().fg(if has_focus {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        frame.render_widget(block.clone(), area);

        let inner = block.inner(area);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(inner);

        let active = match selection.active_path() {
            Some(path) => format!("in {path}"),
            None => "nothing selected".to_string(),
        };
        frame.render_widget(
            Paragraph::new(active).style(Style::default().fg(Color::Gray)),
            layout[0],
        );

        if state.visible_len() == 0 {
            let text = if loaded {
                "No directories"
            } else {
                "Loading sources…"
            };
            let placeholder = Paragraph::new(text).style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            );
            frame.render_widget(placeholder, layout[1]);
            return;
        }

        let items: Vec<ListItem> = state
            .iter_visible()
            .map(|entry| ListItem::new(entry_line(state, entry, selection)))
            .collect();

        let mut list_state = ListState::default();
        list_state.select(state.selected_index());

        let highlight_style = if has_focus {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Gray)
                .add_modifier(Modifier::BOLD)
        };

        let list = List::new(items)
            .block(Block::default())
            .highlight_style(highlight_style)
            .highlight_symbol("▸ ");

        frame.render_stateful_widget(list, layout[1], &mut list_state);
    }
}

fn entry_line<'a>(
    state: &DirTreeState,
    entry: &'a TreeEntry,
    selection: &SelectionState,
) -> Line<'a> {
    match &entry.node {
        TreeNode::Dir { path } => {
            let symbol = if state.is_collapsed(path) { "▸" } else { "▾" };
            let mut style = Style::default().fg(Color::Yellow);
            if selection.active_path() == Some(path.as_str()) {
                style = style.add_modifier(Modifier::BOLD);
            }
            Line::from(vec![
                Span::styled(format!("{symbol} "), Style::default().fg(Color::Yellow)),
                Span::styled(path.as_str(), style),
                Span::styled(
                    format!(" ({})", entry.source_count),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
        TreeNode::Source { path, name } => {
            let mut style = Style::default();
            if selection.is_source_selected(path, name) {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            Line::from(vec![
                Span::raw("  "),
                Span::styled("• ", Style::default().fg(Color::Gray)),
                Span::styled(name.as_str(), style),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::domain::model::Source;

    fn dirs() -> Vec<Dir> {
        vec![
            Dir::new("a")
                .with_source(Source::new("x", "hi"))
                .with_source(Source::new("y", "yo")),
            Dir::new("b").with_source(Source::new("z", "")),
        ]
    }

    #[test]
    fn flattens_dirs_and_sources() {
        let mut state = DirTreeState::from_dirs(&dirs());
        assert_eq!(state.visible_len(), 5);
        assert_eq!(
            state.selected_node(),
            Some(&TreeNode::Dir { path: "a".into() })
        );
        state.select_next();
        assert_eq!(
            state.selected_node(),
            Some(&TreeNode::Source {
                path: "a".into(),
                name: "x".into()
            })
        );
    }

    #[test]
    fn collapse_hides_sources_and_keeps_cursor_on_dir() {
        let mut state = DirTreeState::from_dirs(&dirs());
        state.select_next();
        state.collapse_or_parent();
        assert_eq!(
            state.selected_node(),
            Some(&TreeNode::Dir { path: "a".into() })
        );
        state.collapse_or_parent();
        assert_eq!(state.visible_len(), 3);
        state.expand();
        assert_eq!(state.visible_len(), 5);
    }

    #[test]
    fn rebuild_follows_the_node_under_the_cursor() {
        let mut state = DirTreeState::from_dirs(&dirs());
        state.focus_selection(&Selection::Source {
            path: "b".into(),
            name: "z".into(),
        });
        let mut changed = dirs();
        changed.insert(0, Dir::new("0"));
        state.rebuild(&changed);
        assert_eq!(
            state.selected_node(),
            Some(&TreeNode::Source {
                path: "b".into(),
                name: "z".into()
            })
        );
    }

    #[test]
    fn renders_tree_with_active_markers() {
        let backend = TestBackend::new(30, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        let dirs = dirs();
        let state = DirTreeState::from_dirs(&dirs);
        let mut selection = SelectionState::new();
        selection.select_source(&dirs[0], &dirs[0].sources[1]);

        terminal
            .draw(|frame| {
                let area = frame.size();
                DirTree.render(frame, area, &state, &selection, true, true);
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("in a"));
        assert!(text.contains("• y"));
    }

    #[test]
    fn placeholder_distinguishes_loading_from_empty() {
        let render = |loaded: bool| {
            let mut terminal = Terminal::new(TestBackend::new(30, 6)).unwrap();
            terminal
                .draw(|frame| {
                    let area = frame.size();
                    DirTree.render(
                        frame,
                        area,
                        &DirTreeState::default(),
                        &SelectionState::new(),
                        loaded,
                        false,
                    );
                })
                .unwrap();
            terminal
                .backend()
                .buffer()
                .content
                .iter()
                .map(|cell| cell.symbol())
                .collect::<String>()
        };
        assert!(render(false).contains("Loading sources"));
        assert!(render(true).contains("No directories"));
    }
}
