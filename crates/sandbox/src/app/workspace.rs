//! Registry and selection kept consistent behind one mutation surface.

use crate::app::registry::DirectoryRegistry;
use crate::app::selection::{Selection, SelectionState};
use crate::domain::model::{Dir, Source, Variable};

/// Editable tree plus the editor's focus.
///
/// Every structural mutation reconciles the selection before returning, so a
/// selection never outlives the entity it references.
#[derive(Debug, Default, Clone)]
pub struct Workspace {
    registry: DirectoryRegistry,
    selection: SelectionState,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DirectoryRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn dirs(&self) -> &[Dir] {
        self.registry.dirs()
    }

    /// Replace the tree. A selection the new tree no longer contains is dropped.
    pub fn load(&mut self, dirs: Vec<Dir>) {
        self.registry.load(dirs);
        self.selection.retain_existing(&self.registry);
    }

    pub fn select_dir(&mut self, path: &str) -> bool {
        match self.registry.dir(path) {
            Some(dir) => {
                self.selection.select_dir(dir);
                true
            }
            None => false,
        }
    }

    pub fn select_source(&mut self, path: &str, name: &str) -> bool {
        match self.registry.dir(path) {
            Some(dir) => match dir.source(name) {
                Some(source) => {
                    self.selection.select_source(dir, source);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn unselect(&mut self) {
        self.selection.unselect();
    }

    /// Restore a persisted selection when it still resolves.
    pub fn restore_selection(&mut self, selection: Selection) -> bool {
        self.selection.restore(selection, &self.registry)
    }

    /// The selected `(dir, source)` pair, if a source is selected.
    pub fn selected_pair(&self) -> Option<(&Dir, &Source)> {
        let (path, name) = self.selection.selected_source()?;
        let dir = self.registry.dir(path)?;
        let source = dir.source(name)?;
        Some((dir, source))
    }

    /// Directory that is selected or owns the selected source.
    pub fn active_dir(&self) -> Option<&Dir> {
        self.selection
            .active_path()
            .and_then(|path| self.registry.dir(path))
    }

    /// Append a placeholder source to `path` and focus it.
    pub fn add_source(&mut self, path: &str) -> Option<Source> {
        let source = self.registry.add_source(path)?.clone();
        self.select_source(path, &source.name);
        Some(source)
    }

    /// Remove every source named `name` from `path`, clearing a selection on it.
    pub fn remove_source(&mut self, path: &str, name: &str) -> bool {
        let removed = self.registry.remove_source(path, name) > 0;
        if removed {
            self.selection.retain_existing(&self.registry);
        }
        removed
    }

    pub fn add_variable(&mut self, path: &str) -> Option<Variable> {
        self.registry.add_variable(path).cloned()
    }

    pub fn remove_variable(&mut self, path: &str, name: &str) -> bool {
        self.registry.remove_variable(path, name) > 0
    }

    pub fn set_content(&mut self, path: &str, name: &str, content: impl Into<String>) -> bool {
        self.registry.set_content(path, name, content)
    }

    /// Rename a source; a selection on it follows the new name.
    pub fn rename_source(&mut self, path: &str, old: &str, new: &str) -> bool {
        if old == new {
            return self.registry.source(path, old).is_some();
        }
        let renamed = self.registry.rename_source(path, old, new);
        if renamed {
            self.selection.follow_rename(path, old, new);
        }
        renamed
    }

    /// Append `variable` to `path` without touching existing rows.
    pub fn push_variable(&mut self, path: &str, variable: Variable) -> bool {
        self.registry.push_variable(path, variable)
    }

    pub fn set_variable(&mut self, path: &str, name: &str, value: impl Into<String>) -> bool {
        self.registry.set_variable(path, name, value)
    }

    pub fn rename_variable(&mut self, path: &str, old: &str, new: &str) -> bool {
        self.registry.rename_variable(path, old, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        let mut workspace = Workspace::new();
        workspace.load(vec![
            Dir::new("a")
                .with_source(Source::new("x", "hi"))
                .with_source(Source::new("y", "")),
            Dir::new("b"),
        ]);
        workspace
    }

    #[test]
    fn removing_selected_source_unselects() {
        let mut workspace = workspace();
        assert!(workspace.select_source("a", "x"));
        assert!(workspace.remove_source("a", "x"));
        assert!(workspace.registry().source("a", "x").is_none());
        assert_eq!(workspace.selection().current(), &Selection::Unselected);
    }

    #[test]
    fn removing_other_source_keeps_selection() {
        let mut workspace = workspace();
        workspace.select_source("a", "x");
        assert!(workspace.remove_source("a", "y"));
        assert_eq!(workspace.selection().selected_source(), Some(("a", "x")));
    }

    #[test]
    fn add_source_selects_the_new_source() {
        let mut workspace = workspace();
        let source = workspace.add_source("b").unwrap();
        assert_eq!(source.name, Source::PLACEHOLDER_NAME);
        assert_eq!(workspace.selection().selected_source(), Some(("b", "new")));
        let (dir, selected) = workspace.selected_pair().unwrap();
        assert_eq!(dir.path, "b");
        assert_eq!(selected, &source);
    }

    #[test]
    fn reload_drops_selection_of_vanished_dir() {
        let mut workspace = workspace();
        workspace.select_dir("b");
        workspace.load(vec![Dir::new("a")]);
        assert_eq!(workspace.selection().current(), &Selection::Unselected);
    }

    #[test]
    fn reload_keeps_selection_that_still_exists() {
        let mut workspace = workspace();
        workspace.select_source("a", "x");
        workspace.load(vec![Dir::new("a").with_source(Source::new("x", "reloaded"))]);
        assert_eq!(workspace.selected_pair().unwrap().1.content, "reloaded");
    }

    #[test]
    fn rename_keeps_focus_on_renamed_source() {
        let mut workspace = workspace();
        workspace.select_source("a", "x");
        assert!(workspace.rename_source("a", "x", "main"));
        assert_eq!(workspace.selection().selected_source(), Some(("a", "main")));
        assert!(workspace.rename_source("a", "main", "main"));
    }

    #[test]
    fn rename_onto_sibling_name_keeps_selection_and_content() {
        let mut workspace = Workspace::new();
        workspace.load(vec![
            Dir::new("a")
                .with_source(Source::new("x", "first"))
                .with_source(Source::new("y", "second")),
        ]);
        workspace.select_source("a", "y");

        assert!(!workspace.rename_source("a", "y", "x"));
        assert_eq!(workspace.selection().selected_source(), Some(("a", "y")));
        assert_eq!(workspace.selected_pair().unwrap().1.content, "second");
    }

    #[test]
    fn selecting_unknown_entities_is_rejected() {
        let mut workspace = workspace();
        assert!(!workspace.select_dir("nope"));
        assert!(!workspace.select_source("a", "nope"));
        assert_eq!(workspace.selection().current(), &Selection::Unselected);
    }
}
