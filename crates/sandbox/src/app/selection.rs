//! Tracking which directory or source the editor is focused on.

use serde::{Deserialize, Serialize};

use crate::app::registry::DirectoryRegistry;
use crate::domain::model::{Dir, Source};

/// Focus of the editor. Directory and source selection are mutually exclusive.
///
/// Entities are referenced by identity key (`path`, and `name` within that path), so
/// editing content never changes what is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Selection {
    #[default]
    Unselected,
    Dir {
        path: String,
    },
    Source {
        path: String,
        name: String,
    },
}

/// State machine over [`Selection`].
#[derive(Debug, Default, Clone)]
pub struct SelectionState {
    current: Selection,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    pub fn select_dir(&mut self, dir: &Dir) {
        self.current = Selection::Dir {
            path: dir.path.clone(),
        };
    }

    pub fn select_source(&mut self, dir: &Dir, source: &Source) {
        self.current = Selection::Source {
            path: dir.path.clone(),
            name: source.name.clone(),
        };
    }

    pub fn unselect(&mut self) {
        self.current = Selection::Unselected;
    }

    /// True when `dir` is selected or owns the selected source.
    pub fn is_active_dir(&self, dir: &Dir) -> bool {
        self.active_path() == Some(dir.path.as_str())
    }

    /// True when `source` of `dir` is the selected source.
    pub fn is_active_source(&self, dir: &Dir, source: &Source) -> bool {
        self.is_source_selected(&dir.path, &source.name)
    }

    pub fn is_source_selected(&self, path: &str, name: &str) -> bool {
        matches!(
            &self.current,
            Selection::Source { path: p, name: n } if p == path && n == name
        )
    }

    /// Path of the directory when a directory (not a source) is selected.
    pub fn selected_dir(&self) -> Option<&str> {
        match &self.current {
            Selection::Dir { path } => Some(path.as_str()),
            _ => None,
        }
    }

    /// `(path, name)` of the selected source.
    pub fn selected_source(&self) -> Option<(&str, &str)> {
        match &self.current {
            Selection::Source { path, name } => Some((path.as_str(), name.as_str())),
            _ => None,
        }
    }

    /// Directory that is either selected or owns the selected source.
    pub fn active_path(&self) -> Option<&str> {
        match &self.current {
            Selection::Unselected => None,
            Selection::Dir { path } | Selection::Source { path, .. } => Some(path.as_str()),
        }
    }

    /// Drop the selection if it references something `registry` no longer holds.
    /// Returns `true` when the selection was cleared.
    pub fn retain_existing(&mut self, registry: &DirectoryRegistry) -> bool {
        let exists = match &self.current {
            Selection::Unselected => true,
            Selection::Dir { path } => registry.dir(path).is_some(),
            Selection::Source { path, name } => registry.source(path, name).is_some(),
        };
        if !exists {
            self.unselect();
        }
        !exists
    }

    /// Keep the selection on a source that was renamed from `old` to `new`.
    pub fn follow_rename(&mut self, path: &str, old: &str, new: &str) {
        if let Selection::Source { path: p, name } = &mut self.current
            && p == path
            && name == old
        {
            *name = new.to_owned();
        }
    }

    /// Restore a previously persisted selection if it still exists in `registry`.
    pub fn restore(&mut self, selection: Selection, registry: &DirectoryRegistry) -> bool {
        self.current = selection;
        !self.retain_existing(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> DirectoryRegistry {
        let mut registry = DirectoryRegistry::new();
        registry.load(vec![
            Dir::new("a")
                .with_source(Source::new("x", "hi"))
                .with_source(Source::new("y", "")),
            Dir::new("b").with_source(Source::new("x", "other")),
        ]);
        registry
    }

    #[test]
    fn transitions_are_mutually_exclusive() {
        let registry = tree();
        let a = registry.dir("a").unwrap();
        let mut state = SelectionState::new();

        state.select_dir(a);
        assert_eq!(state.selected_dir(), Some("a"));
        assert!(state.selected_source().is_none());

        state.select_source(a, &a.sources[0]);
        assert!(state.selected_dir().is_none());
        assert_eq!(state.selected_source(), Some(("a", "x")));

        state.unselect();
        assert!(state.selected_dir().is_none());
        assert!(state.selected_source().is_none());
    }

    #[test]
    fn active_queries_compare_identity_keys() {
        let registry = tree();
        let a = registry.dir("a").unwrap();
        let b = registry.dir("b").unwrap();
        let mut state = SelectionState::new();
        state.select_source(a, &a.sources[0]);

        let mut edited = a.sources[0].clone();
        edited.content = "edited".into();
        assert!(state.is_active_source(a, &edited));
        assert!(state.is_active_dir(a));
        assert!(!state.is_active_dir(b));
        assert!(!state.is_active_source(b, &b.sources[0]));

        state.select_dir(a);
        assert!(state.is_active_dir(a));
        assert!(!state.is_active_source(a, &a.sources[0]));
    }

    #[test]
    fn retain_existing_clears_dangling_selection() {
        let mut registry = tree();
        let mut state = SelectionState::new();
        state.restore(
            Selection::Source {
                path: "a".into(),
                name: "x".into(),
            },
            &registry,
        );
        registry.remove_source("a", "x");
        assert!(state.retain_existing(&registry));
        assert_eq!(state.current(), &Selection::Unselected);
    }

    #[test]
    fn restore_rejects_missing_entities() {
        let registry = tree();
        let mut state = SelectionState::new();
        assert!(!state.restore(Selection::Dir { path: "zzz".into() }, &registry));
        assert_eq!(state.current(), &Selection::Unselected);
        assert!(state.restore(Selection::Dir { path: "b".into() }, &registry));
    }

    #[test]
    fn follow_rename_moves_selection() {
        let registry = tree();
        let a = registry.dir("a").unwrap();
        let mut state = SelectionState::new();
        state.select_source(a, &a.sources[0]);
        state.follow_rename("a", "x", "renamed");
        assert_eq!(state.selected_source(), Some(("a", "renamed")));
        state.follow_rename("b", "renamed", "nope");
        assert_eq!(state.selected_source(), Some(("a", "renamed")));
    }

    #[test]
    fn selection_serializes_with_kind_tag() {
        let selection = Selection::Source {
            path: "a".into(),
            name: "x".into(),
        };
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(json, r#"{"kind":"source","path":"a","name":"x"}"#);
    }
}
