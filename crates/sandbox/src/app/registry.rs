//! In-memory tree of directories, sources, and variables.

use crate::domain::model::{Dir, Source, Variable};

/// Owns the editable directory tree.
///
/// Every operation is total: addressing a directory or source that does not exist is a
/// no-op reported through the return value.
#[derive(Debug, Default, Clone)]
pub struct DirectoryRegistry {
    dirs: Vec<Dir>,
    loaded: bool,
}

impl DirectoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole tree with `dirs`.
    pub fn load(&mut self, dirs: Vec<Dir>) {
        self.dirs = dirs;
        self.loaded = true;
    }

    /// Whether a tree has been loaded at least once.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn dirs(&self) -> &[Dir] {
        &self.dirs
    }

    pub fn dir(&self, path: &str) -> Option<&Dir> {
        self.dirs.iter().find(|dir| dir.path == path)
    }

    fn dir_mut(&mut self, path: &str) -> Option<&mut Dir> {
        self.dirs.iter_mut().find(|dir| dir.path == path)
    }

    pub fn source(&self, path: &str, name: &str) -> Option<&Source> {
        self.dir(path).and_then(|dir| dir.source(name))
    }

    /// Append a placeholder source to `path` and return it.
    pub fn add_source(&mut self, path: &str) -> Option<&Source> {
        let dir = self.dir_mut(path)?;
        dir.sources.push(Source::placeholder());
        dir.sources.last()
    }

    /// Remove every source named `name` from `path`. Returns how many were removed.
    pub fn remove_source(&mut self, path: &str, name: &str) -> usize {
        let Some(dir) = self.dir_mut(path) else {
            return 0;
        };
        let before = dir.sources.len();
        dir.sources.retain(|source| source.name != name);
        before - dir.sources.len()
    }

    /// Append an empty variable to `path` and return it.
    pub fn add_variable(&mut self, path: &str) -> Option<&Variable> {
        let dir = self.dir_mut(path)?;
        dir.vars.push(Variable::default());
        dir.vars.last()
    }

    /// Remove every variable named `name` from `path`. Returns how many were removed.
    pub fn remove_variable(&mut self, path: &str, name: &str) -> usize {
        let Some(dir) = self.dir_mut(path) else {
            return 0;
        };
        let before = dir.vars.len();
        dir.vars.retain(|variable| variable.name != name);
        before - dir.vars.len()
    }

    /// Replace the content of the first source named `name`.
    pub fn set_content(&mut self, path: &str, name: &str, content: impl Into<String>) -> bool {
        match self.dir_mut(path).and_then(|dir| dir.source_mut(name)) {
            Some(source) => {
                source.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Rename the first source named `old`. Refused when another source in `path`
    /// already carries `new`, since names address sources within a directory.
    pub fn rename_source(&mut self, path: &str, old: &str, new: impl Into<String>) -> bool {
        let new = new.into();
        if old != new && self.source(path, &new).is_some() {
            return false;
        }
        match self.dir_mut(path).and_then(|dir| dir.source_mut(old)) {
            Some(source) => {
                source.name = new;
                true
            }
            None => false,
        }
    }

    /// Append a named variable to `path`.
    pub fn push_variable(&mut self, path: &str, variable: Variable) -> bool {
        match self.dir_mut(path) {
            Some(dir) => {
                dir.vars.push(variable);
                true
            }
            None => false,
        }
    }

    /// Set the value of the first variable named `name`.
    pub fn set_variable(&mut self, path: &str, name: &str, value: impl Into<String>) -> bool {
        match self.dir_mut(path).and_then(|dir| dir.variable_mut(name)) {
            Some(variable) => {
                variable.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Rename the first variable named `old`.
    pub fn rename_variable(&mut self, path: &str, old: &str, new: impl Into<String>) -> bool {
        match self.dir_mut(path).and_then(|dir| dir.variable_mut(old)) {
            Some(variable) => {
                variable.name = new.into();
                true
            }
            None => false,
        }
    }

    /// Deep copy of the tree, optionally without unnamed variables.
    pub fn snapshot(&self, drop_unnamed_variables: bool) -> Vec<Dir> {
        self.dirs
            .iter()
            .map(|dir| {
                let mut dir = dir.clone();
                if drop_unnamed_variables {
                    dir.vars.retain(|variable| !variable.is_unnamed());
                }
                dir
            })
            .collect()
    }
}
