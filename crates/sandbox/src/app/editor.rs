//! Editor state and the merging of asynchronous results back into it.

use std::time::{Duration, Instant};

use crate::app::check::{
    Acceptance, CheckOutcome, CheckRequest, CheckResult, CheckTracker, SurfacedDiagnostic,
    Validator, run_check,
};
use crate::app::flash::Flashes;
use crate::app::log::LogStream;
use crate::app::persist::{
    LoadOutcome, SaveOptions, SaveOutcome, SaveRequest, Store, prepare_save, run_load, run_save,
};
use crate::app::selection::Selection;
use crate::app::workspace::Workspace;
use crate::domain::model::{Dir, Variable};
use crate::infra::config::Config;

/// Tunables taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    pub flash: Duration,
    pub save: SaveOptions,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            flash: Duration::from_millis(500),
            save: SaveOptions::default(),
        }
    }
}

impl EditorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            flash: Duration::from_millis(config.editor.flash_millis),
            save: SaveOptions {
                drop_empty_variables: config.editor.drop_empty_variables,
                update_builds: config.editor.update_builds,
            },
        }
    }
}

/// Everything the presentation layer observes: the workspace, the log, the surfaced
/// diagnostic, and the flash flags.
#[derive(Debug, Clone)]
pub struct Editor {
    workspace: Workspace,
    log: LogStream,
    checks: CheckTracker,
    flashes: Flashes,
    options: EditorOptions,
    saving: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            workspace: Workspace::new(),
            log: LogStream::new(),
            checks: CheckTracker::new(),
            flashes: Flashes::new(options.flash),
            options,
            saving: false,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn log(&self) -> &LogStream {
        &self.log
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn set_update_builds(&mut self, update_builds: bool) {
        self.options.save.update_builds = update_builds;
    }

    /// Diagnostic currently surfaced for the selected source.
    pub fn diagnostic(&self) -> Option<&SurfacedDiagnostic> {
        self.checks.diagnostic()
    }

    pub fn is_checking(&self) -> bool {
        self.checks.in_flight().is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn saved_flash(&self, now: Instant) -> bool {
        self.flashes.saved.is_on(now)
    }

    pub fn checked_flash(&self, now: Instant) -> bool {
        self.flashes.checked.is_on(now)
    }

    /// Advance timed state.
    pub fn tick(&mut self, now: Instant) {
        self.flashes.tick(now);
    }

    // Selection. Any change of focus ends the lifetime of the shown diagnostic.

    pub fn select_dir(&mut self, path: &str) -> bool {
        let changed = self.workspace.select_dir(path);
        if changed {
            self.checks.clear_diagnostic();
        }
        changed
    }

    pub fn select_source(&mut self, path: &str, name: &str) -> bool {
        let already = self.workspace.selection().is_source_selected(path, name);
        let changed = self.workspace.select_source(path, name);
        if changed && !already {
            self.checks.clear_diagnostic();
        }
        changed
    }

    pub fn unselect(&mut self) {
        self.workspace.unselect();
        self.checks.clear_diagnostic();
    }

    pub fn restore_selection(&mut self, selection: Selection) -> bool {
        self.checks.clear_diagnostic();
        self.workspace.restore_selection(selection)
    }

    // Structural edits.

    pub fn load(&mut self, dirs: Vec<Dir>) {
        let before = self.workspace.selection().current().clone();
        self.workspace.load(dirs);
        if self.workspace.selection().current() != &before {
            self.checks.clear_diagnostic();
        }
    }

    pub fn add_source(&mut self, path: &str) -> bool {
        match self.workspace.add_source(path) {
            Some(_) => {
                self.checks.clear_diagnostic();
                true
            }
            None => false,
        }
    }

    pub fn remove_source(&mut self, path: &str, name: &str) -> bool {
        let was_selected = self.workspace.selection().is_source_selected(path, name);
        let removed = self.workspace.remove_source(path, name);
        if removed && was_selected {
            self.checks.clear_diagnostic();
        }
        removed
    }

    pub fn add_variable(&mut self, path: &str) -> bool {
        self.workspace.add_variable(path).is_some()
    }

    pub fn remove_variable(&mut self, path: &str, name: &str) -> bool {
        self.workspace.remove_variable(path, name)
    }

    pub fn set_content(&mut self, path: &str, name: &str, content: impl Into<String>) -> bool {
        self.workspace.set_content(path, name, content)
    }

    pub fn rename_source(&mut self, path: &str, old: &str, new: &str) -> bool {
        let renamed = self.workspace.rename_source(path, old, new);
        if renamed && old != new {
            // The diagnostic was issued under the old identity.
            self.checks.clear_diagnostic();
        }
        renamed
    }

    pub fn set_variable(&mut self, path: &str, name: &str, value: impl Into<String>) -> bool {
        self.workspace.set_variable(path, name, value)
    }

    /// Set `name` to `value`, appending a new variable when none carries that name.
    pub fn upsert_variable(&mut self, path: &str, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.workspace.set_variable(path, name, value.clone()) {
            return true;
        }
        self.workspace.push_variable(path, Variable::new(name, value))
    }

    pub fn rename_variable(&mut self, path: &str, old: &str, new: &str) -> bool {
        self.workspace.rename_variable(path, old, new)
    }

    // Build-check.

    /// Snapshot a check of the selected source. Logs a warning and returns `None` when
    /// no source is selected.
    pub fn request_check(&mut self) -> Option<CheckRequest> {
        let Some((dir, source)) = self.workspace.selected_pair() else {
            self.log.warning("Select a source to check");
            return None;
        };
        let request = self.checks.begin(dir, source);
        tracing::debug!(
            check = %request.target,
            generation = request.generation,
            "build check issued"
        );
        Some(request)
    }

    /// Merge a check outcome. Returns `false` when the outcome was stale and dropped.
    pub fn apply_check(&mut self, outcome: CheckOutcome, now: Instant) -> bool {
        match self.checks.accept(&outcome, self.workspace.selection()) {
            Acceptance::Fresh => {}
            stale => {
                tracing::debug!(
                    check = %outcome.target,
                    generation = outcome.generation,
                    ?stale,
                    "discarding build check"
                );
                return false;
            }
        }

        let CheckOutcome { target, result, .. } = outcome;
        match result {
            CheckResult::Clean => {
                self.log.success(format!("{target} built successfully"));
                self.flashes.checked.trigger(now);
            }
            CheckResult::Diagnostics(errors) => {
                if let Some(error) = self.checks.surface(target, &errors) {
                    let summary = error.summary();
                    self.log.error(summary);
                }
            }
            CheckResult::Failed(reason) => {
                self.log
                    .error(format!("Build check of {target} failed: {reason}"));
            }
        }
        true
    }

    /// Check the selected source and merge the result.
    pub async fn check_selected<V: Validator>(&mut self, validator: &V) -> Option<bool> {
        let request = self.request_check()?;
        let outcome = run_check(validator, request).await;
        Some(self.apply_check(outcome, Instant::now()))
    }

    // Persistence.

    pub fn request_save(&mut self) -> SaveRequest {
        self.saving = true;
        prepare_save(self.workspace.registry(), self.options.save)
    }

    /// Merge a save outcome. The tree is never modified by a save.
    pub fn apply_save(&mut self, outcome: SaveOutcome, now: Instant) {
        self.saving = false;
        match outcome.result {
            Ok(()) => {
                self.log
                    .info(format!("Saved {} directories", outcome.dir_count));
                self.flashes.saved.trigger(now);
            }
            Err(reason) => self.log.error(format!("Save failed: {reason}")),
        }
    }

    pub async fn save<S: Store>(&mut self, store: &S) {
        let request = self.request_save();
        let outcome = run_save(store, request).await;
        self.apply_save(outcome, Instant::now());
    }

    /// Merge a (re)load of the tree. On failure the current tree is kept.
    pub fn apply_load(&mut self, outcome: LoadOutcome) -> bool {
        match outcome.result {
            Ok(dirs) => {
                let count = dirs.len();
                self.load(dirs);
                self.log.info(format!("Loaded {count} directories"));
                true
            }
            Err(reason) => {
                self.log.error(format!("Loading sources failed: {reason}"));
                false
            }
        }
    }

    pub async fn reload<S: Store>(&mut self, store: &S) -> bool {
        let outcome = run_load(store).await;
        self.apply_load(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::model::{LogLevel, Source};

    fn editor() -> Editor {
        let mut editor = Editor::default();
        editor.load(vec![
            Dir::new("a")
                .with_source(Source::new("x", "hi"))
                .with_source(Source::new("y", "yo")),
        ]);
        editor
    }

    #[test]
    fn check_without_source_warns() {
        let mut editor = editor();
        editor.select_dir("a");
        assert!(editor.request_check().is_none());
        assert_eq!(editor.log().latest().unwrap().level, LogLevel::Warning);
    }

    #[test]
    fn failed_check_logs_one_error_and_keeps_state() {
        let mut editor = editor();
        editor.select_source("a", "x");
        let request = editor.request_check().unwrap();
        let outcome = CheckOutcome {
            generation: request.generation,
            target: request.target,
            result: CheckResult::Failed("connection refused".into()),
        };
        assert!(editor.apply_check(outcome, Instant::now()));

        assert_eq!(editor.log().len(), 1);
        let latest = editor.log().latest().unwrap();
        assert_eq!(latest.level, LogLevel::Error);
        assert_eq!(latest.text, "Build check of a/x failed: connection refused");
        assert!(editor.diagnostic().is_none());
        assert_eq!(editor.workspace().selected_pair().unwrap().1.content, "hi");
    }

    #[test]
    fn clean_check_flashes_checked() {
        let mut editor = editor();
        editor.select_source("a", "x");
        let request = editor.request_check().unwrap();
        let now = Instant::now();
        editor.apply_check(
            CheckOutcome {
                generation: request.generation,
                target: request.target,
                result: CheckResult::Clean,
            },
            now,
        );
        assert!(editor.checked_flash(now));
        editor.tick(now + Duration::from_millis(500));
        assert!(!editor.checked_flash(now + Duration::from_millis(500)));
    }

    #[test]
    fn changing_selection_clears_diagnostic() {
        let mut editor = editor();
        editor.select_source("a", "x");
        let request = editor.request_check().unwrap();
        editor.apply_check(
            CheckOutcome {
                generation: request.generation,
                target: request.target,
                result: CheckResult::Diagnostics(vec![crate::domain::model::BuildError {
                    start_offset: 0,
                    end_offset: 2,
                    start_coordinate: Default::default(),
                    end_coordinate: Default::default(),
                    message: "bad".into(),
                }]),
            },
            Instant::now(),
        );
        assert!(editor.diagnostic().is_some());

        editor.select_source("a", "x");
        assert!(editor.diagnostic().is_some());
        editor.select_source("a", "y");
        assert!(editor.diagnostic().is_none());
    }

    #[test]
    fn upsert_appends_without_touching_unnamed_rows() {
        let mut editor = Editor::default();
        editor.load(vec![Dir::new("a").with_variable(Variable::new("", "scratch"))]);

        assert!(editor.upsert_variable("a", "foo", "bar"));
        assert!(editor.upsert_variable("a", "foo", "baz"));
        assert_eq!(
            editor.workspace().dirs()[0].vars,
            vec![Variable::new("", "scratch"), Variable::new("foo", "baz")]
        );
        assert!(!editor.upsert_variable("missing", "foo", "bar"));
    }

    #[test]
    fn failed_save_keeps_tree_and_clears_saving() {
        let mut editor = editor();
        let request = editor.request_save();
        assert!(editor.is_saving());
        let before = editor.workspace().dirs().to_vec();

        editor.apply_save(
            SaveOutcome {
                dir_count: request.dir_count(),
                result: Err("500 Internal Server Error".into()),
            },
            Instant::now(),
        );
        assert!(!editor.is_saving());
        assert_eq!(editor.workspace().dirs(), before.as_slice());
        assert_eq!(editor.log().latest().unwrap().text, "Save failed: 500 Internal Server Error");
    }

    #[test]
    fn failed_load_keeps_current_tree() {
        let mut editor = editor();
        assert!(!editor.apply_load(LoadOutcome {
            result: Err("timeout".into()),
        }));
        assert_eq!(editor.workspace().dirs().len(), 1);
        assert_eq!(editor.log().latest().unwrap().level, LogLevel::Error);
    }
}
