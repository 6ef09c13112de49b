//! Build-check requests and stale-response filtering.
//!
//! A check is split in three steps so network work never touches editor state:
//! [`CheckTracker::begin`] snapshots the request on the UI thread, [`run_check`] performs
//! the validator call anywhere, and [`CheckTracker::accept`] decides on the UI thread
//! whether the outcome is still wanted.

use std::fmt;
use std::future::Future;

use crate::app::mapper::resolve_build_error;
use crate::app::selection::SelectionState;
use crate::domain::errors::SandboxError;
use crate::domain::model::{BuildError, Dir, Source};
use crate::domain::wire::{BuildRequest, BuildResponse};

/// Remote service that compiles template content against variables.
pub trait Validator {
    fn build(
        &self,
        request: &BuildRequest,
    ) -> impl Future<Output = Result<BuildResponse, SandboxError>> + Send;
}

/// Identity of the source a check was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckTarget {
    pub path: String,
    pub name: String,
}

impl CheckTarget {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CheckTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.path, self.name)
    }
}

/// Snapshot of one in-flight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub generation: u64,
    pub target: CheckTarget,
    pub payload: BuildRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// The validator reported no errors.
    Clean,
    /// The validator reported at least one error, in server order.
    Diagnostics(Vec<BuildError>),
    /// The validator could not be reached or answered with garbage.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub generation: u64,
    pub target: CheckTarget,
    pub result: CheckResult,
}

/// Execute `request` against `validator`. Never fails: transport problems become
/// [`CheckResult::Failed`].
pub async fn run_check<V: Validator>(validator: &V, request: CheckRequest) -> CheckOutcome {
    let CheckRequest {
        generation,
        target,
        payload,
    } = request;

    let result = match validator.build(&payload).await {
        Ok(response) => {
            let errors: Vec<BuildError> = response
                .into_errors()
                .into_iter()
                .map(|wire| resolve_build_error(wire, &payload.content))
                .collect();
            if errors.is_empty() {
                CheckResult::Clean
            } else {
                CheckResult::Diagnostics(errors)
            }
        }
        Err(err) => CheckResult::Failed(err.to_string()),
    };

    tracing::debug!(check = %target, generation, "build check finished");
    CheckOutcome {
        generation,
        target,
        result,
    }
}

/// Diagnostic currently shown for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacedDiagnostic {
    pub target: CheckTarget,
    pub error: BuildError,
    /// How many errors the validator reported in total.
    pub reported: usize,
}

/// Whether an outcome may still be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Fresh,
    /// A newer check was issued after this one.
    Superseded,
    /// The checked source is no longer the selected one.
    Deselected,
}

/// Single-flight bookkeeping for build-checks.
#[derive(Debug, Default, Clone)]
pub struct CheckTracker {
    issued: u64,
    pending: Option<(u64, CheckTarget)>,
    diagnostic: Option<SurfacedDiagnostic>,
}

impl CheckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a check of `source` in `dir`. Any shown diagnostic is cleared and every
    /// earlier in-flight check becomes superseded.
    pub fn begin(&mut self, dir: &Dir, source: &Source) -> CheckRequest {
        self.diagnostic = None;
        self.issued += 1;
        let target = CheckTarget::new(&dir.path, &source.name);
        self.pending = Some((self.issued, target.clone()));
        CheckRequest {
            generation: self.issued,
            target,
            payload: BuildRequest {
                content: source.content.clone(),
                vars: dir.vars.clone(),
            },
        }
    }

    /// Decide whether `outcome` is still wanted given the current `selection`.
    /// The pending slot is released by fresh and deselected outcomes of the latest check.
    pub fn accept(&mut self, outcome: &CheckOutcome, selection: &SelectionState) -> Acceptance {
        let latest = self.pending.as_ref().is_some_and(|(generation, target)| {
            *generation == outcome.generation && *target == outcome.target
        });
        if !latest {
            return Acceptance::Superseded;
        }
        self.pending = None;
        if !selection.is_source_selected(&outcome.target.path, &outcome.target.name) {
            return Acceptance::Deselected;
        }
        Acceptance::Fresh
    }

    /// Surface the first of `errors` for `target`.
    pub fn surface(&mut self, target: CheckTarget, errors: &[BuildError]) -> Option<&BuildError> {
        let first = errors.first()?.clone();
        self.diagnostic = Some(SurfacedDiagnostic {
            target,
            error: first,
            reported: errors.len(),
        });
        self.diagnostic.as_ref().map(|shown| &shown.error)
    }

    pub fn clear_diagnostic(&mut self) {
        self.diagnostic = None;
    }

    pub fn diagnostic(&self) -> Option<&SurfacedDiagnostic> {
        self.diagnostic.as_ref()
    }

    /// Target of the latest check that has not resolved yet.
    pub fn in_flight(&self) -> Option<&CheckTarget> {
        self.pending.as_ref().map(|(_, target)| target)
    }
}
