use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HostError, HostResult};

/// What a step reports when it returns without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    Skipped(String),
}

/// Recorded result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Skipped(String),
    Failed(String),
    NotRun,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("ok"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(err) => write!(f, "FAILED: {err}"),
            Self::NotRun => f.write_str("not run"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
}

/// Names of steps that completed in an earlier run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: BTreeSet<String>,
}

impl Progress {
    pub fn from_json(content: &str) -> HostResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> HostResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

type Action<'a> = Box<dyn FnOnce() -> HostResult<StepOutcome> + 'a>;
type Checkpoint<'a> = Box<dyn FnMut(&Progress) -> HostResult<()> + 'a>;

struct Step<'a> {
    name: &'static str,
    gate: bool,
    action: Action<'a>,
}

/// Ordered list of named steps run fail-fast.
///
/// Every step gets a [`StepRecord`]; after a failure the remaining
/// steps are recorded as [`StepStatus::NotRun`]. With
/// [`Pipeline::resume`], steps already listed in the given
/// [`Progress`] are skipped, and the checkpoint callback is handed
/// the updated progress after each successful step.
///
/// # Example
///
/// ```
/// use supahost::pipeline::{Pipeline, StepOutcome, StepStatus};
///
/// let report = Pipeline::new("demo")
///     .step("first", || Ok(StepOutcome::Done))
///     .step("second", || Ok(StepOutcome::Skipped("nothing to do".into())))
///     .run();
///
/// assert!(report.succeeded());
/// assert_eq!(report.records()[1].status, StepStatus::Skipped("nothing to do".into()));
/// ```
pub struct Pipeline<'a> {
    name: String,
    steps: Vec<Step<'a>>,
    progress: Progress,
    checkpoint: Option<Checkpoint<'a>>,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
            progress: Progress::default(),
            checkpoint: None,
        }
    }

    /// Add a resumable step.
    #[must_use]
    pub fn step(
        mut self,
        name: &'static str,
        action: impl FnOnce() -> HostResult<StepOutcome> + 'a,
    ) -> Self {
        self.steps.push(Step {
            name,
            gate: false,
            action: Box::new(action),
        });
        self
    }

    /// Add a step that runs on every invocation and is never
    /// recorded as completed.
    #[must_use]
    pub fn gate(
        mut self,
        name: &'static str,
        action: impl FnOnce() -> HostResult<StepOutcome> + 'a,
    ) -> Self {
        self.steps.push(Step {
            name,
            gate: true,
            action: Box::new(action),
        });
        self
    }

    /// Skip steps completed in `progress`.
    #[must_use]
    pub fn resume(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn checkpoint(mut self, save: impl FnMut(&Progress) -> HostResult<()> + 'a) -> Self {
        self.checkpoint = Some(Box::new(save));
        self
    }

    pub fn run(self) -> PipelineReport {
        let Self {
            name,
            steps,
            mut progress,
            mut checkpoint,
        } = self;

        let total = steps.len();
        let mut records = Vec::with_capacity(total);
        let mut failure = None;

        for (index, step) in steps.into_iter().enumerate() {
            if failure.is_some() {
                records.push(StepRecord {
                    name: step.name.to_string(),
                    status: StepStatus::NotRun,
                });
                continue;
            }

            if !step.gate && progress.completed.contains(step.name) {
                tracing::info!(pipeline = %name, step = step.name, "already completed, skipping");
                records.push(StepRecord {
                    name: step.name.to_string(),
                    status: StepStatus::Skipped("completed earlier".into()),
                });
                continue;
            }

            tracing::info!(pipeline = %name, step = step.name, "[{}/{total}]", index + 1);

            let status = match (step.action)() {
                Ok(StepOutcome::Done) => StepStatus::Succeeded,
                Ok(StepOutcome::Skipped(reason)) => StepStatus::Skipped(reason),
                Err(err) => {
                    let status = StepStatus::Failed(err.to_string());
                    failure = Some((step.name.to_string(), err));
                    status
                }
            };

            if !step.gate && !matches!(status, StepStatus::Failed(_)) {
                progress.completed.insert(step.name.to_string());
                if let Some(save) = checkpoint.as_mut() {
                    if let Err(err) = save(&progress) {
                        tracing::warn!(step = step.name, "could not record progress: {err}");
                    }
                }
            }

            records.push(StepRecord {
                name: step.name.to_string(),
                status,
            });
        }

        PipelineReport {
            name,
            records,
            failure,
        }
    }
}

/// Per-step results of a pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    name: String,
    records: Vec<StepRecord>,
    failure: Option<(String, HostError)>,
}

impl PipelineReport {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Name of the failed step, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<&str> {
        self.failure.as_ref().map(|(step, _)| step.as_str())
    }

    #[must_use]
    pub fn status_of(&self, step: &str) -> Option<&StepStatus> {
        self.records
            .iter()
            .find(|r| r.name == step)
            .map(|r| &r.status)
    }

    /// One line per step, aligned for terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        let width = self.records.iter().map(|r| r.name.len()).max().unwrap_or(0);
        let mut out = format!("{}:\n", self.name);
        for record in &self.records {
            out.push_str(&format!("  {:<width$}  {}\n", record.name, record.status));
        }
        out
    }

    /// Turn a failed run into [`HostError::StepFailed`].
    pub fn into_result(self) -> HostResult<Vec<StepRecord>> {
        match self.failure {
            None => Ok(self.records),
            Some((step, source)) => Err(HostError::StepFailed {
                step,
                source: Box::new(source),
            }),
        }
    }
}
