//! Ordered step pipelines.

use std::fmt;
use std::sync::Arc;

use super::{Action, ActionError};

/// Plain step function, the usual shape of resolvers and handlers.
pub type StepFn = fn(&mut dyn Action) -> Result<(), ActionError>;

type StepBody = dyn Fn(&mut dyn Action) -> Result<(), ActionError> + Send + Sync;

/// One pipeline step.
#[derive(Clone)]
pub struct Step(Arc<StepBody>);

impl Step {
    /// Wraps a function or closure.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut dyn Action) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Self(Arc::new(body))
    }

    /// Runs the step.
    pub fn run(&self, action: &mut dyn Action) -> Result<(), ActionError> {
        (self.0)(action)
    }
}

impl From<StepFn> for Step {
    fn from(step: StepFn) -> Self {
        Self::new(step)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Step")
    }
}

/// Immutable sequence of optional steps.
///
/// Absent steps are skipped; the first failing step stops the run and its
/// error is returned.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<Option<Step>>,
}

impl Script {
    /// Builds an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a script from plain step functions.
    #[must_use]
    pub fn of(steps: &[StepFn]) -> Self {
        Self {
            steps: steps.iter().map(|step| Some(Step::from(*step))).collect(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn then<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut dyn Action) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.steps.push(Some(Step::new(body)));
        self
    }

    /// Appends a step that may be absent.
    #[must_use]
    pub fn then_optional(mut self, step: Option<Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Number of slots, including absent steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Reports whether the script has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every present step in order.
    pub fn run(&self, action: &mut dyn Action) -> Result<(), ActionError> {
        self.steps
            .iter()
            .flatten()
            .try_for_each(|step| step.run(action))
    }
}

impl FromIterator<Step> for Script {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().map(Some).collect(),
        }
    }
}

/// Runs a resolver's prerequisite steps with [`Script::run`] semantics.
pub fn run_prerequisites(action: &mut dyn Action, steps: &[StepFn]) -> Result<(), ActionError> {
    steps.iter().try_for_each(|step| step(action))
}
