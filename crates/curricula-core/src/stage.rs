//! # Stage
//!
//! One node of the curriculum graph. A stage owns its task, its metrics
//! shape and its ordered outgoing transitions. A transition names its target
//! by [`StageReference`] only; the [`crate::Curriculum`] owns every stage and
//! resolves names to stages.
//!
//! ## Projections
//!
//! | Projection | `task` | `metrics` | `stage_transitions` |
//! |------------|--------|-----------|---------------------|
//! | full       | owned  | owned     | targets as references |
//! | reference  | absent | absent    | absent              |
//!
//! Writing transition targets as references bounds every embedded mention to
//! depth one, so a cyclic stage graph still serializes to a finite document.

use crate::primitives::MAX_TRANSITIONS_PER_STAGE;
use crate::types::{CurriculumError, ReferenceMarker};
use crate::{Metrics, Rule, Task};
use serde::Serialize;

// =============================================================================
// STAGE REFERENCE
// =============================================================================

/// Read-only identity view of a stage: name and description.
///
/// Not interchangeable with [`Stage`]; it owns nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReference {
    name: String,
    description: String,
    is_reference: ReferenceMarker,
}

impl StageReference {
    /// Create a reference to the stage called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_reference: ReferenceMarker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl From<&Stage> for StageReference {
    fn from(stage: &Stage) -> Self {
        stage.as_reference()
    }
}

// =============================================================================
// TRANSITION RULE
// =============================================================================

/// An edge from the owning stage to `target_stage`, guarded by `rule`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    target_stage: StageReference,
    rule: Rule,
    description: String,
}

impl TransitionRule {
    /// Create a transition towards `target`.
    #[must_use]
    pub fn new(
        target: impl Into<StageReference>,
        rule: Rule,
        description: impl Into<String>,
    ) -> Self {
        Self {
            target_stage: target.into(),
            rule,
            description: description.into(),
        }
    }

    pub fn target_stage(&self) -> &StageReference {
        &self.target_stage
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluate the guard against a metrics snapshot.
    pub fn fires(&self, metrics: &Metrics) -> bool {
        self.rule.evaluate(metrics)
    }

    /// Replace the target reference with a fresh projection of the live stage.
    pub(crate) fn relink(&mut self, target: StageReference) {
        self.target_stage = target;
    }
}

// =============================================================================
// STAGE
// =============================================================================

/// A curriculum graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    name: String,
    description: String,
    task: Task,
    metrics: Metrics,
    stage_transitions: Vec<TransitionRule>,
}

impl Stage {
    /// Create a stage.
    ///
    /// Fails with `InvalidStageState` if the name is empty, the metrics do not
    /// measure `task`, or there are more transitions than a stage may carry.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        task: Task,
        metrics: Metrics,
        stage_transitions: Vec<TransitionRule>,
    ) -> Result<Self, CurriculumError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CurriculumError::InvalidStageState(
                "stage name must not be empty".to_string(),
            ));
        }
        if metrics.task().name() != task.name() {
            return Err(CurriculumError::InvalidStageState(format!(
                "stage '{}': metrics '{}' measure task '{}', not '{}'",
                name,
                metrics.name(),
                metrics.task().name(),
                task.name()
            )));
        }
        if stage_transitions.len() > MAX_TRANSITIONS_PER_STAGE {
            return Err(CurriculumError::InvalidStageState(format!(
                "stage '{}' has {} transitions (max {})",
                name,
                stage_transitions.len(),
                MAX_TRANSITIONS_PER_STAGE
            )));
        }

        Ok(Self {
            name,
            description: description.into(),
            task,
            metrics,
            stage_transitions,
        })
    }

    /// Identity-only projection of this stage.
    #[must_use]
    pub fn as_reference(&self) -> StageReference {
        StageReference::new(self.name.clone(), self.description.clone())
    }

    /// Append an outgoing transition at the end of the list.
    ///
    /// Fails with `InvalidStageState` once the stage holds
    /// `MAX_TRANSITIONS_PER_STAGE` transitions.
    pub fn append_transition(&mut self, transition: TransitionRule) -> Result<(), CurriculumError> {
        if self.stage_transitions.len() >= MAX_TRANSITIONS_PER_STAGE {
            return Err(CurriculumError::InvalidStageState(format!(
                "stage '{}' already has {} transitions (max {})",
                self.name,
                self.stage_transitions.len(),
                MAX_TRANSITIONS_PER_STAGE
            )));
        }
        self.stage_transitions.push(transition);
        Ok(())
    }

    /// Remove and return the transition at `index`.
    pub fn pop_transition(&mut self, index: usize) -> Result<TransitionRule, CurriculumError> {
        if index >= self.stage_transitions.len() {
            return Err(CurriculumError::IndexOutOfRange {
                index,
                len: self.stage_transitions.len(),
            });
        }
        Ok(self.stage_transitions.remove(index))
    }

    /// The first transition, in list order, whose guard fires.
    pub fn first_matching(&self, metrics: &Metrics) -> Option<(usize, &TransitionRule)> {
        self.stage_transitions
            .iter()
            .enumerate()
            .find(|(_, transition)| transition.fires(metrics))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Outgoing transitions in evaluation order.
    pub fn transitions(&self) -> &[TransitionRule] {
        &self.stage_transitions
    }

    pub(crate) fn transitions_mut(&mut self) -> &mut [TransitionRule] {
        &mut self.stage_transitions
    }
}

// =============================================================================
// TESTS
// =============================================================================
