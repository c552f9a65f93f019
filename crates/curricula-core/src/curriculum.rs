//! # Curriculum
//!
//! The owning root of the stage graph. Stages are held by name in a
//! `BTreeMap` (the arena); every cross-stage mention is a name-keyed
//! [`StageReference`] resolved through this map.
//!
//! ## Loading
//!
//! 1. Parse every stage body independently; transition targets come back as
//!    bare references.
//! 2. Link: every target name must name a stage in the map, and each
//!    reference is rewritten to a fresh projection of the live stage.
//!
//! Any failure aborts the whole load.
//!
//! Every other construction and mutation path also refreshes target
//! references whose name is known, so a stored reference always matches the
//! stage it names and the written document reads back equal.
//!
//! ## Duplicate Names
//!
//! | Entry point | Policy |
//! |-------------|--------|
//! | [`Curriculum::new`] | last write wins (logged) |
//! | [`Curriculum::try_new`] | reject with `DuplicateStageName` |
//! | [`Curriculum::from_document`] | reject with `DuplicateStageName` |

use crate::formats::{CurriculumDocument, StageDocument, StageEntries};
use crate::primitives::{DEFAULT_DESCRIBED_BY, DEFAULT_SCHEMA_VERSION};
use crate::rule::{QualifiedName, RuleRegistry};
use crate::stage::{Stage, StageReference, TransitionRule};
use crate::types::CurriculumError;
use crate::Metrics;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// DUPLICATE POLICY
// =============================================================================

/// What to do when two stages share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the stage inserted last.
    #[default]
    LastWriteWins,
    /// Fail with `DuplicateStageName`.
    Reject,
}

// =============================================================================
// DECISIONS & EDGES
// =============================================================================

/// The outcome of evaluating a stage's transitions against one metrics snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TransitionDecision<'a> {
    /// Position of the fired transition in the stage's list.
    pub index: usize,
    /// The fired transition.
    pub transition: &'a TransitionRule,
    /// The live stage the transition targets.
    pub target: &'a Stage,
}

/// One edge of the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub index: usize,
    pub rule: &'a QualifiedName,
}

// =============================================================================
// CURRICULUM
// =============================================================================

/// A named, versioned set of stages forming the curriculum graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Curriculum {
    name: String,
    description: String,
    version: Option<String>,
    described_by: String,
    schema_version: String,
    stages: BTreeMap<String, Stage>,
}

impl Curriculum {
    /// Build from stages; on a duplicate name the later stage replaces the earlier.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        stages: impl IntoIterator<Item = Stage>,
    ) -> Self {
        let mut curriculum = Self::empty(name.into(), description.into());
        for stage in stages {
            if let Some(previous) = curriculum.stages.insert(stage.name().to_string(), stage) {
                tracing::warn!(
                    "Curriculum '{}': stage '{}' overwritten by a later stage of the same name",
                    curriculum.name,
                    previous.name()
                );
            }
        }
        curriculum.refresh();
        curriculum
    }

    /// Build from stages, rejecting duplicate names.
    pub fn try_new(
        name: impl Into<String>,
        description: impl Into<String>,
        stages: impl IntoIterator<Item = Stage>,
    ) -> Result<Self, CurriculumError> {
        Self::with_policy(name, description, stages, DuplicatePolicy::Reject)
    }

    /// Build from stages under an explicit duplicate policy.
    pub fn with_policy(
        name: impl Into<String>,
        description: impl Into<String>,
        stages: impl IntoIterator<Item = Stage>,
        policy: DuplicatePolicy,
    ) -> Result<Self, CurriculumError> {
        match policy {
            DuplicatePolicy::LastWriteWins => Ok(Self::new(name, description, stages)),
            DuplicatePolicy::Reject => {
                let mut curriculum = Self::empty(name.into(), description.into());
                for stage in stages {
                    curriculum.insert_stage(stage)?;
                }
                Ok(curriculum)
            }
        }
    }

    fn empty(name: String, description: String) -> Self {
        Self {
            name,
            description,
            version: None,
            described_by: DEFAULT_DESCRIBED_BY.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            stages: BTreeMap::new(),
        }
    }

    /// Derive a copy with a version tag.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Derive a copy with a different `describedBy` link.
    #[must_use]
    pub fn with_described_by(mut self, described_by: impl Into<String>) -> Self {
        self.described_by = described_by.into();
        self
    }

    /// Add a stage, failing if the name is taken.
    pub fn insert_stage(&mut self, stage: Stage) -> Result<(), CurriculumError> {
        if self.stages.contains_key(stage.name()) {
            return Err(CurriculumError::DuplicateStageName(stage.name().to_string()));
        }
        self.stages.insert(stage.name().to_string(), stage);
        self.refresh();
        Ok(())
    }

    /// Append a transition to the stage called `stage`.
    ///
    /// Fails with `StageNotFound` for an unknown stage and with
    /// `InvalidStageState` once that stage is full.
    pub fn append_transition(
        &mut self,
        stage: &str,
        transition: TransitionRule,
    ) -> Result<(), CurriculumError> {
        let owner = self
            .stages
            .get_mut(stage)
            .ok_or_else(|| CurriculumError::StageNotFound(stage.to_string()))?;
        owner.append_transition(transition)?;
        self.refresh();
        Ok(())
    }

    /// Remove and return transition `index` of the stage called `stage`.
    pub fn pop_transition(
        &mut self,
        stage: &str,
        index: usize,
    ) -> Result<TransitionRule, CurriculumError> {
        self.stages
            .get_mut(stage)
            .ok_or_else(|| CurriculumError::StageNotFound(stage.to_string()))?
            .pop_transition(index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn described_by(&self) -> &str {
        &self.described_by
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Look up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    /// All stages in name order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    /// All stage names in order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The live stage a transition points to.
    pub fn target_of(&self, transition: &TransitionRule) -> Option<&Stage> {
        self.stages.get(transition.target_stage().name())
    }

    // =========================================================================
    // LINKING
    // =========================================================================

    /// Check that every transition targets a stage of this curriculum.
    pub fn validate(&self) -> Result<(), CurriculumError> {
        for stage in self.stages.values() {
            for transition in stage.transitions() {
                if self.target_of(transition).is_none() {
                    return Err(CurriculumError::DanglingTransitionTarget {
                        from: stage.name().to_string(),
                        target: transition.target_stage().name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate, then rewrite every target reference from its live stage.
    ///
    /// Nothing is rewritten if validation fails.
    pub fn link(&mut self) -> Result<(), CurriculumError> {
        self.validate()?;
        self.refresh();

        tracing::debug!(
            "Curriculum '{}': linked {} stages",
            self.name,
            self.stages.len()
        );
        Ok(())
    }

    /// Rewrite every target reference whose name is a stage of this
    /// curriculum; dangling names are left for `validate` to report.
    fn refresh(&mut self) {
        let live: BTreeMap<String, StageReference> = self
            .stages
            .iter()
            .map(|(name, stage)| (name.clone(), stage.as_reference()))
            .collect();

        for stage in self.stages.values_mut() {
            for transition in stage.transitions_mut() {
                if let Some(reference) = live.get(transition.target_stage().name()) {
                    transition.relink(reference.clone());
                }
            }
        }
    }

    // =========================================================================
    // GRAPH QUERIES
    // =========================================================================

    /// Evaluate `stage`'s transitions in list order; the first that fires wins.
    ///
    /// Returns `Ok(None)` when no transition fires.
    pub fn decide(
        &self,
        stage: &str,
        metrics: &Metrics,
    ) -> Result<Option<TransitionDecision<'_>>, CurriculumError> {
        let current = self
            .stages
            .get(stage)
            .ok_or_else(|| CurriculumError::StageNotFound(stage.to_string()))?;

        let Some((index, transition)) = current.first_matching(metrics) else {
            return Ok(None);
        };

        let target =
            self.target_of(transition)
                .ok_or_else(|| CurriculumError::DanglingTransitionTarget {
                    from: current.name().to_string(),
                    target: transition.target_stage().name().to_string(),
                })?;

        Ok(Some(TransitionDecision {
            index,
            transition,
            target,
        }))
    }

    /// Every transition as an edge, by source name then list order.
    pub fn edges(&self) -> Vec<Edge<'_>> {
        self.stages
            .values()
            .flat_map(|stage| {
                stage
                    .transitions()
                    .iter()
                    .enumerate()
                    .map(move |(index, t)| Edge {
                        from: stage.name(),
                        to: t.target_stage().name(),
                        index,
                        rule: t.rule().name(),
                    })
            })
            .collect()
    }

    /// Names of all stages reachable from `start` (including `start`).
    pub fn reachable_from(&self, start: &str) -> Result<BTreeSet<&str>, CurriculumError> {
        let (first, _) = self
            .stages
            .get_key_value(start)
            .ok_or_else(|| CurriculumError::StageNotFound(start.to_string()))?;

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(first.as_str());
        queue.push_back(first.as_str());

        while let Some(current) = queue.pop_front() {
            let Some(stage) = self.stages.get(current) else {
                continue;
            };
            for transition in stage.transitions() {
                let target = transition.target_stage().name();
                let Some((name, _)) = self.stages.get_key_value(target) else {
                    continue;
                };
                if visited.insert(name.as_str()) {
                    queue.push_back(name.as_str());
                }
            }
        }

        Ok(visited)
    }

    /// Names of stages that cannot be reached from `start`, in name order.
    pub fn unreachable_from(&self, start: &str) -> Result<Vec<&str>, CurriculumError> {
        let reachable = self.reachable_from(start)?;
        Ok(self
            .stage_names()
            .filter(|name| !reachable.contains(name))
            .collect())
    }

    // =========================================================================
    // DOCUMENT CONVERSION
    // =========================================================================

    /// Project into the serializable document form.
    #[must_use]
    pub fn to_document(&self) -> CurriculumDocument {
        CurriculumDocument {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            described_by: self.described_by.clone(),
            schema_version: self.schema_version.clone(),
            stages: StageEntries(
                self.stages
                    .iter()
                    .map(|(name, stage)| (name.clone(), StageDocument::full(stage)))
                    .collect(),
            ),
        }
    }

    /// Rebuild a linked curriculum from a document.
    pub fn from_document(
        document: CurriculumDocument,
        registry: &RuleRegistry,
    ) -> Result<Self, CurriculumError> {
        let mut stages = BTreeMap::new();
        for (key, body) in document.stages.0 {
            if stages.contains_key(&key) {
                return Err(CurriculumError::DuplicateStageName(key));
            }
            if body.name != key {
                return Err(CurriculumError::InvalidStageState(format!(
                    "stage keyed '{}' is named '{}'",
                    key, body.name
                )));
            }
            let stage = body.into_stage(registry)?;
            stages.insert(key, stage);
        }

        let mut curriculum = Self {
            name: document.name,
            description: document.description,
            version: document.version,
            described_by: document.described_by,
            schema_version: document.schema_version,
            stages,
        };
        curriculum.link()?;
        Ok(curriculum)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rule, Task, named_predicate};

    fn always(_: &Metrics) -> bool {
        true
    }

    fn stage(name: &str) -> Stage {
        let task = Task::new("bar", "").expect("task");
        let metrics = Metrics::new("bar_metrics", "", &task).expect("metrics");
        Stage::new(name, format!("{} stage", name), task, metrics, Vec::new()).expect("stage")
    }

    fn link(from: &mut Stage, to: &Stage) {
        from.append_transition(TransitionRule::new(
            to,
            Rule::from_named(named_predicate!(always)),
            "",
        ))
        .expect("append");
    }

    #[test]
    fn last_write_wins() {
        let first = stage("a");
        let second = Stage::new(
            "a",
            "replacement",
            first.task().clone(),
            first.metrics().clone(),
            Vec::new(),
        )
        .expect("stage");

        let curriculum = Curriculum::new("c", "", vec![first, second]);
        assert_eq!(curriculum.len(), 1);
        assert_eq!(
            curriculum.stage("a").map(Stage::description),
            Some("replacement")
        );
    }

    #[test]
    fn reject_policy() {
        let result = Curriculum::try_new("c", "", vec![stage("a"), stage("a")]);
        assert!(matches!(
            result,
            Err(CurriculumError::DuplicateStageName(ref name)) if name == "a"
        ));
    }

    #[test]
    fn validate_finds_dangling() {
        let ghost = stage("ghost");
        let mut a = stage("a");
        link(&mut a, &ghost);

        let curriculum = Curriculum::new("c", "", vec![a]);
        assert!(matches!(
            curriculum.validate(),
            Err(CurriculumError::DanglingTransitionTarget { ref target, .. }) if target == "ghost"
        ));
    }

    #[test]
    fn link_refreshes_target_description() {
        let mut a = stage("a");
        a.append_transition(TransitionRule::new(
            StageReference::new("b", "stale"),
            Rule::from_named(named_predicate!(always)),
            "",
        ))
        .expect("append");

        let mut curriculum = Curriculum::new("c", "", vec![a, stage("b")]);
        curriculum.link().expect("link");

        let target = curriculum
            .stage("a")
            .map(|s| s.transitions()[0].target_stage().description().to_string());
        assert_eq!(target.as_deref(), Some("b stage"));
    }

    #[test]
    fn replaced_target_is_referenced_fresh() {
        let old = Stage::new(
            "b",
            "old",
            stage("b").task().clone(),
            stage("b").metrics().clone(),
            Vec::new(),
        )
        .expect("stage");
        let mut a = stage("a");
        link(&mut a, &old);

        let curriculum = Curriculum::new("c", "", vec![a, old, stage("b")]);
        let target = curriculum
            .stage("a")
            .map(|s| s.transitions()[0].target_stage().description().to_string());
        assert_eq!(target.as_deref(), Some("b stage"));
    }

    #[test]
    fn insert_refreshes_targets() {
        let mut a = stage("a");
        a.append_transition(TransitionRule::new(
            StageReference::new("b", "stale"),
            Rule::from_named(named_predicate!(always)),
            "",
        ))
        .expect("append");

        let mut curriculum = Curriculum::try_new("c", "", vec![a]).expect("curriculum");
        curriculum.insert_stage(stage("b")).expect("insert");

        let target = curriculum
            .stage("a")
            .map(|s| s.transitions()[0].target_stage().description().to_string());
        assert_eq!(target.as_deref(), Some("b stage"));
    }

    #[test]
    fn append_and_pop_through_curriculum() {
        let mut curriculum = Curriculum::new("c", "", vec![stage("a"), stage("b")]);
        let rule = Rule::from_named(named_predicate!(always));
        let stale = TransitionRule::new(StageReference::new("b", "x"), rule.clone(), "");
        curriculum.append_transition("a", stale).expect("append");

        let stored = curriculum.stage("a").map(|s| s.transitions()[0].target_stage().clone());
        assert_eq!(stored, Some(StageReference::new("b", "b stage")));
        assert!(matches!(
            curriculum.append_transition("zzz", TransitionRule::new(&stage("b"), rule, "")),
            Err(CurriculumError::StageNotFound(_))
        ));

        let popped = curriculum.pop_transition("a", 0).expect("pop");
        assert_eq!(popped.target_stage().name(), "b");
        assert!(matches!(
            curriculum.pop_transition("a", 0),
            Err(CurriculumError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn reachability() {
        let mut a = stage("a");
        let mut b = stage("b");
        let c = stage("c");
        let lonely = stage("lonely");
        link(&mut a, &b);
        link(&mut b, &a);
        link(&mut b, &c);

        let curriculum = Curriculum::new("c", "", vec![a, b, c, lonely]);
        let reachable = curriculum.reachable_from("a").expect("reachable");
        assert_eq!(reachable.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(curriculum.unreachable_from("a").expect("unreachable"), vec!["lonely"]);
        assert!(matches!(
            curriculum.reachable_from("nope"),
            Err(CurriculumError::StageNotFound(_))
        ));
    }

    #[test]
    fn edges_in_order() {
        let mut a = stage("a");
        let b = stage("b");
        let itself = a.clone();
        link(&mut a, &b);
        link(&mut a, &itself);

        let curriculum = Curriculum::new("c", "", vec![a, b]);
        let edges = curriculum.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].from, edges[0].to, edges[0].index), ("a", "b", 0));
        assert_eq!((edges[1].from, edges[1].to, edges[1].index), ("a", "a", 1));
    }

    #[test]
    fn decide_unknown_stage() {
        let curriculum = Curriculum::new("c", "", vec![stage("a")]);
        let metrics = stage("a").metrics().clone();
        assert!(matches!(
            curriculum.decide("zzz", &metrics),
            Err(CurriculumError::StageNotFound(_))
        ));
        assert!(curriculum.decide("a", &metrics).expect("decide").is_none());
    }

    #[test]
    fn duplicate_policy_config_names() {
        let policy: DuplicatePolicy = serde_json::from_str("\"reject\"").expect("parse");
        assert_eq!(policy, DuplicatePolicy::Reject);
        let policy: DuplicatePolicy = serde_json::from_str("\"last-write-wins\"").expect("parse");
        assert_eq!(policy, DuplicatePolicy::LastWriteWins);
    }
}
