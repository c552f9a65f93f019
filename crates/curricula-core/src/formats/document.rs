//! # Document Model
//!
//! The serde shapes that are actually written and read. Live objects
//! ([`Curriculum`](crate::Curriculum), [`Stage`]) convert to and from these.
//!
//! ```text
//! {
//!   "name", "description", "version"?, "describedBy", "schema_version",
//!   "stages": {
//!     "<stage name>": {
//!       "name", "description",
//!       "task":    { ...full task... },
//!       "metrics": { ..., "task": { <task reference> } },
//!       "stage_transitions": [
//!         { "target_stage": { "name", "description", "is_reference": true },
//!           "rule": "module.path.symbol",
//!           "description" }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! One [`StageDocument`] shape serves both projections: a full body carries
//! `task`, `metrics` and `stage_transitions`; a reference carries
//! `"is_reference": true` and none of them.

use crate::primitives::MAX_TRANSITIONS_PER_STAGE;
use crate::rule::RuleRegistry;
use crate::stage::{Stage, StageReference, TransitionRule};
use crate::task::{default_described_by, default_schema_version};
use crate::types::CurriculumError;
use crate::{Metrics, Task};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// CURRICULUM DOCUMENT
// =============================================================================

/// Top-level curriculum document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "describedBy", default = "default_described_by")]
    pub described_by: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub stages: StageEntries,
}

/// The `stages` object, kept as read: in key order, duplicates included.
///
/// A plain map would silently keep only the last of two equal keys; keeping
/// the entries lets loading reject the collision instead.
#[derive(Debug, Clone, Default)]
pub struct StageEntries(pub Vec<(String, StageDocument)>);

impl Serialize for StageEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, stage) in &self.0 {
            map.serialize_entry(key, stage)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StageEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = StageEntries;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an object mapping stage names to stage bodies")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, stage)) = access.next_entry::<String, StageDocument>()? {
                    entries.push((key, stage));
                }
                Ok(StageEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

// =============================================================================
// STAGE DOCUMENT
// =============================================================================

/// A stage as written in a document, in either projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reference: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_transitions: Option<Vec<TransitionDocument>>,
}

/// One outgoing transition as written in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDocument {
    pub target_stage: StageDocument,
    pub rule: String,
    #[serde(default)]
    pub description: String,
}

impl StageDocument {
    /// Full projection: own payload, transition targets as references.
    #[must_use]
    pub fn full(stage: &Stage) -> Self {
        Self {
            name: stage.name().to_string(),
            description: stage.description().to_string(),
            is_reference: None,
            task: Some(stage.task().clone()),
            metrics: Some(stage.metrics().clone()),
            stage_transitions: Some(
                stage
                    .transitions()
                    .iter()
                    .map(TransitionDocument::from)
                    .collect(),
            ),
        }
    }

    /// Reference projection: identity only.
    #[must_use]
    pub fn reference(reference: &StageReference) -> Self {
        Self {
            name: reference.name().to_string(),
            description: reference.description().to_string(),
            is_reference: Some(true),
            task: None,
            metrics: None,
            stage_transitions: None,
        }
    }

    /// Whether this body claims to be a reference projection.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.is_reference.unwrap_or(false)
    }

    /// Whether any owned payload field is present.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.task.is_some() || self.metrics.is_some() || self.stage_transitions.is_some()
    }

    /// Rebuild a live stage from a full body.
    ///
    /// Transition targets come back as bare [`StageReference`]s; linking them
    /// to stages is the curriculum's second pass.
    pub fn into_stage(self, registry: &RuleRegistry) -> Result<Stage, CurriculumError> {
        if self.is_reference() {
            return Err(CurriculumError::InvalidStageState(format!(
                "stage '{}' is a reference projection, expected a full body",
                self.name
            )));
        }

        let (Some(task), Some(metrics), Some(transitions)) =
            (self.task, self.metrics, self.stage_transitions)
        else {
            return Err(CurriculumError::InvalidStageState(format!(
                "stage '{}' is missing task, metrics or stage_transitions",
                self.name
            )));
        };

        if transitions.len() > MAX_TRANSITIONS_PER_STAGE {
            return Err(CurriculumError::InvalidStageState(format!(
                "stage '{}' has {} transitions (max {})",
                self.name,
                transitions.len(),
                MAX_TRANSITIONS_PER_STAGE
            )));
        }

        task.validate()?;
        metrics.validate()?;

        let stage_transitions = transitions
            .into_iter()
            .map(|t| t.into_transition(registry))
            .collect::<Result<Vec<_>, _>>()?;

        Stage::new(self.name, self.description, task, metrics, stage_transitions)
    }

    /// Rebuild a reference from a reference body.
    ///
    /// Rejects bodies that embed a payload: a transition target must never
    /// re-embed the target's task, metrics or transitions.
    pub fn into_reference(self) -> Result<StageReference, CurriculumError> {
        if self.is_reference == Some(false) || self.has_payload() {
            return Err(CurriculumError::InvalidStageState(format!(
                "transition target '{}' must be a reference projection",
                self.name
            )));
        }
        if self.name.is_empty() {
            return Err(CurriculumError::InvalidStageState(
                "transition target has an empty name".to_string(),
            ));
        }
        Ok(StageReference::new(self.name, self.description))
    }
}

impl From<&TransitionRule> for TransitionDocument {
    fn from(transition: &TransitionRule) -> Self {
        Self {
            target_stage: StageDocument::reference(transition.target_stage()),
            rule: transition.rule().name().to_string(),
            description: transition.description().to_string(),
        }
    }
}

impl TransitionDocument {
    /// Resolve the rule symbol and rebuild the target reference.
    pub fn into_transition(
        self,
        registry: &RuleRegistry,
    ) -> Result<TransitionRule, CurriculumError> {
        let rule = registry.resolve(&self.rule)?;
        let target = self.target_stage.into_reference()?;
        Ok(TransitionRule::new(target, rule, self.description))
    }
}

// =============================================================================
// TESTS
// =============================================================================
