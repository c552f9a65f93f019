//! # Metrics
//!
//! A metrics record holds measured outcomes for one task. It names the task
//! it measures through a [`TaskRef`]; the owning [`crate::Stage`] holds the
//! task itself.
//!
//! Rule predicates receive a `&Metrics` and read its outputs, either through
//! the untyped accessors or by decoding into a [`MetricsSpec`].

use crate::primitives::{DEFAULT_DESCRIBED_BY, DEFAULT_SCHEMA_VERSION};
use crate::task::{
    Task, TaskRef, TaskSpec, check_payload, default_described_by, default_schema_version,
    from_payload, to_payload,
};
use crate::types::{CurriculumError, Payload, ReferenceMarker, is_reserved_field};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// =============================================================================
// METRICS SPEC
// =============================================================================

/// A concrete metrics shape supplied by a domain package.
pub trait MetricsSpec: Serialize + DeserializeOwned {
    /// The task shape these metrics measure.
    type Task: TaskSpec;
    /// Discriminant written as the metrics `name`.
    const NAME: &'static str;
    /// Human-readable description.
    const DESCRIPTION: &'static str;
    /// Schema version of the payload.
    const SCHEMA_VERSION: &'static str = DEFAULT_SCHEMA_VERSION;
    /// Link to the metrics documentation.
    const DESCRIBED_BY: &'static str = DEFAULT_DESCRIBED_BY;
}

// =============================================================================
// METRICS
// =============================================================================

/// Measured outcomes tied to a specific task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "describedBy", default = "default_described_by")]
    described_by: String,
    #[serde(default = "default_schema_version")]
    schema_version: String,
    task: TaskRef,
    #[serde(flatten)]
    outputs: Payload,
}

impl Metrics {
    /// Create an empty metrics record for `task`.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        task: &Task,
    ) -> Result<Self, CurriculumError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CurriculumError::InvalidStageState(
                "metrics name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            description: description.into(),
            described_by: default_described_by(),
            schema_version: default_schema_version(),
            task: task.as_reference(),
            outputs: Payload::new(),
        })
    }

    /// Build a metrics record from a typed `MetricsSpec` record, bound to `task`.
    ///
    /// Fails with `PayloadMismatch` if `task` is not an `M::Task`.
    pub fn from_spec<M: MetricsSpec>(spec: &M, task: &Task) -> Result<Self, CurriculumError> {
        if !task.is_kind::<M::Task>() {
            return Err(CurriculumError::PayloadMismatch {
                expected: <M::Task as TaskSpec>::NAME.to_string(),
                found: task.name().to_string(),
            });
        }
        Ok(Self {
            name: M::NAME.to_string(),
            description: M::DESCRIPTION.to_string(),
            described_by: M::DESCRIBED_BY.to_string(),
            schema_version: M::SCHEMA_VERSION.to_string(),
            task: task.as_reference(),
            outputs: to_payload(spec)?,
        })
    }

    /// Decode the outputs as `M`, checking the discriminant first.
    pub fn decode<M: MetricsSpec>(&self) -> Result<M, CurriculumError> {
        if self.name != M::NAME {
            return Err(CurriculumError::PayloadMismatch {
                expected: M::NAME.to_string(),
                found: self.name.clone(),
            });
        }
        from_payload(&self.outputs)
    }

    /// Derive a copy with one output set.
    pub fn with_output<V: Serialize>(
        mut self,
        key: impl Into<String>,
        value: V,
    ) -> Result<Self, CurriculumError> {
        let key = key.into();
        if is_reserved_field(&key) {
            return Err(CurriculumError::ReservedField(key));
        }
        let value = serde_json::to_value(value)
            .map_err(|e| CurriculumError::SerializationError(e.to_string()))?;
        self.outputs.insert(key, value);
        Ok(self)
    }

    /// Derive a copy bound to another task.
    #[must_use]
    pub fn for_task(mut self, task: &Task) -> Self {
        self.task = task.as_reference();
        self
    }

    /// Check the construction invariants of a record read from a document.
    pub fn validate(&self) -> Result<(), CurriculumError> {
        if self.name.is_empty() {
            return Err(CurriculumError::InvalidStageState(
                "metrics name must not be empty".to_string(),
            ));
        }
        check_payload(&self.name, &self.outputs)
    }

    /// Identity-only projection of this record.
    #[must_use]
    pub fn as_reference(&self) -> MetricsRef {
        MetricsRef {
            name: self.name.clone(),
            description: self.description.clone(),
            schema_version: self.schema_version.clone(),
            is_reference: ReferenceMarker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn described_by(&self) -> &str {
        &self.described_by
    }

    /// The task these metrics measure.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// All outputs.
    pub fn outputs(&self) -> &Payload {
        &self.outputs
    }

    /// A single output value.
    pub fn output(&self, key: &str) -> Option<&serde_json::Value> {
        self.outputs.get(key)
    }

    /// A single numeric output.
    pub fn output_f64(&self, key: &str) -> Option<f64> {
        self.outputs.get(key).and_then(serde_json::Value::as_f64)
    }
}

// =============================================================================
// METRICS REFERENCE
// =============================================================================

/// Identity pointer to a metrics record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsRef {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_schema_version")]
    schema_version: String,
    #[serde(default)]
    is_reference: ReferenceMarker,
}

impl MetricsRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

// =============================================================================
// TESTS
// =============================================================================
