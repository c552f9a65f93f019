//! # Task
//!
//! A task is a versioned, named parameter record describing one unit of
//! experimental work. Its domain parameters are opaque to the core: they are
//! stored as a [`Payload`] and written back exactly as they were read.
//!
//! ## Typed Payloads
//!
//! Domain packages describe a concrete task shape by implementing
//! [`TaskSpec`]. Its `NAME` is the discriminant: `Task::decode::<T>()`
//! refuses a record whose `name` differs from `T::NAME`.
//!
//! ## Projections
//!
//! [`Task::as_reference`] strips the payload and yields a [`TaskRef`], the
//! identity pointer embedded wherever a task is mentioned without being owned.

use crate::primitives::{DEFAULT_DESCRIBED_BY, DEFAULT_SCHEMA_VERSION, DEFAULT_VERSION};
use crate::types::{CurriculumError, Payload, ReferenceMarker, is_reserved_field};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub(crate) fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

pub(crate) fn default_schema_version() -> String {
    DEFAULT_SCHEMA_VERSION.to_string()
}

pub(crate) fn default_described_by() -> String {
    DEFAULT_DESCRIBED_BY.to_string()
}

// =============================================================================
// PAYLOAD CONVERSION
// =============================================================================

/// Serialize a typed record into a payload map, rejecting core-owned keys.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<Payload, CurriculumError> {
    let json = serde_json::to_value(value)
        .map_err(|e| CurriculumError::SerializationError(e.to_string()))?;

    let serde_json::Value::Object(map) = json else {
        return Err(CurriculumError::SerializationError(
            "Payload must serialize to a JSON object".to_string(),
        ));
    };

    let mut payload = Payload::new();
    for (key, value) in map {
        if is_reserved_field(&key) {
            return Err(CurriculumError::ReservedField(key));
        }
        payload.insert(key, value);
    }
    Ok(payload)
}

/// Decode a payload map back into a typed record.
pub(crate) fn from_payload<T: DeserializeOwned>(payload: &Payload) -> Result<T, CurriculumError> {
    let map: serde_json::Map<String, serde_json::Value> = payload
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(serde_json::Value::Object(map))
        .map_err(|e| CurriculumError::DeserializationError(e.to_string()))
}

/// Reject payloads that smuggle in a core-owned key (e.g. `is_reference`).
pub(crate) fn check_payload(owner: &str, payload: &Payload) -> Result<(), CurriculumError> {
    match payload.keys().find(|k| is_reserved_field(k)) {
        Some(key) => Err(CurriculumError::InvalidStageState(format!(
            "'{}' carries reserved field '{}' in its payload",
            owner, key
        ))),
        None => Ok(()),
    }
}

// =============================================================================
// TASK SPEC
// =============================================================================

/// A concrete task shape supplied by a domain package.
///
/// Implementors hold only their domain parameters; identity comes from the
/// associated constants.
pub trait TaskSpec: Serialize + DeserializeOwned {
    /// Discriminant written as the task `name`.
    const NAME: &'static str;
    /// Human-readable description.
    const DESCRIPTION: &'static str;
    /// Task version.
    const VERSION: &'static str = DEFAULT_VERSION;
    /// Schema version of the payload.
    const SCHEMA_VERSION: &'static str = DEFAULT_SCHEMA_VERSION;
    /// Link to the task's documentation.
    const DESCRIBED_BY: &'static str = DEFAULT_DESCRIBED_BY;
}

// =============================================================================
// TASK
// =============================================================================

/// A named, versioned parameter record.
///
/// Immutable once constructed; the `with_*` methods derive a modified copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_schema_version")]
    schema_version: String,
    #[serde(rename = "describedBy", default = "default_described_by")]
    described_by: String,
    #[serde(flatten)]
    params: Payload,
}

impl Task {
    /// Create a task with no domain parameters.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, CurriculumError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CurriculumError::InvalidStageState(
                "task name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            description: description.into(),
            version: default_version(),
            schema_version: default_schema_version(),
            described_by: default_described_by(),
            params: Payload::new(),
        })
    }

    /// Build a task from a typed `TaskSpec` record.
    pub fn from_spec<T: TaskSpec>(spec: &T) -> Result<Self, CurriculumError> {
        Ok(Self {
            name: T::NAME.to_string(),
            description: T::DESCRIPTION.to_string(),
            version: T::VERSION.to_string(),
            schema_version: T::SCHEMA_VERSION.to_string(),
            described_by: T::DESCRIBED_BY.to_string(),
            params: to_payload(spec)?,
        })
    }

    /// Decode the payload as `T`, checking the discriminant first.
    pub fn decode<T: TaskSpec>(&self) -> Result<T, CurriculumError> {
        if !self.is_kind::<T>() {
            return Err(CurriculumError::PayloadMismatch {
                expected: T::NAME.to_string(),
                found: self.name.clone(),
            });
        }
        from_payload(&self.params)
    }

    /// Whether this record was produced from (or decodes as) `T`.
    #[must_use]
    pub fn is_kind<T: TaskSpec>(&self) -> bool {
        self.name == T::NAME
    }

    /// Derive a copy with a different version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Derive a copy with a different `describedBy` link.
    #[must_use]
    pub fn with_described_by(mut self, described_by: impl Into<String>) -> Self {
        self.described_by = described_by.into();
        self
    }

    /// Derive a copy with one domain parameter set.
    pub fn with_param<V: Serialize>(
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
        self.params.insert(key, value);
        Ok(self)
    }

    /// Check the construction invariants of a task read from a document.
    pub fn validate(&self) -> Result<(), CurriculumError> {
        if self.name.is_empty() {
            return Err(CurriculumError::InvalidStageState(
                "task name must not be empty".to_string(),
            ));
        }
        check_payload(&self.name, &self.params)
    }

    /// Identity-only projection of this task.
    #[must_use]
    pub fn as_reference(&self) -> TaskRef {
        TaskRef {
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
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

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn described_by(&self) -> &str {
        &self.described_by
    }

    /// All domain parameters.
    pub fn params(&self) -> &Payload {
        &self.params
    }

    /// A single domain parameter.
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }
}

// =============================================================================
// TASK REFERENCE
// =============================================================================

/// Identity pointer to a task: name, description and version tags only.
///
/// Unknown fields are rejected so a full task body cannot pass as a
/// reference and silently lose its params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskRef {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_schema_version")]
    schema_version: String,
    #[serde(default)]
    is_reference: ReferenceMarker,
}

impl TaskRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether this reference points at `task` (same name and version).
    #[must_use]
    pub fn points_to(&self, task: &Task) -> bool {
        self.name == task.name && self.version == task.version
    }
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        task.as_reference()
    }
}

// =============================================================================
// TESTS
// =============================================================================
