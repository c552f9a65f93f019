//! # Dynamic Foraging
//!
//! The bundled domain package: two tasks, their metrics shapes, three
//! transition predicates and the `major_in_dynamic_foraging` curriculum
//! wiring them together.
//!
//! | From   | To     | Rule        |
//! |--------|--------|-------------|
//! | stage1 | stage2 | `rule1_bar` |
//! | stage2 | stage1 | `rule1_bar` |
//! | stage2 | stage3 | `rule2_bar` |
//! | stage3 | stage1 | `rule3_foo` |
//! | stage3 | stage2 | `rule3_foo` |

use curricula_core::{
    Curriculum, CurriculumError, DuplicatePolicy, Metrics, MetricsSpec, Predicate, Rule,
    RuleRegistry, Stage, Task, TaskSpec, TransitionRule, named_predicate,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// =============================================================================
// TASKS
// =============================================================================

/// Example Foo task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFoo {
    pub param1: String,
    pub param_float_gain: f64,
}

impl Default for TaskFoo {
    fn default() -> Self {
        Self {
            param1: "on".to_string(),
            param_float_gain: 1.0,
        }
    }
}

impl TaskSpec for TaskFoo {
    const NAME: &'static str = "foo";
    const DESCRIPTION: &'static str = "Example task.";
    const DESCRIBED_BY: &'static str = "foo.url";
}

/// Example Bar task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBar {
    pub param1: i64,
    pub param2: String,
}

impl Default for TaskBar {
    fn default() -> Self {
        Self {
            param1: 1,
            param2: "hard_mode_enabled".to_string(),
        }
    }
}

impl TaskSpec for TaskBar {
    const NAME: &'static str = "bar";
    const DESCRIPTION: &'static str = "Example task.";
    const DESCRIBED_BY: &'static str = "bar.url";
}

// =============================================================================
// METRICS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsFoo {
    pub output1: f64,
    pub output2: f64,
}

impl Default for MetricsFoo {
    fn default() -> Self {
        Self {
            output1: 1.0,
            output2: 0.0,
        }
    }
}

impl MetricsSpec for MetricsFoo {
    type Task = TaskFoo;
    const NAME: &'static str = "foo_metrics";
    const DESCRIPTION: &'static str = "Example metrics.";
    const DESCRIBED_BY: &'static str = "foo_metrics.url";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBar {
    /// Slope of the regression over recent sessions.
    pub bar_regression_slope: f64,
}

impl Default for MetricsBar {
    fn default() -> Self {
        Self {
            bar_regression_slope: -0.2,
        }
    }
}

impl MetricsSpec for MetricsBar {
    type Task = TaskBar;
    const NAME: &'static str = "bar_metrics";
    const DESCRIPTION: &'static str = "Example metrics.";
    const DESCRIBED_BY: &'static str = "bar_metrics.url";
}

// =============================================================================
// RULES
// =============================================================================

/// Fires once the regression slope exceeds 0.5.
pub fn rule1_bar(metrics: &Metrics) -> bool {
    metrics
        .decode::<MetricsBar>()
        .is_ok_and(|m| m.bar_regression_slope > 0.5)
}

/// Fires while the regression slope stays below 2.
pub fn rule2_bar(metrics: &Metrics) -> bool {
    let below_two = |x: f64| x < 2.0;
    metrics
        .decode::<MetricsBar>()
        .is_ok_and(|m| below_two(m.bar_regression_slope))
}

/// Fires when both foo outputs agree exactly.
pub fn rule3_foo(metrics: &Metrics) -> bool {
    metrics
        .decode::<MetricsFoo>()
        .is_ok_and(|m| m.output1.partial_cmp(&m.output2) == Some(Ordering::Equal))
}

/// Register every foraging rule into `registry`.
pub fn register_rules(registry: &RuleRegistry) -> Result<(), CurriculumError> {
    registry.register_all([
        named_predicate!(rule1_bar),
        named_predicate!(rule2_bar),
        named_predicate!(rule3_foo),
    ])
}

// =============================================================================
// CURRICULUM
// =============================================================================

fn stage<T: TaskSpec, M: MetricsSpec<Task = T>>(
    name: &str,
    task: &T,
    metrics: &M,
) -> Result<Stage, CurriculumError> {
    let task = Task::from_spec(task)?;
    let metrics = Metrics::from_spec(metrics, &task)?;
    Stage::new(name, "", task, metrics, Vec::new())
}

/// Build the three-stage dynamic foraging curriculum.
///
/// Rules are resolved through `registry`, so [`register_rules`] must have run
/// against it first.
pub fn major_in_dynamic_foraging(
    registry: &RuleRegistry,
    policy: DuplicatePolicy,
) -> Result<Curriculum, CurriculumError> {
    let mut stage1 = stage(
        "stage1",
        &TaskBar {
            param1: 1,
            param2: "A".to_string(),
        },
        &MetricsBar {
            bar_regression_slope: 1.0,
        },
    )?;
    let mut stage2 = stage(
        "stage2",
        &TaskBar {
            param1: 1,
            param2: "B".to_string(),
        },
        &MetricsBar::default(),
    )?;
    let mut stage3 = stage(
        "stage3",
        &TaskFoo {
            param1: "A".to_string(),
            param_float_gain: 2.0,
        },
        &MetricsFoo {
            output2: 10.0,
            ..MetricsFoo::default()
        },
    )?;

    let rule1 = Rule::new(rule1_bar as Predicate, registry)?;
    let rule2 = Rule::new(rule2_bar as Predicate, registry)?;
    let rule3 = Rule::new(rule3_foo as Predicate, registry)?;

    stage1.append_transition(TransitionRule::new(&stage2, rule1.clone(), "rule1"))?;

    stage2.append_transition(TransitionRule::new(&stage1, rule1, "rule1"))?;
    stage2.append_transition(TransitionRule::new(&stage3, rule2, "rule2"))?;

    stage3.append_transition(TransitionRule::new(&stage1, rule3.clone(), "rule3"))?;
    stage3.append_transition(TransitionRule::new(&stage2, rule3, "rule3"))?;

    let curriculum = Curriculum::with_policy(
        "major_in_dynamic_foraging",
        "Example curriculum.",
        [stage1, stage2, stage3],
        policy,
    )?
    .with_described_by("ASD");

    curriculum.validate()?;
    Ok(curriculum)
}

// =============================================================================
// TESTS
// =============================================================================
