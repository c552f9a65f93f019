//! # Scenario Tier Tests (T0-T4)
//!
//! If ANY tier fails, documents produced by this crate cannot be trusted.
//!
//! ## Tiers
//! - T0: Rule Resolution
//! - T1: Round Trip
//! - T2: Reference Acyclicity
//! - T3: Load Validation (dangling targets, duplicates, invalid bodies)
//! - T4: Transition Decisions

use curricula_core::{
    Curriculum, CurriculumError, Metrics, MetricsSpec, Rule, RuleRegistry, Stage, Task, TaskSpec,
    TransitionRule, curriculum_from_json, curriculum_from_json_with, curriculum_to_json,
    curriculum_to_json_pretty, named_predicate,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// DOMAIN FIXTURES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskFoo {
    param1: String,
    param_float_gain: f64,
}

impl TaskSpec for TaskFoo {
    const NAME: &'static str = "foo";
    const DESCRIPTION: &'static str = "Example task.";
    const DESCRIBED_BY: &'static str = "foo.url";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetricsFoo {
    output1: f64,
    output2: f64,
}

impl MetricsSpec for MetricsFoo {
    type Task = TaskFoo;
    const NAME: &'static str = "foo_metrics";
    const DESCRIPTION: &'static str = "Example metrics.";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskBar {
    param1: i64,
    param2: String,
}

impl TaskSpec for TaskBar {
    const NAME: &'static str = "bar";
    const DESCRIPTION: &'static str = "Example task.";
    const DESCRIBED_BY: &'static str = "bar.url";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetricsBar {
    bar_regression_slope: f64,
}

impl MetricsSpec for MetricsBar {
    type Task = TaskBar;
    const NAME: &'static str = "bar_metrics";
    const DESCRIPTION: &'static str = "Example metrics.";
}

fn rule1_bar(metrics: &Metrics) -> bool {
    metrics
        .decode::<MetricsBar>()
        .is_ok_and(|m| m.bar_regression_slope > 0.5)
}

fn rule2_bar(metrics: &Metrics) -> bool {
    let below_two = |x: f64| x < 2.0;
    metrics
        .decode::<MetricsBar>()
        .is_ok_and(|m| below_two(m.bar_regression_slope))
}

fn rule3_foo(metrics: &Metrics) -> bool {
    metrics
        .decode::<MetricsFoo>()
        .is_ok_and(|m| m.output1 == m.output2)
}

fn registry() -> RuleRegistry {
    let registry = RuleRegistry::new();
    registry
        .register_all([
            named_predicate!(rule1_bar),
            named_predicate!(rule2_bar),
            named_predicate!(rule3_foo),
        ])
        .expect("register rules");
    registry
}

fn bar_task(param2: &str) -> Task {
    Task::from_spec(&TaskBar {
        param1: 1,
        param2: param2.to_string(),
    })
    .expect("bar task")
}

fn bar_metrics(task: &Task, slope: f64) -> Metrics {
    Metrics::from_spec(
        &MetricsBar {
            bar_regression_slope: slope,
        },
        task,
    )
    .expect("bar metrics")
}

fn foo_task() -> Task {
    Task::from_spec(&TaskFoo {
        param1: "A".to_string(),
        param_float_gain: 2.0,
    })
    .expect("foo task")
}

fn foo_metrics(task: &Task, output1: f64, output2: f64) -> Metrics {
    Metrics::from_spec(&MetricsFoo { output1, output2 }, task).expect("foo metrics")
}

fn stage(name: &str, task: Task, metrics: Metrics) -> Stage {
    Stage::new(name, "", task, metrics, Vec::new()).expect("stage")
}

/// The three-stage dynamic foraging curriculum with a 1 <-> 2 cycle.
fn foraging() -> Curriculum {
    let task1 = bar_task("A");
    let metrics1 = bar_metrics(&task1, 1.0);
    let mut stage1 = stage("stage1", task1, metrics1);

    let task2 = bar_task("B");
    let metrics2 = bar_metrics(&task2, -0.2);
    let mut stage2 = stage("stage2", task2, metrics2);

    let task3 = foo_task();
    let metrics3 = foo_metrics(&task3, 1.0, 10.0);
    let mut stage3 = stage("stage3", task3, metrics3);

    let r1 = Rule::from_named(named_predicate!(rule1_bar));
    let r2 = Rule::from_named(named_predicate!(rule2_bar));
    let r3 = Rule::from_named(named_predicate!(rule3_foo));

    stage1.append_transition(TransitionRule::new(&stage2, r1.clone(), "rule1"))
        .expect("append");

    stage2.append_transition(TransitionRule::new(&stage1, r1, "rule1"))
        .expect("append");
    stage2.append_transition(TransitionRule::new(&stage3, r2, "rule2"))
        .expect("append");

    stage3.append_transition(TransitionRule::new(&stage1, r3.clone(), "rule3"))
        .expect("append");
    stage3.append_transition(TransitionRule::new(&stage2, r3, "rule3"))
        .expect("append");

    Curriculum::new(
        "major_in_dynamic_foraging",
        "Example curriculum.",
        vec![stage1, stage2, stage3],
    )
    .with_version("0.1.0")
}

// =============================================================================
// TIER T0: RULE RESOLUTION
// =============================================================================

mod t0_rule_resolution {
    use super::*;

    /// T0.1: A resolved rule agrees with the function it names, at and around the threshold.
    #[test]
    fn resolved_rule_matches_function() {
        let registry = registry();
        let original = Rule::from_named(named_predicate!(rule1_bar));
        let symbol = serde_json::to_value(&original)
            .expect("serialize")
            .as_str()
            .map(str::to_string)
            .expect("rule serializes as a string");

        let restored = registry.resolve(&symbol).expect("resolve");
        let task = bar_task("A");
        for slope in [-1.0, 0.0, 0.49, 0.5, 0.51, 7.0] {
            let metrics = bar_metrics(&task, slope);
            assert_eq!(restored.evaluate(&metrics), rule1_bar(&metrics), "slope {}", slope);
        }
    }

    /// T0.2: Equality predicates resolve and behave identically.
    #[test]
    fn equality_rule_boundary() {
        let rule = registry()
            .resolve("scenario_tiers.rule3_foo")
            .expect("resolve");
        let task = foo_task();

        assert!(rule.evaluate(&foo_metrics(&task, 10.0, 10.0)));
        assert!(!rule.evaluate(&foo_metrics(&task, 10.0, 10.000001)));
    }

    /// T0.3: The inner closure of rule2_bar is invisible; only the outer name is written.
    #[test]
    fn closure_inside_rule_is_opaque() {
        let rule = Rule::from_named(named_predicate!(rule2_bar));
        assert_eq!(rule.name().as_str(), "scenario_tiers.rule2_bar");
        assert!(rule.evaluate(&bar_metrics(&bar_task("A"), 1.99)));
        assert!(!rule.evaluate(&bar_metrics(&bar_task("A"), 2.0)));
    }

    /// T0.4: Malformed and unknown symbols fail with distinct errors.
    #[test]
    fn resolution_errors() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("rule1_bar"),
            Err(CurriculumError::MalformedReference(_))
        ));
        assert!(matches!(
            registry.resolve("elsewhere.rule1_bar"),
            Err(CurriculumError::SymbolResolution { .. })
        ));
        assert!(matches!(
            registry.resolve("scenario_tiers.rule9"),
            Err(CurriculumError::SymbolResolution { .. })
        ));
    }
}

// =============================================================================
// TIER T1: ROUND TRIP
// =============================================================================

mod t1_round_trip {
    use super::*;

    /// T1.1: A cyclic curriculum survives serialize -> deserialize unchanged.
    #[test]
    fn cyclic_curriculum_roundtrip() {
        let original = foraging();
        let json = curriculum_to_json(&original).expect("serialize");
        let restored = curriculum_from_json_with(&json, &registry()).expect("deserialize");

        assert_eq!(restored, original);
    }

    /// T1.2: Transition order and rule names survive the round trip.
    #[test]
    fn transition_order_preserved() {
        let json = curriculum_to_json_pretty(&foraging()).expect("serialize");
        let restored = curriculum_from_json_with(&json, &registry()).expect("deserialize");

        let stage2 = restored.stage("stage2").expect("stage2");
        let targets: Vec<_> = stage2
            .transitions()
            .iter()
            .map(|t| (t.target_stage().name(), t.rule().name().symbol()))
            .collect();
        assert_eq!(targets, vec![("stage1", "rule1_bar"), ("stage3", "rule2_bar")]);
    }

    /// T1.3: Typed payloads decode after the round trip.
    #[test]
    fn payloads_decode_after_roundtrip() {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        let restored = curriculum_from_json_with(&json, &registry()).expect("deserialize");

        let task: TaskBar = restored
            .stage("stage2")
            .expect("stage2")
            .task()
            .decode()
            .expect("decode");
        assert_eq!(task.param2, "B");
        assert_eq!(restored.version(), Some("0.1.0"));
    }

    /// T1.4: The process-wide registry resolves documents too.
    #[test]
    fn global_registry_roundtrip() {
        RuleRegistry::global()
            .register_all([
                named_predicate!(rule1_bar),
                named_predicate!(rule2_bar),
                named_predicate!(rule3_foo),
            ])
            .expect("register");

        let json = curriculum_to_json(&foraging()).expect("serialize");
        let restored = curriculum_from_json(&json).expect("deserialize");
        assert_eq!(restored.len(), 3);
    }

    /// T1.5: A target reference built before its stage was replaced reads back equal.
    #[test]
    fn stale_target_reference_roundtrip() {
        let task = bar_task("A");
        let old = Stage::new("b", "old", task.clone(), bar_metrics(&task, 0.0), Vec::new())
            .expect("stage");
        let new = Stage::new("b", "new", task.clone(), bar_metrics(&task, 0.0), Vec::new())
            .expect("stage");
        let mut a = stage("a", task.clone(), bar_metrics(&task, 0.0));
        a.append_transition(TransitionRule::new(
            &old,
            Rule::from_named(named_predicate!(rule1_bar)),
            "",
        ))
        .expect("append");

        let original = Curriculum::new("c", "", vec![a, old, new]);
        let target = original.stage("a").expect("a").transitions()[0].target_stage();
        assert_eq!(target.description(), "new");

        let json = curriculum_to_json(&original).expect("serialize");
        let restored = curriculum_from_json_with(&json, &registry()).expect("deserialize");
        assert_eq!(restored, original);
    }

    /// T1.6: Floats that need every bit of precision survive the round trip.
    #[test]
    fn float_payloads_roundtrip_exactly() {
        let gains = [1.0715660391465826e-75, 0.30000000000000004, f64::MIN_POSITIVE, f64::MAX];
        for gain in gains {
            let task = Task::from_spec(&TaskFoo {
                param1: "A".to_string(),
                param_float_gain: gain,
            })
            .expect("foo task");
            let metrics = foo_metrics(&task, gain, f64::EPSILON);
            let original = Curriculum::new("c", "", vec![stage("s", task, metrics)]);

            let json = curriculum_to_json(&original).expect("serialize");
            let restored = curriculum_from_json_with(&json, &registry()).expect("deserialize");
            assert_eq!(restored, original, "gain {:e}", gain);

            let decoded: TaskFoo = restored.stage("s").expect("s").task().decode().expect("decode");
            assert_eq!(decoded.param_float_gain.to_bits(), gain.to_bits());
        }
    }
}

// =============================================================================
// TIER T2: REFERENCE ACYCLICITY
// =============================================================================

mod t2_reference_acyclicity {
    use super::*;

    /// T2.1: No transition target embeds the target's own payload.
    #[test]
    fn targets_are_depth_one() {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        let document: serde_json::Value = serde_json::from_str(&json).expect("parse");

        let stages = document["stages"].as_object().expect("stages object");
        assert_eq!(stages.len(), 3);

        for (name, body) in stages {
            assert_eq!(body["name"], name.as_str());
            assert!(body["task"].is_object());
            assert!(body["metrics"].is_object());

            for transition in body["stage_transitions"].as_array().expect("transitions") {
                let target = &transition["target_stage"];
                assert_eq!(target["is_reference"], true);
                assert!(target.get("task").is_none());
                assert!(target.get("metrics").is_none());
                assert!(target.get("stage_transitions").is_none());
                assert!(transition["rule"].is_string());
            }
        }
    }

    /// T2.2: Each stage body appears exactly once, as a top-level entry.
    #[test]
    fn each_body_appears_once() {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        // Every full body carries its task's describedBy; targets never do.
        assert_eq!(json.matches("\"bar.url\"").count(), 2);
        assert_eq!(json.matches("\"foo.url\"").count(), 1);
    }

    /// T2.3: Metrics name their task by reference.
    #[test]
    fn metrics_task_is_reference() {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        let document: serde_json::Value = serde_json::from_str(&json).expect("parse");
        let metrics_task = &document["stages"]["stage1"]["metrics"]["task"];

        assert_eq!(metrics_task["name"], "bar");
        assert_eq!(metrics_task["is_reference"], true);
        assert!(metrics_task.get("param2").is_none());
    }
}

// =============================================================================
// TIER T3: LOAD VALIDATION
// =============================================================================

mod t3_load_validation {
    use super::*;

    fn document() -> serde_json::Value {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        serde_json::from_str(&json).expect("parse")
    }

    /// T3.1: A target naming an absent stage fails and yields nothing.
    #[test]
    fn dangling_target_rejected() {
        let mut doc = document();
        doc["stages"]["stage1"]["stage_transitions"][0]["target_stage"]["name"] =
            serde_json::json!("stage9");

        let result = curriculum_from_json_with(&doc.to_string(), &registry());
        assert!(matches!(
            result,
            Err(CurriculumError::DanglingTransitionTarget { ref from, ref target })
                if from == "stage1" && target == "stage9"
        ));
    }

    /// T3.2: Removing a stage that others point to leaves them dangling.
    #[test]
    fn removed_stage_dangles() {
        let mut doc = document();
        doc["stages"]
            .as_object_mut()
            .expect("stages")
            .remove("stage3");

        let result = curriculum_from_json_with(&doc.to_string(), &registry());
        assert!(matches!(
            result,
            Err(CurriculumError::DanglingTransitionTarget { .. })
        ));
    }

    /// T3.3: A duplicated key in `stages` is rejected.
    #[test]
    fn duplicate_key_rejected() {
        let doc = document();
        let body = doc["stages"]["stage3"].to_string();
        let json = format!(
            r#"{{"name": "dup", "stages": {{"stage3": {}, "stage3": {}}}}}"#,
            body, body
        );

        let result = curriculum_from_json_with(&json, &registry());
        assert!(matches!(
            result,
            Err(CurriculumError::DuplicateStageName(ref name)) if name == "stage3"
        ));
    }

    /// T3.4: A stage body whose name disagrees with its key is rejected.
    #[test]
    fn key_name_mismatch_rejected() {
        let mut doc = document();
        doc["stages"]["stage3"]["name"] = serde_json::json!("other");

        let result = curriculum_from_json_with(&doc.to_string(), &registry());
        assert!(matches!(result, Err(CurriculumError::InvalidStageState(_))));
    }

    /// T3.5: A full body with a null task is rejected.
    #[test]
    fn null_task_rejected() {
        let mut doc = document();
        doc["stages"]["stage1"]["task"] = serde_json::Value::Null;

        let result = curriculum_from_json_with(&doc.to_string(), &registry());
        assert!(matches!(result, Err(CurriculumError::InvalidStageState(_))));
    }

    /// T3.6: A target that re-embeds a full body is rejected.
    #[test]
    fn embedded_target_rejected() {
        let mut doc = document();
        let full = doc["stages"]["stage2"].clone();
        doc["stages"]["stage1"]["stage_transitions"][0]["target_stage"] = full;

        let result = curriculum_from_json_with(&doc.to_string(), &registry());
        assert!(matches!(result, Err(CurriculumError::InvalidStageState(_))));
    }

    /// T3.7: An unregistered rule fails the whole load.
    #[test]
    fn unknown_rule_rejected() {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        let empty = RuleRegistry::new();

        let result = curriculum_from_json_with(&json, &empty);
        assert!(matches!(
            result,
            Err(CurriculumError::SymbolResolution { .. })
        ));
    }

    /// T3.8: Last-write-wins on construction keeps a single entry.
    #[test]
    fn duplicate_construction_last_write_wins() {
        let task = bar_task("A");
        let metrics = bar_metrics(&task, 0.0);
        let a1 = stage("a", task.clone(), metrics.clone());
        let a2 = stage("a", task, metrics);

        let curriculum = Curriculum::new("c", "", vec![a1, a2]);
        assert_eq!(curriculum.len(), 1);
    }
}

// =============================================================================
// TIER T4: TRANSITION DECISIONS
// =============================================================================

mod t4_transition_decisions {
    use super::*;

    /// T4.1: stage1 -> stage2 fires at slope 7 and not at slope 0.3.
    #[test]
    fn slope_scenario() {
        let json = curriculum_to_json(&foraging()).expect("serialize");
        let curriculum = curriculum_from_json_with(&json, &registry()).expect("deserialize");
        let task1 = curriculum.stage("stage1").expect("stage1").task().clone();

        let rule = curriculum.stage("stage1").expect("stage1").transitions()[0].rule();
        assert!(rule.evaluate(&bar_metrics(&task1, 7.0)));
        assert!(!rule.evaluate(&bar_metrics(&task1, 0.3)));

        let decision = curriculum
            .decide("stage1", &bar_metrics(&task1, 7.0))
            .expect("decide")
            .expect("fired");
        assert_eq!(decision.target.name(), "stage2");

        let decision = curriculum
            .decide("stage1", &bar_metrics(&task1, 0.3))
            .expect("decide");
        assert!(decision.is_none());
    }

    /// T4.2: When two rules fire, the first in list order wins.
    #[test]
    fn first_match_wins() {
        let curriculum = foraging();
        let task2 = curriculum.stage("stage2").expect("stage2").task().clone();

        // slope 1.0 satisfies both rule1_bar (> 0.5) and rule2_bar (< 2)
        let metrics = bar_metrics(&task2, 1.0);
        let stage2 = curriculum.stage("stage2").expect("stage2");
        assert!(stage2.transitions().iter().all(|t| t.fires(&metrics)));

        let decision = curriculum
            .decide("stage2", &metrics)
            .expect("decide")
            .expect("fired");
        assert_eq!(decision.index, 0);
        assert_eq!(decision.target.name(), "stage1");
    }

    /// T4.3: Popping the first rule hands the decision to the next one.
    #[test]
    fn pop_changes_decision() {
        let mut curriculum = foraging();
        let popped = curriculum.pop_transition("stage2", 0).expect("pop");
        assert_eq!(popped.target_stage().name(), "stage1");

        let task2 = curriculum.stage("stage2").expect("stage2").task().clone();
        let decision = curriculum
            .decide("stage2", &bar_metrics(&task2, 1.0))
            .expect("decide")
            .expect("fired");
        assert_eq!(decision.target.name(), "stage3");

        assert!(matches!(
            curriculum.pop_transition("stage2", 5),
            Err(CurriculumError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }

    /// T4.4: A rule reading another task's metrics does not fire.
    #[test]
    fn foreign_metrics_do_not_fire() {
        let curriculum = foraging();
        let task3 = curriculum.stage("stage3").expect("stage3").task().clone();
        let metrics = foo_metrics(&task3, 3.0, 3.0);

        let stage1 = curriculum.stage("stage1").expect("stage1");
        assert!(stage1.first_matching(&metrics).is_none());

        let decision = curriculum
            .decide("stage3", &metrics)
            .expect("decide")
            .expect("fired");
        assert_eq!(decision.target.name(), "stage1");
    }
}
