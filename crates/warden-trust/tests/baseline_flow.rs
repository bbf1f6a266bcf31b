// baseline_flow.rs — End-to-end confidence flow against real files.
//
// Scenario D from the acceptance list: capture a baseline for a command,
// then re-score the same command after its plan degraded, and observe a
// regression beyond tolerance.

use chrono::{TimeZone, Utc};
use tempfile::tempdir;

use warden_plan::ExecutionPlan;
use warden_trust::fingerprint::confidence_fingerprint;
use warden_trust::{
    compare_confidence, score_features, BaselineStore, ConfidenceBaselineRecord,
    ConfidenceFeatures, FsKvRepo, DEFAULT_TOLERANCE,
};

const CLEAN_PLAN: &str = r#"{
    "execution_id": "exec-1",
    "agent_version": "2.1.0",
    "budgets": {"max_steps": 5},
    "steps": [
        {"step_id": "s1", "action": "fetch", "adapter": "http", "read_only": true},
        {"step_id": "s2", "action": "fetch", "adapter": "http", "read_only": true}
    ]
}"#;

/// Same command, degraded plan: writes appeared, the version pin and
/// declared budgets are gone.
const DEGRADED_PLAN: &str = r#"{
    "execution_id": "exec-2",
    "steps": [
        {"step_id": "s1", "action": "update", "adapter": "http"},
        {"step_id": "s2", "action": "update", "adapter": "http"},
        {"step_id": "s3", "action": "update", "adapter": "http"}
    ]
}"#;

fn score(plan_json: &str) -> warden_trust::ConfidenceScore {
    let plan = ExecutionPlan::parse(plan_json).unwrap();
    let features = ConfidenceFeatures::extract(&plan, false, Some(60_000), true, None);
    score_features(&features)
}

#[test]
fn baseline_then_degraded_score_regresses() {
    let dir = tempdir().unwrap();
    let store = BaselineStore::new(FsKvRepo::open(dir.path().join("confidence-baseline")).unwrap());

    let command = "notion sync pages";
    let fingerprint = confidence_fingerprint(
        command,
        "v1",
        "APPROVAL_GATED_AUTONOMY",
        &[] as &[&str],
    );

    // Capture the baseline from the clean plan.
    let clean = score(CLEAN_PLAN);
    let captured_at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
    let record = ConfidenceBaselineRecord::from_score(
        &fingerprint,
        command,
        "v1",
        "APPROVAL_GATED_AUTONOMY",
        vec![],
        &clean,
        captured_at,
    );
    store.write(&record, false).unwrap();

    // Re-score after the plan degraded.
    let degraded = score(DEGRADED_PLAN);
    assert!(clean.score - degraded.score >= 20.0, "expected a >=20 point drop");

    let baseline = store.latest(&fingerprint).unwrap().unwrap();
    let report = compare_confidence(&baseline, &degraded, DEFAULT_TOLERANCE);
    assert!(report.regressed);
    assert!(report.delta <= -20.0);
}

#[test]
fn rescoring_the_same_plan_does_not_regress() {
    let dir = tempdir().unwrap();
    let store = BaselineStore::new(FsKvRepo::open(dir.path().join("confidence-baseline")).unwrap());

    let fingerprint = confidence_fingerprint("docs capture", "v1", "OFF", &[] as &[&str]);
    let clean = score(CLEAN_PLAN);
    let record = ConfidenceBaselineRecord::from_score(
        &fingerprint,
        "docs capture",
        "v1",
        "OFF",
        vec![],
        &clean,
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
    );
    store.write(&record, false).unwrap();

    let again = score(CLEAN_PLAN);
    let baseline = store.latest(&fingerprint).unwrap().unwrap();
    let report = compare_confidence(&baseline, &again, DEFAULT_TOLERANCE);
    assert!(!report.regressed);
    assert_eq!(report.delta, 0.0);
}
