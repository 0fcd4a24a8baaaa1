//! End-to-end timetabling scenarios.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use u_timetable::catalog::{RawCourse, RawGroup, RawRecords, RawRoom, RawTeacher};
use u_timetable::config::{SoftWeights, SolveLimits, TimetableConfig};
use u_timetable::cp::{Model, ModelBuilder};
use u_timetable::error::{SolverError, TimetableError};
use u_timetable::extract::check_timetable;
use u_timetable::models::{EntityKind, HardConstraint, SolveStatus, Timetable};
use u_timetable::solver::{SolveResult, SolverBackend};
use u_timetable::timetabler::exit_codes;
use u_timetable::{Catalog, SolveOutcome, Timetabler};

fn week(days: u32, per_day: u32) -> RawRecords {
    let mut r = RawRecords::new();
    for d in 0..days {
        for p in 0..per_day {
            let start = 480 + p * 60;
            r = r.slot(format!("d{d}-p{}", p + 1), d, start, start + 50);
        }
    }
    r
}

fn three_courses() -> RawRecords {
    RawRecords::new()
        .slot("mon-1", 0, 480, 570)
        .slot("tue-1", 1, 480, 570)
        .slot("wed-1", 2, 480, 570)
        .room(RawRoom::new("R1", 30))
        .room(RawRoom::new("R2", 50))
        .teacher(RawTeacher::new("T1"))
        .teacher(RawTeacher::new("T2"))
        .teacher(RawTeacher::new("T3"))
        .group(RawGroup::new("G1", 20))
        .group(RawGroup::new("G2", 40))
        .group(RawGroup::new("G3", 25))
        .course(RawCourse::new("ALG", 1))
        .course(RawCourse::new("BIO", 1))
        .course(RawCourse::new("CHM", 1))
        .teach("T1", "ALG")
        .teach("T2", "BIO")
        .teach("T3", "CHM")
        .enroll("G1", "ALG")
        .enroll("G2", "BIO")
        .enroll("G3", "CHM")
}

fn solved(outcome: SolveOutcome) -> Timetable {
    match outcome {
        SolveOutcome::Solved(t) => t,
        other => panic!("expected a timetable, got {other:?}"),
    }
}

#[test]
fn test_three_courses_optimal() {
    let records = three_courses();
    let catalog = Catalog::load(records.clone()).unwrap();
    let t = solved(Timetabler::new().solve(&records).unwrap());

    assert_eq!(t.status, SolveStatus::Optimal);
    assert_eq!(t.entry_count(), 3);
    // G2 (40) only fits in R2
    assert_eq!(t.entry_for_session("BIO/1").unwrap().room_id, "R2");
    assert!(check_timetable(&catalog, &t).is_ok());
}

#[test]
fn test_shared_teacher_infeasible() {
    let records = RawRecords::new()
        .slot("mon-1", 0, 480, 570)
        .room(RawRoom::new("R1", 40))
        .room(RawRoom::new("R2", 40))
        .teacher(RawTeacher::new("T1"))
        .course(RawCourse::new("A", 1))
        .course(RawCourse::new("B", 1))
        .teach("T1", "A")
        .teach("T1", "B");

    let outcome = Timetabler::new().solve(&records).unwrap();
    assert_eq!(outcome.exit_code(), exit_codes::INFEASIBLE);
    let SolveOutcome::Infeasible(report) = outcome else {
        panic!("expected infeasible");
    };
    assert_eq!(
        report.constraints,
        vec![HardConstraint::TeacherNoOverlap { teacher: "T1".into() }]
    );
    assert!(report.implicates(EntityKind::Teacher, "T1"));
    assert!(!report.implicates(EntityKind::Room, "R1"));
    assert_eq!(report.sessions, vec!["A/1".to_string(), "B/1".to_string()]);
}

#[test]
fn test_unmatched_feature_is_model_error() {
    let records = three_courses()
        .course(RawCourse::new("LAB", 2).with_feature("lab"))
        .teach("T1", "LAB");

    let err = Timetabler::new().solve(&records).unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::MODEL_ERROR);
    let TimetableError::Model(model_err) = err else {
        panic!("expected model error");
    };
    let ids: Vec<&str> = model_err.sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["LAB/1", "LAB/2"]);
}

#[test]
fn test_invalid_data_is_collected() {
    let records = three_courses()
        .enroll("G9", "ALG")
        .course(RawCourse::new("ORPHAN", 1));

    let err = Timetabler::new().solve(&records).unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::DATA_ERROR);
    let TimetableError::Data(data) = err else {
        panic!("expected data error");
    };
    assert!(data.issues.len() >= 2);
}

fn large_catalog() -> RawRecords {
    let mut r = week(5, 6)
        .room(RawRoom::new("R1", 40))
        .room(RawRoom::new("R2", 40))
        .room(RawRoom::new("R3", 40));
    for t in 0..4 {
        r = r.teacher(RawTeacher::new(format!("T{t}")));
    }
    for g in 0..4 {
        r = r.group(RawGroup::new(format!("G{g}"), 30));
    }
    for c in 0..12 {
        let id = format!("C{c:02}");
        r = r
            .course(RawCourse::new(id.clone(), 2))
            .teach(format!("T{}", c % 4), id.clone())
            .enroll(format!("G{}", c % 4), id);
    }
    r
}

/// Small enough for the default backend to prove optimality quickly.
fn small_week() -> RawRecords {
    let mut r = week(3, 4)
        .room(RawRoom::new("R1", 40))
        .room(RawRoom::new("R2", 40))
        .teacher(RawTeacher::new("T0"))
        .teacher(RawTeacher::new("T1"))
        .group(RawGroup::new("G0", 30).with_free_day(2))
        .group(RawGroup::new("G1", 30));
    for c in 0..4 {
        let id = format!("C{c}");
        r = r
            .course(RawCourse::new(id.clone(), 2))
            .teach(format!("T{}", c % 2), id.clone())
            .enroll(format!("G{}", c / 2), id);
    }
    r
}

#[test]
fn test_zero_budget_times_out() {
    let mut config = TimetableConfig::default();
    config.limits = SolveLimits::with_time_limit(0);
    let outcome = Timetabler::new()
        .with_config(config)
        .solve(&large_catalog())
        .unwrap();

    assert_eq!(outcome.status(), SolveStatus::Timeout);
    assert!(outcome.timetable().is_none());
    assert_eq!(outcome.exit_code(), exit_codes::TIMEOUT);
}

#[test]
fn test_build_is_deterministic() {
    let catalog = Arc::new(Catalog::load(large_catalog()).unwrap());
    let a = ModelBuilder::new(catalog.clone()).build().unwrap();
    let b = ModelBuilder::new(catalog).build().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_repeated_solves_score_equally() {
    let engine = Timetabler::new();
    let a = solved(engine.solve(&small_week()).unwrap());
    let b = solved(engine.solve(&small_week()).unwrap());
    assert_eq!(a.status, SolveStatus::Optimal);
    assert_eq!(a.score.total, b.score.total);
}

#[test]
fn test_soft_weights_never_change_feasibility() {
    let mut quiet = TimetableConfig::default();
    quiet.weights = SoftWeights::disabled();

    let with_soft = Timetabler::new().solve(&small_week()).unwrap();
    let without = Timetabler::new()
        .with_config(quiet)
        .solve(&small_week())
        .unwrap();

    assert_eq!(with_soft.status(), without.status());
    assert_eq!(without.timetable().unwrap().score.total, 0);
}

#[test]
fn test_config_from_toml_drives_weights() {
    let config = TimetableConfig::from_toml_str(
        r#"
        [limits]
        time_limit_ms = 10000

        [weights]
        preferred_slot_miss = 0
        free_day = 0
        gap_penalties = []
        day_gap_penalties = []
        study_day_miss = 0
        uneven_load = 0
        period_penalties = []
        "#,
    )
    .unwrap();
    let t = solved(
        Timetabler::new()
            .with_config(config)
            .solve(&three_courses())
            .unwrap(),
    );
    assert_eq!(t.score.total, 0);
}

fn days_of(catalog: &Catalog, t: &Timetable, course: &str) -> Vec<u32> {
    t.entries
        .iter()
        .filter(|e| e.course_id == course)
        .map(|e| catalog.slot(&e.slot_id).unwrap().day)
        .collect()
}

#[test]
fn test_short_budget_is_honored() {
    let mut config = TimetableConfig::default();
    config.limits = SolveLimits::with_time_limit(300);
    let records = large_catalog();
    let catalog = Catalog::load(records.clone()).unwrap();

    let started = Instant::now();
    let outcome = Timetabler::new().with_config(config).solve(&records).unwrap();
    assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
    if let Some(t) = outcome.timetable() {
        assert!(check_timetable(&catalog, t).is_ok());
    }
}

#[test]
fn test_study_day_prefers_first_choice() {
    let records = week(3, 2)
        .room(RawRoom::new("R1", 30))
        .teacher(RawTeacher::new("T1").with_study_days(0, 1))
        .course(RawCourse::new("ALG", 2))
        .teach("T1", "ALG");
    let catalog = Catalog::load(records.clone()).unwrap();
    let t = solved(Timetabler::new().solve(&records).unwrap());

    assert_eq!(t.status, SolveStatus::Optimal);
    assert_eq!(t.score.total, 0);
    let mut days = days_of(&catalog, &t, "ALG");
    days.sort_unstable();
    assert_eq!(days, vec![1, 2]);
}

#[test]
fn test_teacher_days_stay_adjacent() {
    let records = week(3, 2)
        .room(RawRoom::new("R1", 30))
        .teacher(RawTeacher::new("T1").avoiding_day_gaps())
        .course(RawCourse::new("ALG", 2))
        .teach("T1", "ALG");
    let catalog = Catalog::load(records.clone()).unwrap();
    let t = solved(Timetabler::new().solve(&records).unwrap());

    let days: BTreeSet<u32> = days_of(&catalog, &t, "ALG").into_iter().collect();
    assert_ne!(days, BTreeSet::from([0, 2]));
    assert_eq!(t.score.total, 0);
}

#[test]
fn test_forenoon_and_lecture_limits_hold() {
    let records = week(2, 6)
        .room(RawRoom::new("R1", 30))
        .teacher(RawTeacher::new("T1").with_max_lectures_per_day(1))
        .course(RawCourse::new("ALG", 1).lecture())
        .course(RawCourse::new("BIO", 1).lecture())
        .course(RawCourse::new("CHM", 2).forenoon_only())
        .teach("T1", "ALG")
        .teach("T1", "BIO")
        .teach("T1", "CHM");
    let catalog = Catalog::load(records.clone()).unwrap();
    let t = solved(Timetabler::new().solve(&records).unwrap());

    assert!(check_timetable(&catalog, &t).is_ok());
    assert_ne!(days_of(&catalog, &t, "ALG"), days_of(&catalog, &t, "BIO"));
    for e in t.entries.iter().filter(|e| e.course_id == "CHM") {
        assert!(catalog.slot(&e.slot_id).unwrap().is_forenoon());
    }
}

#[test]
fn test_one_course_per_day_conflict() {
    let records = week(1, 3)
        .room(RawRoom::new("R1", 30))
        .teacher(RawTeacher::new("T1"))
        .course(RawCourse::new("ALG", 1).one_per_day())
        .course(RawCourse::new("BIO", 1).one_per_day())
        .teach("T1", "ALG")
        .teach("T1", "BIO");

    let outcome = Timetabler::new().solve(&records).unwrap();
    let SolveOutcome::Infeasible(report) = outcome else {
        panic!("expected infeasible, got {outcome:?}");
    };
    assert_eq!(
        report.constraints,
        vec![HardConstraint::OneCoursePerDay { teacher: "T1".into() }]
    );
    assert_eq!(report.sessions, vec!["ALG/1".to_string(), "BIO/1".to_string()]);
}

#[test]
fn test_negative_weight_is_rejected() {
    let err = TimetableConfig::from_toml_str("[weights]\nuneven_load = -1").unwrap_err();
    assert!(err.to_string().contains("uneven_load"));
}

/// Claims optimality for an assignment that double-books rooms.
struct Careless;

impl SolverBackend for Careless {
    fn name(&self) -> &str {
        "careless"
    }

    fn solve(&self, model: &Model, _limits: &SolveLimits) -> Result<SolveResult, SolverError> {
        let picks = vec![0; model.session_count()];
        let values = model.values_for(&picks);
        Ok(SolveResult::with_values(
            SolveStatus::Optimal,
            model,
            values,
            Duration::ZERO,
        ))
    }
}

#[test]
fn test_invalid_solver_output_is_rejected() {
    let err = Timetabler::with_backend(Careless)
        .solve(&three_courses())
        .unwrap_err();
    assert_eq!(err.exit_code(), exit_codes::INTERNAL);
    let TimetableError::Validation(v) = err else {
        panic!("expected validation error");
    };
    assert!(v
        .violations
        .iter()
        .any(|v| v.constraint == HardConstraint::RoomNoOverlap { room: "R1".into() }));
}

#[test]
fn test_timetable_serde_roundtrip() {
    let t = solved(Timetabler::new().solve(&three_courses()).unwrap());
    let json = serde_json::to_string(&t).unwrap();
    let back: Timetable = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
}

#[derive(Debug, Clone)]
struct Instance {
    days: u32,
    per_day: u32,
    rooms: Vec<u32>,
    groups: Vec<u32>,
    // (sessions, teacher, group)
    courses: Vec<(i64, usize, usize)>,
}

impl Instance {
    fn records(&self) -> RawRecords {
        let mut r = week(self.days, self.per_day).teacher(RawTeacher::new("T0"));
        r = r.teacher(RawTeacher::new("T1").with_max_sessions_per_day(2));
        for (i, cap) in self.rooms.iter().enumerate() {
            r = r.room(RawRoom::new(format!("R{i}"), *cap));
        }
        for (i, size) in self.groups.iter().enumerate() {
            r = r.group(RawGroup::new(format!("G{i}"), *size));
        }
        for (i, (sessions, teacher, group)) in self.courses.iter().enumerate() {
            let id = format!("C{i}");
            r = r
                .course(RawCourse::new(id.clone(), *sessions))
                .teach(format!("T{teacher}"), id.clone())
                .enroll(format!("G{}", group % self.groups.len()), id);
        }
        r
    }
}

fn instance() -> impl Strategy<Value = Instance> {
    (
        2u32..4,
        2u32..4,
        prop::collection::vec(15u32..50, 1..3),
        prop::collection::vec(10u32..40, 1..3),
        prop::collection::vec((1i64..3, 0usize..2, 0usize..3), 1..5),
    )
        .prop_map(|(days, per_day, rooms, groups, courses)| Instance {
            days,
            per_day,
            rooms,
            groups,
            courses,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_returned_timetables_satisfy_hard_rules(inst in instance()) {
        let records = inst.records();
        let catalog = Catalog::load(records.clone()).unwrap();
        let sessions = catalog.session_count();

        match Timetabler::new().solve(&records) {
            Ok(SolveOutcome::Solved(t)) => {
                prop_assert_eq!(t.entry_count(), sessions);
                prop_assert!(check_timetable(&catalog, &t).is_ok());
            }
            Ok(SolveOutcome::TimedOut(Some(t))) => {
                prop_assert!(t.best_effort);
                prop_assert!(check_timetable(&catalog, &t).is_ok());
            }
            Ok(SolveOutcome::TimedOut(None)) => {}
            Ok(SolveOutcome::Infeasible(report)) => {
                prop_assert!(!report.constraints.is_empty() || report.fixed_rules_conflict);
            }
            Err(TimetableError::Model(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
