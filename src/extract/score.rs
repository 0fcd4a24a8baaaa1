//! Soft-constraint scoring.
//!
//! Recomputes every soft penalty from the final assignment and the catalog.
//! Lower is better.
//!
//! # Penalties
//!
//! | Rule | Charge |
//! |------|--------|
//! | PreferredSlot | `preferred_slot_miss` per session outside the preferred slots |
//! | PeriodPenalty | configured penalty per session in that period |
//! | FreeDay | `free_day` per group session on the group's free day |
//! | Compactness | `gap_penalties[k - 1]` per run of `k` idle periods between two sessions of a group's day |
//! | StudyDay | `study_day_miss` per teacher working on the first study day choice |
//! | TeacherDayGap | `day_gap_penalties[k - 1]` per run of `k` idle days between two teaching days |
//! | TeacherLoad / GroupLoad | `uneven_load` per session above ⌈n / days⌉ on a day |

use std::collections::{BTreeMap, BTreeSet};

use super::Placement;
use crate::catalog::Catalog;
use crate::config::SoftWeights;
use crate::models::{SoftConstraint, SoftScore};

/// Scores a complete assignment.
pub(crate) fn score(catalog: &Catalog, weights: &SoftWeights, placed: &[Placement]) -> SoftScore {
    let mut score = SoftScore::default();

    for p in placed {
        let course = catalog.course_of(p.session);
        let slot = &catalog.slots()[p.slot];
        if course.misses_preference(&slot.id) {
            score.add(
                SoftConstraint::PreferredSlot {
                    course: course.id.clone(),
                },
                weights.preferred_slot_miss,
            );
        }
        let period = catalog.period(p.slot);
        score.add(
            SoftConstraint::PeriodPenalty { period },
            weights.period_penalty(period),
        );
    }

    let days = catalog.days().len();
    for group in catalog.groups() {
        let mine: Vec<&Placement> = placed
            .iter()
            .filter(|p| catalog.course_of(p.session).groups.contains(&group.id))
            .collect();
        if mine.is_empty() {
            continue;
        }
        if let Some(free) = group.free_day {
            let on_free_day = mine
                .iter()
                .filter(|p| catalog.slots()[p.slot].day == free)
                .count() as i64;
            score.add(
                SoftConstraint::FreeDay {
                    group: group.id.clone(),
                },
                on_free_day * weights.free_day,
            );
        }
        let mut busy: BTreeMap<usize, BTreeSet<u32>> = BTreeMap::new();
        for p in &mine {
            busy.entry(catalog.day_of_slot(p.slot))
                .or_default()
                .insert(catalog.period(p.slot));
        }
        score.add(
            SoftConstraint::Compactness {
                group: group.id.clone(),
            },
            busy.values()
                .map(|periods| {
                    gap_cost(periods.iter().map(|&p| p as usize), |k| weights.gap_penalty(k))
                })
                .sum(),
        );
        score.add(
            SoftConstraint::GroupLoad {
                group: group.id.clone(),
            },
            overload(catalog, &mine, catalog.group_load(&group.id), days) * weights.uneven_load,
        );
    }

    for teacher in catalog.teachers() {
        let mine: Vec<&Placement> = placed
            .iter()
            .filter(|p| catalog.course_of(p.session).teachers.contains(&teacher.id))
            .collect();
        if mine.is_empty() {
            continue;
        }
        let total = catalog.teacher_load(&teacher.id);
        score.add(
            SoftConstraint::TeacherLoad {
                teacher: teacher.id.clone(),
            },
            overload(catalog, &mine, total, days) * weights.uneven_load,
        );

        let working: BTreeSet<usize> = mine.iter().map(|p| catalog.day_of_slot(p.slot)).collect();
        if let Some(sd) = teacher.study_days.filter(|sd| sd.first != sd.second) {
            if catalog.day_pos(sd.first).is_some_and(|d| working.contains(&d)) {
                score.add(
                    SoftConstraint::StudyDay {
                        teacher: teacher.id.clone(),
                    },
                    weights.study_day_miss,
                );
            }
        }
        if teacher.avoid_day_gaps && total > 1 {
            score.add(
                SoftConstraint::TeacherDayGap {
                    teacher: teacher.id.clone(),
                },
                gap_cost(working.iter().copied(), |k| weights.day_gap_penalty(k)),
            );
        }
    }

    score
}

/// Charges every run of idle positions between two busy ones by its
/// length. `busy` is ascending.
fn gap_cost(busy: impl IntoIterator<Item = usize>, penalty: impl Fn(usize) -> i64) -> i64 {
    let mut cost = 0;
    let mut last: Option<usize> = None;
    for b in busy {
        if let Some(a) = last {
            if b > a + 1 {
                cost += penalty(b - a - 1);
            }
        }
        last = Some(b);
    }
    cost
}

/// Sessions above the even daily share of `total`, summed over days.
fn overload(catalog: &Catalog, placed: &[&Placement], total: u32, days: usize) -> i64 {
    if days == 0 {
        return 0;
    }
    let cap = (total as usize).div_ceil(days);
    let mut per_day: BTreeMap<usize, usize> = BTreeMap::new();
    for p in placed {
        *per_day.entry(catalog.day_of_slot(p.slot)).or_insert(0) += 1;
    }
    per_day
        .values()
        .map(|&n| n.saturating_sub(cap) as i64)
        .sum()
}
