//! Greedy first-fit incumbent.
//!
//! # Algorithm
//!
//! 1. Order sessions by number of candidate placements (fewest first), ties
//!    by session order.
//! 2. For each candidate of a session, set its variable and carry the change
//!    through every auxiliary variable that depends on it (each auxiliary
//!    takes the least value its defining row allows).
//! 3. Keep the candidates whose hard `<=` rows all keep their bound and take
//!    the one adding the least objective, ties by candidate order.
//! 4. Give up as soon as a session has no admissible candidate.
//!
//! No backtracking: a `None` result says nothing about feasibility.
//!
//! # Complexity
//! O(v · a · r) where v = choice variables, a = auxiliaries reached from one
//! variable, r = hard rows per variable.
//!
//! # Reference
//! Carter & Laporte (1996), "Recent developments in practical course
//! timetabling", sequential (largest-degree-first) heuristics

use std::collections::{BTreeMap, BTreeSet};

use crate::cp::{Model, Sense};

const TOL: f64 = 1e-9;

/// Incremental assignment with derived auxiliaries.
struct Propagator<'a> {
    model: &'a Model,
    defining: Vec<Option<usize>>,
    /// Auxiliaries whose defining row reads the variable, with its coefficient.
    readers: Vec<Vec<(usize, i64)>>,
    /// Hard `<=` rows the variable appears in.
    limits: Vec<Vec<(usize, i64)>>,
    cost: Vec<f64>,
    values: Vec<f64>,
    /// Sum of the non-leading terms of each auxiliary's defining row.
    rest: Vec<f64>,
    load: Vec<f64>,
}

/// Value changes caused by setting one choice variable.
struct Delta {
    changes: BTreeMap<usize, f64>,
    rest: BTreeMap<usize, f64>,
}

impl<'a> Propagator<'a> {
    fn new(model: &'a Model) -> Self {
        let vars = model.variables().len();
        let defining = model.defining_rows();
        let mut readers = vec![Vec::new(); vars];
        for (aux, row) in defining.iter().enumerate() {
            let Some(r) = *row else { continue };
            for &(v, coef) in &model.constraints()[r].terms[1..] {
                readers[v.0].push((aux, coef));
            }
        }
        let mut limits = vec![Vec::new(); vars];
        for (r, row) in model.constraints().iter().enumerate() {
            if row.origin.is_hard() && row.sense == Sense::Le {
                for &(v, coef) in &row.terms {
                    limits[v.0].push((r, coef));
                }
            }
        }
        let mut cost = vec![0.0; vars];
        for t in model.objective() {
            cost[t.var.0] += t.coef as f64;
        }

        // Start from the empty assignment.
        let values = model.values_for(&[]);
        let rest = defining
            .iter()
            .map(|row| match row {
                Some(r) => model.constraints()[*r].terms[1..]
                    .iter()
                    .map(|(v, c)| values[v.0] * *c as f64)
                    .sum::<f64>(),
                None => 0.0,
            })
            .collect();
        let load = model.constraints().iter().map(|c| c.lhs(&values)).collect();

        Self {
            model,
            defining,
            readers,
            limits,
            cost,
            values,
            rest,
            load,
        }
    }

    /// Changes caused by setting `var` to 1. Auxiliaries are only created
    /// after the variables they read, so ascending order settles each one
    /// after all of its inputs.
    fn delta(&self, var: usize) -> Delta {
        let mut changes = BTreeMap::new();
        let mut rest: BTreeMap<usize, f64> = BTreeMap::new();
        let mut pending = BTreeSet::from([var]);
        while let Some(v) = pending.pop_first() {
            let new = if v == var {
                1.0
            } else {
                match self.defining[v] {
                    Some(r) => {
                        let row = &self.model.constraints()[r];
                        let sum = self.rest[v] + rest.get(&v).copied().unwrap_or(0.0);
                        self.model.least_value(row, sum)
                    }
                    None => self.values[v],
                }
            };
            let d = new - self.values[v];
            if d.abs() <= TOL {
                continue;
            }
            changes.insert(v, d);
            for &(aux, coef) in &self.readers[v] {
                *rest.entry(aux).or_insert(0.0) += coef as f64 * d;
                pending.insert(aux);
            }
        }
        Delta { changes, rest }
    }

    fn admits(&self, delta: &Delta) -> bool {
        let mut rows: BTreeMap<usize, f64> = BTreeMap::new();
        for (&v, &d) in &delta.changes {
            for &(r, coef) in &self.limits[v] {
                *rows.entry(r).or_insert(0.0) += coef as f64 * d;
            }
        }
        let constraints = self.model.constraints();
        rows.into_iter()
            .all(|(r, d)| self.load[r] + d <= constraints[r].rhs as f64 + TOL)
    }

    fn added_cost(&self, delta: &Delta) -> f64 {
        delta.changes.iter().map(|(&v, &d)| self.cost[v] * d).sum()
    }

    fn apply(&mut self, delta: Delta) {
        let model = self.model;
        let constraints = model.constraints();
        for (v, d) in delta.changes {
            self.values[v] += d;
            for &(r, _) in &self.limits[v] {
                self.load[r] = constraints[r].lhs(&self.values);
            }
        }
        for (aux, d) in delta.rest {
            self.rest[aux] += d;
        }
    }
}

/// Finds a placement for every session without breaking a hard row.
///
/// Returns the chosen index into [`Model::choices`] per session.
pub fn first_fit(model: &Model) -> Option<Vec<usize>> {
    let mut state = Propagator::new(model);

    let mut order: Vec<usize> = (0..model.session_count()).collect();
    order.sort_by_key(|&s| (model.choices(s).len(), s));

    let mut picks = vec![0usize; model.session_count()];
    for s in order {
        let mut best: Option<(usize, f64, Delta)> = None;
        for (i, choice) in model.choices(s).iter().enumerate() {
            let delta = state.delta(choice.var.0);
            if !state.admits(&delta) {
                continue;
            }
            let cost = state.added_cost(&delta);
            if best.as_ref().map_or(true, |(_, c, _)| cost < *c - TOL) {
                best = Some((i, cost, delta));
            }
        }
        let (pick, _, delta) = best?;
        state.apply(delta);
        picks[s] = pick;
    }
    Some(picks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{load, teacher_clash, three_courses, week};
    use crate::catalog::{RawCourse, RawGroup, RawRoom, RawTeacher};
    use crate::cp::ModelBuilder;
    use std::sync::Arc;

    #[test]
    fn test_first_fit_satisfies_rows() {
        let model = ModelBuilder::new(Arc::new(load(three_courses().teach("T1", "BIO"))))
            .build()
            .unwrap();
        let picks = first_fit(&model).unwrap();
        let values = model.values_for(&picks);
        assert!(model
            .constraints()
            .iter()
            .all(|c| c.is_satisfied(&values, 1e-9)));
    }

    #[test]
    fn test_first_fit_gives_up() {
        let model = ModelBuilder::new(Arc::new(load(teacher_clash())))
            .build()
            .unwrap();
        assert!(first_fit(&model).is_none());
    }

    #[test]
    fn test_first_fit_avoids_penalties() {
        // Period 1 carries the default penalty, period 2 does not
        let records = week(1, 2)
            .room(RawRoom::new("R1", 30))
            .teacher(RawTeacher::new("T1"))
            .group(RawGroup::new("G1", 20))
            .course(RawCourse::new("ALG", 1))
            .teach("T1", "ALG")
            .enroll("G1", "ALG");
        let model = ModelBuilder::new(Arc::new(load(records))).build().unwrap();
        let picks = first_fit(&model).unwrap();
        assert_eq!(model.choices(0)[picks[0]].slot, 1);
        assert_eq!(model.objective_value(&model.values_for(&picks)), 0.0);
    }

    #[test]
    fn test_first_fit_keeps_study_day() {
        // Day 0 is T1's only study day choice, so both sessions go elsewhere
        let records = week(3, 1)
            .room(RawRoom::new("R1", 30))
            .teacher(RawTeacher::new("T1").with_study_days(0, 0))
            .course(RawCourse::new("ALG", 2))
            .teach("T1", "ALG");
        let model = ModelBuilder::new(Arc::new(load(records))).build().unwrap();
        let picks = first_fit(&model).unwrap();
        let days: Vec<usize> = picks
            .iter()
            .enumerate()
            .map(|(s, &p)| model.catalog().day_of_slot(model.choices(s)[p].slot))
            .collect();
        assert!(!days.contains(&0));
        let values = model.values_for(&picks);
        assert!(model
            .constraints()
            .iter()
            .all(|c| c.is_satisfied(&values, 1e-9)));
    }
}
