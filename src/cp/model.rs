//! Solver-agnostic integer linear model.
//!
//! A [`Model`] is a list of variables, linear constraints over integer
//! coefficients, and a linear objective to minimize. Every constraint and
//! objective term carries the timetabling rule it was generated from, so
//! solver output can be traced back to domain terms.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::SoftWeights;
use crate::models::{Constraint, HardConstraint, SoftConstraint};

/// Index of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// 0 or 1.
    Binary,
    /// Continuous in `[0, upper]` (unbounded above when `None`).
    NonNegative { upper: Option<i64> },
}

/// A model variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub kind: VarKind,
    /// Readable name for logs and debugging.
    pub name: String,
}

/// One candidate placement of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Binary variable: 1 when the session takes this placement.
    pub var: VarId,
    /// Slot index in the catalog.
    pub slot: usize,
    /// Room index in the catalog.
    pub room: usize,
}

/// Relation between the left-hand side and the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

/// `Σ coef·var (sense) rhs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Rule this row encodes. Soft origins link auxiliary variables.
    pub origin: Constraint,
    pub terms: Vec<(VarId, i64)>,
    pub sense: Sense,
    pub rhs: i64,
}

impl LinearConstraint {
    /// Left-hand side under the given variable values.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| values.get(v.0).copied().unwrap_or(0.0) * *c as f64)
            .sum()
    }

    /// Whether the values satisfy this row within `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let lhs = self.lhs(values);
        let rhs = self.rhs as f64;
        match self.sense {
            Sense::Le => lhs <= rhs + tol,
            Sense::Ge => lhs >= rhs - tol,
            Sense::Eq => (lhs - rhs).abs() <= tol,
        }
    }
}

/// Weighted objective term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    pub origin: SoftConstraint,
    pub var: VarId,
    pub coef: i64,
}

/// Built timetabling model. Minimize the objective subject to the rows.
///
/// Two builds from the same catalog, weights, and relaxation set compare
/// equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) weights: SoftWeights,
    pub(crate) relaxed: BTreeSet<HardConstraint>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) choices: Vec<Vec<Choice>>,
    pub(crate) constraints: Vec<LinearConstraint>,
    pub(crate) objective: Vec<ObjectiveTerm>,
    pub(crate) pruned_by: BTreeSet<HardConstraint>,
}

impl Model {
    /// Catalog the model was built from.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Soft weights used for the objective.
    pub fn weights(&self) -> &SoftWeights {
        &self.weights
    }

    /// Hard groups left out of this model.
    pub fn relaxed(&self) -> &BTreeSet<HardConstraint> {
        &self.relaxed
    }

    /// Whether a hard group was left out.
    pub fn is_relaxed(&self, group: &HardConstraint) -> bool {
        self.relaxed.contains(group)
    }

    /// All variables, choice variables first.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Candidate placements of a session, in `(slot, room)` order.
    pub fn choices(&self, session_idx: usize) -> &[Choice] {
        &self.choices[session_idx]
    }

    /// Candidate placements of all sessions.
    pub fn all_choices(&self) -> &[Vec<Choice>] {
        &self.choices
    }

    /// Constraint rows in emission order.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Objective terms.
    pub fn objective(&self) -> &[ObjectiveTerm] {
        &self.objective
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.choices.len()
    }

    /// Hard groups that shaped this model: every group with a row, plus
    /// every group whose pruning removed a candidate.
    pub fn hard_groups(&self) -> BTreeSet<HardConstraint> {
        let mut groups: BTreeSet<HardConstraint> = self
            .constraints
            .iter()
            .filter_map(|c| match &c.origin {
                Constraint::Hard(h) => Some(h.clone()),
                Constraint::Soft(_) => None,
            })
            .collect();
        groups.extend(self.pruned_by.iter().cloned());
        groups
    }

    /// Hard groups diagnostics may lift.
    pub fn relaxable_groups(&self) -> BTreeSet<HardConstraint> {
        self.hard_groups()
            .into_iter()
            .filter(HardConstraint::is_relaxable)
            .collect()
    }

    /// Sessions whose candidates appear in rows of a hard group.
    pub fn sessions_in(&self, group: &HardConstraint) -> BTreeSet<usize> {
        let vars: BTreeSet<VarId> = self
            .constraints
            .iter()
            .filter(|c| matches!(&c.origin, Constraint::Hard(h) if h == group))
            .flat_map(|c| c.terms.iter().map(|(v, _)| *v))
            .collect();
        self.choices
            .iter()
            .enumerate()
            .filter(|(_, cs)| cs.iter().any(|c| vars.contains(&c.var)))
            .map(|(s, _)| s)
            .collect()
    }

    /// Objective value under the given variable values.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|t| values.get(t.var.0).copied().unwrap_or(0.0) * t.coef as f64)
            .sum()
    }

    /// Decodes values into one chosen placement per session.
    ///
    /// A session gets `None` unless exactly one of its choice variables is
    /// set (value above 0.5).
    pub fn decode(&self, values: &[f64]) -> Vec<Option<Choice>> {
        self.choices
            .iter()
            .map(|cs| {
                let mut set = cs
                    .iter()
                    .filter(|c| values.get(c.var.0).copied().unwrap_or(0.0) > 0.5);
                match (set.next(), set.next()) {
                    (Some(c), None) => Some(*c),
                    _ => None,
                }
            })
            .collect()
    }

    /// Number of choice variables (they precede every auxiliary variable).
    pub fn choice_var_count(&self) -> usize {
        self.choices.iter().map(Vec::len).sum()
    }

    /// Whether every objective coefficient is non-negative, so that no
    /// assignment scores below 0.
    pub fn has_zero_floor(&self) -> bool {
        self.objective.iter().all(|t| t.coef >= 0)
    }

    /// Row that fixes each auxiliary variable: the first row whose leading
    /// term is that variable. Choice variables have none.
    ///
    /// A defining row only reads variables created before its auxiliary.
    pub fn defining_rows(&self) -> Vec<Option<usize>> {
        let first_aux = self.choice_var_count();
        let mut defining = vec![None; self.variables.len()];
        for (r, row) in self.constraints.iter().enumerate() {
            if let Some(&(v, _)) = row.terms.first() {
                if v.0 >= first_aux && defining[v.0].is_none() {
                    defining[v.0] = Some(r);
                }
            }
        }
        defining
    }

    /// Smallest value an auxiliary may take under its defining row, given
    /// the sum of the row's other terms.
    pub fn least_value(&self, row: &LinearConstraint, rest: f64) -> f64 {
        let Some(&(aux, coef)) = row.terms.first() else {
            return 0.0;
        };
        let lower = match (row.sense, coef > 0) {
            (Sense::Ge, true) | (Sense::Le, false) | (Sense::Eq, _) => {
                (row.rhs as f64 - rest) / coef as f64
            }
            // The row only caps the auxiliary from above.
            _ => 0.0,
        };
        let lower = lower.max(0.0);
        match self.variables[aux.0].kind {
            VarKind::Binary => (lower - INTEGRALITY_TOL).ceil().clamp(0.0, 1.0),
            VarKind::NonNegative { .. } => lower,
        }
    }

    /// Variable values placing each session at the given choice index.
    ///
    /// Auxiliary variables take the least value their defining row allows,
    /// so the result is a complete assignment.
    pub fn values_for(&self, picks: &[usize]) -> Vec<f64> {
        let mut values = vec![0.0; self.variables.len()];
        for (s, &pick) in picks.iter().enumerate() {
            if let Some(c) = self.choices.get(s).and_then(|cs| cs.get(pick)) {
                values[c.var.0] = 1.0;
            }
        }
        for (aux, row) in self.defining_rows().into_iter().enumerate() {
            let Some(r) = row else { continue };
            let row = &self.constraints[r];
            let rest: f64 = row.terms[1..]
                .iter()
                .map(|(v, c)| values[v.0] * *c as f64)
                .sum();
            values[aux] = self.least_value(row, rest);
        }
        values
    }
}

/// Slack below an integer that still rounds down to it.
const INTEGRALITY_TOL: f64 = 1e-9;
