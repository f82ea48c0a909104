//! Entailment: minimal models of compiled clause sets

use crate::clauses::{Body, ClauseDatabase};
use crate::types::{Goal, Model};
use std::collections::{HashMap, HashSet, VecDeque};

/// Computes the model entailing `goal`, or `None` if there is none
pub trait EntailmentEngine: Send + Sync {
    fn solve(&self, clauses: &[(Goal, Body)], goal: &Goal) -> Option<Model>;

    fn solve_database(&self, db: &ClauseDatabase, goal: &Goal) -> Option<Model> {
        let clauses: Vec<(Goal, Body)> = db
            .clauses()
            .map(|(head, body)| (head.clone(), body.clone()))
            .collect();
        self.solve(&clauses, goal)
    }
}

/// Forward-chaining prover for propositional Horn clauses
///
/// Computes the least model of the definite clauses, one counter per
/// clause. `false`-headed clauses are integrity constraints: if every atom
/// of one is in the least model there is no model. `fail` is never derived.
#[derive(Debug, Clone, Copy, Default)]
pub struct HornProver;

impl HornProver {
    /// Least model of the definite part of `clauses`
    pub fn least_model(&self, clauses: &[(Goal, Body)]) -> HashSet<Goal> {
        let mut remaining: Vec<usize> = Vec::with_capacity(clauses.len());
        let mut watchers: HashMap<&Goal, Vec<usize>> = HashMap::new();
        let mut model: HashSet<Goal> = HashSet::new();
        let mut queue: VecDeque<&Goal> = VecDeque::new();

        for (i, (head, body)) in clauses.iter().enumerate() {
            let definite = !head.is_false() && !head.is_fail();
            let blocked = body.iter().any(Goal::is_fail);
            if !definite || blocked {
                remaining.push(usize::MAX);
                continue;
            }
            // duplicate atoms in a body count once
            let distinct: HashSet<&Goal> = body.iter().collect();
            remaining.push(distinct.len());
            for atom in distinct {
                watchers.entry(atom).or_default().push(i);
            }
            if body.is_empty() && model.insert(head.clone()) {
                queue.push_back(head);
            }
        }

        while let Some(atom) = queue.pop_front() {
            let Some(watching) = watchers.get(atom) else {
                continue;
            };
            for &i in watching {
                remaining[i] -= 1;
                if remaining[i] == 0 {
                    let head = &clauses[i].0;
                    if model.insert(head.clone()) {
                        queue.push_back(head);
                    }
                }
            }
        }

        model
    }
}

impl EntailmentEngine for HornProver {
    fn solve(&self, clauses: &[(Goal, Body)], goal: &Goal) -> Option<Model> {
        let model = self.least_model(clauses);

        let violated = clauses
            .iter()
            .filter(|(head, _)| head.is_false())
            .find(|(_, body)| body.iter().all(|atom| model.contains(atom)));
        if let Some((_, body)) = violated {
            tracing::debug!("integrity constraint violated: {:?}", body);
            return None;
        }

        if !model.contains(goal) {
            tracing::debug!("goal '{}' not entailed", goal);
            return None;
        }

        Some(model.into_iter().collect())
    }
}
