//! Clause database: head atoms mapped to ordered lists of bodies
//!
//! Bodies under one head are OR-alternatives; the atoms of one body are
//! AND-conjuncts. Insertion order of heads and of bodies is kept because it
//! drives program emission.

use crate::types::{Goal, Model};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::{BTreeSet, HashMap};

/// Conjunction of atoms; empty for a fact
pub type Body = Vec<Goal>;

/// Goals accepted at the depth limit, in first-acceptance order
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    order: Vec<Goal>,
    seen: BTreeSet<Goal>,
}

impl FactSet {
    pub fn insert(&mut self, goal: Goal) {
        if self.seen.insert(goal.clone()) {
            self.order.push(goal);
        }
    }

    pub fn contains(&self, goal: &Goal) -> bool {
        self.seen.contains(goal)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.order.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseDatabase {
    entries: Vec<(Goal, Vec<Body>)>,
    index: HashMap<Goal, usize>,
}

impl ClauseDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `body` to the bodies of `head`
    ///
    /// Identical (head, body) pairs are stored again: every recorded body is
    /// a real alternative for emission.
    pub fn record(&mut self, head: Goal, body: Body) {
        let slot = self.slot(head);
        self.entries[slot].1.push(body);
    }

    /// Turn every fact into an empty-body clause, after any existing bodies
    pub fn finalize(&mut self, facts: &FactSet) {
        for fact in facts.iter() {
            self.record(fact.clone(), Vec::new());
        }
    }

    /// Keep only clauses whose every body atom is in `model`
    ///
    /// Heads left without bodies disappear. No model, no clauses.
    pub fn trim(&self, model: Option<&Model>) -> ClauseDatabase {
        let mut trimmed = ClauseDatabase::new();
        let Some(model) = model else {
            return trimmed;
        };
        for (head, body) in self.clauses() {
            if body.iter().all(|atom| model.contains(atom)) {
                trimmed.record(head.clone(), body.clone());
            }
        }
        trimmed
    }

    pub fn bodies(&self, head: &Goal) -> Option<&[Body]> {
        self.index
            .get(head)
            .map(|&slot| self.entries[slot].1.as_slice())
    }

    /// Heads with their bodies, in first-recorded order
    pub fn iter(&self) -> impl Iterator<Item = (&Goal, &[Body])> {
        self.entries
            .iter()
            .map(|(head, bodies)| (head, bodies.as_slice()))
    }

    /// Every (head, body) pair, flattened in emission order
    pub fn clauses(&self) -> impl Iterator<Item = (&Goal, &Body)> {
        self.entries
            .iter()
            .flat_map(|(head, bodies)| bodies.iter().map(move |body| (head, body)))
    }

    pub fn heads(&self) -> impl Iterator<Item = &Goal> {
        self.entries.iter().map(|(head, _)| head)
    }

    pub fn head_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of (head, body) pairs
    pub fn clause_count(&self) -> usize {
        self.entries.iter().map(|(_, bodies)| bodies.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&mut self, head: Goal) -> usize {
        if let Some(&slot) = self.index.get(&head) {
            return slot;
        }
        let slot = self.entries.len();
        self.index.insert(head.clone(), slot);
        self.entries.push((head, Vec::new()));
        slot
    }
}

#[derive(serde::Serialize)]
struct ClauseEntry<'a> {
    head: &'a Goal,
    bodies: &'a [Body],
}

/// Serialized as an ordered list of `{head, bodies}` entries
impl Serialize for ClauseDatabase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (head, bodies) in &self.entries {
            seq.serialize_element(&ClauseEntry { head, bodies })?;
        }
        seq.end()
    }
}
