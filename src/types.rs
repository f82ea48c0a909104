//! Core types for AND/OR goal exploration
//!
//! - `Goal`: a normalized text atom, compared by exact text equality
//! - `Trace`: the ancestor chain of a node, most recent first
//! - `Model`: the atoms an entailment engine proves from a clause set
//! - `RunEvent`: the tagged stream a run emits to its caller

use crate::clauses::ClauseDatabase;
use crate::templates::Prompter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Atom heading exclusivity records in strict mode
pub const FALSE_ATOM: &str = "false";

/// Sole body atom of an explicitly blocked head
pub const FAIL_ATOM: &str = "fail";

/// Characters stripped from both ends of a goal after whitespace collapsing
const TRIMMED: &[char] = &['.', ',', ';', ':', '!', '?', '"', '`', '*', '\''];

/// A normalized text atom
///
/// Case is preserved, runs of whitespace collapse to one space and
/// punctuation is trimmed from both ends. Two goals are the same goal
/// iff their texts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Goal(String);

impl Goal {
    /// Normalize `text` into a goal; `None` if nothing is left
    pub fn new(text: &str) -> Option<Self> {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || TRIMMED.contains(&c));
        if trimmed.is_empty() {
            None
        } else {
            Some(Goal(trimmed.to_string()))
        }
    }

    /// Normalize a user-supplied initiator: sentence dots become spaces
    pub fn initiator(text: &str) -> Option<Self> {
        Self::new(&text.replace('.', " "))
    }

    /// Wrap text as-is, without normalization
    pub fn verbatim(text: impl Into<String>) -> Self {
        Goal(text.into())
    }

    pub fn fail() -> Self {
        Goal(FAIL_ATOM.to_string())
    }

    pub fn falsum() -> Self {
        Goal(FALSE_ATOM.to_string())
    }

    /// `fail` and `false` carry meaning in emitted programs
    pub fn is_reserved(&self) -> bool {
        self.0 == FAIL_ATOM || self.0 == FALSE_ATOM
    }

    pub fn is_fail(&self) -> bool {
        self.0 == FAIL_ATOM
    }

    pub fn is_false(&self) -> bool {
        self.0 == FALSE_ATOM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Goal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ancestor chain of goals, most recent first
///
/// Persistent: `push` shares the parent chain, so sibling branches of the
/// search hold their own traces without copying.
#[derive(Debug, Clone, Default)]
pub struct Trace(Option<Arc<TraceNode>>);

#[derive(Debug)]
struct TraceNode {
    goal: Goal,
    parent: Trace,
    len: usize,
}

impl Trace {
    /// The trace at the search root
    pub fn empty() -> Self {
        Trace(None)
    }

    /// New trace with `goal` as the most recent entry
    pub fn push(&self, goal: Goal) -> Self {
        Trace(Some(Arc::new(TraceNode {
            goal,
            parent: self.clone(),
            len: self.len() + 1,
        })))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |node| node.len)
    }

    /// Most recent entry
    pub fn head(&self) -> Option<&Goal> {
        self.0.as_ref().map(|node| &node.goal)
    }

    /// Whether `goal` occurs anywhere in the chain
    pub fn contains(&self, goal: &Goal) -> bool {
        self.iter().any(|g| g == goal)
    }

    /// Walk from the most recent entry back to the root
    pub fn iter(&self) -> TraceIter<'_> {
        TraceIter {
            next: self.0.as_deref(),
        }
    }

    /// Goals ordered root first
    pub fn root_first(&self) -> Vec<Goal> {
        let mut goals: Vec<Goal> = self.iter().cloned().collect();
        goals.reverse();
        goals
    }

    /// Conversational context: ancestors oldest first, one per line, each
    /// terminated by a dot. An empty trace renders as `fallback`.
    pub fn render(&self, fallback: &str) -> String {
        if self.is_empty() {
            return fallback.to_string();
        }
        self.root_first()
            .iter()
            .map(|g| format!("{}.\n", g))
            .collect()
    }
}

pub struct TraceIter<'a> {
    next: Option<&'a TraceNode>,
}

impl<'a> Iterator for TraceIter<'a> {
    type Item = &'a Goal;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent.0.as_deref();
        Some(&node.goal)
    }
}

/// One successful root-to-leaf path of the search
pub type SolutionTrace = Vec<Goal>;

/// Atoms entailed by a clause set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model(BTreeSet<Goal>);

impl Model {
    pub fn contains(&self, goal: &Goal) -> bool {
        self.0.contains(goal)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.0.iter()
    }
}

impl FromIterator<Goal> for Model {
    fn from_iter<I: IntoIterator<Item = Goal>>(iter: I) -> Self {
        Model(iter.into_iter().collect())
    }
}

/// Running totals for one oracle session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostLedger {
    /// Round trips that reached the backend
    pub calls: u32,
    /// Questions answered from the session store
    pub cached: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Dollars spent on backend calls
    pub dollars: f64,
}

impl CostLedger {
    pub fn add(&mut self, other: &CostLedger) {
        self.calls += other.calls;
        self.cached += other.cached;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.dollars += other.dollars;
    }
}

/// Oracle spend of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Costs {
    pub and: CostLedger,
    pub or: CostLedger,
    pub appraiser: Option<CostLedger>,
    pub total: CostLedger,
}

impl Costs {
    pub fn new(and: CostLedger, or: CostLedger, appraiser: Option<CostLedger>) -> Self {
        let mut total = CostLedger::default();
        total.add(&and);
        total.add(&or);
        if let Some(a) = &appraiser {
            total.add(a);
        }
        Self {
            and,
            or,
            appraiser,
            total,
        }
    }
}

/// What a run reports to its caller, in emission order
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "UPPERCASE")]
pub enum RunEvent {
    Prompter(Prompter),
    Trace(SolutionTrace),
    Clauses(ClauseDatabase),
    /// `None` when no model entails the initiator
    Model(Option<Model>),
    Costs(Costs),
}
