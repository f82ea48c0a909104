//! AND/OR Explorer
//!
//! Prolog-inspired recursive descent steering the oracles: each goal is
//! expanded into alternatives (OR), each accepted alternative into the
//! sub-goals it needs (AND), and so on down to the depth limit. Every
//! accepted step is recorded as a Horn clause, so the search leaves behind a
//! logic program to be checked by an entailment engine.
//!
//! The descent runs on an explicit stack. `Solutions` yields each complete
//! root-to-leaf trace as soon as it is found, depth-first, in the order a
//! recursive generator would; the consumer sees partial results while the
//! search continues.

use crate::appraise::{AcceptAll, Appraiser};
use crate::clauses::{ClauseDatabase, FactSet};
use crate::entailment::EntailmentEngine;
use crate::templates::Prompter;
use crate::types::{Costs, Goal, Model, RunEvent, SolutionTrace, Trace};
use crate::unfolder::Unfolder;
use anyhow::{anyhow, Result};
use std::vec;

/// What an exploration leaves behind
#[derive(Debug, Clone)]
pub struct Conclusion {
    /// Every recorded clause, facts included
    pub clauses: ClauseDatabase,
    /// `None` when no model entails the initiator
    pub model: Option<Model>,
    /// Clauses whose bodies are fully supported by the model
    pub trimmed: ClauseDatabase,
}

pub struct AndOrExplorer {
    initiator: Goal,
    prompter: Prompter,
    lim: usize,
    strict: bool,
    unfolder: Unfolder,
    appraiser: Box<dyn Appraiser>,
    clauses: ClauseDatabase,
    facts: FactSet,
}

impl AndOrExplorer {
    /// `lim` is the depth at which goals stop being expanded and become
    /// candidate facts; `strict` records accepted sibling alternatives as
    /// mutually exclusive
    pub fn new(
        initiator: &str,
        prompter: Prompter,
        unfolder: Unfolder,
        lim: usize,
        strict: bool,
    ) -> Result<Self> {
        let initiator =
            Goal::initiator(initiator).ok_or_else(|| anyhow!("Empty initiator goal"))?;
        Ok(Self {
            initiator,
            prompter,
            lim,
            strict,
            unfolder,
            appraiser: Box::new(AcceptAll),
            clauses: ClauseDatabase::new(),
            facts: FactSet::default(),
        })
    }

    pub fn with_appraiser(mut self, appraiser: Box<dyn Appraiser>) -> Self {
        self.appraiser = appraiser;
        self
    }

    pub fn initiator(&self) -> &Goal {
        &self.initiator
    }

    pub fn prompter(&self) -> &Prompter {
        &self.prompter
    }

    /// File-friendly name of the initiator
    pub fn name(&self) -> String {
        file_name(&self.initiator)
    }

    /// `<name>_<prompter>_<lim>`, the stem of output files
    pub fn stem(&self) -> String {
        format!("{}_{}_{}", self.name(), self.prompter.name, self.lim)
    }

    /// Clauses recorded so far, without facts
    pub fn clauses(&self) -> &ClauseDatabase {
        &self.clauses
    }

    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    pub fn costs(&self) -> Costs {
        let unfolded = self.unfolder.costs();
        Costs::new(unfolded.and, unfolded.or, self.appraiser.costs())
    }

    /// Start a fresh exploration from the initiator
    ///
    /// Clears clauses and facts from any previous run.
    pub fn solve(&mut self) -> Solutions<'_> {
        tracing::info!(
            "Exploring '{}' with {} (lim={}, strict={})",
            self.initiator,
            self.prompter.name,
            self.lim,
            self.strict
        );
        self.clauses = ClauseDatabase::new();
        self.facts = FactSet::default();
        let root = Frame::Visit {
            goal: self.initiator.clone(),
            trace: Trace::empty(),
            depth: 0,
        };
        Solutions {
            explorer: self,
            stack: vec![root],
        }
    }

    /// Turn facts into clauses, compute the model and trim to it
    ///
    /// Ends the oracle sessions.
    pub fn conclude(&mut self, engine: &dyn EntailmentEngine) -> Result<Conclusion> {
        let mut clauses = self.clauses.clone();
        clauses.finalize(&self.facts);

        let model = engine.solve_database(&clauses, &self.initiator);
        match &model {
            Some(m) => tracing::info!("Model entailing '{}': {} facts", self.initiator, m.len()),
            None => tracing::info!("No model entailing '{}'", self.initiator),
        }
        let trimmed = clauses.trim(model.as_ref());

        self.unfolder.close()?;
        self.appraiser.close()?;

        Ok(Conclusion {
            clauses,
            model,
            trimmed,
        })
    }

    /// Explore, conclude and report each step to `emit`
    pub fn run(
        &mut self,
        engine: &dyn EntailmentEngine,
        emit: &mut dyn FnMut(RunEvent),
    ) -> Result<Conclusion> {
        emit(RunEvent::Prompter(self.prompter.clone()));
        let mut found = 0usize;
        for trace in self.solve() {
            found += 1;
            emit(RunEvent::Trace(trace));
        }
        tracing::info!(
            "Exploration done: {} traces, {} clauses, {} facts",
            found,
            self.clauses.clause_count(),
            self.facts.len()
        );

        let conclusion = self.conclude(engine)?;
        emit(RunEvent::Clauses(conclusion.clauses.clone()));
        emit(RunEvent::Model(conclusion.model.clone()));
        emit(RunEvent::Costs(self.costs()));
        Ok(conclusion)
    }
}

/// Lower-cased goal text with runs of other characters turned into `_`
pub fn file_name(goal: &Goal) -> String {
    goal.as_str()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

enum Frame {
    /// A goal waiting to be reached
    Visit { goal: Goal, trace: Trace, depth: usize },
    /// A goal whose alternatives are being worked through
    Expand(Expansion),
}

struct Expansion {
    goal: Goal,
    /// Ancestors of `goal`
    trace: Trace,
    depth: usize,
    alternatives: vec::IntoIter<Goal>,
    and_context: String,
    accepted: Vec<Goal>,
}

/// Lazy stream of solution traces, root first
pub struct Solutions<'e> {
    explorer: &'e mut AndOrExplorer,
    stack: Vec<Frame>,
}

impl Solutions<'_> {
    /// Reach `goal`: prune cycles, settle leaves, or start expanding
    fn visit(&mut self, goal: Goal, trace: Trace, depth: usize) -> Option<SolutionTrace> {
        if trace.contains(&goal) {
            tracing::debug!("cycle on '{}' at depth {}", goal, depth);
            return None;
        }

        let explorer = &mut *self.explorer;
        if depth >= explorer.lim {
            if !explorer.appraiser.appraise(&goal, &trace) {
                tracing::debug!("leaf '{}' rejected", goal);
                return None;
            }
            let solution = trace.push(goal.clone()).root_first();
            explorer.facts.insert(goal);
            return Some(solution);
        }

        let or_context = trace.render(explorer.initiator.as_str());
        let alternatives = explorer.unfolder.ask_or(&goal, &or_context);
        tracing::debug!(
            "'{}' at depth {}: {} alternatives",
            goal,
            depth,
            alternatives.len()
        );
        let and_context = trace.push(goal.clone()).render(explorer.initiator.as_str());

        self.stack.push(Frame::Expand(Expansion {
            goal,
            trace,
            depth,
            alternatives: alternatives.into_iter(),
            and_context,
            accepted: Vec::new(),
        }));
        None
    }

    /// Accept the next viable alternative of `expansion` and return the
    /// visits for its sub-goals; `None` once alternatives run out
    fn advance(&mut self, expansion: &mut Expansion) -> Option<Vec<Frame>> {
        let explorer = &mut *self.explorer;

        for h in expansion.alternatives.by_ref() {
            if h == expansion.goal || expansion.trace.contains(&h) {
                continue;
            }
            let bs = explorer.unfolder.ask_and(&h, &expansion.and_context);
            if bs.contains(&h) {
                tracing::debug!("'{}' requires itself, skipped", h);
                continue;
            }
            let parent = expansion.trace.push(expansion.goal.clone());
            if !explorer.appraiser.appraise(&h, &parent) {
                tracing::debug!("alternative '{}' rejected", h);
                continue;
            }

            explorer
                .clauses
                .record(expansion.goal.clone(), vec![h.clone()]);
            explorer.clauses.record(h.clone(), bs.clone());
            expansion.accepted.push(h.clone());

            let trace = parent.push(h);
            let depth = expansion.depth + 1;
            // reversed so the first sub-goal is popped first
            let visits = bs
                .into_iter()
                .rev()
                .map(|b| Frame::Visit {
                    goal: b,
                    trace: trace.clone(),
                    depth,
                })
                .collect();
            return Some(visits);
        }
        None
    }

    /// All alternatives of `expansion` are done
    fn close(&mut self, expansion: Expansion) {
        if self.explorer.strict && expansion.accepted.len() > 1 {
            self.explorer
                .clauses
                .record(Goal::falsum(), expansion.accepted);
        }
    }
}

impl Iterator for Solutions<'_> {
    type Item = SolutionTrace;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Visit { goal, trace, depth } => {
                    if let Some(solution) = self.visit(goal, trace, depth) {
                        return Some(solution);
                    }
                }
                Frame::Expand(mut expansion) => match self.advance(&mut expansion) {
                    Some(visits) => {
                        self.stack.push(Frame::Expand(expansion));
                        self.stack.extend(visits);
                    }
                    None => self.close(expansion),
                },
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entailment::HornProver;
    use crate::oracle::{Oracle, ScriptedOracle};
    use crate::templates;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    fn g(s: &str) -> Goal {
        Goal::verbatim(s)
    }

    fn prompter() -> Prompter {
        templates::find(crate::config::DEFAULT_PROMPTER).unwrap()
    }

    fn explorer(and_: ScriptedOracle, or_: ScriptedOracle, lim: usize, strict: bool) -> AndOrExplorer {
        let unfolder = Unfolder::new(Box::new(and_), Box::new(or_));
        AndOrExplorer::new("Repair a flat tire", prompter(), unfolder, lim, strict).unwrap()
    }

    fn tire_oracles() -> (ScriptedOracle, ScriptedOracle) {
        let or_ = ScriptedOracle::new("or")
            .answer("Repair a flat tire", &["1. Patch the tube", "2. Replace the tube"])
            .answer("Find the leak", &["Listen for hissing", "Submerge in water"]);
        let and_ = ScriptedOracle::new("and")
            .answer("Patch the tube", &["- Find the leak", "- Apply a patch"])
            .answer("Replace the tube", &["- Buy a new tube", "- Fit the tube"])
            .answer("Listen for hissing", &["Quiet room"])
            .answer("Submerge in water", &["Bucket of water"]);
        (and_, or_)
    }

    /// Treats goals listed as rejected as nonexistent
    struct Rejecting(HashSet<Goal>);

    impl Appraiser for Rejecting {
        fn appraise(&mut self, goal: &Goal, _context: &Trace) -> bool {
            !self.0.contains(goal)
        }
    }

    #[test]
    fn test_flat_tire_depth_one() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, false);

        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert_eq!(
            traces,
            vec![
                vec![g("Repair a flat tire"), g("Patch the tube"), g("Find the leak")],
                vec![g("Repair a flat tire"), g("Patch the tube"), g("Apply a patch")],
                vec![g("Repair a flat tire"), g("Replace the tube"), g("Buy a new tube")],
                vec![g("Repair a flat tire"), g("Replace the tube"), g("Fit the tube")],
            ]
        );

        let clauses = explorer.clauses();
        assert_eq!(
            clauses.bodies(&g("Repair a flat tire")).unwrap(),
            &[vec![g("Patch the tube")], vec![g("Replace the tube")]]
        );
        assert_eq!(
            clauses.bodies(&g("Patch the tube")).unwrap(),
            &[vec![g("Find the leak"), g("Apply a patch")]]
        );
        assert_eq!(explorer.facts().len(), 4);
    }

    #[test]
    fn test_leaves_are_never_expanded() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, false);
        explorer.solve().for_each(drop);
        // "Find the leak" has scripted alternatives, but sits at the limit
        assert!(explorer.clauses().bodies(&g("Find the leak")).is_none());
    }

    #[test]
    fn test_depth_two_descends_further() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 2, false);
        let traces: Vec<SolutionTrace> = explorer.solve().collect();

        assert_eq!(
            traces[0],
            vec![
                g("Repair a flat tire"),
                g("Patch the tube"),
                g("Find the leak"),
                g("Listen for hissing"),
                g("Quiet room"),
            ]
        );
        assert_eq!(traces.len(), 2);
        assert!(explorer.facts().contains(&g("Bucket of water")));
    }

    #[test]
    fn test_lazy_yield_before_later_questions() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, false);
        let mut solutions = explorer.solve();
        let first = solutions.next().unwrap();
        assert_eq!(first.last(), Some(&g("Find the leak")));
        drop(solutions);
        // the second alternative has not been expanded yet
        assert!(explorer.clauses().bodies(&g("Replace the tube")).is_none());
    }

    /// Answers with the whole vocabulary except the goal asked about
    struct Everything(&'static [&'static str]);

    impl Oracle for Everything {
        fn name(&self) -> &str {
            "everything"
        }

        fn ask(&mut self, goal: &str, _context: &str) -> String {
            self.0
                .iter()
                .filter(|w| **w != goal)
                .copied()
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    #[test]
    fn test_no_repeated_goals_with_cyclic_oracle() {
        const WORDS: &[&str] = &["a", "b", "c", "d", "e"];
        let unfolder = Unfolder::new(Box::new(Everything(WORDS)), Box::new(Everything(WORDS)));
        let mut explorer = AndOrExplorer::new("a", prompter(), unfolder, 2, false).unwrap();

        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert!(!traces.is_empty());
        for trace in &traces {
            let distinct: HashSet<&Goal> = trace.iter().collect();
            assert_eq!(distinct.len(), trace.len(), "repeated goal in {:?}", trace);
            assert_eq!(trace.len(), 5);
        }
    }

    #[test]
    fn test_self_referential_alternatives_are_skipped() {
        let or_ = ScriptedOracle::new("or").answer("Top", &["Top", "Loop", "Fine"]);
        let and_ = ScriptedOracle::new("and")
            .answer("Loop", &["Loop", "x"])
            .answer("Fine", &["y"]);
        let unfolder = Unfolder::new(Box::new(and_), Box::new(or_));
        let mut explorer = AndOrExplorer::new("Top", prompter(), unfolder, 1, false).unwrap();

        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert_eq!(traces, vec![vec![g("Top"), g("Fine"), g("y")]]);
        assert!(explorer.clauses().bodies(&g("Loop")).is_none());
    }

    #[test]
    fn test_ancestor_alternatives_are_skipped() {
        let or_ = ScriptedOracle::new("or")
            .answer("Top", &["Mid"])
            .answer("sub", &["Top", "Mid", "Other"]);
        let and_ = ScriptedOracle::new("and")
            .answer("Mid", &["sub"])
            .answer("Other", &["leaf"]);
        let unfolder = Unfolder::new(Box::new(and_), Box::new(or_));
        let mut explorer = AndOrExplorer::new("Top", prompter(), unfolder, 2, false).unwrap();

        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert_eq!(
            traces,
            vec![vec![g("Top"), g("Mid"), g("sub"), g("Other"), g("leaf")]]
        );
    }

    #[test]
    fn test_rejected_goals_leave_no_trace() {
        let (and_, or_) = tire_oracles();
        let rejected: HashSet<Goal> = [g("Replace the tube"), g("Apply a patch")].into();
        let mut explorer =
            explorer(and_, or_, 1, false).with_appraiser(Box::new(Rejecting(rejected)));

        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert_eq!(
            traces,
            vec![vec![g("Repair a flat tire"), g("Patch the tube"), g("Find the leak")]]
        );
        assert_eq!(
            explorer.clauses().bodies(&g("Repair a flat tire")).unwrap(),
            &[vec![g("Patch the tube")]]
        );
        assert!(explorer.clauses().bodies(&g("Replace the tube")).is_none());
        assert!(!explorer.facts().contains(&g("Apply a patch")));
    }

    /// Logs every question into a shared list
    struct Recording {
        inner: ScriptedOracle,
        log: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Oracle for Recording {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn ask(&mut self, goal: &str, context: &str) -> String {
            self.log
                .lock()
                .unwrap()
                .push((goal.to_string(), context.to_string()));
            self.inner.ask(goal, context)
        }
    }

    #[test]
    fn test_contexts_passed_to_oracles() {
        let (and_, or_) = tire_oracles();
        let and_log = Arc::new(Mutex::new(Vec::new()));
        let or_log = Arc::new(Mutex::new(Vec::new()));
        let unfolder = Unfolder::new(
            Box::new(Recording {
                inner: and_,
                log: and_log.clone(),
            }),
            Box::new(Recording {
                inner: or_,
                log: or_log.clone(),
            }),
        );
        let mut explorer =
            AndOrExplorer::new("Repair a flat tire", prompter(), unfolder, 2, false).unwrap();
        explorer.solve().for_each(drop);

        let or_log = or_log.lock().unwrap();
        // the root is asked with the initiator itself as context
        assert_eq!(
            or_log[0],
            ("Repair a flat tire".to_string(), "Repair a flat tire".to_string())
        );
        // deeper goals see their ancestors, oldest first
        assert_eq!(
            or_log[1],
            (
                "Find the leak".to_string(),
                "Repair a flat tire.\nPatch the tube.\n".to_string()
            )
        );

        let and_log = and_log.lock().unwrap();
        assert_eq!(
            and_log[0],
            ("Patch the tube".to_string(), "Repair a flat tire.\n".to_string())
        );
        assert_eq!(
            and_log[1],
            (
                "Listen for hissing".to_string(),
                "Repair a flat tire.\nPatch the tube.\nFind the leak.\n".to_string()
            )
        );
    }

    /// Notes each appraised goal with the head of its context
    struct Watching(Arc<Mutex<Vec<(Goal, Option<Goal>)>>>);

    impl Appraiser for Watching {
        fn appraise(&mut self, goal: &Goal, context: &Trace) -> bool {
            self.0
                .lock()
                .unwrap()
                .push((goal.clone(), context.head().cloned()));
            true
        }
    }

    #[test]
    fn test_appraisal_context_starts_at_parent() {
        let or_ = ScriptedOracle::new("or").answer("Top", &["Mid"]);
        let and_ = ScriptedOracle::new("and").answer("Mid", &["Leaf"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let unfolder = Unfolder::new(Box::new(and_), Box::new(or_));
        let mut explorer = AndOrExplorer::new("Top", prompter(), unfolder, 1, false)
            .unwrap()
            .with_appraiser(Box::new(Watching(seen.clone())));

        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert_eq!(traces, vec![vec![g("Top"), g("Mid"), g("Leaf")]]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(g("Mid"), Some(g("Top"))), (g("Leaf"), Some(g("Mid")))]
        );
    }

    #[test]
    fn test_strict_records_exclusivity() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, true);
        explorer.solve().for_each(drop);
        assert_eq!(
            explorer.clauses().bodies(&Goal::falsum()).unwrap(),
            &[vec![g("Patch the tube"), g("Replace the tube")]]
        );
    }

    #[test]
    fn test_strict_single_alternative_records_nothing() {
        let or_ = ScriptedOracle::new("or").answer("Top", &["Only way"]);
        let and_ = ScriptedOracle::new("and").answer("Only way", &["step"]);
        let unfolder = Unfolder::new(Box::new(and_), Box::new(or_));
        let mut explorer = AndOrExplorer::new("Top", prompter(), unfolder, 1, true).unwrap();
        explorer.solve().for_each(drop);
        assert!(explorer.clauses().bodies(&Goal::falsum()).is_none());
    }

    #[test]
    fn test_dead_branch_yields_nothing() {
        let unfolder = Unfolder::new(
            Box::new(ScriptedOracle::new("and")),
            Box::new(ScriptedOracle::new("or")),
        );
        let mut explorer = AndOrExplorer::new("Top", prompter(), unfolder, 2, false).unwrap();
        assert_eq!(explorer.solve().count(), 0);
        assert!(explorer.clauses().is_empty());

        let conclusion = explorer.conclude(&HornProver).unwrap();
        assert!(conclusion.model.is_none());
        assert!(conclusion.trimmed.is_empty());
    }

    #[test]
    fn test_depth_zero_makes_initiator_a_fact() {
        let unfolder = Unfolder::new(
            Box::new(ScriptedOracle::new("and")),
            Box::new(ScriptedOracle::new("or")),
        );
        let mut explorer = AndOrExplorer::new("Top.", prompter(), unfolder, 0, false).unwrap();
        let traces: Vec<SolutionTrace> = explorer.solve().collect();
        assert_eq!(traces, vec![vec![g("Top")]]);
    }

    #[test]
    fn test_conclude_computes_and_trims() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, false);
        explorer.solve().for_each(drop);
        let conclusion = explorer.conclude(&HornProver).unwrap();

        let model = conclusion.model.as_ref().unwrap();
        assert!(model.contains(&g("Repair a flat tire")));
        assert!(model.contains(&g("Patch the tube")));
        assert_eq!(
            conclusion.clauses.bodies(&g("Find the leak")).unwrap(),
            &[Vec::new()]
        );
        assert_eq!(conclusion.trimmed, conclusion.clauses.trim(Some(model)));
    }

    #[test]
    fn test_strict_conclusion_has_no_model_when_both_hold() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, true);
        explorer.solve().for_each(drop);
        let conclusion = explorer.conclude(&HornProver).unwrap();
        assert!(conclusion.model.is_none());
        assert!(conclusion.trimmed.is_empty());
    }

    #[test]
    fn test_run_event_order() {
        let (and_, or_) = tire_oracles();
        let mut explorer = explorer(and_, or_, 1, false);
        let mut kinds = Vec::new();
        explorer
            .run(&HornProver, &mut |event| {
                kinds.push(serde_json::to_value(&event).unwrap()["kind"].clone())
            })
            .unwrap();

        let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            vec!["PROMPTER", "TRACE", "TRACE", "TRACE", "TRACE", "CLAUSES", "MODEL", "COSTS"]
        );
    }

    #[test]
    fn test_names() {
        let (and_, or_) = tire_oracles();
        let explorer = explorer(and_, or_, 1, false);
        assert_eq!(explorer.name(), "repair_a_flat_tire");
        assert_eq!(
            explorer.stem(),
            "repair_a_flat_tire_step_by_step_guidance_to_achieve_a_goal_1"
        );
        assert!(AndOrExplorer::new(
            " . ",
            prompter(),
            Unfolder::new(
                Box::new(ScriptedOracle::new("a")),
                Box::new(ScriptedOracle::new("o"))
            ),
            1,
            false
        )
        .is_err());
    }
}
