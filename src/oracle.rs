//! Oracles: sessions answering questions about goals
//!
//! An `Agent` binds one prompt template to a completion backend and an
//! optional session store. Each round trip is checkpointed as soon as it
//! returns; a question already in the store is answered from it for free.
//! Backend failures degrade to an empty answer so a single unreachable node
//! never aborts an exploration.

use crate::db::{SessionStore, StoredAnswer};
use crate::llm::Completion;
use crate::types::{CostLedger, Goal};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Answers `(goal, context)` questions with raw text
pub trait Oracle: Send {
    fn name(&self) -> &str;

    /// Raw answer; empty when the oracle cannot answer
    fn ask(&mut self, goal: &str, context: &str) -> String;

    fn costs(&self) -> CostLedger {
        CostLedger::default()
    }

    /// End of session
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fill `$context` and `$g` placeholders of a prompt template
///
/// One left-to-right pass: inserted text is never scanned for placeholders.
pub fn render_prompt(pattern: &str, goal: &str, context: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + goal.len() + context.len());
    let mut rest = pattern;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        if let Some(after) = tail.strip_prefix("$context") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("$g") {
            out.push_str(goal);
            rest = after;
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Split a raw answer into itemized goals
///
/// List markers and numbering are stripped, preamble lines ending in `:`
/// and the reserved atoms are dropped, and duplicates keep their first
/// position.
pub fn clean_answer(raw: &str) -> Vec<Goal> {
    let mut seen = HashSet::new();
    raw.lines()
        .filter_map(item_text)
        .filter_map(Goal::new)
        .filter(|goal| !goal.is_reserved())
        .filter(|goal| seen.insert(goal.clone()))
        .collect()
}

fn item_text(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.ends_with(':') {
        return None;
    }
    let line = line
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•' | '+'))
        .trim_start();

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        let mut chars = rest.chars();
        if let Some('.' | ')') = chars.next() {
            let after = chars.as_str();
            if after.is_empty() || after.starts_with(char::is_whitespace) {
                return Some(after.trim_start());
            }
        }
    }
    Some(line)
}

/// A named oracle session over an LLM backend
pub struct Agent {
    name: String,
    pattern: String,
    backend: Arc<dyn Completion>,
    store: Option<SessionStore>,
    ledger: CostLedger,
}

impl Agent {
    /// Open a session; answers found in `store` are reused
    pub fn open(
        name: impl Into<String>,
        pattern: impl Into<String>,
        backend: Arc<dyn Completion>,
        store: Option<SessionStore>,
    ) -> Self {
        let name = name.into();
        tracing::debug!("Opening oracle session {}", name);
        Self {
            name,
            pattern: pattern.into(),
            backend,
            store,
            ledger: CostLedger::default(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn recall(&self, prompt: &str) -> Option<StoredAnswer> {
        let store = self.store.as_ref()?;
        match store.lookup(&self.name, prompt) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Session store lookup failed for {}: {}", self.name, e);
                None
            }
        }
    }
}

impl Oracle for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    fn ask(&mut self, goal: &str, context: &str) -> String {
        let prompt = render_prompt(&self.pattern, goal, context);

        if let Some(stored) = self.recall(&prompt) {
            tracing::debug!("{}: answered from session store for '{}'", self.name, goal);
            self.ledger.cached += 1;
            return stored.answer;
        }

        match self.backend.complete(&prompt) {
            Ok(completed) => {
                let dollars = self.backend.price(&completed);
                self.ledger.calls += 1;
                self.ledger.input_tokens += completed.input_tokens;
                self.ledger.output_tokens += completed.output_tokens;
                self.ledger.dollars += dollars;

                if let Some(store) = &self.store {
                    let stored = StoredAnswer {
                        answer: completed.text.clone(),
                        input_tokens: completed.input_tokens,
                        output_tokens: completed.output_tokens,
                        dollars,
                    };
                    if let Err(e) = store.checkpoint(&self.name, &prompt, &stored) {
                        tracing::warn!("Checkpoint failed for {}: {}", self.name, e);
                    }
                }
                completed.text
            }
            Err(e) => {
                tracing::warn!("{}: no answer for '{}': {}", self.name, goal, e);
                String::new()
            }
        }
    }

    fn costs(&self) -> CostLedger {
        self.ledger
    }

    fn close(&mut self) -> Result<()> {
        if let Some(store) = self.store.take() {
            store.close()?;
        }
        tracing::debug!("Closed oracle session {}", self.name);
        Ok(())
    }
}

/// Oracle answering from a fixed goal → answer table
///
/// Unknown goals get an empty answer. Every question is logged, which
/// makes it the oracle of choice for tests and offline replays.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    name: String,
    answers: HashMap<String, String>,
    fallback: Option<String>,
    asked: Vec<(String, String)>,
}

impl ScriptedOracle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Answer `goal` with the given items, one per line
    pub fn answer(mut self, goal: &str, items: &[&str]) -> Self {
        self.answers.insert(goal.to_string(), items.join("\n"));
        self
    }

    /// Answer every unscripted goal with `raw`
    pub fn otherwise(mut self, raw: &str) -> Self {
        self.fallback = Some(raw.to_string());
        self
    }

    /// Questions asked so far, as (goal, context)
    pub fn asked(&self) -> &[(String, String)] {
        &self.asked
    }
}

impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn ask(&mut self, goal: &str, context: &str) -> String {
        self.asked.push((goal.to_string(), context.to_string()));
        self.answers
            .get(goal)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}
