//! Appraisers: accept/reject gates on candidate goals
//!
//! A rejected goal does not exist for the search: no clause mentions it as
//! an accepted alternative, it is never a fact and nothing below it is
//! explored.

use crate::oracle::Oracle;
use crate::types::{CostLedger, Goal, Trace};
use anyhow::Result;

pub trait Appraiser: Send {
    /// Keep `goal`, proposed in `context` (its parent first, then older
    /// ancestors)?
    fn appraise(&mut self, goal: &Goal, context: &Trace) -> bool;

    /// Oracle spend, for appraisers that consult one
    fn costs(&self) -> Option<CostLedger> {
        None
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every goal
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Appraiser for AcceptAll {
    fn appraise(&mut self, _goal: &Goal, _context: &Trace) -> bool {
        true
    }
}

/// Keeps goals a True/False oracle deems relevant to their context
pub struct AdvisorAppraiser {
    oracle: Box<dyn Oracle>,
    initiator: String,
}

impl AdvisorAppraiser {
    pub fn new(oracle: Box<dyn Oracle>, initiator: &Goal) -> Self {
        Self {
            oracle,
            initiator: initiator.to_string(),
        }
    }
}

/// First word of the answer, case-insensitively, is "true"
fn is_affirmative(answer: &str) -> bool {
    answer
        .split_whitespace()
        .next()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .is_some_and(|word| word.eq_ignore_ascii_case("true"))
}

impl Appraiser for AdvisorAppraiser {
    fn appraise(&mut self, goal: &Goal, context: &Trace) -> bool {
        let answer = self
            .oracle
            .ask(goal.as_str(), &context.render(&self.initiator));
        let verdict = is_affirmative(&answer);
        tracing::debug!("advisor: '{}' -> {}", goal, verdict);
        verdict
    }

    fn costs(&self) -> Option<CostLedger> {
        Some(self.oracle.costs())
    }

    fn close(&mut self) -> Result<()> {
        self.oracle.close()
    }
}

/// Keeps goals a rating oracle scores at or above a threshold
pub struct RaterAppraiser {
    oracle: Box<dyn Oracle>,
    initiator: String,
    /// Fraction of the 0-100 scale
    threshold: f64,
}

impl RaterAppraiser {
    pub fn new(oracle: Box<dyn Oracle>, initiator: &Goal, threshold: f64) -> Self {
        Self {
            oracle,
            initiator: initiator.to_string(),
            threshold,
        }
    }
}

/// Leading number of a `rating | explanation` answer
fn parse_rating(answer: &str) -> Option<f64> {
    let rating = answer.split('|').next()?.trim();
    let number: String = rating
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.trim_end_matches('.').parse().ok()
}

impl Appraiser for RaterAppraiser {
    fn appraise(&mut self, goal: &Goal, context: &Trace) -> bool {
        let answer = self
            .oracle
            .ask(goal.as_str(), &context.render(&self.initiator));
        match parse_rating(&answer) {
            Some(rating) => {
                let verdict = rating / 100.0 >= self.threshold;
                tracing::debug!("rater: '{}' scored {} -> {}", goal, rating, verdict);
                verdict
            }
            None => {
                tracing::debug!("rater: no rating for '{}' in {:?}", goal, answer);
                false
            }
        }
    }

    fn costs(&self) -> Option<CostLedger> {
        Some(self.oracle.costs())
    }

    fn close(&mut self) -> Result<()> {
        self.oracle.close()
    }
}
