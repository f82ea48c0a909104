//! Unfolder: the AND/OR oracle pair steering one exploration

use crate::db::SessionStore;
use crate::llm::Completion;
use crate::oracle::{clean_answer, Agent, Oracle};
use crate::templates::Prompter;
use crate::types::{Costs, Goal};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub struct Unfolder {
    and_: Box<dyn Oracle>,
    or_: Box<dyn Oracle>,
}

impl Unfolder {
    pub fn new(and_: Box<dyn Oracle>, or_: Box<dyn Oracle>) -> Self {
        Self { and_, or_ }
    }

    /// Open the session pair `<name>_<prompter>_and_<lim>` /
    /// `<name>_<prompter>_or_<lim>` over `backend`, resuming from the store
    /// at `store_path` when given
    pub fn open(
        name: &str,
        prompter: &Prompter,
        lim: usize,
        backend: Arc<dyn Completion>,
        store_path: Option<&Path>,
    ) -> Result<Self> {
        let open_store = || -> Result<Option<SessionStore>> {
            store_path.map(SessionStore::open).transpose()
        };

        let and_name = format!("{}_{}_and_{}", name, prompter.name, lim);
        let or_name = format!("{}_{}_or_{}", name, prompter.name, lim);

        let and_ = Agent::open(and_name, prompter.and_p.clone(), backend.clone(), open_store()?);
        let or_ = Agent::open(or_name, prompter.or_p.clone(), backend, open_store()?);

        Ok(Self::new(Box::new(and_), Box::new(or_)))
    }

    /// Conjunctive sub-goals required for `goal`
    pub fn ask_and(&mut self, goal: &Goal, context: &str) -> Vec<Goal> {
        clean_answer(&self.and_.ask(goal.as_str(), context))
    }

    /// Alternative ways to achieve `goal`
    pub fn ask_or(&mut self, goal: &Goal, context: &str) -> Vec<Goal> {
        clean_answer(&self.or_.ask(goal.as_str(), context))
    }

    pub fn costs(&self) -> Costs {
        Costs::new(self.and_.costs(), self.or_.costs(), None)
    }

    pub fn close(&mut self) -> Result<()> {
        self.and_.close()?;
        self.or_.close()
    }
}
