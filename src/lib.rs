//! andor - AND/OR goal exploration with LLM oracles
//!
//! Recursively asks an oracle how a goal can be achieved (alternatives, OR)
//! and what each way requires (sub-goals, AND), records every accepted step
//! as a Horn clause, and checks the resulting program for a model that
//! entails the initiating goal.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use andor_explorer::{AndOrExplorer, HornProver, Unfolder, templates};
//!
//! let prompter = templates::find("step_by_step_guidance_to_achieve_a_goal").unwrap();
//! let unfolder = Unfolder::open("flat_tire", &prompter, 1, backend, Some(&store_path))?;
//! let mut explorer = AndOrExplorer::new("Repair a flat tire", prompter, unfolder, 1, false)?;
//!
//! // Traces arrive while the search continues
//! for trace in explorer.solve() {
//!     println!("{:?}", trace);
//! }
//!
//! // Facts, model, trimmed program
//! let conclusion = explorer.conclude(&HornProver)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  AndOrExplorer                        │
//! │  solve()    → lazy root-to-leaf traces                │
//! │  conclude() → facts + model + trimmed clauses         │
//! └───────┬──────────────────┬──────────────────┬────────┘
//!         │ ask_or/ask_and    │ appraise          │ record
//!         ▼                   ▼                   ▼
//! ┌──────────────┐   ┌────────────────┐   ┌───────────────┐
//! │  Unfolder     │   │  Appraiser      │   │ ClauseDatabase │
//! │  Agent × 2    │   │  accept/advisor │   │  → Program     │
//! │  SessionStore │   │  /rater         │   │  → Entailment  │
//! └──────────────┘   └────────────────┘   └───────────────┘
//! ```

pub mod appraise;
pub mod clauses;
pub mod config;
pub mod convenience;
pub mod db;
pub mod entailment;
pub mod explorer;
pub mod llm;
pub mod oracle;
pub mod output;
pub mod program;
pub mod templates;
pub mod types;
pub mod unfolder;

// Core types
pub use clauses::{Body, ClauseDatabase, FactSet};
pub use explorer::{AndOrExplorer, Conclusion, Solutions};
pub use types::*;
pub use unfolder::Unfolder;

// Oracles and appraisers
pub use appraise::{AcceptAll, AdvisorAppraiser, Appraiser, RaterAppraiser};
pub use llm::{AnthropicClient, Completed, Completion};
pub use oracle::{Agent, Oracle, ScriptedOracle};

// Programs and models
pub use entailment::{EntailmentEngine, HornProver};
pub use program::{parse_program, render_model, Neck, ProgramCompiler, ProgramError};

// Sessions
pub use db::SessionStore;

// Convenience API
pub use convenience::{build_explorer, run_advisor, run_collect, run_rater, run_recursor, stream_run};
