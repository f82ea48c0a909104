//! Convenience API: one-call runs
//!
//! Two modes:
//! 1. Collected: `run_recursor()`, `run_advisor()`, `run_rater()` - block
//!    until the run ends and return every event
//! 2. Streamed: `stream_run()` - the search runs on a blocking worker and
//!    events arrive over a channel while it continues
//!
//! ```rust,ignore
//! let backend = Arc::new(AnthropicClient::new(OracleConfig::default(), Handle::current()));
//! let explorer = build_explorer(&config, backend, Some(&store_path))?;
//! let (mut events, handle) = stream_run(explorer, Arc::new(HornProver), None);
//! while let Some(event) = events.recv().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! let conclusion = handle.await??;
//! ```

use crate::appraise::{AcceptAll, AdvisorAppraiser, Appraiser, RaterAppraiser};
use crate::config::{AppraiserKind, ExploreConfig};
use crate::db::SessionStore;
use crate::entailment::{EntailmentEngine, HornProver};
use crate::explorer::{file_name, AndOrExplorer, Conclusion};
use crate::llm::Completion;
use crate::oracle::Agent;
use crate::output::{OutputSink, SavedFiles};
use crate::templates::{self, OraclePrompt};
use crate::types::{Goal, RunEvent};
use crate::unfolder::Unfolder;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events buffered between the search worker and the consumer
const EVENT_BUFFER: usize = 64;

/// Assemble an explorer (oracle sessions and appraiser included) from
/// `config`
pub fn build_explorer(
    config: &ExploreConfig,
    backend: Arc<dyn Completion>,
    store_path: Option<&Path>,
) -> Result<AndOrExplorer> {
    let prompter = templates::find(&config.prompter)
        .ok_or_else(|| anyhow!("Unknown prompter: {}", config.prompter))?;
    let initiator = Goal::initiator(&config.initiator)
        .ok_or_else(|| anyhow!("Empty initiator goal"))?;
    let name = file_name(&initiator);

    let unfolder = Unfolder::open(&name, &prompter, config.lim, backend.clone(), store_path)?;
    let explorer =
        AndOrExplorer::new(&config.initiator, prompter, unfolder, config.lim, config.strict)?;

    let appraiser: Box<dyn Appraiser> = match config.appraiser {
        AppraiserKind::Accept => Box::new(AcceptAll),
        AppraiserKind::Advisor => {
            let oracle = open_oracle(&name, &templates::decider_oracle(), config.lim, backend, store_path)?;
            Box::new(AdvisorAppraiser::new(Box::new(oracle), &initiator))
        }
        AppraiserKind::Relevance => {
            let oracle = open_oracle(&name, &templates::relevance_oracle(), config.lim, backend, store_path)?;
            Box::new(AdvisorAppraiser::new(Box::new(oracle), &initiator))
        }
        AppraiserKind::Rater => {
            let oracle = open_oracle(&name, &templates::rater_oracle(), config.lim, backend, store_path)?;
            Box::new(RaterAppraiser::new(Box::new(oracle), &initiator, config.threshold))
        }
    };

    Ok(explorer.with_appraiser(appraiser))
}

fn open_oracle(
    name: &str,
    prompt: &OraclePrompt,
    lim: usize,
    backend: Arc<dyn Completion>,
    store_path: Option<&Path>,
) -> Result<Agent> {
    let store = store_path.map(SessionStore::open).transpose()?;
    Ok(Agent::open(
        format!("{}_{}_{}", name, prompt.name, lim),
        prompt.pattern.clone(),
        backend,
        store,
    ))
}

fn save(explorer: &AndOrExplorer, sink: &OutputSink, conclusion: &Conclusion) -> Result<SavedFiles> {
    sink.save(
        &explorer.stem(),
        explorer.initiator(),
        &conclusion.trimmed,
        conclusion.model.as_ref(),
    )
}

/// Run to completion, collecting every event; files are written when
/// `config.out_dir` is set
pub fn run_collect(
    config: &ExploreConfig,
    backend: Arc<dyn Completion>,
    store_path: Option<&Path>,
) -> Result<(Vec<RunEvent>, Conclusion)> {
    let mut explorer = build_explorer(config, backend, store_path)?;
    let mut events = Vec::new();
    let conclusion = explorer.run(&HornProver, &mut |event| events.push(event))?;

    if let Some(dir) = &config.out_dir {
        save(&explorer, &OutputSink::new(dir, config.neck), &conclusion)?;
    }
    Ok((events, conclusion))
}

fn quick_config(initiator: &str, prompter: &str, lim: usize) -> ExploreConfig {
    ExploreConfig {
        initiator: initiator.to_string(),
        prompter: prompter.to_string(),
        lim,
        ..ExploreConfig::default()
    }
}

/// Accept-all exploration
pub fn run_recursor(
    initiator: &str,
    prompter: &str,
    lim: usize,
    backend: Arc<dyn Completion>,
) -> Result<Vec<RunEvent>> {
    let config = quick_config(initiator, prompter, lim);
    Ok(run_collect(&config, backend, None)?.0)
}

/// Exploration gated by the True/False decider oracle
pub fn run_advisor(
    initiator: &str,
    prompter: &str,
    lim: usize,
    backend: Arc<dyn Completion>,
) -> Result<Vec<RunEvent>> {
    let config = ExploreConfig {
        appraiser: AppraiserKind::Advisor,
        ..quick_config(initiator, prompter, lim)
    };
    Ok(run_collect(&config, backend, None)?.0)
}

/// Exploration gated by the rating oracle at `threshold` (0.0-1.0)
pub fn run_rater(
    initiator: &str,
    prompter: &str,
    lim: usize,
    threshold: f64,
    backend: Arc<dyn Completion>,
) -> Result<Vec<RunEvent>> {
    let config = ExploreConfig {
        appraiser: AppraiserKind::Rater,
        threshold,
        ..quick_config(initiator, prompter, lim)
    };
    Ok(run_collect(&config, backend, None)?.0)
}

/// Run on a blocking worker, streaming events as they happen
///
/// Must be called within a tokio runtime. The handle resolves to the
/// conclusion once the last event (`COSTS`) has been sent. A consumer that
/// drops the receiver does not stop the search.
pub fn stream_run(
    mut explorer: AndOrExplorer,
    engine: Arc<dyn EntailmentEngine>,
    sink: Option<OutputSink>,
) -> (mpsc::Receiver<RunEvent>, JoinHandle<Result<Conclusion>>) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let handle = tokio::task::spawn_blocking(move || {
        let conclusion = explorer.run(engine.as_ref(), &mut |event| {
            if tx.blocking_send(event).is_err() {
                tracing::debug!("Event receiver dropped");
            }
        })?;
        if let Some(sink) = &sink {
            save(&explorer, sink, &conclusion)?;
        }
        Ok(conclusion)
    });

    (rx, handle)
}
