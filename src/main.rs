//! andor CLI
//!
//! Run with: andor explore "Repair a flat tire" --lim=2
//! Logs go to stderr; filter with RUST_LOG (default: info).

use andor_explorer::{
    config::{get_data_dir, ExploreConfig, OracleConfig},
    convenience::{build_explorer, stream_run},
    output::OutputSink,
    parse_program, render_model, templates, AnthropicClient, EntailmentEngine, Goal, HornProver,
    RunEvent, SessionStore,
};
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage:
  andor explore <goal...> [--prompter=NAME] [--lim=N] [--strict]
                          [--appraiser=accept|advisor|relevance|rater] [--threshold=F]
                          [--neck=prolog|natural] [--out=DIR] [--json]
  andor --prompters
  andor --prove <program-file> <goal...>
  andor --sessions
  andor --forget <agent>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        println!("{}", USAGE);
        return Ok(());
    };

    match command.as_str() {
        "explore" => run_explore(&args[2..]).await,
        "--prompters" => {
            println!("{}", serde_json::to_string_pretty(&templates::get_prompters())?);
            Ok(())
        }
        "--prove" => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow!("Usage: --prove <program-file> <goal...>"))?;
            run_prove(path, &args[3..].join(" "))
        }
        "--sessions" => run_sessions(),
        "--forget" => {
            let agent = args
                .get(2)
                .ok_or_else(|| anyhow!("Usage: --forget <agent>"))?;
            run_forget(agent)
        }
        "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

fn store_path() -> PathBuf {
    get_data_dir().join("sessions.db")
}

async fn run_explore(args: &[String]) -> Result<()> {
    let mut config = ExploreConfig::from_args(args)?;
    let out_dir = config
        .out_dir
        .take()
        .unwrap_or_else(|| get_data_dir().join("out"));
    let json_output = config.json;

    let backend = Arc::new(AnthropicClient::new(
        OracleConfig::default(),
        tokio::runtime::Handle::current(),
    ));
    let store = store_path();
    // opening session stores touches SQLite
    let explorer = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || build_explorer(&config, backend, Some(store.as_path())))
            .await??
    };
    let sink = OutputSink::new(&out_dir, config.neck);

    let (mut events, handle) = stream_run(explorer, Arc::new(HornProver), Some(sink));
    let mut traces = 0usize;
    while let Some(event) = events.recv().await {
        if json_output {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match event {
            RunEvent::Prompter(p) => println!("\nPROMPTER: {}\n", p.name),
            RunEvent::Trace(trace) => {
                traces += 1;
                let path: Vec<&str> = trace.iter().map(|g| g.as_str()).collect();
                println!("TRACE {}: {}", traces, path.join(" -> "));
            }
            RunEvent::Clauses(db) => println!(
                "\nCLAUSES: {} heads, {} clauses",
                db.head_count(),
                db.clause_count()
            ),
            RunEvent::Model(Some(model)) => {
                println!("MODEL: {} facts", model.len());
                for fact in model.iter() {
                    println!("   {}", fact);
                }
            }
            RunEvent::Model(None) => println!("MODEL: none entails the goal"),
            RunEvent::Costs(costs) => println!(
                "\nCOSTS: {} calls, {} cached, {} in / {} out tokens, ${:.4}",
                costs.total.calls,
                costs.total.cached,
                costs.total.input_tokens,
                costs.total.output_tokens,
                costs.total.dollars
            ),
        }
    }

    let conclusion = handle.await??;
    if !json_output {
        println!(
            "\nSaved to {:?} ({} clauses kept after trimming)",
            out_dir,
            conclusion.trimmed.clause_count()
        );
    }
    Ok(())
}

fn run_prove(path: &str, goal: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {}: {}", path, e))?;
    let db = parse_program(&text)?;
    let goal = Goal::initiator(goal).ok_or_else(|| anyhow!("Usage: --prove <program-file> <goal...>"))?;

    match HornProver.solve_database(&db, &goal) {
        Some(model) => print!("{}", render_model(&goal, &model)),
        None => println!("% no model entails '{}'", goal),
    }
    Ok(())
}

fn run_sessions() -> Result<()> {
    let store = SessionStore::open(&store_path())?;
    let summaries = store.summaries()?;

    if summaries.is_empty() {
        println!("No sessions recorded yet.");
        return Ok(());
    }

    println!("\nSESSIONS ({}):", summaries.len());
    for s in &summaries {
        println!(
            "   {:<60} {:>5} answers  ${:.4}  last: {}",
            s.agent,
            s.answers,
            s.spend.dollars,
            s.last_answered.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn run_forget(agent: &str) -> Result<()> {
    let store = SessionStore::open(&store_path())?;
    let removed = store.forget(agent)?;
    println!("Forgot {} answers of {}", removed, agent);
    Ok(())
}
