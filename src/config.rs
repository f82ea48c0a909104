//! Run configuration
//!
//! Oracle settings come from the environment; exploration settings from
//! `--key=value` command-line arguments.

use crate::program::Neck;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Prompter used when none is named
pub const DEFAULT_PROMPTER: &str = "step_by_step_guidance_to_achieve_a_goal";

/// Configuration for the LLM oracle backend
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// API base URL
    pub api_url: String,

    /// API key (from environment)
    pub api_key: String,

    /// Model to use (default: claude-3-haiku-20240307, or $ANDOR_MODEL)
    pub model: String,

    pub max_tokens: u32,

    /// Dollars per million input tokens
    pub input_price: f64,

    /// Dollars per million output tokens
    pub output_price: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: std::env::var("ANDOR_MODEL")
                .unwrap_or_else(|_| "claude-3-haiku-20240307".to_string()),
            max_tokens: 1024,
            input_price: 0.25,
            output_price: 1.25,
        }
    }
}

impl OracleConfig {
    /// Dollar cost of one round trip
    pub fn price(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_price + output_tokens as f64 * self.output_price)
            / 1_000_000.0
    }
}

/// Gate applied to candidate goals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppraiserKind {
    /// Keep everything
    #[default]
    Accept,
    /// Ask a True/False relevance oracle
    Advisor,
    /// Ask the stricter True/False oracle (semantic closeness and strong
    /// relevance)
    Relevance,
    /// Ask a 0-100 rating oracle and compare with a threshold
    Rater,
}

impl AppraiserKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "accept" | "all" => Some(Self::Accept),
            "advisor" | "decider" => Some(Self::Advisor),
            "relevance" => Some(Self::Relevance),
            "rater" => Some(Self::Rater),
            _ => None,
        }
    }
}

/// Settings for one exploration run
#[derive(Debug, Clone)]
pub struct ExploreConfig {
    pub initiator: String,
    pub prompter: String,
    /// Depth at which goals become candidate facts
    pub lim: usize,
    /// Record sibling alternatives as mutually exclusive
    pub strict: bool,
    pub appraiser: AppraiserKind,
    /// Minimum rating, as a fraction of 100, for the rater
    pub threshold: f64,
    pub neck: Neck,
    /// Where program and model files go; `None` to skip writing
    pub out_dir: Option<PathBuf>,
    pub json: bool,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            initiator: String::new(),
            prompter: DEFAULT_PROMPTER.to_string(),
            lim: 1,
            strict: false,
            appraiser: AppraiserKind::Accept,
            threshold: 0.5,
            neck: Neck::Prolog,
            out_dir: None,
            json: false,
        }
    }
}

impl ExploreConfig {
    /// Parse `<goal words...> [--prompter=] [--lim=] [--strict] [--appraiser=]
    /// [--threshold=] [--neck=] [--out=] [--json]`
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Self::default();
        let mut words = Vec::new();

        for arg in args {
            let Some(flag) = arg.strip_prefix("--") else {
                words.push(arg.as_str());
                continue;
            };
            let (key, value) = match flag.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (flag, None),
            };
            match (key, value) {
                ("prompter", Some(v)) => config.prompter = v.to_string(),
                ("lim", Some(v)) => {
                    config.lim = v
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --lim value: {}", v))?
                }
                ("strict", None) => config.strict = true,
                ("appraiser", Some(v)) => {
                    config.appraiser = AppraiserKind::parse(v)
                        .ok_or_else(|| anyhow::anyhow!("Unknown appraiser: {}", v))?
                }
                ("threshold", Some(v)) => {
                    let t: f64 = v
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --threshold value: {}", v))?;
                    if !(0.0..=1.0).contains(&t) {
                        bail!("--threshold must be between 0 and 1, got {}", t);
                    }
                    config.threshold = t;
                }
                ("neck", Some(v)) => {
                    config.neck =
                        Neck::parse(v).ok_or_else(|| anyhow::anyhow!("Unknown neck: {}", v))?
                }
                ("out", Some(v)) => config.out_dir = Some(PathBuf::from(v)),
                ("json", None) => config.json = true,
                _ => bail!("Unknown option: {}", arg),
            }
        }

        config.initiator = words.join(" ");
        if config.initiator.trim().is_empty() {
            bail!("Usage: explore <goal> [--prompter=NAME] [--lim=N] [--strict] [--appraiser=accept|advisor|relevance|rater] [--threshold=F] [--neck=prolog|natural] [--out=DIR] [--json]");
        }
        Ok(config)
    }
}

/// Base directory for the session store and default outputs
pub fn get_data_dir() -> PathBuf {
    // XDG data dir on Linux, ~/Library/Application Support on macOS
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("andor")
}
