//! Server configuration
//!
//! Values come from the command line, with the evaluator command also
//! readable from the `NIX_LS_EVALUATOR` environment variable.

use std::time::Duration;

/// Environment variable holding the package evaluator command line.
pub const EVALUATOR_ENV: &str = "NIX_LS_EVALUATOR";

/// Default ceiling on the number of items in one completion response.
///
/// Large lists are slow to transfer; anything beyond this is reported as
/// incomplete and the editor re-queries with a longer prefix.
pub const DEFAULT_MAX_ITEMS: usize = 30;

/// Default bound on one package index round trip.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits applied to every completion and resolve request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    /// Shared budget for local and package items together.
    pub max_items: usize,
    /// `None` waits for the evaluator indefinitely.
    pub remote_timeout: Option<Duration>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            max_items: DEFAULT_MAX_ITEMS,
            remote_timeout: Some(DEFAULT_REMOTE_TIMEOUT),
        }
    }
}

impl CompletionConfig {
    /// Builds the config from CLI values; a timeout of `0` ms disables it.
    pub fn new(max_items: usize, remote_timeout_ms: u64) -> Self {
        CompletionConfig {
            max_items,
            remote_timeout: (remote_timeout_ms > 0).then(|| Duration::from_millis(remote_timeout_ms)),
        }
    }
}

/// How to launch the package-index evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl EvaluatorConfig {
    /// Resolves the evaluator command.
    ///
    /// Checks in order:
    /// 1. Explicit command line option
    /// 2. Environment variable `NIX_LS_EVALUATOR`
    ///
    /// Returns `None` when neither is set, in which case package completion is disabled.
    pub fn from_cli_or_env(cli: Option<&str>) -> Option<Self> {
        if let Some(command) = cli {
            return Self::parse(command);
        }
        std::env::var(EVALUATOR_ENV).ok().and_then(|command| Self::parse(&command))
    }

    /// Splits a command line on whitespace. Blank input yields `None`.
    pub fn parse(command: &str) -> Option<Self> {
        let command: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        if command.is_empty() {
            tracing::warn!("Empty package evaluator command, package completion disabled");
            return None;
        }
        Some(EvaluatorConfig { command })
    }
}

/// Everything the backend needs to serve requests.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub evaluator: Option<EvaluatorConfig>,
}
