use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tracing::info;

use super::client::EvaluatorClient;
use crate::config::EvaluatorConfig;

/// Spawns the package-index evaluator and connects a client to its stdio.
///
/// The child is killed when the returned handle is dropped. Its stderr is
/// inherited so evaluation errors land in the server's own log stream.
/// Requests unanswered after `request_timeout` are dropped from the client.
pub fn spawn_evaluator(
    config: &EvaluatorConfig,
    request_timeout: Option<Duration>,
) -> anyhow::Result<(EvaluatorClient, Child)> {
    let (program, args) = config
        .command
        .split_first()
        .context("empty package evaluator command")?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn package evaluator `{}`", program))?;

    let stdin = child.stdin.take().context("package evaluator stdin not captured")?;
    let stdout = child.stdout.take().context("package evaluator stdout not captured")?;

    info!(
        "Started package evaluator `{}` (pid {:?})",
        config.command.join(" "),
        child.id()
    );
    let client = EvaluatorClient::with_request_timeout(BufReader::new(stdout), stdin, request_timeout);
    Ok((client, child))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let config = EvaluatorConfig { command: Vec::new() };
        let err = spawn_evaluator(&config, None).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_missing_program_is_reported() {
        let config = EvaluatorConfig {
            command: vec!["/nonexistent/nix-package-evaluator".to_string()],
        };
        let err = spawn_evaluator(&config, None).unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
