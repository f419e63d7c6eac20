use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use nix_language_server::config::{CompletionConfig, Config, DEFAULT_MAX_ITEMS, EvaluatorConfig};
use nix_language_server::logging::init_logger;
use nix_language_server::lsp::backend::NixBackend;

#[derive(Debug, Parser)]
#[command(name = "nix-language-server", version, about = "Language server for the Nix expression language")]
struct Args {
    #[arg(
        long,
        help = "Command line of the package evaluator",
        long_help = "Whitespace-separated command launching the evaluator that answers attrset/attrpathComplete \
                     and attrset/attrpathInfo over stdio. Falls back to the NIX_LS_EVALUATOR environment variable. \
                     Without either, only local names are completed."
    )]
    evaluator: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_ITEMS, help = "Maximum number of items in one completion response")]
    completion_limit: usize,

    #[arg(long, default_value_t = 5000, help = "Timeout of one package index request in milliseconds, 0 to wait forever")]
    remote_timeout_ms: u64,

    #[arg(
        long,
        help = "Number of worker threads and of requests served concurrently (defaults to the number of CPUs)"
    )]
    jobs: Option<usize>,

    #[arg(long, help = "Log level filter for stderr, overrides RUST_LOG")]
    log_level: Option<String>,

    #[arg(long, help = "Disable ANSI colors in stderr logs")]
    no_color: bool,

    #[arg(long, help = "Do not write a session log file")]
    no_file_logging: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            completion: CompletionConfig::new(self.completion_limit, self.remote_timeout_ms),
            evaluator: EvaluatorConfig::from_cli_or_env(self.evaluator.as_deref()),
        }
    }

    /// Worker threads, also the number of requests the server handles at once.
    fn jobs(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_logging)?;

    let jobs = args.jobs();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(jobs)
        .enable_all()
        .build()?;

    let config = args.config();
    info!("Starting nix-language-server with {} jobs and {:?}", jobs, config);
    runtime.block_on(async move {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();

        let (service, socket) = LspService::build(|client| NixBackend::from_config(client, config)).finish();
        Server::new(stdin, stdout, socket)
            .concurrency_level(jobs)
            .serve(service)
            .await;
    });

    info!("Server stopped");
    Ok(())
}
