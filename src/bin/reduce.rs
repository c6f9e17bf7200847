//! Thin CLI entry point.
//!
//! Wires a [`RequestInfo`](sourcekit_reduce::RequestInfo) (built from a logged
//! request or a front-end argument list) through the oracle and the full
//! reduction pipeline, printing progress and writing the reduced request and
//! source back out. Deliberately does not scrape logs, discover toolchains, or
//! assemble a bundle directory — those remain external collaborators.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sourcekit_reduce::core::config::{OracleConfig, ReducerConfig};
use sourcekit_reduce::oracle::Oracle;
use sourcekit_reduce::request::{self, split_filelist_contents};
use sourcekit_reduce::{driver, RequestInfo};

/// Reduce a sourcekitd or Swift front-end crash to a minimal reproducer.
#[derive(Parser, Debug)]
#[command(name = "reduce", about = "Reduce a sourcekitd/Swift front-end crash to a minimal reproducer")]
struct Cli {
    /// Path to a logged sourcekitd request envelope (language-service mode).
    #[arg(long, conflicts_with = "frontend_arg")]
    request: Option<PathBuf>,

    /// One Swift front-end compiler argument (front-end mode); repeat for each argument.
    #[arg(long = "frontend-arg", value_name = "ARG")]
    frontend_arg: Vec<String>,

    /// Path to the input source file (language-service mode only; front-end mode
    /// reads its sources from the paths named in --frontend-arg).
    #[arg(long)]
    source: Option<PathBuf>,

    /// Optional JSON file overriding the default oracle configuration.
    #[arg(long, env = "SOURCEKIT_REDUCE_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the sourcekitd-loading helper binary (language-service mode).
    #[arg(long)]
    sourcekitd_helper: Option<PathBuf>,

    /// Path to the sourcekitd dylib (language-service mode).
    #[arg(long)]
    sourcekitd: Option<PathBuf>,

    /// Path to the Swift front-end binary (front-end mode).
    #[arg(long)]
    swift_frontend: Option<PathBuf>,

    /// Where to write the reduced source file.
    #[arg(long, default_value = "reduced.swift")]
    output_source: PathBuf,

    /// Where to write the reduced request envelope(s).
    #[arg(long, default_value = "reduced-request.txt")]
    output_request: PathBuf,

    /// Enable debug-level logging.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    let request = build_request(&cli).await?;
    let oracle_config = load_oracle_config(&cli)?;
    let reducer_config = ReducerConfig::default();

    let oracle = Oracle::new(oracle_config).await?;
    let cancel = CancellationToken::new();

    let outcome = driver::run(request, &oracle, &reducer_config, &cancel, |fraction, message| {
        info!(progress_pct = format!("{:.0}", fraction * 100.0), message);
    })
    .await;

    oracle.teardown().await;
    let reduced = outcome?;

    tokio::fs::write(&cli.output_source, &reduced.file_contents).await?;

    let source_path = cli.output_source.to_string_lossy().into_owned();
    let serialized = request::substitute(&reduced, &source_path)?;
    let combined = serialized.bodies.join("\n---\n");
    tokio::fs::write(&cli.output_request, combined).await?;

    println!("reduced source written to {}", cli.output_source.display());
    println!("reduced request written to {}", cli.output_request.display());
    Ok(())
}

fn install_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn build_request(cli: &Cli) -> anyhow::Result<RequestInfo> {
    if let Some(request_path) = &cli.request {
        let raw = tokio::fs::read_to_string(request_path).await?;
        let parsed = request::from_logged_request(&raw)?;
        let contents = match &cli.source {
            Some(source_path) => tokio::fs::read_to_string(source_path).await?,
            None => parsed.file_contents.clone(),
        };
        return Ok(parsed.with_source(contents, parsed.offset));
    }

    if !cli.frontend_arg.is_empty() {
        return Ok(request::from_frontend_arguments(&cli.frontend_arg, |path| {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| sourcekit_reduce::ReduceError::oracle_transient(format!("reading filelist {path}"), e))?;
            Ok(split_filelist_contents(&contents))
        })?);
    }

    anyhow::bail!("either --request or at least one --frontend-arg is required")
}

fn load_oracle_config(cli: &Cli) -> anyhow::Result<OracleConfig> {
    let mut config = match &cli.config {
        Some(path) => OracleConfig::from_json_file(path)?,
        None => OracleConfig::default(),
    };

    if cli.sourcekitd_helper.is_some() {
        config.sourcekitd_helper = cli.sourcekitd_helper.clone();
    }
    if cli.sourcekitd.is_some() {
        config.sourcekitd = cli.sourcekitd.clone();
    }
    if cli.swift_frontend.is_some() {
        config.swift_frontend = cli.swift_frontend.clone();
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_request_mode_arguments() {
        let cli = Cli::parse_from([
            "reduce",
            "--request",
            "req.yml",
            "--source",
            "input.swift",
            "--sourcekitd-helper",
            "/usr/bin/helper",
            "--sourcekitd",
            "/usr/lib/sourcekitd.so",
        ]);
        assert_eq!(cli.request, Some(PathBuf::from("req.yml")));
        assert_eq!(cli.source, Some(PathBuf::from("input.swift")));
        assert!(cli.frontend_arg.is_empty());
    }

    #[test]
    fn parses_repeated_frontend_args() {
        let cli = Cli::parse_from([
            "reduce",
            "--frontend-arg",
            "-c",
            "--frontend-arg",
            "main.swift",
            "--swift-frontend",
            "/usr/bin/swift-frontend",
        ]);
        assert_eq!(cli.frontend_arg, vec!["-c", "main.swift"]);
        assert!(cli.request.is_none());
    }

    #[test]
    fn request_and_frontend_arg_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["reduce", "--request", "req.yml", "--frontend-arg", "-c"]);
        assert!(result.is_err());
    }
}
